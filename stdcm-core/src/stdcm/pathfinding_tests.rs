//! End-to-end tests for the STDCM search.

use super::node::Edge;
use super::pathfinding::make_waypoints;
use super::postprocessing::make_result;
use super::test_fixtures::{at, electric_stock, thermal_stock};
use super::*;
use crate::availability::{
    Availability, AvailabilityError, BlockAvailability, OccupancyTable, TIME_EPSILON, TimeWindow,
};
use crate::domain::{AllowanceValue, BlockId, DistanceRange, StdcmStep};
use crate::envelope::MaxEffortEngine;
use crate::infra::{BlockSpec, Infra, InfraBuilder};

fn approx(a: f64, b: f64, tolerance: f64) -> bool {
    (a - b).abs() < tolerance
}

/// A (1000 m) -> B (2000 m), both at 30 m/s.
fn two_blocks() -> Infra {
    InfraBuilder::new()
        .block(BlockSpec::new("A", 1000.0).next("B"))
        .block(BlockSpec::new("B", 2000.0))
        .build()
        .unwrap()
}

/// From the start of A to the end of B.
fn a_to_b(infra: &Infra) -> StdcmRequest {
    StdcmRequest::new(
        electric_stock(),
        vec![
            StdcmStep::pass(at(infra, "A", 0.0)),
            StdcmStep::stop(at(infra, "B", 2000.0), 0.0),
        ],
        3600.0,
    )
}

fn search(
    infra: &Infra,
    availability: &impl BlockAvailability,
    request: &StdcmRequest,
) -> Result<Option<StdcmResult>, StdcmError> {
    let config = StdcmConfig::default();
    let engine = config.envelope_engine();
    StdcmPlanner::new(infra, availability, &engine, &config).search(request)
}

fn block_names(result: &StdcmResult) -> Vec<&str> {
    result.blocks.iter().map(|b| b.name.as_str()).collect()
}

fn assert_availability_respected(result: &StdcmResult, table: &OccupancyTable) {
    for occupancy in &result.occupancies {
        let window = TimeWindow::new(occupancy.entry, occupancy.exit);
        assert!(
            table.query(occupancy.block, window).unwrap().is_available(),
            "{occupancy:?} conflicts with {:?}",
            table.occupancies(occupancy.block)
        );
    }
}

#[test]
fn free_path_leaves_on_time() {
    let infra = two_blocks();
    let table = OccupancyTable::new();
    let result = search(&infra, &table, &a_to_b(&infra)).unwrap().unwrap();

    assert_eq!(block_names(&result), vec!["A", "B"]);
    assert_eq!(result.departure_time, 0.0);
    assert_eq!(result.departure_delay, 0.0);
    // 60 s up to 30 m/s over 900 m, 1200 m cruising, 60 s braking
    assert!(approx(result.run_time, 160.0, 1e-6), "{}", result.run_time);
    assert_eq!(result.envelope.end_speed(), 0.0);
    assert!(approx(result.occupancies[0].exit, 60.0 + 100.0 / 30.0, 1e-6));
}

#[test]
fn waits_for_an_occupied_block() {
    let infra = two_blocks();
    let b = infra.block_id("B").unwrap();
    let table = OccupancyTable::new().with(b, 100.0, 140.0);
    let request = a_to_b(&infra).max_departure_delay(200.0);

    let result = search(&infra, &table, &request).unwrap().unwrap();

    // B is entered 63.3 s after departure; it must not be before 140
    assert!(approx(result.departure_delay, 140.0 - (60.0 + 100.0 / 30.0), 1e-6));
    assert!(result.occupancies[1].entry >= 140.0 - TIME_EPSILON);
    assert!(approx(result.run_time, 160.0, 1e-6));
    assert_availability_respected(&result, &table);
}

#[test]
fn slows_down_when_the_wait_exceeds_the_allowed_delay() {
    let infra = two_blocks();
    let b = infra.block_id("B").unwrap();
    let table = OccupancyTable::new().with(b, 100.0, 140.0);
    let request = a_to_b(&infra).max_departure_delay(30.0);

    let result = search(&infra, &table, &request).unwrap().unwrap();

    // Leaving 76.7 s late isn't allowed, so the time is lost on A instead
    let lost = 140.0 - (60.0 + 100.0 / 30.0);
    assert_eq!(result.departure_delay, 0.0);
    assert!(approx(result.blocks[0].engineering_allowance, lost, 1e-6));
    assert_eq!(result.blocks[1].engineering_allowance, 0.0);
    assert!(result.occupancies[1].entry >= 140.0 - TIME_EPSILON);
    assert!(approx(result.run_time, 160.0 + lost, 1e-6), "{}", result.run_time);
    assert_availability_respected(&result, &table);
}

#[test]
fn wait_beyond_the_allowed_delay_without_room_to_slow_down_finds_nothing() {
    let infra = two_blocks();
    let a = infra.block_id("A").unwrap();
    let b = infra.block_id("B").unwrap();
    let table = OccupancyTable::new()
        .with(a, 100.0, 300.0)
        .with(b, 100.0, 140.0);
    let request = a_to_b(&infra).max_departure_delay(30.0);

    assert_eq!(search(&infra, &table, &request).unwrap(), None);
}

/// A (1000 m) -> B (3000 m) -> C (1000 m), stopping at the end of C.
fn long_middle_block() -> (Infra, StdcmRequest) {
    let infra = InfraBuilder::new()
        .block(BlockSpec::new("A", 1000.0).next("B"))
        .block(BlockSpec::new("B", 3000.0).next("C"))
        .block(BlockSpec::new("C", 1000.0))
        .build()
        .unwrap();
    let request = StdcmRequest::new(
        electric_stock(),
        vec![
            StdcmStep::pass(at(&infra, "A", 0.0)),
            StdcmStep::stop(at(&infra, "C", 1000.0), 0.0),
        ],
        3600.0,
    )
    .max_departure_delay(3600.0);
    (infra, request)
}

#[test]
fn time_is_lost_upstream_when_the_departure_cannot_move() {
    // A is taken again 6.7 s after the train leaves it, and C is only free
    // 86.7 s after the train would reach it
    let (infra, request) = long_middle_block();
    let a = infra.block_id("A").unwrap();
    let c = infra.block_id("C").unwrap();
    let table = OccupancyTable::new()
        .with(a, 70.0, 5000.0)
        .with(c, 0.0, 250.0);

    let result = search(&infra, &table, &request).unwrap().unwrap();

    let reaches_c = 60.0 + 3100.0 / 30.0;
    assert_eq!(block_names(&result), vec!["A", "B", "C"]);
    assert_eq!(result.departure_delay, 0.0);
    assert_eq!(result.blocks[0].engineering_allowance, 0.0);
    assert!(approx(result.blocks[1].engineering_allowance, 250.0 - reaches_c, 1e-6));
    assert!(result.occupancies[0].exit <= 70.0);
    assert!(result.occupancies[2].entry >= 250.0 - TIME_EPSILON);
    assert!(approx(result.run_time, 250.0 + 100.0 / 30.0 + 60.0, 1e-6), "{}", result.run_time);
    assert_availability_respected(&result, &table);
}

#[test]
fn time_cannot_be_lost_on_a_block_needed_soon_after() {
    let (infra, request) = long_middle_block();
    let a = infra.block_id("A").unwrap();
    let b = infra.block_id("B").unwrap();
    let c = infra.block_id("C").unwrap();
    let table = OccupancyTable::new()
        .with(a, 70.0, 5000.0)
        .with(b, 200.0, 300.0)
        .with(c, 0.0, 250.0);

    assert_eq!(search(&infra, &table, &request).unwrap(), None);
}

#[test]
fn later_opening_used_when_earlier_shift_conflicts_upstream() {
    // Shifting to clear B would run A into its own occupancy, so the
    // train has to wait until A is free again.
    let infra = two_blocks();
    let a = infra.block_id("A").unwrap();
    let b = infra.block_id("B").unwrap();
    let table = OccupancyTable::new()
        .with(a, 120.0, 200.0)
        .with(b, 100.0, 140.0);
    let request = a_to_b(&infra).max_departure_delay(200.0);

    let result = search(&infra, &table, &request).unwrap().unwrap();

    assert!(approx(result.departure_delay, 200.0, 1e-6));
    assert!(result.occupancies[0].entry >= 200.0 - TIME_EPSILON);
    assert_availability_respected(&result, &table);
}

#[test]
fn start_time_offsets_the_schedule() {
    let infra = two_blocks();
    let b = infra.block_id("B").unwrap();
    let table = OccupancyTable::new().with(b, 0.0, 100.0);
    let request = a_to_b(&infra).start_time(1000.0);

    let result = search(&infra, &table, &request).unwrap().unwrap();
    assert_eq!(result.departure_time, 1000.0);
    assert!(approx(result.arrival_time(), 1160.0, 1e-6));
}

#[test]
fn thermal_train_detours_around_foreign_catenary() {
    // S -> E (25000V) -> D, or the longer S -> F -> D
    let infra = InfraBuilder::new()
        .block(BlockSpec::new("S", 1000.0).next("E").next("F"))
        .block(
            BlockSpec::new("E", 1000.0)
                .next("D")
                .electrified(DistanceRange::meters(0.0, 1000.0).unwrap(), "25000V"),
        )
        .block(BlockSpec::new("F", 1500.0).next("D"))
        .block(BlockSpec::new("D", 1000.0))
        .build()
        .unwrap();
    let table = OccupancyTable::new();
    let steps = vec![
        StdcmStep::pass(at(&infra, "S", 0.0)),
        StdcmStep::stop(at(&infra, "D", 1000.0), 0.0),
    ];

    let electric = StdcmRequest::new(electric_stock(), steps.clone(), 3600.0);
    let result = search(&infra, &table, &electric).unwrap().unwrap();
    assert_eq!(block_names(&result), vec!["S", "E", "D"]);

    let thermal = StdcmRequest::new(thermal_stock(), steps, 3600.0);
    let result = search(&infra, &table, &thermal).unwrap().unwrap();
    assert_eq!(block_names(&result), vec!["S", "F", "D"]);
}

#[test]
fn thermal_train_without_detour_finds_nothing() {
    let infra = InfraBuilder::new()
        .block(BlockSpec::new("S", 1000.0).next("E"))
        .block(
            BlockSpec::new("E", 1000.0)
                .next("D")
                .electrified(DistanceRange::meters(0.0, 1000.0).unwrap(), "25000V"),
        )
        .block(BlockSpec::new("D", 1000.0))
        .build()
        .unwrap();
    let request = StdcmRequest::new(
        thermal_stock(),
        vec![
            StdcmStep::pass(at(&infra, "S", 0.0)),
            StdcmStep::stop(at(&infra, "D", 1000.0), 0.0),
        ],
        3600.0,
    );

    assert_eq!(search(&infra, &OccupancyTable::new(), &request).unwrap(), None);
}

#[test]
fn neutral_section_lets_thermal_train_through() {
    let infra = InfraBuilder::new()
        .block(BlockSpec::new("S", 1000.0).next("E"))
        .block(
            BlockSpec::new("E", 1000.0)
                .next("D")
                .electrified(DistanceRange::meters(0.0, 1000.0).unwrap(), "25000V")
                .neutral_section(DistanceRange::meters(0.0, 1000.0).unwrap()),
        )
        .block(BlockSpec::new("D", 1000.0))
        .build()
        .unwrap();
    let request = StdcmRequest::new(
        thermal_stock(),
        vec![
            StdcmStep::pass(at(&infra, "S", 0.0)),
            StdcmStep::stop(at(&infra, "D", 1000.0), 0.0),
        ],
        3600.0,
    );

    let result = search(&infra, &OccupancyTable::new(), &request).unwrap().unwrap();
    assert_eq!(block_names(&result), vec!["S", "E", "D"]);
}

#[test]
fn disconnected_destination_is_not_an_error() {
    let infra = InfraBuilder::new()
        .block(BlockSpec::new("A", 1000.0).next("B"))
        .block(BlockSpec::new("B", 1000.0))
        .block(BlockSpec::new("C", 1000.0))
        .build()
        .unwrap();
    let request = StdcmRequest::new(
        electric_stock(),
        vec![
            StdcmStep::pass(at(&infra, "A", 0.0)),
            StdcmStep::stop(at(&infra, "C", 500.0), 0.0),
        ],
        3600.0,
    );

    assert_eq!(search(&infra, &OccupancyTable::new(), &request).unwrap(), None);
}

#[test]
fn zero_timeout_is_an_error() {
    let infra = two_blocks();
    let request = a_to_b(&infra).pathfinding_timeout(0.0);

    let err = search(&infra, &OccupancyTable::new(), &request).unwrap_err();
    assert_eq!(err, StdcmError::Timeout);
}

#[test]
fn run_time_bound_prunes_the_search() {
    let infra = two_blocks();
    let table = OccupancyTable::new();

    // Fails on the heuristic from the first block
    let request = StdcmRequest {
        max_run_time: 100.0,
        ..a_to_b(&infra)
    };
    assert_eq!(search(&infra, &table, &request).unwrap(), None);

    // Fails only once the last block is simulated
    let request = StdcmRequest {
        max_run_time: 150.0,
        ..a_to_b(&infra)
    };
    assert_eq!(search(&infra, &table, &request).unwrap(), None);

    let request = StdcmRequest {
        max_run_time: 161.0,
        ..a_to_b(&infra)
    };
    let result = search(&infra, &table, &request).unwrap().unwrap();
    assert!(result.run_time <= 161.0);
}

/// Twenty 100 m blocks, stopping at the end of the last one.
fn short_blocks() -> (Infra, StdcmRequest) {
    let mut builder = InfraBuilder::new();
    for i in 0..20 {
        let mut spec = BlockSpec::new(&format!("B{i}"), 100.0);
        if i < 19 {
            spec = spec.next(&format!("B{}", i + 1));
        }
        builder = builder.block(spec);
    }
    let infra = builder.build().unwrap();
    let request = StdcmRequest::new(
        electric_stock(),
        vec![
            StdcmStep::pass(at(&infra, "B0", 0.0)),
            StdcmStep::stop(at(&infra, "B19", 100.0), 0.0),
        ],
        3600.0,
    );
    (infra, request)
}

#[test]
fn braking_is_anticipated_beyond_the_lookahead_blocks() {
    // Braking from 30 m/s takes 900 m, more than three blocks ahead
    let (infra, request) = short_blocks();
    let table = OccupancyTable::new();
    let full_run = 60.0 + 200.0 / 30.0 + 60.0;

    let request = StdcmRequest {
        max_run_time: 125.0,
        ..request
    };
    assert_eq!(search(&infra, &table, &request).unwrap(), None);

    let request = StdcmRequest {
        max_run_time: 130.0,
        ..request
    };
    let result = search(&infra, &table, &request).unwrap().unwrap();
    assert!(approx(result.run_time, full_run, 1e-3), "{}", result.run_time);

    let config = StdcmConfig::default();
    let engine = config.envelope_engine();
    let searched = StdcmPlanner::new(&infra, &table, &engine, &config)
        .explore(&request, |graph, found| graph.node(found.unwrap()).time_since_departure)
        .unwrap();
    assert!(approx(searched, result.run_time, 1e-3), "{searched} vs {}", result.run_time);
}

#[test]
fn invalid_request_is_rejected() {
    let infra = two_blocks();
    let mut request = a_to_b(&infra);
    request.steps.pop();

    let err = search(&infra, &OccupancyTable::new(), &request).unwrap_err();
    assert!(matches!(err, StdcmError::InvalidRequest(_)));
}

/// A -> B -> C with a pass step and an intermediate stop on B.
fn three_blocks_with_stop() -> (Infra, StdcmRequest) {
    let infra = InfraBuilder::new()
        .block(BlockSpec::new("A", 1000.0).next("B"))
        .block(BlockSpec::new("B", 2000.0).next("C"))
        .block(BlockSpec::new("C", 1000.0))
        .build()
        .unwrap();
    let request = StdcmRequest::new(
        electric_stock(),
        vec![
            StdcmStep::pass(at(&infra, "A", 0.0)),
            StdcmStep::pass(at(&infra, "B", 500.0)),
            StdcmStep::stop(at(&infra, "B", 1500.0), 60.0),
            StdcmStep::stop(at(&infra, "C", 1000.0), 0.0),
        ],
        3600.0,
    );
    (infra, request)
}

#[test]
fn waypoints_follow_step_order() {
    let (infra, request) = three_blocks_with_stop();
    let result = search(&infra, &OccupancyTable::new(), &request).unwrap().unwrap();

    assert_eq!(block_names(&result), vec!["A", "B", "B", "C"]);
    let steps: Vec<_> = result.waypoints.iter().map(|w| w.step_index).collect();
    assert_eq!(steps, vec![0, 1, 2, 3]);
    for pair in result.waypoints.windows(2) {
        assert!(pair[0].edge_index <= pair[1].edge_index);
        assert!(pair[0].path_offset <= pair[1].path_offset);
    }
    let offsets: Vec<f64> = result.waypoints.iter().map(|w| w.path_offset.meters()).collect();
    assert_eq!(offsets, vec![0.0, 1500.0, 2500.0, 4000.0]);
}

#[test]
fn intermediate_stop_counts_toward_run_time() {
    let (infra, request) = three_blocks_with_stop();
    let result = search(&infra, &OccupancyTable::new(), &request).unwrap().unwrap();

    assert_eq!(result.stops.len(), 1);
    assert_eq!(result.stops[0].step_index, 2);
    assert_eq!(result.stops[0].duration, 60.0);
    assert!(approx(result.run_time, result.envelope.total_time() + 60.0, 1e-9));

    // The train holds B during the stop
    assert!(approx(result.occupancies[1].exit, result.occupancies[2].entry, 1e-9));
    assert!(approx(result.envelope.interpolate_speed(2500.0), 0.0, 1e-9));
}

#[test]
fn allowance_slows_the_final_run() {
    let infra = two_blocks();
    let request = a_to_b(&infra).standard_allowance(AllowanceValue::Percentage { percentage: 10.0 });

    let result = search(&infra, &OccupancyTable::new(), &request).unwrap().unwrap();
    assert!(approx(result.run_time, 176.0, 1e-6), "{}", result.run_time);
}

#[test]
fn allowance_is_accounted_for_during_search() {
    // 176 s with the margin: over a 170 s limit even though 160 s would fit
    let infra = two_blocks();
    let request = StdcmRequest {
        max_run_time: 170.0,
        ..a_to_b(&infra).standard_allowance(AllowanceValue::Percentage { percentage: 10.0 })
    };
    assert_eq!(search(&infra, &OccupancyTable::new(), &request).unwrap(), None);
}

#[test]
fn tag_is_carried_to_the_result() {
    let infra = two_blocks();
    let request = a_to_b(&infra).tag("freight 42");
    let result = search(&infra, &OccupancyTable::new(), &request).unwrap().unwrap();
    assert_eq!(result.tag.as_deref(), Some("freight 42"));
}

#[test]
fn alternative_origins_are_all_tried() {
    let infra = two_blocks();
    let mut request = a_to_b(&infra);
    // Starting from the middle of B is shorter
    request.steps[0].locations.extend(at(&infra, "B", 1000.0));

    let result = search(&infra, &OccupancyTable::new(), &request).unwrap().unwrap();
    assert_eq!(block_names(&result), vec!["B"]);
    assert_eq!(result.waypoints[0].offset.meters(), 0.0);
    assert_eq!(result.waypoints[1].path_offset.meters(), 1000.0);
}

struct FailingAvailability;

impl BlockAvailability for FailingAvailability {
    fn query(&self, _block: BlockId, _window: TimeWindow) -> Result<Availability, AvailabilityError> {
        Err(AvailabilityError::Provider("timetable offline".into()))
    }
}

#[test]
fn availability_failures_propagate() {
    let infra = two_blocks();
    let err = search(&infra, &FailingAvailability, &a_to_b(&infra)).unwrap_err();
    assert_eq!(
        err,
        StdcmError::Availability(AvailabilityError::Provider("timetable offline".into()))
    );
}

#[test]
fn explored_nodes_keep_time_and_waypoints_monotonic() {
    let (infra, request) = three_blocks_with_stop();
    let b = infra.block_id("B").unwrap();
    let table = OccupancyTable::new()
        .with(b, 100.0, 130.0)
        .with(b, 300.0, 320.0);
    let request = request.max_departure_delay(400.0);
    let config = StdcmConfig::default();
    let engine = config.envelope_engine();
    let planner = StdcmPlanner::new(&infra, &table, &engine, &config);

    let found = planner
        .explore(&request, |graph, found| {
            let arena = graph.arena();
            for (id, node) in arena.nodes() {
                if let Some(prev) = arena.previous_node(id) {
                    let prev = arena.node(prev);
                    assert!(node.time_since_departure >= prev.time_since_departure);
                    assert!(node.time >= prev.time);
                    assert!(node.waypoint_index >= prev.waypoint_index);
                    assert!(node.waypoint_index <= prev.waypoint_index + 2);
                }
                let chain = arena.edge_chain(id);
                assert!(arena.edge(chain[0]).previous_node.is_none());
            }
            found
        })
        .unwrap();
    assert!(found.is_some());
}

#[test]
fn post_processing_reports_conflicts() {
    let infra = two_blocks();
    let b = infra.block_id("B").unwrap();
    let request = a_to_b(&infra);
    let config = StdcmConfig::default();
    let engine = MaxEffortEngine::default();
    let free = OccupancyTable::new();
    // Occupancy the search never saw
    let busy = OccupancyTable::new().with(b, 100.0, 110.0);
    let planner = StdcmPlanner::new(&infra, &free, &engine, &config);

    let result = planner
        .explore(&request, |graph, found| {
            let chain: Vec<&Edge> = graph
                .arena()
                .edge_chain(found.unwrap())
                .into_iter()
                .map(|e| graph.edge(e))
                .collect();
            let waypoints = make_waypoints(&request.steps, &chain);
            make_result(&infra, &request, &engine, &busy, &chain, waypoints)
        })
        .unwrap();

    match result {
        Err(StdcmError::ScheduleConflict { block, .. }) => assert_eq!(block, b),
        other => panic!("expected a conflict, got {other:?}"),
    }
}
