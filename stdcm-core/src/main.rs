use std::process::ExitCode;

use stdcm_core::scenario::Scenario;
use stdcm_core::stdcm::{StdcmConfig, StdcmError, StdcmPlanner};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let Some(path) = std::env::args().nth(1) else {
        eprintln!("usage: stdcm-core <scenario.json>");
        return ExitCode::from(1);
    };

    let scenario = match Scenario::load(&path) {
        Ok(scenario) => scenario,
        Err(e) => {
            error!(path = %path, error = %e, "failed to load scenario");
            return ExitCode::from(1);
        }
    };
    info!(
        path = %path,
        blocks = scenario.infra.len(),
        steps = scenario.request.steps.len(),
        "loaded scenario"
    );

    let config = StdcmConfig::default();
    let engine = config.envelope_engine();
    let planner = StdcmPlanner::new(&scenario.infra, &scenario.occupancies, &engine, &config);

    match planner.search(&scenario.request) {
        Ok(Some(result)) => {
            if let Some(reference) = scenario.reference_time {
                info!(
                    departure = %result.departure_at(reference),
                    arrival = %result.arrival_at(reference),
                    "path found"
                );
            }
            match serde_json::to_string_pretty(&result) {
                Ok(json) => {
                    println!("{json}");
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    error!(error = %e, "failed to serialize result");
                    ExitCode::from(1)
                }
            }
        }
        Ok(None) => {
            println!("no path found");
            ExitCode::SUCCESS
        }
        Err(StdcmError::Timeout) => {
            error!("search timed out");
            ExitCode::from(2)
        }
        Err(e) => {
            error!(error = %e, "search failed");
            ExitCode::from(1)
        }
    }
}
