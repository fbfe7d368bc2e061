//! Scenario Comparison Inspector
//!
//! Loads one plane comparison from the configured data directory and prints
//! a JSON summary (grid dimensions and value range per display mode).
//!
//! Usage:
//!   climscape-inspect <scenarioA> <scenarioB|_> <plane> <time> <variable>
//!
//! Pass `_` as scenario B to inspect a single scenario.

use climscape_core::{DisplayMode, ValueRange};
use climscape_results::{
    init_tracing, PlaneSelector, ResultsConfig, ResultsResult, SimulationResults,
};
use climscape_storage::cache::ABSENT;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct ModeSummary {
    mode: DisplayMode,
    rows: usize,
    columns: usize,
    range: ValueRange,
}

#[derive(Debug, Serialize)]
struct Summary {
    scenario_a: String,
    scenario_b: Option<String>,
    plane: String,
    time: String,
    variable: String,
    axes: climscape_core::GraphAxes,
    modes: Vec<ModeSummary>,
}

async fn run(args: &[String]) -> ResultsResult<Summary> {
    let config = ResultsConfig::from_env()?;
    init_tracing(config.log_json)?;

    let results = SimulationResults::open(&config);
    let scenario_a = args[0].as_str();
    let scenario_b = Some(args[1].as_str()).filter(|b| *b != ABSENT);
    let selector = PlaneSelector::new(args[2].as_str(), args[3].as_str(), args[4].as_str());

    let comparison = results
        .planes
        .comparison(scenario_a, scenario_b, &selector)
        .await?;

    let modes = DisplayMode::ALL
        .into_iter()
        .filter_map(|mode| {
            let grid = comparison.grid(mode)?;
            Some(ModeSummary {
                mode,
                rows: grid.row_count(),
                columns: grid.column_count(),
                range: comparison.value_range(mode)?,
            })
        })
        .collect();

    Ok(Summary {
        scenario_a: scenario_a.to_string(),
        scenario_b: scenario_b.map(str::to_string),
        plane: selector.plane,
        time: selector.time,
        variable: selector.variable,
        axes: comparison.axes.clone(),
        modes,
    })
}

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() != 5 {
        eprintln!("Usage: climscape-inspect <scenarioA> <scenarioB|_> <plane> <time> <variable>");
        std::process::exit(2);
    }

    let summary = match run(&args).await {
        Ok(summary) => summary,
        Err(e) => {
            eprintln!("Failed to load comparison: {}", e);
            std::process::exit(1);
        }
    };

    match serde_json::to_string_pretty(&summary) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Failed to serialize summary: {}", e);
            std::process::exit(1);
        }
    }
}
