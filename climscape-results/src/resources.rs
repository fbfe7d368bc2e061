//! Layout of the simulation documents and typed reads over a source.

use climscape_core::SourceError;
use climscape_storage::SimulationSource;
use serde::de::DeserializeOwned;

use crate::error::ResultsResult;

pub const SCENARIOS_PATH: &str = "simulation/scenarios/scenarios.json";
pub const VARIABLES_PATH: &str = "simulation/variablesAttributes.json";

pub fn plane_path(scenario: &str, variable: &str, time: &str, plane: &str) -> String {
    format!("simulation/scenarios/{scenario}/{variable}/{time}/{plane}.json")
}

pub fn time_series_path(scenario: &str, variable: &str, point: &str) -> String {
    format!("simulation/scenarios/{scenario}/{variable}/timeSeries/{point}.json")
}

pub fn depth_series_path(scenario: &str, variable: &str, point: &str) -> String {
    format!("simulation/scenarios/{scenario}/{variable}/depthTimeSeries/{point}.json")
}

pub fn time_series_points_path(scenario: &str) -> String {
    format!("simulation/scenarios/{scenario}/timeSeriesPoints.json")
}

/// Read and decode the JSON document at `path`.
pub async fn read_json<T: DeserializeOwned>(
    source: &dyn SimulationSource,
    path: &str,
) -> ResultsResult<T> {
    let bytes = source.read(path).await?;
    serde_json::from_slice(&bytes).map_err(|e| SourceError::decode(path, &e).into())
}
