//! Climscape Results - Cached Scenario Results and Comparisons
//!
//! Services that read simulation documents through a
//! [`SimulationSource`](climscape_storage::SimulationSource), memoize them in
//! single-flight caches and derive comparison bundles (scenario A, scenario B
//! and their difference) for planes and probe time series.

pub mod catalog;
pub mod config;
pub mod depth;
pub mod error;
mod keys;
pub mod plane;
pub mod resources;
pub mod telemetry;
pub mod timeseries;

pub use catalog::{ScenarioCatalog, VariableMap};
pub use config::ResultsConfig;
pub use depth::DepthSeriesResults;
pub use error::{ResultsError, ResultsResult};
pub use plane::{PlaneComparison, PlaneResults, PlaneSelector};
pub use telemetry::init_tracing;
pub use timeseries::{SeriesComparison, TimeSeriesResults};

use std::sync::Arc;

use climscape_storage::{CacheConfig, DirectorySource, SimulationSource};
use tracing::info;

/// All results services over one source, sharing one cache policy.
#[derive(Debug, Clone)]
pub struct SimulationResults {
    pub planes: PlaneResults,
    pub time_series: TimeSeriesResults,
    pub depth_series: DepthSeriesResults,
    pub catalog: ScenarioCatalog,
}

impl SimulationResults {
    pub fn new(source: Arc<dyn SimulationSource>, cache: CacheConfig) -> Self {
        Self {
            planes: PlaneResults::new(Arc::clone(&source), cache.clone()),
            time_series: TimeSeriesResults::new(Arc::clone(&source), cache.clone()),
            depth_series: DepthSeriesResults::new(Arc::clone(&source), cache.clone()),
            catalog: ScenarioCatalog::new(source, cache),
        }
    }

    /// Services reading from the configured data directory.
    pub fn open(config: &ResultsConfig) -> Self {
        info!(
            data_root = %config.data_root.display(),
            max_entries = config.cache.max_entries,
            shards = config.cache.shards,
            ttl_secs = ?config.cache.entry_ttl.map(|t| t.as_secs()),
            "Opening simulation results"
        );
        let source: Arc<dyn SimulationSource> = Arc::new(DirectorySource::new(config.data_root.clone()));
        Self::new(source, config.cache.clone())
    }
}
