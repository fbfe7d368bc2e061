//! Soil depth profiles over time.

use std::sync::Arc;

use async_trait::async_trait;
use climscape_core::{depth_difference, DepthTimeSeries};
use climscape_storage::{CacheConfig, CacheStats, CompositeKey, Fetcher, KeyedCache, SimulationSource};
use futures_util::future::try_join;
use tracing::debug;

use crate::error::{ResultsError, ResultsResult};
use crate::keys::present_tokens;
use crate::resources::{depth_series_path, read_json};

struct DepthFetcher {
    source: Arc<dyn SimulationSource>,
}

#[async_trait]
impl Fetcher<CompositeKey, Arc<DepthTimeSeries>, ResultsError> for DepthFetcher {
    async fn fetch(&self, key: &CompositeKey) -> ResultsResult<Arc<DepthTimeSeries>> {
        let [scenario, variable, point] = present_tokens::<3>(key)?;
        debug!(scenario, variable, point, "loading depth series");
        let series: DepthTimeSeries =
            read_json(self.source.as_ref(), &depth_series_path(scenario, variable, point)).await?;
        Ok(Arc::new(series))
    }
}

/// Cached depth series keyed by `[scenario, variable, point]`.
#[derive(Debug, Clone)]
pub struct DepthSeriesResults {
    series: KeyedCache<CompositeKey, Arc<DepthTimeSeries>, ResultsError>,
}

impl DepthSeriesResults {
    pub fn new(source: Arc<dyn SimulationSource>, config: CacheConfig) -> Self {
        Self {
            series: KeyedCache::new(Arc::new(DepthFetcher { source }), config),
        }
    }

    pub async fn depth_series(
        &self,
        scenario: &str,
        variable: &str,
        point: &str,
    ) -> ResultsResult<Arc<DepthTimeSeries>> {
        let key = CompositeKey::of(&[scenario, variable, point])?;
        Ok(self.series.get(&key).await?)
    }

    pub fn peek_depth_series(
        &self,
        scenario: &str,
        variable: &str,
        point: &str,
    ) -> ResultsResult<Option<Arc<DepthTimeSeries>>> {
        let key = CompositeKey::of(&[scenario, variable, point])?;
        Ok(self.series.get_or_null(&key))
    }

    /// Profile of `B - A` at one probe. Not cached itself; both profiles are.
    pub async fn difference(
        &self,
        scenario_a: &str,
        scenario_b: &str,
        variable: &str,
        point: &str,
    ) -> ResultsResult<DepthTimeSeries> {
        let (a, b) = try_join(
            self.depth_series(scenario_a, variable, point),
            self.depth_series(scenario_b, variable, point),
        )
        .await?;
        Ok(depth_difference(&b, &a)?)
    }

    pub fn stats(&self) -> CacheStats {
        self.series.stats()
    }
}
