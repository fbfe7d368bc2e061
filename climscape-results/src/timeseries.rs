//! Probe time series per scenario and their comparisons.

use std::sync::Arc;

use async_trait::async_trait;
use climscape_core::{series_difference, DisplayMode, TimeSeries, TimeSeriesPoint};
use climscape_storage::{CacheConfig, CacheStats, CompositeKey, Fetcher, KeyedCache, SimulationSource};
use futures_util::future::try_join;
use tracing::debug;

use crate::error::{ResultsError, ResultsResult};
use crate::keys::{comparison_tokens, present_tokens};
use crate::resources::{read_json, time_series_path};

/// Series of scenario A, optionally B, and `B - A`.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesComparison {
    pub scenario_a: Arc<TimeSeries>,
    pub scenario_b: Option<Arc<TimeSeries>>,
    pub difference: Option<TimeSeries>,
}

impl SeriesComparison {
    pub fn series(&self, mode: DisplayMode) -> Option<&[TimeSeriesPoint]> {
        match mode {
            DisplayMode::ScenarioA => Some(self.scenario_a.as_slice()),
            DisplayMode::ScenarioB => self.scenario_b.as_deref().map(Vec::as_slice),
            DisplayMode::Difference => self.difference.as_deref(),
        }
    }
}

fn series_key(scenario: &str, variable: &str, point: &str) -> ResultsResult<CompositeKey> {
    Ok(CompositeKey::of(&[scenario, variable, point])?)
}

struct SeriesFetcher {
    source: Arc<dyn SimulationSource>,
}

#[async_trait]
impl Fetcher<CompositeKey, Arc<TimeSeries>, ResultsError> for SeriesFetcher {
    async fn fetch(&self, key: &CompositeKey) -> ResultsResult<Arc<TimeSeries>> {
        let [scenario, variable, point] = present_tokens::<3>(key)?;
        debug!(scenario, variable, point, "loading time series");
        let series: TimeSeries =
            read_json(self.source.as_ref(), &time_series_path(scenario, variable, point)).await?;
        Ok(Arc::new(series))
    }
}

struct SeriesComparisonFetcher {
    series: KeyedCache<CompositeKey, Arc<TimeSeries>, ResultsError>,
}

#[async_trait]
impl Fetcher<CompositeKey, Arc<SeriesComparison>, ResultsError> for SeriesComparisonFetcher {
    async fn fetch(&self, key: &CompositeKey) -> ResultsResult<Arc<SeriesComparison>> {
        let (scenario_a, scenario_b, rest) = comparison_tokens::<4>(key)?;
        let (variable, point) = (rest[0], rest[1]);
        let key_a = series_key(scenario_a, variable, point)?;
        let key_b = scenario_b
            .map(|b| series_key(b, variable, point))
            .transpose()?;

        let (series_a, series_b) = try_join(
            async { self.series.get(&key_a).await.map_err(ResultsError::from) },
            async {
                match &key_b {
                    Some(key) => self.series.get(key).await.map(Some).map_err(ResultsError::from),
                    None => Ok(None),
                }
            },
        )
        .await?;

        let difference = match &series_b {
            Some(b) => Some(series_difference(b, &series_a)?),
            None => None,
        };

        Ok(Arc::new(SeriesComparison {
            scenario_a: series_a,
            scenario_b: series_b,
            difference,
        }))
    }

    /// Mismatched shapes are reported to the caller but not stored.
    fn retain_error(&self, error: &ResultsError) -> bool {
        !matches!(error, ResultsError::Shape(_))
    }
}

/// Cached access to probe time series.
#[derive(Debug, Clone)]
pub struct TimeSeriesResults {
    series: KeyedCache<CompositeKey, Arc<TimeSeries>, ResultsError>,
    comparisons: KeyedCache<CompositeKey, Arc<SeriesComparison>, ResultsError>,
}

impl TimeSeriesResults {
    pub fn new(source: Arc<dyn SimulationSource>, config: CacheConfig) -> Self {
        let series = KeyedCache::new(Arc::new(SeriesFetcher { source }), config.clone());
        let comparisons = KeyedCache::new(
            Arc::new(SeriesComparisonFetcher {
                series: series.clone(),
            }),
            config,
        );
        Self {
            series,
            comparisons,
        }
    }

    pub async fn scenario_series(
        &self,
        scenario: &str,
        variable: &str,
        point: &str,
    ) -> ResultsResult<Arc<TimeSeries>> {
        Ok(self.series.get(&series_key(scenario, variable, point)?).await?)
    }

    pub async fn comparison(
        &self,
        scenario_a: &str,
        scenario_b: Option<&str>,
        variable: &str,
        point: &str,
    ) -> ResultsResult<Arc<SeriesComparison>> {
        let key = CompositeKey::new([Some(scenario_a), scenario_b, Some(variable), Some(point)])?;
        Ok(self.comparisons.get(&key).await?)
    }

    pub fn peek_comparison(
        &self,
        scenario_a: &str,
        scenario_b: Option<&str>,
        variable: &str,
        point: &str,
    ) -> ResultsResult<Option<Arc<SeriesComparison>>> {
        let key = CompositeKey::new([Some(scenario_a), scenario_b, Some(variable), Some(point)])?;
        Ok(self.comparisons.get_or_null(&key))
    }

    pub fn series_stats(&self) -> CacheStats {
        self.series.stats()
    }
}
