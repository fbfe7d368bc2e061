//! Plane results: raw scenario grids and A/B comparisons.
//!
//! Two caches are layered. The scenario cache holds one [`PlaneData`] per
//! `[scenario, plane, time, variable]`; the comparison cache holds one
//! [`PlaneComparison`] per `[scenarioA, scenarioB?, plane, time, variable]`
//! and builds it from the scenario cache. A grid shared by several
//! comparisons is therefore read from the source once.

use std::sync::Arc;

use async_trait::async_trait;
use climscape_core::{
    difference, heatmap_samples, min_max, min_max_across, variable_for_plane_or_fallback,
    DisplayMode, GraphAxes, Grid, HeatmapSamples, MetadataLookup, PlaneData, PlanePreset,
    TimeSlot, ValueRange,
};
use climscape_storage::{CacheConfig, CacheStats, CompositeKey, Fetcher, KeyedCache, SimulationSource};
use futures_util::future::{try_join, try_join_all};
use tracing::debug;

use crate::error::{ResultsError, ResultsResult};
use crate::keys::{comparison_tokens, present_tokens};
use crate::resources::{plane_path, read_json};

/// Plane, time slice and variable of a plane request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlaneSelector {
    pub plane: String,
    pub time: String,
    pub variable: String,
}

impl PlaneSelector {
    pub fn new(
        plane: impl Into<String>,
        time: impl Into<String>,
        variable: impl Into<String>,
    ) -> Self {
        Self {
            plane: plane.into(),
            time: time.into(),
            variable: variable.into(),
        }
    }

    /// Selector for a preset plane, substituting a variable the plane
    /// actually has data for.
    pub fn from_preset(plane: PlanePreset, time: TimeSlot, variable: Option<&str>) -> Self {
        Self::new(
            plane.slug(),
            time.time_slug,
            variable_for_plane_or_fallback(plane, variable),
        )
    }

    fn scenario_key(&self, scenario: &str) -> ResultsResult<CompositeKey> {
        Ok(CompositeKey::of(&[
            scenario,
            self.plane.as_str(),
            self.time.as_str(),
            self.variable.as_str(),
        ])?)
    }

    fn comparison_key(&self, scenario_a: &str, scenario_b: Option<&str>) -> ResultsResult<CompositeKey> {
        Ok(CompositeKey::new([
            Some(scenario_a),
            scenario_b,
            Some(self.plane.as_str()),
            Some(self.time.as_str()),
            Some(self.variable.as_str()),
        ])?)
    }
}

/// Everything needed to draw one plane in any [`DisplayMode`].
#[derive(Debug, Clone, PartialEq)]
pub struct PlaneComparison {
    pub axes: GraphAxes,
    pub scenario_a: Arc<PlaneData>,
    pub scenario_b: Option<Arc<PlaneData>>,
    /// `B - A`, present whenever B is.
    pub difference: Option<Grid>,
}

impl PlaneComparison {
    /// Grid shown in `mode`, `None` when the mode needs a scenario B that
    /// was not requested.
    pub fn grid(&self, mode: DisplayMode) -> Option<&Grid> {
        match mode {
            DisplayMode::ScenarioA => Some(&self.scenario_a.data),
            DisplayMode::ScenarioB => self.scenario_b.as_deref().map(|p| &p.data),
            DisplayMode::Difference => self.difference.as_ref(),
        }
    }

    pub fn value_range(&self, mode: DisplayMode) -> Option<ValueRange> {
        self.grid(mode).map(min_max)
    }

    /// Range covering both scenarios, so A and B can share a color scale.
    pub fn scenarios_range(&self) -> ValueRange {
        let mut grids = vec![&self.scenario_a.data];
        grids.extend(self.scenario_b.as_deref().map(|p| &p.data));
        min_max_across(&grids).unwrap_or_else(|| min_max(&self.scenario_a.data))
    }

    /// Heatmap samples of the grid shown in `mode`.
    pub fn heatmap<'a, L: MetadataLookup>(
        &'a self,
        mode: DisplayMode,
        flip_x: bool,
        lookup: &'a L,
    ) -> Option<HeatmapSamples<'a, L>> {
        self.grid(mode)
            .map(|grid| heatmap_samples(grid, flip_x, lookup))
    }
}

struct PlaneFetcher {
    source: Arc<dyn SimulationSource>,
}

#[async_trait]
impl Fetcher<CompositeKey, Arc<PlaneData>, ResultsError> for PlaneFetcher {
    async fn fetch(&self, key: &CompositeKey) -> ResultsResult<Arc<PlaneData>> {
        let [scenario, plane, time, variable] = present_tokens::<4>(key)?;
        let path = plane_path(scenario, variable, time, plane);
        debug!(scenario, plane, time, variable, "loading plane");
        let plane: PlaneData = read_json(self.source.as_ref(), &path).await?;
        Ok(Arc::new(plane))
    }
}

struct ComparisonFetcher {
    scenarios: KeyedCache<CompositeKey, Arc<PlaneData>, ResultsError>,
}

#[async_trait]
impl Fetcher<CompositeKey, Arc<PlaneComparison>, ResultsError> for ComparisonFetcher {
    async fn fetch(&self, key: &CompositeKey) -> ResultsResult<Arc<PlaneComparison>> {
        let (scenario_a, scenario_b, rest) = comparison_tokens::<5>(key)?;
        let selector = PlaneSelector::new(rest[0], rest[1], rest[2]);
        let key_a = selector.scenario_key(scenario_a)?;
        let key_b = scenario_b.map(|b| selector.scenario_key(b)).transpose()?;

        let fetch_a = async { self.scenarios.get(&key_a).await.map_err(ResultsError::from) };
        let fetch_b = async {
            match &key_b {
                Some(key) => self.scenarios.get(key).await.map(Some).map_err(ResultsError::from),
                None => Ok(None),
            }
        };
        let (plane_a, plane_b) = try_join(fetch_a, fetch_b).await?;

        let difference = match &plane_b {
            Some(b) => Some(difference(&b.data, &plane_a.data)?),
            None => None,
        };

        Ok(Arc::new(PlaneComparison {
            axes: GraphAxes::for_plane(&selector.plane),
            scenario_a: plane_a,
            scenario_b: plane_b,
            difference,
        }))
    }

    /// Mismatched shapes are reported to the caller but not stored.
    fn retain_error(&self, error: &ResultsError) -> bool {
        !matches!(error, ResultsError::Shape(_))
    }
}

/// Cached access to plane grids and their comparisons.
#[derive(Debug, Clone)]
pub struct PlaneResults {
    scenarios: KeyedCache<CompositeKey, Arc<PlaneData>, ResultsError>,
    comparisons: KeyedCache<CompositeKey, Arc<PlaneComparison>, ResultsError>,
}

impl PlaneResults {
    pub fn new(source: Arc<dyn SimulationSource>, config: CacheConfig) -> Self {
        let scenarios = KeyedCache::new(Arc::new(PlaneFetcher { source }), config.clone());
        let comparisons = KeyedCache::new(
            Arc::new(ComparisonFetcher {
                scenarios: scenarios.clone(),
            }),
            config,
        );
        Self {
            scenarios,
            comparisons,
        }
    }

    /// Raw grid of one scenario.
    pub async fn scenario_plane(
        &self,
        scenario: &str,
        selector: &PlaneSelector,
    ) -> ResultsResult<Arc<PlaneData>> {
        let key = selector.scenario_key(scenario)?;
        Ok(self.scenarios.get(&key).await?)
    }

    /// Comparison bundle for scenario A and, optionally, scenario B.
    pub async fn comparison(
        &self,
        scenario_a: &str,
        scenario_b: Option<&str>,
        selector: &PlaneSelector,
    ) -> ResultsResult<Arc<PlaneComparison>> {
        let key = selector.comparison_key(scenario_a, scenario_b)?;
        Ok(self.comparisons.get(&key).await?)
    }

    /// Comparison bundle if it is already cached. Never reads the source.
    pub fn peek_comparison(
        &self,
        scenario_a: &str,
        scenario_b: Option<&str>,
        selector: &PlaneSelector,
    ) -> ResultsResult<Option<Arc<PlaneComparison>>> {
        let key = selector.comparison_key(scenario_a, scenario_b)?;
        Ok(self.comparisons.get_or_null(&key))
    }

    /// Range covering the grids of every listed scenario; `None` when no
    /// scenario is listed.
    pub async fn min_max_for_scenarios<S: AsRef<str>>(
        &self,
        scenarios: &[S],
        selector: &PlaneSelector,
    ) -> ResultsResult<Option<ValueRange>> {
        let keys = scenarios
            .iter()
            .map(|s| selector.scenario_key(s.as_ref()))
            .collect::<ResultsResult<Vec<_>>>()?;
        let planes = try_join_all(keys.iter().map(|key| self.scenarios.get(key))).await?;
        let grids: Vec<&Grid> = planes.iter().map(|p| &p.data).collect();
        Ok(min_max_across(&grids))
    }

    pub fn scenario_stats(&self) -> CacheStats {
        self.scenarios.stats()
    }

    pub fn comparison_stats(&self) -> CacheStats {
        self.comparisons.stats()
    }
}
