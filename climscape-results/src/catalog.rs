//! Scenario descriptions, variable attributes and probe points.

use std::collections::BTreeMap;
use std::sync::Arc;

use climscape_core::{PointMetadataLookup, ProbePoint, ScenarioDescription, SluggedVariable, VariableAttributes};
use climscape_storage::{fetch_fn, CacheConfig, KeyedCache, SimulationSource};
use tracing::debug;

use crate::error::{ResultsError, ResultsResult};
use crate::resources::{read_json, time_series_points_path, SCENARIOS_PATH, VARIABLES_PATH};

pub type VariableMap = BTreeMap<String, VariableAttributes>;

/// Catalog documents, each fetched once per cache lifetime.
#[derive(Debug, Clone)]
pub struct ScenarioCatalog {
    descriptions: KeyedCache<(), Arc<Vec<ScenarioDescription>>, ResultsError>,
    variables: KeyedCache<(), Arc<VariableMap>, ResultsError>,
    points: KeyedCache<String, Arc<Vec<ProbePoint>>, ResultsError>,
}

impl ScenarioCatalog {
    pub fn new(source: Arc<dyn SimulationSource>, config: CacheConfig) -> Self {
        let descriptions: KeyedCache<(), Arc<Vec<ScenarioDescription>>, ResultsError> = {
            let source = Arc::clone(&source);
            KeyedCache::new(
                Arc::new(fetch_fn(move |()| {
                    let source = Arc::clone(&source);
                    async move {
                        debug!("loading scenario descriptions");
                        let list: Vec<ScenarioDescription> =
                            read_json(source.as_ref(), SCENARIOS_PATH).await?;
                        Ok::<_, ResultsError>(Arc::new(list))
                    }
                })),
                config.clone(),
            )
        };

        let variables: KeyedCache<(), Arc<VariableMap>, ResultsError> = {
            let source = Arc::clone(&source);
            KeyedCache::new(
                Arc::new(fetch_fn(move |()| {
                    let source = Arc::clone(&source);
                    async move {
                        debug!("loading variable attributes");
                        let map: VariableMap = read_json(source.as_ref(), VARIABLES_PATH).await?;
                        Ok::<_, ResultsError>(Arc::new(map))
                    }
                })),
                config.clone(),
            )
        };

        let points: KeyedCache<String, Arc<Vec<ProbePoint>>, ResultsError> = KeyedCache::new(
            Arc::new(fetch_fn(move |scenario: String| {
                let source = Arc::clone(&source);
                async move {
                    debug!(scenario = %scenario, "loading time series points");
                    let points: Vec<ProbePoint> =
                        read_json(source.as_ref(), &time_series_points_path(&scenario)).await?;
                    Ok::<_, ResultsError>(Arc::new(points))
                }
            })),
            config,
        );

        Self {
            descriptions,
            variables,
            points,
        }
    }

    pub async fn scenario_descriptions(&self) -> ResultsResult<Arc<Vec<ScenarioDescription>>> {
        Ok(self.descriptions.get(&()).await?)
    }

    pub async fn scenario_by_slug(&self, slug: &str) -> ResultsResult<ScenarioDescription> {
        self.scenario_descriptions()
            .await?
            .iter()
            .find(|s| s.slug == slug)
            .cloned()
            .ok_or_else(|| ResultsError::UnknownScenario {
                slug: slug.to_string(),
            })
    }

    /// Attributes keyed by variable slug.
    pub async fn variables(&self) -> ResultsResult<Arc<VariableMap>> {
        Ok(self.variables.get(&()).await?)
    }

    /// Attributes with their slug, sorted by slug.
    pub async fn variables_list(&self) -> ResultsResult<Vec<SluggedVariable>> {
        Ok(self
            .variables()
            .await?
            .iter()
            .map(|(slug, attributes)| SluggedVariable {
                slug: slug.clone(),
                attributes: attributes.clone(),
            })
            .collect())
    }

    pub async fn time_series_points(&self, scenario: &str) -> ResultsResult<Arc<Vec<ProbePoint>>> {
        Ok(self.points.get(&scenario.to_string()).await?)
    }

    /// Heatmap metadata lookup placing the scenario's probes on `plane`.
    pub async fn metadata_lookup(
        &self,
        scenario: &str,
        plane: &str,
    ) -> ResultsResult<PointMetadataLookup> {
        let points = self.time_series_points(scenario).await?;
        Ok(PointMetadataLookup::for_plane(plane, points.as_ref().clone()))
    }
}
