//! Climscape Test Utilities
//!
//! Shared test infrastructure for the Climscape workspace:
//! - An in-memory simulation source that counts reads
//! - A counting fetcher for cache tests
//! - Proptest generators for grids, series and key tokens
//! - A small fixture dataset laid out like a real export

pub use climscape_core::{
    DepthTimeSeries, Grid, PlaneData, ProbePoint, ScenarioDescription, SourceError, TimeSeries,
    TimeSeriesPoint, ValueRange, VariableAttributes,
};
pub use climscape_storage::{Fetcher, SimulationSource};

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

// ============================================================================
// IN-MEMORY SOURCE
// ============================================================================

/// Simulation source serving documents from memory.
///
/// Every read is counted per path, so tests can assert how often the
/// caches above actually hit the source.
#[derive(Debug, Default)]
pub struct MemorySource {
    documents: Mutex<HashMap<String, Result<Vec<u8>, SourceError>>>,
    reads: Mutex<HashMap<String, usize>>,
    delay: Option<Duration>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every read wait `delay` before answering, so concurrent
    /// requests overlap.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn insert_bytes(&self, path: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.lock_documents().insert(path.into(), Ok(bytes.into()));
    }

    pub fn insert_json(&self, path: impl Into<String>, value: &serde_json::Value) {
        self.insert_bytes(path, value.to_string());
    }

    /// Make reads of `path` fail with `error`.
    pub fn insert_error(&self, path: impl Into<String>, error: SourceError) {
        self.lock_documents().insert(path.into(), Err(error));
    }

    pub fn remove(&self, path: &str) {
        self.lock_documents().remove(path);
    }

    /// Reads of `path` so far.
    pub fn reads(&self, path: &str) -> usize {
        self.lock_reads().get(path).copied().unwrap_or(0)
    }

    pub fn total_reads(&self) -> usize {
        self.lock_reads().values().sum()
    }

    fn lock_documents(&self) -> std::sync::MutexGuard<'_, HashMap<String, Result<Vec<u8>, SourceError>>> {
        self.documents.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_reads(&self) -> std::sync::MutexGuard<'_, HashMap<String, usize>> {
        self.reads.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl SimulationSource for MemorySource {
    async fn read(&self, path: &str) -> Result<Vec<u8>, SourceError> {
        *self.lock_reads().entry(path.to_string()).or_insert(0) += 1;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.lock_documents()
            .get(path)
            .cloned()
            .unwrap_or_else(|| {
                Err(SourceError::NotFound {
                    path: path.to_string(),
                })
            })
    }
}

// ============================================================================
// COUNTING FETCHER
// ============================================================================

/// Fetcher answering from a fixed table and counting calls per key.
#[derive(Debug)]
pub struct CountingFetcher<K, T> {
    values: HashMap<K, T>,
    calls: Mutex<HashMap<K, usize>>,
    total: AtomicUsize,
}

impl<K: Hash + Eq + Clone, T> CountingFetcher<K, T> {
    pub fn new(values: impl IntoIterator<Item = (K, T)>) -> Self {
        Self {
            values: values.into_iter().collect(),
            calls: Mutex::new(HashMap::new()),
            total: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self, key: &K) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<K, T> Fetcher<K, T, String> for CountingFetcher<K, T>
where
    K: Hash + Eq + Clone + Debug + Send + Sync,
    T: Clone + Send + Sync,
{
    async fn fetch(&self, key: &K) -> Result<T, String> {
        self.total.fetch_add(1, Ordering::SeqCst);
        *self
            .calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key.clone())
            .or_insert(0) += 1;
        self.values
            .get(key)
            .cloned()
            .ok_or_else(|| format!("no value for {:?}", key))
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for Climscape data.

    use super::*;
    use proptest::prelude::*;

    /// A cell value: mostly finite, sometimes null.
    pub fn arb_cell() -> impl Strategy<Value = Option<f64>> {
        prop_oneof![
            4 => (-50.0f64..60.0).prop_map(Some),
            1 => Just(None),
        ]
    }

    /// A rectangular grid of `rows x cols` cells.
    pub fn arb_grid_of(rows: usize, cols: usize) -> impl Strategy<Value = Grid> {
        prop::collection::vec(prop::collection::vec(arb_cell(), cols), rows).prop_map(Grid::new)
    }

    /// A rectangular grid of up to 8x8 cells.
    pub fn arb_grid() -> impl Strategy<Value = Grid> {
        (0usize..8, 0usize..8).prop_flat_map(|(rows, cols)| arb_grid_of(rows, cols))
    }

    /// Two grids with the same shape.
    pub fn arb_grid_pair() -> impl Strategy<Value = (Grid, Grid)> {
        (1usize..8, 1usize..8)
            .prop_flat_map(|(rows, cols)| (arb_grid_of(rows, cols), arb_grid_of(rows, cols)))
    }

    /// A time series of `len` hourly samples.
    pub fn arb_time_series(len: usize) -> impl Strategy<Value = TimeSeries> {
        prop::collection::vec(-20.0f64..45.0, len).prop_map(|values| {
            values
                .into_iter()
                .enumerate()
                .map(|(hour, v)| TimeSeriesPoint {
                    t: format!("{:02}:00", hour % 24),
                    v,
                })
                .collect()
        })
    }

    /// A token accepted by the key codec.
    pub fn arb_key_token() -> impl Strategy<Value = String> {
        "[a-zA-Z0-9_.-]{1,12}".prop_filter("sentinel is reserved", |t| t != "_")
    }

    /// An optional key token.
    pub fn arb_optional_token() -> impl Strategy<Value = Option<String>> {
        prop::option::of(arb_key_token())
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub mod fixtures {
    //! A two-scenario dataset laid out like an export.

    use super::*;
    use serde_json::json;

    pub const BASE: &str = "base";
    pub const TREES: &str = "trees";
    pub const COOL_ROOFS: &str = "cool_roofs";
    pub const PLANE: &str = "horizontal_ground";
    pub const TIME: &str = "time_12";
    pub const VARIABLE: &str = "T";
    /// Probe sitting on cell (1, 0) of a horizontal plane.
    pub const POINT: &str = "3_0-1_0-0_0";

    pub fn plane_path(scenario: &str, variable: &str, time: &str, plane: &str) -> String {
        format!("simulation/scenarios/{scenario}/{variable}/{time}/{plane}.json")
    }

    pub fn base_grid() -> Grid {
        Grid::new(vec![vec![Some(20.0), Some(21.0)], vec![Some(22.0), None]])
    }

    pub fn trees_grid() -> Grid {
        Grid::new(vec![vec![Some(19.0), Some(21.0)], vec![Some(23.0), Some(24.0)]])
    }

    pub fn cool_roofs_grid() -> Grid {
        Grid::new(vec![vec![Some(18.5), Some(20.0)], vec![None, Some(25.5)]])
    }

    pub fn series(values: &[f64]) -> TimeSeries {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| TimeSeriesPoint {
                t: format!("{:02}:00", i * 4),
                v: *v,
            })
            .collect()
    }

    fn plane_json(grid: &Grid) -> serde_json::Value {
        json!({ "data": grid })
    }

    fn series_json(series: &TimeSeries) -> serde_json::Value {
        json!(series)
    }

    /// Source holding three scenario planes, time series, a depth profile
    /// and the catalog documents.
    pub fn dataset() -> MemorySource {
        let source = MemorySource::new();
        populate(&source);
        source
    }

    /// Populate `source` with the fixture dataset.
    pub fn populate(source: &MemorySource) {
        for (scenario, grid) in [
            (BASE, base_grid()),
            (TREES, trees_grid()),
            (COOL_ROOFS, cool_roofs_grid()),
        ] {
            source.insert_json(plane_path(scenario, VARIABLE, TIME, PLANE), &plane_json(&grid));
        }

        source.insert_json(
            format!("simulation/scenarios/{BASE}/{VARIABLE}/timeSeries/{POINT}.json"),
            &series_json(&series(&[20.0, 19.0, 24.0])),
        );
        source.insert_json(
            format!("simulation/scenarios/{TREES}/{VARIABLE}/timeSeries/{POINT}.json"),
            &series_json(&series(&[19.5, 19.0, 22.0])),
        );
        source.insert_json(
            format!("simulation/scenarios/{COOL_ROOFS}/{VARIABLE}/timeSeries/{POINT}.json"),
            &series_json(&series(&[19.5, 19.0])),
        );

        for (scenario, profile) in [(BASE, [[14.0, 12.5], [15.0, 12.5]]), (TREES, [[13.0, 12.0], [13.5, 12.5]])] {
            source.insert_json(
                format!("simulation/scenarios/{scenario}/SoilTemp/depthTimeSeries/{POINT}.json"),
                &json!({
                    "requested_coords": { "x": 3.0, "y": 1.0, "z": 0.0 },
                    "true_coords": { "x": 3.0, "y": 1.0, "z": -0.01 },
                    "depths_m": [0.01, 0.5],
                    "data": [
                        { "t": "00:00", "v": profile[0] },
                        { "t": "04:00", "v": profile[1] }
                    ]
                }),
            );
        }

        source.insert_json(
            "simulation/scenarios/scenarios.json",
            &json!([
                {
                    "id": "0",
                    "slug": BASE,
                    "scenario": "Baseline",
                    "description": "Current state of the district",
                    "key_variables_changed": "",
                    "primary_analysis_focus": "Reference",
                    "representative_LCZ": "LCZ 2",
                    "relevant_lectures": []
                },
                {
                    "id": "1",
                    "slug": TREES,
                    "scenario": "Street trees",
                    "description": "Rows of trees along every street",
                    "key_variables_changed": "vegetation",
                    "primary_analysis_focus": "Shading",
                    "representative_LCZ": "LCZ 2",
                    "details": "Deciduous, 12 m crowns",
                    "relevant_lectures": ["vegetation"]
                }
            ]),
        );

        source.insert_json(
            "simulation/variablesAttributes.json",
            &json!({
                "T": {
                    "valid_min": 10.0, "valid_max": 40.0,
                    "long_name": "air temperature", "units": "°C",
                    "emVarDataType": 2, "emVarIdx": 0, "grid_mapping": "crs"
                },
                "RelHum": {
                    "valid_min": 0.0, "valid_max": 100.0,
                    "long_name": "relative humidity", "units": "%",
                    "emVarDataType": 2, "emVarIdx": 1, "grid_mapping": "crs"
                },
                "SoilTemp": {
                    "valid_min": 5.0, "valid_max": 35.0,
                    "long_name": "soil temperature", "units": "°C",
                    "emVarDataType": 2, "emVarIdx": 2, "grid_mapping": "crs"
                }
            }),
        );

        source.insert_json(
            format!("simulation/scenarios/{BASE}/timeSeriesPoints.json"),
            &json!([
                { "c": [3.0, 1.0, 0.0], "v": ["T", "SoilTemp"], "p": PLANE, "s": POINT, "n": "Courtyard" },
                { "c": [51.0, 51.0, 1.4], "v": ["T"], "s": "51_0-51_0-1_4", "n": "Square" }
            ]),
        );
    }
}

// ============================================================================
// ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Approximate comparisons for floating-point results.

    use super::*;

    /// Assert that two ranges agree within `1e-9`.
    #[track_caller]
    pub fn assert_range_close(actual: ValueRange, expected: ValueRange) {
        assert!(
            (actual.min - expected.min).abs() < 1e-9 && (actual.max - expected.max).abs() < 1e-9,
            "Expected {:?}, got {:?}",
            expected,
            actual
        );
    }

    /// Assert that two grids have the same shape and cells agree within `1e-9`.
    #[track_caller]
    pub fn assert_grid_close(actual: &Grid, expected: &Grid) {
        assert_eq!(actual.row_count(), expected.row_count(), "row count differs");
        for (row, (a, e)) in actual.rows().iter().zip(expected.rows()).enumerate() {
            assert_eq!(a.len(), e.len(), "row {} length differs", row);
            for (col, (a, e)) in a.iter().zip(e).enumerate() {
                match (a, e) {
                    (Some(a), Some(e)) => assert!(
                        (a - e).abs() < 1e-9,
                        "cell ({}, {}): expected {}, got {}",
                        row,
                        col,
                        e,
                        a
                    ),
                    (None, None) => {}
                    _ => panic!("cell ({}, {}): expected {:?}, got {:?}", row, col, e, a),
                }
            }
        }
    }
}
