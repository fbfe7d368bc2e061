//! Climscape Core - Simulation Result Types
//!
//! Grids, time series, catalog documents and the pure combinators that
//! derive comparison data from them. No I/O and no caching: every other
//! crate depends on this one.

pub mod axes;
pub mod catalog;
pub mod error;
pub mod grid;
pub mod heatmap;
pub mod presets;
pub mod series;

pub use axes::{expected_value_range, GraphAxes, GraphAxis, VERTICAL_PLANE_Z_LEVELS};
pub use catalog::{PointMetadata, ProbePoint, ScenarioDescription, SluggedVariable, VariableAttributes};
pub use error::{ConfigError, EncodingError, ShapeError, SourceError};
pub use grid::{
    difference, min_max, min_max_across, Grid, PlaneData, ValueRange, DEGENERATE_EPSILON,
    FALLBACK_RANGE,
};
pub use heatmap::{
    heatmap_samples, HeatmapSample, HeatmapSamples, MetadataLookup, NoMetadata,
    PointMetadataLookup,
};
pub use presets::{
    point_slug, time_slots, variable_for_plane_or_fallback, PlanePreset, TimeSlot,
    AIR_TEMPERATURE, HUMAN_HEIGHT_M, SOIL_TEMPERATURE,
};
pub use series::{
    depth_difference, series_difference, DepthPoint, DepthTimeSeries, ProbeCoords, TimeSeries,
    TimeSeriesPoint,
};

use serde::{Deserialize, Serialize};

// ============================================================================
// DISPLAY MODES
// ============================================================================

/// Which dataset of a comparison bundle is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DisplayMode {
    ScenarioA,
    ScenarioB,
    Difference,
}

impl DisplayMode {
    pub const ALL: [DisplayMode; 3] = [
        DisplayMode::ScenarioA,
        DisplayMode::ScenarioB,
        DisplayMode::Difference,
    ];

    /// True for modes that need a second scenario.
    pub fn needs_comparison(self) -> bool {
        !matches!(self, DisplayMode::ScenarioA)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_mode_serde_names() {
        assert_eq!(
            serde_json::to_string(&DisplayMode::ScenarioB).unwrap(),
            "\"scenarioB\""
        );
        let mode: DisplayMode = serde_json::from_str("\"difference\"").unwrap();
        assert_eq!(mode, DisplayMode::Difference);
    }

    #[test]
    fn test_display_mode_needs_comparison() {
        assert!(!DisplayMode::ScenarioA.needs_comparison());
        assert!(DisplayMode::Difference.needs_comparison());
    }
}
