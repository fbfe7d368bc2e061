//! Selector presets: planes, time slots, variable fallbacks, point slugs.

use serde::{Deserialize, Serialize};

/// Height of the human-height plane as stored in the NetCDF export.
pub const HUMAN_HEIGHT_M: f64 = 1.4000000953674316;

/// Variable shown on planes that only cut through the soil.
pub const SOIL_TEMPERATURE: &str = "SoilTemp";

/// Default atmospheric variable.
pub const AIR_TEMPERATURE: &str = "T";

/// Cutting planes exported for every scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanePreset {
    HorizontalGround,
    HorizontalHumanHeight,
    HorizontalBuildingCanopy,
    VerticalMidCanyon,
    VerticalMidBuilding,
    HorizontalUnderground,
    HorizontalUndergroundDeep,
    VerticalMidCanyonUnderground,
    VerticalMidBuildingUnderground,
}

impl PlanePreset {
    pub const ALL: [PlanePreset; 9] = [
        PlanePreset::HorizontalGround,
        PlanePreset::HorizontalHumanHeight,
        PlanePreset::HorizontalBuildingCanopy,
        PlanePreset::VerticalMidCanyon,
        PlanePreset::VerticalMidBuilding,
        PlanePreset::HorizontalUnderground,
        PlanePreset::HorizontalUndergroundDeep,
        PlanePreset::VerticalMidCanyonUnderground,
        PlanePreset::VerticalMidBuildingUnderground,
    ];

    pub fn slug(self) -> &'static str {
        match self {
            PlanePreset::HorizontalGround => "horizontal_ground",
            PlanePreset::HorizontalHumanHeight => "horizontal_human_height",
            PlanePreset::HorizontalBuildingCanopy => "horizontal_building_canopy",
            PlanePreset::VerticalMidCanyon => "vertical_mid_canyon",
            PlanePreset::VerticalMidBuilding => "vertical_mid_building",
            PlanePreset::HorizontalUnderground => "horizontal_underground",
            PlanePreset::HorizontalUndergroundDeep => "horizontal_underground_deep",
            PlanePreset::VerticalMidCanyonUnderground => "vertical_mid_canyon_underground",
            PlanePreset::VerticalMidBuildingUnderground => "vertical_mid_building_underground",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.slug() == slug)
    }

    pub fn is_vertical(self) -> bool {
        self.slug().starts_with("vertical")
    }

    /// Heights (meters, negative below ground) at which this plane has data.
    pub fn height_levels(self) -> &'static [f64] {
        match self {
            PlanePreset::HorizontalGround => &[0.2],
            PlanePreset::HorizontalHumanHeight => &[HUMAN_HEIGHT_M],
            PlanePreset::HorizontalBuildingCanopy => &[17.0, 31.0],
            PlanePreset::VerticalMidCanyon | PlanePreset::VerticalMidBuilding => {
                &[0.2, HUMAN_HEIGHT_M, 17.0, 31.0]
            }
            PlanePreset::HorizontalUnderground => &[-0.25],
            PlanePreset::HorizontalUndergroundDeep => &[-1.25],
            PlanePreset::VerticalMidCanyonUnderground
            | PlanePreset::VerticalMidBuildingUnderground => &[-0.25, -1.25],
        }
    }

    /// True when no level of the plane is above ground.
    pub fn is_underground(self) -> bool {
        !self.height_levels().iter().any(|h| *h > 0.0)
    }
}

/// Pick a variable the plane actually has data for.
///
/// Underground planes only carry soil temperature; soil temperature is
/// meaningless above ground and falls back to air temperature.
pub fn variable_for_plane_or_fallback(plane: PlanePreset, variable: Option<&str>) -> &str {
    if plane.is_underground() {
        return SOIL_TEMPERATURE;
    }
    match variable {
        Some(SOIL_TEMPERATURE) | None => AIR_TEMPERATURE,
        Some(v) => v,
    }
}

/// An exported time slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeSlot {
    pub label: &'static str,
    pub time_slug: &'static str,
}

/// Time slices exported every four hours over one simulated day.
pub fn time_slots() -> [TimeSlot; 6] {
    [
        TimeSlot { label: "00:00", time_slug: "time_0" },
        TimeSlot { label: "04:00", time_slug: "time_4" },
        TimeSlot { label: "08:00", time_slug: "time_8" },
        TimeSlot { label: "12:00", time_slug: "time_12" },
        TimeSlot { label: "16:00", time_slug: "time_16" },
        TimeSlot { label: "20:00", time_slug: "time_20" },
    ]
}

fn coordinate_slug(value: f64) -> String {
    if value.fract() == 0.0 && value.is_finite() {
        format!("{}_0", value as i64)
    } else {
        value.to_string().replace('.', "_")
    }
}

/// Slug of a probe point, as used in time-series file names.
///
/// Integers print with a `_0` suffix, decimals swap the dot for an
/// underscore: `(1, 2.5, 0)` becomes `1_0-2_5-0_0`.
pub fn point_slug(x: f64, y: f64, z: f64) -> String {
    format!(
        "{}-{}-{}",
        coordinate_slug(x),
        coordinate_slug(y),
        coordinate_slug(z)
    )
}
