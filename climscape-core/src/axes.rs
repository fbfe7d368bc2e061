//! Graph axes of the simulation planes.
//!
//! Grid indices are cell indices; the axes turn them back into model
//! coordinates (meters) so that probe points can be matched to cells.

use serde::{Deserialize, Serialize};

use crate::{ValueRange, VariableAttributes};

/// Z levels of the vertical planes. The vertical grid is stretched, so the
/// levels cannot be derived from a cell size.
pub const VERTICAL_PLANE_Z_LEVELS: [f64; 43] = [
    0.0, 0.4, 0.8, 1.2, 1.6, 2.0, 4.0, 6.0, 8.0, 10.0, 12.0, 14.0, 16.0, 18.0, 20.0, 22.0, 24.0,
    26.0, 28.0, 30.0, 32.0, 34.0, 36.0, 38.0, 40.0, 42.0, 44.0, 46.0, 48.0, 50.0, 52.0, 54.0,
    56.0, 58.0, 60.0, 62.0, 64.0, 66.0, 68.0, 70.0, 72.0, 74.0, 76.0,
];

const CELL_SIZE_M: f64 = 2.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphAxis {
    pub name: String,
    pub unit: String,
    pub cell_size: f64,
    pub min: f64,
    pub max: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values_override: Option<Vec<f64>>,
}

impl GraphAxis {
    fn meters(name: &str, min: f64, max: f64) -> Self {
        Self {
            name: name.to_string(),
            unit: "m".to_string(),
            cell_size: CELL_SIZE_M,
            min,
            max,
            values_override: None,
        }
    }

    /// Model coordinate of the center of cell `index`.
    ///
    /// With an override table, indices past its end have no coordinate.
    pub fn position(&self, index: usize) -> Option<f64> {
        match &self.values_override {
            Some(values) => values.get(index).copied(),
            None => Some(self.min + index as f64 * self.cell_size + self.cell_size / 2.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphAxes {
    pub x: GraphAxis,
    pub y: GraphAxis,
}

impl GraphAxes {
    /// Axes for a plane slug. Vertical planes are cut along Y and Z.
    pub fn for_plane(plane_slug: &str) -> Self {
        if plane_slug.starts_with("vertical") {
            let mut z = GraphAxis::meters("Z", 0.0, 41.0);
            z.values_override = Some(VERTICAL_PLANE_Z_LEVELS.to_vec());
            return Self {
                x: GraphAxis::meters("Y", 0.0, 100.0),
                y: z,
            };
        }

        Self {
            x: GraphAxis::meters("X", 0.0, 100.0),
            y: GraphAxis::meters("Y", 0.0, 100.0),
        }
    }

    pub fn position(&self, index_x: usize, index_y: usize) -> Option<(f64, f64)> {
        Some((self.x.position(index_x)?, self.y.position(index_y)?))
    }
}

/// Color-scale range expected for a variable, before looking at any data.
///
/// A difference between two valid values can span the full width of the
/// valid interval in either direction.
pub fn expected_value_range(variable: &VariableAttributes, difference: bool) -> ValueRange {
    if difference {
        ValueRange::new(
            variable.valid_min - variable.valid_max,
            variable.valid_max - variable.valid_min,
        )
    } else {
        ValueRange::new(variable.valid_min, variable.valid_max)
    }
}
