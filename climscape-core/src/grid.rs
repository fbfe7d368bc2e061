//! Plane grids and the combinators used to compare them.
//!
//! A [`Grid`] is one simulation result slice: a rectangular, row-major
//! array of optional samples. Producers guarantee the rectangular shape;
//! only [`difference`] checks it.

use serde::{Deserialize, Serialize};

use crate::ShapeError;

/// Range returned for a grid without any usable sample.
pub const FALLBACK_RANGE: ValueRange = ValueRange {
    min: 0.0,
    max: 100.0,
};

/// Half-width added around a degenerate range.
pub const DEGENERATE_EPSILON: f64 = 0.1;

/// Rectangular 2D array of optional samples, row-major.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Grid {
    rows: Vec<Vec<Option<f64>>>,
}

impl Grid {
    pub fn new(rows: Vec<Vec<Option<f64>>>) -> Self {
        Self { rows }
    }

    /// Build a grid without nulls.
    pub fn from_values(rows: Vec<Vec<f64>>) -> Self {
        Self {
            rows: rows
                .into_iter()
                .map(|row| row.into_iter().map(Some).collect())
                .collect(),
        }
    }

    /// Number of rows (first index).
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Length of the first row, zero for an empty grid.
    pub fn column_count(&self) -> usize {
        self.rows.first().map(Vec::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(Vec::is_empty)
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        self.rows.get(row).and_then(|r| r.get(col)).copied().flatten()
    }

    pub fn rows(&self) -> &[Vec<Option<f64>>] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Vec<Option<f64>>> {
        self.rows
    }

    /// Iterate over every cell as `(row, col, value)` in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize, Option<f64>)> + '_ {
        self.rows
            .iter()
            .enumerate()
            .flat_map(|(i, row)| row.iter().enumerate().map(move |(j, v)| (i, j, *v)))
    }
}

impl From<Vec<Vec<Option<f64>>>> for Grid {
    fn from(rows: Vec<Vec<Option<f64>>>) -> Self {
        Self::new(rows)
    }
}

/// JSON document for one scenario / plane / time slice / variable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaneData {
    pub data: Grid,
}

/// Closed numeric interval used to drive color scales.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

impl ValueRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Smallest range covering both.
    pub fn union(self, other: ValueRange) -> ValueRange {
        ValueRange {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Widen a degenerate range so that `min < max`.
    fn widened(self) -> ValueRange {
        if self.min == self.max {
            ValueRange {
                min: self.min - DEGENERATE_EPSILON,
                max: self.max + DEGENERATE_EPSILON,
            }
        } else {
            self
        }
    }
}

/// Extrema of the finite cells, or `None` when the grid has none.
fn finite_range(grid: &Grid) -> Option<ValueRange> {
    grid.rows
        .iter()
        .flatten()
        .flatten()
        .copied()
        .filter(|v| v.is_finite())
        .fold(None, |range, value| {
            Some(match range {
                None => ValueRange::new(value, value),
                Some(r) => ValueRange::new(r.min.min(value), r.max.max(value)),
            })
        })
}

/// Scan the non-null, finite cells of a grid.
///
/// Returns [`FALLBACK_RANGE`] when no such cell exists. A single-valued
/// grid is widened by [`DEGENERATE_EPSILON`] on both ends so color-scale
/// interpolation stays well-defined.
pub fn min_max(grid: &Grid) -> ValueRange {
    finite_range(grid)
        .map(ValueRange::widened)
        .unwrap_or(FALLBACK_RANGE)
}

/// Global extrema over several grids, folding [`min_max`] over each.
///
/// Grids without a finite cell do not take part in the fold; when every
/// grid is like that the result is [`FALLBACK_RANGE`]. Returns `None` for
/// an empty slice: there is no meaningful range to report and callers
/// must decide what to display.
pub fn min_max_across(grids: &[&Grid]) -> Option<ValueRange> {
    if grids.is_empty() {
        return None;
    }
    let range = grids
        .iter()
        .filter_map(|g| finite_range(g).map(ValueRange::widened))
        .reduce(ValueRange::union);
    Some(range.unwrap_or(FALLBACK_RANGE))
}

/// Elementwise `lhs - rhs`.
///
/// A cell is null whenever either operand is null. Comparing scenarios
/// always passes B first, so positive values mean B exceeds A.
pub fn difference(lhs: &Grid, rhs: &Grid) -> Result<Grid, ShapeError> {
    if lhs.rows.len() != rhs.rows.len() {
        return Err(ShapeError::RowCount {
            left: lhs.rows.len(),
            right: rhs.rows.len(),
        });
    }

    let mut rows = Vec::with_capacity(lhs.rows.len());
    for (i, (l, r)) in lhs.rows.iter().zip(&rhs.rows).enumerate() {
        if l.len() != r.len() {
            return Err(ShapeError::RowLength {
                row: i,
                left: l.len(),
                right: r.len(),
            });
        }
        rows.push(
            l.iter()
                .zip(r)
                .map(|(a, b)| match (a, b) {
                    (Some(a), Some(b)) => Some(a - b),
                    _ => None,
                })
                .collect(),
        );
    }

    Ok(Grid { rows })
}
