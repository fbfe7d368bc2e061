//! Projection of grids onto heatmap samples.

use serde::{Deserialize, Serialize};

use crate::{GraphAxes, Grid, PointMetadata, ProbePoint};

/// Tolerance when matching a cell center to a probe coordinate.
const COORD_TOLERANCE: f64 = 1e-6;

/// One heatmap cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatmapSample<M> {
    pub x: usize,
    pub y: usize,
    pub value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<M>,
}

/// Resolves optional metadata for grid cell `(row, col)`.
pub trait MetadataLookup {
    type Metadata;

    fn metadata(&self, row: usize, col: usize) -> Option<Self::Metadata>;
}

impl<M, F> MetadataLookup for F
where
    F: Fn(usize, usize) -> Option<M>,
{
    type Metadata = M;

    fn metadata(&self, row: usize, col: usize) -> Option<M> {
        self(row, col)
    }
}

/// Lookup that never attaches metadata.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMetadata;

impl MetadataLookup for NoMetadata {
    type Metadata = ();

    fn metadata(&self, _row: usize, _col: usize) -> Option<()> {
        None
    }
}

/// Row-major iterator over the samples of a grid.
///
/// Holds only a cursor into the borrowed grid. A clone continues
/// independently from the same position; call [`heatmap_samples`] again to
/// start over.
#[derive(Debug)]
pub struct HeatmapSamples<'a, L> {
    grid: &'a Grid,
    flip_x: bool,
    lookup: &'a L,
    row: usize,
    col: usize,
}

impl<L> Clone for HeatmapSamples<'_, L> {
    fn clone(&self) -> Self {
        Self {
            grid: self.grid,
            flip_x: self.flip_x,
            lookup: self.lookup,
            row: self.row,
            col: self.col,
        }
    }
}

impl<'a, L: MetadataLookup> Iterator for HeatmapSamples<'a, L> {
    type Item = HeatmapSample<L::Metadata>;

    fn next(&mut self) -> Option<Self::Item> {
        let rows = self.grid.rows();
        while self.row < rows.len() {
            let row = &rows[self.row];
            if self.col < row.len() {
                let (i, j) = (self.row, self.col);
                self.col += 1;
                let x = if self.flip_x { rows.len() - 1 - i } else { i };
                return Some(HeatmapSample {
                    x,
                    y: j,
                    value: row[j],
                    metadata: self.lookup.metadata(i, j),
                });
            }
            self.row += 1;
            self.col = 0;
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let rows = self.grid.rows();
        let remaining = rows
            .iter()
            .skip(self.row)
            .map(Vec::len)
            .sum::<usize>()
            .saturating_sub(if self.row < rows.len() { self.col } else { 0 });
        (remaining, Some(remaining))
    }
}

impl<L: MetadataLookup> ExactSizeIterator for HeatmapSamples<'_, L> {}

/// Map every cell `(i, j)` of `grid` to a sample at
/// `(flip_x ? rows - 1 - i : i, j)`, in row-major order.
///
/// Metadata is resolved from the original, unflipped indices.
pub fn heatmap_samples<'a, L: MetadataLookup>(
    grid: &'a Grid,
    flip_x: bool,
    lookup: &'a L,
) -> HeatmapSamples<'a, L> {
    HeatmapSamples {
        grid,
        flip_x,
        lookup,
        row: 0,
        col: 0,
    }
}

/// Attaches probe-point metadata to the cells whose centers coincide with a
/// probe of the scenario.
#[derive(Debug, Clone)]
pub struct PointMetadataLookup {
    axes: GraphAxes,
    points: Vec<ProbePoint>,
}

impl PointMetadataLookup {
    pub fn new(axes: GraphAxes, points: Vec<ProbePoint>) -> Self {
        Self { axes, points }
    }

    /// Lookup for a plane slug, using the plane's graph axes.
    pub fn for_plane(plane_slug: &str, points: Vec<ProbePoint>) -> Self {
        Self::new(GraphAxes::for_plane(plane_slug), points)
    }

    pub fn points(&self) -> &[ProbePoint] {
        &self.points
    }
}

impl MetadataLookup for PointMetadataLookup {
    type Metadata = PointMetadata;

    fn metadata(&self, row: usize, col: usize) -> Option<PointMetadata> {
        let (x, y) = self.axes.position(row, col)?;
        self.points
            .iter()
            .find(|p| {
                (p.coords[0] - x).abs() < COORD_TOLERANCE && (p.coords[1] - y).abs() < COORD_TOLERANCE
            })
            .map(PointMetadata::from)
    }
}
