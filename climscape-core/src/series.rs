//! Time series at probe points and their differences.

use serde::{Deserialize, Serialize};

use crate::ShapeError;

/// One sample of a time series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    /// Timestamp label as produced by the simulation export.
    pub t: String,
    pub v: f64,
}

/// Ordered samples, index-aligned across scenarios.
pub type TimeSeries = Vec<TimeSeriesPoint>;

/// Requested or snapped coordinates of a probe.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProbeCoords {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// One sample of a depth profile: one value per depth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepthPoint {
    pub t: String,
    pub v: Vec<f64>,
}

/// Soil profile over time at a probe point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepthTimeSeries {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_coords: Option<ProbeCoords>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub true_coords: Option<ProbeCoords>,
    pub depths_m: Vec<f64>,
    pub data: Vec<DepthPoint>,
}

/// Elementwise `lhs - rhs`, keeping the timestamps of `lhs`.
///
/// Same sign convention as [`crate::difference`]: scenario comparisons pass
/// B first.
pub fn series_difference(lhs: &[TimeSeriesPoint], rhs: &[TimeSeriesPoint]) -> Result<TimeSeries, ShapeError> {
    if lhs.len() != rhs.len() {
        return Err(ShapeError::SeriesLength {
            left: lhs.len(),
            right: rhs.len(),
        });
    }

    Ok(lhs
        .iter()
        .zip(rhs)
        .map(|(l, r)| TimeSeriesPoint {
            t: l.t.clone(),
            v: l.v - r.v,
        })
        .collect())
}

/// Elementwise `lhs - rhs` of two depth profiles sampled at the same depths.
pub fn depth_difference(lhs: &DepthTimeSeries, rhs: &DepthTimeSeries) -> Result<DepthTimeSeries, ShapeError> {
    if lhs.data.len() != rhs.data.len() {
        return Err(ShapeError::SeriesLength {
            left: lhs.data.len(),
            right: rhs.data.len(),
        });
    }

    let mut data = Vec::with_capacity(lhs.data.len());
    for (row, (l, r)) in lhs.data.iter().zip(&rhs.data).enumerate() {
        if l.v.len() != r.v.len() {
            return Err(ShapeError::RowLength {
                row,
                left: l.v.len(),
                right: r.v.len(),
            });
        }
        data.push(DepthPoint {
            t: l.t.clone(),
            v: l.v.iter().zip(&r.v).map(|(a, b)| a - b).collect(),
        });
    }

    Ok(DepthTimeSeries {
        requested_coords: lhs.requested_coords,
        true_coords: lhs.true_coords,
        depths_m: lhs.depths_m.clone(),
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(values: &[(&str, f64)]) -> TimeSeries {
        values
            .iter()
            .map(|(t, v)| TimeSeriesPoint {
                t: t.to_string(),
                v: *v,
            })
            .collect()
    }

    #[test]
    fn test_series_difference_b_minus_a() {
        let a = series(&[("00:00", 20.0), ("01:00", 21.5)]);
        let b = series(&[("00:00", 22.0), ("01:00", 21.0)]);

        let diff = series_difference(&b, &a).unwrap();
        assert_eq!(diff, series(&[("00:00", 2.0), ("01:00", -0.5)]));
    }

    #[test]
    fn test_series_difference_length_mismatch() {
        let a = series(&[("00:00", 1.0)]);
        let b = series(&[("00:00", 1.0), ("01:00", 2.0)]);
        assert_eq!(
            series_difference(&a, &b),
            Err(ShapeError::SeriesLength { left: 1, right: 2 })
        );
    }

    #[test]
    fn test_depth_series_json_and_difference() {
        let a: DepthTimeSeries = serde_json::from_str(
            r#"{"true_coords": {"x": 1, "y": 2, "z": -0.5},
                "depths_m": [0.1, 0.5],
                "data": [{"t": "00:00", "v": [10.0, 12.0]}]}"#,
        )
        .unwrap();
        let mut b = a.clone();
        b.data[0].v = vec![11.0, 11.5];

        let diff = depth_difference(&b, &a).unwrap();
        assert_eq!(diff.data[0].v, vec![1.0, -0.5]);
        assert_eq!(diff.depths_m, vec![0.1, 0.5]);
        assert!(diff.requested_coords.is_none());
    }

    #[test]
    fn test_depth_difference_profile_mismatch() {
        let a = DepthTimeSeries {
            requested_coords: None,
            true_coords: None,
            depths_m: vec![0.1],
            data: vec![DepthPoint {
                t: "00:00".into(),
                v: vec![1.0],
            }],
        };
        let mut b = a.clone();
        b.data[0].v.push(2.0);
        assert!(matches!(
            depth_difference(&a, &b),
            Err(ShapeError::RowLength { row: 0, .. })
        ));
    }
}
