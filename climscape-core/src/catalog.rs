//! Catalog documents: scenarios, variables and probe points.

use serde::{Deserialize, Serialize};

/// Entry of `scenarios.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioDescription {
    pub id: String,
    pub slug: String,
    pub scenario: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub key_variables_changed: String,
    #[serde(default)]
    pub primary_analysis_focus: String,
    #[serde(rename = "representative_LCZ", default)]
    pub representative_lcz: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default)]
    pub relevant_lectures: Vec<String>,
}

/// Attributes of one output variable, as exported from the NetCDF files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableAttributes {
    pub valid_min: f64,
    pub valid_max: f64,
    pub long_name: String,
    pub units: String,
    /// Export-specific attributes (grid mapping, variable index, ...).
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Variable attributes together with the slug they are keyed by.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SluggedVariable {
    pub slug: String,
    #[serde(flatten)]
    pub attributes: VariableAttributes,
}

/// A probe point for which time series were exported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbePoint {
    #[serde(rename = "c")]
    pub coords: [f64; 3],
    #[serde(rename = "v", default)]
    pub variables: Vec<String>,
    #[serde(rename = "p", default, skip_serializing_if = "Option::is_none")]
    pub plane: Option<String>,
    #[serde(rename = "s")]
    pub slug: String,
    #[serde(rename = "n", default)]
    pub name: String,
}

/// Metadata attached to a heatmap cell that sits on a probe point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointMetadata {
    pub point_slug: String,
    pub point_name: String,
}

impl From<&ProbePoint> for PointMetadata {
    fn from(point: &ProbePoint) -> Self {
        Self {
            point_slug: point.slug.clone(),
            point_name: point.name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variable_attributes_keep_extra_fields() {
        let json = r#"{"valid_min": -5, "valid_max": 45, "long_name": "temperature",
                       "units": "°C", "emVarIdx": 3, "grid_mapping": "crs"}"#;
        let attrs: VariableAttributes = serde_json::from_str(json).unwrap();
        assert_eq!(attrs.valid_min, -5.0);
        assert_eq!(attrs.extra.get("grid_mapping").and_then(|v| v.as_str()), Some("crs"));
    }

    #[test]
    fn test_probe_point_short_field_names() {
        let json = r#"{"c": [11, 21, 1.4], "v": ["T", "RH"], "p": "horizontal_human_height",
                       "s": "11_0-21_0-1_4", "n": "Courtyard"}"#;
        let point: ProbePoint = serde_json::from_str(json).unwrap();
        assert_eq!(point.coords, [11.0, 21.0, 1.4]);
        assert_eq!(point.variables.len(), 2);
        assert_eq!(PointMetadata::from(&point).point_name, "Courtyard");
    }

    #[test]
    fn test_scenario_description_optional_fields() {
        let json = r#"{"id": "1", "slug": "S1_1", "scenario": "Taller buildings",
                       "representative_LCZ": "LCZ 2"}"#;
        let desc: ScenarioDescription = serde_json::from_str(json).unwrap();
        assert_eq!(desc.representative_lcz, "LCZ 2");
        assert!(desc.details.is_none());
        assert!(desc.relevant_lectures.is_empty());
    }
}
