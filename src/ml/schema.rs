//! Feature schema shared by the dataset loader, the trainer and the prediction service

use serde::{Deserialize, Serialize};

pub const AIR_TEMPERATURE: &str = "air_temperature";
pub const PROCESS_TEMPERATURE: &str = "process_temperature";
pub const ROTATIONAL_SPEED: &str = "rotational_speed";
pub const TORQUE: &str = "torque";

/// Kind of a feature column
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKind {
    #[default]
    Numeric,
    Categorical,
}

/// One input feature: how it is named in requests and where it lives in the dataset
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeatureSpec {
    /// Request/form field name
    pub key: String,

    /// Dataset column header
    pub column: String,

    /// Human readable label
    pub label: String,

    /// Unit shown next to the input
    #[serde(default)]
    pub unit: Option<String>,

    #[serde(default)]
    pub kind: FeatureKind,
}

impl FeatureSpec {
    pub fn numeric(key: &str, column: &str, label: &str, unit: &str) -> Self {
        Self {
            key: key.to_string(),
            column: column.to_string(),
            label: label.to_string(),
            unit: Some(unit.to_string()),
            kind: FeatureKind::Numeric,
        }
    }

    pub fn categorical(key: &str, column: &str, label: &str) -> Self {
        Self {
            key: key.to_string(),
            column: column.to_string(),
            label: label.to_string(),
            unit: None,
            kind: FeatureKind::Categorical,
        }
    }
}

/// Ordered feature list plus the label column
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeatureSchema {
    pub features: Vec<FeatureSpec>,
    pub label_column: String,
}

impl FeatureSchema {
    pub fn new(features: Vec<FeatureSpec>, label_column: impl Into<String>) -> Self {
        Self {
            features,
            label_column: label_column.into(),
        }
    }

    /// Sensor readings of the AI4I 2020 predictive maintenance dataset
    pub fn ai4i() -> Self {
        Self::new(
            vec![
                FeatureSpec::numeric(AIR_TEMPERATURE, "Air temperature [K]", "Air Temperature", "K"),
                FeatureSpec::numeric(
                    PROCESS_TEMPERATURE,
                    "Process temperature [K]",
                    "Process Temperature",
                    "K",
                ),
                FeatureSpec::numeric(
                    ROTATIONAL_SPEED,
                    "Rotational speed [rpm]",
                    "Rotational Speed",
                    "rpm",
                ),
                FeatureSpec::numeric(TORQUE, "Torque [Nm]", "Torque", "Nm"),
            ],
            "Machine failure",
        )
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.features.iter().map(|f| f.key.as_str())
    }

    pub fn position(&self, key: &str) -> Option<usize> {
        self.features.iter().position(|f| f.key == key)
    }

    /// Two schemas are compatible when keys, order and kinds agree.
    /// Labels, units and dataset column names are presentation only.
    pub fn is_compatible_with(&self, other: &FeatureSchema) -> bool {
        self.features.len() == other.features.len()
            && self
                .features
                .iter()
                .zip(other.features.iter())
                .all(|(a, b)| a.key == b.key && a.kind == b.kind)
    }

    /// Describe the first difference with another schema
    pub fn describe_mismatch(&self, other: &FeatureSchema) -> Option<String> {
        if self.features.len() != other.features.len() {
            return Some(format!(
                "expected {} features, found {}",
                self.features.len(),
                other.features.len()
            ));
        }

        self.features
            .iter()
            .zip(other.features.iter())
            .enumerate()
            .find(|(_, (a, b))| a.key != b.key || a.kind != b.kind)
            .map(|(idx, (a, b))| {
                format!(
                    "feature #{} is '{}' ({:?}), found '{}' ({:?})",
                    idx + 1,
                    a.key,
                    a.kind,
                    b.key,
                    b.kind
                )
            })
    }
}

impl Default for FeatureSchema {
    fn default() -> Self {
        Self::ai4i()
    }
}

/// A single parsed cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Number(f64),
    Category(String),
}

impl FeatureValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FeatureValue::Number(v) => Some(*v),
            FeatureValue::Category(_) => None,
        }
    }
}

impl std::fmt::Display for FeatureValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeatureValue::Number(v) => write!(f, "{}", v),
            FeatureValue::Category(c) => write!(f, "{}", c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_schema() {
        let schema = FeatureSchema::default();
        assert_eq!(schema.len(), 4);
        assert_eq!(schema.label_column, "Machine failure");
        assert_eq!(schema.position(TORQUE), Some(3));
        assert_eq!(
            schema.keys().collect::<Vec<_>>(),
            vec![AIR_TEMPERATURE, PROCESS_TEMPERATURE, ROTATIONAL_SPEED, TORQUE]
        );
    }

    #[test]
    fn test_compatibility_ignores_presentation() {
        let a = FeatureSchema::ai4i();
        let mut b = FeatureSchema::ai4i();
        b.features[0].label = "Ambient".to_string();
        b.features[0].column = "air_temp_k".to_string();
        assert!(a.is_compatible_with(&b));
        assert!(a.describe_mismatch(&b).is_none());
    }

    #[test]
    fn test_incompatible_order() {
        let a = FeatureSchema::ai4i();
        let mut b = FeatureSchema::ai4i();
        b.features.swap(2, 3);
        assert!(!a.is_compatible_with(&b));
        let msg = a.describe_mismatch(&b).unwrap();
        assert!(msg.contains("feature #3"));
    }

    #[test]
    fn test_incompatible_length() {
        let a = FeatureSchema::ai4i();
        let mut b = FeatureSchema::ai4i();
        b.features.push(FeatureSpec::categorical("type", "Type", "Product Type"));
        assert!(!a.is_compatible_with(&b));
        assert_eq!(
            a.describe_mismatch(&b).unwrap(),
            "expected 4 features, found 5"
        );
    }
}
