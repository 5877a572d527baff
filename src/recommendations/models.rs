use crate::ml::schema::{
    FeatureSchema, FeatureValue, AIR_TEMPERATURE, PROCESS_TEMPERATURE, ROTATIONAL_SPEED, TORQUE,
};
use serde::{Deserialize, Deserializer, Serialize};
use std::f64::consts::PI;

/// Offset between Kelvin and degrees Celsius
pub const KELVIN_OFFSET: f64 = 273.15;

/// Recommendation priority
///
/// Parsing never fails: case and surrounding whitespace are ignored, and
/// anything unrecognised becomes [`Priority::Medium`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }

    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "high" | "critical" | "urgent" => Priority::High,
            "low" => Priority::Low,
            _ => Priority::Medium,
        }
    }
}

impl<'de> Deserialize<'de> for Priority {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().map(Priority::parse_lenient).unwrap_or_default())
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single maintenance recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub title: String,
    pub description: String,

    /// Font Awesome icon class
    #[serde(default = "default_icon")]
    pub icon: String,

    #[serde(default)]
    pub priority: Priority,
}

fn default_icon() -> String {
    "fas fa-tools".to_string()
}

impl Recommendation {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        icon: impl Into<String>,
        priority: Priority,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            icon: icon.into(),
            priority,
        }
    }
}

/// Where a set of recommendations came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationSource {
    /// Chat-completions model
    Ai,
    /// Built-in rule engine
    Rules,
}

impl RecommendationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendationSource::Ai => "ai",
            RecommendationSource::Rules => "rules",
        }
    }
}

/// Recommendations produced for one prediction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Advice {
    pub recommendations: Vec<Recommendation>,
    pub source: RecommendationSource,
}

/// Sensor readings picked out of a validated request.
///
/// Readings the schema does not carry stay `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorReadings {
    /// Kelvin
    pub air_temperature: Option<f64>,
    /// Kelvin
    pub process_temperature: Option<f64>,
    /// rpm
    pub rotational_speed: Option<f64>,
    /// Nm
    pub torque: Option<f64>,
}

impl SensorReadings {
    pub fn new(air_temperature: f64, process_temperature: f64, rotational_speed: f64, torque: f64) -> Self {
        Self {
            air_temperature: Some(air_temperature),
            process_temperature: Some(process_temperature),
            rotational_speed: Some(rotational_speed),
            torque: Some(torque),
        }
    }

    /// Pick the well-known readings out of values in schema order
    pub fn from_values(schema: &FeatureSchema, values: &[FeatureValue]) -> Self {
        let lookup = |key: &str| {
            schema
                .position(key)
                .and_then(|idx| values.get(idx))
                .and_then(FeatureValue::as_number)
        };

        Self {
            air_temperature: lookup(AIR_TEMPERATURE),
            process_temperature: lookup(PROCESS_TEMPERATURE),
            rotational_speed: lookup(ROTATIONAL_SPEED),
            torque: lookup(TORQUE),
        }
    }

    /// Derived figures, available when all four readings are present
    pub fn context(&self) -> Option<ReadingContext> {
        Some(ReadingContext::from_readings(
            self.air_temperature?,
            self.process_temperature?,
            self.rotational_speed?,
            self.torque?,
        ))
    }
}

/// Figures derived from the readings for display
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReadingContext {
    /// °C, one decimal
    pub air_temp_c: f64,
    /// °C, one decimal
    pub process_temp_c: f64,
    /// Process minus air temperature in K, one decimal
    pub temp_diff: f64,
    /// Mechanical power in kW, two decimals
    pub power_estimate_kw: f64,
}

impl ReadingContext {
    pub fn from_readings(air_k: f64, process_k: f64, rpm: f64, torque_nm: f64) -> Self {
        Self {
            air_temp_c: round_to(air_k - KELVIN_OFFSET, 1),
            process_temp_c: round_to(process_k - KELVIN_OFFSET, 1),
            temp_diff: round_to(process_k - air_k, 1),
            power_estimate_kw: round_to(power_kw(rpm, torque_nm), 2),
        }
    }
}

/// Shaft power in kW
pub fn power_kw(rpm: f64, torque_nm: f64) -> f64 {
    torque_nm * rpm * 2.0 * PI / 60_000.0
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
