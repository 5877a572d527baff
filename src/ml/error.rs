//! Error types for the training and prediction pipeline

use crate::error::AppError;
use serde::{Deserialize, Serialize};

/// Result type for pipeline operations
pub type MlResult<T> = std::result::Result<T, MlError>;

/// A single schema violation in a prediction request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Errors raised while loading data, training, loading a model or predicting
#[derive(Debug, thiserror::Error)]
pub enum MlError {
    /// Dataset is missing columns or has unparsable cells
    #[error("Data format error: {0}")]
    DataFormat(String),

    /// Fitting failed or the input cannot be trained on
    #[error("Training error: {0}")]
    Training(String),

    /// Model artifact is absent, corrupt or incompatible
    #[error("Model load error: {0}")]
    ModelLoad(String),

    /// Prediction request does not conform to the trained schema
    #[error("Input validation error: {}", join_violations(.0))]
    InputValidation(Vec<FieldViolation>),

    /// Inference failed on a validated request
    #[error("Inference error: {0}")]
    Inference(String),
}

impl MlError {
    /// Violations carried by an input validation error
    pub fn violations(&self) -> &[FieldViolation] {
        match self {
            MlError::InputValidation(violations) => violations,
            _ => &[],
        }
    }
}

fn join_violations(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<MlError> for AppError {
    fn from(err: MlError) -> Self {
        match err {
            MlError::InputValidation(_) => AppError::Validation(err.to_string()),
            MlError::DataFormat(msg) => AppError::DataFormat(msg),
            MlError::Training(msg) => AppError::Training(msg),
            MlError::ModelLoad(msg) => AppError::ModelUnavailable(msg),
            MlError::Inference(msg) => AppError::Internal(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_lists_every_field() {
        let err = MlError::InputValidation(vec![
            FieldViolation::new("torque", "field is required"),
            FieldViolation::new("rotational_speed", "expected a number"),
        ]);

        let message = err.to_string();
        assert!(message.contains("torque: field is required"));
        assert!(message.contains("rotational_speed: expected a number"));
        assert_eq!(err.violations().len(), 2);
    }

    #[test]
    fn test_conversion_to_app_error() {
        let app: AppError = MlError::ModelLoad("missing".to_string()).into();
        assert_eq!(app.error_code(), "MODEL_UNAVAILABLE");

        let app: AppError = MlError::InputValidation(vec![]).into();
        assert_eq!(app.error_code(), "VALIDATION_ERROR");
    }
}
