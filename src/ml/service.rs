use crate::metrics;
use crate::ml::artifact::ModelArtifact;
use crate::ml::classifier::Classifier;
use crate::ml::error::{MlError, MlResult};
use crate::ml::features::{FeatureEncoder, ValueRange};
use crate::ml::models::{MaintenanceOutcome, ModelMetadata, ModelType, Prediction};
use crate::ml::schema::{FeatureSchema, FeatureValue};
use crate::recommendations::{ReadingContext, SensorReadings};
use chrono::{DateTime, Utc};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

/// Raw feature values as submitted by a form or the JSON API
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub fields: BTreeMap<String, String>,
}

impl PredictionRequest {
    pub fn new(fields: BTreeMap<String, String>) -> Self {
        Self { fields }
    }

    pub fn from_pairs<K: Into<String>, V: Into<String>>(pairs: impl IntoIterator<Item = (K, V)>) -> Self {
        Self {
            fields: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// A validated input echoed back with its presentation details
#[derive(Debug, Clone, Serialize)]
pub struct SubmittedReading {
    pub key: String,
    pub label: String,
    pub unit: Option<String>,
    pub value: FeatureValue,
}

/// Result of one prediction
#[derive(Debug, Clone, Serialize)]
pub struct PredictionResponse {
    pub prediction_id: Uuid,
    pub model_name: String,
    pub model_type: ModelType,
    pub outcome: Prediction<MaintenanceOutcome>,
    pub inputs: Vec<SubmittedReading>,
    pub readings: SensorReadings,
    /// Present when all four sensor readings were submitted
    pub context: Option<ReadingContext>,
    pub predicted_at: DateTime<Utc>,
}

/// Summary of the loaded model for the info page and `/v1/model`
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo<'a> {
    pub metadata: &'a ModelMetadata,
    pub schema: &'a FeatureSchema,
    pub classes: &'a [String],
    /// Observed training range per numeric feature
    pub ranges: BTreeMap<&'a str, ValueRange>,
    pub artifact_path: &'a Path,
    pub loaded_at: DateTime<Utc>,
}

/// Serves predictions from a model artifact loaded once at startup.
///
/// Immutable after load, so one instance is shared by every request.
pub struct PredictionService {
    artifact: ModelArtifact,
    healthy_labels: Vec<String>,
    artifact_path: PathBuf,
    loaded_at: DateTime<Utc>,
}

impl PredictionService {
    /// Load the artifact and check it against the declared schema, if any
    pub fn load(
        path: impl AsRef<Path>,
        expected_schema: Option<&FeatureSchema>,
        healthy_labels: Vec<String>,
    ) -> MlResult<Self> {
        let path = path.as_ref();
        let artifact = ModelArtifact::load(path)?;
        let service = Self::from_artifact(artifact, expected_schema, healthy_labels)?
            .with_artifact_path(path);

        info!(
            path = %path.display(),
            model_type = %service.artifact.metadata.model_type,
            trained_at = %service.artifact.metadata.trained_at,
            features = service.artifact.schema.len(),
            "✅ Model loaded"
        );
        Ok(service)
    }

    /// Serve an artifact that is already in memory
    pub fn from_artifact(
        artifact: ModelArtifact,
        expected_schema: Option<&FeatureSchema>,
        healthy_labels: Vec<String>,
    ) -> MlResult<Self> {
        if let Some(expected) = expected_schema {
            if let Some(mismatch) = expected.describe_mismatch(&artifact.schema) {
                return Err(MlError::ModelLoad(format!(
                    "model was trained on a different feature schema: {}",
                    mismatch
                )));
            }
        }

        if !artifact.model.is_trained() {
            return Err(MlError::ModelLoad("artifact holds an untrained model".to_string()));
        }

        if !artifact.schema.is_compatible_with(artifact.encoder.schema()) {
            return Err(MlError::ModelLoad(
                "artifact encoder does not match its schema".to_string(),
            ));
        }

        Ok(Self {
            artifact,
            healthy_labels,
            artifact_path: PathBuf::new(),
            loaded_at: Utc::now(),
        })
    }

    fn with_artifact_path(mut self, path: &Path) -> Self {
        self.artifact_path = path.to_path_buf();
        self
    }

    /// Validate, encode and classify one request
    pub fn predict(&self, request: &PredictionRequest) -> MlResult<PredictionResponse> {
        let started = Instant::now();
        let encoder = &self.artifact.encoder;

        let values = encoder.parse_fields(&request.fields).map_err(|e| {
            metrics::record_validation_failure();
            debug!(error = %e, "Prediction request rejected");
            e
        })?;

        let row = encoder.transform(&values)?;
        let x = Array2::from_shape_vec((1, row.len()), row)
            .map_err(|e| MlError::Inference(format!("cannot shape feature row: {}", e)))?;
        let proba = self.artifact.model.predict_proba(&x)?;

        let scores: Vec<f64> = proba.row(0).to_vec();
        let class = scores
            .iter()
            .enumerate()
            .fold((0usize, f64::MIN), |best, (idx, &p)| if p > best.1 { (idx, p) } else { best })
            .0;
        let label = encoder
            .decode_label(class)
            .ok_or_else(|| MlError::Inference(format!("model produced unknown class {}", class)))?;

        let probabilities: BTreeMap<String, f64> = encoder
            .classes()
            .iter()
            .cloned()
            .zip(scores.iter().copied())
            .collect();
        let confidence = scores.get(class).copied().unwrap_or(0.0);
        let outcome = Prediction::new(
            MaintenanceOutcome::from_label(label, &self.healthy_labels),
            confidence,
        )
        .with_probabilities(probabilities);

        let schema = &self.artifact.schema;
        let readings = SensorReadings::from_values(schema, &values);
        let inputs = schema
            .features
            .iter()
            .zip(values)
            .map(|(spec, value)| SubmittedReading {
                key: spec.key.clone(),
                label: spec.label.clone(),
                unit: spec.unit.clone(),
                value,
            })
            .collect();

        metrics::record_prediction(label, started.elapsed());
        debug!(
            label,
            confidence,
            elapsed_us = started.elapsed().as_micros() as u64,
            "Prediction served"
        );

        Ok(PredictionResponse {
            prediction_id: Uuid::new_v4(),
            model_name: self.artifact.metadata.name.clone(),
            model_type: self.artifact.metadata.model_type,
            outcome,
            inputs,
            context: readings.context(),
            readings,
            predicted_at: Utc::now(),
        })
    }

    pub fn metadata(&self) -> &ModelMetadata {
        &self.artifact.metadata
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.artifact.schema
    }

    pub fn encoder(&self) -> &FeatureEncoder {
        &self.artifact.encoder
    }

    pub fn classes(&self) -> &[String] {
        self.artifact.encoder.classes()
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    pub fn info(&self) -> ModelInfo<'_> {
        ModelInfo {
            metadata: &self.artifact.metadata,
            schema: &self.artifact.schema,
            classes: self.artifact.encoder.classes(),
            ranges: self
                .artifact
                .schema
                .features
                .iter()
                .filter_map(|spec| {
                    self.artifact
                        .encoder
                        .range(&spec.key)
                        .map(|range| (spec.key.as_str(), range))
                })
                .collect(),
            artifact_path: &self.artifact_path,
            loaded_at: self.loaded_at,
        }
    }
}
