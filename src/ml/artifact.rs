//! Persisted model artifact

use crate::ml::classifier::TrainedModel;
use crate::ml::error::{MlError, MlResult};
use crate::ml::features::FeatureEncoder;
use crate::ml::models::ModelMetadata;
use crate::ml::schema::FeatureSchema;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{debug, info};

/// Bumped whenever the encoded layout of [`ModelArtifact`] changes
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// Everything the prediction service needs, written once by the trainer
#[derive(Debug, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format_version: u32,
    pub metadata: ModelMetadata,
    /// Schema the model was trained on
    pub schema: FeatureSchema,
    pub encoder: FeatureEncoder,
    pub model: TrainedModel,
}

/// Human-readable summary written next to the artifact
#[derive(Debug, Serialize)]
pub struct TrainingReport<'a> {
    pub metadata: &'a ModelMetadata,
    pub schema: &'a FeatureSchema,
    pub classes: &'a [String],
}

impl ModelArtifact {
    /// Write the artifact atomically: encode to a sibling temp file, then rename
    pub fn save(&self, path: impl AsRef<Path>) -> MlResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                MlError::Training(format!("cannot create '{}': {}", parent.display(), e))
            })?;
        }

        let tmp_path = path.with_extension("tmp");
        let write_tmp = || -> std::result::Result<(), String> {
            let file = fs::File::create(&tmp_path).map_err(|e| e.to_string())?;
            let mut writer = BufWriter::new(file);
            bincode::serialize_into(&mut writer, self).map_err(|e| e.to_string())?;
            writer.flush().map_err(|e| e.to_string())?;
            writer
                .into_inner()
                .map_err(|e| e.to_string())?
                .sync_all()
                .map_err(|e| e.to_string())
        };

        if let Err(e) = write_tmp() {
            let _ = fs::remove_file(&tmp_path);
            return Err(MlError::Training(format!(
                "failed to write model artifact '{}': {}",
                path.display(),
                e
            )));
        }

        fs::rename(&tmp_path, path).map_err(|e| {
            MlError::Training(format!(
                "failed to move model artifact into '{}': {}",
                path.display(),
                e
            ))
        })?;

        info!(
            path = %path.display(),
            model_type = %self.metadata.model_type,
            "💾 Model artifact saved"
        );
        Ok(())
    }

    /// Read and decode an artifact, checking its format version
    pub fn load(path: impl AsRef<Path>) -> MlResult<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| {
            MlError::ModelLoad(format!(
                "cannot read model artifact '{}': {}",
                path.display(),
                e
            ))
        })?;

        // decoding from a slice bounds every length prefix by the file size
        let artifact: ModelArtifact = bincode::deserialize(&bytes).map_err(|e| {
            MlError::ModelLoad(format!(
                "cannot decode model artifact '{}': {}",
                path.display(),
                e
            ))
        })?;

        if artifact.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(MlError::ModelLoad(format!(
                "artifact format version {} is not supported (expected {})",
                artifact.format_version, ARTIFACT_FORMAT_VERSION
            )));
        }

        debug!(path = %path.display(), "Model artifact decoded");
        Ok(artifact)
    }

    pub fn report(&self) -> TrainingReport<'_> {
        TrainingReport {
            metadata: &self.metadata,
            schema: &self.schema,
            classes: self.encoder.classes(),
        }
    }

    /// Write the training report as pretty JSON
    pub fn write_report(&self, path: impl AsRef<Path>) -> MlResult<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(&self.report())
            .map_err(|e| MlError::Training(format!("cannot encode training report: {}", e)))?;
        fs::write(path, json).map_err(|e| {
            MlError::Training(format!(
                "cannot write training report '{}': {}",
                path.display(),
                e
            ))
        })?;

        info!(path = %path.display(), "Training report written");
        Ok(())
    }
}
