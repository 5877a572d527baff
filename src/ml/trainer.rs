use crate::ml::artifact::{ModelArtifact, ARTIFACT_FORMAT_VERSION};
use crate::ml::classifier::{zero_variance_feature, Classifier, TrainedModel};
use crate::ml::dataset::TrainingTable;
use crate::ml::error::{MlError, MlResult};
use crate::ml::evaluation::calculate_metrics;
use crate::ml::features::FeatureEncoder;
use crate::ml::models::{ModelMetadata, ModelMetrics, ModelType, TrainingConfig, TrainingDataset};
use std::time::Instant;
use tracing::{debug, info};
use validator::Validate;

/// Name recorded in the metadata of every trained model
pub const MODEL_NAME: &str = "maintenance-classifier";

/// Offline training run: encode, split, fit, evaluate
pub struct ModelTrainer {
    config: TrainingConfig,
}

impl ModelTrainer {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Fit a classifier on the table and package it with its schema and metrics
    pub fn train(&self, table: &TrainingTable) -> MlResult<ModelArtifact> {
        self.config
            .validate()
            .map_err(|e| MlError::Training(format!("invalid training configuration: {}", e)))?;

        if table.is_empty() {
            return Err(MlError::Training("dataset contains no rows".to_string()));
        }

        let encoder = FeatureEncoder::fit(table)?;
        if encoder.n_classes() < 2 {
            return Err(MlError::Training(format!(
                "need at least two distinct labels in '{}', found {}",
                table.schema.label_column,
                encoder.n_classes()
            )));
        }

        let (features, labels) = encoder.transform_table(table)?;
        let dataset = TrainingDataset::new(features, labels, encoder.n_classes());
        let (train_set, test_set) = dataset.train_test_split(self.config.test_size, self.config.seed);

        if train_set.n_samples == 0 {
            return Err(MlError::Training("training split is empty".to_string()));
        }

        info!(
            model_type = %self.config.model_type,
            train_samples = train_set.n_samples,
            test_samples = test_set.n_samples,
            features = dataset.n_features,
            classes = encoder.n_classes(),
            "Training classifier"
        );
        debug!(class_counts = ?dataset.class_counts(), "Class distribution");

        if self.config.model_type == ModelType::NaiveBayes {
            if let Some((feature, class)) = zero_variance_feature(&train_set) {
                return Err(MlError::Training(format!(
                    "feature '{}' has zero variance in class '{}'",
                    encoder.schema().features[feature].key,
                    encoder.decode_label(class).unwrap_or("?")
                )));
            }
        }

        let started = Instant::now();
        let mut model = TrainedModel::new(&self.config, encoder.n_classes());
        model.train(&train_set)?;

        let training_metrics = evaluate(&model, &train_set, &encoder)?;
        let evaluation_metrics = evaluate(&model, &test_set, &encoder)?;

        info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            train_accuracy = training_metrics.accuracy,
            test_accuracy = evaluation_metrics.accuracy,
            test_f1 = evaluation_metrics.f1_score,
            "✅ Classifier trained"
        );

        let metadata = ModelMetadata {
            name: MODEL_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            model_type: model.model_type(),
            trained_at: chrono::Utc::now(),
            n_training_samples: train_set.n_samples,
            n_evaluation_samples: test_set.n_samples,
            n_features: dataset.n_features,
            training_metrics,
            evaluation_metrics,
            hyperparameters: model.hyperparameters(),
        };

        Ok(ModelArtifact {
            format_version: ARTIFACT_FORMAT_VERSION,
            metadata,
            schema: table.schema.clone(),
            encoder,
            model,
        })
    }
}

fn evaluate(
    model: &TrainedModel,
    dataset: &TrainingDataset,
    encoder: &FeatureEncoder,
) -> MlResult<ModelMetrics> {
    if dataset.n_samples == 0 {
        return Ok(ModelMetrics::new());
    }
    let predictions = model.predict(&dataset.features)?;
    Ok(calculate_metrics(&dataset.labels, &predictions, encoder.classes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::dataset::TrainingRecord;
    use crate::ml::models::ModelType;
    use crate::ml::schema::{FeatureSchema, FeatureValue};

    /// Failures when torque is high and the machine spins slowly
    fn table(n: usize) -> TrainingTable {
        let records = (0..n)
            .map(|i| {
                let failing = i % 5 == 0;
                let (rpm, torque) = if failing {
                    (1250.0 + (i % 3) as f64 * 5.0, 62.0 + (i % 4) as f64)
                } else {
                    (1500.0 + (i % 13) as f64 * 10.0, 30.0 + (i % 9) as f64)
                };
                TrainingRecord {
                    values: vec![
                        FeatureValue::Number(298.0 + (i % 6) as f64 * 0.2),
                        FeatureValue::Number(308.5 + (i % 7) as f64 * 0.2),
                        FeatureValue::Number(rpm),
                        FeatureValue::Number(torque),
                    ],
                    label: if failing { "1" } else { "0" }.to_string(),
                }
            })
            .collect();
        TrainingTable::new(FeatureSchema::ai4i(), records)
    }

    fn small_config() -> TrainingConfig {
        TrainingConfig {
            n_trees: 12,
            max_depth: 6,
            ..Default::default()
        }
    }

    #[test]
    fn test_train_produces_complete_artifact() {
        let artifact = ModelTrainer::new(small_config()).train(&table(100)).unwrap();

        assert_eq!(artifact.format_version, ARTIFACT_FORMAT_VERSION);
        assert_eq!(artifact.metadata.model_type, ModelType::RandomForest);
        assert_eq!(artifact.metadata.n_training_samples, 80);
        assert_eq!(artifact.metadata.n_evaluation_samples, 20);
        assert_eq!(artifact.metadata.n_features, 4);
        assert_eq!(artifact.metadata.hyperparameters["n_trees"], "12");
        assert!(artifact.metadata.evaluation_metrics.accuracy > 0.9);
        assert_eq!(artifact.encoder.classes(), &["0".to_string(), "1".to_string()]);
        assert!(artifact.model.is_trained());
    }

    #[test]
    fn test_training_is_reproducible() {
        let trainer = ModelTrainer::new(small_config());
        let a = trainer.train(&table(120)).unwrap();
        let b = trainer.train(&table(120)).unwrap();

        assert_eq!(a.metadata.evaluation_metrics, b.metadata.evaluation_metrics);
        assert_eq!(a.metadata.training_metrics, b.metadata.training_metrics);
    }

    #[test]
    fn test_every_model_type_trains() {
        for model_type in [
            ModelType::DecisionTree,
            ModelType::LogisticRegression,
            ModelType::NaiveBayes,
        ] {
            let config = TrainingConfig {
                model_type,
                ..small_config()
            };
            let artifact = ModelTrainer::new(config).train(&table(100)).unwrap();
            assert_eq!(artifact.metadata.model_type, model_type);
        }
    }

    #[test]
    fn test_naive_bayes_class_constant_feature_is_training_error() {
        let mut data = table(60);
        for record in data.records.iter_mut().filter(|r| r.label == "1") {
            record.values[1] = FeatureValue::Number(308.5);
        }
        let config = TrainingConfig {
            model_type: ModelType::NaiveBayes,
            ..small_config()
        };

        let err = ModelTrainer::new(config).train(&data).unwrap_err();

        assert!(matches!(err, MlError::Training(_)));
        assert!(err
            .to_string()
            .contains("feature 'process_temperature' has zero variance in class '1'"));
    }

    #[test]
    fn test_empty_table_rejected() {
        let empty = TrainingTable::new(FeatureSchema::ai4i(), Vec::new());
        let err = ModelTrainer::new(small_config()).train(&empty).unwrap_err();
        assert!(matches!(err, MlError::Training(_)));
    }

    #[test]
    fn test_single_label_rejected() {
        let mut data = table(20);
        for record in &mut data.records {
            record.label = "0".to_string();
        }

        let err = ModelTrainer::new(small_config()).train(&data).unwrap_err();
        assert!(err.to_string().contains("two distinct labels"));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = TrainingConfig {
            test_size: 0.95,
            ..small_config()
        };
        let err = ModelTrainer::new(config).train(&table(20)).unwrap_err();
        assert!(matches!(err, MlError::Training(_)));
    }
}
