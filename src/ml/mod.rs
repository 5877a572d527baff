/// Machine learning pipeline for maintenance prediction
///
/// This module provides:
/// - CSV dataset loading against a feature schema
/// - Feature encoding and stratified train/evaluation splits
/// - Classifiers (Random Forest, Decision Tree, Logistic Regression, Naive Bayes)
/// - Evaluation metrics and a persisted model artifact
/// - A prediction service that validates requests against the trained schema

pub mod artifact;
pub mod classifier;
pub mod dataset;
pub mod error;
pub mod evaluation;
pub mod features;
pub mod forest;
pub mod models;
pub mod schema;
pub mod service;
pub mod trainer;

pub use artifact::{ModelArtifact, TrainingReport, ARTIFACT_FORMAT_VERSION};
pub use classifier::{
    Classifier, DecisionTreeModel, LogisticRegressionModel, NaiveBayesModel, TrainedModel,
};
pub use dataset::{DatasetLoader, TrainingRecord, TrainingTable};
pub use error::{FieldViolation, MlError, MlResult};
pub use evaluation::calculate_metrics;
pub use features::{FeatureEncoder, ValueRange};
pub use forest::RandomForestModel;
pub use models::{
    ClassMetrics, MaintenanceOutcome, ModelMetadata, ModelMetrics, ModelType, Prediction,
    TrainingConfig, TrainingDataset,
};
pub use schema::{FeatureKind, FeatureSchema, FeatureSpec, FeatureValue};
pub use service::{
    ModelInfo, PredictionRequest, PredictionResponse, PredictionService, SubmittedReading,
};
pub use trainer::{ModelTrainer, MODEL_NAME};
