/// Integration tests for the offline training pipeline
///
/// These tests verify:
/// - CSV loading against the AI4I schema
/// - Reproducible training for a fixed seed
/// - Persisting and reloading the model artifact
/// - The JSON training report

mod common;

use maintenance_predictor::ml::{
    DatasetLoader, FeatureSchema, MlError, ModelArtifact, ModelTrainer, ModelType,
    TrainingConfig,
};

#[test]
fn test_fixed_seed_training_is_reproducible() {
    let dir = tempfile::tempdir().unwrap();
    let dataset = common::write_dataset(dir.path(), 200);
    let table = common::load_table(&dataset);

    let first = ModelTrainer::new(common::training_config(7)).train(&table).unwrap();
    let second = ModelTrainer::new(common::training_config(7)).train(&table).unwrap();

    assert_eq!(
        first.metadata.evaluation_metrics,
        second.metadata.evaluation_metrics
    );
    assert_eq!(first.metadata.training_metrics, second.metadata.training_metrics);
    assert_eq!(first.metadata.n_training_samples, 160);
    assert_eq!(first.metadata.n_evaluation_samples, 40);
    assert!(first.metadata.evaluation_metrics.accuracy > 0.9);
}

#[test]
fn test_missing_required_column_is_data_format_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.csv");
    let csv = common::synthetic_csv(10).replace("Torque [Nm]", "Torque");
    std::fs::write(&path, csv).unwrap();

    let err = DatasetLoader::new(FeatureSchema::ai4i())
        .load_path(&path)
        .unwrap_err();

    assert!(matches!(err, MlError::DataFormat(_)));
    assert!(err.to_string().contains("Torque [Nm]"));
}

#[test]
fn test_extra_columns_are_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let table = common::load_table(&common::write_dataset(dir.path(), 25));

    assert_eq!(table.len(), 25);
    assert_eq!(table.records[0].values.len(), 4);
    assert_eq!(
        table.labels().into_iter().collect::<Vec<_>>(),
        vec!["0", "1"]
    );
}

#[test]
fn test_every_classifier_trains_on_the_dataset() {
    let dir = tempfile::tempdir().unwrap();
    let table = common::load_table(&common::write_dataset(dir.path(), 150));

    for model_type in [
        ModelType::RandomForest,
        ModelType::DecisionTree,
        ModelType::LogisticRegression,
        ModelType::NaiveBayes,
    ] {
        let config = TrainingConfig {
            model_type,
            ..common::training_config(42)
        };
        let artifact = ModelTrainer::new(config).train(&table).unwrap();
        assert_eq!(artifact.metadata.model_type, model_type);
        assert_eq!(artifact.encoder.classes(), ["0", "1"]);
    }
}

#[test]
fn test_artifact_round_trip_and_report() {
    let dir = tempfile::tempdir().unwrap();
    let (artifact, path) = common::train_artifact(dir.path());

    let loaded = ModelArtifact::load(&path).unwrap();
    assert_eq!(loaded.metadata.trained_at, artifact.metadata.trained_at);
    assert_eq!(loaded.schema, FeatureSchema::ai4i());

    let report_path = dir.path().join("report.json");
    loaded.write_report(&report_path).unwrap();
    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&report_path).unwrap()).unwrap();

    assert_eq!(report["metadata"]["model_type"], "random_forest");
    assert_eq!(report["metadata"]["hyperparameters"]["n_trees"], "15");
    assert!(report["metadata"]["evaluation_metrics"]["accuracy"].as_f64().unwrap() > 0.9);
}

#[test]
fn test_header_only_dataset_fails_training() {
    let dir = tempfile::tempdir().unwrap();
    let table = common::load_table(&common::write_dataset(dir.path(), 0));

    let err = ModelTrainer::new(TrainingConfig::default())
        .train(&table)
        .unwrap_err();
    assert!(matches!(err, MlError::Training(_)));
}
