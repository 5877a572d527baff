//! Shared fixtures for the integration tests
//!
//! Builds a small synthetic dataset in the AI4I 2020 layout, trains models from
//! it and wires the router the way the server binary does.

#![allow(dead_code)]

use maintenance_predictor::{
    api::{build_router, AppState},
    ml::{
        DatasetLoader, FeatureSchema, ModelArtifact, ModelTrainer, PredictionRequest,
        PredictionService, TrainingConfig, TrainingTable,
    },
    recommendations::{Advisor, RuleAdvisor},
};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const AI4I_HEADER: &str = "UDI,Product ID,Type,Air temperature [K],Process temperature [K],Rotational speed [rpm],Torque [Nm],Tool wear [min],Machine failure";

/// Deterministic AI4I-style CSV: every fifth machine runs at high torque and fails
pub fn synthetic_csv(rows: usize) -> String {
    let mut csv = String::from(AI4I_HEADER);
    csv.push('\n');

    for i in 0..rows {
        let failing = i % 5 == 0;
        let air = 298.0 + (i % 7) as f64 * 0.2;
        let process = air + 10.0 + (i % 3) as f64 * 0.3;
        let rpm = if failing { 1300.0 } else { 1500.0 } + (i % 11) as f64 * 12.0;
        let torque = if failing { 62.0 } else { 38.0 } + (i % 6) as f64 * 0.8;
        let product_type = ["L", "M", "H"][i % 3];

        let _ = writeln!(
            csv,
            "{},{}{},{},{:.1},{:.1},{},{:.1},{},{}",
            i + 1,
            product_type,
            14860 + i,
            product_type,
            air,
            process,
            rpm,
            torque,
            i % 200,
            u8::from(failing)
        );
    }
    csv
}

/// Write the synthetic dataset into `dir` and return its path
pub fn write_dataset(dir: &Path, rows: usize) -> PathBuf {
    let path = dir.join("ai4i2020.csv");
    std::fs::write(&path, synthetic_csv(rows)).unwrap();
    path
}

pub fn load_table(path: &Path) -> TrainingTable {
    DatasetLoader::new(FeatureSchema::ai4i()).load_path(path).unwrap()
}

/// Small forest so the tests stay fast
pub fn training_config(seed: u64) -> TrainingConfig {
    TrainingConfig {
        seed,
        n_trees: 15,
        ..Default::default()
    }
}

/// Train on a fresh synthetic dataset and save the artifact into `dir`
pub fn train_artifact(dir: &Path) -> (ModelArtifact, PathBuf) {
    let dataset = write_dataset(dir, 200);
    let artifact = ModelTrainer::new(training_config(42))
        .train(&load_table(&dataset))
        .unwrap();

    let artifact_path = dir.join("models").join("maintenance_model.bin");
    artifact.save(&artifact_path).unwrap();
    (artifact, artifact_path)
}

pub fn load_service(artifact_path: &Path) -> PredictionService {
    PredictionService::load(
        artifact_path,
        Some(&FeatureSchema::ai4i()),
        TrainingConfig::default().healthy_labels,
    )
    .unwrap()
}

pub fn app_state(service: PredictionService, advisor: Arc<dyn Advisor>) -> AppState {
    AppState::new(Arc::new(service), advisor)
}

pub fn router(artifact_path: &Path) -> axum::Router {
    build_router(app_state(
        load_service(artifact_path),
        Arc::new(RuleAdvisor::new()),
    ))
}

pub fn request(air: &str, process: &str, rpm: &str, torque: &str) -> PredictionRequest {
    PredictionRequest::from_pairs([
        ("air_temperature", air),
        ("process_temperature", process),
        ("rotational_speed", rpm),
        ("torque", torque),
    ])
}

/// Parse Prometheus exposition text into metric name -> sample lines
pub fn parse_prometheus_output(output: &str) -> HashMap<String, Vec<String>> {
    let mut metrics: HashMap<String, Vec<String>> = HashMap::new();

    for line in output.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let name = line
            .split(|c| c == '{' || c == ' ')
            .next()
            .unwrap_or_default()
            .to_string();
        metrics.entry(name).or_default().push(line.to_string());
    }

    metrics
}
