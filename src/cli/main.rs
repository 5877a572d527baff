use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use maintenance_predictor::{
    config::Config,
    ml::{DatasetLoader, ModelTrainer, ModelType},
    observability,
};
use reqwest::Client;
use serde_json::json;
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mp-cli")]
#[command(about = "Machine Maintenance Predictor CLI", version, long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    endpoint: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a model offline and write the artifact
    Train {
        /// Configuration file (overrides MP_CONFIG_PATH)
        #[arg(short, long)]
        config: Option<String>,

        /// Training dataset (CSV)
        #[arg(short, long)]
        dataset: Option<PathBuf>,

        /// Artifact output path
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Random seed for the split and bootstrap sampling
        #[arg(short, long)]
        seed: Option<u64>,

        /// random_forest, decision_tree, logistic_regression or naive_bayes
        #[arg(short = 'm', long)]
        model_type: Option<ModelType>,

        /// Number of trees (random forest only)
        #[arg(short = 'n', long)]
        n_trees: Option<usize>,

        /// Write a JSON training report
        #[arg(short, long)]
        report: Option<PathBuf>,
    },

    /// Submit readings to a running server
    Predict {
        /// Feature value as key=value, repeated
        #[arg(short, long = "feature", value_name = "KEY=VALUE", value_parser = parse_feature)]
        features: Vec<(String, String)>,
    },

    /// Show the loaded model
    Info,

    /// Check server health
    Health,
}

fn parse_feature(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{}'", raw)),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let client = Client::new();

    match cli.command {
        Commands::Train {
            config,
            dataset,
            output,
            seed,
            model_type,
            n_trees,
            report,
        } => {
            let mut config =
                Config::load(config.as_deref()).context("Failed to load configuration")?;
            observability::init_tracing(&config.observability)
                .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?;

            if let Some(seed) = seed {
                config.training.seed = seed;
            }
            if let Some(model_type) = model_type {
                config.training.model_type = model_type;
            }
            if let Some(n_trees) = n_trees {
                config.training.n_trees = n_trees;
            }
            let dataset_path = dataset.unwrap_or_else(|| config.model.dataset_path.clone());
            let output_path = output.unwrap_or_else(|| config.model.artifact_path.clone());
            let report_path = report.or_else(|| config.model.report_path.clone());

            let table = DatasetLoader::new(config.model.training_schema())
                .load_path(&dataset_path)
                .with_context(|| format!("Failed to load dataset {}", dataset_path.display()))?;

            let artifact = ModelTrainer::new(config.training.clone())
                .train(&table)
                .context("Training failed")?;
            artifact
                .save(&output_path)
                .with_context(|| format!("Failed to write {}", output_path.display()))?;

            if let Some(report_path) = &report_path {
                artifact
                    .write_report(report_path)
                    .with_context(|| format!("Failed to write {}", report_path.display()))?;
            }

            let meta = &artifact.metadata;
            println!("Model written to {}", output_path.display());
            println!("  Type: {}", meta.model_type);
            println!(
                "  Samples: {} training, {} evaluation",
                meta.n_training_samples, meta.n_evaluation_samples
            );
            println!("  Accuracy: {:.4}", meta.evaluation_metrics.accuracy);
            println!("  Precision (macro): {:.4}", meta.evaluation_metrics.precision);
            println!("  Recall (macro): {:.4}", meta.evaluation_metrics.recall);
            println!("  F1 (macro): {:.4}", meta.evaluation_metrics.f1_score);
            if let Some(report_path) = report_path {
                println!("Report written to {}", report_path.display());
            }
        }

        Commands::Predict { features } => {
            if features.is_empty() {
                bail!("at least one --feature KEY=VALUE is required");
            }
            let features: BTreeMap<String, String> = features.into_iter().collect();

            let response = client
                .post(format!("{}/v1/predict", cli.endpoint))
                .json(&json!({ "features": features }))
                .send()
                .await?;

            let body: serde_json::Value = response.json().await?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }

        Commands::Info => {
            let response = client
                .get(format!("{}/v1/model", cli.endpoint))
                .send()
                .await?;

            let body: serde_json::Value = response.json().await?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }

        Commands::Health => {
            let response = client
                .get(format!("{}/health", cli.endpoint))
                .send()
                .await?;

            let body: serde_json::Value = response.json().await?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
    }

    Ok(())
}
