use ndarray::{Array2, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::Validate;

/// Training configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TrainingConfig {
    /// Classifier to fit
    #[serde(default)]
    pub model_type: ModelType,

    /// Fraction of rows held out for evaluation
    #[serde(default = "default_test_size")]
    #[validate(range(min = 0.05, max = 0.5))]
    pub test_size: f64,

    /// Seed for the split and for bootstrap sampling
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Number of trees (random forest only)
    #[serde(default = "default_n_trees")]
    #[validate(range(min = 1, max = 1000))]
    pub n_trees: usize,

    /// Maximum tree depth
    #[serde(default = "default_max_depth")]
    #[validate(range(min = 1, max = 64))]
    pub max_depth: u16,

    /// Minimum number of rows in a leaf
    #[serde(default = "default_min_samples_leaf")]
    #[validate(range(min = 1))]
    pub min_samples_leaf: usize,

    /// Features drawn per tree; all features when unset
    #[serde(default)]
    pub max_features: Option<usize>,

    /// Labels that mean the machine is healthy
    #[serde(default = "default_healthy_labels")]
    pub healthy_labels: Vec<String>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            model_type: ModelType::default(),
            test_size: default_test_size(),
            seed: default_seed(),
            n_trees: default_n_trees(),
            max_depth: default_max_depth(),
            min_samples_leaf: default_min_samples_leaf(),
            max_features: None,
            healthy_labels: default_healthy_labels(),
        }
    }
}

fn default_test_size() -> f64 {
    0.2
}

fn default_seed() -> u64 {
    42
}

fn default_n_trees() -> usize {
    100
}

fn default_max_depth() -> u16 {
    12
}

fn default_min_samples_leaf() -> usize {
    1
}

fn default_healthy_labels() -> Vec<String> {
    vec!["0".to_string(), "No Failure".to_string()]
}

/// Predicted maintenance outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintenanceOutcome {
    /// Raw class label from the dataset
    pub label: String,

    /// Text shown to the operator
    pub display: String,

    pub requires_maintenance: bool,
}

impl MaintenanceOutcome {
    pub fn from_label(label: &str, healthy_labels: &[String]) -> Self {
        let requires_maintenance = !healthy_labels.iter().any(|h| h == label);
        let display = if requires_maintenance {
            "Maintenance Required"
        } else {
            "No Maintenance Required"
        };

        Self {
            label: label.to_string(),
            display: display.to_string(),
            requires_maintenance,
        }
    }
}

/// Prediction result with confidence score
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction<T> {
    /// Predicted value
    pub value: T,

    /// Confidence score (0.0 - 1.0)
    pub confidence: f64,

    /// All class probabilities
    pub probabilities: BTreeMap<String, f64>,
}

impl<T> Prediction<T> {
    pub fn new(value: T, confidence: f64) -> Self {
        Self {
            value,
            confidence,
            probabilities: BTreeMap::new(),
        }
    }

    pub fn with_probabilities(mut self, probabilities: BTreeMap<String, f64>) -> Self {
        self.probabilities = probabilities;
        self
    }
}

/// Encoded training data
#[derive(Debug, Clone)]
pub struct TrainingDataset {
    /// Feature matrix (n_samples × n_features)
    pub features: Array2<f64>,

    /// Class id per row
    pub labels: Vec<usize>,

    /// Number of distinct classes
    pub n_classes: usize,

    /// Number of samples
    pub n_samples: usize,

    /// Number of features
    pub n_features: usize,
}

impl TrainingDataset {
    pub fn new(features: Array2<f64>, labels: Vec<usize>, n_classes: usize) -> Self {
        let n_samples = features.nrows();
        let n_features = features.ncols();
        Self {
            features,
            labels,
            n_classes,
            n_samples,
            n_features,
        }
    }

    /// Rows selected by index, in the given order
    pub fn select(&self, indices: &[usize]) -> TrainingDataset {
        TrainingDataset::new(
            self.features.select(Axis(0), indices),
            indices.iter().map(|&i| self.labels[i]).collect(),
            self.n_classes,
        )
    }

    /// Stratified, seeded split into train/test sets.
    ///
    /// Every class with at least two rows contributes at least one test row
    /// and keeps at least one training row.
    pub fn train_test_split(&self, test_size: f64, seed: u64) -> (TrainingDataset, TrainingDataset) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut by_class: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for (idx, &label) in self.labels.iter().enumerate() {
            by_class.entry(label).or_default().push(idx);
        }

        let mut train_idx = Vec::new();
        let mut test_idx = Vec::new();
        for (_, mut rows) in by_class {
            rows.shuffle(&mut rng);
            let n = rows.len();
            let n_test = if n < 2 {
                0
            } else {
                ((n as f64 * test_size).round() as usize).clamp(1, n - 1)
            };
            test_idx.extend_from_slice(&rows[..n_test]);
            train_idx.extend_from_slice(&rows[n_test..]);
        }

        train_idx.shuffle(&mut rng);
        test_idx.shuffle(&mut rng);

        (self.select(&train_idx), self.select(&test_idx))
    }

    /// Number of rows per class id
    pub fn class_counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.n_classes];
        for &label in &self.labels {
            if label < counts.len() {
                counts[label] += 1;
            }
        }
        counts
    }
}

/// Model evaluation metrics
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelMetrics {
    /// Accuracy
    pub accuracy: f64,

    /// Macro-averaged precision
    pub precision: f64,

    /// Macro-averaged recall
    pub recall: f64,

    /// Macro-averaged F1 score
    pub f1_score: f64,

    /// Rows evaluated
    pub n_samples: usize,

    /// confusion_matrix[actual][predicted]
    pub confusion_matrix: Vec<Vec<usize>>,

    /// Per-class metrics keyed by class label
    pub per_class_metrics: BTreeMap<String, ClassMetrics>,
}

/// Per-class evaluation metrics
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub support: usize,
}

impl ModelMetrics {
    pub fn new() -> Self {
        Self {
            accuracy: 0.0,
            precision: 0.0,
            recall: 0.0,
            f1_score: 0.0,
            n_samples: 0,
            confusion_matrix: Vec::new(),
            per_class_metrics: BTreeMap::new(),
        }
    }
}

impl Default for ModelMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Model metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Model name
    pub name: String,

    /// Crate version that trained the model
    pub version: String,

    /// Model type
    pub model_type: ModelType,

    /// Training timestamp
    pub trained_at: chrono::DateTime<chrono::Utc>,

    /// Number of training samples
    pub n_training_samples: usize,

    /// Number of held-out samples
    pub n_evaluation_samples: usize,

    /// Number of features
    pub n_features: usize,

    /// Training metrics
    pub training_metrics: ModelMetrics,

    /// Held-out evaluation metrics
    pub evaluation_metrics: ModelMetrics,

    /// Hyperparameters
    pub hyperparameters: BTreeMap<String, String>,
}

/// Model type enumeration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ModelType {
    /// Bagged decision trees
    #[default]
    RandomForest,

    /// Single decision tree
    DecisionTree,

    /// Logistic regression
    LogisticRegression,

    /// Gaussian naive Bayes
    NaiveBayes,
}

impl std::fmt::Display for ModelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelType::RandomForest => write!(f, "Random Forest"),
            ModelType::DecisionTree => write!(f, "Decision Tree"),
            ModelType::LogisticRegression => write!(f, "Logistic Regression"),
            ModelType::NaiveBayes => write!(f, "Naive Bayes"),
        }
    }
}

impl std::str::FromStr for ModelType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "random_forest" | "rf" => Ok(ModelType::RandomForest),
            "decision_tree" | "tree" => Ok(ModelType::DecisionTree),
            "logistic_regression" | "logreg" => Ok(ModelType::LogisticRegression),
            "naive_bayes" | "nb" => Ok(ModelType::NaiveBayes),
            other => Err(format!("unknown model type '{}'", other)),
        }
    }
}
