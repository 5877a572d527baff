use crate::ml::error::{MlError, MlResult};
use crate::ml::forest::RandomForestModel;
use crate::ml::models::{ModelType, TrainingConfig, TrainingDataset};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::linear::logistic_regression::{LogisticRegression, LogisticRegressionParameters};
use smartcore::naive_bayes::gaussian::GaussianNB;
use smartcore::tree::decision_tree_classifier::{
    DecisionTreeClassifier, DecisionTreeClassifierParameters, SplitCriterion,
};
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};

pub(crate) type Tree = DecisionTreeClassifier<f64, i32, DenseMatrix<f64>, Vec<i32>>;

/// Trait for classifiers
pub trait Classifier: Send + Sync {
    /// Fit the classifier on encoded data
    fn train(&mut self, dataset: &TrainingDataset) -> MlResult<()>;

    /// Predict class ids
    fn predict(&self, features: &Array2<f64>) -> MlResult<Vec<usize>>;

    /// Predict class probabilities (n_samples × n_classes)
    fn predict_proba(&self, features: &Array2<f64>) -> MlResult<Array2<f64>>;

    /// Get model type
    fn model_type(&self) -> ModelType;

    /// Hyperparameters recorded in the model metadata
    fn hyperparameters(&self) -> BTreeMap<String, String>;

    /// Check if model is trained
    fn is_trained(&self) -> bool;
}

pub(crate) fn ndarray_to_densematrix(arr: &Array2<f64>) -> DenseMatrix<f64> {
    let shape = arr.shape();
    let data: Vec<f64> = arr.iter().copied().collect();
    DenseMatrix::new(shape[0], shape[1], data, false)
}

pub(crate) fn labels_to_i32(labels: &[usize]) -> Vec<i32> {
    labels.iter().map(|&x| x as i32).collect()
}

/// Probabilities for models that only expose hard predictions
pub(crate) fn one_hot(predictions: &[usize], n_classes: usize) -> Array2<f64> {
    let mut proba = Array2::zeros((predictions.len(), n_classes));
    for (i, &pred) in predictions.iter().enumerate() {
        if pred < n_classes {
            proba[[i, pred]] = 1.0;
        }
    }
    proba
}

pub(crate) fn ensure_trainable(dataset: &TrainingDataset) -> MlResult<()> {
    if dataset.n_samples == 0 {
        return Err(MlError::Training("training set is empty".to_string()));
    }
    if dataset.n_features == 0 {
        return Err(MlError::Training("training set has no features".to_string()));
    }
    Ok(())
}

fn not_trained() -> MlError {
    MlError::Inference("model not trained".to_string())
}

/// First (feature, class) pair whose values never vary within the class
pub fn zero_variance_feature(dataset: &TrainingDataset) -> Option<(usize, usize)> {
    let mut bounds = vec![vec![None::<(f64, f64)>; dataset.n_features]; dataset.n_classes];
    for (row, &class) in dataset.features.rows().into_iter().zip(&dataset.labels) {
        let Some(class_bounds) = bounds.get_mut(class) else {
            continue;
        };
        for (j, &value) in row.iter().enumerate() {
            let (lo, hi) = class_bounds[j].get_or_insert((value, value));
            *lo = lo.min(value);
            *hi = hi.max(value);
        }
    }

    bounds.iter().enumerate().find_map(|(class, features)| {
        features.iter().enumerate().find_map(|(j, b)| match b {
            Some((lo, hi)) if lo == hi => Some((j, class)),
            _ => None,
        })
    })
}

/// Run a smartcore call, turning a panic inside the library into an error message
fn guarded<T, E: std::fmt::Display>(call: impl FnOnce() -> Result<T, E>) -> Result<T, String> {
    match panic::catch_unwind(AssertUnwindSafe(call)) {
        Ok(result) => result.map_err(|e| e.to_string()),
        Err(payload) => Err(payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "classifier panicked".to_string())),
    }
}

pub(crate) fn tree_parameters(max_depth: u16, min_samples_leaf: usize) -> DecisionTreeClassifierParameters {
    DecisionTreeClassifierParameters::default()
        .with_max_depth(max_depth)
        .with_min_samples_leaf(min_samples_leaf)
        .with_criterion(SplitCriterion::Gini)
}

/// Single decision tree
#[derive(Serialize, Deserialize)]
pub struct DecisionTreeModel {
    model: Option<Tree>,
    n_classes: usize,
    max_depth: u16,
    min_samples_leaf: usize,
}

impl DecisionTreeModel {
    pub fn new(n_classes: usize, max_depth: u16, min_samples_leaf: usize) -> Self {
        Self {
            model: None,
            n_classes,
            max_depth,
            min_samples_leaf,
        }
    }
}

impl Classifier for DecisionTreeModel {
    fn train(&mut self, dataset: &TrainingDataset) -> MlResult<()> {
        ensure_trainable(dataset)?;

        let x = ndarray_to_densematrix(&dataset.features);
        let y = labels_to_i32(&dataset.labels);
        let params = tree_parameters(self.max_depth, self.min_samples_leaf);

        let model = DecisionTreeClassifier::fit(&x, &y, params)
            .map_err(|e| MlError::Training(format!("failed to fit decision tree: {}", e)))?;

        self.model = Some(model);
        Ok(())
    }

    fn predict(&self, features: &Array2<f64>) -> MlResult<Vec<usize>> {
        let model = self.model.as_ref().ok_or_else(not_trained)?;
        if features.nrows() == 0 {
            return Ok(Vec::new());
        }

        let x = ndarray_to_densematrix(features);
        let predictions = model
            .predict(&x)
            .map_err(|e| MlError::Inference(format!("prediction failed: {}", e)))?;

        Ok(predictions.iter().map(|&x| x as usize).collect())
    }

    fn predict_proba(&self, features: &Array2<f64>) -> MlResult<Array2<f64>> {
        let predictions = self.predict(features)?;
        Ok(one_hot(&predictions, self.n_classes))
    }

    fn model_type(&self) -> ModelType {
        ModelType::DecisionTree
    }

    fn hyperparameters(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("max_depth".to_string(), self.max_depth.to_string()),
            ("min_samples_leaf".to_string(), self.min_samples_leaf.to_string()),
            ("criterion".to_string(), "gini".to_string()),
        ])
    }

    fn is_trained(&self) -> bool {
        self.model.is_some()
    }
}

/// Logistic regression
#[derive(Serialize, Deserialize)]
pub struct LogisticRegressionModel {
    model: Option<LogisticRegression<f64, i32, DenseMatrix<f64>, Vec<i32>>>,
    n_classes: usize,
}

impl LogisticRegressionModel {
    pub fn new(n_classes: usize) -> Self {
        Self {
            model: None,
            n_classes,
        }
    }
}

impl Classifier for LogisticRegressionModel {
    fn train(&mut self, dataset: &TrainingDataset) -> MlResult<()> {
        ensure_trainable(dataset)?;

        let x = ndarray_to_densematrix(&dataset.features);
        let y = labels_to_i32(&dataset.labels);

        let params = LogisticRegressionParameters::default();
        let model = LogisticRegression::fit(&x, &y, params).map_err(|e| {
            MlError::Training(format!("logistic regression did not converge: {}", e))
        })?;

        self.model = Some(model);
        Ok(())
    }

    fn predict(&self, features: &Array2<f64>) -> MlResult<Vec<usize>> {
        let model = self.model.as_ref().ok_or_else(not_trained)?;
        if features.nrows() == 0 {
            return Ok(Vec::new());
        }

        let x = ndarray_to_densematrix(features);
        let predictions = model
            .predict(&x)
            .map_err(|e| MlError::Inference(format!("prediction failed: {}", e)))?;

        Ok(predictions.iter().map(|&x| x as usize).collect())
    }

    fn predict_proba(&self, features: &Array2<f64>) -> MlResult<Array2<f64>> {
        let predictions = self.predict(features)?;
        Ok(one_hot(&predictions, self.n_classes))
    }

    fn model_type(&self) -> ModelType {
        ModelType::LogisticRegression
    }

    fn hyperparameters(&self) -> BTreeMap<String, String> {
        BTreeMap::from([("solver".to_string(), "lbfgs".to_string())])
    }

    fn is_trained(&self) -> bool {
        self.model.is_some()
    }
}

/// Gaussian naive Bayes
#[derive(Serialize, Deserialize)]
pub struct NaiveBayesModel {
    model: Option<GaussianNB<f64, usize, DenseMatrix<f64>, Vec<usize>>>,
    n_classes: usize,
}

impl NaiveBayesModel {
    pub fn new(n_classes: usize) -> Self {
        Self {
            model: None,
            n_classes,
        }
    }
}

impl Classifier for NaiveBayesModel {
    fn train(&mut self, dataset: &TrainingDataset) -> MlResult<()> {
        ensure_trainable(dataset)?;

        // a class-constant feature yields NaN log-likelihoods in smartcore
        if let Some((feature, class)) = zero_variance_feature(dataset) {
            return Err(MlError::Training(format!(
                "feature {} has zero variance in class {}",
                feature, class
            )));
        }

        let x = ndarray_to_densematrix(&dataset.features);
        let y = dataset.labels.clone();

        let model = guarded(|| GaussianNB::fit(&x, &y, Default::default()))
            .map_err(|e| MlError::Training(format!("failed to fit naive Bayes: {}", e)))?;

        self.model = Some(model);
        Ok(())
    }

    fn predict(&self, features: &Array2<f64>) -> MlResult<Vec<usize>> {
        let model = self.model.as_ref().ok_or_else(not_trained)?;
        if features.nrows() == 0 {
            return Ok(Vec::new());
        }

        let x = ndarray_to_densematrix(features);
        guarded(|| model.predict(&x))
            .map_err(|e| MlError::Inference(format!("prediction failed: {}", e)))
    }

    fn predict_proba(&self, features: &Array2<f64>) -> MlResult<Array2<f64>> {
        let predictions = self.predict(features)?;
        Ok(one_hot(&predictions, self.n_classes))
    }

    fn model_type(&self) -> ModelType {
        ModelType::NaiveBayes
    }

    fn hyperparameters(&self) -> BTreeMap<String, String> {
        BTreeMap::new()
    }

    fn is_trained(&self) -> bool {
        self.model.is_some()
    }
}

/// Any fitted classifier, in a form that can be written to the model artifact
#[derive(Serialize, Deserialize)]
pub enum TrainedModel {
    RandomForest(RandomForestModel),
    DecisionTree(DecisionTreeModel),
    LogisticRegression(LogisticRegressionModel),
    NaiveBayes(NaiveBayesModel),
}

impl TrainedModel {
    /// Untrained classifier for the configured model type
    pub fn new(config: &TrainingConfig, n_classes: usize) -> Self {
        match config.model_type {
            ModelType::RandomForest => TrainedModel::RandomForest(RandomForestModel::new(
                n_classes,
                config.n_trees,
                config.max_depth,
                config.min_samples_leaf,
                config.max_features,
                config.seed,
            )),
            ModelType::DecisionTree => TrainedModel::DecisionTree(DecisionTreeModel::new(
                n_classes,
                config.max_depth,
                config.min_samples_leaf,
            )),
            ModelType::LogisticRegression => {
                TrainedModel::LogisticRegression(LogisticRegressionModel::new(n_classes))
            }
            ModelType::NaiveBayes => TrainedModel::NaiveBayes(NaiveBayesModel::new(n_classes)),
        }
    }

    fn inner(&self) -> &dyn Classifier {
        match self {
            TrainedModel::RandomForest(m) => m,
            TrainedModel::DecisionTree(m) => m,
            TrainedModel::LogisticRegression(m) => m,
            TrainedModel::NaiveBayes(m) => m,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Classifier {
        match self {
            TrainedModel::RandomForest(m) => m,
            TrainedModel::DecisionTree(m) => m,
            TrainedModel::LogisticRegression(m) => m,
            TrainedModel::NaiveBayes(m) => m,
        }
    }
}

impl Classifier for TrainedModel {
    fn train(&mut self, dataset: &TrainingDataset) -> MlResult<()> {
        self.inner_mut().train(dataset)
    }

    fn predict(&self, features: &Array2<f64>) -> MlResult<Vec<usize>> {
        self.inner().predict(features)
    }

    fn predict_proba(&self, features: &Array2<f64>) -> MlResult<Array2<f64>> {
        self.inner().predict_proba(features)
    }

    fn model_type(&self) -> ModelType {
        self.inner().model_type()
    }

    fn hyperparameters(&self) -> BTreeMap<String, String> {
        self.inner().hyperparameters()
    }

    fn is_trained(&self) -> bool {
        self.inner().is_trained()
    }
}

impl std::fmt::Debug for TrainedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrainedModel")
            .field("model_type", &self.model_type())
            .field("trained", &self.is_trained())
            .finish()
    }
}
