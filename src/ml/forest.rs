//! Random forest built from bootstrap-sampled smartcore decision trees

use crate::ml::classifier::{
    ensure_trainable, labels_to_i32, ndarray_to_densematrix, tree_parameters, Classifier, Tree,
};
use crate::ml::error::{MlError, MlResult};
use crate::ml::models::{ModelType, TrainingDataset};
use ndarray::{Array2, Axis};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Serialize, Deserialize)]
enum ForestMember {
    /// Bootstrap sample contained a single class
    Constant(usize),

    /// Tree fitted on a subset of the feature columns
    Tree { columns: Vec<usize>, model: Tree },
}

/// Bagged decision trees voting on the class.
///
/// The confidence of a prediction is the share of trees voting for it.
#[derive(Serialize, Deserialize)]
pub struct RandomForestModel {
    members: Vec<ForestMember>,
    n_classes: usize,
    n_trees: usize,
    max_depth: u16,
    min_samples_leaf: usize,
    max_features: Option<usize>,
    seed: u64,
}

impl RandomForestModel {
    pub fn new(
        n_classes: usize,
        n_trees: usize,
        max_depth: u16,
        min_samples_leaf: usize,
        max_features: Option<usize>,
        seed: u64,
    ) -> Self {
        Self {
            members: Vec::new(),
            n_classes,
            n_trees: n_trees.max(1),
            max_depth,
            min_samples_leaf,
            max_features,
            seed,
        }
    }

    pub fn n_members(&self) -> usize {
        self.members.len()
    }

    fn votes(&self, features: &Array2<f64>) -> MlResult<Array2<f64>> {
        if self.members.is_empty() {
            return Err(MlError::Inference("model not trained".to_string()));
        }

        let n_samples = features.nrows();
        let mut votes = Array2::<f64>::zeros((n_samples, self.n_classes));
        if n_samples == 0 {
            return Ok(votes);
        }

        for member in &self.members {
            match member {
                ForestMember::Constant(class) => {
                    if *class < self.n_classes {
                        votes.column_mut(*class).mapv_inplace(|v| v + 1.0);
                    }
                }
                ForestMember::Tree { columns, model } => {
                    let x = ndarray_to_densematrix(&features.select(Axis(1), columns));
                    let predictions = model
                        .predict(&x)
                        .map_err(|e| MlError::Inference(format!("tree prediction failed: {}", e)))?;
                    for (row, &class) in predictions.iter().enumerate() {
                        let class = class as usize;
                        if class < self.n_classes {
                            votes[[row, class]] += 1.0;
                        }
                    }
                }
            }
        }

        Ok(votes)
    }
}

impl Classifier for RandomForestModel {
    fn train(&mut self, dataset: &TrainingDataset) -> MlResult<()> {
        ensure_trainable(dataset)?;

        let n_samples = dataset.n_samples;
        let n_features = dataset.n_features;
        let per_tree = self.max_features.unwrap_or(n_features).clamp(1, n_features);
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut members = Vec::with_capacity(self.n_trees);

        for tree_idx in 0..self.n_trees {
            let rows: Vec<usize> = (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect();

            let mut columns: Vec<usize> = (0..n_features).collect();
            if per_tree < n_features {
                columns.shuffle(&mut rng);
                columns.truncate(per_tree);
                columns.sort_unstable();
            }

            let labels: Vec<usize> = rows.iter().map(|&r| dataset.labels[r]).collect();
            if labels.iter().all(|&l| l == labels[0]) {
                members.push(ForestMember::Constant(labels[0]));
                continue;
            }

            let sample = dataset
                .features
                .select(Axis(0), &rows)
                .select(Axis(1), &columns);
            let x = ndarray_to_densematrix(&sample);
            let y = labels_to_i32(&labels);

            let model = Tree::fit(&x, &y, tree_parameters(self.max_depth, self.min_samples_leaf))
                .map_err(|e| {
                    MlError::Training(format!("failed to fit tree {}: {}", tree_idx, e))
                })?;

            members.push(ForestMember::Tree { columns, model });
        }

        debug!(
            trees = members.len(),
            features_per_tree = per_tree,
            "Random forest fitted"
        );

        self.members = members;
        Ok(())
    }

    fn predict(&self, features: &Array2<f64>) -> MlResult<Vec<usize>> {
        let votes = self.votes(features)?;
        Ok(votes
            .rows()
            .into_iter()
            .map(|row| {
                // first maximum wins so ties resolve to the lowest class id
                row.iter()
                    .enumerate()
                    .fold((0usize, f64::MIN), |best, (class, &count)| {
                        if count > best.1 {
                            (class, count)
                        } else {
                            best
                        }
                    })
                    .0
            })
            .collect())
    }

    fn predict_proba(&self, features: &Array2<f64>) -> MlResult<Array2<f64>> {
        let votes = self.votes(features)?;
        Ok(votes / self.members.len() as f64)
    }

    fn model_type(&self) -> ModelType {
        ModelType::RandomForest
    }

    fn hyperparameters(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("n_trees".to_string(), self.n_trees.to_string()),
            ("max_depth".to_string(), self.max_depth.to_string()),
            ("min_samples_leaf".to_string(), self.min_samples_leaf.to_string()),
            (
                "max_features".to_string(),
                self.max_features
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| "all".to_string()),
            ),
            ("seed".to_string(), self.seed.to_string()),
        ])
    }

    fn is_trained(&self) -> bool {
        !self.members.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset(n_samples: usize) -> TrainingDataset {
        // class 1 when the second feature is high
        let features = Array2::from_shape_fn((n_samples, 3), |(i, j)| match j {
            0 => (i % 11) as f64,
            1 => {
                if i % 3 == 0 {
                    60.0 + (i % 5) as f64
                } else {
                    30.0 + (i % 7) as f64
                }
            }
            _ => (i % 13) as f64 * 0.3,
        });
        let labels = (0..n_samples).map(|i| usize::from(i % 3 == 0)).collect();
        TrainingDataset::new(features, labels, 2)
    }

    fn sample_rows() -> Array2<f64> {
        Array2::from_shape_vec((2, 3), vec![4.0, 62.0, 1.2, 4.0, 33.0, 1.2]).unwrap()
    }

    #[test]
    fn test_forest_learns_threshold() {
        let mut forest = RandomForestModel::new(2, 15, 6, 1, None, 3);
        forest.train(&dataset(90)).unwrap();

        assert!(forest.is_trained());
        assert_eq!(forest.n_members(), 15);
        assert_eq!(forest.predict(&sample_rows()).unwrap(), vec![1, 0]);
    }

    #[test]
    fn test_probabilities_are_vote_shares() {
        let mut forest = RandomForestModel::new(2, 10, 6, 1, None, 3);
        forest.train(&dataset(90)).unwrap();

        let proba = forest.predict_proba(&sample_rows()).unwrap();
        for row in proba.rows() {
            let total: f64 = row.sum();
            assert!((total - 1.0).abs() < 1e-9);
            for &p in row.iter() {
                assert!((0.0..=1.0).contains(&p));
                assert!((p * 10.0 - (p * 10.0).round()).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_same_seed_same_forest() {
        let data = dataset(60);
        let sample = Array2::from_shape_fn((20, 3), |(i, j)| (i * 3 + j * 7) as f64 % 65.0);

        let mut a = RandomForestModel::new(2, 8, 4, 1, Some(2), 99);
        let mut b = RandomForestModel::new(2, 8, 4, 1, Some(2), 99);
        a.train(&data).unwrap();
        b.train(&data).unwrap();

        assert_eq!(
            a.predict_proba(&sample).unwrap(),
            b.predict_proba(&sample).unwrap()
        );
    }

    #[test]
    fn test_single_class_bootstrap_becomes_constant() {
        let features = Array2::from_shape_fn((5, 2), |(i, j)| (i + j) as f64);
        let data = TrainingDataset::new(features, vec![1; 5], 2);
        let mut forest = RandomForestModel::new(2, 3, 4, 1, None, 1);

        forest.train(&data).unwrap();

        let proba = forest.predict_proba(&Array2::zeros((1, 2))).unwrap();
        assert_eq!(proba[[0, 1]], 1.0);
        assert_eq!(forest.predict(&Array2::zeros((1, 2))).unwrap(), vec![1]);
    }

    #[test]
    fn test_untrained_forest() {
        let forest = RandomForestModel::new(2, 3, 4, 1, None, 1);
        assert!(!forest.is_trained());
        assert!(forest.predict(&sample_rows()).is_err());
    }
}
