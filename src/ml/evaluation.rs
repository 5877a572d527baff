use crate::ml::models::{ClassMetrics, ModelMetrics};
use std::collections::BTreeMap;

/// Score predictions against ground truth.
///
/// `classes[i]` names class id `i`; precision, recall and F1 are macro-averaged
/// over every class, including classes absent from `y_true`.
pub fn calculate_metrics(y_true: &[usize], y_pred: &[usize], classes: &[String]) -> ModelMetrics {
    let n_samples = y_true.len();
    let n_classes = classes.len();
    if n_samples == 0 || n_classes == 0 {
        return ModelMetrics::new();
    }

    let mut confusion = vec![vec![0usize; n_classes]; n_classes];
    for (&t, &p) in y_true.iter().zip(y_pred.iter()) {
        if t < n_classes && p < n_classes {
            confusion[t][p] += 1;
        }
    }

    let correct: usize = (0..n_classes).map(|c| confusion[c][c]).sum();
    let accuracy = correct as f64 / n_samples as f64;

    let mut per_class = BTreeMap::new();
    let mut sum_precision = 0.0;
    let mut sum_recall = 0.0;
    let mut sum_f1 = 0.0;

    for (class_idx, name) in classes.iter().enumerate() {
        let tp = confusion[class_idx][class_idx];
        let fp: usize = (0..n_classes)
            .filter(|&t| t != class_idx)
            .map(|t| confusion[t][class_idx])
            .sum();
        let fn_count: usize = (0..n_classes)
            .filter(|&p| p != class_idx)
            .map(|p| confusion[class_idx][p])
            .sum();

        let precision = ratio(tp, tp + fp);
        let recall = ratio(tp, tp + fn_count);
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };

        sum_precision += precision;
        sum_recall += recall;
        sum_f1 += f1;

        per_class.insert(
            name.clone(),
            ClassMetrics {
                precision,
                recall,
                f1_score: f1,
                support: tp + fn_count,
            },
        );
    }

    ModelMetrics {
        accuracy,
        precision: sum_precision / n_classes as f64,
        recall: sum_recall / n_classes as f64,
        f1_score: sum_f1 / n_classes as f64,
        n_samples,
        confusion_matrix: confusion,
        per_class_metrics: per_class,
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den > 0 {
        num as f64 / den as f64
    } else {
        0.0
    }
}
