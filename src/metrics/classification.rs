use serde::{Deserialize, Serialize};

use crate::metrics::accumulator::{AggregationMode, BatchSums, MetricAccumulator, MetricsSnapshot};

/// Options for `ClassificationMetrics`, read from the `metrics` config section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Also report `top{k}_accuracy` when greater than 1.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_top_k() -> usize {
    1
}

impl Default for MetricsConfig {
    fn default() -> Self {
        MetricsConfig { top_k: default_top_k() }
    }
}

/// Accuracy-style metrics over class-probability predictions.
///
/// Each batch contributes one value per metric (its batch accuracy), so the
/// `Mean` reduction is a mean across batches.
#[derive(Debug, Clone)]
pub struct ClassificationMetrics {
    top_k: usize,
    top_k_name: String,
    sums: BatchSums,
}

impl ClassificationMetrics {
    pub fn new(config: &MetricsConfig) -> Self {
        let top_k = config.top_k.max(1);
        ClassificationMetrics {
            top_k,
            top_k_name: format!("top{top_k}_accuracy"),
            sums: BatchSums::default(),
        }
    }
}

impl MetricAccumulator for ClassificationMetrics {
    type Predictions = [Vec<f64>];
    type Labels = [usize];

    fn reset(&mut self) {
        self.sums.clear();
    }

    fn update(&mut self, predictions: &[Vec<f64>], labels: &[usize]) {
        let n = predictions.len().min(labels.len());
        if n == 0 {
            return;
        }

        let mut correct = 0usize;
        let mut correct_top_k = 0usize;
        for (probs, &label) in predictions.iter().zip(labels.iter()) {
            if argmax(probs) == Some(label) {
                correct += 1;
            }
            if self.top_k > 1 && rank_of(probs, label) < self.top_k {
                correct_top_k += 1;
            }
        }

        let accuracy = correct as f64 / n as f64;
        let mut values = vec![("accuracy", accuracy), ("error_rate", 1.0 - accuracy)];
        if self.top_k > 1 {
            values.push((self.top_k_name.as_str(), correct_top_k as f64 / n as f64));
        }
        self.sums.push(values);
    }

    fn get_metrics(&self, mode: AggregationMode) -> MetricsSnapshot {
        self.sums.reduce(mode)
    }
}

/// Index of the maximum element; `None` on an empty slice.
fn argmax(v: &[f64]) -> Option<usize> {
    v.iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(i, _)| i)
}

/// Number of classes scored strictly higher than `label`.
fn rank_of(probs: &[f64], label: usize) -> usize {
    match probs.get(label) {
        Some(&p) => probs.iter().filter(|&&q| q > p).count(),
        None => usize::MAX,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn preds() -> Vec<Vec<f64>> {
        vec![
            vec![0.7, 0.2, 0.1],
            vec![0.1, 0.3, 0.6],
            vec![0.5, 0.4, 0.1],
            vec![0.2, 0.2, 0.6],
        ]
    }

    #[test]
    fn test_accuracy_mean_across_batches() {
        let mut m = ClassificationMetrics::new(&MetricsConfig::default());
        m.update(&preds()[..2], &[0, 2]); // 1.0
        m.update(&preds()[2..], &[1, 0]); // 0.0
        let out = m.get_metrics(AggregationMode::Mean);
        assert_eq!(out["accuracy"], 0.5);
        assert_eq!(out["error_rate"], 0.5);
        assert!(!out.contains_key("top1_accuracy"));
    }

    #[test]
    fn test_top_k() {
        let mut m = ClassificationMetrics::new(&MetricsConfig { top_k: 2 });
        m.update(&preds(), &[0, 1, 1, 1]);
        let out = m.get_metrics(AggregationMode::Mean);
        assert_eq!(out["accuracy"], 0.25);
        // Sample 3 ties classes 0 and 1 below class 2, so label 1 is still top-2.
        assert_eq!(out["top2_accuracy"], 1.0);
    }

    #[test]
    fn test_reset_leaves_nothing_behind() {
        let mut m = ClassificationMetrics::new(&MetricsConfig::default());
        m.update(&preds(), &[0, 2, 0, 2]);
        m.reset();
        assert!(m.get_metrics(AggregationMode::Mean).is_empty());
    }

    #[test]
    fn test_get_metrics_does_not_consume() {
        let mut m = ClassificationMetrics::new(&MetricsConfig::default());
        m.update(&preds(), &[0, 2, 0, 2]);
        let first = m.get_metrics(AggregationMode::Sum);
        let second = m.get_metrics(AggregationMode::Sum);
        assert_eq!(first, second);
    }
}
