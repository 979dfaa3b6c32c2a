//! Stage-scoped metric accumulation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Reduced metric values keyed by name. Ordered so log lines and checkpoint
/// payloads come out the same way every time.
pub type MetricsSnapshot = BTreeMap<String, f64>;

/// How per-batch values are combined by `get_metrics`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationMode {
    /// Arithmetic mean across batches.
    #[default]
    Mean,
    /// Plain sum across batches.
    Sum,
}

/// Collects per-batch prediction/label pairs for the active stage.
///
/// Implementations keep running sums and counts, never raw predictions, so
/// `update` can be called every iteration without growing memory.
pub trait MetricAccumulator {
    type Predictions: ?Sized;
    type Labels: ?Sized;

    /// Clears everything seen so far. Called once at the start of every stage.
    fn reset(&mut self);

    /// Folds one batch into the running state.
    fn update(&mut self, predictions: &Self::Predictions, labels: &Self::Labels);

    /// Reduces the running state. Does not clear it.
    fn get_metrics(&self, mode: AggregationMode) -> MetricsSnapshot;
}

/// Per-name running sums over batches, shared by accumulator implementations.
#[derive(Debug, Clone, Default)]
pub struct BatchSums {
    batches: usize,
    sums: BTreeMap<String, f64>,
}

impl BatchSums {
    pub fn clear(&mut self) {
        self.batches = 0;
        self.sums.clear();
    }

    /// Records one batch worth of per-batch values.
    pub fn push<'a>(&mut self, values: impl IntoIterator<Item = (&'a str, f64)>) {
        self.batches += 1;
        for (name, value) in values {
            *self.sums.entry(name.to_string()).or_insert(0.0) += value;
        }
    }

    pub fn reduce(&self, mode: AggregationMode) -> MetricsSnapshot {
        if self.batches == 0 {
            return MetricsSnapshot::new();
        }
        let n = self.batches as f64;
        self.sums
            .iter()
            .map(|(k, v)| {
                let value = match mode {
                    AggregationMode::Mean => v / n,
                    AggregationMode::Sum => *v,
                };
                (k.clone(), value)
            })
            .collect()
    }
}

/// Running arithmetic mean, updated one value at a time.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunningAverage {
    value: f64,
    count: usize,
}

impl RunningAverage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds `x` in and returns the new mean.
    pub fn update(&mut self, x: f64) -> f64 {
        self.count += 1;
        self.value += (x - self.value) / self.count as f64;
        self.value
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn count(&self) -> usize {
        self.count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_sums_mean_and_sum() {
        let mut sums = BatchSums::default();
        sums.push([("accuracy", 0.5)]);
        sums.push([("accuracy", 1.0)]);
        assert_eq!(sums.reduce(AggregationMode::Mean)["accuracy"], 0.75);
        assert_eq!(sums.reduce(AggregationMode::Sum)["accuracy"], 1.5);
        sums.clear();
        assert!(sums.reduce(AggregationMode::Mean).is_empty());
    }

    #[test]
    fn test_running_average() {
        let mut avg = RunningAverage::new();
        for x in [1.0, 2.0, 3.0, 4.0] {
            avg.update(x);
        }
        assert!((avg.value() - 2.5).abs() < 1e-12);
        assert_eq!(avg.count(), 4);
    }
}
