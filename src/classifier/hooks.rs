use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::activation::activation::ActivationFunction;
use crate::data::dataset::LabeledSample;
use crate::data::loader::Batch;
use crate::error::{Result, TrainError};
use crate::loss::loss_type::LossType;
use crate::metrics::accumulator::{AggregationMode, MetricAccumulator, MetricsSnapshot};
use crate::metrics::classification::{ClassificationMetrics, MetricsConfig};
use crate::network::network::{ForwardTrace, Gradients, Network};
use crate::network::spec::NetworkSpec;
use crate::optim::sgd::Sgd;
use crate::train::hooks::StageHooks;
use crate::train::stage::Stage;

/// Forward traces for one batch, in batch order.
#[derive(Debug, Clone)]
pub struct BatchPredictions {
    pub traces: Vec<ForwardTrace>,
}

impl BatchPredictions {
    /// Output-layer values per sample.
    pub fn outputs(&self) -> Vec<Vec<f64>> {
        self.traces.iter().map(|t| t.output.clone()).collect()
    }
}

/// Serialized form of everything a resumed run needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ClassifierState {
    network: Network,
    optimizer: Sgd,
}

/// Dense-network classifier wired into the stage lifecycle.
///
/// Owns the network, the optimizer and the metric accumulator. Metrics are
/// reset at every stage start and reduced with `Mean` at every stage end.
#[derive(Debug, Clone)]
pub struct ClassifierHooks {
    network: Network,
    optimizer: Sgd,
    loss: LossType,
    metrics: Option<ClassificationMetrics>,
}

impl ClassifierHooks {
    pub fn new(
        network: Network,
        optimizer: Sgd,
        loss: LossType,
        metrics: Option<ClassificationMetrics>,
    ) -> Self {
        ClassifierHooks { network, optimizer, loss, metrics }
    }

    /// Builds a freshly initialised classifier. Weights come from a `StdRng`
    /// seeded with `seed`, so two runs with the same seed start identically.
    ///
    /// Cross-entropy gets a softmax head; MSE gets a sigmoid head so each
    /// output unit is fitted independently against its one-hot target.
    #[allow(clippy::too_many_arguments)]
    pub fn build(
        n_features: usize,
        n_classes: usize,
        hidden: &[usize],
        activation: ActivationFunction,
        optimizer: Sgd,
        loss: LossType,
        metrics: Option<&MetricsConfig>,
        seed: u64,
    ) -> Result<Self> {
        let mut spec = NetworkSpec::classifier(n_features, hidden, activation, n_classes);
        if loss == LossType::Mse {
            spec = spec.with_head(ActivationFunction::Sigmoid);
        }
        let network = Network::from_spec(&spec, &mut StdRng::seed_from_u64(seed))?;
        debug!(layers = network.layers.len(), n_features, n_classes, "classifier built");
        Ok(Self::new(network, optimizer, loss, metrics.map(ClassificationMetrics::new)))
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn optimizer(&self) -> &Sgd {
        &self.optimizer
    }

    pub fn loss_type(&self) -> LossType {
        self.loss
    }

    /// Predicted class of one feature vector.
    pub fn predict(&self, features: &[f64]) -> Result<usize> {
        let trace = self.network.forward_trace(features)?;
        trace
            .output
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(i, _)| i)
            .ok_or_else(|| TrainError::computation("network produced an empty output"))
    }

    fn check_label(&self, label: usize) -> Result<()> {
        let n_classes = self.network.output_size();
        if label >= n_classes {
            return Err(TrainError::computation(format!(
                "label {label} out of range for {n_classes} output classes"
            )));
        }
        Ok(())
    }
}

impl StageHooks for ClassifierHooks {
    type Sample = LabeledSample;
    type Output = BatchPredictions;

    fn forward(&mut self, batch: &Batch<LabeledSample>, _stage: Stage) -> Result<BatchPredictions> {
        let traces = batch
            .iter()
            .map(|sample| self.network.forward_trace(&sample.features))
            .collect::<Result<Vec<_>>>()?;
        Ok(BatchPredictions { traces })
    }

    fn compute_loss(
        &mut self,
        predictions: &BatchPredictions,
        batch: &Batch<LabeledSample>,
        _stage: Stage,
    ) -> Result<f64> {
        if predictions.traces.is_empty() {
            return Ok(0.0);
        }

        let mut total = 0.0;
        for (trace, sample) in predictions.traces.iter().zip(batch.iter()) {
            self.check_label(sample.label)?;
            total += self.loss.loss(&trace.output, sample.label);
        }
        let loss = total / predictions.traces.len() as f64;
        if !loss.is_finite() {
            return Err(TrainError::computation(format!("non-finite loss {loss}")));
        }

        if let Some(metrics) = self.metrics.as_mut() {
            let labels: Vec<usize> = batch.iter().map(|s| s.label).collect();
            metrics.update(&predictions.outputs(), &labels);
        }
        Ok(loss)
    }

    /// Averages per-sample gradients over the batch, then takes one SGD step.
    fn optimizer_step(&mut self, predictions: &BatchPredictions, batch: &Batch<LabeledSample>) -> Result<()> {
        let n = predictions.traces.len();
        if n == 0 {
            return Ok(());
        }

        let inv_batch = 1.0 / n as f64;
        let mut acc = Gradients::zeros_like(&self.network);
        for (trace, sample) in predictions.traces.iter().zip(batch.iter()) {
            let delta = self.loss.derivative(&trace.output, sample.label);
            let grads = self.network.backward(trace, &delta);
            acc.add_scaled(&grads, inv_batch);
        }

        self.optimizer.step(&mut self.network, &acc);
        if !self.network.layers.iter().all(|l| l.weights.is_finite()) {
            return Err(TrainError::computation("weights became non-finite after optimizer step"));
        }
        Ok(())
    }

    fn on_stage_start(&mut self, _stage: Stage, _epoch: usize) -> Result<()> {
        if let Some(metrics) = self.metrics.as_mut() {
            metrics.reset();
        }
        Ok(())
    }

    fn on_stage_end(&mut self, _stage: Stage, _loss: f64, _epoch: usize) -> Result<MetricsSnapshot> {
        Ok(self
            .metrics
            .as_ref()
            .map(|m| m.get_metrics(AggregationMode::Mean))
            .unwrap_or_default())
    }

    fn recoverable_state(&self) -> Result<serde_json::Value> {
        let state = ClassifierState {
            network: self.network.clone(),
            optimizer: self.optimizer.clone(),
        };
        Ok(serde_json::to_value(state)?)
    }

    fn restore_state(&mut self, state: &serde_json::Value) -> Result<()> {
        if state.is_null() {
            return Ok(());
        }
        let restored: ClassifierState = serde_json::from_value(state.clone())?;
        if !restored.network.same_architecture(&self.network) {
            return Err(TrainError::config(
                "checkpointed network does not match the configured architecture",
            ));
        }
        self.network = restored.network;
        self.optimizer = restored.optimizer;
        Ok(())
    }
}
