use crate::data::loader::Batch;
use crate::error::Result;
use crate::metrics::accumulator::MetricsSnapshot;
use crate::train::stage::Stage;

/// User-supplied behaviour the `StageController` calls into.
///
/// `forward` and `compute_loss` are required. The rest default to no-ops, so
/// an implementation without metrics, optimizer or recoverable state stays
/// small.
pub trait StageHooks {
    type Sample;
    type Output;

    /// Runs the model on one batch.
    fn forward(&mut self, batch: &Batch<Self::Sample>, stage: Stage) -> Result<Self::Output>;

    /// Scalar loss for one batch. Usually also feeds the metric accumulator.
    fn compute_loss(
        &mut self,
        predictions: &Self::Output,
        batch: &Batch<Self::Sample>,
        stage: Stage,
    ) -> Result<f64>;

    /// Parameter update; only called during TRAIN.
    fn optimizer_step(&mut self, _predictions: &Self::Output, _batch: &Batch<Self::Sample>) -> Result<()> {
        Ok(())
    }

    /// Called before the first batch of every stage pass.
    fn on_stage_start(&mut self, _stage: Stage, _epoch: usize) -> Result<()> {
        Ok(())
    }

    /// Called after the last batch of every stage pass with the stage's mean
    /// loss. Returns the reduced metrics for that stage.
    fn on_stage_end(&mut self, _stage: Stage, _loss: f64, _epoch: usize) -> Result<MetricsSnapshot> {
        Ok(MetricsSnapshot::new())
    }

    /// State stored alongside each checkpoint.
    fn recoverable_state(&self) -> Result<serde_json::Value> {
        Ok(serde_json::Value::Null)
    }

    /// Inverse of `recoverable_state`, called when a run resumes.
    fn restore_state(&mut self, _state: &serde_json::Value) -> Result<()> {
        Ok(())
    }
}
