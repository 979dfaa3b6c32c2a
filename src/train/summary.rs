use std::fmt;

use serde::{Deserialize, Serialize};

use crate::metrics::accumulator::MetricsSnapshot;
use crate::train::epoch_state::EpochState;
use crate::train::stage::Stage;

/// Result of one stage pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageSummary {
    pub stage: Stage,
    pub epoch: usize,
    /// Mean loss over the batches processed; 0.0 if there were none.
    pub loss: f64,
    pub batches: usize,
    pub metrics: MetricsSnapshot,
}

/// Per-epoch summary, logged and sent on the progress channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochSummary {
    /// 1-based epoch number.
    pub epoch: usize,
    pub total_epochs: usize,
    pub step: u64,
    pub train_loss: f64,
    pub val_loss: f64,
    /// Reduced TRAIN metrics.
    pub train_metrics: MetricsSnapshot,
    /// Reduced VALID metrics; these go into the epoch-end checkpoint.
    pub metrics: MetricsSnapshot,
    pub elapsed_ms: u64,
}

impl fmt::Display for EpochSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "epoch {}: train_loss {:.4} validation_loss {:.4} metrics:",
            self.epoch, self.train_loss, self.val_loss
        )?;
        for (name, value) in &self.metrics {
            write!(f, " {name}=={value:.4}")?;
        }
        Ok(())
    }
}

/// What `fit` hands back.
#[derive(Debug, Clone, PartialEq)]
pub struct FitReport {
    /// One entry per epoch completed during this call.
    pub summaries: Vec<EpochSummary>,
    pub final_state: EpochState,
    /// True when the stop flag or a dropped progress receiver ended the loop
    /// before the epoch budget was exhausted.
    pub stopped_early: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_line_summary() {
        let summary = EpochSummary {
            epoch: 2,
            total_epochs: 5,
            step: 16,
            train_loss: 0.51234,
            val_loss: 0.4,
            train_metrics: MetricsSnapshot::new(),
            metrics: MetricsSnapshot::from([
                ("accuracy".to_string(), 0.9),
                ("error_rate".to_string(), 0.1),
            ]),
            elapsed_ms: 12,
        };
        assert_eq!(
            summary.to_string(),
            "epoch 2: train_loss 0.5123 validation_loss 0.4000 metrics: accuracy==0.9000 error_rate==0.1000"
        );
    }
}
