use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::metrics::accumulator::MetricsSnapshot;

/// Which save point a record represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointKind {
    /// Written after a full VALID pass. The resumption point.
    EpochEnd,
    /// Written mid-TRAIN on a wall-clock timer. Advisory only.
    IntraEpoch,
}

impl CheckpointKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckpointKind::EpochEnd => "epoch_end",
            CheckpointKind::IntraEpoch => "intra_epoch",
        }
    }
}

/// One durable snapshot of run progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointRecord {
    pub kind: CheckpointKind,
    pub epoch: usize,
    pub step: u64,
    /// Scalar payload: reduced metrics plus `train_loss`/`val_loss` for
    /// epoch-end records, empty for intra-epoch ones.
    #[serde(default)]
    pub fields: MetricsSnapshot,
    /// Opaque recoverable state (model parameters, optimizer buffers).
    #[serde(default)]
    pub state: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl CheckpointRecord {
    pub fn epoch_end(fields: MetricsSnapshot, epoch: usize, step: u64) -> Self {
        CheckpointRecord {
            kind: CheckpointKind::EpochEnd,
            epoch,
            step,
            fields,
            state: serde_json::Value::Null,
            created_at: Utc::now(),
        }
    }

    pub fn intra_epoch(epoch: usize, step: u64) -> Self {
        CheckpointRecord {
            kind: CheckpointKind::IntraEpoch,
            epoch,
            step,
            fields: MetricsSnapshot::new(),
            state: serde_json::Value::Null,
            created_at: Utc::now(),
        }
    }

    pub fn with_state(mut self, state: serde_json::Value) -> Self {
        self.state = state;
        self
    }

    /// Ordering key used to pick the most recent record.
    pub fn position(&self) -> (usize, u64) {
        (self.epoch, self.step)
    }
}
