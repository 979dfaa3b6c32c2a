use serde::{Serialize, Deserialize};

/// Progress counters owned by the `StageController`.
///
/// - `current_epoch` : 1-based number of the epoch being run; between
///                      epochs it equals the number of completed epochs
///                      (0 before the first one).
/// - `current_step`  : batches processed across TRAIN, VALID and TEST for
///                      the whole run. Never reset, restored on resume.
/// - `avg_train_loss`: running mean of the TRAIN losses of the current
///                      epoch. Reset at the start of every TRAIN stage.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EpochState {
    pub current_epoch: usize,
    pub current_step: u64,
    pub avg_train_loss: f64,
}
