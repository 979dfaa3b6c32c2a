use std::sync::mpsc;
use std::sync::{Arc, atomic::AtomicBool};
use std::time::Duration;

use crate::train::summary::EpochSummary;

/// Number of batches per stage when debug mode is on and nothing else is set.
pub const DEFAULT_DEBUG_BATCHES: usize = 2;

/// Intra-epoch checkpoint interval used when none is given, in minutes.
pub const DEFAULT_CHECKPOINT_MINUTES: f64 = 15.0;

/// Configuration for a `StageController::fit` run.
///
/// # Fields
/// - `epochs`             : epoch budget for the run (resumed runs count
///                           already completed epochs against it)
/// - `checkpoint_interval`: wall-clock time between intra-epoch saves
///                           during TRAIN; `None` disables them
/// - `debug`              : truncate every stage pass to `debug_batches`
/// - `show_progress`      : draw a progress bar per stage pass
/// - `progress_tx`        : optional channel; one `EpochSummary` is sent per
///                           completed epoch. If the receiver is dropped the
///                           loop stops after that epoch.
/// - `stop_flag`          : optional atomic flag; when set from another
///                           thread the loop stops before the next batch.
pub struct FitConfig {
    pub epochs: usize,
    pub checkpoint_interval: Option<Duration>,
    pub debug: bool,
    pub debug_batches: usize,
    pub show_progress: bool,
    pub progress_tx: Option<mpsc::Sender<EpochSummary>>,
    pub stop_flag: Option<Arc<AtomicBool>>,
}

impl FitConfig {
    /// Default interval, debug off, no progress bar, no channel, no stop flag.
    pub fn new(epochs: usize) -> Self {
        FitConfig {
            epochs,
            checkpoint_interval: checkpoint_interval_from_minutes(DEFAULT_CHECKPOINT_MINUTES),
            debug: false,
            debug_batches: DEFAULT_DEBUG_BATCHES,
            show_progress: false,
            progress_tx: None,
            stop_flag: None,
        }
    }

    pub fn with_checkpoint_interval_minutes(mut self, minutes: f64) -> Self {
        self.checkpoint_interval = checkpoint_interval_from_minutes(minutes);
        self
    }

    pub fn with_debug(mut self, debug: bool, debug_batches: usize) -> Self {
        self.debug = debug;
        self.debug_batches = debug_batches;
        self
    }

    pub fn with_progress_bar(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn with_stop_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.stop_flag = Some(flag);
        self
    }

    pub fn with_progress_channel(mut self, tx: mpsc::Sender<EpochSummary>) -> Self {
        self.progress_tx = Some(tx);
        self
    }

    /// Per-stage batch cap; `None` outside debug mode.
    pub fn batch_limit(&self) -> Option<usize> {
        self.debug.then_some(self.debug_batches)
    }
}

/// Non-positive or non-finite minutes disable intra-epoch checkpoints.
pub fn checkpoint_interval_from_minutes(minutes: f64) -> Option<Duration> {
    (minutes.is_finite() && minutes > 0.0).then(|| Duration::from_secs_f64(minutes * 60.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_from_minutes() {
        assert_eq!(checkpoint_interval_from_minutes(1.5), Some(Duration::from_secs(90)));
        assert_eq!(checkpoint_interval_from_minutes(0.0), None);
        assert_eq!(checkpoint_interval_from_minutes(-3.0), None);
        assert_eq!(checkpoint_interval_from_minutes(f64::NAN), None);
    }

    #[test]
    fn test_defaults() {
        let cfg = FitConfig::new(4);
        assert_eq!(cfg.checkpoint_interval, Some(Duration::from_secs(900)));
        assert_eq!(cfg.batch_limit(), None);
        assert_eq!(cfg.with_debug(true, 3).batch_limit(), Some(3));
    }
}
