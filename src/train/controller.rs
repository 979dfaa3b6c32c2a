use std::sync::atomic::Ordering;
use std::time::Instant;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use crate::checkpoint::record::CheckpointRecord;
use crate::checkpoint::store::CheckpointStore;
use crate::data::dataset::Dataset;
use crate::data::loader::{DataLoader, Device, LoaderOptions};
use crate::error::Result;
use crate::metrics::accumulator::RunningAverage;
use crate::train::epoch_state::EpochState;
use crate::train::hooks::StageHooks;
use crate::train::stage::Stage;
use crate::train::summary::{EpochSummary, FitReport, StageSummary};
use crate::train::train_config::FitConfig;

/// Where the controller is in the per-epoch lifecycle.
///
/// `Idle → TrainRunning → TrainDone → ValidRunning → ValidDone → Idle`;
/// `evaluate` passes through `TestRunning`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    TrainRunning,
    TrainDone,
    ValidRunning,
    ValidDone,
    TestRunning,
}

enum StageOutcome {
    Completed(StageSummary),
    Interrupted,
}

/// Progress and hook state as of the last completed epoch.
struct EpochSnapshot {
    state: EpochState,
    hooks_state: serde_json::Value,
}

/// Runs the epoch loop and decides when checkpoints are written.
///
/// Owns the hooks, the optional checkpoint store and the `EpochState` for
/// the whole lifetime of a run; nothing else mutates them.
pub struct StageController<H: StageHooks> {
    hooks: H,
    checkpointer: Option<Box<dyn CheckpointStore>>,
    config: FitConfig,
    device: Device,
    state: EpochState,
    phase: Phase,
    last_intra_save: Instant,
}

impl<H: StageHooks> StageController<H> {
    pub fn new(
        hooks: H,
        checkpointer: Option<Box<dyn CheckpointStore>>,
        config: FitConfig,
        device: Device,
    ) -> Self {
        StageController {
            hooks,
            checkpointer,
            config,
            device,
            state: EpochState::default(),
            phase: Phase::Idle,
            last_intra_save: Instant::now(),
        }
    }

    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    pub fn into_hooks(self) -> H {
        self.hooks
    }

    pub fn state(&self) -> EpochState {
        self.state
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    // -----------------------------------------------------------------------
    // Public entry points
    // -----------------------------------------------------------------------

    /// Restores `EpochState` and the hooks' recoverable state from the latest
    /// epoch-end checkpoint. Returns the record used, or `None` when there is
    /// no store or nothing to resume from.
    pub fn resume(&mut self) -> Result<Option<CheckpointRecord>> {
        let Some(store) = self.checkpointer.as_ref() else {
            return Ok(None);
        };
        let Some(record) = store.load_latest()? else {
            return Ok(None);
        };

        self.hooks.restore_state(&record.state)?;
        self.state = EpochState {
            current_epoch: record.epoch,
            current_step: record.step,
            avg_train_loss: record.fields.get("train_loss").copied().unwrap_or(0.0),
        };

        info!(
            epoch = record.epoch,
            step = record.step,
            "resuming from epoch-end checkpoint"
        );
        Ok(Some(record))
    }

    /// Runs TRAIN then VALID for every remaining epoch of the budget.
    ///
    /// An epoch-end checkpoint is written after each VALID pass. During TRAIN
    /// an intra-epoch checkpoint is written whenever `checkpoint_interval`
    /// has elapsed since the previous one (or since `fit` started).
    ///
    /// # Early termination
    /// The loop stops without error if:
    /// - `config.stop_flag` is set (checked before every batch and stage), or
    /// - the `progress_tx` receiver has been dropped.
    ///
    /// A stop inside an epoch rolls the hooks and `EpochState` back to where
    /// that epoch started, so a later `fit` replays it from the same point a
    /// `resume` would.
    ///
    /// Hook errors abort the run and propagate unchanged.
    pub fn fit<T, V>(
        &mut self,
        train_set: &T,
        valid_set: &V,
        loader: &LoaderOptions,
    ) -> Result<FitReport>
    where
        T: Dataset<Sample = H::Sample>,
        V: Dataset<Sample = H::Sample>,
    {
        self.last_intra_save = Instant::now();
        let first_epoch = self.state.current_epoch + 1;
        let mut summaries = Vec::new();
        let mut stopped_early = false;

        if first_epoch > self.config.epochs {
            info!(epochs = self.config.epochs, "epoch budget already exhausted");
        }

        for epoch in first_epoch..=self.config.epochs {
            if self.stop_requested() {
                stopped_early = true;
                break;
            }

            let t_start = Instant::now();
            let snapshot = self.snapshot()?;
            self.state.current_epoch = epoch;

            // ── TRAIN ─────────────────────────────────────────────────────
            let train = match self.run_stage(Stage::Train, train_set, loader)? {
                StageOutcome::Completed(summary) => summary,
                StageOutcome::Interrupted => {
                    self.abandon_epoch(snapshot)?;
                    stopped_early = true;
                    break;
                }
            };
            self.set_phase(Phase::TrainDone);

            if self.stop_requested() {
                self.abandon_epoch(snapshot)?;
                stopped_early = true;
                break;
            }

            // ── VALID ─────────────────────────────────────────────────────
            let valid = match self.run_stage(Stage::Valid, valid_set, loader)? {
                StageOutcome::Completed(summary) => summary,
                StageOutcome::Interrupted => {
                    self.abandon_epoch(snapshot)?;
                    stopped_early = true;
                    break;
                }
            };
            self.set_phase(Phase::ValidDone);

            let summary = EpochSummary {
                epoch,
                total_epochs: self.config.epochs,
                step: self.state.current_step,
                train_loss: self.state.avg_train_loss,
                val_loss: valid.loss,
                train_metrics: train.metrics,
                metrics: valid.metrics,
                elapsed_ms: t_start.elapsed().as_millis() as u64,
            };
            info!("{summary}");

            self.save_epoch_end(&summary)?;
            self.set_phase(Phase::Idle);
            summaries.push(summary.clone());

            if let Some(ref tx) = self.config.progress_tx {
                if tx.send(summary).is_err() {
                    stopped_early = epoch < self.config.epochs;
                    break;
                }
            }
        }

        self.set_phase(Phase::Idle);
        Ok(FitReport {
            summaries,
            final_state: self.state,
            stopped_early,
        })
    }

    /// One TEST pass: no optimizer step, no checkpoint. Returns `None` if the
    /// stop flag interrupted it.
    pub fn evaluate<D>(
        &mut self,
        test_set: &D,
        loader: &LoaderOptions,
    ) -> Result<Option<StageSummary>>
    where
        D: Dataset<Sample = H::Sample>,
    {
        let outcome = self.run_stage(Stage::Test, test_set, loader)?;
        self.set_phase(Phase::Idle);

        match outcome {
            StageOutcome::Completed(summary) => {
                let metrics: String = summary.metrics.iter()
                    .map(|(k, v)| format!(" {k}=={v:.4}"))
                    .collect();
                info!("test: loss {:.4} metrics:{metrics}", summary.loss);
                Ok(Some(summary))
            }
            StageOutcome::Interrupted => Ok(None),
        }
    }

    // -----------------------------------------------------------------------
    // Private helpers
    // -----------------------------------------------------------------------

    /// One pass over `dataset` in `stage`.
    fn run_stage<D>(
        &mut self,
        stage: Stage,
        dataset: &D,
        options: &LoaderOptions,
    ) -> Result<StageOutcome>
    where
        D: Dataset<Sample = H::Sample>,
    {
        let epoch = self.state.current_epoch;
        let loader = DataLoader::new(dataset, options, epoch, self.device)?;
        let limit = self.config.batch_limit().unwrap_or(usize::MAX);
        let progress = self.progress_bar(stage, epoch, loader.num_batches().min(limit));

        self.set_phase(match stage {
            Stage::Train => Phase::TrainRunning,
            Stage::Valid => Phase::ValidRunning,
            Stage::Test => Phase::TestRunning,
        });
        self.hooks.on_stage_start(stage, epoch)?;

        let mut avg_loss = RunningAverage::new();
        if stage.is_training() {
            self.state.avg_train_loss = 0.0;
        }

        for batch in loader.take(limit) {
            if self.stop_requested() {
                progress.abandon();
                info!(%stage, epoch, step = self.state.current_step, "stop requested");
                return Ok(StageOutcome::Interrupted);
            }

            let predictions = self.hooks.forward(&batch, stage)?;
            let loss = self.hooks.compute_loss(&predictions, &batch, stage)?;
            if stage.is_training() {
                self.hooks.optimizer_step(&predictions, &batch)?;
            }

            let mean = avg_loss.update(loss);
            self.state.current_step += 1;
            progress.inc(1);

            if stage.is_training() {
                self.state.avg_train_loss = mean;
                progress.set_message(format!("train_loss={mean:.4}"));
                self.maybe_save_intra_epoch()?;
            }
        }
        progress.finish_and_clear();

        let loss = avg_loss.value();
        let metrics = self.hooks.on_stage_end(stage, loss, epoch)?;
        debug!(%stage, epoch, batches = avg_loss.count(), loss, "stage finished");

        Ok(StageOutcome::Completed(StageSummary {
            stage,
            epoch,
            loss,
            batches: avg_loss.count(),
            metrics,
        }))
    }

    /// Writes the epoch-end record: VALID metrics plus both losses.
    fn save_epoch_end(&mut self, summary: &EpochSummary) -> Result<()> {
        if self.checkpointer.is_none() {
            return Ok(());
        }

        let mut fields = summary.metrics.clone();
        fields.insert("train_loss".to_string(), summary.train_loss);
        fields.insert("val_loss".to_string(), summary.val_loss);
        let record = CheckpointRecord::epoch_end(fields, summary.epoch, summary.step)
            .with_state(self.hooks.recoverable_state()?);

        match self.checkpointer.as_mut() {
            Some(store) => store.save(record),
            None => Ok(()),
        }
    }

    /// Intra-epoch save when the wall-clock interval has elapsed.
    fn maybe_save_intra_epoch(&mut self) -> Result<()> {
        let Some(interval) = self.config.checkpoint_interval else {
            return Ok(());
        };
        if self.last_intra_save.elapsed() < interval {
            return Ok(());
        }

        if self.checkpointer.is_some() {
            let (epoch, step) = (self.state.current_epoch, self.state.current_step);
            let record = CheckpointRecord::intra_epoch(epoch, step)
                .with_state(self.hooks.recoverable_state()?);
            if let Some(store) = self.checkpointer.as_mut() {
                store.save(record)?;
            }
        }
        self.last_intra_save = Instant::now();
        Ok(())
    }

    fn snapshot(&self) -> Result<EpochSnapshot> {
        Ok(EpochSnapshot {
            state: self.state,
            hooks_state: self.hooks.recoverable_state()?,
        })
    }

    /// Undoes a partial epoch: model, optimizer, step counter and epoch
    /// number all go back to the snapshot taken before its TRAIN stage.
    fn abandon_epoch(&mut self, snapshot: EpochSnapshot) -> Result<()> {
        info!(
            epoch = self.state.current_epoch,
            discarded_steps = self.state.current_step - snapshot.state.current_step,
            "rolling back partial epoch"
        );
        self.hooks.restore_state(&snapshot.hooks_state)?;
        self.state = snapshot.state;
        self.set_phase(Phase::Idle);
        Ok(())
    }

    fn stop_requested(&self) -> bool {
        self.config
            .stop_flag
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    fn set_phase(&mut self, phase: Phase) {
        if self.phase != phase {
            debug!(from = ?self.phase, to = ?phase, "phase transition");
            self.phase = phase;
        }
    }

    fn progress_bar(&self, stage: Stage, epoch: usize, total: usize) -> ProgressBar {
        if !self.config.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(total as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{prefix} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        pb.set_prefix(format!("epoch {epoch} {stage}"));
        pb
    }
}
