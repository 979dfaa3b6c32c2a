use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use stagefit::config::{prepare_experiment_folder, Args, Hparams};
use stagefit::data::Dataset;
use stagefit::logging::{init_logger, LoggerOptions};
use stagefit::{CheckpointStore, ClassifierHooks, DirectoryCheckpointStore, StageController};

fn main() -> Result<()> {
    let args = Args::parse();

    let mut hparams = Hparams::load(&args.param_file)
        .with_context(|| format!("loading {}", args.param_file.display()))?;
    hparams.apply_overrides(&args.overrides());
    let device = args.device()?;

    let paths = prepare_experiment_folder(&hparams.experiment_folder, &args.param_file, &args.overrides())?;
    let _logger = init_logger(&LoggerOptions {
        log_file: paths.log_file.clone(),
        debug: hparams.debug,
        stdout: true,
    })?;
    info!(
        experiment = %paths.root.display(),
        %device,
        debug = hparams.debug,
        "starting experiment"
    );

    let base_dir = args.param_file.parent().unwrap_or(Path::new("."));
    let train_set = hparams.train_dataset.build(base_dir).context("building train_dataset")?;
    let valid_set = hparams.valid_dataset.build(base_dir).context("building valid_dataset")?;
    info!(train = train_set.len(), valid = valid_set.len(), "datasets loaded");

    let hooks = ClassifierHooks::build(
        train_set.n_features(),
        train_set.n_classes(),
        &hparams.model.hidden_layers,
        hparams.model.activation,
        hparams.optimizer.build(),
        hparams.loss,
        hparams.metrics.as_ref(),
        hparams.seed,
    )?;

    let checkpointer = hparams.checkpointer.as_ref().map(|c| {
        Box::new(DirectoryCheckpointStore::new(&paths.save_dir, c.keep_epoch_end)) as Box<dyn CheckpointStore>
    });

    let mut controller = StageController::new(hooks, checkpointer, hparams.fit_config(), device);
    if let Some(record) = controller.resume()? {
        info!(epoch = record.epoch, step = record.step, "recovered checkpoint");
    }

    let loader = hparams.loader_options();
    let report = controller.fit(&train_set, &valid_set, &loader)?;
    info!(
        epochs = report.summaries.len(),
        step = report.final_state.current_step,
        stopped_early = report.stopped_early,
        "fit finished"
    );

    if let Some(ref test) = hparams.test_dataset {
        let test_set = test.build(base_dir).context("building test_dataset")?;
        controller.evaluate(&test_set, &loader)?;
    }

    Ok(())
}
