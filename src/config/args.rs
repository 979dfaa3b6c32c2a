use std::path::PathBuf;

use clap::Parser;
use serde::Serialize;

use crate::data::loader::Device;
use crate::error::Result;
use crate::train::train_config::{DEFAULT_CHECKPOINT_MINUTES, DEFAULT_DEBUG_BATCHES};

/// Run a classification experiment described by a YAML hyperparameter file.
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "stagefit", version, about, long_about = None)]
pub struct Args {
    /// YAML hyperparameter file
    pub param_file: PathBuf,

    /// Run only a few batches of every stage to check the pipeline end to end
    #[arg(long)]
    pub debug: bool,

    /// Number of batches per stage in debug mode
    #[arg(long = "debug_batches", default_value_t = DEFAULT_DEBUG_BATCHES)]
    pub debug_batches: usize,

    /// Device the run is bound to (cpu, cuda, cuda:N)
    #[arg(long, default_value = "cuda:0")]
    pub device: String,

    /// Disable the per-stage progress bars
    #[arg(long)]
    pub noprogressbar: bool,

    /// Minutes between intra-epoch checkpoints; non-positive disables them
    #[arg(
        long = "ckpt_interval_minutes",
        default_value_t = DEFAULT_CHECKPOINT_MINUTES,
        allow_negative_numbers = true
    )]
    pub ckpt_interval_minutes: f64,

    /// Log file (defaults to <experiment_folder>/log.txt)
    #[arg(long = "log_file")]
    pub log_file: Option<PathBuf>,
}

impl Args {
    pub fn device(&self) -> Result<Device> {
        self.device.parse()
    }

    /// The command-line values that override the hyperparameter file, as
    /// written to `overrides.yaml` in the experiment folder.
    pub fn overrides(&self) -> Overrides {
        Overrides {
            debug: self.debug,
            debug_batches: self.debug_batches,
            device: self.device.clone(),
            noprogressbar: self.noprogressbar,
            ckpt_interval_minutes: self.ckpt_interval_minutes,
            log_file: self.log_file.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overrides {
    pub debug: bool,
    pub debug_batches: usize,
    pub device: String,
    pub noprogressbar: bool,
    pub ckpt_interval_minutes: f64,
    pub log_file: Option<PathBuf>,
}
