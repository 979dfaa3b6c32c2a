//! Everything an experiment is configured with: CLI arguments, the YAML
//! hyperparameter file and the on-disk experiment folder.

pub mod args;
pub mod experiment;
pub mod hparams;

pub use args::{Args, Overrides};
pub use experiment::{prepare_experiment_folder, ExperimentPaths};
pub use hparams::{CheckpointerConfig, DatasetConfig, Hparams, ModelConfig, OptimizerConfig};
