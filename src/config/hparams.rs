use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::activation::activation::ActivationFunction;
use crate::config::args::Overrides;
use crate::data::builtin;
use crate::data::csv::load_csv;
use crate::data::dataset::ClassificationDataset;
use crate::data::loader::LoaderOptions;
use crate::error::{Result, TrainError};
use crate::loss::loss_type::LossType;
use crate::metrics::classification::MetricsConfig;
use crate::optim::sgd::Sgd;
use crate::train::train_config::{
    checkpoint_interval_from_minutes, FitConfig, DEFAULT_CHECKPOINT_MINUTES, DEFAULT_DEBUG_BATCHES,
};

/// Hyperparameters of one experiment, read from YAML.
///
/// `debug`, `debug_batches`, `device`, `noprogressbar` and
/// `ckpt_interval_minutes` may appear in the file but are replaced by the
/// command-line values in `apply_overrides`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Hparams {
    pub experiment_folder: PathBuf,
    #[serde(default)]
    pub seed: u64,
    pub number_of_epochs: usize,
    #[serde(default)]
    pub model: ModelConfig,
    pub optimizer: OptimizerConfig,
    #[serde(default)]
    pub loss: LossType,
    /// Absent: no metrics are computed.
    #[serde(default)]
    pub metrics: Option<MetricsConfig>,
    /// Absent: checkpointing is disabled.
    #[serde(default)]
    pub checkpointer: Option<CheckpointerConfig>,
    pub train_dataset: DatasetConfig,
    pub valid_dataset: DatasetConfig,
    /// Optional held-out split, evaluated once after `fit`.
    #[serde(default)]
    pub test_dataset: Option<DatasetConfig>,
    #[serde(default)]
    pub dataloader_options: LoaderOptions,

    #[serde(default)]
    pub debug: bool,
    #[serde(default = "default_debug_batches")]
    pub debug_batches: usize,
    #[serde(default = "default_device")]
    pub device: String,
    #[serde(default)]
    pub noprogressbar: bool,
    #[serde(default = "default_ckpt_interval_minutes")]
    pub ckpt_interval_minutes: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub hidden_layers: Vec<usize>,
    #[serde(default = "default_activation")]
    pub activation: ActivationFunction,
}

impl Default for ModelConfig {
    fn default() -> Self {
        ModelConfig { hidden_layers: Vec::new(), activation: default_activation() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizerConfig {
    pub lr: f64,
    #[serde(default)]
    pub momentum: f64,
}

impl OptimizerConfig {
    pub fn build(&self) -> Sgd {
        Sgd::new(self.lr).with_momentum(self.momentum)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointerConfig {
    /// Epoch-end records kept on disk.
    #[serde(default = "default_keep_epoch_end")]
    pub keep_epoch_end: usize,
}

/// Where a split comes from.
///
/// ```yaml
/// train_dataset:
///   kind: csv
///   path: data/train.csv
///   n_classes: 3
/// valid_dataset:
///   kind: blobs
///   n: 64
///   offset: 256
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DatasetConfig {
    Csv { path: PathBuf, n_classes: usize },
    Xor,
    Circles { n: usize, #[serde(default)] offset: usize },
    Blobs { n: usize, #[serde(default)] offset: usize },
}

impl DatasetConfig {
    /// Loads the split. Relative CSV paths resolve against `base_dir`.
    pub fn build(&self, base_dir: &Path) -> Result<ClassificationDataset> {
        match self {
            DatasetConfig::Csv { path, n_classes } => {
                let path = if path.is_relative() { base_dir.join(path) } else { path.clone() };
                load_csv(&path, *n_classes)
            }
            DatasetConfig::Xor => builtin::xor(),
            DatasetConfig::Circles { n, offset } => builtin::circles(*n, *offset),
            DatasetConfig::Blobs { n, offset } => builtin::blobs(*n, *offset),
        }
    }
}

fn default_debug_batches() -> usize {
    DEFAULT_DEBUG_BATCHES
}

fn default_device() -> String {
    "cuda:0".to_string()
}

fn default_ckpt_interval_minutes() -> f64 {
    DEFAULT_CHECKPOINT_MINUTES
}

fn default_activation() -> ActivationFunction {
    ActivationFunction::ReLU
}

fn default_keep_epoch_end() -> usize {
    3
}

impl Hparams {
    /// Reads and validates a YAML file.
    pub fn load(path: &Path) -> Result<Hparams> {
        let text = fs::read_to_string(path).map_err(|e| TrainError::io(path, e))?;
        Self::from_yaml(&text)
    }

    pub fn from_yaml(text: &str) -> Result<Hparams> {
        let hparams: Hparams = serde_yaml::from_str(text)
            .map_err(|e| TrainError::config(format!("invalid hyperparameter file: {e}")))?;
        hparams.validate()?;
        Ok(hparams)
    }

    pub fn validate(&self) -> Result<()> {
        if self.experiment_folder.as_os_str().is_empty() {
            return Err(TrainError::config("experiment_folder must not be empty"));
        }
        if self.number_of_epochs == 0 {
            return Err(TrainError::config("number_of_epochs must be at least 1"));
        }
        if !(self.optimizer.lr.is_finite() && self.optimizer.lr > 0.0) {
            return Err(TrainError::config(format!(
                "optimizer.lr must be positive, got {}",
                self.optimizer.lr
            )));
        }
        if !(0.0..1.0).contains(&self.optimizer.momentum) {
            return Err(TrainError::config(format!(
                "optimizer.momentum must be in [0, 1), got {}",
                self.optimizer.momentum
            )));
        }
        if self.model.hidden_layers.contains(&0) {
            return Err(TrainError::config("model.hidden_layers must not contain 0"));
        }
        if self.dataloader_options.batch_size == 0 {
            return Err(TrainError::config("dataloader_options.batch_size must be at least 1"));
        }
        if let Some(ref ckpt) = self.checkpointer {
            if ckpt.keep_epoch_end == 0 {
                return Err(TrainError::config("checkpointer.keep_epoch_end must be at least 1"));
            }
        }
        Ok(())
    }

    /// Command-line values win over the file.
    pub fn apply_overrides(&mut self, overrides: &Overrides) {
        self.debug = overrides.debug;
        self.debug_batches = overrides.debug_batches;
        self.device = overrides.device.clone();
        self.noprogressbar = overrides.noprogressbar;
        self.ckpt_interval_minutes = overrides.ckpt_interval_minutes;
    }

    /// Loop settings for `StageController::fit`.
    pub fn fit_config(&self) -> FitConfig {
        let mut config = FitConfig::new(self.number_of_epochs)
            .with_debug(self.debug, self.debug_batches)
            .with_progress_bar(!self.noprogressbar);
        config.checkpoint_interval = checkpoint_interval_from_minutes(self.ckpt_interval_minutes);
        config
    }

    /// Loader options with the experiment seed folded in, so the shuffle
    /// order follows `seed` unless the loader section sets its own.
    pub fn loader_options(&self) -> LoaderOptions {
        let mut options = self.dataloader_options.clone();
        options.seed = options.seed.or(Some(self.seed));
        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const YAML: &str = "
experiment_folder: runs/blobs
seed: 42
number_of_epochs: 3
model:
  hidden_layers: [8]
  activation: tanh
optimizer:
  lr: 0.1
loss: cross_entropy
metrics:
  top_k: 2
checkpointer:
  keep_epoch_end: 2
train_dataset:
  kind: blobs
  n: 40
valid_dataset:
  kind: blobs
  n: 10
  offset: 40
dataloader_options:
  batch_size: 8
  shuffle: true
";

    #[test]
    fn test_parse_full_file() {
        let hp = Hparams::from_yaml(YAML).unwrap();
        assert_eq!(hp.number_of_epochs, 3);
        assert_eq!(hp.model.hidden_layers, vec![8]);
        assert_eq!(hp.model.activation, ActivationFunction::Tanh);
        assert_eq!(hp.metrics, Some(MetricsConfig { top_k: 2 }));
        assert_eq!(hp.checkpointer, Some(CheckpointerConfig { keep_epoch_end: 2 }));
        assert_eq!(hp.valid_dataset, DatasetConfig::Blobs { n: 10, offset: 40 });
        assert_eq!(hp.dataloader_options.batch_size, 8);
        assert!(hp.dataloader_options.shuffle);
        assert_eq!(hp.loader_options().seed, Some(42));
        assert_eq!(hp.device, "cuda:0");
        assert_eq!(hp.test_dataset, None);
    }

    #[test]
    fn test_explicit_zero_loader_seed_is_kept() {
        let yaml = YAML.replace("shuffle: true", "shuffle: true\n  seed: 0");
        let hp = Hparams::from_yaml(&yaml).unwrap();
        assert_eq!(hp.dataloader_options.seed, Some(0));
        assert_eq!(hp.loader_options().seed, Some(0));
    }

    #[test]
    fn test_missing_key_is_config_error() {
        let yaml = YAML.replace("number_of_epochs: 3\n", "");
        assert!(matches!(Hparams::from_yaml(&yaml), Err(TrainError::Config(_))));
    }

    #[test]
    fn test_bad_values_rejected() {
        let yaml = YAML.replace("lr: 0.1", "lr: -1.0");
        assert!(matches!(Hparams::from_yaml(&yaml), Err(TrainError::Config(_))));
        let yaml = YAML.replace("batch_size: 8", "batch_size: 0");
        assert!(matches!(Hparams::from_yaml(&yaml), Err(TrainError::Config(_))));
    }

    #[test]
    fn test_overrides_win() {
        let mut hp = Hparams::from_yaml(&format!("{YAML}debug: false\nckpt_interval_minutes: 5\n")).unwrap();
        hp.apply_overrides(&Overrides {
            debug: true,
            debug_batches: 4,
            device: "cpu".to_string(),
            noprogressbar: true,
            ckpt_interval_minutes: 0.0,
            log_file: None,
        });
        let cfg = hp.fit_config();
        assert_eq!(cfg.batch_limit(), Some(4));
        assert_eq!(cfg.checkpoint_interval, None);
        assert!(!cfg.show_progress);
        assert_eq!(hp.device, "cpu");
    }

    #[test]
    fn test_default_interval() {
        let hp = Hparams::from_yaml(YAML).unwrap();
        assert_eq!(hp.fit_config().checkpoint_interval, Some(Duration::from_secs(900)));
    }

    #[test]
    fn test_build_builtin_and_csv() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("train.csv"), "x,y,label\n0.1,0.2,0\n0.3,0.4,1\n").unwrap();
        let csv = DatasetConfig::Csv { path: PathBuf::from("train.csv"), n_classes: 2 };
        assert_eq!(csv.build(dir.path()).unwrap().n_features(), 2);
        assert_eq!(DatasetConfig::Xor.build(dir.path()).unwrap().n_classes(), 2);
    }
}
