use std::fmt;
use std::str::FromStr;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::data::dataset::Dataset;
use crate::error::{Result, TrainError};

/// Compute target a batch is bound to.
///
/// All arithmetic in this crate runs on the host; the device is carried so
/// hooks and logs know where the run was asked to execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Device {
    #[default]
    Cpu,
    Cuda(usize),
}

impl FromStr for Device {
    type Err = TrainError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim().to_ascii_lowercase();
        match s.as_str() {
            "cpu" => Ok(Device::Cpu),
            "cuda" => Ok(Device::Cuda(0)),
            _ => s
                .strip_prefix("cuda:")
                .and_then(|idx| idx.parse().ok())
                .map(Device::Cuda)
                .ok_or_else(|| TrainError::config(format!("unknown device '{s}'"))),
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => write!(f, "cpu"),
            Device::Cuda(idx) => write!(f, "cuda:{idx}"),
        }
    }
}

/// Loader settings, passed through verbatim from `dataloader_options`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoaderOptions {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default)]
    pub shuffle: bool,
    #[serde(default)]
    pub drop_last: bool,
    /// Base seed for shuffling; epoch `e` shuffles with `seed + e`. Unset
    /// means 0 here, and the experiment seed when built from hparams.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_batch_size() -> usize {
    32
}

impl Default for LoaderOptions {
    fn default() -> Self {
        LoaderOptions {
            batch_size: default_batch_size(),
            shuffle: false,
            drop_last: false,
            seed: None,
        }
    }
}

impl LoaderOptions {
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }
}

/// Ordered samples bound to a device, consumed once per iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch<T> {
    pub samples: Vec<T>,
    pub device: Device,
}

impl<T> Batch<T> {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.samples.iter()
    }
}

/// Lazily yields batches of a dataset in a stable order.
///
/// The order for a given `(options.seed, epoch)` pair is always the same, so
/// debug truncation and resumed runs see the same first batches.
pub struct DataLoader<'a, D: Dataset> {
    dataset: &'a D,
    order: Vec<usize>,
    batch_size: usize,
    drop_last: bool,
    cursor: usize,
    device: Device,
}

impl<'a, D: Dataset> DataLoader<'a, D> {
    pub fn new(
        dataset: &'a D,
        options: &LoaderOptions,
        epoch: usize,
        device: Device,
    ) -> Result<Self> {
        if options.batch_size == 0 {
            return Err(TrainError::config("dataloader_options.batch_size must be at least 1"));
        }

        let mut order: Vec<usize> = (0..dataset.len()).collect();
        if options.shuffle {
            let base = options.seed.unwrap_or(0);
            let mut rng = StdRng::seed_from_u64(base.wrapping_add(epoch as u64));
            order.shuffle(&mut rng);
        }

        Ok(DataLoader {
            dataset,
            order,
            batch_size: options.batch_size,
            drop_last: options.drop_last,
            cursor: 0,
            device,
        })
    }

    /// Number of batches a full pass yields.
    pub fn num_batches(&self) -> usize {
        let n = self.order.len();
        if self.drop_last {
            n / self.batch_size
        } else {
            n.div_ceil(self.batch_size)
        }
    }
}

impl<D: Dataset> Iterator for DataLoader<'_, D> {
    type Item = Batch<D::Sample>;

    fn next(&mut self) -> Option<Self::Item> {
        let remaining = self.order.len() - self.cursor;
        if remaining == 0 || (self.drop_last && remaining < self.batch_size) {
            return None;
        }

        let end = (self.cursor + self.batch_size).min(self.order.len());
        let samples = self.order[self.cursor..end]
            .iter()
            .map(|&idx| self.dataset.sample(idx))
            .collect();
        self.cursor = end;

        Some(Batch { samples, device: self.device })
    }
}
