pub mod error;
pub mod math;
pub mod activation;
pub mod layers;
pub mod network;
pub mod loss;
pub mod optim;
pub mod metrics;
pub mod checkpoint;
pub mod data;
pub mod train;
pub mod classifier;
pub mod config;
pub mod logging;

// Convenience re-exports
pub use error::{Result, TrainError};
pub use activation::activation::ActivationFunction;
pub use network::network::Network;
pub use loss::loss_type::LossType;
pub use optim::sgd::Sgd;
pub use metrics::accumulator::{AggregationMode, MetricAccumulator, MetricsSnapshot};
pub use metrics::classification::{ClassificationMetrics, MetricsConfig};
pub use checkpoint::{CheckpointKind, CheckpointRecord, CheckpointStore, DirectoryCheckpointStore, MemoryCheckpointStore};
pub use data::{Batch, ClassificationDataset, DataLoader, Dataset, Device, LabeledSample, LoaderOptions};
pub use train::{EpochState, EpochSummary, FitConfig, FitReport, Phase, Stage, StageController, StageHooks, StageSummary};
pub use classifier::ClassifierHooks;
pub use logging::{init_logger, LoggerOptions};
