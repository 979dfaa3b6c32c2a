pub mod accumulator;
pub mod classification;

pub use accumulator::{AggregationMode, MetricAccumulator, MetricsSnapshot, RunningAverage};
pub use classification::{ClassificationMetrics, MetricsConfig};
