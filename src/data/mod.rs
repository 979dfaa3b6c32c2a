pub mod builtin;
pub mod csv;
pub mod dataset;
pub mod loader;

pub use dataset::{ClassificationDataset, Dataset, LabeledSample};
pub use loader::{Batch, DataLoader, Device, LoaderOptions};
