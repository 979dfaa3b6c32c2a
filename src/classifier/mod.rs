pub mod hooks;

pub use hooks::{BatchPredictions, ClassifierHooks};
