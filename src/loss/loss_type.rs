use serde::{Serialize, Deserialize};

use crate::loss::cross_entropy::CrossEntropyLoss;
use crate::loss::mse::MseLoss;

/// Selects the per-sample loss used by the classifier.
///
/// - `CrossEntropy`: pair with a Softmax output (the default classifier head).
/// - `Mse`         : squared error against the one-hot target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossType {
    #[default]
    CrossEntropy,
    Mse,
}

impl LossType {
    /// Scalar loss for one sample.
    pub fn loss(&self, predicted: &[f64], class: usize) -> f64 {
        match self {
            LossType::CrossEntropy => CrossEntropyLoss::loss(predicted, class),
            LossType::Mse          => MseLoss::loss(predicted, class),
        }
    }

    /// ∂L/∂output for one sample.
    pub fn derivative(&self, predicted: &[f64], class: usize) -> Vec<f64> {
        match self {
            LossType::CrossEntropy => CrossEntropyLoss::derivative(predicted, class),
            LossType::Mse          => MseLoss::derivative(predicted, class),
        }
    }
}
