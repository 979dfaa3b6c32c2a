/// Categorical cross-entropy against a class index, for a Softmax output.
pub struct CrossEntropyLoss;

/// Keeps ln() away from zero.
const EPS: f64 = 1e-12;

impl CrossEntropyLoss {
    /// L = -ln(p[class] + eps)
    pub fn loss(probabilities: &[f64], class: usize) -> f64 {
        -(probabilities[class] + EPS).ln()
    }

    /// Combined Softmax + CE gradient w.r.t. the logits: `p - onehot(class)`.
    ///
    /// The Softmax layer's element-wise derivative is 1.0, so this delta
    /// passes through it unchanged.
    pub fn derivative(probabilities: &[f64], class: usize) -> Vec<f64> {
        let mut grad = probabilities.to_vec();
        grad[class] -= 1.0;
        grad
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confident_prediction_has_small_loss() {
        assert!(CrossEntropyLoss::loss(&[0.01, 0.99], 1) < 0.02);
        assert!(CrossEntropyLoss::loss(&[0.99, 0.01], 1) > 4.0);
    }

    #[test]
    fn test_derivative_is_p_minus_y() {
        assert_eq!(CrossEntropyLoss::derivative(&[0.25, 0.75], 0), vec![-0.75, 0.75]);
    }
}
