use serde::{Serialize, Deserialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationFunction {
    Sigmoid,
    #[serde(rename = "relu")]
    ReLU,
    Identity,
    /// Vector-valued; applied over the whole layer output by `Layer::activate()`.
    Softmax,
    Tanh,
    #[serde(rename = "leaky_relu")]
    LeakyReLU { alpha: f64 },
}

impl ActivationFunction {
    /// Applies the activation to a full pre-activation vector.
    pub fn apply(&self, z: &[f64]) -> Vec<f64> {
        match self {
            ActivationFunction::Softmax => softmax(z),
            _ => z.iter().map(|&x| self.function(x)).collect(),
        }
    }

    /// Element-wise activation. `Softmax` is handled in `apply()`; here it
    /// degrades to identity so callers never panic on it.
    pub fn function(&self, x: f64) -> f64 {
        match self {
            ActivationFunction::Sigmoid => 1.0 / (1.0 + (-x).exp()),
            ActivationFunction::ReLU => x.max(0.0),
            ActivationFunction::Identity | ActivationFunction::Softmax => x,
            ActivationFunction::Tanh => x.tanh(),
            ActivationFunction::LeakyReLU { alpha } => if x > 0.0 { x } else { alpha * x },
        }
    }

    /// Element-wise derivative at the pre-activation value `x`.
    ///
    /// `Softmax` returns 1.0: it is always paired with cross-entropy, whose
    /// derivative already yields the combined gradient `p - y`.
    pub fn derivative(&self, x: f64) -> f64 {
        match self {
            ActivationFunction::Sigmoid => {
                let fx = self.function(x);
                fx * (1.0 - fx)
            }
            ActivationFunction::ReLU => if x > 0.0 { 1.0 } else { 0.0 },
            ActivationFunction::Identity | ActivationFunction::Softmax => 1.0,
            ActivationFunction::Tanh => {
                let t = x.tanh();
                1.0 - t * t
            }
            ActivationFunction::LeakyReLU { alpha } => if x > 0.0 { 1.0 } else { *alpha },
        }
    }

    /// ReLU-family layers use He init, everything else Xavier.
    pub fn prefers_he_init(&self) -> bool {
        matches!(self, ActivationFunction::ReLU | ActivationFunction::LeakyReLU { .. })
    }
}

/// Numerically stable softmax (max-shifted).
fn softmax(z: &[f64]) -> Vec<f64> {
    let max = z.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = z.iter().map(|x| (x - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_softmax_sums_to_one() {
        let p = ActivationFunction::Softmax.apply(&[1000.0, 1001.0, 999.0]);
        let total: f64 = p.iter().sum();
        assert!((total - 1.0).abs() < 1e-12);
        assert!(p[1] > p[0] && p[0] > p[2]);
    }

    #[test]
    fn test_yaml_names() {
        let a: ActivationFunction = serde_yaml::from_str("relu").unwrap();
        assert_eq!(a, ActivationFunction::ReLU);
        let b: ActivationFunction = serde_yaml::from_str("tanh").unwrap();
        assert_eq!(b, ActivationFunction::Tanh);
    }
}
