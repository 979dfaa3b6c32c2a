use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::{math::matrix::Matrix, activation::activation::ActivationFunction};

/// Fully connected layer. Holds parameters only; activations for backprop are
/// carried by `ForwardTrace` so a forward pass needs no `&mut self`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub size: usize,
    pub input_size: usize,
    /// Shape `(input_size, size)`.
    pub weights: Matrix,
    pub biases: Vec<f64>,
    pub activator: ActivationFunction,
}

/// Gradients of the loss w.r.t. one layer's parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerGradients {
    pub weights: Matrix,
    pub biases: Vec<f64>,
}

impl LayerGradients {
    pub fn zeros_like(layer: &Layer) -> LayerGradients {
        LayerGradients {
            weights: Matrix::zeros(layer.input_size, layer.size),
            biases: vec![0.0; layer.size],
        }
    }

    pub fn add_scaled(&mut self, other: &LayerGradients, factor: f64) {
        self.weights.add_scaled(&other.weights, factor);
        for (b, g) in self.biases.iter_mut().zip(other.biases.iter()) {
            *b += factor * g;
        }
    }
}

impl Layer {
    pub fn new<R: Rng + ?Sized>(
        size: usize,
        input_size: usize,
        activation: ActivationFunction,
        rng: &mut R,
    ) -> Layer {
        let weights = if activation.prefers_he_init() {
            Matrix::he(input_size, size, rng)
        } else {
            Matrix::xavier(input_size, size, rng)
        };

        Layer {
            size,
            input_size,
            weights,
            biases: vec![0.0; size],
            activator: activation,
        }
    }

    /// z = x·W + b
    pub fn pre_activation(&self, input: &[f64]) -> Vec<f64> {
        let mut z = self.weights.left_mul(input);
        for (zj, bj) in z.iter_mut().zip(self.biases.iter()) {
            *zj += bj;
        }
        z
    }

    pub fn activate(&self, z: &[f64]) -> Vec<f64> {
        self.activator.apply(z)
    }

    /// Backward step for one sample.
    ///
    /// `delta` is ∂L/∂a for this layer's output. Returns the parameter
    /// gradients and ∂L/∂a for the previous layer.
    pub fn compute_gradients(
        &self,
        delta: &[f64],
        input: &[f64],
        pre_activation: &[f64],
    ) -> (LayerGradients, Vec<f64>) {
        // δ = error ⊙ σ'(z)
        let layer_delta: Vec<f64> = delta.iter().zip(pre_activation.iter())
            .map(|(d, z)| d * self.activator.derivative(*z))
            .collect();

        let grads = LayerGradients {
            weights: Matrix::outer(input, &layer_delta),
            biases: layer_delta.clone(),
        };
        let upstream = self.weights.right_mul(&layer_delta);

        (grads, upstream)
    }

    /// Plain gradient descent step, scaled by `lr`.
    pub fn apply_gradients(&mut self, grads: &LayerGradients, lr: f64) {
        self.weights.add_scaled(&grads.weights, -lr);
        for (b, g) in self.biases.iter_mut().zip(grads.biases.iter()) {
            *b -= lr * g;
        }
    }
}
