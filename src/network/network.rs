use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::error::{Result, TrainError};
use crate::layers::dense::{Layer, LayerGradients};
use crate::network::spec::NetworkSpec;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Network {
    pub layers: Vec<Layer>,
}

/// Everything a backward pass needs from one forward pass of one sample.
#[derive(Debug, Clone)]
pub struct ForwardTrace {
    /// Input fed to each layer (`inputs[0]` is the sample itself).
    pub inputs: Vec<Vec<f64>>,
    /// Pre-activation `z` of each layer.
    pub pre_activations: Vec<Vec<f64>>,
    /// Output of the last layer.
    pub output: Vec<f64>,
}

/// Per-layer parameter gradients, ordered like `Network::layers`.
#[derive(Debug, Clone, PartialEq)]
pub struct Gradients {
    pub layers: Vec<LayerGradients>,
}

impl Gradients {
    pub fn zeros_like(network: &Network) -> Gradients {
        Gradients {
            layers: network.layers.iter().map(LayerGradients::zeros_like).collect(),
        }
    }

    pub fn add_scaled(&mut self, other: &Gradients, factor: f64) {
        for (acc, g) in self.layers.iter_mut().zip(other.layers.iter()) {
            acc.add_scaled(g, factor);
        }
    }
}

impl Network {
    /// Builds a network from a spec, drawing initial weights from `rng`.
    pub fn from_spec<R: Rng + ?Sized>(spec: &NetworkSpec, rng: &mut R) -> Result<Network> {
        spec.validate()?;
        let layers = spec.layers.iter()
            .map(|l| Layer::new(l.size, l.input_size, l.activation, rng))
            .collect();
        Ok(Network { layers })
    }

    pub fn input_size(&self) -> usize {
        self.layers.first().map(|l| l.input_size).unwrap_or(0)
    }

    pub fn output_size(&self) -> usize {
        self.layers.last().map(|l| l.size).unwrap_or(0)
    }

    /// Forward pass that records the intermediate values for backprop.
    pub fn forward_trace(&self, input: &[f64]) -> Result<ForwardTrace> {
        if input.len() != self.input_size() {
            return Err(TrainError::computation(format!(
                "input has {} features, network expects {}",
                input.len(),
                self.input_size()
            )));
        }

        let mut inputs = Vec::with_capacity(self.layers.len());
        let mut pre_activations = Vec::with_capacity(self.layers.len());
        let mut current = input.to_vec();

        for layer in &self.layers {
            let z = layer.pre_activation(&current);
            let a = layer.activate(&z);
            inputs.push(current);
            pre_activations.push(z);
            current = a;
        }

        Ok(ForwardTrace { inputs, pre_activations, output: current })
    }

    /// Backpropagates `output_delta` (∂L/∂output) through a recorded trace.
    pub fn backward(&self, trace: &ForwardTrace, output_delta: &[f64]) -> Gradients {
        let mut per_layer = Vec::with_capacity(self.layers.len());
        let mut delta = output_delta.to_vec();

        for (i, layer) in self.layers.iter().enumerate().rev() {
            let (grads, upstream) = layer.compute_gradients(
                &delta,
                &trace.inputs[i],
                &trace.pre_activations[i],
            );
            per_layer.push(grads);
            delta = upstream;
        }

        per_layer.reverse();
        Gradients { layers: per_layer }
    }

    /// True when `other` has the same layer shapes and activations.
    pub fn same_architecture(&self, other: &Network) -> bool {
        self.layers.len() == other.layers.len()
            && self.layers.iter().zip(other.layers.iter()).all(|(a, b)| {
                a.size == b.size && a.input_size == b.input_size && a.activator == b.activator
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::activation::ActivationFunction;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn small_net() -> Network {
        let spec = NetworkSpec::classifier(3, &[4], ActivationFunction::Tanh, 2);
        Network::from_spec(&spec, &mut StdRng::seed_from_u64(11)).unwrap()
    }

    #[test]
    fn test_forward_trace_shapes() {
        let net = small_net();
        let trace = net.forward_trace(&[0.1, 0.2, 0.3]).unwrap();
        assert_eq!(trace.inputs.len(), 2);
        assert_eq!(trace.inputs[1].len(), 4);
        assert_eq!(trace.output.len(), 2);
        assert!((trace.output.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_forward_rejects_wrong_width() {
        let net = small_net();
        assert!(matches!(
            net.forward_trace(&[1.0]),
            Err(TrainError::Computation(_))
        ));
    }

    #[test]
    fn test_backward_matches_finite_difference() {
        let mut net = small_net();
        let input = [0.5, -0.3, 0.8];
        let class = 1;
        let loss_of = |n: &Network| {
            let out = n.forward_trace(&input).unwrap().output;
            -(out[class] + 1e-12).ln()
        };

        let trace = net.forward_trace(&input).unwrap();
        let mut delta = trace.output.clone();
        delta[class] -= 1.0;
        let grads = net.backward(&trace, &delta);

        let eps = 1e-6;
        let analytic = grads.layers[0].weights.data[1][2];
        net.layers[0].weights.data[1][2] += eps;
        let up = loss_of(&net);
        net.layers[0].weights.data[1][2] -= 2.0 * eps;
        let down = loss_of(&net);
        let numeric = (up - down) / (2.0 * eps);

        assert!((analytic - numeric).abs() < 1e-5, "{analytic} vs {numeric}");
    }
}
