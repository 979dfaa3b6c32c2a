use serde::{Serialize, Deserialize};

use crate::layers::dense::LayerGradients;
use crate::network::network::{Gradients, Network};

/// SGD with optional classical momentum.
///
/// The velocity buffers are part of the recoverable state, so a resumed run
/// continues with the same momentum it stopped with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sgd {
    pub learning_rate: f64,
    #[serde(default)]
    pub momentum: f64,
    #[serde(default)]
    velocity: Vec<LayerGradients>,
}

impl Sgd {
    pub fn new(learning_rate: f64) -> Sgd {
        Sgd { learning_rate, momentum: 0.0, velocity: Vec::new() }
    }

    pub fn with_momentum(mut self, momentum: f64) -> Sgd {
        self.momentum = momentum;
        self
    }

    /// Applies one update to every layer of `network`.
    pub fn step(&mut self, network: &mut Network, grads: &Gradients) {
        if self.momentum == 0.0 {
            for (layer, g) in network.layers.iter_mut().zip(grads.layers.iter()) {
                layer.apply_gradients(g, self.learning_rate);
            }
            return;
        }

        if self.velocity.len() != network.layers.len() {
            self.velocity = network.layers.iter().map(LayerGradients::zeros_like).collect();
        }

        // v = μ·v + g ; θ -= lr·v
        for ((layer, g), v) in network.layers.iter_mut()
            .zip(grads.layers.iter())
            .zip(self.velocity.iter_mut())
        {
            v.weights.scale(self.momentum);
            for b in v.biases.iter_mut() {
                *b *= self.momentum;
            }
            v.add_scaled(g, 1.0);
            layer.apply_gradients(v, self.learning_rate);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::activation::ActivationFunction;
    use crate::network::spec::NetworkSpec;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_momentum_accumulates_velocity() {
        let spec = NetworkSpec::classifier(2, &[], ActivationFunction::Identity, 2);
        let mut net = Network::from_spec(&spec, &mut StdRng::seed_from_u64(3)).unwrap();
        let before = net.layers[0].biases[0];

        let mut grads = Gradients::zeros_like(&net);
        grads.layers[0].biases[0] = 1.0;

        let mut sgd = Sgd::new(0.1).with_momentum(0.5);
        sgd.step(&mut net, &grads);
        sgd.step(&mut net, &grads);

        // 0.1 * 1.0 + 0.1 * (0.5 + 1.0)
        assert!((before - net.layers[0].biases[0] - 0.25).abs() < 1e-12);
    }
}
