use serde::{Serialize, Deserialize};

use crate::activation::activation::ActivationFunction;
use crate::error::{Result, TrainError};

/// Describes one layer in a network specification.
///
/// Fields:
/// - `size`      : number of neurons in this layer
/// - `input_size`: output size of the previous layer, or the raw feature
///                  count for the first layer
/// - `activation`: activation applied after the linear transform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSpec {
    pub size: usize,
    pub input_size: usize,
    pub activation: ActivationFunction,
}

/// Serializable network architecture, independent of trained weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSpec {
    pub layers: Vec<LayerSpec>,
}

impl NetworkSpec {
    /// Dense classifier: `hidden` layers with `activation`, then a softmax
    /// layer with one unit per class.
    pub fn classifier(
        input_size: usize,
        hidden: &[usize],
        activation: ActivationFunction,
        n_classes: usize,
    ) -> NetworkSpec {
        let mut layers = Vec::with_capacity(hidden.len() + 1);
        let mut fan_in = input_size;
        for &size in hidden {
            layers.push(LayerSpec { size, input_size: fan_in, activation });
            fan_in = size;
        }
        layers.push(LayerSpec {
            size: n_classes,
            input_size: fan_in,
            activation: ActivationFunction::Softmax,
        });
        NetworkSpec { layers }
    }

    /// Replaces the output layer's activation.
    pub fn with_head(mut self, activation: ActivationFunction) -> NetworkSpec {
        if let Some(last) = self.layers.last_mut() {
            last.activation = activation;
        }
        self
    }

    /// Rejects empty networks, zero-width layers and broken layer chaining.
    pub fn validate(&self) -> Result<()> {
        if self.layers.is_empty() {
            return Err(TrainError::config("network needs at least one layer"));
        }
        for (i, layer) in self.layers.iter().enumerate() {
            if layer.size == 0 || layer.input_size == 0 {
                return Err(TrainError::config(format!("layer {} has zero width", i + 1)));
            }
            if i > 0 && self.layers[i - 1].size != layer.input_size {
                return Err(TrainError::config(format!(
                    "layer {} expects {} inputs but layer {} has {} outputs",
                    i + 1,
                    layer.input_size,
                    i,
                    self.layers[i - 1].size
                )));
            }
        }
        Ok(())
    }
}
