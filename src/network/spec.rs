use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Serialize, Deserialize};

use crate::activation::activation::ActivationFunction;
use crate::error::{Error, PersistenceError, Result};
use crate::layers::dense::DenseLayer;
use crate::loss::loss_type::LossType;
use crate::network::network::NeuralNetwork;

/// Describes one layer in a network specification.
///
/// Fields:
/// - `input_size`  — number of values feeding into this layer (the output
///                   size of the previous layer, or the raw input dimension
///                   for the first layer)
/// - `output_size` — number of units in this layer
/// - `activation`  — activation function applied after the linear transform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSpec {
    pub input_size: usize,
    pub output_size: usize,
    pub activation: ActivationFunction,
}

impl LayerSpec {
    pub fn new(input_size: usize, output_size: usize, activation: ActivationFunction) -> LayerSpec {
        LayerSpec { input_size, output_size, activation }
    }
}

/// A fully serializable description of a network architecture plus the loss
/// it is trained with.
///
/// `NetworkSpec` can be saved to / loaded from JSON independently of the
/// trained weights, making it possible to store architecture configurations
/// before training starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSpec {
    /// Human-readable name, used as the default model file stem.
    pub name: String,
    /// Ordered list of layer descriptions (input → output).
    pub layers: Vec<LayerSpec>,
    /// Loss function to pair with this network during training.
    pub loss: LossType,
}

impl NetworkSpec {
    /// Checks that there is at least one layer, every size is positive and
    /// consecutive layers chain.
    pub fn validate(&self) -> Result<()> {
        if self.layers.is_empty() {
            return Err(Error::config(format!("network `{}` has no layers", self.name)));
        }
        for (i, layer) in self.layers.iter().enumerate() {
            if layer.input_size == 0 || layer.output_size == 0 {
                return Err(Error::config(format!(
                    "layer {i} has a zero size ({}x{})",
                    layer.input_size, layer.output_size
                )));
            }
            if i > 0 && self.layers[i - 1].output_size != layer.input_size {
                return Err(Error::config(format!(
                    "layer {i} expects {} inputs but layer {} produces {}",
                    layer.input_size,
                    i - 1,
                    self.layers[i - 1].output_size
                )));
            }
        }
        Ok(())
    }

    /// Builds a freshly initialized network. With a seed the initial weights
    /// are reproducible.
    pub fn build(&self, seed: Option<u64>) -> Result<NeuralNetwork> {
        self.validate()?;
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut network = NeuralNetwork::new();
        for layer in &self.layers {
            network.add_layer(DenseLayer::with_rng(
                layer.input_size,
                layer.output_size,
                layer.activation,
                &mut rng,
            )?)?;
        }
        Ok(network)
    }

    /// Serializes the spec to a pretty-printed JSON file.
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| PersistenceError::io(path, e))?;
        serde_json::to_writer_pretty(BufWriter::new(file), self).map_err(PersistenceError::Format)?;
        Ok(())
    }

    /// Deserializes a `NetworkSpec` from a JSON file.
    pub fn load_json(path: impl AsRef<Path>) -> Result<NetworkSpec> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| PersistenceError::io(path, e))?;
        let spec = serde_json::from_reader(BufReader::new(file)).map_err(PersistenceError::Format)?;
        Ok(spec)
    }
}
