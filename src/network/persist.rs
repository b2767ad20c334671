//! Versioned JSON model files.
//!
//! A model file stores, per layer, its sizes, activation, row-major weights and
//! biases. Loading is all-or-nothing: every layer is rebuilt and chained before
//! the network is returned.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use ndarray::Array2;
use serde::{Serialize, Deserialize};

use crate::activation::activation::ActivationFunction;
use crate::error::{Error, PersistenceError, Result};
use crate::layers::dense::DenseLayer;
use crate::math::tensor::Vector1D;
use crate::network::network::NeuralNetwork;

pub const FORMAT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct SavedModel {
    format_version: u32,
    layers: Vec<SavedLayer>,
}

#[derive(Serialize, Deserialize)]
struct SavedLayer {
    input_size: usize,
    output_size: usize,
    activation: ActivationFunction,
    weights: Vec<f32>,
    biases: Vec<f32>,
}

impl SavedLayer {
    fn from_layer(layer: &DenseLayer) -> SavedLayer {
        SavedLayer {
            input_size: layer.input_size(),
            output_size: layer.output_size(),
            activation: layer.activation(),
            weights: layer.weights().iter().copied().collect(),
            biases: layer.biases().to_vec(),
        }
    }

    fn into_layer(self, index: usize) -> std::result::Result<DenseLayer, PersistenceError> {
        let corrupt = |reason: String| PersistenceError::Corrupt { layer: index, reason };
        if self.biases.len() != self.output_size {
            return Err(corrupt(format!(
                "{} biases for output size {}",
                self.biases.len(),
                self.output_size
            )));
        }
        let weights = Array2::from_shape_vec((self.input_size, self.output_size), self.weights)
            .map_err(|e| corrupt(format!("weights do not fit {}x{}: {e}", self.input_size, self.output_size)))?;
        if weights.iter().chain(self.biases.iter()).any(|v| !v.is_finite()) {
            return Err(corrupt("non-finite parameter".to_string()));
        }
        DenseLayer::from_parameters(weights, Vector1D::from(self.biases), self.activation)
            .map_err(|e| corrupt(e.to_string()))
    }
}

impl NeuralNetwork {
    /// Writes the network to `path` as pretty JSON.
    ///
    /// The file is written next to `path` first and renamed into place, so an
    /// interrupted save never leaves a truncated model behind.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let saved = SavedModel {
            format_version: FORMAT_VERSION,
            layers: self.layers().iter().map(SavedLayer::from_layer).collect(),
        };

        let tmp = temp_path(path);
        let written = write_json(&tmp, &saved)
            .and_then(|()| std::fs::rename(&tmp, path).map_err(|e| PersistenceError::io(path, e)));
        if let Err(e) = written {
            let _ = std::fs::remove_file(&tmp);
            return Err(e.into());
        }

        tracing::debug!(path = %path.display(), layers = self.len(), "saved model");
        Ok(())
    }

    /// Reads a network previously written by [`NeuralNetwork::save`].
    pub fn load(path: impl AsRef<Path>) -> Result<NeuralNetwork> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| PersistenceError::io(path, e))?;
        let saved: SavedModel =
            serde_json::from_reader(BufReader::new(file)).map_err(PersistenceError::Format)?;

        if saved.format_version != FORMAT_VERSION {
            return Err(PersistenceError::UnsupportedVersion {
                found: saved.format_version,
                expected: FORMAT_VERSION,
            }
            .into());
        }

        let mut network = NeuralNetwork::new();
        for (index, layer) in saved.layers.into_iter().enumerate() {
            let layer = layer.into_layer(index)?;
            network.add_layer(layer).map_err(|e| match e {
                Error::ShapeMismatch { .. } => Error::from(PersistenceError::Corrupt {
                    layer: index,
                    reason: e.to_string(),
                }),
                other => other,
            })?;
        }

        tracing::debug!(path = %path.display(), layers = network.len(), "loaded model");
        Ok(network)
    }
}

fn write_json(path: &Path, saved: &SavedModel) -> std::result::Result<(), PersistenceError> {
    let file = File::create(path).map_err(|e| PersistenceError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, saved)?;
    writer.flush().map_err(|e| PersistenceError::io(path, e))
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
