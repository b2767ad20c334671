use crate::error::{Error, Result};
use crate::layers::dense::{DenseLayer, LayerGradients};
use crate::math::tensor::{ensure_finite, Tensor2D};
use crate::network::shared::SharedModel;
use crate::optim::optimizer::Optimizer;
use crate::train::dataset::Dataset;
use crate::train::loop_fn::{train_loop, TrainSummary};
use crate::train::stats::TrainingStats;
use crate::train::train_config::TrainConfig;

/// An ordered stack of dense layers, input side first.
///
/// Layers live in one contiguous vector and are addressed by position; the
/// architecture is fixed once the network is wrapped in a [`SharedModel`].
#[derive(Debug, Clone, Default)]
pub struct NeuralNetwork {
    layers: Vec<DenseLayer>,
}

impl NeuralNetwork {
    pub fn new() -> NeuralNetwork {
        NeuralNetwork { layers: Vec::new() }
    }

    /// Chains `layers` in order, validating every size boundary.
    pub fn from_layers(layers: Vec<DenseLayer>) -> Result<NeuralNetwork> {
        let mut network = NeuralNetwork::new();
        for layer in layers {
            network.add_layer(layer)?;
        }
        Ok(network)
    }

    /// Appends a layer whose input size must equal the current output size.
    pub fn add_layer(&mut self, layer: DenseLayer) -> Result<()> {
        if let Some(last) = self.layers.last() {
            if layer.input_size() != last.output_size() {
                return Err(Error::shape(
                    format!("layer {} input", self.layers.len()),
                    &[last.output_size()],
                    &[layer.input_size()],
                ));
            }
        }
        self.layers.push(layer);
        Ok(())
    }

    pub fn layers(&self) -> &[DenseLayer] {
        &self.layers
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn input_size(&self) -> Option<usize> {
        self.layers.first().map(DenseLayer::input_size)
    }

    pub fn output_size(&self) -> Option<usize> {
        self.layers.last().map(DenseLayer::output_size)
    }

    /// Total number of trainable scalars.
    pub fn parameter_count(&self) -> usize {
        self.layers
            .iter()
            .map(|l| l.weights().len() + l.biases().len())
            .sum()
    }

    /// Forward pass; leaves every layer's cache populated for `backward`.
    pub fn forward(&mut self, input: &Tensor2D) -> Result<Tensor2D> {
        self.ensure_layers()?;
        let mut current = input.clone();
        for layer in &mut self.layers {
            current = layer.forward(&current)?;
        }
        Ok(current)
    }

    /// Forward pass for inference; touches no cache.
    pub fn predict(&self, input: &Tensor2D) -> Result<Tensor2D> {
        self.ensure_layers()?;
        let mut current = input.clone();
        for layer in &self.layers {
            current = layer.predict(&current)?;
        }
        Ok(current)
    }

    /// Propagates `output_error` from the last layer to the first and updates
    /// every layer through `optimizer`. Returns ∂L/∂input.
    ///
    /// Runs in three phases: every gradient is computed from the pre-update
    /// weights and checked, then every layer's update is proposed and checked,
    /// and only then are the updates committed. A failure in either of the
    /// first two phases leaves the network and the optimizer untouched.
    pub fn backward(&mut self, output_error: &Tensor2D, optimizer: &mut Optimizer) -> Result<Tensor2D> {
        self.ensure_layers()?;

        let mut error = output_error.clone();
        let mut gradients: Vec<LayerGradients> = Vec::with_capacity(self.layers.len());
        for layer in self.layers.iter().rev() {
            let (grads, input_error) = layer.gradients(&error)?;
            ensure_finite(&format!("layer {} weight gradient", layer.id()), &grads.weights)?;
            ensure_finite(&format!("layer {} bias gradient", layer.id()), &grads.biases)?;
            gradients.push(grads);
            error = input_error;
        }

        let updates = self
            .layers
            .iter()
            .rev()
            .zip(&gradients)
            .map(|(layer, grads)| layer.propose_update(grads, optimizer))
            .collect::<Result<Vec<_>>>()?;

        for (layer, pending) in self.layers.iter_mut().rev().zip(updates) {
            layer.commit_update(pending, optimizer);
        }
        Ok(error)
    }

    /// Trains the network behind `model` on `dataset`. See
    /// [`train_loop`] for the epoch/batch state machine.
    pub fn train(
        model: &SharedModel,
        dataset: &Dataset,
        optimizer: &mut Optimizer,
        stats: &TrainingStats,
        config: &TrainConfig,
    ) -> Result<TrainSummary> {
        train_loop(model, dataset, None, optimizer, stats, config)
    }

    fn ensure_layers(&self) -> Result<()> {
        if self.layers.is_empty() {
            return Err(Error::config("network has no layers"));
        }
        Ok(())
    }
}
