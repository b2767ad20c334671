use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use ndarray::{Array1, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::activation::activation::ActivationFunction;
use crate::error::{Error, Result};
use crate::math::tensor::{self, ensure_shape, Tensor2D, Vector1D};
use crate::optim::optimizer::{Optimizer, PendingUpdate};

static NEXT_LAYER_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a layer; keys optimizer state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(u64);

impl LayerId {
    pub(crate) fn next() -> LayerId {
        LayerId(NEXT_LAYER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Gradients of one layer's parameters for one batch.
#[derive(Debug, Clone)]
pub struct LayerGradients {
    pub weights: Tensor2D,
    pub biases: Vector1D,
}

/// Values from the last `forward` needed by `backward`.
#[derive(Debug)]
struct ForwardCache {
    input: Tensor2D,
    pre_activation: Tensor2D,
}

/// A fully connected layer: `activation(input · W + b)`.
///
/// `W` has shape `input_size × output_size`, `b` has length `output_size`.
#[derive(Debug)]
pub struct DenseLayer {
    id: LayerId,
    weights: Tensor2D,
    biases: Vector1D,
    activation: ActivationFunction,
    cache: Option<ForwardCache>,
}

impl DenseLayer {
    /// He-initialized for ReLU-family activations, Xavier otherwise; zero biases.
    pub fn new(input_size: usize, output_size: usize, activation: ActivationFunction) -> Result<DenseLayer> {
        DenseLayer::with_rng(input_size, output_size, activation, &mut rand::thread_rng())
    }

    pub fn seeded(input_size: usize, output_size: usize, activation: ActivationFunction, seed: u64) -> Result<DenseLayer> {
        DenseLayer::with_rng(input_size, output_size, activation, &mut StdRng::seed_from_u64(seed))
    }

    pub fn with_rng<R: Rng + ?Sized>(
        input_size: usize,
        output_size: usize,
        activation: ActivationFunction,
        rng: &mut R,
    ) -> Result<DenseLayer> {
        if input_size == 0 || output_size == 0 {
            return Err(Error::config(format!(
                "layer sizes must be positive, got {input_size}x{output_size}"
            )));
        }
        let weights = if activation.is_relu_family() {
            tensor::he(input_size, output_size, rng)?
        } else {
            tensor::xavier(input_size, output_size, rng)?
        };
        DenseLayer::from_parameters(weights, Array1::zeros(output_size), activation)
    }

    /// Builds a layer from explicit parameters. `biases` must have one entry
    /// per weight column.
    pub fn from_parameters(weights: Tensor2D, biases: Vector1D, activation: ActivationFunction) -> Result<DenseLayer> {
        if weights.is_empty() {
            return Err(Error::config(format!(
                "layer sizes must be positive, got {}x{}",
                weights.nrows(),
                weights.ncols()
            )));
        }
        ensure_shape("layer biases", &[weights.ncols()], biases.shape())?;
        Ok(DenseLayer {
            id: LayerId::next(),
            weights,
            biases,
            activation,
            cache: None,
        })
    }

    pub fn id(&self) -> LayerId {
        self.id
    }

    pub fn input_size(&self) -> usize {
        self.weights.nrows()
    }

    pub fn output_size(&self) -> usize {
        self.weights.ncols()
    }

    pub fn activation(&self) -> ActivationFunction {
        self.activation
    }

    pub fn weights(&self) -> &Tensor2D {
        &self.weights
    }

    pub fn biases(&self) -> &Vector1D {
        &self.biases
    }

    /// True between a `forward` and the `backward` that consumes it.
    pub fn has_cache(&self) -> bool {
        self.cache.is_some()
    }

    /// Forward pass; caches input and pre-activation for `backward`.
    pub fn forward(&mut self, input: &Tensor2D) -> Result<Tensor2D> {
        let z = self.pre_activation(input)?;
        let output = self.activation.activate_array(&z);
        self.cache = Some(ForwardCache {
            input: input.clone(),
            pre_activation: z,
        });
        Ok(output)
    }

    /// Forward pass without caching; safe to call through a shared reference.
    pub fn predict(&self, input: &Tensor2D) -> Result<Tensor2D> {
        let z = self.pre_activation(input)?;
        Ok(self.activation.activate_array(&z))
    }

    fn pre_activation(&self, input: &Tensor2D) -> Result<Tensor2D> {
        if input.ncols() != self.input_size() {
            return Err(Error::shape(
                format!("layer {} input", self.id),
                &[input.nrows(), self.input_size()],
                input.shape(),
            ));
        }
        Ok(input.dot(&self.weights) + &self.biases)
    }

    /// Computes this layer's parameter gradients and the error to hand to the
    /// previous layer, from the cached forward pass and the current weights.
    ///
    /// `output_error` is ∂L/∂output with the shape of the last forward output.
    /// Weight and bias gradients are sums over the batch rows.
    pub fn gradients(&self, output_error: &Tensor2D) -> Result<(LayerGradients, Tensor2D)> {
        let cache = self
            .cache
            .as_ref()
            .ok_or(Error::UninitializedPass { layer: self.id })?;
        ensure_shape(
            &format!("layer {} output error", self.id),
            cache.pre_activation.shape(),
            output_error.shape(),
        )?;

        // δ = error ⊙ σ'(z)
        let delta = output_error * &self.activation.derivative_array(&cache.pre_activation);
        let grads = LayerGradients {
            weights: cache.input.t().dot(&delta),
            biases: delta.sum_axis(Axis(0)),
        };
        let input_error = delta.dot(&self.weights.t());
        Ok((grads, input_error))
    }

    /// Asks the optimizer what `grads` would make of this layer's parameters.
    pub fn propose_update(&self, grads: &LayerGradients, optimizer: &Optimizer) -> Result<PendingUpdate> {
        optimizer.propose(self.id, &self.weights, &self.biases, &grads.weights, &grads.biases)
    }

    /// Writes an update proposed for this layer and drops the forward cache.
    pub fn commit_update(&mut self, pending: PendingUpdate, optimizer: &mut Optimizer) {
        debug_assert_eq!(pending.layer(), self.id);
        optimizer.commit(pending, &mut self.weights, &mut self.biases);
        self.cache = None;
    }

    /// Hands `grads` to the optimizer and drops the forward cache.
    pub fn apply_gradients(&mut self, grads: &LayerGradients, optimizer: &mut Optimizer) -> Result<()> {
        let pending = self.propose_update(grads, optimizer)?;
        self.commit_update(pending, optimizer);
        Ok(())
    }

    /// Backward pass: gradients, one optimizer update, and the error with
    /// respect to this layer's input (computed with the pre-update weights).
    pub fn backward(&mut self, output_error: &Tensor2D, optimizer: &mut Optimizer) -> Result<Tensor2D> {
        let (grads, input_error) = self.gradients(output_error)?;
        self.apply_gradients(&grads, optimizer)?;
        Ok(input_error)
    }
}

/// Clones get a fresh identity and no forward cache, so they never share
/// optimizer state with the original.
impl Clone for DenseLayer {
    fn clone(&self) -> Self {
        DenseLayer {
            id: LayerId::next(),
            weights: self.weights.clone(),
            biases: self.biases.clone(),
            activation: self.activation,
            cache: None,
        }
    }
}
