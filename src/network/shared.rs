use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock, RwLockWriteGuard};

use crate::error::Result;
use crate::math::tensor::Tensor2D;
use crate::network::network::NeuralNetwork;

/// A handle to a network shared between a training loop and any number of
/// readers.
///
/// Readers only ever see the network between batches: the training loop
/// holds the write lock for exactly one forward/backward/update step.
/// Cloning the handle shares the same network.
#[derive(Debug, Clone)]
pub struct SharedModel {
    inner: Arc<RwLock<NeuralNetwork>>,
}

impl SharedModel {
    pub fn new(network: NeuralNetwork) -> SharedModel {
        SharedModel {
            inner: Arc::new(RwLock::new(network)),
        }
    }

    /// Inference on the current parameters.
    pub fn predict(&self, input: &Tensor2D) -> Result<Tensor2D> {
        self.read(|net| net.predict(input))
    }

    /// Runs `f` against the network under a read lock.
    pub fn read<T>(&self, f: impl FnOnce(&NeuralNetwork) -> T) -> T {
        // Every parameter commit is a whole-tensor assignment, so a network
        // behind a poisoned lock is still consistent.
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }

    /// Deep copy of the current network (layers get fresh identities).
    pub fn snapshot(&self) -> NeuralNetwork {
        self.read(NeuralNetwork::clone)
    }

    pub fn input_size(&self) -> Option<usize> {
        self.read(NeuralNetwork::input_size)
    }

    pub fn output_size(&self) -> Option<usize> {
        self.read(NeuralNetwork::output_size)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        self.read(|net| net.save(path))
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, NeuralNetwork> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl From<NeuralNetwork> for SharedModel {
    fn from(network: NeuralNetwork) -> Self {
        SharedModel::new(network)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::activation::ActivationFunction;
    use crate::layers::dense::DenseLayer;
    use ndarray::Array2;

    #[test]
    fn clones_share_one_network() {
        let net = NeuralNetwork::from_layers(vec![
            DenseLayer::seeded(2, 2, ActivationFunction::Linear, 1).unwrap(),
        ])
        .unwrap();
        let model = SharedModel::new(net);
        let reader = model.clone();

        let before = reader.predict(&Array2::ones((1, 2))).unwrap();
        {
            let mut guard = model.write();
            let layer = DenseLayer::seeded(2, 3, ActivationFunction::Linear, 2).unwrap();
            guard.add_layer(layer).unwrap();
        }
        let after = reader.predict(&Array2::ones((1, 2))).unwrap();
        assert_eq!(before.shape(), &[1, 2]);
        assert_eq!(after.shape(), &[1, 3]);
        assert_eq!(reader.output_size(), Some(3));
    }

    #[test]
    fn snapshot_is_independent() {
        let model = SharedModel::new(
            NeuralNetwork::from_layers(vec![
                DenseLayer::seeded(1, 1, ActivationFunction::Linear, 3).unwrap(),
            ])
            .unwrap(),
        );
        let snap = model.snapshot();
        model.write().forward(&Array2::ones((1, 1))).unwrap();
        assert!(!snap.layers()[0].has_cache());
        assert_eq!(model.input_size(), Some(1));
    }
}
