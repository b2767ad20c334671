pub mod error;
pub mod math;
pub mod activation;
pub mod layers;
pub mod network;
pub mod loss;
pub mod optim;
pub mod train;
pub mod config;

// Convenience re-exports
pub use error::{Error, PersistenceError, Result};
pub use math::tensor::{Tensor2D, Vector1D};
pub use activation::activation::ActivationFunction;
pub use layers::dense::{DenseLayer, LayerId};
pub use network::{NeuralNetwork, SharedModel, NetworkSpec, LayerSpec};
pub use loss::loss_type::LossType;
pub use optim::{Adam, Optimizer, OptimizerKind, Sgd};
pub use train::{
    spawn_training, train_loop, Dataset, EpochStats, TrainConfig, TrainOutcome, TrainSummary,
    TrainingHandle, TrainingStats,
};
pub use config::{Hyperparams, RunConfig};
