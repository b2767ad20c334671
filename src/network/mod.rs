pub mod network;
pub mod persist;
pub mod shared;
pub mod spec;

pub use network::NeuralNetwork;
pub use shared::SharedModel;
pub use spec::{NetworkSpec, LayerSpec};
