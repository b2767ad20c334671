pub mod sgd;
pub mod adam;
pub mod optimizer;

pub use sgd::Sgd;
pub use adam::Adam;
pub use optimizer::{Optimizer, OptimizerKind};
