pub mod tensor;

pub use tensor::{Tensor2D, Vector1D};
