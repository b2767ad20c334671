use crate::math::tensor::Tensor2D;

pub struct MseLoss;

impl MseLoss {
    /// Scalar MSE: mean((predicted - expected)²) over every entry.
    pub fn loss(predicted: &Tensor2D, expected: &Tensor2D) -> f32 {
        let n = predicted.len() as f32;
        (predicted - expected).mapv(|d| d * d).sum() / n
    }

    /// Per-entry gradient: 2·(predicted - expected) / N, N = total entry count.
    pub fn derivative(predicted: &Tensor2D, expected: &Tensor2D) -> Tensor2D {
        let n = predicted.len() as f32;
        (predicted - expected) * (2.0 / n)
    }
}
