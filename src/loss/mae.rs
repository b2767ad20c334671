use crate::math::tensor::Tensor2D;

pub struct MaeLoss;

impl MaeLoss {
    /// Scalar MAE: mean(|predicted - expected|)
    pub fn loss(predicted: &Tensor2D, expected: &Tensor2D) -> f32 {
        let n = predicted.len() as f32;
        (predicted - expected).mapv(f32::abs).sum() / n
    }

    /// Per-entry subgradient: sign(p - y) / N  (0 when equal)
    pub fn derivative(predicted: &Tensor2D, expected: &Tensor2D) -> Tensor2D {
        let n = predicted.len() as f32;
        (predicted - expected).mapv(|diff| {
            if diff > 0.0 { 1.0 / n } else if diff < 0.0 { -1.0 / n } else { 0.0 }
        })
    }
}
