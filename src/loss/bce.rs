use ndarray::Zip;

use crate::loss::cross_entropy::clamp;
use crate::math::tensor::Tensor2D;

pub struct BceLoss;

impl BceLoss {
    /// Scalar BCE: -mean(y·ln p + (1-y)·ln(1-p)) with p clamped away from 0 and 1.
    pub fn loss(predicted: &Tensor2D, expected: &Tensor2D) -> f32 {
        let n = predicted.len() as f32;
        let total = Zip::from(predicted).and(expected).fold(0.0, |acc, &p, &y| {
            let p = clamp(p);
            acc - (y * p.ln() + (1.0 - y) * (1.0 - p).ln())
        });
        total / n
    }

    /// Per-entry gradient: (p - y) / (p·(1 - p)) / N
    pub fn derivative(predicted: &Tensor2D, expected: &Tensor2D) -> Tensor2D {
        let n = predicted.len() as f32;
        Zip::from(predicted).and(expected).map_collect(|&p, &y| {
            let p = clamp(p);
            (p - y) / (p * (1.0 - p)) / n
        })
    }
}
