use crate::math::tensor::Tensor2D;

/// Categorical cross-entropy over rows of (soft or one-hot) targets.
pub struct CrossEntropyLoss;

/// Predictions are clamped to [EPS, 1 - EPS] before any log or division.
pub const EPS: f32 = 1e-7;

impl CrossEntropyLoss {
    /// L = -(1/rows) · Σ expected · ln(predicted)
    pub fn loss(predicted: &Tensor2D, expected: &Tensor2D) -> f32 {
        let rows = predicted.nrows() as f32;
        let log_p = predicted.mapv(|p| clamp(p).ln());
        -(expected * &log_p).sum() / rows
    }

    /// ∂L/∂p = -(expected / predicted) / rows, with the same clamping.
    pub fn derivative(predicted: &Tensor2D, expected: &Tensor2D) -> Tensor2D {
        let rows = predicted.nrows() as f32;
        let p = predicted.mapv(clamp);
        -(expected / &p) / rows
    }
}

pub(crate) fn clamp(p: f32) -> f32 {
    p.clamp(EPS, 1.0 - EPS)
}
