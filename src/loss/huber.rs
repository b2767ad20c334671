use crate::math::tensor::Tensor2D;

pub struct HuberLoss;

// `LossType::Huber` takes no parameter; δ is fixed.
const DELTA: f32 = 1.0;

impl HuberLoss {
    /// Scalar Huber: mean(h(predicted − expected))
    /// where h(x) = 0.5·x²  if |x| ≤ δ
    ///              δ·(|x| − 0.5·δ)  otherwise
    pub fn loss(predicted: &Tensor2D, expected: &Tensor2D) -> f32 {
        let n = predicted.len() as f32;
        (predicted - expected)
            .mapv(|x| {
                if x.abs() <= DELTA {
                    0.5 * x * x
                } else {
                    DELTA * (x.abs() - 0.5 * DELTA)
                }
            })
            .sum()
            / n
    }

    /// Per-entry gradient: clip(x, -δ, δ) / N
    pub fn derivative(predicted: &Tensor2D, expected: &Tensor2D) -> Tensor2D {
        let n = predicted.len() as f32;
        (predicted - expected).mapv(|x| x.clamp(-DELTA, DELTA) / n)
    }
}
