use serde::{Serialize, Deserialize};

use crate::error::Result;
use crate::loss::bce::BceLoss;
use crate::loss::cross_entropy::CrossEntropyLoss;
use crate::loss::huber::HuberLoss;
use crate::loss::mae::MaeLoss;
use crate::loss::mse::MseLoss;
use crate::math::tensor::{ensure_shape, Tensor2D};

/// Selects which loss function the training loop uses.
///
/// Every loss averages over some count (entries or rows) and its derivative
/// divides by that same count, so layer gradients are plain batch sums and the
/// learning-rate scale does not depend on batch size.
///
/// - `Mse`                — mean-squared error; pair with Linear or Sigmoid output.
/// - `CrossEntropy`       — categorical cross-entropy over rows of class scores.
/// - `BinaryCrossEntropy` — independent per-output cross-entropy; pair with Sigmoid.
/// - `Mae`                — mean absolute error; pair with Linear output.
/// - `Huber`              — Huber loss (δ=1.0); pair with Linear output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossType {
    Mse,
    CrossEntropy,
    BinaryCrossEntropy,
    Mae,
    Huber,
}

impl LossType {
    /// Non-negative scalar summarizing a batch of predictions.
    pub fn loss(&self, predicted: &Tensor2D, target: &Tensor2D) -> Result<f32> {
        ensure_shape("loss target", predicted.shape(), target.shape())?;
        Ok(match self {
            LossType::Mse => MseLoss::loss(predicted, target),
            LossType::CrossEntropy => CrossEntropyLoss::loss(predicted, target),
            LossType::BinaryCrossEntropy => BceLoss::loss(predicted, target),
            LossType::Mae => MaeLoss::loss(predicted, target),
            LossType::Huber => HuberLoss::loss(predicted, target),
        })
    }

    /// Gradient of the loss with respect to every prediction entry.
    pub fn derivative(&self, predicted: &Tensor2D, target: &Tensor2D) -> Result<Tensor2D> {
        ensure_shape("loss target", predicted.shape(), target.shape())?;
        Ok(match self {
            LossType::Mse => MseLoss::derivative(predicted, target),
            LossType::CrossEntropy => CrossEntropyLoss::derivative(predicted, target),
            LossType::BinaryCrossEntropy => BceLoss::derivative(predicted, target),
            LossType::Mae => MaeLoss::derivative(predicted, target),
            LossType::Huber => HuberLoss::derivative(predicted, target),
        })
    }
}
