use serde::{Serialize, Deserialize};
use std::f32::consts::PI;

use crate::math::tensor::Tensor2D;

/// Elementwise nonlinearity applied to a layer's pre-activation output.
///
/// All derivatives are taken with respect to the **pre-activation** input `x`,
/// not the activated output. At a kink the derivative takes the value of the
/// left-hand branch: ReLU'(0) = 0, LeakyReLU'(0) = alpha.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActivationFunction {
    #[serde(rename = "relu")]
    ReLU,
    Sigmoid,
    Tanh,
    Linear,
    #[serde(rename = "leaky_relu")]
    LeakyReLU { alpha: f32 },
    Elu { alpha: f32 },
    Gelu,
    Swish,
}

impl ActivationFunction {
    pub fn activate(&self, x: f32) -> f32 {
        match self {
            ActivationFunction::ReLU => if x > 0.0 { x } else { 0.0 },
            ActivationFunction::Sigmoid => sigmoid(x),
            ActivationFunction::Tanh => x.tanh(),
            ActivationFunction::Linear => x,
            ActivationFunction::LeakyReLU { alpha } => if x > 0.0 { x } else { alpha * x },
            ActivationFunction::Elu { alpha } => {
                if x > 0.0 { x } else { alpha * x.exp_m1() }
            }
            ActivationFunction::Gelu => {
                let c = (2.0_f32 / PI).sqrt();
                0.5 * x * (1.0 + (c * (x + 0.044715 * x.powi(3))).tanh())
            }
            ActivationFunction::Swish => x * sigmoid(x),
        }
    }

    pub fn derivative(&self, x: f32) -> f32 {
        match self {
            ActivationFunction::ReLU => if x > 0.0 { 1.0 } else { 0.0 },
            ActivationFunction::Sigmoid => {
                let fx = sigmoid(x);
                fx * (1.0 - fx)
            }
            ActivationFunction::Tanh => {
                let t = x.tanh();
                1.0 - t * t
            }
            ActivationFunction::Linear => 1.0,
            ActivationFunction::LeakyReLU { alpha } => if x > 0.0 { 1.0 } else { *alpha },
            ActivationFunction::Elu { alpha } => {
                if x > 0.0 { 1.0 } else { alpha * x.exp() }
            }
            ActivationFunction::Gelu => {
                let c = (2.0_f32 / PI).sqrt();
                let inner = c * (x + 0.044715 * x.powi(3));
                let tanh_inner = inner.tanh();
                let sech2 = 1.0 - tanh_inner * tanh_inner;
                let d_inner = c * (1.0 + 3.0 * 0.044715 * x.powi(2));
                0.5 * tanh_inner + 0.5 * x * sech2 * d_inner + 0.5
            }
            ActivationFunction::Swish => {
                let sig = sigmoid(x);
                sig + x * sig * (1.0 - sig)
            }
        }
    }

    pub fn activate_array(&self, x: &Tensor2D) -> Tensor2D {
        x.mapv(|v| self.activate(v))
    }

    pub fn derivative_array(&self, x: &Tensor2D) -> Tensor2D {
        x.mapv(|v| self.derivative(v))
    }

    /// Whether He initialization suits this activation (Xavier otherwise).
    pub fn is_relu_family(&self) -> bool {
        matches!(
            self,
            ActivationFunction::ReLU
                | ActivationFunction::LeakyReLU { .. }
                | ActivationFunction::Elu { .. }
                | ActivationFunction::Gelu
                | ActivationFunction::Swish
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            ActivationFunction::ReLU => "relu",
            ActivationFunction::Sigmoid => "sigmoid",
            ActivationFunction::Tanh => "tanh",
            ActivationFunction::Linear => "linear",
            ActivationFunction::LeakyReLU { .. } => "leaky_relu",
            ActivationFunction::Elu { .. } => "elu",
            ActivationFunction::Gelu => "gelu",
            ActivationFunction::Swish => "swish",
        }
    }
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}
