//! Adam (Adaptive Moment Estimation) with one moment slot per layer.
//!
//! ```text
//! g'    = g + l2·w                  (weights only)
//! m     = β1·m + (1 - β1)·g'
//! v     = β2·v + (1 - β2)·g'²
//! m_hat = m / (1 - β1^t)
//! v_hat = v / (1 - β2^t)
//! w    -= lr · m_hat / (sqrt(v_hat) + ε)
//! ```
//!
//! `t` counts the updates applied to that particular layer, so one Adam
//! instance shared by every layer of a network bias-corrects each layer
//! independently.

use std::collections::HashMap;

use ndarray::{Array1, Array2, ArrayBase, Data, DataMut, Dimension, Zip};

use crate::error::{Error, Result};
use crate::layers::dense::LayerId;
use crate::math::tensor::{ensure_finite, Tensor2D, Vector1D};
use crate::optim::sgd::check_gradients;

#[derive(Debug, Clone)]
pub struct Adam {
    pub learning_rate: f32,
    pub beta1: f32,
    pub beta2: f32,
    pub epsilon: f32,
    pub l2: f32,
    slots: HashMap<LayerId, Moments>,
}

/// First/second moment accumulators for one layer's weights and biases.
#[derive(Debug, Clone)]
pub(crate) struct Moments {
    step: i32,
    m_w: Tensor2D,
    v_w: Tensor2D,
    m_b: Vector1D,
    v_b: Vector1D,
}

impl Moments {
    fn zeros(weights: &Tensor2D, biases: &Vector1D) -> Moments {
        Moments {
            step: 0,
            m_w: Array2::zeros(weights.raw_dim()),
            v_w: Array2::zeros(weights.raw_dim()),
            m_b: Array1::zeros(biases.raw_dim()),
            v_b: Array1::zeros(biases.raw_dim()),
        }
    }
}

impl Adam {
    pub fn new(learning_rate: f32) -> Self {
        Self {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
            l2: 0.0,
            slots: HashMap::new(),
        }
    }

    pub fn with_betas(mut self, beta1: f32, beta2: f32) -> Self {
        self.beta1 = beta1;
        self.beta2 = beta2;
        self
    }

    pub fn with_epsilon(mut self, epsilon: f32) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn with_l2(mut self, l2: f32) -> Self {
        self.l2 = l2;
        self
    }

    /// Number of updates applied so far to `layer`, if it has a slot.
    pub fn step_count(&self, layer: LayerId) -> Option<u32> {
        self.slots.get(&layer).map(|s| s.step as u32)
    }

    /// Number of layers with moment state.
    pub fn tracked_layers(&self) -> usize {
        self.slots.len()
    }

    /// Drops all moment state (for a fresh training run).
    pub fn reset(&mut self) {
        self.slots.clear();
    }

    pub fn step(
        &mut self,
        layer: LayerId,
        weights: &mut Tensor2D,
        biases: &mut Vector1D,
        weight_grad: &Tensor2D,
        bias_grad: &Vector1D,
    ) -> Result<()> {
        let (new_weights, new_biases, moments) = self.propose(layer, weights, biases, weight_grad, bias_grad)?;
        *weights = new_weights;
        *biases = new_biases;
        self.commit(layer, moments);
        Ok(())
    }

    /// Computes one step for `layer` without touching its slot: the new
    /// parameters (checked for finiteness) and the moments to store if the
    /// step is committed.
    pub(crate) fn propose(
        &self,
        layer: LayerId,
        weights: &Tensor2D,
        biases: &Vector1D,
        weight_grad: &Tensor2D,
        bias_grad: &Vector1D,
    ) -> Result<(Tensor2D, Vector1D, Moments)> {
        check_gradients(weights, biases, weight_grad, bias_grad)?;

        let mut next = match self.slots.get(&layer) {
            Some(slot) => {
                if slot.m_w.shape() != weights.shape() || slot.m_b.shape() != biases.shape() {
                    return Err(Error::shape(
                        format!("adam state for layer {layer}"),
                        slot.m_w.shape(),
                        weights.shape(),
                    ));
                }
                slot.clone()
            }
            None => Moments::zeros(weights, biases),
        };
        next.step += 1;

        let bias_correction1 = 1.0 - self.beta1.powi(next.step);
        let bias_correction2 = 1.0 - self.beta2.powi(next.step);

        let decayed_grad = weight_grad + &(weights * self.l2);
        let mut new_weights = weights.clone();
        self.apply(&mut new_weights, &decayed_grad, &mut next.m_w, &mut next.v_w, bias_correction1, bias_correction2);
        let mut new_biases = biases.clone();
        self.apply(&mut new_biases, bias_grad, &mut next.m_b, &mut next.v_b, bias_correction1, bias_correction2);

        ensure_finite("adam updated weights", &new_weights)?;
        ensure_finite("adam updated biases", &new_biases)?;
        Ok((new_weights, new_biases, next))
    }

    pub(crate) fn commit(&mut self, layer: LayerId, moments: Moments) {
        self.slots.insert(layer, moments);
    }

    fn apply<D, S1, S2>(
        &self,
        params: &mut ArrayBase<S1, D>,
        grad: &ArrayBase<S2, D>,
        m: &mut ArrayBase<S1, D>,
        v: &mut ArrayBase<S1, D>,
        bias_correction1: f32,
        bias_correction2: f32,
    ) where
        D: Dimension,
        S1: DataMut<Elem = f32>,
        S2: Data<Elem = f32>,
    {
        let (b1, b2, lr, eps) = (self.beta1, self.beta2, self.learning_rate, self.epsilon);
        Zip::from(params).and(grad).and(m).and(v).for_each(|p, &g, m, v| {
            *m = b1 * *m + (1.0 - b1) * g;
            *v = b2 * *v + (1.0 - b2) * g * g;
            let m_hat = *m / bias_correction1;
            let v_hat = *v / bias_correction2;
            *p -= lr * m_hat / (v_hat.sqrt() + eps);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn ids() -> (LayerId, LayerId) {
        (LayerId::next(), LayerId::next())
    }

    #[test]
    fn first_step_moves_by_learning_rate() {
        let (layer, _) = ids();
        let mut adam = Adam::new(0.001);
        let mut weights = array![[0.5, 0.3], [0.7, 0.9]];
        let mut biases = array![0.1, 0.2];
        adam.step(
            layer,
            &mut weights,
            &mut biases,
            &array![[0.05, -0.02], [0.03, 0.04]],
            &array![0.01, 0.02],
        )
        .unwrap();
        // Bias-corrected m_hat / sqrt(v_hat) is sign(g) on the first step.
        assert_abs_diff_eq!(weights[[0, 0]], 0.499, epsilon = 1e-5);
        assert_abs_diff_eq!(weights[[0, 1]], 0.301, epsilon = 1e-5);
        assert_abs_diff_eq!(biases[0], 0.099, epsilon = 1e-5);
        assert_eq!(adam.step_count(layer), Some(1));
    }

    #[test]
    fn repeated_steps_keep_decreasing() {
        let (layer, _) = ids();
        let mut adam = Adam::new(0.01);
        let mut weights = Array2::ones((3, 2));
        let mut biases = Array1::zeros(2);
        let grad = Array2::ones((3, 2));
        for _ in 0..10 {
            adam.step(layer, &mut weights, &mut biases, &grad, &Array1::zeros(2)).unwrap();
        }
        assert!(weights[[0, 0]] < 0.95);
        assert_eq!(adam.step_count(layer), Some(10));
    }

    #[test]
    fn layers_keep_separate_moments() {
        let (a, b) = ids();
        let mut adam = Adam::new(0.001);
        let mut wa = array![[1.0]];
        let mut ba = array![0.0];
        for _ in 0..5 {
            adam.step(a, &mut wa, &mut ba, &array![[10.0]], &array![0.0]).unwrap();
        }

        // A fresh layer starts from zero moments: its first step is exactly lr.
        let mut wb = array![[1.0]];
        let mut bb = array![0.0];
        adam.step(b, &mut wb, &mut bb, &array![[-0.5]], &array![0.0]).unwrap();
        assert_abs_diff_eq!(wb[[0, 0]], 1.001, epsilon = 1e-6);

        assert_eq!(adam.tracked_layers(), 2);
        assert_eq!(adam.step_count(a), Some(5));
        assert_eq!(adam.step_count(b), Some(1));
    }

    #[test]
    fn l2_is_added_to_the_raw_gradient() {
        let (layer, _) = ids();
        let mut adam = Adam::new(0.001).with_l2(1.0);
        let mut weights = array![[2.0]];
        let mut biases = array![0.0];
        // Zero gradient, but the decay term makes the effective gradient positive.
        adam.step(layer, &mut weights, &mut biases, &array![[0.0]], &array![0.0]).unwrap();
        assert_abs_diff_eq!(weights[[0, 0]], 1.999, epsilon = 1e-6);
        assert_eq!(biases[0], 0.0);
    }

    #[test]
    fn failed_step_leaves_state_untouched() {
        let (layer, _) = ids();
        let mut adam = Adam::new(0.001);
        let mut weights = array![[1.0, 1.0]];
        let mut biases = array![0.0];
        adam.step(layer, &mut weights, &mut biases, &array![[0.1, 0.1]], &array![0.1]).unwrap();
        let before = weights.clone();

        let err = adam
            .step(layer, &mut weights, &mut biases, &array![[f32::INFINITY, 0.1]], &array![0.1])
            .unwrap_err();
        assert!(matches!(err, Error::NonFiniteValue(_)));
        assert_eq!(weights, before);
        assert_eq!(adam.step_count(layer), Some(1));
    }

    #[test]
    fn stale_slot_shape_is_rejected() {
        let (layer, _) = ids();
        let mut adam = Adam::new(0.001);
        let mut small = array![[1.0]];
        let mut bias = array![0.0];
        adam.step(layer, &mut small, &mut bias, &array![[0.1]], &array![0.1]).unwrap();

        let mut wide = array![[1.0, 2.0]];
        let mut wide_bias = array![0.0, 0.0];
        let err = adam
            .step(layer, &mut wide, &mut wide_bias, &array![[0.1, 0.1]], &array![0.1, 0.1])
            .unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));
    }

    #[test]
    fn reset_clears_slots() {
        let (layer, _) = ids();
        let mut adam = Adam::new(0.001);
        let mut w = array![[1.0]];
        let mut b = array![0.0];
        adam.step(layer, &mut w, &mut b, &array![[0.1]], &array![0.1]).unwrap();
        adam.reset();
        assert_eq!(adam.tracked_layers(), 0);
        assert_eq!(adam.step_count(layer), None);
    }
}
