use crate::error::Result;
use crate::math::tensor::{ensure_finite, ensure_shape, Tensor2D, Vector1D};

/// Plain stochastic gradient descent with optional L2 weight decay.
#[derive(Debug, Clone, PartialEq)]
pub struct Sgd {
    pub learning_rate: f32,
    pub l2: f32,
}

impl Sgd {
    pub fn new(learning_rate: f32) -> Sgd {
        Sgd { learning_rate, l2: 0.0 }
    }

    pub fn with_l2(mut self, l2: f32) -> Sgd {
        self.l2 = l2;
        self
    }

    /// Applies one SGD update: `w -= lr·(g + l2·w)`, `b -= lr·g`.
    ///
    /// Biases are not regularized. Nothing is written unless the whole update
    /// is finite.
    pub fn step(
        &self,
        weights: &mut Tensor2D,
        biases: &mut Vector1D,
        weight_grad: &Tensor2D,
        bias_grad: &Vector1D,
    ) -> Result<()> {
        let (new_weights, new_biases) = self.propose(weights, biases, weight_grad, bias_grad)?;
        *weights = new_weights;
        *biases = new_biases;
        Ok(())
    }

    /// The parameters one SGD step would produce, checked for finiteness.
    pub(crate) fn propose(
        &self,
        weights: &Tensor2D,
        biases: &Vector1D,
        weight_grad: &Tensor2D,
        bias_grad: &Vector1D,
    ) -> Result<(Tensor2D, Vector1D)> {
        check_gradients(weights, biases, weight_grad, bias_grad)?;

        let new_weights = weights - &((weight_grad + &(weights * self.l2)) * self.learning_rate);
        let new_biases = biases - &(bias_grad * self.learning_rate);
        ensure_finite("sgd updated weights", &new_weights)?;
        ensure_finite("sgd updated biases", &new_biases)?;
        Ok((new_weights, new_biases))
    }
}

/// Shape and finiteness checks shared by every optimizer, run before any
/// parameter or state is touched.
pub(crate) fn check_gradients(
    weights: &Tensor2D,
    biases: &Vector1D,
    weight_grad: &Tensor2D,
    bias_grad: &Vector1D,
) -> Result<()> {
    ensure_shape("weight gradient", weights.shape(), weight_grad.shape())?;
    ensure_shape("bias gradient", biases.shape(), bias_grad.shape())?;
    ensure_finite("weight gradient", weight_grad)?;
    ensure_finite("bias gradient", bias_grad)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn plain_step() {
        let sgd = Sgd::new(0.01);
        let mut weights = array![[1.0, 2.0], [3.0, 4.0]];
        let mut biases = array![0.1, 0.2];
        sgd.step(
            &mut weights,
            &mut biases,
            &array![[0.1, 0.2], [0.3, 0.4]],
            &array![0.01, 0.02],
        )
        .unwrap();
        assert_abs_diff_eq!(weights[[0, 0]], 0.999, epsilon = 1e-6);
        assert_abs_diff_eq!(weights[[1, 1]], 3.996, epsilon = 1e-6);
        assert_abs_diff_eq!(biases[0], 0.0999, epsilon = 1e-6);
    }

    #[test]
    fn l2_decays_weights_but_not_biases() {
        let sgd = Sgd::new(0.1).with_l2(0.5);
        let mut weights = array![[1.0]];
        let mut biases = array![1.0];
        sgd.step(&mut weights, &mut biases, &array![[0.0]], &array![0.0]).unwrap();
        assert_abs_diff_eq!(weights[[0, 0]], 0.95, epsilon = 1e-6);
        assert_eq!(biases[0], 1.0);
    }

    #[test]
    fn rejected_update_leaves_parameters_untouched() {
        let sgd = Sgd::new(0.1);
        let mut weights = array![[1.0, 2.0]];
        let mut biases = array![0.5, 0.5];

        let err = sgd
            .step(&mut weights, &mut biases, &array![[0.1, f32::NAN]], &array![0.0, 0.0])
            .unwrap_err();
        assert!(matches!(err, Error::NonFiniteValue(_)));

        let err = sgd
            .step(&mut weights, &mut biases, &array![[0.1], [0.2]], &array![0.0, 0.0])
            .unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));

        assert_eq!(weights, array![[1.0, 2.0]]);
        assert_eq!(biases, array![0.5, 0.5]);
    }
}
