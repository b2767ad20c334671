use serde::{Serialize, Deserialize};

use crate::error::{Error, Result};
use crate::layers::dense::LayerId;
use crate::math::tensor::{Tensor2D, Vector1D};
use crate::optim::adam::{Adam, Moments};
use crate::optim::sgd::Sgd;

/// The optimizers a network can be trained with.
///
/// Layer parameters change only through `update`, or through `propose`
/// followed by `commit` when several layers must be updated together. A
/// failed proposal changes nothing.
#[derive(Debug, Clone)]
pub enum Optimizer {
    Sgd(Sgd),
    Adam(Adam),
}

/// New parameters for one layer, computed and checked but not yet written.
///
/// Produced by [`Optimizer::propose`]; nothing changes until it is handed to
/// [`Optimizer::commit`].
#[derive(Debug)]
pub struct PendingUpdate {
    layer: LayerId,
    weights: Tensor2D,
    biases: Vector1D,
    moments: Option<Moments>,
}

impl PendingUpdate {
    pub fn layer(&self) -> LayerId {
        self.layer
    }
}

impl Optimizer {
    pub fn update(
        &mut self,
        layer: LayerId,
        weights: &mut Tensor2D,
        biases: &mut Vector1D,
        weight_grad: &Tensor2D,
        bias_grad: &Vector1D,
    ) -> Result<()> {
        let pending = self.propose(layer, weights, biases, weight_grad, bias_grad)?;
        self.commit(pending, weights, biases);
        Ok(())
    }

    /// Computes the update for `layer` without changing the parameters or any
    /// optimizer state. Fails on mismatched shapes or a non-finite result.
    pub fn propose(
        &self,
        layer: LayerId,
        weights: &Tensor2D,
        biases: &Vector1D,
        weight_grad: &Tensor2D,
        bias_grad: &Vector1D,
    ) -> Result<PendingUpdate> {
        match self {
            Optimizer::Sgd(sgd) => {
                let (weights, biases) = sgd.propose(weights, biases, weight_grad, bias_grad)?;
                Ok(PendingUpdate { layer, weights, biases, moments: None })
            }
            Optimizer::Adam(adam) => {
                let (weights, biases, moments) = adam.propose(layer, weights, biases, weight_grad, bias_grad)?;
                Ok(PendingUpdate { layer, weights, biases, moments: Some(moments) })
            }
        }
    }

    /// Writes a proposed update into `weights`/`biases` and stores its state.
    pub fn commit(&mut self, pending: PendingUpdate, weights: &mut Tensor2D, biases: &mut Vector1D) {
        *weights = pending.weights;
        *biases = pending.biases;
        if let (Optimizer::Adam(adam), Some(moments)) = (self, pending.moments) {
            adam.commit(pending.layer, moments);
        }
    }

    pub fn learning_rate(&self) -> f32 {
        match self {
            Optimizer::Sgd(sgd) => sgd.learning_rate,
            Optimizer::Adam(adam) => adam.learning_rate,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Optimizer::Sgd(_) => "sgd",
            Optimizer::Adam(_) => "adam",
        }
    }

    /// Clears any per-layer state.
    pub fn reset(&mut self) {
        if let Optimizer::Adam(adam) = self {
            adam.reset();
        }
    }
}

impl From<Sgd> for Optimizer {
    fn from(sgd: Sgd) -> Self {
        Optimizer::Sgd(sgd)
    }
}

impl From<Adam> for Optimizer {
    fn from(adam: Adam) -> Self {
        Optimizer::Adam(adam)
    }
}

/// Optimizer choice as it appears in a run configuration. Learning rate and
/// L2 live in the hyperparameters and are supplied to [`OptimizerKind::build`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OptimizerKind {
    Sgd,
    Adam {
        #[serde(default = "default_beta1")]
        beta1: f32,
        #[serde(default = "default_beta2")]
        beta2: f32,
        #[serde(default = "default_epsilon")]
        epsilon: f32,
    },
}

fn default_beta1() -> f32 { 0.9 }
fn default_beta2() -> f32 { 0.999 }
fn default_epsilon() -> f32 { 1e-8 }

impl Default for OptimizerKind {
    fn default() -> Self {
        OptimizerKind::Adam {
            beta1: default_beta1(),
            beta2: default_beta2(),
            epsilon: default_epsilon(),
        }
    }
}

impl OptimizerKind {
    pub fn build(&self, learning_rate: f32, l2: f32) -> Result<Optimizer> {
        if !(learning_rate.is_finite() && learning_rate > 0.0) {
            return Err(Error::config(format!("learning rate must be positive, got {learning_rate}")));
        }
        if !(l2.is_finite() && l2 >= 0.0) {
            return Err(Error::config(format!("l2 coefficient must be non-negative, got {l2}")));
        }
        match *self {
            OptimizerKind::Sgd => Ok(Sgd::new(learning_rate).with_l2(l2).into()),
            OptimizerKind::Adam { beta1, beta2, epsilon } => {
                for (name, beta) in [("beta1", beta1), ("beta2", beta2)] {
                    if !(0.0..1.0).contains(&beta) {
                        return Err(Error::config(format!("{name} must lie in [0, 1), got {beta}")));
                    }
                }
                if !(epsilon.is_finite() && epsilon > 0.0) {
                    return Err(Error::config(format!("epsilon must be positive, got {epsilon}")));
                }
                Ok(Adam::new(learning_rate)
                    .with_betas(beta1, beta2)
                    .with_epsilon(epsilon)
                    .with_l2(l2)
                    .into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_parses_with_defaults() {
        let kind: OptimizerKind = serde_json::from_str(r#"{"type":"adam"}"#).unwrap();
        assert_eq!(kind, OptimizerKind::default());
        let kind: OptimizerKind = serde_json::from_str(r#"{"type":"sgd"}"#).unwrap();
        assert_eq!(kind, OptimizerKind::Sgd);
    }

    #[test]
    fn build_validates_hyperparameters() {
        assert!(matches!(OptimizerKind::Sgd.build(0.0, 0.0), Err(Error::Configuration(_))));
        assert!(matches!(OptimizerKind::Sgd.build(0.1, -1.0), Err(Error::Configuration(_))));
        let bad_beta = OptimizerKind::Adam { beta1: 1.0, beta2: 0.999, epsilon: 1e-8 };
        assert!(matches!(bad_beta.build(0.01, 0.0), Err(Error::Configuration(_))));

        let opt = OptimizerKind::default().build(0.01, 0.001).unwrap();
        assert_eq!(opt.name(), "adam");
        assert_eq!(opt.learning_rate(), 0.01);
    }

    #[test]
    fn update_dispatches_by_variant() {
        use ndarray::array;
        let mut opt: Optimizer = Sgd::new(1.0).into();
        let mut w = array![[1.0]];
        let mut b = array![1.0];
        opt.update(LayerId::next(), &mut w, &mut b, &array![[0.5]], &array![0.25]).unwrap();
        assert_eq!(w, array![[0.5]]);
        assert_eq!(b, array![0.75]);
    }

    #[test]
    fn proposals_change_nothing_until_committed() {
        use ndarray::array;
        let layer = LayerId::next();
        let mut opt: Optimizer = Adam::new(0.1).into();
        let mut w = array![[1.0]];
        let mut b = array![0.0];

        let pending = opt.propose(layer, &w, &b, &array![[0.5]], &array![0.5]).unwrap();
        assert_eq!(pending.layer(), layer);
        assert_eq!(w, array![[1.0]]);
        if let Optimizer::Adam(adam) = &opt {
            assert_eq!(adam.step_count(layer), None);
        }

        opt.commit(pending, &mut w, &mut b);
        assert!(w[[0, 0]] < 1.0);
        if let Optimizer::Adam(adam) = &opt {
            assert_eq!(adam.step_count(layer), Some(1));
        }
    }
}
