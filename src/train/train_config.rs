use std::sync::mpsc;
use std::sync::{Arc, atomic::AtomicBool};

use crate::error::{Error, Result};
use crate::loss::loss_type::LossType;
use crate::train::epoch_stats::EpochStats;

/// Configuration for a `train_loop` run.
///
/// # Fields
/// - `epochs`      — number of full passes over the training data
/// - `batch_size`  — samples per mini-batch; use `1` for online SGD
/// - `loss_type`   — loss function driving the gradients
/// - `seed`        — seeds the per-epoch shuffle; entropy when `None`
/// - `progress_tx` — optional channel sender; one `EpochStats` is sent per
///                   completed epoch.  If the receiver is dropped the loop
///                   terminates early (clean shutdown).
/// - `stop_flag`   — optional atomic flag; when set to `true` from another
///                   thread the loop terminates before the next batch.
#[derive(Debug, Clone)]
pub struct TrainConfig {
    pub epochs: usize,
    pub batch_size: usize,
    pub loss_type: LossType,
    pub seed: Option<u64>,
    pub progress_tx: Option<mpsc::Sender<EpochStats>>,
    pub stop_flag: Option<Arc<AtomicBool>>,
}

impl TrainConfig {
    /// Creates a minimal `TrainConfig` with no progress channel and no stop flag.
    pub fn new(epochs: usize, batch_size: usize, loss_type: LossType) -> Self {
        TrainConfig {
            epochs,
            batch_size,
            loss_type,
            seed: None,
            progress_tx: None,
            stop_flag: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_progress(mut self, tx: mpsc::Sender<EpochStats>) -> Self {
        self.progress_tx = Some(tx);
        self
    }

    pub fn with_stop_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.stop_flag = Some(flag);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.epochs == 0 {
            return Err(Error::config("epochs must be at least 1"));
        }
        if self.batch_size == 0 {
            return Err(Error::config("batch_size must be at least 1"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_epochs_or_batch_size_is_rejected() {
        assert!(TrainConfig::new(1, 1, LossType::Mse).validate().is_ok());
        assert!(matches!(
            TrainConfig::new(0, 4, LossType::Mse).validate(),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            TrainConfig::new(10, 0, LossType::Mse).validate(),
            Err(Error::Configuration(_))
        ));
    }
}
