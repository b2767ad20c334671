use serde::{Serialize, Deserialize};

/// Per-epoch training statistics appended by `train_loop`.
///
/// When a `progress_tx` channel is configured in `TrainConfig`, the training
/// loop also sends a copy of every record to it as the epoch completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochStats {
    /// 1-based epoch number, continuing across successive training runs that
    /// share one `TrainingStats`.
    pub epoch: usize,
    /// Total epochs requested for this run (0 for records added by hand).
    pub total_epochs: usize,
    /// Sample-weighted mean training loss over the epoch.
    pub loss: f32,
    /// Fraction of training rows predicted correctly, in [0, 1].
    pub accuracy: f32,
    /// Mean validation loss, if a validation set was provided.
    pub val_loss: Option<f32>,
    /// Validation accuracy, if a validation set was provided.
    pub val_accuracy: Option<f32>,
    /// Wall-clock duration of this single epoch in milliseconds.
    pub elapsed_ms: u64,
}

impl EpochStats {
    pub fn new(epoch: usize, loss: f32, accuracy: f32) -> EpochStats {
        EpochStats {
            epoch,
            total_epochs: 0,
            loss,
            accuracy,
            val_loss: None,
            val_accuracy: None,
            elapsed_ms: 0,
        }
    }
}
