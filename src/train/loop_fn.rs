use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use ndarray::{ArrayView1, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::error::{Error, Result};
use crate::loss::loss_type::LossType;
use crate::math::tensor::{ensure_finite, ensure_shape, Tensor2D};
use crate::network::shared::SharedModel;
use crate::optim::optimizer::Optimizer;
use crate::train::dataset::Dataset;
use crate::train::epoch_stats::EpochStats;
use crate::train::stats::TrainingStats;
use crate::train::train_config::TrainConfig;

/// What a finished (or stopped) training run accomplished.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainSummary {
    /// Epochs fully completed and recorded by this run.
    pub epochs_completed: usize,
    /// Training loss of the last completed epoch.
    pub final_loss: Option<f32>,
    /// True when the run ended early through the stop flag or a dropped
    /// progress receiver.
    pub stopped: bool,
}

// ---------------------------------------------------------------------------
// Public entry point
// ---------------------------------------------------------------------------

/// Trains the network behind `model` for `config.epochs` epochs.
///
/// Every epoch shuffles the sample order, then walks contiguous mini-batches.
/// The model's write lock is held for exactly one batch (forward, loss,
/// backward and update), so concurrent `SharedModel::predict` callers observe
/// parameters from between two batches. One `EpochStats` is appended to
/// `stats` per completed epoch; numbering continues after whatever `stats`
/// already holds.
///
/// # Early termination
/// The loop returns with `stopped: true` if:
/// - `config.stop_flag` is set (checked before every batch), **or**
/// - the `progress_tx` receiver has been dropped.
///
/// Updates already applied and epochs already recorded are kept.
///
/// # Errors
/// Shape and configuration problems, and non-finite values in either
/// dataset, are reported before the first batch. A non-finite loss, gradient
/// or update aborts the run before the offending batch changes any parameter.
pub fn train_loop(
    model: &SharedModel,
    train: &Dataset,
    validation: Option<&Dataset>,
    optimizer: &mut Optimizer,
    stats: &TrainingStats,
    config: &TrainConfig,
) -> Result<TrainSummary> {
    config.validate()?;
    check_dataset(model, train, "training")?;
    if let Some(val) = validation {
        check_dataset(model, val, "validation")?;
    }

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let first_epoch = stats.last_epoch() + 1;
    let mut indices: Vec<usize> = (0..train.len()).collect();
    let mut summary = TrainSummary {
        epochs_completed: 0,
        final_loss: None,
        stopped: false,
    };

    tracing::info!(
        epochs = config.epochs,
        batch_size = config.batch_size,
        samples = train.len(),
        optimizer = optimizer.name(),
        learning_rate = optimizer.learning_rate(),
        "training started"
    );

    for offset in 0..config.epochs {
        let epoch = first_epoch + offset;
        let t_start = Instant::now();

        indices.shuffle(&mut rng);
        let Some(pass) = run_one_epoch(model, train, &indices, optimizer, config)? else {
            summary.stopped = true;
            tracing::warn!(epoch, "training stopped before the epoch completed");
            break;
        };

        let (val_loss, val_accuracy) = match validation {
            Some(val) => {
                let (loss, accuracy) = evaluate(model, val, config.loss_type)?;
                (Some(loss), Some(accuracy))
            }
            None => (None, None),
        };

        let record = EpochStats {
            epoch,
            total_epochs: config.epochs,
            loss: pass.loss,
            accuracy: pass.accuracy,
            val_loss,
            val_accuracy,
            elapsed_ms: t_start.elapsed().as_millis() as u64,
        };
        tracing::debug!(
            epoch,
            loss = record.loss,
            accuracy = record.accuracy,
            val_loss = ?record.val_loss,
            "epoch complete"
        );
        stats.append(record.clone())?;
        summary.epochs_completed += 1;
        summary.final_loss = Some(pass.loss);

        if let Some(ref tx) = config.progress_tx {
            // If the receiver has been dropped, stop training.
            if tx.send(record).is_err() {
                summary.stopped = true;
                tracing::warn!(epoch, "progress receiver dropped; stopping");
                break;
            }
        }
    }

    tracing::info!(
        epochs_completed = summary.epochs_completed,
        final_loss = ?summary.final_loss,
        stopped = summary.stopped,
        "training finished"
    );
    Ok(summary)
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

struct EpochPass {
    loss: f32,
    accuracy: f32,
}

/// One pass over `train` in the order given by `indices`. Returns `None` when
/// the stop flag interrupted the pass.
fn run_one_epoch(
    model: &SharedModel,
    train: &Dataset,
    indices: &[usize],
    optimizer: &mut Optimizer,
    config: &TrainConfig,
) -> Result<Option<EpochPass>> {
    let mut total_loss = 0.0_f64;
    let mut correct = 0usize;

    for batch in indices.chunks(config.batch_size) {
        if stop_requested(config.stop_flag.as_deref()) {
            return Ok(None);
        }
        let (inputs, targets) = train.batch(batch);

        let mut network = model.write();
        let output = network.forward(&inputs)?;
        let loss = config.loss_type.loss(&output, &targets)?;
        if !loss.is_finite() {
            return Err(Error::NonFiniteValue(format!("batch loss ({loss})")));
        }
        let output_error = config.loss_type.derivative(&output, &targets)?;
        ensure_finite("loss gradient", &output_error)?;
        network.backward(&output_error, optimizer)?;
        drop(network);

        total_loss += f64::from(loss) * batch.len() as f64;
        correct += count_correct(&output, &targets);
    }

    let n = indices.len();
    Ok(Some(EpochPass {
        loss: (total_loss / n as f64) as f32,
        accuracy: correct as f32 / n as f32,
    }))
}

/// Loss and accuracy of the current parameters on `data`, without training.
fn evaluate(model: &SharedModel, data: &Dataset, loss_type: LossType) -> Result<(f32, f32)> {
    let output = model.predict(data.inputs())?;
    let loss = loss_type.loss(&output, data.targets())?;
    if !loss.is_finite() {
        return Err(Error::NonFiniteValue(format!("validation loss ({loss})")));
    }
    let accuracy = count_correct(&output, data.targets()) as f32 / data.len() as f32;
    Ok((loss, accuracy))
}

fn stop_requested(flag: Option<&AtomicBool>) -> bool {
    flag.map_or(false, |f| f.load(Ordering::Relaxed))
}

fn check_dataset(model: &SharedModel, data: &Dataset, which: &str) -> Result<()> {
    let (Some(input_size), Some(output_size)) = (model.input_size(), model.output_size()) else {
        return Err(Error::config("network has no layers"));
    };
    ensure_shape(&format!("{which} inputs"), &[input_size], &[data.input_size()])?;
    ensure_shape(&format!("{which} targets"), &[output_size], &[data.output_size()])?;
    ensure_finite(&format!("{which} inputs"), data.inputs())?;
    ensure_finite(&format!("{which} targets"), data.targets())
}

/// Rows whose prediction matches the target: rounded value for a single
/// output column, argmax otherwise.
pub(crate) fn count_correct(predicted: &Tensor2D, target: &Tensor2D) -> usize {
    predicted
        .axis_iter(Axis(0))
        .zip(target.axis_iter(Axis(0)))
        .filter(|(p, t)| {
            if p.len() == 1 {
                p[0].round() == t[0].round()
            } else {
                argmax(p) == argmax(t)
            }
        })
        .count()
}

/// Index of the maximum element in a row.
fn argmax(v: &ArrayView1<f32>) -> usize {
    v.iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(i, _)| i)
        .unwrap_or(0)
}
