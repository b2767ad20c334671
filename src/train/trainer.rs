use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::error::Result;
use crate::network::shared::SharedModel;
use crate::optim::optimizer::Optimizer;
use crate::train::dataset::Dataset;
use crate::train::loop_fn::{train_loop, TrainSummary};
use crate::train::stats::TrainingStats;
use crate::train::train_config::TrainConfig;

/// Result of a background run: the summary plus the optimizer, returned so
/// its accumulated state can seed a follow-up run.
#[derive(Debug)]
pub struct TrainOutcome {
    pub summary: TrainSummary,
    pub optimizer: Optimizer,
}

/// Handle to a training run on its own thread.
#[derive(Debug)]
pub struct TrainingHandle {
    stop_flag: Arc<AtomicBool>,
    stats: TrainingStats,
    join: JoinHandle<Result<TrainOutcome>>,
}

/// Runs [`train_loop`] on a dedicated thread.
///
/// Uses `config.stop_flag` when one is set, otherwise installs a fresh flag,
/// so [`TrainingHandle::stop`] always works. The caller keeps `model` and
/// `stats` clones for concurrent reads.
pub fn spawn_training(
    model: SharedModel,
    train: Dataset,
    validation: Option<Dataset>,
    mut optimizer: Optimizer,
    stats: TrainingStats,
    mut config: TrainConfig,
) -> TrainingHandle {
    let stop_flag = config
        .stop_flag
        .get_or_insert_with(|| Arc::new(AtomicBool::new(false)))
        .clone();
    let thread_stats = stats.clone();

    let join = thread::spawn(move || {
        let summary = train_loop(
            &model,
            &train,
            validation.as_ref(),
            &mut optimizer,
            &thread_stats,
            &config,
        )?;
        Ok(TrainOutcome { summary, optimizer })
    });

    TrainingHandle { stop_flag, stats, join }
}

impl TrainingHandle {
    /// Asks the loop to stop before its next batch.
    pub fn stop(&self) {
        self.stop_flag.store(true, Ordering::Relaxed);
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// The shared history the run appends to.
    pub fn stats(&self) -> &TrainingStats {
        &self.stats
    }

    /// Waits for the run to end. A panic on the training thread is resumed
    /// on the caller's.
    pub fn join(self) -> Result<TrainOutcome> {
        match self.join.join() {
            Ok(result) => result,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }
}
