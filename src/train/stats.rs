use std::sync::{Arc, PoisonError, RwLock};

use crate::error::{Error, Result};
use crate::train::epoch_stats::EpochStats;

/// Append-only history of epoch records, readable while training runs.
///
/// Cloning the handle shares the same history. The lock is held only to push
/// or to clone records out, so readers never observe a partially written
/// entry and never block the training loop for long.
#[derive(Debug, Clone, Default)]
pub struct TrainingStats {
    records: Arc<RwLock<Vec<EpochStats>>>,
}

impl TrainingStats {
    pub fn new() -> TrainingStats {
        TrainingStats::default()
    }

    /// Appends a minimal record for `epoch`.
    pub fn record(&self, epoch: usize, loss: f32, accuracy: f32) -> Result<()> {
        self.append(EpochStats::new(epoch, loss, accuracy))
    }

    /// Appends `stats`; its epoch must be greater than every recorded epoch.
    pub fn append(&self, stats: EpochStats) -> Result<()> {
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(last) = records.last() {
            if stats.epoch <= last.epoch {
                return Err(Error::config(format!(
                    "epoch {} recorded after epoch {}",
                    stats.epoch, last.epoch
                )));
            }
        }
        records.push(stats);
        Ok(())
    }

    /// Copy of every record so far, in epoch order.
    pub fn snapshot(&self) -> Vec<EpochStats> {
        self.read(|records| records.to_vec())
    }

    /// Records after the first `seen`; lets an observer poll incrementally.
    pub fn since(&self, seen: usize) -> Vec<EpochStats> {
        self.read(|records| records.get(seen..).map(<[EpochStats]>::to_vec).unwrap_or_default())
    }

    pub fn latest(&self) -> Option<EpochStats> {
        self.read(|records| records.last().cloned())
    }

    /// Epoch number of the newest record, 0 when empty.
    pub fn last_epoch(&self) -> usize {
        self.read(|records| records.last().map_or(0, |r| r.epoch))
    }

    pub fn len(&self) -> usize {
        self.read(Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.read(Vec::is_empty)
    }

    fn read<T>(&self, f: impl FnOnce(&Vec<EpochStats>) -> T) -> T {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        f(&records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn epochs_must_increase() {
        let stats = TrainingStats::new();
        stats.record(1, 0.5, 0.25).unwrap();
        stats.record(3, 0.4, 0.5).unwrap();
        assert!(matches!(stats.record(3, 0.3, 0.5), Err(Error::Configuration(_))));
        assert!(matches!(stats.record(2, 0.3, 0.5), Err(Error::Configuration(_))));
        assert_eq!(stats.len(), 2);
        assert_eq!(stats.last_epoch(), 3);
    }

    #[test]
    fn since_returns_only_newer_records() {
        let stats = TrainingStats::new();
        assert!(stats.is_empty());
        assert!(stats.since(0).is_empty());
        assert_eq!(stats.latest(), None);

        for epoch in 1..=4 {
            stats.record(epoch, 1.0 / epoch as f32, 0.0).unwrap();
        }
        let newer = stats.since(2);
        assert_eq!(newer.iter().map(|r| r.epoch).collect::<Vec<_>>(), vec![3, 4]);
        assert!(stats.since(4).is_empty());
        assert!(stats.since(10).is_empty());
        assert_eq!(stats.latest().map(|r| r.epoch), Some(4));
    }

    #[test]
    fn clones_share_history_across_threads() {
        let stats = TrainingStats::new();
        let writer = stats.clone();
        let handle = thread::spawn(move || {
            for epoch in 1..=100 {
                writer.record(epoch, epoch as f32, 1.0).unwrap();
            }
        });
        // Every snapshot taken mid-run is a gap-free prefix.
        for _ in 0..50 {
            let snap = stats.snapshot();
            for (i, record) in snap.iter().enumerate() {
                assert_eq!(record.epoch, i + 1);
            }
        }
        handle.join().unwrap();
        assert_eq!(stats.len(), 100);
    }
}
