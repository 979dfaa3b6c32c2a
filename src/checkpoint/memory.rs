use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::checkpoint::record::{CheckpointKind, CheckpointRecord};
use crate::checkpoint::store::CheckpointStore;
use crate::error::Result;

/// In-process checkpoint store with the same retention policy as the
/// directory store. Clones share the same records, so a caller can keep a
/// handle while the controller owns the boxed store.
#[derive(Debug, Clone)]
pub struct MemoryCheckpointStore {
    inner: Arc<Mutex<MemoryInner>>,
}

#[derive(Debug)]
struct MemoryInner {
    keep_epoch_end: usize,
    epoch_end: VecDeque<CheckpointRecord>,
    intra_epoch: Option<CheckpointRecord>,
    save_counts: HashMap<CheckpointKind, usize>,
}

impl MemoryCheckpointStore {
    pub fn new(keep_epoch_end: usize) -> Self {
        MemoryCheckpointStore {
            inner: Arc::new(Mutex::new(MemoryInner {
                keep_epoch_end: keep_epoch_end.max(1),
                epoch_end: VecDeque::new(),
                intra_epoch: None,
                save_counts: HashMap::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MemoryInner> {
        // A poisoned lock only means another holder panicked mid-save; the
        // records themselves are still consistent.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Total number of `save` calls of `kind`, including pruned records.
    pub fn save_count(&self, kind: CheckpointKind) -> usize {
        self.lock().save_counts.get(&kind).copied().unwrap_or(0)
    }

    /// Retained epoch-end records, oldest first.
    pub fn epoch_end_records(&self) -> Vec<CheckpointRecord> {
        self.lock().epoch_end.iter().cloned().collect()
    }
}

impl Default for MemoryCheckpointStore {
    fn default() -> Self {
        MemoryCheckpointStore::new(3)
    }
}

impl CheckpointStore for MemoryCheckpointStore {
    fn save(&mut self, record: CheckpointRecord) -> Result<()> {
        let mut inner = self.lock();
        *inner.save_counts.entry(record.kind).or_insert(0) += 1;

        match record.kind {
            CheckpointKind::IntraEpoch => {
                inner.intra_epoch = Some(record);
            }
            CheckpointKind::EpochEnd => {
                if inner.intra_epoch.as_ref().is_some_and(|r| r.epoch <= record.epoch) {
                    inner.intra_epoch = None;
                }
                inner.epoch_end.push_back(record);
                while inner.epoch_end.len() > inner.keep_epoch_end {
                    inner.epoch_end.pop_front();
                }
            }
        }
        Ok(())
    }

    fn load_latest(&self) -> Result<Option<CheckpointRecord>> {
        Ok(self.lock().epoch_end.iter().max_by_key(|r| r.position()).cloned())
    }

    fn load_latest_intra_epoch(&self) -> Result<Option<CheckpointRecord>> {
        Ok(self.lock().intra_epoch.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::accumulator::MetricsSnapshot;

    fn fields(a: f64) -> MetricsSnapshot {
        MetricsSnapshot::from([("a".to_string(), a)])
    }

    #[test]
    fn test_round_trip() {
        let mut store = MemoryCheckpointStore::default();
        store.save(CheckpointRecord::epoch_end(fields(1.0), 3, 100)).unwrap();
        let latest = store.load_latest().unwrap().unwrap();
        assert_eq!(latest.epoch, 3);
        assert_eq!(latest.step, 100);
        assert_eq!(latest.fields, fields(1.0));
    }

    #[test]
    fn test_empty_store() {
        let store = MemoryCheckpointStore::default();
        assert!(store.load_latest().unwrap().is_none());
        assert!(store.load_latest_intra_epoch().unwrap().is_none());
    }

    #[test]
    fn test_retention_is_bounded() {
        let mut store = MemoryCheckpointStore::new(2);
        for epoch in 1..=5 {
            for step in 0..10 {
                store
                    .save(CheckpointRecord::intra_epoch(epoch, (epoch * 100 + step) as u64))
                    .unwrap();
            }
            store
                .save(CheckpointRecord::epoch_end(fields(epoch as f64), epoch, (epoch * 100 + 10) as u64))
                .unwrap();
        }
        assert_eq!(store.epoch_end_records().len(), 2);
        assert_eq!(store.load_latest().unwrap().unwrap().epoch, 5);
        assert!(store.load_latest_intra_epoch().unwrap().is_none());
        assert_eq!(store.save_count(CheckpointKind::IntraEpoch), 50);
        assert_eq!(store.save_count(CheckpointKind::EpochEnd), 5);
    }

    #[test]
    fn test_intra_epoch_does_not_shadow_epoch_end() {
        let mut store = MemoryCheckpointStore::default();
        store.save(CheckpointRecord::epoch_end(fields(1.0), 1, 8)).unwrap();
        store.save(CheckpointRecord::intra_epoch(2, 12)).unwrap();
        assert_eq!(store.load_latest().unwrap().unwrap().epoch, 1);
        assert_eq!(store.load_latest_intra_epoch().unwrap().unwrap().step, 12);
    }
}
