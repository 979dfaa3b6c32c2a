use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::checkpoint::record::{CheckpointKind, CheckpointRecord};
use crate::checkpoint::store::CheckpointStore;
use crate::error::{Result, TrainError};

/// Checkpoint store backed by one JSON file per record.
///
/// File names encode kind, epoch and step
/// (`epoch_end-E00003-S0000000100.json`), so picking the latest record never
/// needs to open every file.
#[derive(Debug, Clone)]
pub struct DirectoryCheckpointStore {
    dir: PathBuf,
    keep_epoch_end: usize,
}

/// A checkpoint file found on disk, parsed from its name.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    kind: CheckpointKind,
    epoch: usize,
    step: u64,
    path: PathBuf,
}

impl DirectoryCheckpointStore {
    pub fn new(dir: impl Into<PathBuf>, keep_epoch_end: usize) -> Self {
        DirectoryCheckpointStore {
            dir: dir.into(),
            keep_epoch_end: keep_epoch_end.max(1),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_name(record: &CheckpointRecord) -> String {
        format!(
            "{}-E{:05}-S{:010}.json",
            record.kind.as_str(),
            record.epoch,
            record.step
        )
    }

    fn parse_name(path: &Path) -> Option<Entry> {
        let stem = path.file_name()?.to_str()?.strip_suffix(".json")?;
        let mut parts = stem.split('-');
        let kind = match parts.next()? {
            "epoch_end" => CheckpointKind::EpochEnd,
            "intra_epoch" => CheckpointKind::IntraEpoch,
            _ => return None,
        };
        let epoch = parts.next()?.strip_prefix('E')?.parse().ok()?;
        let step = parts.next()?.strip_prefix('S')?.parse().ok()?;
        if parts.next().is_some() {
            return None;
        }
        Some(Entry { kind, epoch, step, path: path.to_path_buf() })
    }

    /// Checkpoint files of `kind`, oldest first.
    fn entries(&self, kind: CheckpointKind) -> Result<Vec<Entry>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let read_dir = fs::read_dir(&self.dir).map_err(|e| TrainError::io(&self.dir, e))?;
        let mut entries = Vec::new();
        for item in read_dir {
            let item = item.map_err(|e| TrainError::io(&self.dir, e))?;
            if let Some(entry) = Self::parse_name(&item.path()) {
                if entry.kind == kind {
                    entries.push(entry);
                }
            }
        }
        entries.sort_by_key(|e| (e.epoch, e.step));
        Ok(entries)
    }

    fn read(entry: &Entry) -> Result<CheckpointRecord> {
        let content = fs::read_to_string(&entry.path).map_err(|e| TrainError::io(&entry.path, e))?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Writes `bytes` to `path` through a synced temp file and a rename.
    fn write_durable(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        let tmp = path.with_extension("json.tmp");
        {
            let mut file = File::create(&tmp).map_err(|e| TrainError::io(&tmp, e))?;
            file.write_all(bytes).map_err(|e| TrainError::io(&tmp, e))?;
            file.sync_all().map_err(|e| TrainError::io(&tmp, e))?;
        }
        fs::rename(&tmp, path).map_err(|e| TrainError::io(path, e))?;
        sync_dir(&self.dir)
    }

    fn remove(entry: &Entry) -> Result<()> {
        debug!(path = %entry.path.display(), "removing superseded checkpoint");
        fs::remove_file(&entry.path).map_err(|e| TrainError::io(&entry.path, e))
    }

    /// `saved_path` is the file `saved` was just written to.
    fn prune(&self, saved: &CheckpointRecord, saved_path: &Path) -> Result<()> {
        let intra = self.entries(CheckpointKind::IntraEpoch)?;
        match saved.kind {
            CheckpointKind::IntraEpoch => {
                // Only the record just written survives, even when an older
                // file from a replayed epoch carries a higher step.
                for entry in intra.iter().filter(|e| e.path.as_path() != saved_path) {
                    Self::remove(entry)?;
                }
            }
            CheckpointKind::EpochEnd => {
                for entry in intra.iter().filter(|e| e.epoch <= saved.epoch) {
                    Self::remove(entry)?;
                }
                let epoch_end = self.entries(CheckpointKind::EpochEnd)?;
                let excess = epoch_end.len().saturating_sub(self.keep_epoch_end);
                for entry in &epoch_end[..excess] {
                    Self::remove(entry)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> Result<()> {
    File::open(dir)
        .and_then(|d| d.sync_all())
        .map_err(|e| TrainError::io(dir, e))
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> Result<()> {
    Ok(())
}

impl CheckpointStore for DirectoryCheckpointStore {
    fn save(&mut self, record: CheckpointRecord) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|e| TrainError::io(&self.dir, e))?;

        let path = self.dir.join(Self::file_name(&record));
        let json = serde_json::to_vec_pretty(&record)?;
        self.write_durable(&path, &json)?;

        info!(
            kind = record.kind.as_str(),
            epoch = record.epoch,
            step = record.step,
            path = %path.display(),
            "checkpoint saved"
        );

        self.prune(&record, &path)
    }

    fn load_latest(&self) -> Result<Option<CheckpointRecord>> {
        match self.entries(CheckpointKind::EpochEnd)?.last() {
            Some(entry) => Self::read(entry).map(Some),
            None => Ok(None),
        }
    }

    fn load_latest_intra_epoch(&self) -> Result<Option<CheckpointRecord>> {
        match self.entries(CheckpointKind::IntraEpoch)?.last() {
            Some(entry) => Self::read(entry).map(Some),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::accumulator::MetricsSnapshot;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn fields(pairs: &[(&str, f64)]) -> MetricsSnapshot {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn json_files(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_round_trip() {
        let tmp = TempDir::new().unwrap();
        let mut store = DirectoryCheckpointStore::new(tmp.path().join("save"), 3);
        store
            .save(CheckpointRecord::epoch_end(fields(&[("a", 1.0)]), 3, 100))
            .unwrap();

        let latest = store.load_latest().unwrap().unwrap();
        assert_eq!(latest.epoch, 3);
        assert_eq!(latest.step, 100);
        assert_eq!(latest.fields, fields(&[("a", 1.0)]));
        assert_eq!(latest.kind, CheckpointKind::EpochEnd);
    }

    #[test]
    fn test_missing_dir_is_empty() {
        let tmp = TempDir::new().unwrap();
        let store = DirectoryCheckpointStore::new(tmp.path().join("nope"), 3);
        assert!(store.load_latest().unwrap().is_none());
    }

    #[test]
    fn test_state_survives_reload() {
        let tmp = TempDir::new().unwrap();
        let mut store = DirectoryCheckpointStore::new(tmp.path(), 3);
        let record = CheckpointRecord::epoch_end(fields(&[("val_loss", 0.5)]), 1, 8)
            .with_state(serde_json::json!({"weights": [1.0, 2.0]}));
        store.save(record.clone()).unwrap();

        let reopened = DirectoryCheckpointStore::new(tmp.path(), 3);
        assert_eq!(reopened.load_latest().unwrap().unwrap(), record);
    }

    #[test]
    fn test_pruning_policy() {
        let tmp = TempDir::new().unwrap();
        let mut store = DirectoryCheckpointStore::new(tmp.path(), 2);

        store.save(CheckpointRecord::intra_epoch(1, 3)).unwrap();
        store.save(CheckpointRecord::intra_epoch(1, 5)).unwrap();
        assert_eq!(json_files(tmp.path()), vec!["intra_epoch-E00001-S0000000005.json"]);

        store.save(CheckpointRecord::epoch_end(fields(&[]), 1, 8)).unwrap();
        store.save(CheckpointRecord::epoch_end(fields(&[]), 2, 16)).unwrap();
        store.save(CheckpointRecord::intra_epoch(3, 20)).unwrap();
        store.save(CheckpointRecord::epoch_end(fields(&[]), 3, 24)).unwrap();

        assert_eq!(
            json_files(tmp.path()),
            vec![
                "epoch_end-E00002-S0000000016.json",
                "epoch_end-E00003-S0000000024.json",
            ]
        );
        assert_eq!(store.load_latest().unwrap().unwrap().epoch, 3);
        assert!(store.load_latest_intra_epoch().unwrap().is_none());
    }

    #[test]
    fn test_replayed_epoch_intra_save_replaces_higher_step() {
        let tmp = TempDir::new().unwrap();
        let mut store = DirectoryCheckpointStore::new(tmp.path(), 2);
        store.save(CheckpointRecord::epoch_end(fields(&[]), 1, 8)).unwrap();
        store.save(CheckpointRecord::intra_epoch(2, 12)).unwrap();
        // Epoch 2 was rolled back to step 8 and is being replayed.
        store.save(CheckpointRecord::intra_epoch(2, 10)).unwrap();

        let latest = store.load_latest_intra_epoch().unwrap().unwrap();
        assert_eq!(latest.position(), (2, 10));
        assert_eq!(
            json_files(tmp.path()),
            vec![
                "epoch_end-E00001-S0000000008.json",
                "intra_epoch-E00002-S0000000010.json",
            ]
        );
    }

    #[test]
    fn test_foreign_files_are_ignored() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("notes.json"), "{}").unwrap();
        fs::write(tmp.path().join("epoch_end-bogus.json"), "{}").unwrap();
        let store = DirectoryCheckpointStore::new(tmp.path(), 2);
        assert!(store.load_latest().unwrap().is_none());
    }

    #[test]
    fn test_unwritable_target_reports_path() {
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("file");
        fs::write(&blocker, "x").unwrap();
        let mut store = DirectoryCheckpointStore::new(blocker.join("save"), 2);
        let err = store.save(CheckpointRecord::intra_epoch(1, 1)).unwrap_err();
        match err {
            TrainError::Io { path, .. } => assert!(path.starts_with(&blocker)),
            other => panic!("unexpected error: {other}"),
        }
    }
}
