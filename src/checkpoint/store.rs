use crate::checkpoint::record::CheckpointRecord;
use crate::error::Result;

/// Durable, append-only log of checkpoint records.
///
/// Retention is bounded: only the newest intra-epoch record and a few
/// epoch-end records are kept. `save` must not return before the record is
/// durable, and the controller never issues two saves at once.
pub trait CheckpointStore: Send {
    /// Appends `record`. An epoch-end save also drops intra-epoch records of
    /// the same or earlier epochs, which it supersedes.
    fn save(&mut self, record: CheckpointRecord) -> Result<()>;

    /// Most recent epoch-end record by `(epoch, step)`, if any.
    fn load_latest(&self) -> Result<Option<CheckpointRecord>>;

    /// Most recent intra-epoch record still retained, if any.
    fn load_latest_intra_epoch(&self) -> Result<Option<CheckpointRecord>>;
}
