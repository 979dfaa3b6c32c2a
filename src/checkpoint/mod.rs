//! Durable save points for a training run.

pub mod directory;
pub mod memory;
pub mod record;
pub mod store;

pub use directory::DirectoryCheckpointStore;
pub use memory::MemoryCheckpointStore;
pub use record::{CheckpointKind, CheckpointRecord};
pub use store::CheckpointStore;
