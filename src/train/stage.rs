use std::fmt;

use serde::{Deserialize, Serialize};

/// Phase of an epoch. Decides whether gradients update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Train,
    Valid,
    Test,
}

impl Stage {
    /// Only TRAIN applies optimizer steps and intra-epoch checkpoints.
    pub fn is_training(&self) -> bool {
        matches!(self, Stage::Train)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Train => "train",
            Stage::Valid => "valid",
            Stage::Test => "test",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
