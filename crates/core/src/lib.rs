//! Core types for Cellflow: stages, the stage graph, feed events and machine statuses.

use serde::{Deserialize, Serialize};

pub type BatchId = String;
pub type TsMs = u64;

/// Per-batch state of one stage. A stage missing from a batch map is "ready".
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MachineStatus {
    Running,
    Idle,
    Completed,
}

impl MachineStatus {
    /// Render dominance when several batches disagree: running beats idle beats completed.
    pub fn rank(self) -> u8 {
        match self {
            MachineStatus::Running => 2,
            MachineStatus::Idle => 1,
            MachineStatus::Completed => 0,
        }
    }

    pub fn dominant(self, other: MachineStatus) -> MachineStatus {
        if other.rank() > self.rank() {
            other
        } else {
            self
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum CoreError {
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("unknown stage `{0}`")]
    UnknownStage(String),
}

pub mod event;
pub mod graph;
pub mod stage;

pub use event::{Event, EventKind};
pub use graph::{EdgeId, StageGraph};
pub use stage::{Line, Stage, StageId};
