//! Batch progression: per-batch machine state driven by interpreted feed events.

use serde::{Deserialize, Serialize};

use cf_core::{BatchId, EdgeId};

pub mod batch;
pub mod engine;
pub mod markers;

pub use batch::Batch;
pub use engine::BatchEngine;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EngineConfig {
    /// How long a finished stage shows `idle` before reverting to ready.
    pub idle_revert_ms: u64,
    /// Lifetime of an active flow marker on an edge.
    pub flow_display_ms: u64,
    /// Whether `aging_completed` paints every stage as completed.
    pub aging_marks_completed: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            idle_revert_ms: 1_500,
            flow_display_ms: 2_000,
            aging_marks_completed: true,
        }
    }
}

/// Why an event left the engine untouched.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum IgnoreReason {
    Unrecognized,
    MissingBatch,
    MissingMachine,
    UnknownBatch,
    StaleDuplicate,
    Disabled,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyOutcome {
    /// The event modified batch or flow state.
    pub changed: bool,
    /// Markers expired while catching up to the event's timestamp.
    pub expired: bool,
    pub batch_created: Option<BatchId>,
    pub batch_removed: Option<BatchId>,
    pub flows_started: Vec<EdgeId>,
    pub ignored: Option<IgnoreReason>,
}

impl ApplyOutcome {
    pub fn ignored(reason: IgnoreReason) -> Self {
        Self {
            ignored: Some(reason),
            ..Self::default()
        }
    }

    pub fn view_dirty(&self) -> bool {
        self.changed || self.expired
    }
}
