use serde::{Deserialize, Serialize};

use crate::stage::StageId;
use crate::BatchId;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A machine reported it is running its unit.
    Started,
    /// A machine was turned off: processing finished, material released downstream.
    TurnedOff,
    /// A machine reported an idle or completion status through the legacy status line.
    Idle,
    BatchRequested,
    BatchCompleted,
    AgingCompleted,
    Unrecognized,
}

/// One parsed fact from the live feed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Event {
    pub batch_id: Option<BatchId>,
    pub machine: Option<StageId>,
    pub kind: EventKind,
}

impl Event {
    pub fn new(kind: EventKind, machine: Option<StageId>, batch_id: Option<BatchId>) -> Self {
        Self { batch_id, machine, kind }
    }

    pub fn unrecognized() -> Self {
        Self::new(EventKind::Unrecognized, None, None)
    }

    pub fn is_recognized(&self) -> bool {
        self.kind != EventKind::Unrecognized
    }

    /// Whether this event reports a stage handing its unit downstream.
    pub fn is_handoff(&self) -> bool {
        matches!(self.kind, EventKind::TurnedOff | EventKind::Idle)
    }
}
