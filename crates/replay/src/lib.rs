//! Shared output helpers for the replay binaries.

use serde::Serialize;

use cf_core::{Event, TsMs};
use cf_engine::BatchEngine;
use cf_views::MachineView;

/// Snapshot of the engine after a message, as printed by the binaries.
#[derive(Debug, Clone, Serialize)]
pub struct ViewFrame {
    pub at_ms: TsMs,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<Event>,
    pub batches: Vec<String>,
    pub view: MachineView,
    pub flows: Vec<String>,
}

impl ViewFrame {
    pub fn capture(engine: &BatchEngine, at_ms: TsMs, event: Option<Event>) -> Self {
        Self {
            at_ms,
            event,
            batches: engine.batch_ids().map(str::to_string).collect(),
            view: engine.view().clone(),
            flows: engine.active_flows().iter().map(|e| e.to_string()).collect(),
        }
    }

    pub fn to_text(&self) -> String {
        let stages = if self.view.is_empty() {
            String::from("-")
        } else {
            self.view
                .iter()
                .map(|(stage, status)| format!("{stage}={}", status_word(status)))
                .collect::<Vec<_>>()
                .join(", ")
        };
        let mut line = format!(
            "t={}ms batches=[{}] {}",
            self.at_ms,
            self.batches.join(","),
            stages
        );
        if !self.flows.is_empty() {
            line.push_str(" | flows: ");
            line.push_str(&self.flows.join(", "));
        }
        line
    }
}

fn status_word(status: cf_core::MachineStatus) -> &'static str {
    match status {
        cf_core::MachineStatus::Running => "running",
        cf_core::MachineStatus::Idle => "idle",
        cf_core::MachineStatus::Completed => "completed",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use cf_core::{EventKind, StageId};

    #[test]
    fn text_frame_lists_batches_stages_and_flows() {
        let mut engine = BatchEngine::default();
        let requested = Event::new(EventKind::BatchRequested, None, Some("7".into()));
        engine.apply(&requested, 0);
        let off = Event::new(EventKind::TurnedOff, Some(StageId::AnodeMixing), Some("7".into()));
        engine.apply(&off, 10);

        let frame = ViewFrame::capture(&engine, 10, Some(off));
        assert_eq!(
            frame.to_text(),
            "t=10ms batches=[7] Anode Mixing=idle, Anode Coating=running, Cathode Mixing=running \
             | flows: Anode Mixing->Anode Coating"
        );
    }

    #[test]
    fn empty_frame() {
        let frame = ViewFrame::capture(&BatchEngine::default(), 0, None);
        assert_eq!(frame.to_text(), "t=0ms batches=[] -");
        let json = serde_json::to_value(&frame).unwrap();
        assert!(json.get("event").is_none());
        assert_eq!(json["view"], serde_json::json!({}));
    }
}
