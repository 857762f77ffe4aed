//! Event interpretation: one raw feed message in, one typed `Event` out.

use tracing::{debug, trace};

use cf_core::{Event, EventKind, StageId};

pub mod message;
pub mod process;

pub use message::FeedMessage;

use process::StatusClass;

/// Turns raw feed text into events. Implementations must not fail; a message that cannot be
/// classified yields `EventKind::Unrecognized`.
pub trait Interpreter {
    fn interpret(&self, raw: &str) -> Event;
}

impl<F> Interpreter for F
where
    F: Fn(&str) -> Event,
{
    fn interpret(&self, raw: &str) -> Event {
        self(raw)
    }
}

pub type Classification = (EventKind, Option<StageId>);
pub type Rule = fn(&FeedMessage) -> Option<Classification>;

const PER_LINE_COMPLETIONS: &[&str] = &[
    "batch_completed_anode_line",
    "batch_completed_cathode_line",
    "batch_completed_cell_line",
];

const PLANT_FINISHED_PHRASES: &[&str] = &["aging_completed", "battery manufacturing finished"];

/// Ordered rule table; the first rule that matches classifies the message.
pub struct FeedInterpreter {
    rules: Vec<(&'static str, Rule)>,
}

impl Default for FeedInterpreter {
    fn default() -> Self {
        Self::standard()
    }
}

impl FeedInterpreter {
    pub fn standard() -> Self {
        Self {
            rules: vec![
                ("machine_turned_off", turned_off as Rule),
                ("batch_requested", batch_requested as Rule),
                ("batch_completed", batch_completed as Rule),
                ("aging_completed", aging_completed as Rule),
                ("status_line", status_line as Rule),
            ],
        }
    }

    pub fn rule_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.rules.iter().map(|(name, _)| *name)
    }

    /// Classifies a normalized message, returning the name of the rule that matched.
    pub fn classify(&self, message: &FeedMessage) -> Option<(&'static str, Classification)> {
        self.rules
            .iter()
            .find_map(|(name, rule)| rule(message).map(|class| (*name, class)))
    }
}

impl Interpreter for FeedInterpreter {
    fn interpret(&self, raw: &str) -> Event {
        let message = FeedMessage::normalize(raw);
        match self.classify(&message) {
            Some((rule, (kind, machine))) => {
                trace!(
                    rule,
                    ?kind,
                    ?machine,
                    batch = ?message.batch_id,
                    sent_at = ?message.timestamp,
                    "classified feed message"
                );
                Event::new(kind, machine, message.batch_id)
            }
            None => {
                debug!(text = %message.text, "dropping unrecognized feed message");
                Event::unrecognized()
            }
        }
    }
}

fn turned_off(message: &FeedMessage) -> Option<Classification> {
    if !message.contains("machine_turned_off") {
        return None;
    }
    let stage = process::find_in(&message.lowered)?;
    Some((EventKind::TurnedOff, Some(stage)))
}

fn batch_requested(message: &FeedMessage) -> Option<Classification> {
    (message.contains("batch_requested") || message.contains("batch_started_processing"))
        .then_some((EventKind::BatchRequested, None))
}

fn batch_completed(message: &FeedMessage) -> Option<Classification> {
    let whole_batch = message.contains("batch_completed")
        && !PER_LINE_COMPLETIONS.iter().any(|variant| message.contains(variant));
    whole_batch.then_some((EventKind::BatchCompleted, None))
}

fn aging_completed(message: &FeedMessage) -> Option<Classification> {
    PLANT_FINISHED_PHRASES
        .iter()
        .any(|phrase| message.contains(phrase))
        .then_some((EventKind::AgingCompleted, None))
}

fn status_line(message: &FeedMessage) -> Option<Classification> {
    let line = message.status_line()?;
    let stage = process::resolve(line.process)?;
    let kind = match process::classify_status(line.status)? {
        StatusClass::Completion => EventKind::Idle,
        StatusClass::Running => EventKind::Started,
    };
    Some((kind, Some(stage)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interpret(raw: &str) -> Event {
        FeedInterpreter::standard().interpret(raw)
    }

    #[test]
    fn turned_off_with_batch() {
        let event = interpret("(Batch 7) mixing_anode: machine_turned_off");
        assert_eq!(event.kind, EventKind::TurnedOff);
        assert_eq!(event.machine, Some(StageId::AnodeMixing));
        assert_eq!(event.batch_id.as_deref(), Some("7"));
    }

    #[test]
    fn turned_off_without_known_process_falls_through() {
        let event = interpret("(Batch 7) polishing: machine_turned_off");
        assert_eq!(event, Event::unrecognized());
    }

    #[test]
    fn batch_requested_and_started_processing() {
        let requested = interpret("(Batch 3) batch_requested");
        assert_eq!(requested.kind, EventKind::BatchRequested);
        assert_eq!(requested.batch_id.as_deref(), Some("3"));
        assert_eq!(requested.machine, None);

        let started = interpret("plant_simulation: batch_started_processing (Batch 4)");
        assert_eq!(started.kind, EventKind::BatchRequested);
        assert_eq!(started.batch_id.as_deref(), Some("4"));
    }

    #[test]
    fn per_line_completion_is_not_batch_completion() {
        for raw in [
            "(Batch 3) batch_completed_anode_line",
            "(Batch 3) batch_completed_cathode_line",
            "(Batch 3) batch_completed_cell_line",
        ] {
            assert_ne!(interpret(raw).kind, EventKind::BatchCompleted, "{raw}");
        }
        assert_eq!(interpret("(Batch 3) batch_completed").kind, EventKind::BatchCompleted);
    }

    #[test]
    fn plant_finished_phrases() {
        assert_eq!(interpret("aging_completed").kind, EventKind::AgingCompleted);
        assert_eq!(
            interpret("Battery manufacturing finished!").kind,
            EventKind::AgingCompleted
        );
    }

    #[test]
    fn turned_off_outranks_other_substrings() {
        let event = interpret("(Batch 1) aging_cell: machine_turned_off after batch_requested");
        assert_eq!(event.kind, EventKind::TurnedOff);
        assert_eq!(event.machine, Some(StageId::Aging));
    }

    #[test]
    fn legacy_status_lines() {
        let idle = interpret("[10:00:00] (Batch 2) coating_anode: idle - machine turned off");
        assert_eq!(idle.kind, EventKind::Idle);
        assert_eq!(idle.machine, Some(StageId::AnodeCoating));
        assert_eq!(idle.batch_id.as_deref(), Some("2"));

        let running = interpret("Cathode Drying: running - warming");
        assert_eq!(running.kind, EventKind::Started);
        assert_eq!(running.machine, Some(StageId::CathodeDrying));
        assert_eq!(running.batch_id, None);

        assert_eq!(interpret("coating_anode: data_generated - 42").kind, EventKind::Unrecognized);
    }

    #[test]
    fn json_envelopes() {
        let off = interpret(
            r#"{"process_name":"inspection_cathode","status":"idle","data":{"batch_id":5}}"#,
        );
        assert_eq!(off.kind, EventKind::Idle);
        assert_eq!(off.machine, Some(StageId::CathodeInspection));
        assert_eq!(off.batch_id.as_deref(), Some("5"));

        let done = interpret(
            r#"{"process_name":"plant_simulation","status":"batch_completed","data":{"batch_id":5}}"#,
        );
        assert_eq!(done.kind, EventKind::BatchCompleted);
        assert_eq!(done.batch_id.as_deref(), Some("5"));
    }

    #[test]
    fn garbage_is_unrecognized_without_fields() {
        for raw in ["", "   ", "\u{1f4a5}", "{\"status\": 3}", "(Batch 9) lorem ipsum"] {
            assert_eq!(interpret(raw), Event::unrecognized(), "{raw:?}");
        }
    }

    #[test]
    fn closures_are_interpreters() {
        let fixed = |_: &str| Event::new(EventKind::BatchRequested, None, Some("1".into()));
        assert_eq!(fixed.interpret("anything").kind, EventKind::BatchRequested);
    }

    #[test]
    fn rule_order_is_stable() {
        let names: Vec<_> = FeedInterpreter::standard().rule_names().collect();
        assert_eq!(
            names,
            ["machine_turned_off", "batch_requested", "batch_completed", "aging_completed", "status_line"]
        );
    }
}
