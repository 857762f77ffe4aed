//! Boundary normalization: JSON envelopes and bare status lines become one `FeedMessage`.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use cf_core::BatchId;

/// `(Batch 7)` anywhere in a message.
static BATCH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\(\s*batch\s+([^)\s]+)\s*\)").expect("batch regex must compile")
});

/// `[timestamp] process: status - message`, timestamp and message optional.
static LEGACY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
          ^\s*
          (?:\[(?P<timestamp>[^\]]*)\]\s*)?
          (?P<process>[^:\[\]]+?)\s*:\s*
          (?P<status>[A-Za-z_]+)\s*
          (?:-\s*.*)?
          $",
    )
    .expect("legacy status regex must compile")
});

#[derive(Debug, Deserialize)]
struct Envelope {
    process_name: Option<String>,
    machine_id: Option<String>,
    status: String,
    timestamp: Option<String>,
    data: Option<EnvelopeData>,
}

#[derive(Debug, Deserialize)]
struct EnvelopeData {
    batch_id: Option<serde_json::Value>,
    message: Option<String>,
}

/// Fields of a legacy status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine<'a> {
    pub process: &'a str,
    pub status: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedMessage {
    pub text: String,
    pub lowered: String,
    pub timestamp: Option<String>,
    pub batch_id: Option<BatchId>,
}

impl FeedMessage {
    pub fn normalize(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.starts_with('{') {
            if let Ok(envelope) = serde_json::from_str::<Envelope>(trimmed) {
                return Self::from_envelope(envelope);
            }
        }
        let timestamp = LEGACY_RE
            .captures(trimmed)
            .and_then(|caps| caps.name("timestamp"))
            .map(|m| m.as_str().to_string());
        Self::new(trimmed.to_string(), timestamp, batch_token(trimmed))
    }

    fn from_envelope(envelope: Envelope) -> Self {
        let process = envelope
            .process_name
            .or(envelope.machine_id)
            .unwrap_or_default();
        let (message, data_batch) = match envelope.data {
            Some(data) => (data.message, data.batch_id.as_ref().and_then(batch_value)),
            None => (None, None),
        };
        let text = match message {
            Some(message) => format!("{}: {} - {}", process, envelope.status, message),
            None => format!("{}: {}", process, envelope.status),
        };
        let batch_id = batch_token(&text).or(data_batch);
        Self::new(text, envelope.timestamp, batch_id)
    }

    fn new(text: String, timestamp: Option<String>, batch_id: Option<BatchId>) -> Self {
        let lowered = text.to_ascii_lowercase();
        Self {
            text,
            lowered,
            timestamp,
            batch_id,
        }
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lowered.contains(needle)
    }

    /// Parses the text as a legacy status line, ignoring any `(Batch N)` tokens.
    pub fn status_line(&self) -> Option<StatusLine<'_>> {
        let caps = LEGACY_RE.captures(&self.text)?;
        let process = caps.name("process")?.as_str();
        let process = strip_batch_token(process);
        if process.is_empty() {
            return None;
        }
        Some(StatusLine {
            process,
            status: caps.name("status")?.as_str(),
        })
    }
}

fn batch_token(text: &str) -> Option<BatchId> {
    BATCH_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

fn batch_value(value: &serde_json::Value) -> Option<BatchId> {
    match value {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Drops a leading `(Batch N)` from a captured process name.
fn strip_batch_token(process: &str) -> &str {
    match BATCH_RE.find(process) {
        Some(m) if m.start() == 0 || process[..m.start()].trim().is_empty() => {
            process[m.end()..].trim()
        }
        _ => process.trim(),
    }
}
