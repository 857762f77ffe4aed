use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;

use cf_engine::ApplyOutcome;

#[derive(Clone, Default)]
pub struct MetricsRegistry {
    inner: Arc<MetricsInner>,
}

#[derive(Default)]
struct MetricsInner {
    messages: AtomicU64,
    recognized: AtomicU64,
    unrecognized: AtomicU64,
    ignored: AtomicU64,
    batches_created: AtomicU64,
    batches_completed: AtomicU64,
    flows_started: AtomicU64,
    active_batches_peak: AtomicU64,
}

impl MetricsRegistry {
    pub fn inc_messages(&self, delta: u64) {
        self.inner.messages.fetch_add(delta, Ordering::Relaxed);
    }

    pub fn inc_recognized(&self, delta: u64) {
        self.inner.recognized.fetch_add(delta, Ordering::Relaxed);
    }

    pub fn inc_unrecognized(&self, delta: u64) {
        self.inner.unrecognized.fetch_add(delta, Ordering::Relaxed);
    }

    pub fn inc_ignored(&self, delta: u64) {
        self.inner.ignored.fetch_add(delta, Ordering::Relaxed);
    }

    pub fn inc_batches_created(&self, delta: u64) {
        self.inner.batches_created.fetch_add(delta, Ordering::Relaxed);
    }

    pub fn inc_batches_completed(&self, delta: u64) {
        self.inner.batches_completed.fetch_add(delta, Ordering::Relaxed);
    }

    pub fn inc_flows_started(&self, delta: u64) {
        self.inner.flows_started.fetch_add(delta, Ordering::Relaxed);
    }

    pub fn record_active_peak(&self, active: u64) {
        self.inner
            .active_batches_peak
            .fetch_max(active, Ordering::Relaxed);
    }

    /// Counts what one applied event did.
    pub fn record_outcome(&self, outcome: &ApplyOutcome) {
        if outcome.ignored.is_some() {
            self.inc_ignored(1);
        }
        if outcome.batch_created.is_some() {
            self.inc_batches_created(1);
        }
        if outcome.batch_removed.is_some() {
            self.inc_batches_completed(1);
        }
        if !outcome.flows_started.is_empty() {
            self.inc_flows_started(outcome.flows_started.len() as u64);
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            messages: self.inner.messages.load(Ordering::Relaxed),
            recognized: self.inner.recognized.load(Ordering::Relaxed),
            unrecognized: self.inner.unrecognized.load(Ordering::Relaxed),
            ignored: self.inner.ignored.load(Ordering::Relaxed),
            batches_created: self.inner.batches_created.load(Ordering::Relaxed),
            batches_completed: self.inner.batches_completed.load(Ordering::Relaxed),
            flows_started: self.inner.flows_started.load(Ordering::Relaxed),
            active_batches_peak: self.inner.active_batches_peak.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub messages: u64,
    pub recognized: u64,
    pub unrecognized: u64,
    pub ignored: u64,
    pub batches_created: u64,
    pub batches_completed: u64,
    pub flows_started: u64,
    pub active_batches_peak: u64,
}

impl MetricsSnapshot {
    pub fn to_json_line(&self, label: &str, elapsed: Option<Duration>) -> String {
        #[derive(Serialize)]
        struct Snapshot<'a> {
            label: &'a str,
            #[serde(flatten)]
            counters: &'a MetricsSnapshot,
            elapsed_ms: Option<u128>,
        }

        let payload = Snapshot {
            label,
            counters: self,
            elapsed_ms: elapsed.map(|d| d.as_millis()),
        };
        serde_json::to_string(&payload).unwrap_or_else(|_| String::from("{}"))
    }
}

pub struct StepTimer {
    start: Instant,
}

impl StepTimer {
    pub fn start() -> Self {
        Self { start: Instant::now() }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}
