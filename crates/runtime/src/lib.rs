//! Runtime wiring: tracing bootstrap, configuration, metrics and the feed pipeline.

use std::sync::mpsc::Receiver;

use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use cf_core::{Event, StageGraph, TsMs};
use cf_engine::{ApplyOutcome, BatchEngine, EngineConfig};
use cf_interpreter::{FeedInterpreter, Interpreter};

pub mod config;
pub mod metrics;

pub use config::{CellflowConfig, ConfigError};

use metrics::MetricsRegistry;

/// Installs the global fmt subscriber. `RUST_LOG` wins over `default_filter` when set.
pub fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// One raw feed message and the logical time it arrived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub raw: String,
    pub at_ms: TsMs,
}

impl Envelope {
    pub fn new(raw: impl Into<String>, at_ms: TsMs) -> Self {
        Self {
            raw: raw.into(),
            at_ms,
        }
    }
}

/// Raw message → interpreter → engine. Owns the engine exclusively; readers borrow views.
pub struct Pipeline<I = FeedInterpreter> {
    interpreter: I,
    engine: BatchEngine,
    metrics: MetricsRegistry,
}

impl Pipeline<FeedInterpreter> {
    pub fn new(cfg: EngineConfig) -> Self {
        Self::with_interpreter(FeedInterpreter::standard(), cfg)
    }
}

impl Default for Pipeline<FeedInterpreter> {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl<I: Interpreter> Pipeline<I> {
    pub fn with_interpreter(interpreter: I, cfg: EngineConfig) -> Self {
        Self {
            interpreter,
            engine: BatchEngine::new(cfg, StageGraph::standard()),
            metrics: MetricsRegistry::default(),
        }
    }

    pub fn ingest(&mut self, raw: &str, now_ms: TsMs) -> (Event, ApplyOutcome) {
        self.metrics.inc_messages(1);
        let event = self.interpreter.interpret(raw);
        if event.is_recognized() {
            self.metrics.inc_recognized(1);
        } else {
            self.metrics.inc_unrecognized(1);
        }
        let outcome = self.engine.apply(&event, now_ms);
        self.metrics.record_outcome(&outcome);
        self.metrics
            .record_active_peak(self.engine.batch_count() as u64);
        (event, outcome)
    }

    pub fn advance_to(&mut self, now_ms: TsMs) -> bool {
        self.engine.advance_to(now_ms)
    }

    pub fn reset(&mut self) {
        self.engine.reset();
    }

    /// Drains a channel of feed messages until every sender is dropped. Returns the number
    /// of messages applied.
    pub fn run(&mut self, feed: Receiver<Envelope>) -> u64 {
        info!("pipeline consuming feed");
        let mut applied = 0u64;
        for envelope in feed {
            let (event, outcome) = self.ingest(&envelope.raw, envelope.at_ms);
            debug!(kind = ?event.kind, changed = outcome.changed, at_ms = envelope.at_ms, "applied");
            applied += 1;
        }
        info!(applied, batches = self.engine.batch_count(), "feed closed");
        applied
    }

    pub fn engine(&self) -> &BatchEngine {
        &self.engine
    }

    pub fn metrics(&self) -> &MetricsRegistry {
        &self.metrics
    }
}
