use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::info;

use cf_replay::ViewFrame;
use cf_runtime::metrics::StepTimer;
use cf_runtime::{init_tracing, CellflowConfig, Pipeline};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

/// Replay a recorded status feed, one message per line, and print the derived view.
#[derive(Debug, Parser)]
#[command(name = "feed_replay")]
struct Args {
    /// Feed file; reads stdin when omitted
    #[arg(long)]
    input: Option<PathBuf>,
    /// Config file (defaults to ./cellflow.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Logical milliseconds between consecutive messages
    #[arg(long, default_value_t = 100)]
    step_ms: u64,
    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let cfg = CellflowConfig::load(args.config.as_deref()).context("loading configuration")?;
    init_tracing(&cfg.logging.filter);

    let reader: Box<dyn BufRead> = match &args.input {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("opening feed {}", path.display()))?,
        )),
        None => Box::new(BufReader::new(io::stdin())),
    };

    let timer = StepTimer::start();
    let settle_ms = cfg.engine.idle_revert_ms.max(cfg.engine.flow_display_ms);
    let mut pipeline = Pipeline::new(cfg.engine);
    let mut now_ms = 0u64;

    for line in reader.lines() {
        let line = line.context("reading feed")?;
        if line.trim().is_empty() {
            continue;
        }
        if pipeline.advance_to(now_ms) {
            emit(args.format, &ViewFrame::capture(pipeline.engine(), now_ms, None))?;
        }
        let (event, outcome) = pipeline.ingest(&line, now_ms);
        if outcome.view_dirty() {
            emit(args.format, &ViewFrame::capture(pipeline.engine(), now_ms, Some(event)))?;
        }
        now_ms += args.step_ms;
    }

    while let Some(deadline) = pipeline.engine().next_deadline() {
        if deadline > now_ms + settle_ms {
            break;
        }
        if pipeline.advance_to(deadline) {
            emit(args.format, &ViewFrame::capture(pipeline.engine(), deadline, None))?;
        }
    }

    let snapshot = pipeline.metrics().snapshot();
    info!(?snapshot, "replay finished");
    println!("{}", snapshot.to_json_line("feed_replay", Some(timer.elapsed())));
    Ok(())
}

fn emit(format: Format, frame: &ViewFrame) -> Result<()> {
    match format {
        Format::Text => println!("{}", frame.to_text()),
        Format::Json => println!("{}", serde_json::to_string(frame)?),
    }
    Ok(())
}
