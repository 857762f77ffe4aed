use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use cf_core::{Line, Stage, StageGraph};
use cf_replay::ViewFrame;
use cf_runtime::metrics::StepTimer;
use cf_runtime::{init_tracing, CellflowConfig, Pipeline};

/// Drive the pipeline with a synthetic feed of overlapping batches.
#[derive(Debug, Parser)]
#[command(name = "plant_demo")]
struct Args {
    /// Number of batches to push through the plant
    #[arg(long, default_value_t = 3)]
    batches: u64,
    /// Milliseconds between consecutive batch requests
    #[arg(long, default_value_t = 2_500)]
    stagger: u64,
    /// Base processing time of one stage in milliseconds
    #[arg(long, default_value_t = 1_000)]
    stage_ms: u64,
    #[arg(long)]
    config: Option<PathBuf>,
}

/// Backend process name for a stage, in the `<process>_<line>` form the simulation emits.
fn process_name(stage: &Stage) -> String {
    let base = stage
        .label
        .split_whitespace()
        .filter(|word| !matches!(*word, "Anode" | "Cathode"))
        .collect::<Vec<_>>()
        .join("_")
        .to_ascii_lowercase();
    match stage.line {
        Line::Anode => format!("{base}_anode"),
        Line::Cathode => format!("{base}_cathode"),
        Line::Shared => format!("{base}_cell"),
    }
}

/// Synthetic feed for one batch, mixing the three message shapes the backend produces.
fn batch_feed(graph: &StageGraph, batch: u64, start_ms: u64, stage_ms: u64) -> Vec<(u64, String)> {
    let mut feed = vec![(start_ms, format!("(Batch {batch}) batch_requested"))];
    let mut line_done = [start_ms, start_ms];

    for (slot, line) in [Line::Anode, Line::Cathode].into_iter().enumerate() {
        let mut t = start_ms;
        for stage in graph.line(line) {
            // The cathode line runs a little slower so the merge waits on it.
            t += stage_ms + (slot as u64) * stage_ms / 4;
            let raw = if stage.ordinal % 2 == 0 {
                format!("(Batch {batch}) {}: machine_turned_off", process_name(stage))
            } else {
                format!(
                    r#"{{"process_name":"{}","status":"idle","data":{{"batch_id":{batch},"message":"machine turned off"}}}}"#,
                    process_name(stage)
                )
            };
            feed.push((t, raw));
        }
        line_done[slot] = t;
        let side = line.as_str();
        feed.push((t, format!("(Batch {batch}) batch_completed_{side}_line")));
    }

    let mut t = line_done[0].max(line_done[1]);
    for stage in graph.line(Line::Shared) {
        t += stage_ms;
        feed.push((
            t,
            format!("[{t}] (Batch {batch}) {}: idle - machine turned off", process_name(stage)),
        ));
    }
    feed.push((t + 1, format!("(Batch {batch}) batch_completed_cell_line")));
    feed.push((t + 2, format!("(Batch {batch}) batch_completed")));
    feed
}

fn main() -> Result<()> {
    let args = Args::parse();
    let cfg = CellflowConfig::load(args.config.as_deref()).context("loading configuration")?;
    init_tracing(&cfg.logging.filter);
    info!(batches = args.batches, stagger = args.stagger, "plant_demo starting");

    let graph = StageGraph::standard();
    let mut feed: Vec<(u64, String)> = (0..args.batches)
        .flat_map(|b| batch_feed(&graph, b + 1, b * args.stagger, args.stage_ms))
        .collect();
    feed.sort_by_key(|(t, _)| *t);
    feed.push((u64::MAX, String::from("Battery manufacturing finished!")));

    let mut pipeline = Pipeline::new(cfg.engine);
    let end_ms = feed_end(&feed);
    let timer = StepTimer::start();
    for (step, (t, raw)) in feed.iter().enumerate() {
        let step_timer = StepTimer::start();
        let at_ms = (*t).min(end_ms);
        let (event, outcome) = pipeline.ingest(raw, at_ms);
        if outcome.view_dirty() {
            let frame = ViewFrame::capture(pipeline.engine(), at_ms, Some(event));
            info!(
                step,
                duration_us = step_timer.elapsed().as_micros() as u64,
                "{}",
                frame.to_text()
            );
        }
    }

    let final_snapshot = pipeline.metrics().snapshot();
    info!(?final_snapshot, "final metrics summary");
    println!("{}", final_snapshot.to_json_line("plant_demo", Some(timer.elapsed())));
    Ok(())
}

/// Latest real timestamp in the feed; the closing plant message is applied there.
fn feed_end(feed: &[(u64, String)]) -> u64 {
    feed.iter()
        .map(|(t, _)| *t)
        .filter(|t| *t != u64::MAX)
        .max()
        .unwrap_or(0)
}
