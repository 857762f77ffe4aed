//! End-to-end feed scenarios: raw text through the interpreter and the batch engine.

use std::sync::mpsc;
use std::thread;

use cf_core::{MachineStatus, StageId};
use cf_engine::{EngineConfig, IgnoreReason};
use cf_runtime::{Envelope, Pipeline};
use cf_views::MachineView;

fn replay(feed: &[&str]) -> Pipeline {
    let mut pipeline = Pipeline::default();
    for (i, raw) in feed.iter().enumerate() {
        pipeline.ingest(raw, i as u64 * 10);
    }
    pipeline
}

fn running_view(stages: &[StageId]) -> MachineView {
    stages.iter().map(|s| (*s, MachineStatus::Running)).collect()
}

#[test]
fn mixing_handoff_in_either_order() {
    let orders = [
        ["(Batch 7) mixing_anode: machine_turned_off", "(Batch 7) mixing_cathode: machine_turned_off"],
        ["(Batch 7) mixing_cathode: machine_turned_off", "(Batch 7) mixing_anode: machine_turned_off"],
    ];
    for order in orders {
        let mut pipeline = replay(&["(Batch 7) batch_requested"]);
        for raw in order {
            pipeline.ingest(raw, 100);
        }
        let batch = pipeline.engine().batch("7").expect("batch 7");
        assert_eq!(batch.status(StageId::AnodeCoating), Some(MachineStatus::Running));
        assert_eq!(batch.status(StageId::CathodeCoating), Some(MachineStatus::Running));
    }
}

#[test]
fn batch_seven_scenario_view() {
    let mut pipeline = replay(&[
        "(Batch 7) batch_requested",
        "(Batch 7) mixing_anode: machine_turned_off",
        "(Batch 7) mixing_cathode: machine_turned_off",
    ]);
    pipeline.advance_to(60_000);
    assert_eq!(
        pipeline.engine().view(),
        &running_view(&[StageId::AnodeCoating, StageId::CathodeCoating])
    );
    assert!(pipeline.engine().batch("7").is_some());
    assert!(pipeline.engine().active_flows().is_empty());
}

#[test]
fn repeated_turned_off_is_idempotent() {
    let feed = [
        "(Batch 1) batch_requested",
        "(Batch 1) coating_anode: machine_turned_off",
    ];
    let mut once = replay(&feed);
    let mut twice = replay(&feed);
    twice.ingest("(Batch 1) coating_anode: machine_turned_off", 10);

    assert_eq!(once.engine().batch("1"), twice.engine().batch("1"));
    once.advance_to(60_000);
    twice.advance_to(60_000);
    assert_eq!(once.engine().view(), twice.engine().view());
}

#[test]
fn rewinding_needs_both_inspections() {
    let mut pipeline = replay(&[
        "(Batch 2) batch_requested",
        "(Batch 2) inspection_anode: machine_turned_off",
    ]);
    let batch = pipeline.engine().batch("2").unwrap();
    assert_eq!(batch.status(StageId::Rewinding), None);
    assert!(!pipeline.engine().view().is_running(StageId::Rewinding));

    pipeline.ingest("(Batch 2) inspection_cathode: machine_turned_off", 50);
    let batch = pipeline.engine().batch("2").unwrap();
    assert_eq!(batch.status(StageId::Rewinding), Some(MachineStatus::Running));
}

#[test]
fn requested_then_completed_then_requested_again() {
    let mut pipeline = replay(&["(Batch 3) batch_requested", "(Batch 3) batch_completed"]);
    assert!(pipeline.engine().batch("3").is_none());
    assert!(pipeline.engine().view().is_empty());

    pipeline.ingest("(Batch 3) batch_requested", 100);
    let batch = pipeline.engine().batch("3").expect("recreated");
    assert_eq!(batch.status(StageId::AnodeMixing), Some(MachineStatus::Running));
    assert_eq!(batch.status(StageId::CathodeMixing), Some(MachineStatus::Running));
}

#[test]
fn rerequest_while_anode_line_is_past_coating() {
    let mut pipeline = replay(&[
        "(Batch 1) batch_requested",
        "(Batch 1) mixing_anode: machine_turned_off",
        "(Batch 1) coating_anode: machine_turned_off",
        "(Batch 1) batch_requested",
    ]);
    let (_, outcome) = pipeline.ingest("(Batch 1) mixing_anode: machine_turned_off", 40);
    assert_eq!(outcome.ignored, None);

    let batch = pipeline.engine().batch("1").unwrap();
    assert_eq!(batch.status(StageId::AnodeMixing), Some(MachineStatus::Idle));
    assert_eq!(batch.status(StageId::AnodeCoating), Some(MachineStatus::Running));
    assert_eq!(batch.status(StageId::CathodeMixing), Some(MachineStatus::Running));
}

#[test]
fn per_line_completion_keeps_batch() {
    let mut pipeline = replay(&[
        "(Batch 4) batch_requested",
        "(Batch 4) batch_completed_anode_line",
        "(Batch 4) batch_completed_cathode_line",
        "(Batch 4) batch_completed_cell_line",
    ]);
    assert!(pipeline.engine().batch("4").is_some());
    pipeline.ingest("(Batch 4) batch_completed", 100);
    assert!(pipeline.engine().batch("4").is_none());
}

#[test]
fn garbage_among_valid_messages_is_ignored() {
    let clean = replay(&[
        "(Batch 5) batch_requested",
        "(Batch 5) mixing_anode: machine_turned_off",
    ]);
    let noisy = replay(&[
        "(Batch 5) batch_requested",
        "\u{0}\u{7f}}{ not a status ::: -",
        "(Batch 5) mixing_anode: machine_turned_off",
    ]);
    assert_eq!(clean.engine().batch("5"), noisy.engine().batch("5"));
    assert_eq!(clean.engine().view(), noisy.engine().view());

    let snap = noisy.metrics().snapshot();
    assert_eq!(snap.messages, 3);
    assert_eq!(snap.unrecognized, 1);
    assert_eq!(snap.ignored, 1);
}

#[test]
fn unknown_batch_is_not_created_implicitly() {
    let mut pipeline = Pipeline::default();
    let (_, outcome) = pipeline.ingest("(Batch 8) drying_cathode: machine_turned_off", 0);
    assert_eq!(outcome.ignored, Some(IgnoreReason::UnknownBatch));
    assert_eq!(pipeline.engine().batch_count(), 0);
}

#[test]
fn full_batch_through_json_envelopes() {
    let envelope = |process: &str, status: &str| {
        format!(
            r#"{{"process_name":"{process}","status":"{status}","timestamp":"2025-06-01T10:00:00","data":{{"batch_id":11}}}}"#
        )
    };
    let mut pipeline = Pipeline::default();
    let mut t = 0;
    let mut push = |pipeline: &mut Pipeline, raw: String| {
        t += 10;
        pipeline.ingest(&raw, t);
    };

    push(&mut pipeline, envelope("plant_simulation", "batch_requested"));
    for stage in ["mixing", "coating", "drying", "calendaring", "slitting", "inspection"] {
        push(&mut pipeline, envelope(&format!("{stage}_anode"), "idle"));
        push(&mut pipeline, envelope(&format!("{stage}_cathode"), "idle"));
    }
    assert!(pipeline.engine().view().is_running(StageId::Rewinding));

    for stage in ["rewinding_cell", "electrolyte_filling_cell", "formation_cycling_cell"] {
        push(&mut pipeline, envelope(stage, "idle"));
    }
    assert!(pipeline.engine().view().is_running(StageId::Aging));

    push(&mut pipeline, envelope("aging_cell", "idle"));
    assert!(pipeline.engine().batch("11").is_some());

    push(&mut pipeline, envelope("plant_simulation", "batch_completed"));
    assert!(pipeline.engine().batch("11").is_none());

    let snap = pipeline.metrics().snapshot();
    assert_eq!(snap.batches_created, 1);
    assert_eq!(snap.batches_completed, 1);
    assert_eq!(snap.unrecognized, 0);
    assert_eq!(snap.flows_started, 10 + 1 + 3);
}

#[test]
fn overlapping_batches_share_the_view() {
    let mut pipeline = replay(&[
        "(Batch 1) batch_requested",
        "(Batch 1) mixing_anode: machine_turned_off",
        "(Batch 2) batch_requested",
    ]);
    pipeline.advance_to(60_000);
    let view = pipeline.engine().view();
    assert!(view.is_running(StageId::AnodeMixing));
    assert!(view.is_running(StageId::AnodeCoating));
    assert!(view.is_running(StageId::CathodeMixing));
    assert_eq!(pipeline.engine().batch_count(), 2);
}

#[test]
fn aging_completed_is_cosmetic() {
    let mut pipeline = replay(&["(Batch 6) batch_requested", "Battery manufacturing finished!"]);
    assert!(pipeline
        .engine()
        .view()
        .iter()
        .all(|(_, status)| status == MachineStatus::Completed));
    assert!(pipeline.engine().batch("6").is_some());

    let cfg = EngineConfig {
        aging_marks_completed: false,
        ..EngineConfig::default()
    };
    let mut quiet = Pipeline::new(cfg);
    quiet.ingest("(Batch 6) batch_requested", 0);
    quiet.ingest("(Batch 6) aging_completed", 1);
    assert!(quiet.engine().view().is_running(StageId::AnodeMixing));
    pipeline.reset();
    assert_eq!(pipeline.engine().batch_count(), 0);
}

#[test]
fn channel_fed_pipeline() {
    let (tx, rx) = mpsc::channel();
    let producer = thread::spawn(move || {
        for (i, raw) in [
            "(Batch 9) batch_requested",
            "(Batch 9) mixing_anode: machine_turned_off",
            "(Batch 9) mixing_cathode: machine_turned_off",
        ]
        .into_iter()
        .enumerate()
        {
            tx.send(Envelope::new(raw, i as u64)).unwrap();
        }
    });

    let mut pipeline = Pipeline::default();
    let applied = pipeline.run(rx);
    producer.join().unwrap();

    assert_eq!(applied, 3);
    let batch = pipeline.engine().batch("9").unwrap();
    assert_eq!(batch.status(StageId::AnodeCoating), Some(MachineStatus::Running));
    assert_eq!(batch.status(StageId::CathodeCoating), Some(MachineStatus::Running));
}
