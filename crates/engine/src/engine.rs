use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info, trace};

use cf_core::{BatchId, EdgeId, Event, EventKind, StageGraph, StageId, TsMs};
use cf_views::{EdgeView, MachineView};

use crate::markers::ExpiringSet;
use crate::{ApplyOutcome, Batch, EngineConfig, IgnoreReason};

/// Owns every live batch, the active flow markers and the derived view. Single mutator:
/// events are applied one at a time through `&mut self`.
pub struct BatchEngine {
    cfg: EngineConfig,
    graph: StageGraph,
    batches: BTreeMap<BatchId, Batch>,
    flows: ExpiringSet<EdgeId>,
    idle_markers: ExpiringSet<(BatchId, StageId)>,
    view: MachineView,
}

impl Default for BatchEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default(), StageGraph::standard())
    }
}

impl BatchEngine {
    pub fn new(cfg: EngineConfig, graph: StageGraph) -> Self {
        Self {
            cfg,
            graph,
            batches: BTreeMap::new(),
            flows: ExpiringSet::default(),
            idle_markers: ExpiringSet::default(),
            view: MachineView::default(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    pub fn graph(&self) -> &StageGraph {
        &self.graph
    }

    /// Applies one event at logical time `now_ms`, after expiring markers due by then.
    pub fn apply(&mut self, event: &Event, now_ms: TsMs) -> ApplyOutcome {
        let expired = self.expire(now_ms);
        let mut outcome = self.reduce(event, now_ms);
        outcome.expired = expired;
        if outcome.view_dirty() {
            self.refresh_view();
        }
        if let Some(reason) = outcome.ignored {
            debug!(
                ?reason,
                kind = ?event.kind,
                machine = ?event.machine,
                batch = ?event.batch_id,
                "event ignored"
            );
        }
        outcome
    }

    /// Moves logical time forward. Returns whether any marker expired.
    pub fn advance_to(&mut self, now_ms: TsMs) -> bool {
        let expired = self.expire(now_ms);
        if expired {
            self.refresh_view();
        }
        expired
    }

    /// Drops every batch and marker.
    pub fn reset(&mut self) {
        info!(batches = self.batches.len(), "resetting batch engine");
        self.batches.clear();
        self.flows.clear();
        self.idle_markers.clear();
        self.view = MachineView::default();
    }

    pub fn view(&self) -> &MachineView {
        &self.view
    }

    pub fn active_flows(&self) -> BTreeSet<EdgeId> {
        self.flows.keys()
    }

    pub fn flow_expires_at(&self, edge: EdgeId) -> Option<TsMs> {
        self.flows.expires_at(&edge)
    }

    pub fn edge_view(&self) -> EdgeView {
        EdgeView::build(&self.graph, &self.view, &self.flows.keys())
    }

    pub fn batch(&self, id: &str) -> Option<&Batch> {
        self.batches.get(id)
    }

    pub fn batch_ids(&self) -> impl Iterator<Item = &str> {
        self.batches.keys().map(String::as_str)
    }

    pub fn batch_count(&self) -> usize {
        self.batches.len()
    }

    /// Earliest pending marker expiry, for callers that schedule `advance_to`.
    pub fn next_deadline(&self) -> Option<TsMs> {
        match (self.flows.next_deadline(), self.idle_markers.next_deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    fn reduce(&mut self, event: &Event, now_ms: TsMs) -> ApplyOutcome {
        match event.kind {
            EventKind::Unrecognized => ApplyOutcome::ignored(IgnoreReason::Unrecognized),
            EventKind::BatchRequested => match &event.batch_id {
                Some(id) => self.request_batch(id, now_ms),
                None => ApplyOutcome::ignored(IgnoreReason::MissingBatch),
            },
            EventKind::BatchCompleted => match &event.batch_id {
                Some(id) => self.complete_batch(id, now_ms),
                None => ApplyOutcome::ignored(IgnoreReason::MissingBatch),
            },
            EventKind::AgingCompleted => self.aging_completed(event.batch_id.as_deref()),
            EventKind::TurnedOff | EventKind::Idle | EventKind::Started => {
                let Some(id) = event.batch_id.as_deref() else {
                    return ApplyOutcome::ignored(IgnoreReason::MissingBatch);
                };
                let Some(stage) = event.machine else {
                    return ApplyOutcome::ignored(IgnoreReason::MissingMachine);
                };
                if event.is_handoff() {
                    self.finish_stage(id, stage, now_ms)
                } else {
                    self.stage_running(id, stage)
                }
            }
        }
    }

    fn request_batch(&mut self, id: &str, now_ms: TsMs) -> ApplyOutcome {
        let mut outcome = ApplyOutcome::default();
        if !self.batches.contains_key(id) {
            info!(batch = id, "batch requested");
            outcome.batch_created = Some(id.to_string());
            outcome.changed = true;
        }
        let batch = self
            .batches
            .entry(id.to_string())
            .or_insert_with(|| Batch::new(id.to_string(), now_ms));
        let before = batch.stages().clone();
        batch.request(&self.graph);
        outcome.changed |= before != *batch.stages();
        outcome
    }

    fn complete_batch(&mut self, id: &str, now_ms: TsMs) -> ApplyOutcome {
        let Some(batch) = self.batches.remove(id) else {
            return ApplyOutcome::ignored(IgnoreReason::UnknownBatch);
        };
        info!(
            batch = id,
            age_ms = now_ms.saturating_sub(batch.created_at_ms()),
            "batch completed"
        );
        self.idle_markers.retain(|(batch, _)| batch != id);
        ApplyOutcome {
            changed: true,
            batch_removed: Some(id.to_string()),
            ..ApplyOutcome::default()
        }
    }

    fn aging_completed(&mut self, id: Option<&str>) -> ApplyOutcome {
        if !self.cfg.aging_marks_completed {
            return ApplyOutcome::ignored(IgnoreReason::Disabled);
        }
        let graph = &self.graph;
        let mut changed = false;
        match id {
            Some(id) => {
                let Some(batch) = self.batches.get_mut(id) else {
                    return ApplyOutcome::ignored(IgnoreReason::UnknownBatch);
                };
                let before = batch.stages().clone();
                batch.complete_all(graph);
                changed = before != *batch.stages();
            }
            None => {
                for batch in self.batches.values_mut() {
                    let before = batch.stages().clone();
                    batch.complete_all(graph);
                    changed |= before != *batch.stages();
                }
            }
        }
        ApplyOutcome {
            changed,
            ..ApplyOutcome::default()
        }
    }

    fn finish_stage(&mut self, id: &str, stage: StageId, now_ms: TsMs) -> ApplyOutcome {
        let Some(batch) = self.batches.get_mut(id) else {
            return ApplyOutcome::ignored(IgnoreReason::UnknownBatch);
        };
        let before = batch.stages().clone();
        let edge = match batch.finish(stage, &self.graph) {
            Ok(edge) => edge,
            Err(reason) => return ApplyOutcome::ignored(reason),
        };
        if before == *batch.stages() {
            // Duplicate delivery: nothing moved, so markers stay as they were.
            return ApplyOutcome::default();
        }

        let mut outcome = ApplyOutcome {
            changed: true,
            ..ApplyOutcome::default()
        };
        self.idle_markers
            .insert((id.to_string(), stage), now_ms.saturating_add(self.cfg.idle_revert_ms));
        if let Some(edge) = edge {
            debug!(batch = id, %edge, "material moving");
            self.flows.insert(edge, now_ms.saturating_add(self.cfg.flow_display_ms));
            outcome.flows_started.push(edge);
        }
        outcome
    }

    fn stage_running(&mut self, id: &str, stage: StageId) -> ApplyOutcome {
        let Some(batch) = self.batches.get_mut(id) else {
            return ApplyOutcome::ignored(IgnoreReason::UnknownBatch);
        };
        let before = batch.status(stage);
        match batch.mark_running(stage, &self.graph) {
            Ok(()) => ApplyOutcome {
                changed: before != batch.status(stage),
                ..ApplyOutcome::default()
            },
            Err(reason) => ApplyOutcome::ignored(reason),
        }
    }

    fn expire(&mut self, now_ms: TsMs) -> bool {
        let mut changed = false;
        for edge in self.flows.expire(now_ms) {
            trace!(%edge, "flow marker expired");
            changed = true;
        }
        for (id, stage) in self.idle_markers.expire(now_ms) {
            if let Some(batch) = self.batches.get_mut(&id) {
                if batch.revert_idle(stage, &self.graph) {
                    trace!(batch = %id, %stage, "idle marker reverted");
                    changed = true;
                }
            }
        }
        changed
    }

    fn refresh_view(&mut self) {
        self.view = MachineView::derive(self.batches.values().map(Batch::stages));
    }
}
