use serde::{Deserialize, Serialize};

use cf_core::{BatchId, EdgeId, Line, MachineStatus, StageGraph, StageId, TsMs};
use cf_views::StageStatuses;

use crate::IgnoreReason;

/// One batch and the status of every stage it has reached.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Batch {
    id: BatchId,
    stages: StageStatuses,
    /// Both electrode lines have converged into the shared line.
    merged: bool,
    created_at_ms: TsMs,
}

impl Batch {
    pub fn new(id: BatchId, created_at_ms: TsMs) -> Self {
        Self {
            id,
            stages: StageStatuses::new(),
            merged: false,
            created_at_ms,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn stages(&self) -> &StageStatuses {
        &self.stages
    }

    pub fn status(&self, stage: StageId) -> Option<MachineStatus> {
        self.stages.get(&stage).copied()
    }

    pub fn is_merged(&self) -> bool {
        self.merged
    }

    pub fn created_at_ms(&self) -> TsMs {
        self.created_at_ms
    }

    /// (Re)starts both mixing stages for a new unit entering the plant.
    pub(crate) fn request(&mut self, graph: &StageGraph) {
        for line in [Line::Anode, Line::Cathode] {
            if let Some(entry) = graph.entry(line) {
                self.stages.insert(entry, MachineStatus::Running);
            }
        }
        self.merged = false;
    }

    /// Stage finished its unit. Returns the edge material now travels along, if any.
    pub(crate) fn finish(
        &mut self,
        stage: StageId,
        graph: &StageGraph,
    ) -> Result<Option<EdgeId>, IgnoreReason> {
        self.check_fresh(stage, graph)?;
        self.stages.insert(stage, MachineStatus::Idle);

        if graph.is_merge_source(stage) {
            let ready = graph
                .merge_sources()
                .iter()
                .all(|source| self.status(*source) == Some(MachineStatus::Idle));
            if !ready {
                return Ok(None);
            }
            let entry = graph.shared_entry();
            self.stages.retain(|s, _| !s.line().is_electrode());
            self.stages.insert(entry, MachineStatus::Running);
            self.merged = true;
            return Ok(Some(EdgeId::new(stage, entry)));
        }

        match graph.successor(stage) {
            Some(next) => {
                let line = stage.line();
                self.stages.retain(|s, _| s.line() != line || *s == stage);
                self.stages.insert(next, MachineStatus::Running);
                Ok(Some(EdgeId::new(stage, next)))
            }
            None => Ok(None),
        }
    }

    /// Stage reported it is running.
    pub(crate) fn mark_running(
        &mut self,
        stage: StageId,
        graph: &StageGraph,
    ) -> Result<(), IgnoreReason> {
        self.check_fresh(stage, graph)?;
        self.stages.insert(stage, MachineStatus::Running);
        Ok(())
    }

    pub(crate) fn complete_all(&mut self, graph: &StageGraph) {
        for stage in graph.stages() {
            self.stages.insert(stage.id, MachineStatus::Completed);
        }
    }

    /// Clears an idle marker whose display time ran out. An inspection waiting for the
    /// other electrode line keeps its marker, since the merge reads it.
    pub(crate) fn revert_idle(&mut self, stage: StageId, graph: &StageGraph) -> bool {
        if self.status(stage) != Some(MachineStatus::Idle) {
            return false;
        }
        if graph.is_merge_source(stage) && !self.merged {
            return false;
        }
        self.stages.remove(&stage);
        true
    }

    /// Rejects reports for a stage its line has already moved beyond. A stage that is
    /// currently running holds a fresh unit, even when an earlier unit is further down.
    fn check_fresh(&self, stage: StageId, graph: &StageGraph) -> Result<(), IgnoreReason> {
        if self.status(stage) == Some(MachineStatus::Running) {
            return Ok(());
        }
        let line = stage.line();
        if line.is_electrode() && self.merged {
            return Err(IgnoreReason::StaleDuplicate);
        }
        let Some(ordinal) = graph.ordinal(stage) else {
            return Ok(());
        };
        let beyond = self.stages.keys().any(|s| {
            s.line() == line && graph.ordinal(*s).is_some_and(|o| o > ordinal + 1)
        });
        if beyond {
            Err(IgnoreReason::StaleDuplicate)
        } else {
            Ok(())
        }
    }
}
