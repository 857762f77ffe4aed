//! Read-only views derived from engine state for rendering the stage graph.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use cf_core::{EdgeId, MachineStatus, StageGraph, StageId};

pub type StageStatuses = BTreeMap<StageId, MachineStatus>;

/// Batch-agnostic status per stage: a stage shows the dominant status over all live batches.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct MachineView {
    statuses: StageStatuses,
}

impl MachineView {
    pub fn derive<'a, I>(batches: I) -> Self
    where
        I: IntoIterator<Item = &'a StageStatuses>,
    {
        let mut statuses = StageStatuses::new();
        for batch in batches {
            for (stage, status) in batch {
                statuses
                    .entry(*stage)
                    .and_modify(|current| *current = current.dominant(*status))
                    .or_insert(*status);
            }
        }
        Self { statuses }
    }

    pub fn status(&self, stage: StageId) -> Option<MachineStatus> {
        self.statuses.get(&stage).copied()
    }

    pub fn is_running(&self, stage: StageId) -> bool {
        self.status(stage) == Some(MachineStatus::Running)
    }

    pub fn running(&self) -> impl Iterator<Item = StageId> + '_ {
        self.statuses
            .iter()
            .filter(|(_, status)| **status == MachineStatus::Running)
            .map(|(stage, _)| *stage)
    }

    pub fn iter(&self) -> impl Iterator<Item = (StageId, MachineStatus)> + '_ {
        self.statuses.iter().map(|(stage, status)| (*stage, *status))
    }

    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }

    pub fn as_map(&self) -> &StageStatuses {
        &self.statuses
    }
}

impl FromIterator<(StageId, MachineStatus)> for MachineView {
    fn from_iter<T: IntoIterator<Item = (StageId, MachineStatus)>>(iter: T) -> Self {
        Self {
            statuses: iter.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EdgeStatus {
    /// Material is currently animated along the edge.
    Active,
    /// Both ends finished; the path has been travelled.
    Traversed,
    Idle,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EdgeState {
    pub edge: String,
    pub from: StageId,
    pub to: StageId,
    pub status: EdgeStatus,
}

/// Render status of every edge in the graph, in diagram order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EdgeView {
    pub edges: Vec<EdgeState>,
}

impl EdgeView {
    pub fn build(graph: &StageGraph, machines: &MachineView, active: &BTreeSet<EdgeId>) -> Self {
        let edges = graph
            .edges()
            .into_iter()
            .map(|edge| {
                let status = if active.contains(&edge) {
                    EdgeStatus::Active
                } else if machines.status(edge.from) == Some(MachineStatus::Completed)
                    && machines.status(edge.to) == Some(MachineStatus::Completed)
                {
                    EdgeStatus::Traversed
                } else {
                    EdgeStatus::Idle
                };
                EdgeState {
                    edge: edge.to_string(),
                    from: edge.from,
                    to: edge.to,
                    status,
                }
            })
            .collect();
        Self { edges }
    }

    pub fn status_of(&self, edge: EdgeId) -> Option<EdgeStatus> {
        self.edges
            .iter()
            .find(|state| state.from == edge.from && state.to == edge.to)
            .map(|state| state.status)
    }

    pub fn active(&self) -> impl Iterator<Item = &EdgeState> {
        self.edges.iter().filter(|state| state.status == EdgeStatus::Active)
    }
}
