//! The fixed stage-progression graph: two electrode lines merging into the shared cell line.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::stage::{Line, Stage, StageId};

/// Directed edge between two stages. Text form is `"<from>-><to>"`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId {
    pub from: StageId,
    pub to: StageId,
}

impl EdgeId {
    pub fn new(from: StageId, to: StageId) -> Self {
        Self { from, to }
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.from, self.to)
    }
}

#[derive(Debug, Clone)]
pub struct StageGraph {
    anode: Vec<Stage>,
    cathode: Vec<Stage>,
    shared: Vec<Stage>,
}

impl Default for StageGraph {
    fn default() -> Self {
        Self::standard()
    }
}

impl StageGraph {
    /// The plant layout: six anode stages, six cathode stages, four shared cell stages.
    pub fn standard() -> Self {
        let build = |line: Line| -> Vec<Stage> {
            StageId::ALL
                .iter()
                .copied()
                .filter(|stage| stage.line() == line)
                .enumerate()
                .map(|(ordinal, id)| Stage {
                    id,
                    label: id.label().to_string(),
                    line,
                    ordinal,
                })
                .collect()
        };
        Self {
            anode: build(Line::Anode),
            cathode: build(Line::Cathode),
            shared: build(Line::Shared),
        }
    }

    pub fn line(&self, line: Line) -> &[Stage] {
        match line {
            Line::Anode => &self.anode,
            Line::Cathode => &self.cathode,
            Line::Shared => &self.shared,
        }
    }

    pub fn stage(&self, id: StageId) -> Option<&Stage> {
        self.line(id.line()).iter().find(|stage| stage.id == id)
    }

    pub fn ordinal(&self, id: StageId) -> Option<usize> {
        self.stage(id).map(|stage| stage.ordinal)
    }

    /// First stage of the shared line; both inspection stages feed it.
    pub fn shared_entry(&self) -> StageId {
        self.shared.first().map(|stage| stage.id).unwrap_or(StageId::Rewinding)
    }

    pub fn entry(&self, line: Line) -> Option<StageId> {
        self.line(line).first().map(|stage| stage.id)
    }

    /// Last stage of an electrode line, i.e. the source of a merge edge.
    pub fn is_merge_source(&self, id: StageId) -> bool {
        let line = id.line();
        line.is_electrode() && self.line(line).last().map(|stage| stage.id) == Some(id)
    }

    /// The merge sources of both electrode lines, anode first.
    pub fn merge_sources(&self) -> [StageId; 2] {
        let last = |line: &[Stage], fallback: StageId| line.last().map(|s| s.id).unwrap_or(fallback);
        [
            last(&self.anode, StageId::AnodeInspection),
            last(&self.cathode, StageId::CathodeInspection),
        ]
    }

    /// Next stage within the same line. Merge sources and the terminal stage have none.
    pub fn successor(&self, id: StageId) -> Option<StageId> {
        let stages = self.line(id.line());
        let pos = stages.iter().position(|stage| stage.id == id)?;
        stages.get(pos + 1).map(|stage| stage.id)
    }

    pub fn is_terminal(&self, id: StageId) -> bool {
        self.shared.last().map(|stage| stage.id) == Some(id)
    }

    /// Every edge in render order: cathode line, anode line, shared line, then the merges.
    pub fn edges(&self) -> Vec<EdgeId> {
        let mut edges = Vec::new();
        for line in [&self.cathode, &self.anode, &self.shared] {
            for pair in line.windows(2) {
                edges.push(EdgeId::new(pair[0].id, pair[1].id));
            }
        }
        let entry = self.shared_entry();
        let [anode_last, cathode_last] = self.merge_sources();
        edges.push(EdgeId::new(cathode_last, entry));
        edges.push(EdgeId::new(anode_last, entry));
        edges
    }

    pub fn stages(&self) -> impl Iterator<Item = &Stage> {
        self.anode.iter().chain(self.cathode.iter()).chain(self.shared.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_non_terminal_stage_has_one_successor() {
        let graph = StageGraph::standard();
        for stage in graph.stages() {
            let succ = graph.successor(stage.id);
            if graph.is_merge_source(stage.id) || graph.is_terminal(stage.id) {
                assert_eq!(succ, None, "{} should not have an in-line successor", stage.id);
            } else {
                let next = succ.expect("successor");
                assert_eq!(next.line(), stage.line);
                assert_eq!(graph.ordinal(next), Some(stage.ordinal + 1));
            }
        }
    }

    #[test]
    fn inspections_merge_into_rewinding() {
        let graph = StageGraph::standard();
        assert_eq!(graph.shared_entry(), StageId::Rewinding);
        assert_eq!(
            graph.merge_sources(),
            [StageId::AnodeInspection, StageId::CathodeInspection]
        );
        assert!(graph.is_merge_source(StageId::CathodeInspection));
        assert!(!graph.is_merge_source(StageId::Aging));
        assert!(graph.is_terminal(StageId::Aging));
    }

    #[test]
    fn edge_list_matches_diagram() {
        let graph = StageGraph::standard();
        let edges = graph.edges();
        assert_eq!(edges.len(), 5 + 5 + 3 + 2);
        assert_eq!(edges[0].to_string(), "Cathode Mixing->Cathode Coating");
        assert_eq!(
            edges.last().map(|e| e.to_string()).as_deref(),
            Some("Anode Inspection->Rewinding")
        );
    }

    #[test]
    fn ordinals_follow_line_order() {
        let graph = StageGraph::standard();
        assert_eq!(graph.ordinal(StageId::AnodeMixing), Some(0));
        assert_eq!(graph.ordinal(StageId::CathodeInspection), Some(5));
        assert_eq!(graph.ordinal(StageId::Aging), Some(3));
        assert_eq!(graph.entry(Line::Cathode), Some(StageId::CathodeMixing));
    }
}
