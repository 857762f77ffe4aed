use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::CoreError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Line {
    Anode,
    Cathode,
    Shared,
}

impl Line {
    pub fn is_electrode(self) -> bool {
        matches!(self, Line::Anode | Line::Cathode)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Line::Anode => "anode",
            Line::Cathode => "cathode",
            Line::Shared => "shared",
        }
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier of one manufacturing stage. Serialized as its display label.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StageId {
    #[serde(rename = "Anode Mixing")]
    AnodeMixing,
    #[serde(rename = "Anode Coating")]
    AnodeCoating,
    #[serde(rename = "Anode Drying")]
    AnodeDrying,
    #[serde(rename = "Anode Calendaring")]
    AnodeCalendaring,
    #[serde(rename = "Anode Slitting")]
    AnodeSlitting,
    #[serde(rename = "Anode Inspection")]
    AnodeInspection,
    #[serde(rename = "Cathode Mixing")]
    CathodeMixing,
    #[serde(rename = "Cathode Coating")]
    CathodeCoating,
    #[serde(rename = "Cathode Drying")]
    CathodeDrying,
    #[serde(rename = "Cathode Calendaring")]
    CathodeCalendaring,
    #[serde(rename = "Cathode Slitting")]
    CathodeSlitting,
    #[serde(rename = "Cathode Inspection")]
    CathodeInspection,
    #[serde(rename = "Rewinding")]
    Rewinding,
    #[serde(rename = "Electrolyte Filling")]
    ElectrolyteFilling,
    #[serde(rename = "Formation Cycling")]
    FormationCycling,
    #[serde(rename = "Aging")]
    Aging,
}

impl StageId {
    pub const ALL: [StageId; 16] = [
        StageId::AnodeMixing,
        StageId::AnodeCoating,
        StageId::AnodeDrying,
        StageId::AnodeCalendaring,
        StageId::AnodeSlitting,
        StageId::AnodeInspection,
        StageId::CathodeMixing,
        StageId::CathodeCoating,
        StageId::CathodeDrying,
        StageId::CathodeCalendaring,
        StageId::CathodeSlitting,
        StageId::CathodeInspection,
        StageId::Rewinding,
        StageId::ElectrolyteFilling,
        StageId::FormationCycling,
        StageId::Aging,
    ];

    pub fn label(self) -> &'static str {
        match self {
            StageId::AnodeMixing => "Anode Mixing",
            StageId::AnodeCoating => "Anode Coating",
            StageId::AnodeDrying => "Anode Drying",
            StageId::AnodeCalendaring => "Anode Calendaring",
            StageId::AnodeSlitting => "Anode Slitting",
            StageId::AnodeInspection => "Anode Inspection",
            StageId::CathodeMixing => "Cathode Mixing",
            StageId::CathodeCoating => "Cathode Coating",
            StageId::CathodeDrying => "Cathode Drying",
            StageId::CathodeCalendaring => "Cathode Calendaring",
            StageId::CathodeSlitting => "Cathode Slitting",
            StageId::CathodeInspection => "Cathode Inspection",
            StageId::Rewinding => "Rewinding",
            StageId::ElectrolyteFilling => "Electrolyte Filling",
            StageId::FormationCycling => "Formation Cycling",
            StageId::Aging => "Aging",
        }
    }

    pub fn line(self) -> Line {
        match self {
            StageId::AnodeMixing
            | StageId::AnodeCoating
            | StageId::AnodeDrying
            | StageId::AnodeCalendaring
            | StageId::AnodeSlitting
            | StageId::AnodeInspection => Line::Anode,
            StageId::CathodeMixing
            | StageId::CathodeCoating
            | StageId::CathodeDrying
            | StageId::CathodeCalendaring
            | StageId::CathodeSlitting
            | StageId::CathodeInspection => Line::Cathode,
            StageId::Rewinding
            | StageId::ElectrolyteFilling
            | StageId::FormationCycling
            | StageId::Aging => Line::Shared,
        }
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for StageId {
    type Err = CoreError;

    /// Parses a display label, ignoring case and surrounding whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        StageId::ALL
            .iter()
            .copied()
            .find(|stage| stage.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| CoreError::UnknownStage(s.to_string()))
    }
}

/// Static description of a stage as shown on the flow diagram.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Stage {
    pub id: StageId,
    pub label: String,
    pub line: Line,
    pub ordinal: usize,
}
