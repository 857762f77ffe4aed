//! Backend process names and status vocabularies.

use std::sync::LazyLock;

use cf_core::StageId;

/// Backend process name → stage. Covers the suffixed electrode names, the `_cell` shared-line
/// names and the older unsuffixed shared-line names.
pub const PROCESS_TABLE: &[(&str, StageId)] = &[
    ("mixing_anode", StageId::AnodeMixing),
    ("mixing_cathode", StageId::CathodeMixing),
    ("coating_anode", StageId::AnodeCoating),
    ("coating_cathode", StageId::CathodeCoating),
    ("drying_anode", StageId::AnodeDrying),
    ("drying_cathode", StageId::CathodeDrying),
    ("calendaring_anode", StageId::AnodeCalendaring),
    ("calendaring_cathode", StageId::CathodeCalendaring),
    ("slitting_anode", StageId::AnodeSlitting),
    ("slitting_cathode", StageId::CathodeSlitting),
    ("inspection_anode", StageId::AnodeInspection),
    ("inspection_cathode", StageId::CathodeInspection),
    ("rewinding_cell", StageId::Rewinding),
    ("electrolyte_filling_cell", StageId::ElectrolyteFilling),
    ("formation_cycling_cell", StageId::FormationCycling),
    ("aging_cell", StageId::Aging),
    ("rewinding", StageId::Rewinding),
    ("electrolyte_filling", StageId::ElectrolyteFilling),
    ("formation_cycling", StageId::FormationCycling),
    ("aging", StageId::Aging),
];

pub const COMPLETION_STATUSES: &[&str] = &[
    "mixing_completed",
    "coating_completed",
    "drying_completed",
    "calendaring_completed",
    "slitting_completed",
    "inspection_completed",
    "rewinding_completed",
    "electrolyte_filling_completed",
    "formation_cycling_completed",
    "aging_completed",
    "simulation_completed",
    "completed",
    "finished",
    "done",
    "idle",
];

pub const RUNNING_STATUSES: &[&str] = &[
    "mixing_started",
    "coating_started",
    "drying_started",
    "calendaring_started",
    "slitting_started",
    "inspection_started",
    "rewinding_started",
    "electrolyte_filling_started",
    "formation_cycling_started",
    "aging_started",
    "machine_turned_on",
    "simulation_started",
    "simulation_progress",
    "running",
];

/// Table entries ordered longest name first, so `aging_cell` is tried before `aging`.
static BY_LENGTH: LazyLock<Vec<(&'static str, StageId)>> = LazyLock::new(|| {
    let mut table = PROCESS_TABLE.to_vec();
    table.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
    table
});

/// Exact lookup of a process name (case-insensitive).
pub fn lookup(name: &str) -> Option<StageId> {
    let name = name.trim();
    PROCESS_TABLE
        .iter()
        .find(|(process, _)| process.eq_ignore_ascii_case(name))
        .map(|(_, stage)| *stage)
}

/// Resolves a process or machine name: backend process name first, then a stage label.
pub fn resolve(name: &str) -> Option<StageId> {
    lookup(name).or_else(|| name.parse::<StageId>().ok())
}

/// Finds the longest process name embedded anywhere in already-lowercased text.
pub fn find_in(lowered: &str) -> Option<StageId> {
    BY_LENGTH
        .iter()
        .find(|(process, _)| lowered.contains(process))
        .map(|(_, stage)| *stage)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Completion,
    Running,
}

pub fn classify_status(status: &str) -> Option<StatusClass> {
    let status = status.trim().to_ascii_lowercase();
    if COMPLETION_STATUSES.contains(&status.as_str()) {
        Some(StatusClass::Completion)
    } else if RUNNING_STATUSES.contains(&status.as_str()) {
        Some(StatusClass::Running)
    } else {
        None
    }
}
