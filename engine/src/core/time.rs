//! Day-cycle time vocabulary.
//!
//! The ledger operates on a logical day counter advanced by explicit
//! stepping — there are no wall-clock semantics. Each day runs three
//! ordered phases; every event is tagged with the day and phase in which
//! it was produced.

use serde::{Deserialize, Serialize};

/// Phase of the day cycle an event was produced in.
///
/// `Setup` marks pre-simulation bootstrapping (display concern only; it
/// does not change mutation semantics). The remaining phases run in order
/// within each day.
///
/// # Example
/// ```
/// use ledger_engine_core_rs::Phase;
///
/// assert!(Phase::BeginDay < Phase::Settlement);
/// assert!(Phase::Settlement < Phase::Clearing);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Pre-simulation scenario construction.
    Setup,
    /// Phase A: begin-of-day marker (reserved for future hooks).
    BeginDay,
    /// Phase B: obligation settlement.
    Settlement,
    /// Phase C: intraday institution-to-institution clearing.
    Clearing,
}

impl Phase {
    /// Short name used in exported records.
    pub fn name(&self) -> &'static str {
        match self {
            Phase::Setup => "setup",
            Phase::BeginDay => "begin_day",
            Phase::Settlement => "settlement",
            Phase::Clearing => "clearing",
        }
    }
}
