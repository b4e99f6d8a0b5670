//! Reversible-delta journal backing the atomic transaction scope.
//!
//! Instead of deep-copying the whole state on scope entry, the scope
//! records the prior value of each registry entry the first time it is
//! touched, plus the scalar counters and event-log length at entry.
//! Rollback replays the entries in reverse and truncates the log, which
//! restores the pre-call state bit for bit at cost proportional to the
//! entities touched rather than to total state size.
//!
//! Scopes never nest: creation is restricted to top-level operations and
//! guarded by a runtime assertion. Internal helpers join the open scope.

use crate::models::agent::Agent;
use crate::models::instrument::{Instrument, InstrumentId};
use crate::models::lot::{InventoryLot, LotId};

/// Prior value of one registry entry, captured before its first mutation
/// within a scope. `None` means the entry did not exist.
///
/// Duplicate entries for the same id are harmless: rollback applies in
/// reverse order, so the oldest capture wins.
#[derive(Debug, Clone)]
pub(crate) enum UndoOp {
    Instrument(InstrumentId, Option<Instrument>),
    Lot(LotId, Option<InventoryLot>),
    Agent(String, Option<Agent>),
}

/// State captured at scope entry plus accumulated undo entries.
#[derive(Debug)]
pub(crate) struct Journal {
    pub(crate) events_len: usize,
    pub(crate) cash_outstanding: i64,
    pub(crate) reserves_outstanding: i64,
    pub(crate) next_instrument: u64,
    pub(crate) next_lot: u64,
    pub(crate) undo: Vec<UndoOp>,
}

impl Journal {
    pub(crate) fn record(&mut self, op: UndoOp) {
        self.undo.push(op);
    }
}
