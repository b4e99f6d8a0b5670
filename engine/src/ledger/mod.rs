//! Ledger state, atomic scopes, primitives, and registry operations.
//!
//! `LedgerState` is the sole mutation surface: agents, instruments, and
//! lots live in its registries and change only through its operations.
//! Every public multi-step operation runs inside exactly one atomic scope
//! backed by a reversible-delta journal; any failure unwinds to the
//! pre-call state with no partial trace.

pub mod invariants;
pub mod journal;
pub mod operations;
pub mod primitives;
pub mod state;

pub use state::LedgerState;

use crate::models::instrument::{InstrumentClass, InstrumentId};
use crate::models::lot::LotId;
use thiserror::Error;

/// Errors surfaced by ledger operations.
///
/// Each variant is a precondition failure: the enclosing atomic scope is
/// rolled back before the error propagates, so the caller observes the
/// pre-call state. Invariant violations are not represented here — they
/// are bug-class failures and panic.
#[derive(Debug, Error, PartialEq)]
pub enum LedgerError {
    #[error("duplicate id: {0}")]
    DuplicateId(String),

    #[error("policy violation: {agent} ({agent_kind}) may not {action} {class:?}")]
    PolicyViolation {
        agent: String,
        agent_kind: &'static str,
        action: &'static str,
        class: InstrumentClass,
    },

    #[error("insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: i64, available: i64 },

    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error("incompatible instruments: {a} and {b}")]
    IncompatibleInstruments { a: InstrumentId, b: InstrumentId },

    #[error("incompatible lots: {a} and {b}")]
    IncompatibleLots { a: LotId, b: LotId },

    #[error("no unique issuing authority registered")]
    MissingIssuer,

    #[error("unknown agent: {0}")]
    UnknownAgent(String),

    #[error("unknown instrument: {0}")]
    UnknownInstrument(InstrumentId),

    #[error("unknown lot: {0}")]
    UnknownLot(LotId),
}
