//! Ledger Engine Core - Rust Engine
//!
//! Double-entry ledger engine with deterministic execution: fractional
//! instrument primitives, policy-checked registries, atomic transaction
//! scopes, and a three-phase settlement/clearing day cycle.
//!
//! # Architecture
//!
//! - **core**: Day phases
//! - **models**: Domain types (Agent, Instrument, InventoryLot, Event)
//! - **ledger**: State, atomic scopes, primitives, operations, invariants
//! - **policy**: Issue/hold authorization and settlement-method ranking
//! - **settlement**: Obligation settlement (Phase B)
//! - **clearing**: Intraday interbank netting (Phase C)
//! - **orchestrator**: Day-cycle scheduler
//!
//! # Critical Invariants
//!
//! 1. All money values are i64 (minor units)
//! 2. Every instrument appears on exactly two balance sheets
//! 3. Iteration and settlement order is deterministic (id order)

// Module declarations
pub mod clearing;
pub mod core;
pub mod ledger;
pub mod models;
pub mod orchestrator;
pub mod policy;
pub mod settlement;

// Re-exports for convenience
pub use clearing::{run_clearing, ClearingOutcome};
pub use core::time::Phase;
pub use ledger::{LedgerError, LedgerState};
pub use models::{
    Agent, AgentKind, Event, EventLog, FungibilityKey, Instrument, InstrumentClass, InstrumentId,
    InstrumentKind, InventoryLot, LotId, LotKey,
};
pub use orchestrator::{DayResult, Orchestrator, RunReport};
pub use policy::{PolicyTable, SettlementMethod};
pub use settlement::{run_settlement, SettlementOutcome};
