//! Ledger state and registry.
//!
//! Owns the agent, instrument, and lot registries, the append-only event
//! log, the day counter, and the two outstanding-supply counters. All
//! registries are `BTreeMap`s so iteration order is deterministic; ids
//! are monotonic, so id order is creation order across runs.
//!
//! # Atomic scopes
//!
//! Every public multi-step operation opens exactly one atomic scope via
//! `scoped`. Operations invoked while a scope is already open join it, so
//! rollback granularity is always the outermost public call. Direct scope
//! creation while one is open is a bug and trips a runtime assertion.
//!
//! CRITICAL: All money values are i64 (minor units).

use crate::core::time::Phase;
use crate::ledger::journal::{Journal, UndoOp};
use crate::ledger::LedgerError;
use crate::models::agent::Agent;
use crate::models::event::{Event, EventLog};
use crate::models::instrument::{Instrument, InstrumentClass, InstrumentId};
use crate::models::lot::{InventoryLot, LotId};
use crate::policy::PolicyTable;
use std::collections::BTreeMap;

/// The double-entry ledger: registries, event log, counters, policy.
///
/// # Example
/// ```
/// use ledger_engine_core_rs::{Agent, AgentKind, LedgerState};
///
/// let mut state = LedgerState::new("USD");
/// state
///     .setup(|s| {
///         s.add_agent(Agent::new("CB", "Central Bank", AgentKind::CentralBank))?;
///         s.add_agent(Agent::new("H1", "Household", AgentKind::Household))?;
///         s.mint_cash("H1", 1_000)?;
///         Ok(())
///     })
///     .unwrap();
/// assert_eq!(state.cash_balance("H1"), 1_000);
/// assert_eq!(state.cash_outstanding(), 1_000);
/// ```
#[derive(Debug)]
pub struct LedgerState {
    denomination: String,
    agents: BTreeMap<String, Agent>,
    instruments: BTreeMap<InstrumentId, Instrument>,
    lots: BTreeMap<LotId, InventoryLot>,
    events: EventLog,
    /// Logical day counter, advanced only by the scheduler.
    day: usize,
    phase: Phase,
    policy: PolicyTable,
    /// Total outstanding bearer-claim supply.
    cash_outstanding: i64,
    /// Total outstanding settlement-asset supply.
    reserves_outstanding: i64,
    next_instrument: u64,
    next_lot: u64,
    journal: Option<Journal>,
}

impl LedgerState {
    /// Create an empty ledger denominated in `denomination`.
    pub fn new(denomination: impl Into<String>) -> Self {
        Self {
            denomination: denomination.into(),
            agents: BTreeMap::new(),
            instruments: BTreeMap::new(),
            lots: BTreeMap::new(),
            events: EventLog::new(),
            day: 0,
            phase: Phase::Setup,
            policy: PolicyTable::new(),
            cash_outstanding: 0,
            reserves_outstanding: 0,
            next_instrument: 1,
            next_lot: 1,
            journal: None,
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Current logical day.
    pub fn day(&self) -> usize {
        self.day
    }

    /// Phase the ledger is currently operating in.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Base denomination for minted claims.
    pub fn denomination(&self) -> &str {
        &self.denomination
    }

    /// The append-only event log.
    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Authorization table and settlement-method rankings.
    pub fn policy(&self) -> &PolicyTable {
        &self.policy
    }

    /// Mutable policy access, for scenario overrides at setup.
    pub fn policy_mut(&mut self) -> &mut PolicyTable {
        &mut self.policy
    }

    /// Total bearer-claim amount outstanding.
    pub fn cash_outstanding(&self) -> i64 {
        self.cash_outstanding
    }

    /// Total settlement-asset amount outstanding.
    pub fn reserves_outstanding(&self) -> i64 {
        self.reserves_outstanding
    }

    /// Agent registry.
    pub fn agents(&self) -> &BTreeMap<String, Agent> {
        &self.agents
    }

    /// Instrument registry.
    pub fn instruments(&self) -> &BTreeMap<InstrumentId, Instrument> {
        &self.instruments
    }

    /// Lot registry.
    pub fn lots(&self) -> &BTreeMap<LotId, InventoryLot> {
        &self.lots
    }

    pub fn get_agent(&self, id: &str) -> Option<&Agent> {
        self.agents.get(id)
    }

    pub fn get_instrument(&self, id: InstrumentId) -> Option<&Instrument> {
        self.instruments.get(&id)
    }

    pub fn get_lot(&self, id: LotId) -> Option<&InventoryLot> {
        self.lots.get(&id)
    }

    /// Sum of an agent's asset amounts in one instrument class.
    pub fn class_balance(&self, agent_id: &str, class: InstrumentClass) -> i64 {
        let Some(agent) = self.agents.get(agent_id) else {
            return 0;
        };
        agent
            .assets()
            .iter()
            .filter_map(|id| self.instruments.get(id))
            .filter(|ins| ins.class() == class)
            .map(|ins| ins.amount())
            .sum()
    }

    /// Bearer-claim holdings of an agent.
    pub fn cash_balance(&self, agent_id: &str) -> i64 {
        self.class_balance(agent_id, InstrumentClass::Cash)
    }

    /// Settlement-asset holdings of an agent.
    pub fn reserve_balance(&self, agent_id: &str) -> i64 {
        self.class_balance(agent_id, InstrumentClass::Reserves)
    }

    /// Deposit holdings of an agent across all institutions.
    pub fn deposit_balance(&self, agent_id: &str) -> i64 {
        self.class_balance(agent_id, InstrumentClass::Deposit)
    }

    /// Deposit holdings of an agent at one institution.
    pub fn deposit_balance_at(&self, agent_id: &str, bank_id: &str) -> i64 {
        let Some(agent) = self.agents.get(agent_id) else {
            return 0;
        };
        agent
            .assets()
            .iter()
            .filter_map(|id| self.instruments.get(id))
            .filter(|ins| ins.class() == InstrumentClass::Deposit && ins.issuer() == bank_id)
            .map(|ins| ins.amount())
            .sum()
    }

    /// Total goods quantity an agent owns in one SKU.
    pub fn sku_quantity(&self, agent_id: &str, sku: &str) -> i64 {
        let Some(agent) = self.agents.get(agent_id) else {
            return 0;
        };
        agent
            .lots()
            .iter()
            .filter_map(|id| self.lots.get(id))
            .filter(|lot| lot.sku() == sku)
            .map(|lot| lot.quantity())
            .sum()
    }

    /// Balance-sheet totals for an agent: (asset amounts, liability amounts).
    pub fn balance_sheet(&self, agent_id: &str) -> (i64, i64) {
        let Some(agent) = self.agents.get(agent_id) else {
            return (0, 0);
        };
        let sum = |ids: &[InstrumentId]| -> i64 {
            ids.iter()
                .filter_map(|id| self.instruments.get(id))
                .map(|ins| ins.amount())
                .sum()
        };
        (sum(agent.assets()), sum(agent.liabilities()))
    }

    /// Whether any payment or delivery obligation remains outstanding.
    pub fn has_outstanding_obligations(&self) -> bool {
        self.instruments.values().any(|ins| ins.kind().is_obligation())
    }

    /// The unique issuing authority, or `MissingIssuer`.
    pub fn central_bank_id(&self) -> Result<String, LedgerError> {
        let mut found = None;
        for agent in self.agents.values() {
            if agent.kind() == crate::models::agent::AgentKind::CentralBank {
                if found.is_some() {
                    return Err(LedgerError::MissingIssuer);
                }
                found = Some(agent.id().to_string());
            }
        }
        found.ok_or(LedgerError::MissingIssuer)
    }

    // =========================================================================
    // Registry mutation
    // =========================================================================

    /// Register a new agent. Fails `DuplicateId` on collision.
    pub fn add_agent(&mut self, agent: Agent) -> Result<(), LedgerError> {
        self.scoped(|s| {
            if s.agents.contains_key(agent.id()) {
                return Err(LedgerError::DuplicateId(agent.id().to_string()));
            }
            let id = agent.id().to_string();
            s.record_agent(&id);
            s.agents.insert(id, agent);
            Ok(())
        })
    }

    /// Append one event to the log, tagged by the caller with the current
    /// day and phase. Events are read-only once appended; a rolled-back
    /// scope truncates anything it logged.
    pub fn log(&mut self, event: Event) {
        self.events.log(event);
    }

    // =========================================================================
    // Atomic scope
    // =========================================================================

    /// Run `f` inside an atomic scope with the pre-simulation phase tag,
    /// then verify all global invariants.
    ///
    /// The setup flag only affects how events are tagged for display;
    /// mutation semantics are unchanged.
    pub fn setup<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, LedgerError>,
    ) -> Result<T, LedgerError> {
        let result = self.atomic(f);
        if result.is_ok() {
            self.assert_invariants();
        }
        result
    }

    /// Open a fresh atomic scope. Rejects reentrant creation.
    pub(crate) fn atomic<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, LedgerError>,
    ) -> Result<T, LedgerError> {
        assert!(
            self.journal.is_none(),
            "atomic scopes must not nest: open one scope per top-level operation"
        );
        self.journal = Some(Journal {
            events_len: self.events.len(),
            cash_outstanding: self.cash_outstanding,
            reserves_outstanding: self.reserves_outstanding,
            next_instrument: self.next_instrument,
            next_lot: self.next_lot,
            undo: Vec::new(),
        });
        match f(self) {
            Ok(value) => {
                self.journal = None;
                Ok(value)
            }
            Err(err) => {
                let journal = self.journal.take().expect("open journal");
                self.rollback(journal);
                Err(err)
            }
        }
    }

    /// Join the open scope if there is one, otherwise open a fresh scope.
    /// Rollback granularity is always the outermost public operation.
    pub(crate) fn scoped<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, LedgerError>,
    ) -> Result<T, LedgerError> {
        if self.journal.is_some() {
            f(self)
        } else {
            self.atomic(f)
        }
    }

    fn rollback(&mut self, journal: Journal) {
        // Reverse order so the oldest capture of each entry wins.
        for op in journal.undo.into_iter().rev() {
            match op {
                UndoOp::Instrument(id, Some(prior)) => {
                    self.instruments.insert(id, prior);
                }
                UndoOp::Instrument(id, None) => {
                    self.instruments.remove(&id);
                }
                UndoOp::Lot(id, Some(prior)) => {
                    self.lots.insert(id, prior);
                }
                UndoOp::Lot(id, None) => {
                    self.lots.remove(&id);
                }
                UndoOp::Agent(id, Some(prior)) => {
                    self.agents.insert(id, prior);
                }
                UndoOp::Agent(id, None) => {
                    self.agents.remove(&id);
                }
            }
        }
        self.events.truncate(journal.events_len);
        self.cash_outstanding = journal.cash_outstanding;
        self.reserves_outstanding = journal.reserves_outstanding;
        self.next_instrument = journal.next_instrument;
        self.next_lot = journal.next_lot;
    }

    // =========================================================================
    // Journaled accessors (crate-internal)
    // =========================================================================

    fn record_instrument(&mut self, id: InstrumentId) {
        let prior = self.instruments.get(&id).cloned();
        if let Some(journal) = self.journal.as_mut() {
            journal.record(UndoOp::Instrument(id, prior));
        }
    }

    fn record_lot(&mut self, id: LotId) {
        let prior = self.lots.get(&id).cloned();
        if let Some(journal) = self.journal.as_mut() {
            journal.record(UndoOp::Lot(id, prior));
        }
    }

    fn record_agent(&mut self, id: &str) {
        let prior = self.agents.get(id).cloned();
        if let Some(journal) = self.journal.as_mut() {
            journal.record(UndoOp::Agent(id.to_string(), prior));
        }
    }

    pub(crate) fn instrument_mut(
        &mut self,
        id: InstrumentId,
    ) -> Result<&mut Instrument, LedgerError> {
        self.record_instrument(id);
        self.instruments
            .get_mut(&id)
            .ok_or(LedgerError::UnknownInstrument(id))
    }

    pub(crate) fn put_instrument(&mut self, instrument: Instrument) {
        let id = instrument.id();
        self.record_instrument(id);
        self.instruments.insert(id, instrument);
    }

    pub(crate) fn take_instrument(
        &mut self,
        id: InstrumentId,
    ) -> Result<Instrument, LedgerError> {
        self.record_instrument(id);
        self.instruments
            .remove(&id)
            .ok_or(LedgerError::UnknownInstrument(id))
    }

    pub(crate) fn lot_mut(&mut self, id: LotId) -> Result<&mut InventoryLot, LedgerError> {
        self.record_lot(id);
        self.lots.get_mut(&id).ok_or(LedgerError::UnknownLot(id))
    }

    pub(crate) fn put_lot(&mut self, lot: InventoryLot) {
        let id = lot.id();
        self.record_lot(id);
        self.lots.insert(id, lot);
    }

    pub(crate) fn take_lot(&mut self, id: LotId) -> Result<InventoryLot, LedgerError> {
        self.record_lot(id);
        self.lots.remove(&id).ok_or(LedgerError::UnknownLot(id))
    }

    pub(crate) fn agent_mut(&mut self, id: &str) -> Result<&mut Agent, LedgerError> {
        self.record_agent(id);
        self.agents
            .get_mut(id)
            .ok_or_else(|| LedgerError::UnknownAgent(id.to_string()))
    }

    pub(crate) fn agent_ref(&self, id: &str) -> Result<&Agent, LedgerError> {
        self.agents
            .get(id)
            .ok_or_else(|| LedgerError::UnknownAgent(id.to_string()))
    }

    pub(crate) fn instrument_ref(&self, id: InstrumentId) -> Result<&Instrument, LedgerError> {
        self.instruments
            .get(&id)
            .ok_or(LedgerError::UnknownInstrument(id))
    }

    pub(crate) fn lot_ref(&self, id: LotId) -> Result<&InventoryLot, LedgerError> {
        self.lots.get(&id).ok_or(LedgerError::UnknownLot(id))
    }

    pub(crate) fn alloc_instrument_id(&mut self) -> InstrumentId {
        let id = InstrumentId::new(self.next_instrument);
        self.next_instrument += 1;
        id
    }

    pub(crate) fn alloc_lot_id(&mut self) -> LotId {
        let id = LotId::new(self.next_lot);
        self.next_lot += 1;
        id
    }

    pub(crate) fn add_cash_outstanding(&mut self, delta: i64) {
        self.cash_outstanding += delta;
    }

    pub(crate) fn add_reserves_outstanding(&mut self, delta: i64) {
        self.reserves_outstanding += delta;
    }

    pub(crate) fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
    }

    pub(crate) fn advance_day(&mut self) {
        self.day += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::agent::AgentKind;

    fn two_agents() -> LedgerState {
        let mut state = LedgerState::new("USD");
        state
            .add_agent(Agent::new("CB", "Central Bank", AgentKind::CentralBank))
            .unwrap();
        state
            .add_agent(Agent::new("H1", "Household", AgentKind::Household))
            .unwrap();
        state
    }

    #[test]
    fn test_add_agent_duplicate() {
        let mut state = two_agents();
        let result = state.add_agent(Agent::new("H1", "Again", AgentKind::Household));
        assert_eq!(result, Err(LedgerError::DuplicateId("H1".to_string())));
    }

    #[test]
    fn test_central_bank_lookup() {
        let state = two_agents();
        assert_eq!(state.central_bank_id().unwrap(), "CB");
    }

    #[test]
    fn test_missing_issuer() {
        let mut state = LedgerState::new("USD");
        state
            .add_agent(Agent::new("H1", "Household", AgentKind::Household))
            .unwrap();
        assert_eq!(state.central_bank_id(), Err(LedgerError::MissingIssuer));
    }

    #[test]
    fn test_ambiguous_issuer() {
        let mut state = two_agents();
        state
            .add_agent(Agent::new("CB2", "Second Authority", AgentKind::CentralBank))
            .unwrap();
        assert_eq!(state.central_bank_id(), Err(LedgerError::MissingIssuer));
    }

    #[test]
    fn test_atomic_rolls_back_agent_registration() {
        let mut state = two_agents();
        let result: Result<(), LedgerError> = state.atomic(|s| {
            s.add_agent(Agent::new("B1", "Bank", AgentKind::Bank))?;
            Err(LedgerError::InvalidOperation("boom".to_string()))
        });
        assert!(result.is_err());
        assert!(state.get_agent("B1").is_none());
        assert_eq!(state.agents().len(), 2);
    }

    #[test]
    fn test_atomic_rolls_back_events() {
        let mut state = two_agents();
        let before = state.events().len();
        let result: Result<(), LedgerError> = state.atomic(|s| {
            s.log(Event::DayStarted {
                day: 0,
                phase: Phase::Setup,
            });
            Err(LedgerError::InvalidOperation("boom".to_string()))
        });
        assert!(result.is_err());
        assert_eq!(state.events().len(), before);
    }

    #[test]
    #[should_panic(expected = "atomic scopes must not nest")]
    fn test_nested_atomic_rejected() {
        let mut state = two_agents();
        let _ = state.atomic(|s| s.atomic(|_| Ok(())));
    }

    #[test]
    fn test_scoped_joins_open_scope() {
        let mut state = two_agents();
        // scoped() inside atomic() must not trip the nesting assertion,
        // and the outer rollback must cover its mutations.
        let result: Result<(), LedgerError> = state.atomic(|s| {
            s.scoped(|inner| inner.add_agent(Agent::new("B1", "Bank", AgentKind::Bank)))?;
            Err(LedgerError::InvalidOperation("boom".to_string()))
        });
        assert!(result.is_err());
        assert!(state.get_agent("B1").is_none());
    }
}
