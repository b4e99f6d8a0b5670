//! Day-cycle scheduler.
//!
//! Runs the three-phase day loop over a ledger:
//!
//! ```text
//! For each day d:
//! 1. Phase A: begin-of-day marker
//! 2. Phase B: settle obligations due today
//! 3. Phase C: net and clear interbank exposures
//! 4. Verify global invariants at each phase boundary
//! 5. Advance the day counter
//! ```
//!
//! The outer loop (`run_until_stable`) repeats the day cycle until the
//! system reaches a quiet fixed point or a day cap.
//!
//! # Example
//!
//! ```
//! use ledger_engine_core_rs::{Agent, AgentKind, InstrumentKind, LedgerState, Orchestrator};
//!
//! let mut state = LedgerState::new("USD");
//! state
//!     .setup(|s| {
//!         s.add_agent(Agent::new("CB", "Central Bank", AgentKind::CentralBank))?;
//!         s.add_agent(Agent::new("H1", "Household One", AgentKind::Household))?;
//!         s.add_agent(Agent::new("H2", "Household Two", AgentKind::Household))?;
//!         s.mint_cash("H1", 500)?;
//!         s.add_contract(InstrumentKind::Payable { due_day: 0 }, 200, "H2", "H1")?;
//!         Ok(())
//!     })
//!     .unwrap();
//!
//! let mut orchestrator = Orchestrator::new(state);
//! let result = orchestrator.run_day();
//! assert_eq!(result.day, 0);
//! assert!(result.impactful);
//! assert_eq!(orchestrator.state().cash_balance("H2"), 200);
//! ```

use crate::clearing::{run_clearing, ClearingOutcome};
use crate::core::time::Phase;
use crate::ledger::LedgerState;
use crate::models::event::Event;
use crate::settlement::{run_settlement, SettlementOutcome};

/// Summary of one completed day.
#[derive(Debug, Clone)]
pub struct DayResult {
    /// The day that was run.
    pub day: usize,
    /// Per-obligation Phase B outcomes, in processing order.
    pub outcomes: Vec<SettlementOutcome>,
    /// Interbank nets settled in reserves.
    pub cleared: usize,
    /// Interbank nets rolled into overnight obligations.
    pub deferred: usize,
    /// Whether any settlement, clearing, or default activity occurred.
    pub impactful: bool,
}

impl DayResult {
    /// Number of obligations that defaulted today.
    pub fn defaults(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_default()).count()
    }
}

/// Summary of a `run_until_stable` run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Whether the quiet fixed point was reached before the day cap.
    pub stable: bool,
    /// Days actually run.
    pub days_run: usize,
    /// Total obligations defaulted across the run.
    pub defaults: usize,
}

/// Owns a ledger and drives its day cycle.
#[derive(Debug)]
pub struct Orchestrator {
    state: LedgerState,
}

impl Orchestrator {
    /// Wrap a set-up ledger. Day 0 has not run yet.
    pub fn new(state: LedgerState) -> Self {
        Self { state }
    }

    /// The ledger being driven.
    pub fn state(&self) -> &LedgerState {
        &self.state
    }

    /// Mutable ledger access, for between-day scenario injections.
    pub fn state_mut(&mut self) -> &mut LedgerState {
        &mut self.state
    }

    /// Consume the orchestrator and return the ledger.
    pub fn into_state(self) -> LedgerState {
        self.state
    }

    /// Run one full day: marker, settlement, clearing, day increment.
    ///
    /// Global invariants are verified at every phase boundary; a
    /// violation is a bug in an operation and panics.
    pub fn run_day(&mut self) -> DayResult {
        let day = self.state.day();

        self.state.set_phase(Phase::BeginDay);
        let phase = self.state.phase();
        self.state.log(Event::DayStarted { day, phase });
        self.state.assert_invariants();

        self.state.set_phase(Phase::Settlement);
        let outcomes = run_settlement(&mut self.state, day);
        self.state.assert_invariants();

        self.state.set_phase(Phase::Clearing);
        let clearing = run_clearing(&mut self.state, day);
        self.state.assert_invariants();

        let cleared = clearing
            .iter()
            .filter(|o| matches!(o, ClearingOutcome::Cleared { .. }))
            .count();
        let deferred = clearing.len() - cleared;
        let impactful = self
            .state
            .events()
            .events_on_day(day)
            .iter()
            .any(|e| e.is_impactful());

        self.state.advance_day();

        DayResult {
            day,
            outcomes,
            cleared,
            deferred,
            impactful,
        }
    }

    /// Run days until the system is stable or `max_days` have elapsed.
    ///
    /// Stable means `quiet_days` consecutive days produced no impactful
    /// event AND no payment or delivery obligation remains outstanding.
    /// Deferred nets become obligations due the next day, so a deferral
    /// keeps the run alive until it resolves.
    pub fn run_until_stable(&mut self, max_days: usize, quiet_days: usize) -> RunReport {
        let mut consecutive_quiet = 0;
        let mut days_run = 0;
        let mut defaults = 0;

        while days_run < max_days {
            let result = self.run_day();
            days_run += 1;
            defaults += result.defaults();

            if result.impactful {
                consecutive_quiet = 0;
            } else {
                consecutive_quiet += 1;
            }
            if consecutive_quiet >= quiet_days && !self.state.has_outstanding_obligations() {
                return RunReport {
                    stable: true,
                    days_run,
                    defaults,
                };
            }
        }
        RunReport {
            stable: false,
            days_run,
            defaults,
        }
    }
}
