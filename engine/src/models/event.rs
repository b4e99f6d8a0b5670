//! Event logging for auditing, netting, and stability detection.
//!
//! Every significant state change appends one immutable record tagged with
//! the day and phase it occurred in. The log is the sole input to the
//! clearing engine's netting pass and to the scheduler's quiet-day
//! detection; records are read-only once appended.
//!
//! Serialized with a `kind` tag so the log exports directly as
//! `{kind, day, phase, ...}` JSONL records.

use crate::core::time::Phase;
use crate::models::instrument::{InstrumentClass, InstrumentId};
use crate::models::lot::LotId;
use serde::{Deserialize, Serialize};

/// Ledger event capturing a state change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Event {
    /// Begin-of-day marker (Phase A; reserved for future hooks).
    DayStarted { day: usize, phase: Phase },

    /// A cash or reserves claim was minted by the issuing authority.
    ClaimMinted {
        day: usize,
        phase: Phase,
        instrument: InstrumentId,
        class: InstrumentClass,
        issuer: String,
        holder: String,
        amount: i64,
    },

    /// A cash or reserves claim was retired (conversion or redemption).
    ClaimRetired {
        day: usize,
        phase: Phase,
        class: InstrumentClass,
        holder: String,
        amount: i64,
    },

    /// A claim changed hands by holder reassignment.
    ClaimTransferred {
        day: usize,
        phase: Phase,
        class: InstrumentClass,
        from: String,
        to: String,
        amount: i64,
    },

    /// A customer placed cash with a bank in exchange for a deposit claim.
    DepositCreated {
        day: usize,
        phase: Phase,
        instrument: InstrumentId,
        bank: String,
        customer: String,
        amount: i64,
    },

    /// A deposit claim was redeemed for cash.
    DepositWithdrawn {
        day: usize,
        phase: Phase,
        bank: String,
        customer: String,
        amount: i64,
    },

    /// A payment or delivery obligation was registered.
    ObligationCreated {
        day: usize,
        phase: Phase,
        instrument: InstrumentId,
        class: InstrumentClass,
        debtor: String,
        creditor: String,
        amount: i64,
        due_day: usize,
    },

    /// An obligation was fully discharged and extinguished.
    ObligationSettled {
        day: usize,
        phase: Phase,
        instrument: InstrumentId,
        debtor: String,
        creditor: String,
        amount: i64,
    },

    /// An obligation was cancelled without settlement.
    ObligationCancelled {
        day: usize,
        phase: Phase,
        instrument: InstrumentId,
        debtor: String,
        creditor: String,
        amount: i64,
    },

    /// A due obligation could not be fully discharged; it remains
    /// outstanding, unchanged.
    ObligationDefaulted {
        day: usize,
        phase: Phase,
        instrument: InstrumentId,
        debtor: String,
        creditor: String,
        shortfall: i64,
    },

    /// A deposit-method payment moved value between customers of two
    /// distinct institutions, leaving the debtor's bank owing the
    /// creditor's bank. Input to intraday clearing.
    ClientPayment {
        day: usize,
        phase: Phase,
        payer: String,
        payee: String,
        debtor_bank: String,
        creditor_bank: String,
        amount: i64,
    },

    /// An intraday net between two institutions settled in reserves.
    Cleared {
        day: usize,
        phase: Phase,
        debtor_bank: String,
        creditor_bank: String,
        amount: i64,
    },

    /// An intraday net could not settle; an overnight obligation was
    /// created instead.
    Deferred {
        day: usize,
        phase: Phase,
        debtor_bank: String,
        creditor_bank: String,
        amount: i64,
        due_day: usize,
    },

    /// Two fungible instruments were merged.
    Merged {
        day: usize,
        phase: Phase,
        kept: InstrumentId,
        absorbed: InstrumentId,
        amount: i64,
    },

    /// Two fungible inventory lots were merged.
    LotsMerged {
        day: usize,
        phase: Phase,
        kept: LotId,
        absorbed: LotId,
        quantity: i64,
    },

    /// Goods changed owner.
    GoodsTransferred {
        day: usize,
        phase: Phase,
        sku: String,
        from: String,
        to: String,
        quantity: i64,
    },
}

impl Event {
    /// Day the event occurred on.
    pub fn day(&self) -> usize {
        match self {
            Event::DayStarted { day, .. } => *day,
            Event::ClaimMinted { day, .. } => *day,
            Event::ClaimRetired { day, .. } => *day,
            Event::ClaimTransferred { day, .. } => *day,
            Event::DepositCreated { day, .. } => *day,
            Event::DepositWithdrawn { day, .. } => *day,
            Event::ObligationCreated { day, .. } => *day,
            Event::ObligationSettled { day, .. } => *day,
            Event::ObligationCancelled { day, .. } => *day,
            Event::ObligationDefaulted { day, .. } => *day,
            Event::ClientPayment { day, .. } => *day,
            Event::Cleared { day, .. } => *day,
            Event::Deferred { day, .. } => *day,
            Event::Merged { day, .. } => *day,
            Event::LotsMerged { day, .. } => *day,
            Event::GoodsTransferred { day, .. } => *day,
        }
    }

    /// Phase the event occurred in.
    pub fn phase(&self) -> Phase {
        match self {
            Event::DayStarted { phase, .. } => *phase,
            Event::ClaimMinted { phase, .. } => *phase,
            Event::ClaimRetired { phase, .. } => *phase,
            Event::ClaimTransferred { phase, .. } => *phase,
            Event::DepositCreated { phase, .. } => *phase,
            Event::DepositWithdrawn { phase, .. } => *phase,
            Event::ObligationCreated { phase, .. } => *phase,
            Event::ObligationSettled { phase, .. } => *phase,
            Event::ObligationCancelled { phase, .. } => *phase,
            Event::ObligationDefaulted { phase, .. } => *phase,
            Event::ClientPayment { phase, .. } => *phase,
            Event::Cleared { phase, .. } => *phase,
            Event::Deferred { phase, .. } => *phase,
            Event::Merged { phase, .. } => *phase,
            Event::LotsMerged { phase, .. } => *phase,
            Event::GoodsTransferred { phase, .. } => *phase,
        }
    }

    /// Short description of the event type.
    pub fn event_type(&self) -> &'static str {
        match self {
            Event::DayStarted { .. } => "DayStarted",
            Event::ClaimMinted { .. } => "ClaimMinted",
            Event::ClaimRetired { .. } => "ClaimRetired",
            Event::ClaimTransferred { .. } => "ClaimTransferred",
            Event::DepositCreated { .. } => "DepositCreated",
            Event::DepositWithdrawn { .. } => "DepositWithdrawn",
            Event::ObligationCreated { .. } => "ObligationCreated",
            Event::ObligationSettled { .. } => "ObligationSettled",
            Event::ObligationCancelled { .. } => "ObligationCancelled",
            Event::ObligationDefaulted { .. } => "ObligationDefaulted",
            Event::ClientPayment { .. } => "ClientPayment",
            Event::Cleared { .. } => "Cleared",
            Event::Deferred { .. } => "Deferred",
            Event::Merged { .. } => "Merged",
            Event::LotsMerged { .. } => "LotsMerged",
            Event::GoodsTransferred { .. } => "GoodsTransferred",
        }
    }

    /// Whether the event marks settlement, clearing, or default activity.
    /// Used by the scheduler to classify a day as impactful.
    pub fn is_impactful(&self) -> bool {
        matches!(
            self,
            Event::ObligationSettled { .. }
                | Event::ObligationDefaulted { .. }
                | Event::ClientPayment { .. }
                | Event::Cleared { .. }
                | Event::Deferred { .. }
        )
    }
}

/// Append-only event log with query helpers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Append an event to the log.
    pub fn log(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// All events in append order.
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Events produced on a specific day.
    pub fn events_on_day(&self, day: usize) -> Vec<&Event> {
        self.events.iter().filter(|e| e.day() == day).collect()
    }

    /// Events of a specific type.
    pub fn events_of_type(&self, event_type: &str) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| e.event_type() == event_type)
            .collect()
    }

    pub(crate) fn truncate(&mut self, len: usize) {
        self.events.truncate(len);
    }
}
