//! Instrument model
//!
//! A bilateral claim between a holder (asset side) and an issuer
//! (liability side). Kinds form a closed tagged enum with kind-specific
//! payload fields; all routing logic matches exhaustively on the tag
//! rather than dispatching on strings.
//!
//! CRITICAL: All money values are i64 (minor units).
//!
//! # Lifecycle
//!
//! Created by minting or contract registration; mutated by `split`
//! (shrink + spawn twin) and `merge` (absorb + delete); destroyed at zero
//! amount or full settlement/cancellation.

use crate::ledger::LedgerError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Registry-assigned instrument identifier.
///
/// Ids are monotonic within a run, so sorting by id is creation order and
/// is stable across runs with the same scenario. Settlement relies on
/// this for its canonical processing order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct InstrumentId(u64);

impl InstrumentId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for InstrumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ins_{:08}", self.0)
    }
}

/// Instrument kind tag with kind-specific payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstrumentKind {
    /// Bearer claim on the issuing authority (cash-like, freely transferable).
    Cash,
    /// Claim on an intermediary institution, transferable among its customers.
    Deposit,
    /// Settlement asset: claim on the issuing authority restricted to
    /// intermediary institutions.
    Reserves,
    /// Scheduled bilateral promise to pay a monetary amount by a due day.
    Payable { due_day: usize },
    /// Scheduled bilateral promise to deliver goods by a due day.
    /// `amount` on the instrument is the quantity owed.
    Deliverable {
        due_day: usize,
        sku: String,
        unit_price: i64,
    },
}

impl InstrumentKind {
    /// Payload-free discriminant, used by the policy table.
    pub fn class(&self) -> InstrumentClass {
        match self {
            InstrumentKind::Cash => InstrumentClass::Cash,
            InstrumentKind::Deposit => InstrumentClass::Deposit,
            InstrumentKind::Reserves => InstrumentClass::Reserves,
            InstrumentKind::Payable { .. } => InstrumentClass::Payable,
            InstrumentKind::Deliverable { .. } => InstrumentClass::Deliverable,
        }
    }

    /// Due day for obligation kinds, `None` for claims.
    pub fn due_day(&self) -> Option<usize> {
        match self {
            InstrumentKind::Payable { due_day } => Some(*due_day),
            InstrumentKind::Deliverable { due_day, .. } => Some(*due_day),
            _ => None,
        }
    }

    /// Whether this kind is a scheduled obligation rather than a claim.
    pub fn is_obligation(&self) -> bool {
        matches!(
            self,
            InstrumentKind::Payable { .. } | InstrumentKind::Deliverable { .. }
        )
    }
}

/// Payload-free kind tag for authorization tables and reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstrumentClass {
    Cash,
    Deposit,
    Reserves,
    Payable,
    Deliverable,
}

/// Attribute tuple determining whether two instruments may be merged.
///
/// The kind payload participates: obligations with different due days (or
/// different SKU / unit price) are never fungible — merging them would
/// change default timing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FungibilityKey {
    pub kind: InstrumentKind,
    pub denomination: String,
    pub issuer: String,
    pub holder: String,
}

/// A bilateral financial instrument.
///
/// Field invariants, checked at construction: `holder != issuer` and
/// `amount >= 0`.
///
/// # Example
/// ```
/// use ledger_engine_core_rs::{Instrument, InstrumentId, InstrumentKind};
///
/// let ins = Instrument::new(
///     InstrumentId::new(1),
///     InstrumentKind::Cash,
///     1_000,
///     "USD",
///     "H1",
///     "CB",
/// )
/// .unwrap();
/// assert_eq!(ins.amount(), 1_000);
/// assert_eq!(ins.holder(), "H1");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    id: InstrumentId,
    kind: InstrumentKind,
    /// Amount in minor units; for deliverables, the quantity owed.
    amount: i64,
    denomination: String,
    /// Asset-holder reference.
    holder: String,
    /// Liability-issuer reference.
    issuer: String,
}

impl Instrument {
    /// Construct an instrument, validating its field invariants.
    pub fn new(
        id: InstrumentId,
        kind: InstrumentKind,
        amount: i64,
        denomination: impl Into<String>,
        holder: impl Into<String>,
        issuer: impl Into<String>,
    ) -> Result<Self, LedgerError> {
        let holder = holder.into();
        let issuer = issuer.into();
        if amount < 0 {
            return Err(LedgerError::InvalidOperation(format!(
                "instrument {id} amount must be non-negative, got {amount}"
            )));
        }
        if holder == issuer {
            return Err(LedgerError::InvalidOperation(format!(
                "instrument {id} holder and issuer must differ ({holder})"
            )));
        }
        Ok(Self {
            id,
            kind,
            amount,
            denomination: denomination.into(),
            holder,
            issuer,
        })
    }

    pub fn id(&self) -> InstrumentId {
        self.id
    }

    pub fn kind(&self) -> &InstrumentKind {
        &self.kind
    }

    pub fn class(&self) -> InstrumentClass {
        self.kind.class()
    }

    pub fn amount(&self) -> i64 {
        self.amount
    }

    pub fn denomination(&self) -> &str {
        &self.denomination
    }

    pub fn holder(&self) -> &str {
        &self.holder
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Key deciding merge eligibility: equal keys are the only mergeable pairs.
    pub fn fungibility_key(&self) -> FungibilityKey {
        FungibilityKey {
            kind: self.kind.clone(),
            denomination: self.denomination.clone(),
            issuer: self.issuer.clone(),
            holder: self.holder.clone(),
        }
    }

    /// Spawn a twin with identical attributes under a fresh id.
    pub(crate) fn twin(&self, id: InstrumentId, amount: i64) -> Self {
        Self {
            id,
            kind: self.kind.clone(),
            amount,
            denomination: self.denomination.clone(),
            holder: self.holder.clone(),
            issuer: self.issuer.clone(),
        }
    }

    pub(crate) fn shrink(&mut self, amount: i64) {
        debug_assert!(amount > 0 && amount <= self.amount);
        self.amount -= amount;
    }

    pub(crate) fn grow(&mut self, amount: i64) {
        debug_assert!(amount >= 0);
        self.amount += amount;
    }

    pub(crate) fn set_holder(&mut self, holder: &str) {
        debug_assert_ne!(holder, self.issuer, "holder must differ from issuer");
        self.holder = holder.to_string();
    }
}
