//! Intraday clearing engine (Phase C).
//!
//! Nets the day's interbank exposures created by cross-institution
//! client payments and settles each non-zero net once, in the
//! settlement asset. A net that cannot be settled is deferred to an
//! overnight obligation due the next day; deferral is the designed
//! fallback, so the engine never raises.

use crate::ledger::LedgerState;
use crate::models::event::Event;
use crate::models::instrument::InstrumentKind;
use std::collections::BTreeMap;

/// Terminal outcome of one netted interbank pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClearingOutcome {
    /// The net moved in the settlement asset.
    Cleared {
        debtor_bank: String,
        creditor_bank: String,
        amount: i64,
    },
    /// The net was rolled into an overnight obligation due `due_day`.
    Deferred {
        debtor_bank: String,
        creditor_bank: String,
        amount: i64,
        due_day: usize,
    },
}

impl ClearingOutcome {
    pub fn is_deferred(&self) -> bool {
        matches!(self, ClearingOutcome::Deferred { .. })
    }
}

/// Net and settle the interbank exposures recorded on `day`.
///
/// Exposures accumulate per unordered institution pair under a canonical
/// `(smaller, larger)` key; the signed net is positive when the smaller
/// id owes the larger. Two passes: all nets are computed from the event
/// log first, then each non-zero net settles exactly once, pairs in key
/// order.
pub fn run_clearing(state: &mut LedgerState, day: usize) -> Vec<ClearingOutcome> {
    // Pass one: signed nets per canonical pair.
    let mut nets: BTreeMap<(String, String), i64> = BTreeMap::new();
    for event in state.events().events_on_day(day) {
        let Event::ClientPayment {
            debtor_bank,
            creditor_bank,
            amount,
            ..
        } = event
        else {
            continue;
        };
        if debtor_bank == creditor_bank {
            continue;
        }
        let (key, signed) = if debtor_bank < creditor_bank {
            ((debtor_bank.clone(), creditor_bank.clone()), *amount)
        } else {
            ((creditor_bank.clone(), debtor_bank.clone()), -*amount)
        };
        *nets.entry(key).or_insert(0) += signed;
    }

    // Pass two: settle each non-zero net once.
    let mut outcomes = Vec::new();
    for ((a, b), net) in nets {
        if net == 0 {
            continue;
        }
        let (debtor, creditor, amount) = if net > 0 { (a, b, net) } else { (b, a, -net) };
        outcomes.push(settle_net(state, &debtor, &creditor, amount, day));
    }
    outcomes
}

fn settle_net(
    state: &mut LedgerState,
    debtor: &str,
    creditor: &str,
    amount: i64,
    day: usize,
) -> ClearingOutcome {
    let attempt = state.atomic(|s| {
        s.transfer_reserves(debtor, creditor, amount)?;
        let (day, phase) = (s.day(), s.phase());
        s.log(Event::Cleared {
            day,
            phase,
            debtor_bank: debtor.to_string(),
            creditor_bank: creditor.to_string(),
            amount,
        });
        Ok(())
    });
    if attempt.is_ok() {
        return ClearingOutcome::Cleared {
            debtor_bank: debtor.to_string(),
            creditor_bank: creditor.to_string(),
            amount,
        };
    }

    // Fallback: roll the net into an overnight obligation.
    let due_day = day + 1;
    let deferred = state.atomic(|s| {
        s.add_contract(
            InstrumentKind::Payable { due_day },
            amount,
            creditor,
            debtor,
        )?;
        let (day, phase) = (s.day(), s.phase());
        s.log(Event::Deferred {
            day,
            phase,
            debtor_bank: debtor.to_string(),
            creditor_bank: creditor.to_string(),
            amount,
            due_day,
        });
        Ok(())
    });
    if let Err(err) = deferred {
        // Both institutions exist and anyone may issue a payable; a
        // failure here means the registry is corrupt, same class as an
        // invariant violation.
        panic!("overnight deferral of {amount} from {debtor} to {creditor} failed: {err}");
    }
    ClearingOutcome::Deferred {
        debtor_bank: debtor.to_string(),
        creditor_bank: creditor.to_string(),
        amount,
        due_day,
    }
}
