//! Settlement engine (Phase B).
//!
//! Processes every obligation due on the current day, sorted by
//! instrument id so the order is creation order and identical across
//! runs. Each obligation settles inside its own atomic scope: either the
//! full amount moves and the obligation is deleted, or every transfer is
//! rolled back and the outcome is a default. Default is a first-class
//! outcome, never an error; the engine itself cannot fail.

use crate::ledger::{LedgerError, LedgerState};
use crate::models::event::Event;
use crate::models::instrument::{InstrumentClass, InstrumentId, InstrumentKind};
use crate::policy::SettlementMethod;

/// Terminal outcome of one due obligation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementOutcome {
    /// The full amount moved and the obligation was extinguished.
    Settled {
        obligation: InstrumentId,
        amount: i64,
    },
    /// Holdings could not cover the amount; all transfers were rolled
    /// back and the obligation remains on the books.
    Defaulted {
        obligation: InstrumentId,
        shortfall: i64,
    },
}

impl SettlementOutcome {
    pub fn is_default(&self) -> bool {
        matches!(self, SettlementOutcome::Defaulted { .. })
    }
}

/// Settle every obligation due on `day`, one atomic scope each.
///
/// Payables walk the debtor's ranked settlement methods, each paying as
/// much of the remaining amount as the debtor's holdings allow.
/// Deliverables move goods FIFO across the debtor's matching-SKU lots.
/// A shortfall rolls the obligation's scope back and yields
/// `Defaulted { shortfall }`, logged as `ObligationDefaulted` after the
/// rollback so the record survives it.
pub fn run_settlement(state: &mut LedgerState, day: usize) -> Vec<SettlementOutcome> {
    let mut due: Vec<InstrumentId> = state
        .instruments()
        .values()
        .filter(|ins| ins.kind().due_day() == Some(day))
        .map(|ins| ins.id())
        .collect();
    due.sort_unstable();

    let mut outcomes = Vec::with_capacity(due.len());
    for id in due {
        outcomes.push(settle_one(state, id));
    }
    outcomes
}

fn settle_one(state: &mut LedgerState, id: InstrumentId) -> SettlementOutcome {
    let Some(ins) = state.get_instrument(id) else {
        // Extinguished earlier today (e.g., cancelled); nothing due.
        return SettlementOutcome::Settled {
            obligation: id,
            amount: 0,
        };
    };
    let debtor = ins.issuer().to_string();
    let creditor = ins.holder().to_string();
    let amount = ins.amount();
    let kind = ins.kind().clone();

    let result = state.atomic(|s| {
        match &kind {
            InstrumentKind::Payable { .. } => pay_obligation(s, &debtor, &creditor, amount)?,
            InstrumentKind::Deliverable { sku, .. } => {
                s.transfer_goods(&debtor, &creditor, sku, amount)?
            }
            _ => {
                return Err(LedgerError::InvalidOperation(format!(
                    "{id} is not an obligation"
                )))
            }
        }
        s.settle_obligation(id)
    });

    match result {
        Ok(()) => SettlementOutcome::Settled {
            obligation: id,
            amount,
        },
        Err(err) => {
            let shortfall = match err {
                LedgerError::InsufficientFunds {
                    required,
                    available,
                } => required - available,
                _ => amount,
            };
            // Logged outside the scope so the record survives the rollback.
            let (day, phase) = (state.day(), state.phase());
            state.log(Event::ObligationDefaulted {
                day,
                phase,
                instrument: id,
                debtor,
                creditor,
                shortfall,
            });
            SettlementOutcome::Defaulted {
                obligation: id,
                shortfall,
            }
        }
    }
}

/// Pay `amount` from debtor to creditor, walking the debtor's ranked
/// methods. A method with nothing usable contributes zero; any remainder
/// after the last method is an `InsufficientFunds` that unwinds the
/// enclosing scope.
fn pay_obligation(
    state: &mut LedgerState,
    debtor: &str,
    creditor: &str,
    amount: i64,
) -> Result<(), LedgerError> {
    let debtor_kind = state.agent_ref(debtor)?.kind();
    let creditor_kind = state.agent_ref(creditor)?.kind();
    let methods = state.policy().usable_methods(debtor, debtor_kind);

    let mut remaining = amount;
    for method in methods {
        if remaining == 0 {
            break;
        }
        let take = match method {
            SettlementMethod::Deposit => remaining.min(state.deposit_balance(debtor)),
            SettlementMethod::Cash => remaining.min(state.cash_balance(debtor)),
            SettlementMethod::Reserves => {
                if state
                    .policy()
                    .can_hold(InstrumentClass::Reserves, creditor_kind)
                {
                    remaining.min(state.reserve_balance(debtor))
                } else {
                    0
                }
            }
        };
        if take == 0 {
            continue;
        }
        match method {
            SettlementMethod::Deposit => state.pay_by_deposit(debtor, creditor, take)?,
            SettlementMethod::Cash => state.transfer_cash(debtor, creditor, take)?,
            SettlementMethod::Reserves => state.transfer_reserves(debtor, creditor, take)?,
        }
        remaining -= take;
    }
    if remaining > 0 {
        return Err(LedgerError::InsufficientFunds {
            required: amount,
            available: amount - remaining,
        });
    }
    Ok(())
}
