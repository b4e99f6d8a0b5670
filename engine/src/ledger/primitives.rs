//! Instrument and stock primitives: split, merge, consume.
//!
//! These preserve fungibility: a split spawns a twin with identical
//! attributes, and only instruments with equal fungibility keys may
//! merge. All primitives join the enclosing atomic scope, so a failed
//! operation sequence leaves no partial trace.

use crate::ledger::state::LedgerState;
use crate::ledger::LedgerError;
use crate::models::event::Event;
use crate::models::instrument::{InstrumentClass, InstrumentId};
use crate::models::lot::LotId;

impl LedgerState {
    /// Split `amount` off an instrument into a freshly registered twin.
    ///
    /// Requires `0 < amount < current_amount`. The original shrinks; the
    /// twin carries identical attributes and is referenced by the same
    /// holder and issuer.
    ///
    /// # Example
    /// ```
    /// use ledger_engine_core_rs::{Agent, AgentKind, LedgerState};
    ///
    /// let mut state = LedgerState::new("USD");
    /// let id = state
    ///     .setup(|s| {
    ///         s.add_agent(Agent::new("CB", "Central Bank", AgentKind::CentralBank))?;
    ///         s.add_agent(Agent::new("H1", "Household", AgentKind::Household))?;
    ///         s.mint_cash("H1", 1_000)
    ///     })
    ///     .unwrap();
    ///
    /// let twin = state.split(id, 400).unwrap();
    /// assert_eq!(state.get_instrument(id).unwrap().amount(), 600);
    /// assert_eq!(state.get_instrument(twin).unwrap().amount(), 400);
    /// ```
    pub fn split(&mut self, id: InstrumentId, amount: i64) -> Result<InstrumentId, LedgerError> {
        self.scoped(|s| {
            let current = s.instrument_ref(id)?.amount();
            if amount <= 0 || amount >= current {
                return Err(LedgerError::InvalidOperation(format!(
                    "cannot split {amount} from {id} holding {current}"
                )));
            }
            let twin_id = s.alloc_instrument_id();
            let (twin, holder, issuer) = {
                let original = s.instrument_mut(id)?;
                original.shrink(amount);
                (
                    original.twin(twin_id, amount),
                    original.holder().to_string(),
                    original.issuer().to_string(),
                )
            };
            s.put_instrument(twin);
            s.agent_mut(&holder)?.add_asset(twin_id);
            s.agent_mut(&issuer)?.add_liability(twin_id);
            Ok(twin_id)
        })
    }

    /// Merge `absorb` into `keep`: requires equal fungibility keys.
    ///
    /// The kept instrument grows by the absorbed amount; the absorbed
    /// instrument and all references to it are deleted. A merge of an
    /// instrument with itself is a no-op.
    pub fn merge(&mut self, keep: InstrumentId, absorb: InstrumentId) -> Result<(), LedgerError> {
        if keep == absorb {
            return Ok(());
        }
        self.scoped(|s| {
            let keep_key = s.instrument_ref(keep)?.fungibility_key();
            let absorb_key = s.instrument_ref(absorb)?.fungibility_key();
            if keep_key != absorb_key {
                return Err(LedgerError::IncompatibleInstruments {
                    a: keep,
                    b: absorb,
                });
            }
            let absorbed = s.take_instrument(absorb)?;
            s.agent_mut(absorbed.holder())?.remove_asset(absorb);
            s.agent_mut(absorbed.issuer())?.remove_liability(absorb);
            s.instrument_mut(keep)?.grow(absorbed.amount());
            let (day, phase) = (s.day(), s.phase());
            s.log(Event::Merged {
                day,
                phase,
                kept: keep,
                absorbed: absorb,
                amount: absorbed.amount(),
            });
            Ok(())
        })
    }

    /// Consume `amount` from an instrument, deleting it at zero.
    ///
    /// Requires `0 < amount <= current_amount`.
    pub fn consume(&mut self, id: InstrumentId, amount: i64) -> Result<(), LedgerError> {
        self.scoped(|s| {
            let current = s.instrument_ref(id)?.amount();
            if amount <= 0 || amount > current {
                return Err(LedgerError::InvalidOperation(format!(
                    "cannot consume {amount} from {id} holding {current}"
                )));
            }
            if amount == current {
                let removed = s.take_instrument(id)?;
                s.agent_mut(removed.holder())?.remove_asset(id);
                s.agent_mut(removed.issuer())?.remove_liability(id);
            } else {
                s.instrument_mut(id)?.shrink(amount);
            }
            Ok(())
        })
    }

    /// Split `quantity` off a lot into a freshly registered twin.
    ///
    /// Requires `0 < quantity < current_quantity` and a divisible lot.
    pub fn split_lot(&mut self, id: LotId, quantity: i64) -> Result<LotId, LedgerError> {
        self.scoped(|s| {
            let lot = s.lot_ref(id)?;
            if !lot.is_divisible() {
                return Err(LedgerError::InvalidOperation(format!(
                    "lot {id} is indivisible"
                )));
            }
            let current = lot.quantity();
            if quantity <= 0 || quantity >= current {
                return Err(LedgerError::InvalidOperation(format!(
                    "cannot split {quantity} from {id} holding {current}"
                )));
            }
            let twin_id = s.alloc_lot_id();
            let (twin, owner) = {
                let original = s.lot_mut(id)?;
                original.shrink(quantity);
                (original.twin(twin_id, quantity), original.owner().to_string())
            };
            s.put_lot(twin);
            s.agent_mut(&owner)?.add_lot(twin_id);
            Ok(twin_id)
        })
    }

    /// Merge lot `absorb` into `keep`: requires equal fungibility keys
    /// (SKU, unit price, owner).
    pub fn merge_lots(&mut self, keep: LotId, absorb: LotId) -> Result<(), LedgerError> {
        if keep == absorb {
            return Ok(());
        }
        self.scoped(|s| {
            let keep_key = s.lot_ref(keep)?.fungibility_key();
            let absorb_key = s.lot_ref(absorb)?.fungibility_key();
            if keep_key != absorb_key {
                return Err(LedgerError::IncompatibleLots { a: keep, b: absorb });
            }
            let absorbed = s.take_lot(absorb)?;
            s.agent_mut(absorbed.owner())?.remove_lot(absorb);
            s.lot_mut(keep)?.grow(absorbed.quantity());
            let (day, phase) = (s.day(), s.phase());
            s.log(Event::LotsMerged {
                day,
                phase,
                kept: keep,
                absorbed: absorb,
                quantity: absorbed.quantity(),
            });
            Ok(())
        })
    }

    /// Consume `quantity` from a lot, deleting it when emptied.
    pub fn consume_lot(&mut self, id: LotId, quantity: i64) -> Result<(), LedgerError> {
        self.scoped(|s| {
            let current = s.lot_ref(id)?.quantity();
            if quantity <= 0 || quantity > current {
                return Err(LedgerError::InvalidOperation(format!(
                    "cannot consume {quantity} from {id} holding {current}"
                )));
            }
            if quantity == current {
                let removed = s.take_lot(id)?;
                s.agent_mut(removed.owner())?.remove_lot(id);
            } else {
                s.lot_mut(id)?.shrink(quantity);
            }
            Ok(())
        })
    }

    /// Merge all of an agent's same-key holdings in one class down to one
    /// instrument per fungibility key. Used opportunistically after
    /// transfers to keep holdings compact.
    pub(crate) fn merge_holdings(
        &mut self,
        owner: &str,
        class: InstrumentClass,
    ) -> Result<(), LedgerError> {
        self.scoped(|s| {
            let mut ids: Vec<InstrumentId> = s
                .agent_ref(owner)?
                .assets()
                .iter()
                .copied()
                .filter(|id| {
                    s.get_instrument(*id)
                        .map(|ins| ins.class() == class)
                        .unwrap_or(false)
                })
                .collect();
            ids.sort_unstable();

            let mut kept: Vec<InstrumentId> = Vec::new();
            for id in ids {
                let key = s.instrument_ref(id)?.fungibility_key();
                let target = kept
                    .iter()
                    .copied()
                    .find(|k| {
                        s.get_instrument(*k)
                            .map(|ins| ins.fungibility_key() == key)
                            .unwrap_or(false)
                    });
                match target {
                    Some(keep) => s.merge(keep, id)?,
                    None => kept.push(id),
                }
            }
            Ok(())
        })
    }

    /// Lot analog of `merge_holdings` for one SKU.
    pub(crate) fn merge_lots_of(&mut self, owner: &str, sku: &str) -> Result<(), LedgerError> {
        self.scoped(|s| {
            let mut ids: Vec<LotId> = s
                .agent_ref(owner)?
                .lots()
                .iter()
                .copied()
                .filter(|id| {
                    s.get_lot(*id)
                        .map(|lot| lot.sku() == sku)
                        .unwrap_or(false)
                })
                .collect();
            ids.sort_unstable();

            let mut kept: Vec<LotId> = Vec::new();
            for id in ids {
                let key = s.lot_ref(id)?.fungibility_key();
                let target = kept.iter().copied().find(|k| {
                    s.get_lot(*k)
                        .map(|lot| lot.fungibility_key() == key)
                        .unwrap_or(false)
                });
                match target {
                    Some(keep) => s.merge_lots(keep, id)?,
                    None => kept.push(id),
                }
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::agent::{Agent, AgentKind};

    fn state_with_cash(amount: i64) -> (LedgerState, InstrumentId) {
        let mut state = LedgerState::new("USD");
        let id = state
            .setup(|s| {
                s.add_agent(Agent::new("CB", "Central Bank", AgentKind::CentralBank))?;
                s.add_agent(Agent::new("H1", "Household", AgentKind::Household))?;
                s.mint_cash("H1", amount)
            })
            .unwrap();
        (state, id)
    }

    #[test]
    fn test_split_rejects_whole_amount() {
        let (mut state, id) = state_with_cash(100);
        assert!(matches!(
            state.split(id, 100),
            Err(LedgerError::InvalidOperation(_))
        ));
        assert!(matches!(
            state.split(id, 0),
            Err(LedgerError::InvalidOperation(_))
        ));
    }

    #[test]
    fn test_split_merge_round_trip() {
        let (mut state, id) = state_with_cash(100);
        let twin = state.split(id, 30).unwrap();
        assert_eq!(state.get_instrument(id).unwrap().amount(), 70);
        assert_eq!(state.get_instrument(twin).unwrap().amount(), 30);

        state.merge(id, twin).unwrap();
        assert_eq!(state.get_instrument(id).unwrap().amount(), 100);
        assert!(state.get_instrument(twin).is_none());
        state.assert_invariants();
    }

    #[test]
    fn test_merge_self_is_noop() {
        let (mut state, id) = state_with_cash(100);
        state.merge(id, id).unwrap();
        assert_eq!(state.get_instrument(id).unwrap().amount(), 100);
    }

    #[test]
    fn test_merge_incompatible_keys() {
        let mut state = LedgerState::new("USD");
        let (a, b) = state
            .setup(|s| {
                s.add_agent(Agent::new("CB", "Central Bank", AgentKind::CentralBank))?;
                s.add_agent(Agent::new("H1", "Household One", AgentKind::Household))?;
                s.add_agent(Agent::new("H2", "Household Two", AgentKind::Household))?;
                let a = s.mint_cash("H1", 100)?;
                let b = s.mint_cash("H2", 100)?;
                Ok((a, b))
            })
            .unwrap();
        assert_eq!(
            state.merge(a, b),
            Err(LedgerError::IncompatibleInstruments { a, b })
        );
    }

    #[test]
    fn test_consume_deletes_at_zero() {
        let (mut state, id) = state_with_cash(100);
        state.consume(id, 40).unwrap();
        assert_eq!(state.get_instrument(id).unwrap().amount(), 60);

        state.consume(id, 60).unwrap();
        assert!(state.get_instrument(id).is_none());
        assert!(state.get_agent("H1").unwrap().assets().is_empty());
        assert!(state.get_agent("CB").unwrap().liabilities().is_empty());
    }

    #[test]
    fn test_consume_over_balance_rejected() {
        let (mut state, id) = state_with_cash(100);
        assert!(matches!(
            state.consume(id, 101),
            Err(LedgerError::InvalidOperation(_))
        ));
        assert_eq!(state.get_instrument(id).unwrap().amount(), 100);
    }

    #[test]
    fn test_lot_split_requires_divisible() {
        let mut state = LedgerState::new("USD");
        let lot = state
            .setup(|s| {
                s.add_agent(Agent::new("CB", "Central Bank", AgentKind::CentralBank))?;
                s.add_agent(Agent::new("F1", "Firm", AgentKind::Firm))?;
                s.add_lot("F1", "WIDGET", 10, 250, false)
            })
            .unwrap();
        assert!(matches!(
            state.split_lot(lot, 4),
            Err(LedgerError::InvalidOperation(_))
        ));
    }

    #[test]
    fn test_lot_split_merge_round_trip() {
        let mut state = LedgerState::new("USD");
        let lot = state
            .setup(|s| {
                s.add_agent(Agent::new("CB", "Central Bank", AgentKind::CentralBank))?;
                s.add_agent(Agent::new("F1", "Firm", AgentKind::Firm))?;
                s.add_lot("F1", "WIDGET", 10, 250, true)
            })
            .unwrap();
        let twin = state.split_lot(lot, 4).unwrap();
        assert_eq!(state.get_lot(lot).unwrap().quantity(), 6);
        assert_eq!(state.get_lot(twin).unwrap().quantity(), 4);

        state.merge_lots(lot, twin).unwrap();
        assert_eq!(state.get_lot(lot).unwrap().quantity(), 10);
        assert!(state.get_lot(twin).is_none());
        state.assert_invariants();
    }
}
