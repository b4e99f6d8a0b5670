//! Registry operations: minting, transfers, deposits, conversions,
//! obligation lifecycle, and inventory movement.
//!
//! Every operation here is a public top-level mutation: it opens (or
//! joins) one atomic scope, checks preconditions before touching state,
//! and appends events tagged with the current day and phase. Policy is
//! enforced on every addition to the registry.

use crate::ledger::state::LedgerState;
use crate::ledger::LedgerError;
use crate::models::event::Event;
use crate::models::instrument::{Instrument, InstrumentClass, InstrumentId, InstrumentKind};
use crate::models::lot::{InventoryLot, LotId};

impl LedgerState {
    /// Register a bilateral instrument between two existing agents.
    ///
    /// Runs the instrument's own field invariants, then the policy
    /// engine's issue/hold authorization, then registers the instrument
    /// and appends both references. Obligation kinds log
    /// `ObligationCreated`.
    pub fn add_contract(
        &mut self,
        kind: InstrumentKind,
        amount: i64,
        holder: &str,
        issuer: &str,
    ) -> Result<InstrumentId, LedgerError> {
        self.scoped(|s| {
            if amount <= 0 {
                return Err(LedgerError::InvalidOperation(format!(
                    "contract amount must be positive, got {amount}"
                )));
            }
            let holder_kind = s.agent_ref(holder)?.kind();
            let issuer_kind = s.agent_ref(issuer)?.kind();
            let class = kind.class();
            if !s.policy().can_issue(class, issuer_kind) {
                return Err(LedgerError::PolicyViolation {
                    agent: issuer.to_string(),
                    agent_kind: issuer_kind.name(),
                    action: "issue",
                    class,
                });
            }
            if !s.policy().can_hold(class, holder_kind) {
                return Err(LedgerError::PolicyViolation {
                    agent: holder.to_string(),
                    agent_kind: holder_kind.name(),
                    action: "hold",
                    class,
                });
            }
            let id = s.alloc_instrument_id();
            let denomination = s.denomination().to_string();
            let instrument = Instrument::new(id, kind.clone(), amount, denomination, holder, issuer)?;
            s.put_instrument(instrument);
            s.agent_mut(holder)?.add_asset(id);
            s.agent_mut(issuer)?.add_liability(id);
            if let Some(due_day) = kind.due_day() {
                let (day, phase) = (s.day(), s.phase());
                s.log(Event::ObligationCreated {
                    day,
                    phase,
                    instrument: id,
                    class,
                    debtor: issuer.to_string(),
                    creditor: holder.to_string(),
                    amount,
                    due_day,
                });
            }
            Ok(id)
        })
    }

    /// Mint bearer claims from the issuing authority to `holder`.
    ///
    /// Locates the unique central bank (`MissingIssuer` otherwise),
    /// registers the claim, and bumps the outstanding counter — one
    /// atomic scope.
    pub fn mint_cash(&mut self, holder: &str, amount: i64) -> Result<InstrumentId, LedgerError> {
        self.mint_claim(InstrumentKind::Cash, holder, amount)
    }

    /// Mint settlement-asset claims to `holder` (an intermediary
    /// institution, per policy).
    pub fn mint_reserves(
        &mut self,
        holder: &str,
        amount: i64,
    ) -> Result<InstrumentId, LedgerError> {
        self.mint_claim(InstrumentKind::Reserves, holder, amount)
    }

    fn mint_claim(
        &mut self,
        kind: InstrumentKind,
        holder: &str,
        amount: i64,
    ) -> Result<InstrumentId, LedgerError> {
        self.scoped(|s| {
            if amount <= 0 {
                return Err(LedgerError::InvalidOperation(format!(
                    "mint amount must be positive, got {amount}"
                )));
            }
            let issuer = s.central_bank_id()?;
            let class = kind.class();
            let id = s.add_contract(kind, amount, holder, &issuer)?;
            match class {
                InstrumentClass::Cash => s.add_cash_outstanding(amount),
                InstrumentClass::Reserves => s.add_reserves_outstanding(amount),
                _ => unreachable!("mint_claim is only called for cash and reserves"),
            }
            let (day, phase) = (s.day(), s.phase());
            s.log(Event::ClaimMinted {
                day,
                phase,
                instrument: id,
                class,
                issuer,
                holder: holder.to_string(),
                amount,
            });
            Ok(id)
        })
    }

    /// Transfer bearer claims by holder reassignment, splitting the last
    /// touched piece on overshoot and merging the receiver's same-key
    /// pieces afterwards. `InsufficientFunds` (fully rolled back) on
    /// shortfall.
    pub fn transfer_cash(&mut self, from: &str, to: &str, amount: i64) -> Result<(), LedgerError> {
        self.scoped(|s| s.transfer_claim(InstrumentClass::Cash, from, to, amount))
    }

    /// Transfer settlement-asset claims between institutions.
    pub fn transfer_reserves(
        &mut self,
        from: &str,
        to: &str,
        amount: i64,
    ) -> Result<(), LedgerError> {
        self.scoped(|s| s.transfer_claim(InstrumentClass::Reserves, from, to, amount))
    }

    fn transfer_claim(
        &mut self,
        class: InstrumentClass,
        from: &str,
        to: &str,
        amount: i64,
    ) -> Result<(), LedgerError> {
        if amount <= 0 {
            return Err(LedgerError::InvalidOperation(format!(
                "transfer amount must be positive, got {amount}"
            )));
        }
        if from == to {
            return Err(LedgerError::InvalidOperation(format!(
                "cannot transfer from {from} to itself"
            )));
        }
        let to_kind = self.agent_ref(to)?.kind();
        if !self.policy().can_hold(class, to_kind) {
            return Err(LedgerError::PolicyViolation {
                agent: to.to_string(),
                agent_kind: to_kind.name(),
                action: "hold",
                class,
            });
        }

        let pieces = self.holdings_of_class(from, class)?;
        let available: i64 = pieces.iter().map(|(_, amt)| amt).sum();
        if available < amount {
            return Err(LedgerError::InsufficientFunds {
                required: amount,
                available,
            });
        }

        let mut remaining = amount;
        for (id, piece_amount) in pieces {
            if remaining == 0 {
                break;
            }
            let take = remaining.min(piece_amount);
            let moved = if take < piece_amount {
                self.split(id, take)?
            } else {
                id
            };
            self.agent_mut(from)?.remove_asset(moved);
            self.instrument_mut(moved)?.set_holder(to);
            self.agent_mut(to)?.add_asset(moved);
            remaining -= take;
        }

        let (day, phase) = (self.day(), self.phase());
        self.log(Event::ClaimTransferred {
            day,
            phase,
            class,
            from: from.to_string(),
            to: to.to_string(),
            amount,
        });
        self.merge_holdings(to, class)
    }

    /// Place cash with a bank in exchange for a freshly issued deposit
    /// claim.
    ///
    /// # Example
    /// ```
    /// use ledger_engine_core_rs::{Agent, AgentKind, LedgerState};
    ///
    /// let mut state = LedgerState::new("USD");
    /// state
    ///     .setup(|s| {
    ///         s.add_agent(Agent::new("CB", "Central Bank", AgentKind::CentralBank))?;
    ///         s.add_agent(Agent::new("B1", "Bank", AgentKind::Bank))?;
    ///         s.add_agent(Agent::new("H1", "Household", AgentKind::Household))?;
    ///         s.mint_cash("H1", 1_000)?;
    ///         s.make_deposit("H1", "B1", 600)
    ///     })
    ///     .unwrap();
    /// assert_eq!(state.cash_balance("H1"), 400);
    /// assert_eq!(state.deposit_balance_at("H1", "B1"), 600);
    /// assert_eq!(state.cash_balance("B1"), 600);
    /// ```
    pub fn make_deposit(
        &mut self,
        customer: &str,
        bank: &str,
        amount: i64,
    ) -> Result<InstrumentId, LedgerError> {
        self.scoped(|s| {
            s.transfer_claim(InstrumentClass::Cash, customer, bank, amount)?;
            let id = s.add_contract(InstrumentKind::Deposit, amount, customer, bank)?;
            let (day, phase) = (s.day(), s.phase());
            s.log(Event::DepositCreated {
                day,
                phase,
                instrument: id,
                bank: bank.to_string(),
                customer: customer.to_string(),
                amount,
            });
            s.merge_holdings(customer, InstrumentClass::Deposit)?;
            Ok(id)
        })
    }

    /// Redeem deposit claims at a bank for cash.
    pub fn withdraw_deposit(
        &mut self,
        customer: &str,
        bank: &str,
        amount: i64,
    ) -> Result<(), LedgerError> {
        self.scoped(|s| {
            if amount <= 0 {
                return Err(LedgerError::InvalidOperation(format!(
                    "withdrawal amount must be positive, got {amount}"
                )));
            }
            let available = s.deposit_balance_at(customer, bank);
            if available < amount {
                return Err(LedgerError::InsufficientFunds {
                    required: amount,
                    available,
                });
            }
            s.consume_deposits_at(customer, bank, amount)?;
            s.transfer_claim(InstrumentClass::Cash, bank, customer, amount)?;
            let (day, phase) = (s.day(), s.phase());
            s.log(Event::DepositWithdrawn {
                day,
                phase,
                bank: bank.to_string(),
                customer: customer.to_string(),
                amount,
            });
            Ok(())
        })
    }

    /// Convert bearer claims held by a bank into settlement assets,
    /// keeping both outstanding counters consistent.
    pub fn convert_cash_to_reserves(
        &mut self,
        bank: &str,
        amount: i64,
    ) -> Result<(), LedgerError> {
        self.scoped(|s| {
            s.retire_claim(InstrumentClass::Cash, bank, amount)?;
            let issuer = s.central_bank_id()?;
            let id = s.add_contract(InstrumentKind::Reserves, amount, bank, &issuer)?;
            s.add_reserves_outstanding(amount);
            let (day, phase) = (s.day(), s.phase());
            s.log(Event::ClaimMinted {
                day,
                phase,
                instrument: id,
                class: InstrumentClass::Reserves,
                issuer,
                holder: bank.to_string(),
                amount,
            });
            Ok(())
        })
    }

    /// Convert settlement assets held by a bank back into bearer claims.
    pub fn convert_reserves_to_cash(
        &mut self,
        bank: &str,
        amount: i64,
    ) -> Result<(), LedgerError> {
        self.scoped(|s| {
            s.retire_claim(InstrumentClass::Reserves, bank, amount)?;
            let issuer = s.central_bank_id()?;
            let id = s.add_contract(InstrumentKind::Cash, amount, bank, &issuer)?;
            s.add_cash_outstanding(amount);
            let (day, phase) = (s.day(), s.phase());
            s.log(Event::ClaimMinted {
                day,
                phase,
                instrument: id,
                class: InstrumentClass::Cash,
                issuer,
                holder: bank.to_string(),
                amount,
            });
            Ok(())
        })
    }

    fn retire_claim(
        &mut self,
        class: InstrumentClass,
        holder: &str,
        amount: i64,
    ) -> Result<(), LedgerError> {
        if amount <= 0 {
            return Err(LedgerError::InvalidOperation(format!(
                "conversion amount must be positive, got {amount}"
            )));
        }
        let pieces = self.holdings_of_class(holder, class)?;
        let available: i64 = pieces.iter().map(|(_, amt)| amt).sum();
        if available < amount {
            return Err(LedgerError::InsufficientFunds {
                required: amount,
                available,
            });
        }
        let mut remaining = amount;
        for (id, piece_amount) in pieces {
            if remaining == 0 {
                break;
            }
            let take = remaining.min(piece_amount);
            self.consume(id, take)?;
            remaining -= take;
        }
        match class {
            InstrumentClass::Cash => self.add_cash_outstanding(-amount),
            InstrumentClass::Reserves => self.add_reserves_outstanding(-amount),
            _ => unreachable!("retire_claim is only called for cash and reserves"),
        }
        let (day, phase) = (self.day(), self.phase());
        self.log(Event::ClaimRetired {
            day,
            phase,
            class,
            holder: holder.to_string(),
            amount,
        });
        Ok(())
    }

    /// Pay `creditor` from `debtor`'s deposit holdings.
    ///
    /// Same-institution pieces move by holder reassignment. A piece held
    /// at a different institution than the creditor's is consumed at the
    /// debtor's bank and re-issued at the creditor's bank, and a
    /// `ClientPayment` records the resulting interbank exposure for
    /// intraday clearing. The creditor's institution is inferred from
    /// their lowest-id deposit holding, falling back to the paying bank.
    pub fn pay_by_deposit(
        &mut self,
        debtor: &str,
        creditor: &str,
        amount: i64,
    ) -> Result<(), LedgerError> {
        self.scoped(|s| {
            if amount <= 0 {
                return Err(LedgerError::InvalidOperation(format!(
                    "payment amount must be positive, got {amount}"
                )));
            }
            if debtor == creditor {
                return Err(LedgerError::InvalidOperation(format!(
                    "cannot pay from {debtor} to itself"
                )));
            }
            let pieces = s.deposit_pieces(debtor)?;
            let available: i64 = pieces.iter().map(|(_, _, amt)| amt).sum();
            if available < amount {
                return Err(LedgerError::InsufficientFunds {
                    required: amount,
                    available,
                });
            }
            let creditor_bank = s.primary_bank_of(creditor);

            let mut remaining = amount;
            for (id, debtor_bank, piece_amount) in pieces {
                if remaining == 0 {
                    break;
                }
                let take = remaining.min(piece_amount);
                let target_bank = creditor_bank.clone().unwrap_or_else(|| debtor_bank.clone());

                if target_bank == debtor_bank {
                    if creditor == debtor_bank {
                        // Paying the bank with its own liability: redemption.
                        s.consume(id, take)?;
                    } else {
                        let moved = if take < piece_amount {
                            s.split(id, take)?
                        } else {
                            id
                        };
                        s.agent_mut(debtor)?.remove_asset(moved);
                        s.instrument_mut(moved)?.set_holder(creditor);
                        s.agent_mut(creditor)?.add_asset(moved);
                        let (day, phase) = (s.day(), s.phase());
                        s.log(Event::ClaimTransferred {
                            day,
                            phase,
                            class: InstrumentClass::Deposit,
                            from: debtor.to_string(),
                            to: creditor.to_string(),
                            amount: take,
                        });
                    }
                } else {
                    // Cross-institution leg: extinguish at the debtor's bank,
                    // re-issue at the creditor's bank, and record the
                    // interbank exposure for Phase C.
                    s.consume(id, take)?;
                    if creditor != target_bank {
                        s.add_contract(InstrumentKind::Deposit, take, creditor, &target_bank)?;
                    }
                    let (day, phase) = (s.day(), s.phase());
                    s.log(Event::ClientPayment {
                        day,
                        phase,
                        payer: debtor.to_string(),
                        payee: creditor.to_string(),
                        debtor_bank: debtor_bank.clone(),
                        creditor_bank: target_bank,
                        amount: take,
                    });
                }
                remaining -= take;
            }
            s.merge_holdings(creditor, InstrumentClass::Deposit)?;
            Ok(())
        })
    }

    /// Unconditionally extinguish a bilateral obligation whose real-world
    /// counterpart has already been enacted elsewhere.
    pub fn settle_obligation(&mut self, id: InstrumentId) -> Result<(), LedgerError> {
        self.scoped(|s| {
            let removed = s.remove_obligation(id)?;
            let (day, phase) = (s.day(), s.phase());
            s.log(Event::ObligationSettled {
                day,
                phase,
                instrument: id,
                debtor: removed.issuer().to_string(),
                creditor: removed.holder().to_string(),
                amount: removed.amount(),
            });
            Ok(())
        })
    }

    /// Delete an obligation without settlement.
    pub fn cancel_obligation(&mut self, id: InstrumentId) -> Result<(), LedgerError> {
        self.scoped(|s| {
            let removed = s.remove_obligation(id)?;
            let (day, phase) = (s.day(), s.phase());
            s.log(Event::ObligationCancelled {
                day,
                phase,
                instrument: id,
                debtor: removed.issuer().to_string(),
                creditor: removed.holder().to_string(),
                amount: removed.amount(),
            });
            Ok(())
        })
    }

    fn remove_obligation(&mut self, id: InstrumentId) -> Result<Instrument, LedgerError> {
        if !self.instrument_ref(id)?.kind().is_obligation() {
            return Err(LedgerError::InvalidOperation(format!(
                "{id} is not an obligation"
            )));
        }
        let removed = self.take_instrument(id)?;
        self.agent_mut(removed.holder())?.remove_asset(id);
        self.agent_mut(removed.issuer())?.remove_liability(id);
        Ok(removed)
    }

    /// Register a fresh inventory lot for `owner`.
    pub fn add_lot(
        &mut self,
        owner: &str,
        sku: &str,
        quantity: i64,
        unit_price: i64,
        divisible: bool,
    ) -> Result<LotId, LedgerError> {
        self.scoped(|s| {
            if quantity <= 0 {
                return Err(LedgerError::InvalidOperation(format!(
                    "lot quantity must be positive, got {quantity}"
                )));
            }
            if unit_price < 0 {
                return Err(LedgerError::InvalidOperation(format!(
                    "unit price must be non-negative, got {unit_price}"
                )));
            }
            s.agent_ref(owner)?;
            let id = s.alloc_lot_id();
            s.put_lot(InventoryLot::new(id, sku, quantity, unit_price, owner, divisible));
            s.agent_mut(owner)?.add_lot(id);
            Ok(id)
        })
    }

    /// Move `quantity` of one SKU between owners, FIFO across the
    /// sender's lots in id order, splitting the last touched lot on
    /// overshoot and merging at the receiver.
    pub fn transfer_goods(
        &mut self,
        from: &str,
        to: &str,
        sku: &str,
        quantity: i64,
    ) -> Result<(), LedgerError> {
        self.scoped(|s| {
            if quantity <= 0 {
                return Err(LedgerError::InvalidOperation(format!(
                    "transfer quantity must be positive, got {quantity}"
                )));
            }
            if from == to {
                return Err(LedgerError::InvalidOperation(format!(
                    "cannot transfer from {from} to itself"
                )));
            }
            s.agent_ref(to)?;
            let lots = s.sku_lots(from, sku)?;
            let available: i64 = lots.iter().map(|(_, qty)| qty).sum();
            if available < quantity {
                return Err(LedgerError::InsufficientFunds {
                    required: quantity,
                    available,
                });
            }
            let mut remaining = quantity;
            for (id, lot_quantity) in lots {
                if remaining == 0 {
                    break;
                }
                let take = remaining.min(lot_quantity);
                let moved = if take < lot_quantity {
                    s.split_lot(id, take)?
                } else {
                    id
                };
                s.agent_mut(from)?.remove_lot(moved);
                s.lot_mut(moved)?.set_owner(to);
                s.agent_mut(to)?.add_lot(moved);
                remaining -= take;
            }
            let (day, phase) = (s.day(), s.phase());
            s.log(Event::GoodsTransferred {
                day,
                phase,
                sku: sku.to_string(),
                from: from.to_string(),
                to: to.to_string(),
                quantity,
            });
            s.merge_lots_of(to, sku)
        })
    }

    // =========================================================================
    // Walk helpers
    // =========================================================================

    /// An agent's holdings in one class, sorted by id (creation order).
    fn holdings_of_class(
        &self,
        owner: &str,
        class: InstrumentClass,
    ) -> Result<Vec<(InstrumentId, i64)>, LedgerError> {
        let agent = self.agent_ref(owner)?;
        let mut pieces: Vec<(InstrumentId, i64)> = agent
            .assets()
            .iter()
            .filter_map(|id| self.get_instrument(*id))
            .filter(|ins| ins.class() == class)
            .map(|ins| (ins.id(), ins.amount()))
            .collect();
        pieces.sort_unstable_by_key(|(id, _)| *id);
        Ok(pieces)
    }

    /// An agent's deposit holdings with their issuing institution.
    fn deposit_pieces(&self, owner: &str) -> Result<Vec<(InstrumentId, String, i64)>, LedgerError> {
        let agent = self.agent_ref(owner)?;
        let mut pieces: Vec<(InstrumentId, String, i64)> = agent
            .assets()
            .iter()
            .filter_map(|id| self.get_instrument(*id))
            .filter(|ins| ins.class() == InstrumentClass::Deposit)
            .map(|ins| (ins.id(), ins.issuer().to_string(), ins.amount()))
            .collect();
        pieces.sort_unstable_by_key(|(id, _, _)| *id);
        Ok(pieces)
    }

    /// The institution backing an agent's lowest-id deposit holding.
    fn primary_bank_of(&self, agent_id: &str) -> Option<String> {
        self.deposit_pieces(agent_id)
            .ok()?
            .first()
            .map(|(_, bank, _)| bank.clone())
    }

    /// An agent's lots in one SKU, sorted by id (FIFO).
    fn sku_lots(&self, owner: &str, sku: &str) -> Result<Vec<(LotId, i64)>, LedgerError> {
        let agent = self.agent_ref(owner)?;
        let mut lots: Vec<(LotId, i64)> = agent
            .lots()
            .iter()
            .filter_map(|id| self.get_lot(*id))
            .filter(|lot| lot.sku() == sku)
            .map(|lot| (lot.id(), lot.quantity()))
            .collect();
        lots.sort_unstable_by_key(|(id, _)| *id);
        Ok(lots)
    }

    fn consume_deposits_at(
        &mut self,
        customer: &str,
        bank: &str,
        amount: i64,
    ) -> Result<(), LedgerError> {
        let pieces = self.deposit_pieces(customer)?;
        let mut remaining = amount;
        for (id, issuer, piece_amount) in pieces {
            if remaining == 0 {
                break;
            }
            if issuer != bank {
                continue;
            }
            let take = remaining.min(piece_amount);
            self.consume(id, take)?;
            remaining -= take;
        }
        debug_assert_eq!(remaining, 0, "availability was checked before consuming");
        Ok(())
    }
}
