//! Global consistency checker.
//!
//! `assert_invariants` walks the whole state and panics on the first
//! violation. It runs after setup and at every phase boundary of the day
//! cycle; a failure is a bug in an operation, never a scenario-level
//! condition, so it panics instead of returning an error.

use crate::ledger::state::LedgerState;
use crate::models::instrument::InstrumentClass;
use std::collections::BTreeSet;

impl LedgerState {
    /// Verify reference integrity, positivity, and conservation.
    ///
    /// Panics with a description of the first violated invariant:
    /// - every agent reference resolves, with no duplicates, and the
    ///   referenced entry points back at the agent
    /// - every instrument is referenced by exactly its holder (asset side)
    ///   and its issuer (liability side), and holder != issuer
    /// - every lot is referenced by exactly its owner
    /// - instrument amounts and lot quantities are positive
    /// - the outstanding counters equal the registry sums for bearer
    ///   claims and settlement assets
    pub fn assert_invariants(&self) {
        for agent in self.agents().values() {
            let mut seen = BTreeSet::new();
            for id in agent.assets() {
                assert!(seen.insert(*id), "{}: duplicate asset reference {id}", agent.id());
                let ins = self
                    .get_instrument(*id)
                    .unwrap_or_else(|| panic!("{}: dangling asset reference {id}", agent.id()));
                assert_eq!(
                    ins.holder(),
                    agent.id(),
                    "{id} is listed as an asset of {} but held by {}",
                    agent.id(),
                    ins.holder()
                );
            }
            let mut seen = BTreeSet::new();
            for id in agent.liabilities() {
                assert!(seen.insert(*id), "{}: duplicate liability reference {id}", agent.id());
                let ins = self
                    .get_instrument(*id)
                    .unwrap_or_else(|| panic!("{}: dangling liability reference {id}", agent.id()));
                assert_eq!(
                    ins.issuer(),
                    agent.id(),
                    "{id} is listed as a liability of {} but issued by {}",
                    agent.id(),
                    ins.issuer()
                );
            }
            let mut seen = BTreeSet::new();
            for id in agent.lots() {
                assert!(seen.insert(*id), "{}: duplicate lot reference {id}", agent.id());
                let lot = self
                    .get_lot(*id)
                    .unwrap_or_else(|| panic!("{}: dangling lot reference {id}", agent.id()));
                assert_eq!(
                    lot.owner(),
                    agent.id(),
                    "{id} is listed as a lot of {} but owned by {}",
                    agent.id(),
                    lot.owner()
                );
            }
        }

        for ins in self.instruments().values() {
            assert!(
                ins.amount() > 0,
                "{}: non-positive amount {}",
                ins.id(),
                ins.amount()
            );
            assert_ne!(
                ins.holder(),
                ins.issuer(),
                "{}: held by its own issuer {}",
                ins.id(),
                ins.issuer()
            );
            let holder = self
                .get_agent(ins.holder())
                .unwrap_or_else(|| panic!("{}: unknown holder {}", ins.id(), ins.holder()));
            assert!(
                holder.assets().contains(&ins.id()),
                "{}: holder {} does not reference it as an asset",
                ins.id(),
                ins.holder()
            );
            let issuer = self
                .get_agent(ins.issuer())
                .unwrap_or_else(|| panic!("{}: unknown issuer {}", ins.id(), ins.issuer()));
            assert!(
                issuer.liabilities().contains(&ins.id()),
                "{}: issuer {} does not reference it as a liability",
                ins.id(),
                ins.issuer()
            );
        }

        for lot in self.lots().values() {
            assert!(
                lot.quantity() > 0,
                "{}: non-positive quantity {}",
                lot.id(),
                lot.quantity()
            );
            let owner = self
                .get_agent(lot.owner())
                .unwrap_or_else(|| panic!("{}: unknown owner {}", lot.id(), lot.owner()));
            assert!(
                owner.lots().contains(&lot.id()),
                "{}: owner {} does not reference it",
                lot.id(),
                lot.owner()
            );
        }

        let registry_sum = |class: InstrumentClass| -> i64 {
            self.instruments()
                .values()
                .filter(|ins| ins.class() == class)
                .map(|ins| ins.amount())
                .sum()
        };
        assert_eq!(
            self.cash_outstanding(),
            registry_sum(InstrumentClass::Cash),
            "bearer-claim counter out of sync with registry"
        );
        assert_eq!(
            self.reserves_outstanding(),
            registry_sum(InstrumentClass::Reserves),
            "settlement-asset counter out of sync with registry"
        );
    }
}
