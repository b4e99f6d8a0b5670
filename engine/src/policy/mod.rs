//! Policy engine: issue/hold authorization and settlement-method ranking.
//!
//! The table is consulted on every registry addition and every transfer,
//! and by the settlement engine when it picks how a debtor pays. Rules
//! key on the payload-free instrument class and the agent kind, never on
//! individual instruments, so authorization is a pure function of tags.

use crate::models::agent::AgentKind;
use crate::models::instrument::InstrumentClass;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One way a debtor can discharge a payment obligation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementMethod {
    /// Pay from deposit holdings (may create interbank exposure).
    Deposit,
    /// Hand over bearer claims.
    Cash,
    /// Transfer the settlement asset (banks only).
    Reserves,
}

impl SettlementMethod {
    pub fn name(&self) -> &'static str {
        match self {
            SettlementMethod::Deposit => "deposit",
            SettlementMethod::Cash => "cash",
            SettlementMethod::Reserves => "reserves",
        }
    }
}

/// Authorization table plus per-agent settlement-method overrides.
///
/// # Example
/// ```
/// use ledger_engine_core_rs::{AgentKind, InstrumentClass, PolicyTable};
///
/// let policy = PolicyTable::new();
/// assert!(policy.can_issue(InstrumentClass::Cash, AgentKind::CentralBank));
/// assert!(!policy.can_issue(InstrumentClass::Cash, AgentKind::Bank));
/// assert!(!policy.can_hold(InstrumentClass::Reserves, AgentKind::Household));
/// ```
#[derive(Debug, Clone, Default)]
pub struct PolicyTable {
    /// Scenario-level overrides of the default method ranking, by agent id.
    settlement_overrides: BTreeMap<String, Vec<SettlementMethod>>,
}

impl PolicyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `kind` agents may issue instruments of `class`.
    ///
    /// Bearer claims and the settlement asset come only from the issuing
    /// authority; deposit claims only from banks. Bilateral obligations
    /// are open to everyone.
    pub fn can_issue(&self, class: InstrumentClass, kind: AgentKind) -> bool {
        match class {
            InstrumentClass::Cash | InstrumentClass::Reserves => kind == AgentKind::CentralBank,
            InstrumentClass::Deposit => kind == AgentKind::Bank,
            InstrumentClass::Payable | InstrumentClass::Deliverable => true,
        }
    }

    /// Whether `kind` agents may hold instruments of `class` as assets.
    ///
    /// Only banks hold the settlement asset; everything else is open.
    pub fn can_hold(&self, class: InstrumentClass, kind: AgentKind) -> bool {
        match class {
            InstrumentClass::Reserves => kind == AgentKind::Bank,
            InstrumentClass::Cash
            | InstrumentClass::Deposit
            | InstrumentClass::Payable
            | InstrumentClass::Deliverable => true,
        }
    }

    /// Ranked settlement methods for one debtor, most preferred first.
    ///
    /// A per-agent override wins; otherwise banks prefer the settlement
    /// asset and everyone else prefers deposits.
    pub fn settlement_order(&self, agent_id: &str, kind: AgentKind) -> Vec<SettlementMethod> {
        if let Some(order) = self.settlement_overrides.get(agent_id) {
            return order.clone();
        }
        match kind {
            AgentKind::Bank => vec![
                SettlementMethod::Reserves,
                SettlementMethod::Deposit,
                SettlementMethod::Cash,
            ],
            AgentKind::CentralBank | AgentKind::Household | AgentKind::Firm => vec![
                SettlementMethod::Deposit,
                SettlementMethod::Cash,
                SettlementMethod::Reserves,
            ],
        }
    }

    /// Install a scenario-level method ranking for one agent.
    pub fn set_settlement_order(&mut self, agent_id: &str, order: Vec<SettlementMethod>) {
        self.settlement_overrides.insert(agent_id.to_string(), order);
    }

    /// Methods a debtor of `kind` is actually allowed to use, in ranked
    /// order. Filters out methods whose asset class the debtor may not
    /// hold in the first place.
    pub fn usable_methods(&self, agent_id: &str, kind: AgentKind) -> Vec<SettlementMethod> {
        self.settlement_order(agent_id, kind)
            .into_iter()
            .filter(|method| {
                let class = match method {
                    SettlementMethod::Deposit => InstrumentClass::Deposit,
                    SettlementMethod::Cash => InstrumentClass::Cash,
                    SettlementMethod::Reserves => InstrumentClass::Reserves,
                };
                self.can_hold(class, kind)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_matrix() {
        let policy = PolicyTable::new();
        assert!(policy.can_issue(InstrumentClass::Cash, AgentKind::CentralBank));
        assert!(policy.can_issue(InstrumentClass::Reserves, AgentKind::CentralBank));
        assert!(!policy.can_issue(InstrumentClass::Cash, AgentKind::Bank));
        assert!(!policy.can_issue(InstrumentClass::Reserves, AgentKind::Household));

        assert!(policy.can_issue(InstrumentClass::Deposit, AgentKind::Bank));
        assert!(!policy.can_issue(InstrumentClass::Deposit, AgentKind::Firm));
        assert!(!policy.can_issue(InstrumentClass::Deposit, AgentKind::CentralBank));

        assert!(policy.can_issue(InstrumentClass::Payable, AgentKind::Household));
        assert!(policy.can_issue(InstrumentClass::Deliverable, AgentKind::Firm));
    }

    #[test]
    fn test_hold_matrix() {
        let policy = PolicyTable::new();
        assert!(policy.can_hold(InstrumentClass::Reserves, AgentKind::Bank));
        assert!(!policy.can_hold(InstrumentClass::Reserves, AgentKind::Household));
        assert!(!policy.can_hold(InstrumentClass::Reserves, AgentKind::Firm));
        assert!(policy.can_hold(InstrumentClass::Cash, AgentKind::Household));
        assert!(policy.can_hold(InstrumentClass::Deposit, AgentKind::Firm));
    }

    #[test]
    fn test_default_rankings() {
        let policy = PolicyTable::new();
        assert_eq!(
            policy.settlement_order("B1", AgentKind::Bank),
            vec![
                SettlementMethod::Reserves,
                SettlementMethod::Deposit,
                SettlementMethod::Cash
            ]
        );
        assert_eq!(
            policy.settlement_order("H1", AgentKind::Household),
            vec![
                SettlementMethod::Deposit,
                SettlementMethod::Cash,
                SettlementMethod::Reserves
            ]
        );
    }

    #[test]
    fn test_override_wins() {
        let mut policy = PolicyTable::new();
        policy.set_settlement_order("H1", vec![SettlementMethod::Cash]);
        assert_eq!(
            policy.settlement_order("H1", AgentKind::Household),
            vec![SettlementMethod::Cash]
        );
        // Other agents keep the default.
        assert_eq!(
            policy.settlement_order("H2", AgentKind::Household).len(),
            3
        );
    }

    #[test]
    fn test_usable_methods_filters_unholdable() {
        let policy = PolicyTable::new();
        let methods = policy.usable_methods("H1", AgentKind::Household);
        assert_eq!(methods, vec![SettlementMethod::Deposit, SettlementMethod::Cash]);

        let methods = policy.usable_methods("B1", AgentKind::Bank);
        assert_eq!(methods.len(), 3);
    }
}
