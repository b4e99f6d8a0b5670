//! Agent model
//!
//! An agent is a registry entry holding references into the instrument and
//! lot registries. It carries no balances of its own: every position is an
//! instrument or lot resolvable through the ledger state.
//!
//! Agents are created at setup and never destroyed during a run. Their
//! reference lists are unordered; canonical ordering is always derived
//! from the referenced ids.

use crate::models::instrument::InstrumentId;
use crate::models::lot::LotId;
use serde::{Deserialize, Serialize};

/// Kind tag determining what an agent may issue, hold, and how it pays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    /// The issuing authority. Mints bearer claims and the settlement asset.
    CentralBank,
    /// Intermediary institution. Issues deposit claims, holds reserves.
    Bank,
    /// Generic participant.
    Household,
    /// Generic participant.
    Firm,
}

impl AgentKind {
    /// Short name used in error messages and exported records.
    pub fn name(&self) -> &'static str {
        match self {
            AgentKind::CentralBank => "central_bank",
            AgentKind::Bank => "bank",
            AgentKind::Household => "household",
            AgentKind::Firm => "firm",
        }
    }
}

/// A participant in the ledger.
///
/// # Example
/// ```
/// use ledger_engine_core_rs::{Agent, AgentKind};
///
/// let agent = Agent::new("B1", "First Bank", AgentKind::Bank);
/// assert_eq!(agent.id(), "B1");
/// assert!(agent.assets().is_empty());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    /// Unique agent identifier (e.g., "B1").
    id: String,

    /// Human-readable display name.
    name: String,

    /// Kind tag consulted by the policy engine.
    kind: AgentKind,

    /// Instruments this agent holds as assets.
    assets: Vec<InstrumentId>,

    /// Instruments this agent has issued (its liabilities).
    liabilities: Vec<InstrumentId>,

    /// Inventory lots this agent owns.
    lots: Vec<LotId>,
}

impl Agent {
    /// Create a new agent with empty reference lists.
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: AgentKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            assets: Vec::new(),
            liabilities: Vec::new(),
            lots: Vec::new(),
        }
    }

    /// Get agent ID.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Get display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get kind tag.
    pub fn kind(&self) -> AgentKind {
        self.kind
    }

    /// Instrument ids held as assets.
    pub fn assets(&self) -> &[InstrumentId] {
        &self.assets
    }

    /// Instrument ids issued as liabilities.
    pub fn liabilities(&self) -> &[InstrumentId] {
        &self.liabilities
    }

    /// Owned inventory lot ids.
    pub fn lots(&self) -> &[LotId] {
        &self.lots
    }

    pub(crate) fn add_asset(&mut self, id: InstrumentId) {
        debug_assert!(!self.assets.contains(&id), "duplicate asset reference");
        self.assets.push(id);
    }

    pub(crate) fn remove_asset(&mut self, id: InstrumentId) {
        let pos = self.assets.iter().position(|a| *a == id);
        debug_assert!(pos.is_some(), "removing unknown asset reference");
        if let Some(pos) = pos {
            self.assets.swap_remove(pos);
        }
    }

    pub(crate) fn add_liability(&mut self, id: InstrumentId) {
        debug_assert!(!self.liabilities.contains(&id), "duplicate liability reference");
        self.liabilities.push(id);
    }

    pub(crate) fn remove_liability(&mut self, id: InstrumentId) {
        let pos = self.liabilities.iter().position(|l| *l == id);
        debug_assert!(pos.is_some(), "removing unknown liability reference");
        if let Some(pos) = pos {
            self.liabilities.swap_remove(pos);
        }
    }

    pub(crate) fn add_lot(&mut self, id: LotId) {
        debug_assert!(!self.lots.contains(&id), "duplicate lot reference");
        self.lots.push(id);
    }

    pub(crate) fn remove_lot(&mut self, id: LotId) {
        let pos = self.lots.iter().position(|l| *l == id);
        debug_assert!(pos.is_some(), "removing unknown lot reference");
        if let Some(pos) = pos {
            self.lots.swap_remove(pos);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_agent_is_empty() {
        let agent = Agent::new("H1", "Household One", AgentKind::Household);
        assert_eq!(agent.id(), "H1");
        assert_eq!(agent.name(), "Household One");
        assert_eq!(agent.kind(), AgentKind::Household);
        assert!(agent.assets().is_empty());
        assert!(agent.liabilities().is_empty());
        assert!(agent.lots().is_empty());
    }

    #[test]
    fn test_reference_add_remove() {
        let mut agent = Agent::new("B1", "Bank", AgentKind::Bank);
        let a = InstrumentId::new(1);
        let b = InstrumentId::new(2);

        agent.add_asset(a);
        agent.add_asset(b);
        assert_eq!(agent.assets().len(), 2);

        agent.remove_asset(a);
        assert_eq!(agent.assets(), &[b]);

        agent.add_liability(a);
        agent.remove_liability(a);
        assert!(agent.liabilities().is_empty());
    }
}
