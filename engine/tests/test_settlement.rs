//! Integration tests for Phase B settlement: method ranking, combined
//! payment legs, defaults with full rollback, and deliverables.

use ledger_engine_core_rs::{
    run_settlement, Agent, AgentKind, InstrumentKind, LedgerState, SettlementMethod,
    SettlementOutcome,
};

fn banking_system() -> LedgerState {
    let mut state = LedgerState::new("USD");
    state
        .setup(|s| {
            s.add_agent(Agent::new("CB", "Central Bank", AgentKind::CentralBank))?;
            s.add_agent(Agent::new("B1", "First Bank", AgentKind::Bank))?;
            s.add_agent(Agent::new("B2", "Second Bank", AgentKind::Bank))?;
            s.add_agent(Agent::new("H1", "Household One", AgentKind::Household))?;
            s.add_agent(Agent::new("H2", "Household Two", AgentKind::Household))?;
            Ok(())
        })
        .unwrap();
    state
}

// ============================================================================
// Default scenario: 150 due, 120 available
// ============================================================================

#[test]
fn test_default_with_shortfall_30() {
    let mut state = banking_system();
    state.mint_cash("H1", 120).unwrap();
    state.make_deposit("H1", "B1", 100).unwrap();
    let id = state
        .add_contract(InstrumentKind::Payable { due_day: 0 }, 150, "H2", "H1")
        .unwrap();

    let outcomes = run_settlement(&mut state, 0);
    assert_eq!(
        outcomes,
        vec![SettlementOutcome::Defaulted {
            obligation: id,
            shortfall: 30
        }]
    );

    // Both partial legs (deposit 100, cash 20) are rolled back.
    assert_eq!(state.deposit_balance_at("H1", "B1"), 100);
    assert_eq!(state.cash_balance("H1"), 20);
    assert_eq!(state.cash_balance("H2"), 0);
    assert_eq!(state.deposit_balance("H2"), 0);

    // The obligation stays on the books, unchanged.
    let obligation = state.get_instrument(id).unwrap();
    assert_eq!(obligation.amount(), 150);
    assert_eq!(obligation.issuer(), "H1");

    // The default record survives the rollback.
    let defaults = state.events().events_of_type("ObligationDefaulted");
    assert_eq!(defaults.len(), 1);
    state.assert_invariants();
}

#[test]
fn test_exact_coverage_settles() {
    let mut state = banking_system();
    state.mint_cash("H1", 150).unwrap();
    state.make_deposit("H1", "B1", 100).unwrap();
    let id = state
        .add_contract(InstrumentKind::Payable { due_day: 0 }, 150, "H2", "H1")
        .unwrap();

    let outcomes = run_settlement(&mut state, 0);
    assert_eq!(
        outcomes,
        vec![SettlementOutcome::Settled {
            obligation: id,
            amount: 150
        }]
    );
    assert_eq!(state.deposit_balance("H1"), 0);
    assert_eq!(state.cash_balance("H1"), 0);
    assert_eq!(state.deposit_balance("H2") + state.cash_balance("H2"), 150);
    assert!(!state.has_outstanding_obligations());
    state.assert_invariants();
}

// ============================================================================
// Method ranking
// ============================================================================

#[test]
fn test_household_prefers_deposits_over_cash() {
    let mut state = banking_system();
    state.mint_cash("H1", 400).unwrap();
    state.make_deposit("H1", "B1", 200).unwrap();
    state
        .add_contract(InstrumentKind::Payable { due_day: 0 }, 100, "H2", "H1")
        .unwrap();

    run_settlement(&mut state, 0);
    // Deposits drained first; cash untouched.
    assert_eq!(state.deposit_balance("H1"), 100);
    assert_eq!(state.cash_balance("H1"), 200);
    state.assert_invariants();
}

#[test]
fn test_bank_debtor_pays_in_reserves_first() {
    let mut state = banking_system();
    state.mint_reserves("B1", 500).unwrap();
    state.mint_cash("B1", 500).unwrap();
    state
        .add_contract(InstrumentKind::Payable { due_day: 0 }, 200, "B2", "B1")
        .unwrap();

    run_settlement(&mut state, 0);
    assert_eq!(state.reserve_balance("B1"), 300);
    assert_eq!(state.reserve_balance("B2"), 200);
    assert_eq!(state.cash_balance("B1"), 500);
    state.assert_invariants();
}

#[test]
fn test_reserves_skipped_for_non_bank_creditor() {
    // A bank owing a household cannot hand over reserves; the ranking
    // falls through to deposits/cash.
    let mut state = banking_system();
    state.mint_reserves("B1", 500).unwrap();
    state.mint_cash("B1", 300).unwrap();
    state
        .add_contract(InstrumentKind::Payable { due_day: 0 }, 200, "H1", "B1")
        .unwrap();

    let outcomes = run_settlement(&mut state, 0);
    assert!(!outcomes[0].is_default());
    assert_eq!(state.reserve_balance("B1"), 500);
    assert_eq!(state.cash_balance("H1"), 200);
    state.assert_invariants();
}

#[test]
fn test_settlement_order_override() {
    let mut state = banking_system();
    state.mint_cash("H1", 400).unwrap();
    state.make_deposit("H1", "B1", 200).unwrap();
    state
        .policy_mut()
        .set_settlement_order("H1", vec![SettlementMethod::Cash]);
    state
        .add_contract(InstrumentKind::Payable { due_day: 0 }, 100, "H2", "H1")
        .unwrap();

    run_settlement(&mut state, 0);
    // Cash only: the deposit is untouched.
    assert_eq!(state.deposit_balance("H1"), 200);
    assert_eq!(state.cash_balance("H1"), 100);
    assert_eq!(state.cash_balance("H2"), 100);
    state.assert_invariants();
}

#[test]
fn test_override_can_strand_a_solvent_debtor() {
    // Restricting the ranking below the debtor's actual holdings turns a
    // covered obligation into a default.
    let mut state = banking_system();
    state.mint_cash("H1", 400).unwrap();
    state.make_deposit("H1", "B1", 400).unwrap();
    state
        .policy_mut()
        .set_settlement_order("H1", vec![SettlementMethod::Cash]);
    let id = state
        .add_contract(InstrumentKind::Payable { due_day: 0 }, 100, "H2", "H1")
        .unwrap();

    let outcomes = run_settlement(&mut state, 0);
    assert_eq!(
        outcomes,
        vec![SettlementOutcome::Defaulted {
            obligation: id,
            shortfall: 100
        }]
    );
    state.assert_invariants();
}

// ============================================================================
// Processing order and multiple obligations
// ============================================================================

#[test]
fn test_obligations_processed_in_creation_order() {
    // Earlier-created obligation drains the debtor first; the later one
    // defaults on what remains.
    let mut state = banking_system();
    state.mint_cash("H1", 100).unwrap();
    let first = state
        .add_contract(InstrumentKind::Payable { due_day: 0 }, 80, "H2", "H1")
        .unwrap();
    let second = state
        .add_contract(InstrumentKind::Payable { due_day: 0 }, 80, "B1", "H1")
        .unwrap();

    let outcomes = run_settlement(&mut state, 0);
    assert_eq!(
        outcomes,
        vec![
            SettlementOutcome::Settled {
                obligation: first,
                amount: 80
            },
            SettlementOutcome::Defaulted {
                obligation: second,
                shortfall: 60
            },
        ]
    );
    assert_eq!(state.cash_balance("H2"), 80);
    assert_eq!(state.cash_balance("H1"), 20);
    state.assert_invariants();
}

// ============================================================================
// Deliverables
// ============================================================================

#[test]
fn test_deliverable_settles_in_goods() {
    let mut state = banking_system();
    state
        .setup(|s| {
            s.add_agent(Agent::new("F1", "Firm", AgentKind::Firm))?;
            s.add_lot("F1", "WIDGET", 12, 250, true)?;
            Ok(())
        })
        .unwrap();
    state
        .add_contract(
            InstrumentKind::Deliverable {
                due_day: 0,
                sku: "WIDGET".to_string(),
                unit_price: 250,
            },
            12,
            "H1",
            "F1",
        )
        .unwrap();

    let outcomes = run_settlement(&mut state, 0);
    assert!(!outcomes[0].is_default());
    assert_eq!(state.sku_quantity("F1", "WIDGET"), 0);
    assert_eq!(state.sku_quantity("H1", "WIDGET"), 12);
    assert!(!state.has_outstanding_obligations());
    state.assert_invariants();
}

#[test]
fn test_deliverable_wrong_sku_defaults() {
    let mut state = banking_system();
    state
        .setup(|s| {
            s.add_agent(Agent::new("F1", "Firm", AgentKind::Firm))?;
            s.add_lot("F1", "GADGET", 50, 100, true)?;
            Ok(())
        })
        .unwrap();
    let id = state
        .add_contract(
            InstrumentKind::Deliverable {
                due_day: 0,
                sku: "WIDGET".to_string(),
                unit_price: 250,
            },
            5,
            "H1",
            "F1",
        )
        .unwrap();

    let outcomes = run_settlement(&mut state, 0);
    assert_eq!(
        outcomes,
        vec![SettlementOutcome::Defaulted {
            obligation: id,
            shortfall: 5
        }]
    );
    assert_eq!(state.sku_quantity("F1", "GADGET"), 50);
    state.assert_invariants();
}
