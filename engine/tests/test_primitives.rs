//! Integration tests for the fractional primitives: split, merge, and
//! consume over instruments and inventory lots, exercised through the
//! public ledger surface.

use ledger_engine_core_rs::{Agent, AgentKind, LedgerError, LedgerState};

fn household_with_cash(amount: i64) -> (LedgerState, ledger_engine_core_rs::InstrumentId) {
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

// ============================================================================
// Instrument splits
// ============================================================================

#[test]
fn test_repeated_splits_conserve_total() {
    let (mut state, id) = household_with_cash(1_000);

    let a = state.split(id, 400).unwrap();
    let b = state.split(id, 100).unwrap();
    let c = state.split(a, 150).unwrap();

    let total: i64 = [id, a, b, c]
        .iter()
        .map(|i| state.get_instrument(*i).unwrap().amount())
        .sum();
    assert_eq!(total, 1_000);
    assert_eq!(state.cash_outstanding(), 1_000);
    assert_eq!(state.get_agent("H1").unwrap().assets().len(), 4);
    state.assert_invariants();
}

#[test]
fn test_split_twin_inherits_attributes() {
    let (mut state, id) = household_with_cash(1_000);
    let twin = state.split(id, 400).unwrap();

    let original = state.get_instrument(id).unwrap();
    let spawned = state.get_instrument(twin).unwrap();
    assert_eq!(spawned.kind(), original.kind());
    assert_eq!(spawned.holder(), original.holder());
    assert_eq!(spawned.issuer(), original.issuer());
    assert_eq!(spawned.denomination(), original.denomination());
    assert_eq!(spawned.fungibility_key(), original.fungibility_key());
}

#[test]
fn test_split_boundaries_rejected() {
    let (mut state, id) = household_with_cash(100);
    for bad in [0, -5, 100, 101] {
        assert!(matches!(
            state.split(id, bad),
            Err(LedgerError::InvalidOperation(_))
        ));
    }
    assert_eq!(state.get_instrument(id).unwrap().amount(), 100);
    state.assert_invariants();
}

// ============================================================================
// Merge and consume
// ============================================================================

#[test]
fn test_merge_absorbs_and_deletes() {
    let (mut state, id) = household_with_cash(1_000);
    let twin = state.split(id, 400).unwrap();

    state.merge(id, twin).unwrap();
    assert_eq!(state.get_instrument(id).unwrap().amount(), 1_000);
    assert!(state.get_instrument(twin).is_none());
    // Both reference sides are cleaned up.
    assert_eq!(state.get_agent("H1").unwrap().assets().len(), 1);
    assert_eq!(state.get_agent("CB").unwrap().liabilities().len(), 1);
    state.assert_invariants();
}

#[test]
fn test_merge_different_holders_rejected() {
    let mut state = LedgerState::new("USD");
    let (a, b) = state
        .setup(|s| {
            s.add_agent(Agent::new("CB", "Central Bank", AgentKind::CentralBank))?;
            s.add_agent(Agent::new("H1", "Household One", AgentKind::Household))?;
            s.add_agent(Agent::new("H2", "Household Two", AgentKind::Household))?;
            Ok((s.mint_cash("H1", 100)?, s.mint_cash("H2", 100)?))
        })
        .unwrap();

    assert_eq!(
        state.merge(a, b),
        Err(LedgerError::IncompatibleInstruments { a, b })
    );
    assert_eq!(state.cash_outstanding(), 200);
    state.assert_invariants();
}

#[test]
fn test_partial_consume_keeps_instrument() {
    let (mut state, id) = household_with_cash(100);
    state.consume(id, 30).unwrap();
    assert_eq!(state.get_instrument(id).unwrap().amount(), 70);
    assert!(state.get_agent("H1").unwrap().assets().contains(&id));
}

#[test]
fn test_full_consume_removes_both_references() {
    let (mut state, id) = household_with_cash(100);
    state.consume(id, 100).unwrap();
    assert!(state.get_instrument(id).is_none());
    assert!(state.get_agent("H1").unwrap().assets().is_empty());
    assert!(state.get_agent("CB").unwrap().liabilities().is_empty());
}

// ============================================================================
// Lot primitives
// ============================================================================

#[test]
fn test_lot_split_merge_consume() {
    let mut state = LedgerState::new("USD");
    let lot = state
        .setup(|s| {
            s.add_agent(Agent::new("CB", "Central Bank", AgentKind::CentralBank))?;
            s.add_agent(Agent::new("F1", "Firm", AgentKind::Firm))?;
            s.add_lot("F1", "WIDGET", 20, 250, true)
        })
        .unwrap();

    let twin = state.split_lot(lot, 8).unwrap();
    assert_eq!(state.get_lot(lot).unwrap().quantity(), 12);
    assert_eq!(state.get_lot(twin).unwrap().quantity(), 8);
    assert_eq!(state.sku_quantity("F1", "WIDGET"), 20);

    state.merge_lots(lot, twin).unwrap();
    assert!(state.get_lot(twin).is_none());

    state.consume_lot(lot, 20).unwrap();
    assert!(state.get_lot(lot).is_none());
    assert!(state.get_agent("F1").unwrap().lots().is_empty());
    state.assert_invariants();
}

#[test]
fn test_indivisible_lot_rejects_split() {
    let mut state = LedgerState::new("USD");
    let lot = state
        .setup(|s| {
            s.add_agent(Agent::new("CB", "Central Bank", AgentKind::CentralBank))?;
            s.add_agent(Agent::new("F1", "Firm", AgentKind::Firm))?;
            s.add_lot("F1", "TURBINE", 3, 1_000_000, false)
        })
        .unwrap();

    assert!(matches!(
        state.split_lot(lot, 1),
        Err(LedgerError::InvalidOperation(_))
    ));
    assert_eq!(state.get_lot(lot).unwrap().quantity(), 3);
}

#[test]
fn test_lots_with_different_unit_price_never_merge() {
    let mut state = LedgerState::new("USD");
    let (a, b) = state
        .setup(|s| {
            s.add_agent(Agent::new("CB", "Central Bank", AgentKind::CentralBank))?;
            s.add_agent(Agent::new("F1", "Firm", AgentKind::Firm))?;
            Ok((
                s.add_lot("F1", "WIDGET", 10, 250, true)?,
                s.add_lot("F1", "WIDGET", 10, 300, true)?,
            ))
        })
        .unwrap();

    assert_eq!(
        state.merge_lots(a, b),
        Err(LedgerError::IncompatibleLots { a, b })
    );
    state.assert_invariants();
}
