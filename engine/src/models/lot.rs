//! Inventory lot model
//!
//! A unilateral holding of goods: one owner, no counterparty. Lots are
//! split and merged like instruments, with the unit price factored into
//! the fungibility key, and destroyed when emptied.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Registry-assigned inventory lot identifier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct LotId(u64);

impl LotId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for LotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "lot_{:08}", self.0)
    }
}

/// Merge-eligibility key for lots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LotKey {
    pub sku: String,
    pub unit_price: i64,
    pub owner: String,
}

/// A unilateral goods holding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryLot {
    id: LotId,
    sku: String,
    quantity: i64,
    /// Valuation per unit in minor units.
    unit_price: i64,
    owner: String,
    /// Indivisible lots cannot be split.
    divisible: bool,
}

impl InventoryLot {
    pub fn new(
        id: LotId,
        sku: impl Into<String>,
        quantity: i64,
        unit_price: i64,
        owner: impl Into<String>,
        divisible: bool,
    ) -> Self {
        debug_assert!(quantity >= 0, "lot quantity must be non-negative");
        debug_assert!(unit_price >= 0, "unit price must be non-negative");
        Self {
            id,
            sku: sku.into(),
            quantity,
            unit_price,
            owner: owner.into(),
            divisible,
        }
    }

    pub fn id(&self) -> LotId {
        self.id
    }

    pub fn sku(&self) -> &str {
        &self.sku
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn unit_price(&self) -> i64 {
        self.unit_price
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn is_divisible(&self) -> bool {
        self.divisible
    }

    /// Total valuation of the lot.
    pub fn value(&self) -> i64 {
        self.quantity * self.unit_price
    }

    pub fn fungibility_key(&self) -> LotKey {
        LotKey {
            sku: self.sku.clone(),
            unit_price: self.unit_price,
            owner: self.owner.clone(),
        }
    }

    pub(crate) fn twin(&self, id: LotId, quantity: i64) -> Self {
        Self {
            id,
            sku: self.sku.clone(),
            quantity,
            unit_price: self.unit_price,
            owner: self.owner.clone(),
            divisible: self.divisible,
        }
    }

    pub(crate) fn shrink(&mut self, quantity: i64) {
        debug_assert!(quantity > 0 && quantity <= self.quantity);
        self.quantity -= quantity;
    }

    pub(crate) fn grow(&mut self, quantity: i64) {
        debug_assert!(quantity >= 0);
        self.quantity += quantity;
    }

    pub(crate) fn set_owner(&mut self, owner: &str) {
        self.owner = owner.to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lot_value() {
        let lot = InventoryLot::new(LotId::new(1), "WIDGET", 10, 250, "F1", true);
        assert_eq!(lot.value(), 2_500);
    }

    #[test]
    fn test_key_includes_unit_price() {
        let a = InventoryLot::new(LotId::new(1), "WIDGET", 10, 250, "F1", true);
        let b = InventoryLot::new(LotId::new(2), "WIDGET", 5, 300, "F1", true);
        assert_ne!(a.fungibility_key(), b.fungibility_key());
    }
}
