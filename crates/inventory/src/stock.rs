//! Stock rule engine: quantity deltas and derived status.
//!
//! Pure functions only. Persisting the result together with its audit entry is
//! the ledger's job.

use serde_json::{Value as JsonValue, json};

use fablab_core::{DomainError, DomainResult};

use crate::item::{InventoryItem, StockStatus};
use crate::log::LogAction;

/// Derive the status implied by `quantity` against `min_stock`.
///
/// - `0` → `OutOfStock`
/// - `0 < quantity < min_stock` → `LowStock`
/// - otherwise → `InStock`
pub fn derive_status(quantity: i64, min_stock: i64) -> StockStatus {
    if quantity == 0 {
        StockStatus::OutOfStock
    } else if quantity < min_stock {
        StockStatus::LowStock
    } else {
        StockStatus::InStock
    }
}

/// Outcome of planning a stock adjustment against one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockAdjustment {
    pub delta: i64,
    pub old_quantity: i64,
    pub new_quantity: i64,
    pub new_status: StockStatus,
    pub action: LogAction,
}

impl StockAdjustment {
    /// Magnitude of the delta, as recorded on the audit entry.
    pub fn magnitude(&self) -> i64 {
        self.delta.abs()
    }

    pub fn old_value(&self) -> JsonValue {
        json!({ "quantity": self.old_quantity })
    }

    pub fn new_value(&self) -> JsonValue {
        json!({ "quantity": self.new_quantity })
    }

    /// Write the new quantity and status onto the item.
    pub fn apply_to(&self, item: &mut InventoryItem) {
        item.quantity = self.new_quantity;
        item.status = self.new_status;
    }
}

/// Plan a signed quantity change against `item`.
///
/// A zero delta is accepted and classified as `StockRemoved`. The derived status
/// always replaces the previous one, `Discontinued` included.
pub fn plan_adjustment(item: &InventoryItem, delta: i64) -> DomainResult<StockAdjustment> {
    let new_quantity = item
        .quantity
        .checked_add(delta)
        .ok_or_else(|| DomainError::validation("quantity out of range"))?;

    if new_quantity < 0 {
        return Err(DomainError::InsufficientStock {
            available: item.quantity,
            delta,
        });
    }

    let action = if delta > 0 {
        LogAction::StockAdded
    } else {
        LogAction::StockRemoved
    };

    Ok(StockAdjustment {
        delta,
        old_quantity: item.quantity,
        new_quantity,
        new_status: derive_status(new_quantity, item.min_stock),
        action,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use fablab_core::RecordId;
    use rust_decimal::Decimal;

    use crate::item::ItemType;

    fn item_with(quantity: i64, min_stock: i64, status: StockStatus) -> InventoryItem {
        let now = Utc::now();
        InventoryItem {
            id: RecordId::new(),
            item_id: "DRONE-001".to_string(),
            name: "Drones".to_string(),
            item_type: ItemType::Drones,
            price: Decimal::new(500, 2),
            quantity,
            min_stock,
            status,
            notes: None,
            image_url: None,
            created_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn status_derivation_at_min_stock_five() {
        assert_eq!(derive_status(0, 5), StockStatus::OutOfStock);
        assert_eq!(derive_status(3, 5), StockStatus::LowStock);
        assert_eq!(derive_status(10, 5), StockStatus::InStock);
    }

    #[test]
    fn low_stock_boundary_is_strict() {
        assert_eq!(derive_status(4, 5), StockStatus::LowStock);
        assert_eq!(derive_status(5, 5), StockStatus::InStock);
    }

    #[test]
    fn zero_min_stock_never_reports_low() {
        assert_eq!(derive_status(1, 0), StockStatus::InStock);
        assert_eq!(derive_status(0, 0), StockStatus::OutOfStock);
    }

    #[test]
    fn positive_delta_is_stock_added() {
        let item = item_with(10, 5, StockStatus::InStock);
        let adj = plan_adjustment(&item, 5).unwrap();
        assert_eq!(adj.action, LogAction::StockAdded);
        assert_eq!(adj.new_quantity, 15);
        assert_eq!(adj.magnitude(), 5);
        assert_eq!(adj.old_value(), json!({ "quantity": 10 }));
        assert_eq!(adj.new_value(), json!({ "quantity": 15 }));
    }

    #[test]
    fn negative_delta_is_stock_removed_with_absolute_magnitude() {
        let item = item_with(10, 5, StockStatus::InStock);
        let adj = plan_adjustment(&item, -7).unwrap();
        assert_eq!(adj.action, LogAction::StockRemoved);
        assert_eq!(adj.new_quantity, 3);
        assert_eq!(adj.new_status, StockStatus::LowStock);
        assert_eq!(adj.magnitude(), 7);
    }

    #[test]
    fn zero_delta_is_classified_as_stock_removed() {
        let item = item_with(4, 5, StockStatus::LowStock);
        let adj = plan_adjustment(&item, 0).unwrap();
        assert_eq!(adj.action, LogAction::StockRemoved);
        assert_eq!(adj.new_quantity, 4);
        assert_eq!(adj.magnitude(), 0);
    }

    #[test]
    fn zero_delta_on_empty_item_succeeds() {
        let item = item_with(0, 0, StockStatus::OutOfStock);
        assert!(plan_adjustment(&item, 0).is_ok());
    }

    #[test]
    fn going_negative_is_insufficient_stock() {
        let item = item_with(2, 1, StockStatus::InStock);
        let err = plan_adjustment(&item, -3).unwrap_err();
        assert_eq!(err, DomainError::InsufficientStock { available: 2, delta: -3 });
    }

    #[test]
    fn draining_to_zero_is_allowed() {
        let item = item_with(2, 1, StockStatus::InStock);
        let adj = plan_adjustment(&item, -2).unwrap();
        assert_eq!(adj.new_quantity, 0);
        assert_eq!(adj.new_status, StockStatus::OutOfStock);
    }

    #[test]
    fn discontinued_is_overwritten_by_adjustment() {
        let mut item = item_with(8, 2, StockStatus::Discontinued);
        let adj = plan_adjustment(&item, 1).unwrap();
        adj.apply_to(&mut item);
        assert_eq!(item.status, StockStatus::InStock);
        assert_eq!(item.quantity, 9);
    }

    #[test]
    fn overflowing_delta_is_a_validation_error() {
        let item = item_with(i64::MAX, 0, StockStatus::InStock);
        assert!(matches!(
            plan_adjustment(&item, 1),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn most_negative_delta_is_insufficient_stock() {
        for quantity in [0, 7, i64::MAX] {
            let item = item_with(quantity, 0, StockStatus::InStock);
            assert_eq!(
                plan_adjustment(&item, i64::MIN),
                Err(DomainError::InsufficientStock {
                    available: quantity,
                    delta: i64::MIN,
                })
            );
        }
    }

    #[cfg(test)]
    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 1000,
                ..ProptestConfig::default()
            })]

            /// Property: quantity never goes below zero, and the rejection carries the inputs.
            #[test]
            fn floor_invariant(
                quantity in 0i64..10_000,
                delta in -20_000i64..20_000,
                min_stock in 0i64..100,
            ) {
                let item = item_with(quantity, min_stock, StockStatus::InStock);
                match plan_adjustment(&item, delta) {
                    Ok(adj) => {
                        prop_assert!(quantity + delta >= 0);
                        prop_assert_eq!(adj.new_quantity, quantity + delta);
                    }
                    Err(e) => {
                        prop_assert!(quantity + delta < 0);
                        prop_assert_eq!(
                            e,
                            DomainError::InsufficientStock { available: quantity, delta }
                        );
                    }
                }
            }

            /// Property: the planned status always agrees with the derivation rule.
            #[test]
            fn planned_status_agrees_with_rule(
                quantity in 0i64..1_000,
                delta in 0i64..1_000,
                min_stock in 0i64..100,
            ) {
                let item = item_with(quantity, min_stock, StockStatus::Discontinued);
                let adj = plan_adjustment(&item, delta).unwrap();
                prop_assert_eq!(adj.new_status, derive_status(adj.new_quantity, min_stock));
                prop_assert_ne!(adj.new_status, StockStatus::Discontinued);
            }

            /// Property: only strictly positive deltas are logged as additions.
            #[test]
            fn action_classification(delta in -1_000i64..1_000) {
                let item = item_with(1_000, 0, StockStatus::InStock);
                let adj = plan_adjustment(&item, delta).unwrap();
                let expected = if delta > 0 {
                    LogAction::StockAdded
                } else {
                    LogAction::StockRemoved
                };
                prop_assert_eq!(adj.action, expected);
                prop_assert_eq!(adj.magnitude(), delta.abs());
            }
        }
    }
}
