//! Stock ledger tests
//!
//! Tests for movement application and weighted-average costing:
//! - Quantities never go negative
//! - Outbound movements never change the cost basis
//! - Inbound receipts blend into the average; depletion resets it

use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

use shared::{at_or_below_threshold, position_valuation, weighted_average_cost};
use stockhub_backend::services::stock::{apply_movement, MovementType, PositionState};
use stockhub_backend::AppError;

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn ids() -> (Uuid, Uuid) {
    (Uuid::new_v4(), Uuid::new_v4())
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Receipts blend cost weighted by quantity
    #[test]
    fn test_weighted_average_blends_receipts() {
        // 100 units at 1000 plus 50 units at 2000
        let cost = weighted_average_cost(100, dec("1000"), 50, dec("2000"));
        let expected = dec("200000") / dec("150");

        assert_eq!(cost, expected);
        assert!(cost > dec("1333.33") && cost < dec("1333.34"));
    }

    /// A depleted position takes the incoming cost outright
    #[test]
    fn test_weighted_average_resets_after_depletion() {
        let cost = weighted_average_cost(0, dec("1000"), 5, dec("2000"));
        assert_eq!(cost, dec("2000"));
    }

    /// Same incoming cost leaves the average unchanged
    #[test]
    fn test_weighted_average_stable_at_same_cost() {
        let cost = weighted_average_cost(40, dec("750"), 60, dec("750"));
        assert_eq!(cost, dec("750"));
    }

    /// Valuation is quantity times average cost
    #[test]
    fn test_position_valuation() {
        assert_eq!(position_valuation(12, dec("2.5")), dec("30"));
        assert_eq!(position_valuation(0, dec("99")), dec("0"));
    }

    /// Inbound movement from an empty position
    #[test]
    fn test_inbound_into_empty_position() {
        let (product, warehouse) = ids();
        let next = apply_movement(
            product,
            warehouse,
            PositionState::empty(),
            MovementType::In,
            100,
            Some(dec("1000")),
        )
        .unwrap();

        assert_eq!(next.quantity, 100);
        assert_eq!(next.average_cost, dec("1000"));
    }

    /// Outbound movement debits quantity without touching cost
    #[test]
    fn test_outbound_preserves_cost() {
        let (product, warehouse) = ids();
        let state = PositionState {
            quantity: 10,
            average_cost: dec("1234.5"),
        };
        let next =
            apply_movement(product, warehouse, state, MovementType::Out, 4, None).unwrap();

        assert_eq!(next.quantity, 6);
        assert_eq!(next.average_cost, dec("1234.5"));
    }

    /// Full depletion then a receipt resets the cost basis
    #[test]
    fn test_depletion_resets_cost_basis() {
        let (product, warehouse) = ids();
        let state = PositionState {
            quantity: 10,
            average_cost: dec("1000"),
        };
        let depleted =
            apply_movement(product, warehouse, state, MovementType::Out, 10, None).unwrap();
        assert_eq!(depleted.quantity, 0);

        let restocked = apply_movement(
            product,
            warehouse,
            depleted,
            MovementType::In,
            5,
            Some(dec("2000")),
        )
        .unwrap();

        assert_eq!(restocked.quantity, 5);
        assert_eq!(restocked.average_cost, dec("2000"));
    }

    /// Over-debit is rejected with the available quantity reported
    #[test]
    fn test_insufficient_stock_rejected() {
        let (product, warehouse) = ids();
        let state = PositionState {
            quantity: 10,
            average_cost: dec("100"),
        };
        let err = apply_movement(product, warehouse, state, MovementType::Out, 11, None)
            .unwrap_err();

        match err {
            AppError::InsufficientStock {
                requested,
                available,
                ..
            } => {
                assert_eq!(requested, 11);
                assert_eq!(available, 10);
            }
            other => panic!("expected InsufficientStock, got {other}"),
        }
    }

    /// Adjustment out follows the same over-debit rule
    #[test]
    fn test_adjustment_out_cannot_overdraw() {
        let (product, warehouse) = ids();
        let state = PositionState {
            quantity: 3,
            average_cost: dec("10"),
        };
        let err = apply_movement(
            product,
            warehouse,
            state,
            MovementType::AdjustmentOut,
            4,
            None,
        )
        .unwrap_err();

        assert!(matches!(err, AppError::InsufficientStock { .. }));
    }

    /// Inbound without a unit cost is a validation error
    #[test]
    fn test_inbound_requires_unit_cost() {
        let (product, warehouse) = ids();
        let err = apply_movement(
            product,
            warehouse,
            PositionState::empty(),
            MovementType::In,
            5,
            None,
        )
        .unwrap_err();

        assert!(matches!(err, AppError::Validation { .. }));
    }

    /// Zero and negative quantities are rejected for every movement type
    #[test]
    fn test_nonpositive_quantity_rejected() {
        let (product, warehouse) = ids();
        for movement_type in [
            MovementType::In,
            MovementType::Out,
            MovementType::AdjustmentIn,
            MovementType::AdjustmentOut,
        ] {
            for qty in [0, -1] {
                let err = apply_movement(
                    product,
                    warehouse,
                    PositionState::empty(),
                    movement_type,
                    qty,
                    Some(dec("1")),
                )
                .unwrap_err();
                assert!(matches!(err, AppError::Validation { .. }));
            }
        }
    }

    /// Negative unit cost is rejected
    #[test]
    fn test_negative_unit_cost_rejected() {
        let (product, warehouse) = ids();
        let err = apply_movement(
            product,
            warehouse,
            PositionState::empty(),
            MovementType::In,
            5,
            Some(dec("-1")),
        )
        .unwrap_err();

        assert!(matches!(err, AppError::Validation { .. }));
    }

    /// Threshold comparison includes the boundary
    #[test]
    fn test_threshold_boundary_inclusive() {
        assert!(at_or_below_threshold(10, 10));
        assert!(at_or_below_threshold(9, 10));
        assert!(!at_or_below_threshold(11, 10));
    }

    /// Movement type direction classification
    #[test]
    fn test_movement_direction() {
        assert!(MovementType::In.is_inbound());
        assert!(MovementType::AdjustmentIn.is_inbound());
        assert!(MovementType::Out.is_outbound());
        assert!(MovementType::AdjustmentOut.is_outbound());
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

proptest! {
    /// Quantity never goes negative across any sequence of accepted movements
    #[test]
    fn prop_quantity_never_negative(
        ops in prop::collection::vec((0..4usize, 1..500i64, 1..10_000i64), 1..40)
    ) {
        let (product, warehouse) = ids();
        let mut state = PositionState::empty();

        for (kind, qty, cost) in ops {
            let movement_type = match kind {
                0 => MovementType::In,
                1 => MovementType::Out,
                2 => MovementType::AdjustmentIn,
                _ => MovementType::AdjustmentOut,
            };
            let unit_cost = movement_type.is_inbound().then(|| Decimal::from(cost));

            if let Ok(next) =
                apply_movement(product, warehouse, state, movement_type, qty, unit_cost)
            {
                state = next;
            }

            prop_assert!(state.quantity >= 0);
            prop_assert!(state.average_cost >= Decimal::ZERO);
        }
    }

    /// Blended average cost stays within the bounds of its inputs
    #[test]
    fn prop_blended_cost_within_bounds(
        current_qty in 1..10_000i64,
        incoming_qty in 1..10_000i64,
        current_cost in 0..1_000_000i64,
        incoming_cost in 0..1_000_000i64,
    ) {
        let current_cost = Decimal::from(current_cost);
        let incoming_cost = Decimal::from(incoming_cost);
        let blended =
            weighted_average_cost(current_qty, current_cost, incoming_qty, incoming_cost);

        let lo = current_cost.min(incoming_cost);
        let hi = current_cost.max(incoming_cost);
        prop_assert!(blended >= lo && blended <= hi);
    }

    /// Outbound movements never change the average cost
    #[test]
    fn prop_outbound_cost_invariant(
        quantity in 1..10_000i64,
        debit in 1..10_000i64,
        cost in 0..1_000_000i64,
    ) {
        let (product, warehouse) = ids();
        let state = PositionState {
            quantity,
            average_cost: Decimal::from(cost),
        };

        if let Ok(next) =
            apply_movement(product, warehouse, state, MovementType::Out, debit, None)
        {
            prop_assert_eq!(next.average_cost, state.average_cost);
            prop_assert_eq!(next.quantity, quantity - debit);
        } else {
            prop_assert!(debit > quantity);
        }
    }
}
