//! Stock valuation math

use rust_decimal::Decimal;

/// Weighted-average unit cost of a position after an inbound receipt.
///
/// Each receipt blends its cost into the running average, weighted by
/// relative quantities. A position that has been fully depleted does not
/// blend with its stale prior cost: the incoming cost replaces it outright.
pub fn weighted_average_cost(
    current_quantity: i64,
    current_cost: Decimal,
    incoming_quantity: i64,
    incoming_cost: Decimal,
) -> Decimal {
    if current_quantity <= 0 {
        return incoming_cost;
    }

    let current_qty = Decimal::from(current_quantity);
    let incoming_qty = Decimal::from(incoming_quantity);

    (current_qty * current_cost + incoming_qty * incoming_cost) / (current_qty + incoming_qty)
}

/// Value of a position at its current average cost.
pub fn position_valuation(quantity: i64, average_cost: Decimal) -> Decimal {
    Decimal::from(quantity) * average_cost
}

/// Low-stock comparison. Boundary inclusive: a quantity exactly at the
/// threshold counts as low.
pub fn at_or_below_threshold(quantity: i64, threshold: i64) -> bool {
    quantity <= threshold
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_depleted_position_takes_incoming_cost() {
        assert_eq!(
            weighted_average_cost(0, Decimal::from(1000), 5, Decimal::from(2000)),
            Decimal::from(2000)
        );
    }

    proptest! {
        #[test]
        fn prop_valuation_scales_with_quantity(qty in 0..1_000_000i64, cost in 0..1_000_000i64) {
            let cost = Decimal::from(cost);
            prop_assert_eq!(position_valuation(qty, cost), Decimal::from(qty) * cost);
        }
    }
}
