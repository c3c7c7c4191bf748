//! Validation helpers for stock and transfer inputs
//!
//! Malformed input is rejected before any state is touched; these helpers
//! return a plain message the service layer maps onto its error type.

use uuid::Uuid;

/// Movement and transfer quantities must be strictly positive.
pub fn validate_positive_quantity(quantity: i64) -> Result<(), &'static str> {
    if quantity > 0 {
        Ok(())
    } else {
        Err("Quantity must be positive")
    }
}

/// Counted quantities may be zero (an empty shelf) but never negative.
pub fn validate_counted_quantity(quantity: i64) -> Result<(), &'static str> {
    if quantity >= 0 {
        Ok(())
    } else {
        Err("Counted quantity cannot be negative")
    }
}

/// A transfer must move stock between two different warehouses.
pub fn validate_distinct_warehouses(source: Uuid, destination: Uuid) -> Result<(), &'static str> {
    if source != destination {
        Ok(())
    } else {
        Err("Source and destination warehouses must differ")
    }
}

/// A transfer request must carry at least one item.
pub fn validate_has_items(item_count: usize) -> Result<(), &'static str> {
    if item_count > 0 {
        Ok(())
    } else {
        Err("At least one item is required")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_positive_quantity() {
        assert!(validate_positive_quantity(1).is_ok());
        assert!(validate_positive_quantity(0).is_err());
        assert!(validate_positive_quantity(-5).is_err());
    }

    #[test]
    fn test_validate_counted_quantity_allows_zero() {
        assert!(validate_counted_quantity(0).is_ok());
        assert!(validate_counted_quantity(10).is_ok());
        assert!(validate_counted_quantity(-1).is_err());
    }

    #[test]
    fn test_validate_distinct_warehouses() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert!(validate_distinct_warehouses(a, b).is_ok());
        assert!(validate_distinct_warehouses(a, a).is_err());
    }

    #[test]
    fn test_validate_has_items() {
        assert!(validate_has_items(1).is_ok());
        assert!(validate_has_items(0).is_err());
    }
}
