//! Role and scoping tests
//!
//! Tests for the role hierarchy behind alert targeting and approvals.

use proptest::prelude::*;
use std::str::FromStr;

use shared::Role;

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Privilege levels are strictly ordered
    #[test]
    fn test_levels_strictly_descending() {
        let levels: Vec<u8> = Role::ALL.iter().map(|r| r.level()).collect();
        for pair in levels.windows(2) {
            assert!(pair[0] > pair[1]);
        }
    }

    /// Exactly the admin-tier roles see every warehouse
    #[test]
    fn test_global_scope_roles() {
        assert!(Role::Admin.has_global_scope());
        assert!(Role::AdminManager.has_global_scope());
        assert!(Role::AdminViewer.has_global_scope());
        assert!(!Role::Manager.has_global_scope());
        assert!(!Role::User.has_global_scope());
        assert!(!Role::Viewer.has_global_scope());
    }

    /// Viewer-tier roles cannot write
    #[test]
    fn test_viewers_cannot_write() {
        assert!(!Role::Viewer.can_write());
        assert!(!Role::AdminViewer.can_write());
        assert!(Role::User.can_write());
        assert!(Role::Manager.can_write());
    }

    /// Only the admin tier approves transfers
    #[test]
    fn test_approval_restricted_to_admins() {
        assert!(Role::Admin.can_approve());
        assert!(Role::AdminManager.can_approve());
        assert!(!Role::Manager.can_approve());
        assert!(!Role::User.can_approve());
        assert!(!Role::AdminViewer.can_approve());
    }

    /// Management tier includes warehouse managers
    #[test]
    fn test_management_tier() {
        assert!(Role::Manager.can_manage());
        assert!(!Role::User.can_manage());
        assert!(!Role::AdminViewer.can_manage());
    }

    /// at_least follows the level ordering
    #[test]
    fn test_at_least() {
        assert!(Role::Admin.at_least(Role::Manager));
        assert!(Role::Manager.at_least(Role::Manager));
        assert!(!Role::User.at_least(Role::Manager));
    }

    /// Stored role strings round-trip through parsing
    #[test]
    fn test_role_string_round_trip() {
        for role in Role::ALL {
            assert_eq!(Role::from_str(role.as_str()).unwrap(), role);
        }
    }

    /// Unknown role strings fail to parse
    #[test]
    fn test_unknown_role_rejected() {
        assert!(Role::from_str("superadmin").is_err());
        assert!(Role::from_str("").is_err());
        assert!(Role::from_str("Admin").is_err());
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

proptest! {
    /// at_least is consistent with the level ordering for every pair
    #[test]
    fn prop_at_least_matches_levels(a in 0..Role::ALL.len(), b in 0..Role::ALL.len()) {
        let (a, b) = (Role::ALL[a], Role::ALL[b]);
        prop_assert_eq!(a.at_least(b), a.level() >= b.level());
    }

    /// Display and as_str agree and parse back to the same role
    #[test]
    fn prop_display_round_trip(idx in 0..Role::ALL.len()) {
        let role = Role::ALL[idx];
        prop_assert_eq!(role.to_string(), role.as_str());
        prop_assert_eq!(role.to_string().parse::<Role>().unwrap(), role);
    }
}
