//! User role model
//!
//! Roles form an explicit hierarchy; scope checks are pure functions over
//! the enum so that authorization decisions stay out of the service layer
//! and remain trivially testable.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// User roles, from most to least privileged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    AdminManager,
    Manager,
    User,
    AdminViewer,
    Viewer,
}

impl Role {
    /// All roles, in descending privilege order.
    pub const ALL: [Role; 6] = [
        Role::Admin,
        Role::AdminManager,
        Role::Manager,
        Role::User,
        Role::AdminViewer,
        Role::Viewer,
    ];

    /// Position in the hierarchy; higher means more privileged.
    pub fn level(&self) -> u8 {
        match self {
            Role::Admin => 100,
            Role::AdminManager => 80,
            Role::Manager => 60,
            Role::User => 40,
            Role::AdminViewer => 20,
            Role::Viewer => 10,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::AdminManager => "admin_manager",
            Role::Manager => "manager",
            Role::User => "user",
            Role::AdminViewer => "admin_viewer",
            Role::Viewer => "viewer",
        }
    }

    /// Whether this role sees every warehouse, not only assigned ones.
    pub fn has_global_scope(&self) -> bool {
        matches!(self, Role::Admin | Role::AdminManager | Role::AdminViewer)
    }

    pub fn can_write(&self) -> bool {
        !matches!(self, Role::AdminViewer | Role::Viewer)
    }

    pub fn can_manage(&self) -> bool {
        matches!(self, Role::Admin | Role::AdminManager | Role::Manager)
    }

    pub fn can_approve(&self) -> bool {
        matches!(self, Role::Admin | Role::AdminManager)
    }

    pub fn at_least(&self, minimum: Role) -> bool {
        self.level() >= minimum.level()
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a stored role string is unknown.
#[derive(Debug, Error)]
#[error("unknown role: {0}")]
pub struct ParseRoleError(pub String);

impl std::str::FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "admin_manager" => Ok(Role::AdminManager),
            "manager" => Ok(Role::Manager),
            "user" => Ok(Role::User),
            "admin_viewer" => Ok(Role::AdminViewer),
            "viewer" => Ok(Role::Viewer),
            other => Err(ParseRoleError(other.to_string())),
        }
    }
}
