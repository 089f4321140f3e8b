//! Caller sessions and capability checks
//!
//! Every ledger operation receives the caller's [`Session`] explicitly. The
//! session carries the username recorded on audit facts and the capability
//! set checked once, before any work starts.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Role {
    Admin,
    #[default]
    Normal,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Normal => "Normal",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "normal" | "user" => Ok(Role::Normal),
            other => Err(format!("Unknown role: {}", other)),
        }
    }
}

/// A single thing a caller may be allowed to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    View,
    Create,
    Edit,
    Delete,
    Export,
    /// Administer user accounts; only ever granted through the Admin role
    ManageUsers,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Capability::View => "view",
            Capability::Create => "create",
            Capability::Edit => "edit",
            Capability::Delete => "delete",
            Capability::Export => "export",
            Capability::ManageUsers => "manage users",
        };
        f.write_str(name)
    }
}

/// Per-account capability flags, mirroring the `can*` columns on user accounts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilitySet {
    pub can_view: bool,
    pub can_create: bool,
    pub can_edit: bool,
    pub can_delete: bool,
    pub can_export: bool,
}

impl Default for CapabilitySet {
    fn default() -> Self {
        Self::read_only()
    }
}

impl CapabilitySet {
    pub fn all() -> Self {
        Self {
            can_view: true,
            can_create: true,
            can_edit: true,
            can_delete: true,
            can_export: true,
        }
    }

    pub fn read_only() -> Self {
        Self {
            can_view: true,
            can_create: false,
            can_edit: false,
            can_delete: false,
            can_export: false,
        }
    }

    pub fn none() -> Self {
        Self {
            can_view: false,
            ..Self::read_only()
        }
    }

    pub fn allows(&self, capability: Capability) -> bool {
        match capability {
            Capability::View => self.can_view,
            Capability::Create => self.can_create,
            Capability::Edit => self.can_edit,
            Capability::Delete => self.can_delete,
            Capability::Export => self.can_export,
            Capability::ManageUsers => false,
        }
    }
}

/// Returned when a session lacks a required capability
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Permission denied: {username} may not {capability}")]
pub struct PermissionDenied {
    pub username: String,
    pub capability: Capability,
}

/// The authenticated caller of a ledger operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub username: String,
    pub role: Role,
    pub capabilities: CapabilitySet,
}

impl Session {
    pub fn new(username: impl Into<String>, role: Role, capabilities: CapabilitySet) -> Self {
        Self {
            username: username.into(),
            role,
            capabilities,
        }
    }

    /// An administrator session; admins hold every capability
    pub fn admin(username: impl Into<String>) -> Self {
        Self::new(username, Role::Admin, CapabilitySet::all())
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn can(&self, capability: Capability) -> bool {
        self.is_admin() || self.capabilities.allows(capability)
    }

    /// Fails fast if the session lacks `capability`
    ///
    /// # Errors
    ///
    /// Returns `PermissionDenied` naming the user and the missing capability.
    pub fn require(&self, capability: Capability) -> Result<(), PermissionDenied> {
        if self.can(capability) {
            Ok(())
        } else {
            Err(PermissionDenied {
                username: self.username.clone(),
                capability,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_holds_every_capability() {
        let session = Session::admin("root");
        assert!(session.require(Capability::ManageUsers).is_ok());
        assert!(session.require(Capability::Delete).is_ok());
    }

    #[test]
    fn test_normal_user_limited_to_flags() {
        let session = Session::new("clerk", Role::Normal, CapabilitySet::read_only());
        assert!(session.can(Capability::View));

        let err = session.require(Capability::Create).unwrap_err();
        assert_eq!(err.to_string(), "Permission denied: clerk may not create");
        assert!(session.require(Capability::ManageUsers).is_err());
    }

    #[test]
    fn test_normal_user_never_manages_users() {
        let session = Session::new("lead", Role::Normal, CapabilitySet::all());
        assert!(!session.can(Capability::ManageUsers));
    }

    #[test]
    fn test_role_parse() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("Normal".parse::<Role>().unwrap(), Role::Normal);
        assert!("guest".parse::<Role>().is_err());
    }
}
