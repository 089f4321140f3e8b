//! Back-office user accounts
//!
//! Credentials belong to the authentication service; the ledger only keeps
//! each account's role and capability flags.

use serde::{Deserialize, Serialize};

use core_kernel::{CapabilitySet, Role, Session};

use crate::error::LedgerError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAccount {
    pub username: String,
    pub role: Role,
    #[serde(flatten)]
    pub capabilities: CapabilitySet,
}

impl UserAccount {
    pub fn new(username: impl Into<String>, role: Role, capabilities: CapabilitySet) -> Self {
        Self {
            username: username.into(),
            role,
            capabilities,
        }
    }

    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.username.trim().is_empty() {
            return Err(LedgerError::validation("Username must not be empty"));
        }
        Ok(())
    }

    /// Builds the session this account acts under
    pub fn session(&self) -> Session {
        Session::new(self.username.clone(), self.role, self.capabilities)
    }
}
