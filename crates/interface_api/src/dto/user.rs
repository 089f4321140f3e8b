//! User account DTOs

use serde::Deserialize;
use validator::Validate;

use core_kernel::{CapabilitySet, Role};
use domain_ledger::UserAccount;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UserRequest {
    #[validate(length(min = 1, max = 64))]
    pub username: String,
    #[serde(default)]
    pub role: Role,
    #[serde(flatten)]
    pub capabilities: CapabilitySet,
}

impl From<UserRequest> for UserAccount {
    fn from(request: UserRequest) -> Self {
        UserAccount::new(request.username.trim(), request.role, request.capabilities)
    }
}
