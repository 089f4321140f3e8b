//! Audit trail DTOs

use chrono::NaiveDate;
use serde::Deserialize;
use validator::Validate;

use domain_ledger::{AuditAction, AuditQuery, EntityKind};

use super::non_blank;

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogParams {
    pub start_date: Option<NaiveDate>,
    /// Inclusive of the whole day
    pub end_date: Option<NaiveDate>,
    pub username: Option<String>,
    pub action: Option<AuditAction>,
    pub table_name: Option<EntityKind>,
    #[validate(range(min = 1, max = 1000))]
    pub limit: Option<usize>,
}

impl From<AuditLogParams> for AuditQuery {
    fn from(params: AuditLogParams) -> Self {
        AuditQuery {
            start_date: params.start_date,
            end_date: params.end_date,
            username: non_blank(params.username),
            action: params.action,
            entity_kind: params.table_name,
            limit: params.limit,
        }
    }
}
