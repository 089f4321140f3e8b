//! Audit facts for ledger mutations
//!
//! Every create, update or delete on employees, clients, timesheets or users
//! produces exactly one [`AuditFact`]. Facts are written through the
//! [`AuditSink`](crate::ports::AuditSink) port by [`AuditEmitter`], which logs
//! and swallows write failures so the mutation itself still succeeds.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use core_kernel::AuditEventId;

use crate::ports::AuditSink;

/// Most recent facts returned by a query when no limit is given
pub const DEFAULT_AUDIT_LIMIT: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Create => "CREATE",
            AuditAction::Update => "UPDATE",
            AuditAction::Delete => "DELETE",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The kind of record a fact describes; serialized as its table name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    #[serde(rename = "Employees")]
    Employee,
    #[serde(rename = "Clients")]
    Client,
    #[serde(rename = "Timesheets")]
    Timesheet,
    #[serde(rename = "Users")]
    User,
}

impl EntityKind {
    pub fn table_name(&self) -> &'static str {
        match self {
            EntityKind::Employee => "Employees",
            EntityKind::Client => "Clients",
            EntityKind::Timesheet => "Timesheets",
            EntityKind::User => "Users",
        }
    }

    pub fn from_table_name(name: &str) -> Option<Self> {
        match name {
            "Employees" => Some(EntityKind::Employee),
            "Clients" => Some(EntityKind::Client),
            "Timesheets" => Some(EntityKind::Timesheet),
            "Users" => Some(EntityKind::User),
            _ => None,
        }
    }
}

/// An immutable record of one mutation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditFact {
    pub id: AuditEventId,
    pub timestamp: DateTime<Utc>,
    /// Username of the session that performed the mutation
    pub actor: String,
    pub action: AuditAction,
    pub entity_kind: EntityKind,
    pub entity_id: String,
    pub before: Option<serde_json::Value>,
    pub after: Option<serde_json::Value>,
    pub summary: String,
}

impl AuditFact {
    pub fn new(
        actor: impl Into<String>,
        action: AuditAction,
        entity_kind: EntityKind,
        entity_id: impl Into<String>,
        summary: impl Into<String>,
    ) -> Self {
        Self {
            id: AuditEventId::new(),
            timestamp: Utc::now(),
            actor: actor.into(),
            action,
            entity_kind,
            entity_id: entity_id.into(),
            before: None,
            after: None,
            summary: summary.into(),
        }
    }

    pub fn with_before(mut self, before: serde_json::Value) -> Self {
        self.before = Some(before);
        self
    }

    pub fn with_after(mut self, after: serde_json::Value) -> Self {
        self.after = Some(after);
        self
    }
}

/// Filters for reading the audit trail, newest first
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditQuery {
    pub start_date: Option<NaiveDate>,
    /// Inclusive; covers the whole day
    pub end_date: Option<NaiveDate>,
    pub username: Option<String>,
    pub action: Option<AuditAction>,
    pub entity_kind: Option<EntityKind>,
    pub limit: Option<usize>,
}

impl AuditQuery {
    pub fn effective_limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_AUDIT_LIMIT).min(DEFAULT_AUDIT_LIMIT)
    }

    pub fn matches(&self, fact: &AuditFact) -> bool {
        let day = fact.timestamp.date_naive();
        self.start_date.map_or(true, |s| day >= s)
            && self.end_date.map_or(true, |e| day <= e)
            && self.username.as_deref().map_or(true, |u| fact.actor == u)
            && self.action.map_or(true, |a| fact.action == a)
            && self.entity_kind.map_or(true, |k| fact.entity_kind == k)
    }
}

/// Best-effort writer of audit facts
#[derive(Clone)]
pub struct AuditEmitter {
    sink: Arc<dyn AuditSink>,
}

impl AuditEmitter {
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self { sink }
    }

    /// Writes the fact; a failed write is logged and otherwise ignored
    pub async fn emit(&self, fact: AuditFact) {
        match self.sink.record(&fact).await {
            Ok(()) => debug!(
                action = %fact.action,
                table = fact.entity_kind.table_name(),
                record_id = %fact.entity_id,
                "Audit fact recorded"
            ),
            Err(e) => warn!(
                error = %e,
                action = %fact.action,
                table = fact.entity_kind.table_name(),
                record_id = %fact.entity_id,
                "Audit logging failed"
            ),
        }
    }
}

impl fmt::Debug for AuditEmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuditEmitter").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fact_at(actor: &str, action: AuditAction, kind: EntityKind, y: i32, m: u32, d: u32) -> AuditFact {
        let mut fact = AuditFact::new(actor, action, kind, "1", "summary");
        fact.timestamp = Utc.with_ymd_and_hms(y, m, d, 23, 59, 0).unwrap();
        fact
    }

    #[test]
    fn test_entity_kind_table_names() {
        assert_eq!(EntityKind::Timesheet.table_name(), "Timesheets");
        assert_eq!(EntityKind::from_table_name("Users"), Some(EntityKind::User));
        assert_eq!(serde_json::to_string(&EntityKind::Client).unwrap(), "\"Clients\"");
    }

    #[test]
    fn test_query_end_date_covers_whole_day() {
        let query = AuditQuery {
            end_date: NaiveDate::from_ymd_opt(2024, 3, 5),
            ..Default::default()
        };
        assert!(query.matches(&fact_at("admin", AuditAction::Create, EntityKind::Client, 2024, 3, 5)));
        assert!(!query.matches(&fact_at("admin", AuditAction::Create, EntityKind::Client, 2024, 3, 6)));
    }

    #[test]
    fn test_query_filters_combine() {
        let query = AuditQuery {
            username: Some("clerk".to_string()),
            action: Some(AuditAction::Delete),
            ..Default::default()
        };
        assert!(query.matches(&fact_at("clerk", AuditAction::Delete, EntityKind::Employee, 2024, 1, 1)));
        assert!(!query.matches(&fact_at("admin", AuditAction::Delete, EntityKind::Employee, 2024, 1, 1)));
        assert!(!query.matches(&fact_at("clerk", AuditAction::Update, EntityKind::Employee, 2024, 1, 1)));
    }

    #[test]
    fn test_query_limit_is_capped() {
        assert_eq!(AuditQuery::default().effective_limit(), 1000);
        let query = AuditQuery { limit: Some(5_000), ..Default::default() };
        assert_eq!(query.effective_limit(), 1000);
    }
}
