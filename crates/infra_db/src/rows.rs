//! Row types for the ledger tables
//!
//! Each row mirrors one table column for column. Conversions into ledger
//! types fail with `PortError::Transformation` when stored data no longer
//! parses, for example a timesheet date still in a legacy day-first form.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;
use uuid::Uuid;

use core_kernel::{AuditEventId, CapabilitySet, ClientId, EmployeeId, EntryId, PortError, Role};
use domain_ledger::{
    AuditAction, AuditFact, Client, Employee, EntityKind, EntryKind, EntryType, RateHistoryRecord,
    StoredEntry, TimesheetEntry, UserAccount,
};

fn employee_id(raw: &str) -> Result<EmployeeId, PortError> {
    EmployeeId::parse(raw).map_err(|e| PortError::transformation(format!("employeeId: {}", e)))
}

/// Blank linked ids belong to Normal entries stored with a supplied charge
fn optional_employee_id(raw: &str) -> Result<Option<EmployeeId>, PortError> {
    match raw.trim() {
        "" => Ok(None),
        id => employee_id(id).map(Some),
    }
}

fn client_id(raw: &str) -> Result<ClientId, PortError> {
    ClientId::parse(raw).map_err(|e| PortError::transformation(format!("clientId: {}", e)))
}

fn optional_client_id(raw: Option<&str>) -> Result<Option<ClientId>, PortError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(id) => client_id(id).map(Some),
        None => Ok(None),
    }
}

fn iso_date(raw: &str, column: &str) -> Result<NaiveDate, PortError> {
    raw.trim()
        .parse::<NaiveDate>()
        .map_err(|_| PortError::transformation(format!("{} is not an ISO date: {}", column, raw)))
}

#[derive(Debug, Clone, FromRow)]
#[sqlx(rename_all = "camelCase")]
pub struct EmployeeRow {
    pub employee_id: String,
    pub name: String,
    pub hourly_rate: Decimal,
}

impl TryFrom<EmployeeRow> for Employee {
    type Error = PortError;

    fn try_from(row: EmployeeRow) -> Result<Self, Self::Error> {
        Ok(Employee::new(employee_id(&row.employee_id)?, row.name, row.hourly_rate))
    }
}

#[derive(Debug, Clone, FromRow)]
#[sqlx(rename_all = "camelCase")]
pub struct RateHistoryRow {
    pub employee_id: String,
    pub hourly_rate: Decimal,
    pub effective_date: NaiveDate,
}

impl TryFrom<RateHistoryRow> for RateHistoryRecord {
    type Error = PortError;

    fn try_from(row: RateHistoryRow) -> Result<Self, Self::Error> {
        Ok(RateHistoryRecord::new(
            employee_id(&row.employee_id)?,
            row.hourly_rate,
            row.effective_date,
        ))
    }
}

#[derive(Debug, Clone, FromRow)]
#[sqlx(rename_all = "camelCase")]
pub struct ClientRow {
    pub client_id: String,
    pub client_name: String,
    pub notes: Option<String>,
}

impl TryFrom<ClientRow> for Client {
    type Error = PortError;

    fn try_from(row: ClientRow) -> Result<Self, Self::Error> {
        let client = Client::new(client_id(&row.client_id)?, row.client_name);
        Ok(match row.notes {
            Some(notes) => client.with_notes(notes),
            None => client,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
#[sqlx(rename_all = "camelCase")]
pub struct UserRow {
    pub username: String,
    pub role: String,
    pub can_view: bool,
    pub can_create: bool,
    pub can_edit: bool,
    pub can_delete: bool,
    pub can_export: bool,
}

impl TryFrom<UserRow> for UserAccount {
    type Error = PortError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role: Role = row
            .role
            .parse()
            .map_err(|_| PortError::transformation(format!("Unknown role: {}", row.role)))?;
        let capabilities = CapabilitySet {
            can_view: row.can_view,
            can_create: row.can_create,
            can_edit: row.can_edit,
            can_delete: row.can_delete,
            can_export: row.can_export,
        };
        Ok(UserAccount::new(row.username, role, capabilities))
    }
}

/// Flat timesheet row; the entry kind is spread over `entryType`, `linkedId`
/// and the two transfer columns
#[derive(Debug, Clone, FromRow)]
#[sqlx(rename_all = "camelCase")]
pub struct TimesheetRow {
    pub id: i64,
    pub entry_id: Uuid,
    pub date: String,
    pub client_id: String,
    pub description: String,
    pub linked_id: String,
    pub time_spent: String,
    pub charge_out: Decimal,
    pub entry_type: String,
    pub transfer_from_client_id: Option<String>,
    pub transfer_to_client_id: Option<String>,
    pub imported_date: Option<String>,
}

impl TryFrom<TimesheetRow> for StoredEntry {
    type Error = PortError;

    fn try_from(row: TimesheetRow) -> Result<Self, Self::Error> {
        let entry_type: EntryType = row
            .entry_type
            .parse()
            .map_err(|_| PortError::transformation(format!("Unknown entry type: {}", row.entry_type)))?;

        let kind = match entry_type {
            EntryType::Normal => EntryKind::Normal {
                employee_id: optional_employee_id(&row.linked_id)?,
            },
            EntryType::CloseOff => EntryKind::CloseOff {
                reference: row.linked_id.clone(),
            },
            EntryType::Transfer => EntryKind::Transfer {
                counterparty: row.linked_id.clone(),
                from_client: optional_client_id(row.transfer_from_client_id.as_deref())?,
                to_client: optional_client_id(row.transfer_to_client_id.as_deref())?,
            },
        };

        let imported_date = match row.imported_date.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => Some(iso_date(raw, "importedDate")?),
            _ => None,
        };

        Ok(StoredEntry {
            id: EntryId::from_uuid(row.entry_id),
            sequence: row.id,
            entry: TimesheetEntry {
                date: iso_date(&row.date, "date")?,
                client_id: client_id(&row.client_id)?,
                description: row.description,
                time_spent: row.time_spent,
                charge_out: row.charge_out,
                kind,
                imported_date,
            },
        })
    }
}

/// Column values written for one entry, in table order
#[derive(Debug, Clone, PartialEq)]
pub struct TimesheetValues {
    pub date: String,
    pub client_id: String,
    pub description: String,
    pub linked_id: String,
    pub time_spent: String,
    pub charge_out: Decimal,
    pub entry_type: &'static str,
    pub transfer_from_client_id: Option<String>,
    pub transfer_to_client_id: Option<String>,
    pub imported_date: Option<String>,
}

impl From<&TimesheetEntry> for TimesheetValues {
    fn from(entry: &TimesheetEntry) -> Self {
        Self {
            date: entry.date.to_string(),
            client_id: entry.client_id.to_string(),
            description: entry.description.clone(),
            linked_id: entry.linked_id().to_string(),
            time_spent: entry.time_spent.clone(),
            charge_out: entry.charge_out,
            entry_type: entry.entry_type().as_str(),
            transfer_from_client_id: entry.transfer_from().map(ClientId::to_string),
            transfer_to_client_id: entry.transfer_to().map(ClientId::to_string),
            imported_date: entry.imported_date.map(|d| d.to_string()),
        }
    }
}

#[derive(Debug, Clone, FromRow)]
#[sqlx(rename_all = "camelCase")]
pub struct AuditRow {
    pub event_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub username: String,
    pub action: String,
    pub table_name: String,
    pub record_id: String,
    pub old_values: Option<String>,
    pub new_values: Option<String>,
    pub details: String,
}

fn audit_action(raw: &str) -> Result<AuditAction, PortError> {
    match raw {
        "CREATE" => Ok(AuditAction::Create),
        "UPDATE" => Ok(AuditAction::Update),
        "DELETE" => Ok(AuditAction::Delete),
        other => Err(PortError::transformation(format!("Unknown audit action: {}", other))),
    }
}

fn snapshot(raw: Option<String>) -> Result<Option<serde_json::Value>, PortError> {
    raw.map(|text| serde_json::from_str(&text))
        .transpose()
        .map_err(|e| PortError::transformation(format!("Audit snapshot is not JSON: {}", e)))
}

impl TryFrom<AuditRow> for AuditFact {
    type Error = PortError;

    fn try_from(row: AuditRow) -> Result<Self, Self::Error> {
        let entity_kind = EntityKind::from_table_name(&row.table_name).ok_or_else(|| {
            PortError::transformation(format!("Unknown audited table: {}", row.table_name))
        })?;

        Ok(AuditFact {
            id: AuditEventId::from_uuid(row.event_id),
            timestamp: row.timestamp,
            actor: row.username,
            action: audit_action(&row.action)?,
            entity_kind,
            entity_id: row.record_id,
            before: snapshot(row.old_values)?,
            after: snapshot(row.new_values)?,
            summary: row.details,
        })
    }
}
