//! PostgreSQL Ledger Store
//!
//! One adapter implements every ledger port against the schema in
//! `migrations/`. Timesheet filters are assembled with [`QueryBuilder`] so the
//! same predicate drives listing, paging, counting and summing.
//!
//! ```rust,ignore
//! use infra_db::{create_pool, DatabaseConfig, PostgresLedgerStore};
//! use domain_ledger::{LedgerConfig, LedgerPorts, LedgerService};
//! use std::sync::Arc;
//!
//! let pool = create_pool(DatabaseConfig::new(url)).await?;
//! let store = Arc::new(PostgresLedgerStore::new(pool));
//! let service = LedgerService::new(LedgerPorts::from_store(store), LedgerConfig::default());
//! ```

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::{debug, instrument};

use core_kernel::{
    ClientId, DomainPort, EmployeeId, EntryId, HealthCheckResult, HealthCheckable,
    PortError,
};
use domain_ledger::{
    AuditFact, AuditQuery, AuditSink, Client, ClientPort, Employee, EmployeePort, EntryFilter,
    RateHistoryRecord, StoredEntry, TimesheetEntry, TimesheetPort, UserAccount, UserPort,
};

use crate::error::DatabaseError;
use crate::rows::{
    AuditRow, ClientRow, EmployeeRow, RateHistoryRow, TimesheetRow, TimesheetValues, UserRow,
};

const ADAPTER_ID: &str = "postgres-ledger-store";

const TIMESHEET_COLUMNS: &str = r#""id", "entryId", "date", "clientId", "description", "linkedId",
    "timeSpent", "chargeOut", "entryType", "transferFromClientId", "transferToClientId",
    "importedDate""#;

const USER_COLUMNS: &str =
    r#""username", "role", "canView", "canCreate", "canEdit", "canDelete", "canExport""#;

const AUDIT_COLUMNS: &str = r#""eventId", "timestamp", "username", "action", "tableName",
    "recordId", "oldValues", "newValues", "details""#;

/// PostgreSQL-backed implementation of every ledger port
///
/// Database errors are translated to `PortError` variants:
/// - unique violations -> `PortError::Conflict`
/// - check violations -> `PortError::Validation`
/// - connection failures -> `PortError::Connection`
/// - other errors -> `PortError::Internal`
#[derive(Debug, Clone)]
pub struct PostgresLedgerStore {
    pool: PgPool,
}

impl PostgresLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn db_to_port_error(error: sqlx::Error) -> PortError {
    PortError::from(DatabaseError::from(error))
}

/// Like [`db_to_port_error`], but reports a unique violation with `message`
fn insert_error(error: sqlx::Error, message: impl FnOnce() -> String) -> PortError {
    match DatabaseError::from(&error) {
        DatabaseError::DuplicateEntry(_) => PortError::conflict(message()),
        other => other.into(),
    }
}

fn expect_affected(rows_affected: u64, entity: &str, id: impl std::fmt::Display) -> Result<(), PortError> {
    if rows_affected == 0 {
        return Err(PortError::not_found(entity, id));
    }
    Ok(())
}

fn convert_all<R, T>(rows: Vec<R>) -> Result<Vec<T>, PortError>
where
    T: TryFrom<R, Error = PortError>,
{
    rows.into_iter().map(T::try_from).collect()
}

/// Appends ` WHERE ...` for every set field of `filter`
fn push_entry_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &EntryFilter) {
    builder.push(" WHERE TRUE");
    if let Some(from) = filter.from {
        builder.push(r#" AND "date" >= "#).push_bind(from.to_string());
    }
    if let Some(to) = filter.to {
        builder.push(r#" AND "date" <= "#).push_bind(to.to_string());
    }
    if let Some(before) = filter.before {
        builder.push(r#" AND "date" < "#).push_bind(before.to_string());
    }
    if let Some(client_id) = &filter.client_id {
        builder.push(r#" AND "clientId" = "#).push_bind(client_id.to_string());
    }
    if let Some(linked_id) = &filter.linked_id {
        builder.push(r#" AND "linkedId" = "#).push_bind(linked_id.clone());
    }
}

fn push_audit_filter(builder: &mut QueryBuilder<'_, Postgres>, query: &AuditQuery) {
    builder.push(" WHERE TRUE");
    if let Some(start) = query.start_date {
        builder
            .push(r#" AND ("timestamp" AT TIME ZONE 'UTC')::date >= "#)
            .push_bind(start);
    }
    if let Some(end) = query.end_date {
        builder
            .push(r#" AND ("timestamp" AT TIME ZONE 'UTC')::date <= "#)
            .push_bind(end);
    }
    if let Some(username) = &query.username {
        builder.push(r#" AND "username" = "#).push_bind(username.clone());
    }
    if let Some(action) = query.action {
        builder.push(r#" AND "action" = "#).push_bind(action.as_str());
    }
    if let Some(kind) = query.entity_kind {
        builder.push(r#" AND "tableName" = "#).push_bind(kind.table_name());
    }
}

fn snapshot_text(value: &Option<serde_json::Value>) -> Option<String> {
    value.as_ref().map(serde_json::Value::to_string)
}

impl DomainPort for PostgresLedgerStore {}

#[async_trait]
impl HealthCheckable for PostgresLedgerStore {
    async fn health_check(&self) -> HealthCheckResult {
        let start = std::time::Instant::now();

        let result = sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await;

        let latency_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(_) => HealthCheckResult::healthy(ADAPTER_ID, latency_ms),
            Err(e) => HealthCheckResult::unhealthy(ADAPTER_ID, latency_ms, format!("Database error: {}", e)),
        }
    }
}

#[async_trait]
impl EmployeePort for PostgresLedgerStore {
    #[instrument(skip(self), fields(employee_id = %id))]
    async fn get_employee(&self, id: &EmployeeId) -> Result<Option<Employee>, PortError> {
        let row = sqlx::query_as::<_, EmployeeRow>(
            r#"SELECT "employeeId", "name", "hourlyRate" FROM "Employees" WHERE "employeeId" = $1"#,
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_to_port_error)?;

        row.map(Employee::try_from).transpose()
    }

    #[instrument(skip(self))]
    async fn list_employees(&self) -> Result<Vec<Employee>, PortError> {
        let rows = sqlx::query_as::<_, EmployeeRow>(
            r#"SELECT "employeeId", "name", "hourlyRate" FROM "Employees" ORDER BY "name", "id""#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_to_port_error)?;

        debug!(count = rows.len(), "Loaded employees");
        convert_all(rows)
    }

    #[instrument(skip(self, employee), fields(employee_id = %employee.employee_id))]
    async fn insert_employee(&self, employee: &Employee) -> Result<(), PortError> {
        sqlx::query(r#"INSERT INTO "Employees" ("employeeId", "name", "hourlyRate") VALUES ($1, $2, $3)"#)
            .bind(employee.employee_id.as_str())
            .bind(&employee.name)
            .bind(employee.hourly_rate)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                insert_error(e, || format!("Employee ID {} already exists", employee.employee_id))
            })?;
        Ok(())
    }

    #[instrument(skip(self, employee), fields(employee_id = %employee.employee_id))]
    async fn update_employee(&self, employee: &Employee) -> Result<(), PortError> {
        let result = sqlx::query(
            r#"UPDATE "Employees" SET "name" = $2, "hourlyRate" = $3 WHERE "employeeId" = $1"#,
        )
        .bind(employee.employee_id.as_str())
        .bind(&employee.name)
        .bind(employee.hourly_rate)
        .execute(&self.pool)
        .await
        .map_err(db_to_port_error)?;

        expect_affected(result.rows_affected(), "Employee", &employee.employee_id)
    }

    #[instrument(skip(self), fields(employee_id = %id))]
    async fn delete_employee(&self, id: &EmployeeId) -> Result<(), PortError> {
        let result = sqlx::query(r#"DELETE FROM "Employees" WHERE "employeeId" = $1"#)
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(db_to_port_error)?;

        expect_affected(result.rows_affected(), "Employee", id)
    }

    #[instrument(skip(self, record), fields(employee_id = %record.employee_id, effective_date = %record.effective_date))]
    async fn append_rate(&self, record: &RateHistoryRecord) -> Result<(), PortError> {
        sqlx::query(
            r#"INSERT INTO "EmployeeRateHistory" ("employeeId", "hourlyRate", "effectiveDate")
               VALUES ($1, $2, $3)"#,
        )
        .bind(record.employee_id.as_str())
        .bind(record.hourly_rate)
        .bind(record.effective_date)
        .execute(&self.pool)
        .await
        .map_err(db_to_port_error)?;
        Ok(())
    }

    #[instrument(skip(self), fields(employee_id = %id))]
    async fn rate_history(&self, id: &EmployeeId) -> Result<Vec<RateHistoryRecord>, PortError> {
        let rows = sqlx::query_as::<_, RateHistoryRow>(
            r#"SELECT "employeeId", "hourlyRate", "effectiveDate" FROM "EmployeeRateHistory"
               WHERE "employeeId" = $1 ORDER BY "id""#,
        )
        .bind(id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(db_to_port_error)?;

        debug!(records = rows.len(), "Loaded rate history");
        convert_all(rows)
    }
}

#[async_trait]
impl ClientPort for PostgresLedgerStore {
    #[instrument(skip(self), fields(client_id = %id))]
    async fn get_client(&self, id: &ClientId) -> Result<Option<Client>, PortError> {
        let row = sqlx::query_as::<_, ClientRow>(
            r#"SELECT "clientId", "clientName", "notes" FROM "Clients" WHERE "clientId" = $1"#,
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_to_port_error)?;

        row.map(Client::try_from).transpose()
    }

    #[instrument(skip(self))]
    async fn find_client_by_name(&self, name: &str) -> Result<Option<Client>, PortError> {
        let row = sqlx::query_as::<_, ClientRow>(
            r#"SELECT "clientId", "clientName", "notes" FROM "Clients"
               WHERE "clientName" = $1 ORDER BY "id" LIMIT 1"#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_to_port_error)?;

        row.map(Client::try_from).transpose()
    }

    #[instrument(skip(self))]
    async fn list_clients(&self) -> Result<Vec<Client>, PortError> {
        let rows = sqlx::query_as::<_, ClientRow>(
            r#"SELECT "clientId", "clientName", "notes" FROM "Clients" ORDER BY "clientName", "id""#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_to_port_error)?;

        debug!(count = rows.len(), "Loaded clients");
        convert_all(rows)
    }

    #[instrument(skip(self, client), fields(client_id = %client.client_id))]
    async fn insert_client(&self, client: &Client) -> Result<(), PortError> {
        sqlx::query(r#"INSERT INTO "Clients" ("clientId", "clientName", "notes") VALUES ($1, $2, $3)"#)
            .bind(client.client_id.as_str())
            .bind(&client.client_name)
            .bind(&client.notes)
            .execute(&self.pool)
            .await
            .map_err(|e| insert_error(e, || format!("Client ID {} already exists", client.client_id)))?;
        Ok(())
    }

    #[instrument(skip(self, client), fields(client_id = %client.client_id))]
    async fn update_client(&self, client: &Client) -> Result<(), PortError> {
        let result = sqlx::query(
            r#"UPDATE "Clients" SET "clientName" = $2, "notes" = $3 WHERE "clientId" = $1"#,
        )
        .bind(client.client_id.as_str())
        .bind(&client.client_name)
        .bind(&client.notes)
        .execute(&self.pool)
        .await
        .map_err(db_to_port_error)?;

        expect_affected(result.rows_affected(), "Client", &client.client_id)
    }

    #[instrument(skip(self), fields(client_id = %id))]
    async fn delete_client(&self, id: &ClientId) -> Result<(), PortError> {
        let result = sqlx::query(r#"DELETE FROM "Clients" WHERE "clientId" = $1"#)
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(db_to_port_error)?;

        expect_affected(result.rows_affected(), "Client", id)
    }
}

#[async_trait]
impl TimesheetPort for PostgresLedgerStore {
    #[instrument(skip(self, entry), fields(client_id = %entry.client_id, date = %entry.date))]
    async fn insert_entry(&self, entry: &TimesheetEntry) -> Result<StoredEntry, PortError> {
        let values = TimesheetValues::from(entry);
        let sql = format!(
            r#"INSERT INTO "Timesheets" ("entryId", "date", "clientId", "description", "linkedId",
                   "timeSpent", "chargeOut", "entryType", "transferFromClientId",
                   "transferToClientId", "importedDate")
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
               RETURNING {}"#,
            TIMESHEET_COLUMNS
        );

        let row = sqlx::query_as::<_, TimesheetRow>(&sql)
            .bind(*EntryId::new().as_uuid())
            .bind(values.date)
            .bind(values.client_id)
            .bind(values.description)
            .bind(values.linked_id)
            .bind(values.time_spent)
            .bind(values.charge_out)
            .bind(values.entry_type)
            .bind(values.transfer_from_client_id)
            .bind(values.transfer_to_client_id)
            .bind(values.imported_date)
            .fetch_one(&self.pool)
            .await
            .map_err(db_to_port_error)?;

        debug!(sequence = row.id, "Inserted timesheet entry");
        StoredEntry::try_from(row)
    }

    #[instrument(skip(self), fields(entry_id = %id))]
    async fn get_entry(&self, id: EntryId) -> Result<Option<StoredEntry>, PortError> {
        let sql = format!(r#"SELECT {} FROM "Timesheets" WHERE "entryId" = $1"#, TIMESHEET_COLUMNS);
        let row = sqlx::query_as::<_, TimesheetRow>(&sql)
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_to_port_error)?;

        row.map(StoredEntry::try_from).transpose()
    }

    #[instrument(skip(self, entry), fields(entry_id = %id))]
    async fn update_entry(&self, id: EntryId, entry: &TimesheetEntry) -> Result<StoredEntry, PortError> {
        let values = TimesheetValues::from(entry);
        let sql = format!(
            r#"UPDATE "Timesheets" SET "date" = $2, "clientId" = $3, "description" = $4,
                   "linkedId" = $5, "timeSpent" = $6, "chargeOut" = $7, "entryType" = $8,
                   "transferFromClientId" = $9, "transferToClientId" = $10, "importedDate" = $11
               WHERE "entryId" = $1
               RETURNING {}"#,
            TIMESHEET_COLUMNS
        );

        let row = sqlx::query_as::<_, TimesheetRow>(&sql)
            .bind(*id.as_uuid())
            .bind(values.date)
            .bind(values.client_id)
            .bind(values.description)
            .bind(values.linked_id)
            .bind(values.time_spent)
            .bind(values.charge_out)
            .bind(values.entry_type)
            .bind(values.transfer_from_client_id)
            .bind(values.transfer_to_client_id)
            .bind(values.imported_date)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_to_port_error)?
            .ok_or_else(|| PortError::not_found("Timesheet", id))?;

        StoredEntry::try_from(row)
    }

    #[instrument(skip(self), fields(entry_id = %id))]
    async fn delete_entry(&self, id: EntryId) -> Result<(), PortError> {
        let result = sqlx::query(r#"DELETE FROM "Timesheets" WHERE "entryId" = $1"#)
            .bind(*id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(db_to_port_error)?;

        expect_affected(result.rows_affected(), "Timesheet", id)
    }

    #[instrument(skip(self))]
    async fn find_entries(&self, filter: &EntryFilter) -> Result<Vec<StoredEntry>, PortError> {
        let mut builder = QueryBuilder::<Postgres>::new(format!(
            r#"SELECT {} FROM "Timesheets""#,
            TIMESHEET_COLUMNS
        ));
        push_entry_filter(&mut builder, filter);
        builder.push(r#" ORDER BY "date", "id""#);

        let rows = builder
            .build_query_as::<TimesheetRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(db_to_port_error)?;

        debug!(count = rows.len(), "Loaded timesheet entries");
        convert_all(rows)
    }

    #[instrument(skip(self))]
    async fn page_entries(
        &self,
        filter: &EntryFilter,
        limit: u32,
        offset: u64,
    ) -> Result<Vec<StoredEntry>, PortError> {
        let mut builder = QueryBuilder::<Postgres>::new(format!(
            r#"SELECT {} FROM "Timesheets""#,
            TIMESHEET_COLUMNS
        ));
        push_entry_filter(&mut builder, filter);
        builder
            .push(r#" ORDER BY "date" DESC, "id" DESC LIMIT "#)
            .push_bind(i64::from(limit))
            .push(" OFFSET ")
            .push_bind(i64::try_from(offset).unwrap_or(i64::MAX));

        let rows = builder
            .build_query_as::<TimesheetRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(db_to_port_error)?;

        convert_all(rows)
    }

    #[instrument(skip(self))]
    async fn count_entries(&self, filter: &EntryFilter) -> Result<u64, PortError> {
        let mut builder = QueryBuilder::<Postgres>::new(r#"SELECT COUNT(*) FROM "Timesheets""#);
        push_entry_filter(&mut builder, filter);

        let count: i64 = builder
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(db_to_port_error)?;

        Ok(u64::try_from(count).unwrap_or_default())
    }

    #[instrument(skip(self))]
    async fn sum_charges(&self, filter: &EntryFilter) -> Result<Decimal, PortError> {
        let mut builder =
            QueryBuilder::<Postgres>::new(r#"SELECT COALESCE(SUM("chargeOut"), 0) FROM "Timesheets""#);
        push_entry_filter(&mut builder, filter);

        builder
            .build_query_scalar::<Decimal>()
            .fetch_one(&self.pool)
            .await
            .map_err(db_to_port_error)
    }
}

#[async_trait]
impl UserPort for PostgresLedgerStore {
    #[instrument(skip(self))]
    async fn get_user(&self, username: &str) -> Result<Option<UserAccount>, PortError> {
        let sql = format!(r#"SELECT {} FROM "Users" WHERE "username" = $1"#, USER_COLUMNS);
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_to_port_error)?;

        row.map(UserAccount::try_from).transpose()
    }

    #[instrument(skip(self))]
    async fn list_users(&self) -> Result<Vec<UserAccount>, PortError> {
        let sql = format!(r#"SELECT {} FROM "Users" ORDER BY "username""#, USER_COLUMNS);
        let rows = sqlx::query_as::<_, UserRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(db_to_port_error)?;

        convert_all(rows)
    }

    #[instrument(skip(self, user), fields(username = %user.username))]
    async fn insert_user(&self, user: &UserAccount) -> Result<(), PortError> {
        let caps = user.capabilities;
        sqlx::query(
            r#"INSERT INTO "Users" ("username", "role", "canView", "canCreate", "canEdit", "canDelete", "canExport")
               VALUES ($1, $2, $3, $4, $5, $6, $7)"#,
        )
        .bind(&user.username)
        .bind(user.role.as_str())
        .bind(caps.can_view)
        .bind(caps.can_create)
        .bind(caps.can_edit)
        .bind(caps.can_delete)
        .bind(caps.can_export)
        .execute(&self.pool)
        .await
        .map_err(|e| insert_error(e, || format!("Username {} already exists", user.username)))?;
        Ok(())
    }

    #[instrument(skip(self, user), fields(new_username = %user.username))]
    async fn update_user(&self, username: &str, user: &UserAccount) -> Result<(), PortError> {
        let caps = user.capabilities;
        let result = sqlx::query(
            r#"UPDATE "Users" SET "username" = $2, "role" = $3, "canView" = $4, "canCreate" = $5,
                   "canEdit" = $6, "canDelete" = $7, "canExport" = $8
               WHERE "username" = $1"#,
        )
        .bind(username)
        .bind(&user.username)
        .bind(user.role.as_str())
        .bind(caps.can_view)
        .bind(caps.can_create)
        .bind(caps.can_edit)
        .bind(caps.can_delete)
        .bind(caps.can_export)
        .execute(&self.pool)
        .await
        .map_err(|e| insert_error(e, || format!("Username {} already exists", user.username)))?;

        expect_affected(result.rows_affected(), "User", username)
    }

    #[instrument(skip(self))]
    async fn delete_user(&self, username: &str) -> Result<(), PortError> {
        let result = sqlx::query(r#"DELETE FROM "Users" WHERE "username" = $1"#)
            .bind(username)
            .execute(&self.pool)
            .await
            .map_err(db_to_port_error)?;

        expect_affected(result.rows_affected(), "User", username)
    }
}

#[async_trait]
impl AuditSink for PostgresLedgerStore {
    #[instrument(skip(self, fact), fields(event_id = %fact.id, action = %fact.action))]
    async fn record(&self, fact: &AuditFact) -> Result<(), PortError> {
        sqlx::query(
            r#"INSERT INTO "AuditLog" ("eventId", "timestamp", "username", "action", "tableName",
                   "recordId", "oldValues", "newValues", "details")
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"#,
        )
        .bind(*fact.id.as_uuid())
        .bind(fact.timestamp)
        .bind(&fact.actor)
        .bind(fact.action.as_str())
        .bind(fact.entity_kind.table_name())
        .bind(&fact.entity_id)
        .bind(snapshot_text(&fact.before))
        .bind(snapshot_text(&fact.after))
        .bind(&fact.summary)
        .execute(&self.pool)
        .await
        .map_err(db_to_port_error)?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn query(&self, query: &AuditQuery) -> Result<Vec<AuditFact>, PortError> {
        let mut builder =
            QueryBuilder::<Postgres>::new(format!(r#"SELECT {} FROM "AuditLog""#, AUDIT_COLUMNS));
        push_audit_filter(&mut builder, query);
        builder
            .push(r#" ORDER BY "timestamp" DESC, "id" DESC LIMIT "#)
            .push_bind(query.effective_limit() as i64);

        let rows = builder
            .build_query_as::<AuditRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(db_to_port_error)?;

        debug!(count = rows.len(), "Loaded audit facts");
        convert_all(rows)
    }
}
