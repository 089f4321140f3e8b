//! Ledger service
//!
//! The operations the outside world calls. Each one takes the caller's
//! [`Session`], checks the single capability it needs before doing any work,
//! and emits one audit fact per mutation.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use core_kernel::{
    Capability, ClientId, Currency, EmployeeId, EntryId, HealthCheckResult, Money, PeriodBounds,
    PortError, Session, Timezone,
};

use crate::audit::{AuditAction, AuditEmitter, AuditFact, AuditQuery, EntityKind};
use crate::balance::{Balance, BalanceAggregator, BalanceScope};
use crate::client::{Client, ClientImportRow, ClientUpdate};
use crate::employee::{Employee, EmployeeUpdate, RateHistoryRecord};
use crate::entry::{EntryDraft, StoredEntry, TimesheetEntry, CLOSE_OFF_MARKER};
use crate::error::{LedgerError, LedgerResult};
use crate::import::{ImportOutcome, ImportPipeline, RowDraft};
use crate::ports::{EntryFilter, LedgerPorts};
use crate::rate::RateResolver;
use crate::report::{Report, ReportGenerator};
use crate::user::UserAccount;
use crate::valuation::EntryValuator;

/// Largest page a listing will return
pub const MAX_PAGE_SIZE: u32 = 1000;

/// Ledger-wide settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Decides the calendar day used for import run dates and rate history
    pub timezone: Timezone,
    /// Currency shown in audit summaries
    pub currency: Currency,
    /// Linked id recorded on Close-off entries that carry none
    pub close_off_marker: String,
    pub default_page_size: u32,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            timezone: Timezone::default(),
            currency: Currency::default(),
            close_off_marker: CLOSE_OFF_MARKER.to_string(),
            default_page_size: 100,
        }
    }
}

/// Filters and paging for the timesheet listing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimesheetQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub client_id: Option<ClientId>,
    pub linked_id: Option<String>,
    /// 1-based
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl TimesheetQuery {
    fn filter(&self) -> EntryFilter {
        EntryFilter {
            from: self.start_date,
            to: self.end_date,
            before: None,
            client_id: self.client_id.clone(),
            linked_id: self.linked_id.clone(),
        }
    }
}

/// One page of timesheets, newest first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimesheetPage {
    pub timesheets: Vec<StoredEntry>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u64,
}

/// Keeps duplicate-key failures distinguishable from other store failures
fn conflict_or(error: PortError) -> LedgerError {
    match error {
        PortError::Conflict { message } => LedgerError::Conflict(message),
        other => LedgerError::Persistence(other),
    }
}

/// Orchestrates every ledger operation over a set of ports
#[derive(Clone)]
pub struct LedgerService {
    ports: LedgerPorts,
    config: LedgerConfig,
    valuator: EntryValuator,
    balances: BalanceAggregator,
    reports: ReportGenerator,
    importer: ImportPipeline,
    audit: AuditEmitter,
}

impl LedgerService {
    pub fn new(ports: LedgerPorts, config: LedgerConfig) -> Self {
        let audit = AuditEmitter::new(ports.audit.clone());
        let valuator = EntryValuator::new(
            RateResolver::new(ports.employees.clone()),
            config.close_off_marker.clone(),
        );
        let balances = BalanceAggregator::new(ports.timesheets.clone());
        let reports = ReportGenerator::new(
            ports.timesheets.clone(),
            ports.clients.clone(),
            ports.employees.clone(),
        );
        let importer = ImportPipeline::new(
            ports.clients.clone(),
            ports.timesheets.clone(),
            valuator.clone(),
            audit.clone(),
        );

        Self {
            ports,
            config,
            valuator,
            balances,
            reports,
            importer,
            audit,
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub async fn health(&self) -> HealthCheckResult {
        self.ports.health.health_check().await
    }

    fn today(&self) -> NaiveDate {
        self.config.timezone.today()
    }

    fn display_rate(&self, rate: Decimal) -> String {
        Money::new(rate, self.config.currency).to_string()
    }

    // ------------------------------------------------------------------
    // Rates and valuation
    // ------------------------------------------------------------------

    pub async fn resolve_rate(
        &self,
        session: &Session,
        employee_id: &EmployeeId,
        date: NaiveDate,
    ) -> LedgerResult<Decimal> {
        session.require(Capability::View)?;
        self.valuator.rates().resolve(employee_id, date).await
    }

    /// The charge a draft would be stored with, without storing it
    pub async fn valuate_entry(&self, session: &Session, draft: &EntryDraft) -> LedgerResult<Decimal> {
        session.require(Capability::View)?;
        Ok(self.valuator.valuate(draft).await?.charge_out)
    }

    // ------------------------------------------------------------------
    // Employees
    // ------------------------------------------------------------------

    pub async fn list_employees(&self, session: &Session) -> LedgerResult<Vec<Employee>> {
        session.require(Capability::View)?;
        Ok(self.ports.employees.list_employees().await?)
    }

    pub async fn get_employee(&self, session: &Session, id: &EmployeeId) -> LedgerResult<Employee> {
        session.require(Capability::View)?;
        self.ports
            .employees
            .get_employee(id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Employee", id))
    }

    /// Creates an employee and records their starting rate as of today
    pub async fn create_employee(&self, session: &Session, employee: Employee) -> LedgerResult<Employee> {
        session.require(Capability::Create)?;
        employee.validate()?;

        self.ports.employees.insert_employee(&employee).await.map_err(conflict_or)?;
        self.record_rate(&employee.employee_id, employee.hourly_rate).await;

        info!(employee_id = %employee.employee_id, rate = %employee.hourly_rate, "Employee created");
        self.audit
            .emit(
                AuditFact::new(
                    &session.username,
                    AuditAction::Create,
                    EntityKind::Employee,
                    employee.employee_id.as_str(),
                    format!(
                        "Created employee: {} with rate {}",
                        employee.name,
                        self.display_rate(employee.hourly_rate)
                    ),
                )
                .with_after(serde_json::json!(employee)),
            )
            .await;
        Ok(employee)
    }

    /// Updates name and rate; a changed rate appends a history record dated today
    pub async fn update_employee(
        &self,
        session: &Session,
        id: &EmployeeId,
        update: EmployeeUpdate,
    ) -> LedgerResult<Employee> {
        session.require(Capability::Edit)?;
        let before = self
            .ports
            .employees
            .get_employee(id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Employee", id))?;

        let after = Employee::new(id.clone(), update.name, update.hourly_rate);
        after.validate()?;
        self.ports.employees.update_employee(&after).await.map_err(conflict_or)?;

        let mut summary = format!("Updated employee: {}", after.name);
        if before.hourly_rate != after.hourly_rate {
            self.record_rate(id, after.hourly_rate).await;
            summary.push_str(&format!(
                " (rate changed from {} to {})",
                self.display_rate(before.hourly_rate),
                self.display_rate(after.hourly_rate)
            ));
        }

        info!(employee_id = %id, "Employee updated");
        self.audit
            .emit(
                AuditFact::new(&session.username, AuditAction::Update, EntityKind::Employee, id.as_str(), summary)
                    .with_before(serde_json::json!(before))
                    .with_after(serde_json::json!(after)),
            )
            .await;
        Ok(after)
    }

    /// Appends a rate dated today. The employee row already holds the rate,
    /// so a failed append is logged and the mutation stands.
    async fn record_rate(&self, id: &EmployeeId, rate: Decimal) {
        let record = RateHistoryRecord::new(id.clone(), rate, self.today());
        if let Err(error) = self.ports.employees.append_rate(&record).await {
            warn!(employee_id = %id, %rate, %error, "Failed to append rate history");
        }
    }

    /// Deletes the employee; their rate history and entries stay
    pub async fn delete_employee(&self, session: &Session, id: &EmployeeId) -> LedgerResult<()> {
        session.require(Capability::Delete)?;
        let before = self
            .ports
            .employees
            .get_employee(id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Employee", id))?;

        self.ports.employees.delete_employee(id).await.map_err(conflict_or)?;

        info!(employee_id = %id, "Employee deleted");
        self.audit
            .emit(
                AuditFact::new(
                    &session.username,
                    AuditAction::Delete,
                    EntityKind::Employee,
                    id.as_str(),
                    format!("Deleted employee: {}", before.name),
                )
                .with_before(serde_json::json!(before)),
            )
            .await;
        Ok(())
    }

    /// Rate history, most recent effective date first
    pub async fn rate_history(&self, session: &Session, id: &EmployeeId) -> LedgerResult<Vec<RateHistoryRecord>> {
        session.require(Capability::View)?;
        let mut history = self.ports.employees.rate_history(id).await?;
        history.reverse();
        history.sort_by(|a, b| b.effective_date.cmp(&a.effective_date));
        Ok(history)
    }

    // ------------------------------------------------------------------
    // Clients
    // ------------------------------------------------------------------

    pub async fn list_clients(&self, session: &Session) -> LedgerResult<Vec<Client>> {
        session.require(Capability::View)?;
        Ok(self.ports.clients.list_clients().await?)
    }

    pub async fn get_client(&self, session: &Session, id: &ClientId) -> LedgerResult<Client> {
        session.require(Capability::View)?;
        self.ports
            .clients
            .get_client(id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Client", id))
    }

    pub async fn create_client(&self, session: &Session, client: Client) -> LedgerResult<Client> {
        session.require(Capability::Create)?;
        client.validate()?;
        self.ports.clients.insert_client(&client).await.map_err(conflict_or)?;

        info!(client_id = %client.client_id, "Client created");
        self.audit
            .emit(
                AuditFact::new(
                    &session.username,
                    AuditAction::Create,
                    EntityKind::Client,
                    client.client_id.as_str(),
                    format!("Created client: {}", client.client_name),
                )
                .with_after(serde_json::json!(client)),
            )
            .await;
        Ok(client)
    }

    pub async fn update_client(&self, session: &Session, id: &ClientId, update: ClientUpdate) -> LedgerResult<Client> {
        session.require(Capability::Edit)?;
        let before = self
            .ports
            .clients
            .get_client(id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Client", id))?;

        let after = Client {
            client_id: id.clone(),
            client_name: update.client_name,
            notes: update.notes,
        };
        after.validate()?;
        self.ports.clients.update_client(&after).await.map_err(conflict_or)?;

        info!(client_id = %id, "Client updated");
        self.audit
            .emit(
                AuditFact::new(
                    &session.username,
                    AuditAction::Update,
                    EntityKind::Client,
                    id.as_str(),
                    format!("Updated client: {}", after.client_name),
                )
                .with_before(serde_json::json!(before))
                .with_after(serde_json::json!(after)),
            )
            .await;
        Ok(after)
    }

    /// Deletes the client; entries booked against it stay
    pub async fn delete_client(&self, session: &Session, id: &ClientId) -> LedgerResult<()> {
        session.require(Capability::Delete)?;
        let before = self
            .ports
            .clients
            .get_client(id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Client", id))?;

        self.ports.clients.delete_client(id).await.map_err(conflict_or)?;

        info!(client_id = %id, "Client deleted");
        self.audit
            .emit(
                AuditFact::new(
                    &session.username,
                    AuditAction::Delete,
                    EntityKind::Client,
                    id.as_str(),
                    format!("Deleted client: {}", before.client_name),
                )
                .with_before(serde_json::json!(before)),
            )
            .await;
        Ok(())
    }

    /// Imports clients row by row; existing ids and incomplete rows are reported
    pub async fn import_clients(&self, session: &Session, rows: &[ClientImportRow]) -> LedgerResult<ImportOutcome> {
        session.require(Capability::Create)?;
        let mut outcome = ImportOutcome::default();

        for (index, row) in rows.iter().enumerate() {
            match self.import_client_row(session, row).await {
                Ok(()) => outcome.success_count += 1,
                Err(message) => outcome.errors.push(format!("Row {}: {}", index + 1, message)),
            }
        }

        info!(imported = outcome.success_count, rejected = outcome.errors.len(), "Client import finished");
        Ok(outcome)
    }

    async fn import_client_row(&self, session: &Session, row: &ClientImportRow) -> Result<(), String> {
        if let Some(id) = row.client_id.as_deref().and_then(|raw| ClientId::parse(raw).ok()) {
            let existing = self.ports.clients.get_client(&id).await.map_err(|e| e.to_string())?;
            if existing.is_some() {
                return Err(format!("Client ID {} already exists", id));
            }
        }

        let client = row
            .to_client()
            .ok_or_else(|| "Missing required fields (Client ID or Client Name)".to_string())?;
        self.ports
            .clients
            .insert_client(&client)
            .await
            .map_err(|e| conflict_or(e).to_string())?;

        self.audit
            .emit(
                AuditFact::new(
                    &session.username,
                    AuditAction::Create,
                    EntityKind::Client,
                    client.client_id.as_str(),
                    format!("Imported client: {}", client.client_name),
                )
                .with_after(serde_json::json!(client)),
            )
            .await;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Timesheets
    // ------------------------------------------------------------------

    /// Values a draft into an entry against an existing client
    async fn build_entry(&self, draft: &EntryDraft) -> LedgerResult<TimesheetEntry> {
        let client_id = ClientId::parse(&draft.client_id)?;
        if self.ports.clients.get_client(&client_id).await?.is_none() {
            return Err(LedgerError::ClientNotFound(client_id.into_inner()));
        }

        let valuation = self.valuator.valuate(draft).await?;
        Ok(TimesheetEntry {
            date: draft.date,
            client_id,
            description: draft.description.trim().to_string(),
            time_spent: draft.time_spent.trim().to_string(),
            charge_out: valuation.charge_out,
            kind: valuation.kind,
            imported_date: None,
        })
    }

    pub async fn create_timesheet(&self, session: &Session, draft: &EntryDraft) -> LedgerResult<StoredEntry> {
        session.require(Capability::Create)?;
        let entry = self.build_entry(draft).await?;
        let stored = self.ports.timesheets.insert_entry(&entry).await?;

        info!(entry_id = %stored.id, client_id = %entry.client_id, charge = %entry.charge_out, "Timesheet created");
        self.audit
            .emit(
                AuditFact::new(
                    &session.username,
                    AuditAction::Create,
                    EntityKind::Timesheet,
                    stored.id.to_string(),
                    format!("Created {} timesheet for {}", entry.entry_type(), entry.client_id),
                )
                .with_after(entry.audit_snapshot()),
            )
            .await;
        Ok(stored)
    }

    /// Replaces an entry; Normal entries without a charge are re-valued
    pub async fn update_timesheet(
        &self,
        session: &Session,
        id: EntryId,
        draft: &EntryDraft,
    ) -> LedgerResult<StoredEntry> {
        session.require(Capability::Edit)?;
        let before = self
            .ports
            .timesheets
            .get_entry(id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Timesheet", id))?;

        let mut entry = self.build_entry(draft).await?;
        entry.imported_date = before.entry.imported_date;
        let stored = self.ports.timesheets.update_entry(id, &entry).await.map_err(conflict_or)?;

        info!(entry_id = %id, charge = %entry.charge_out, "Timesheet updated");
        self.audit
            .emit(
                AuditFact::new(
                    &session.username,
                    AuditAction::Update,
                    EntityKind::Timesheet,
                    id.to_string(),
                    format!("Updated timesheet for {}", entry.client_id),
                )
                .with_before(before.entry.audit_snapshot())
                .with_after(entry.audit_snapshot()),
            )
            .await;
        Ok(stored)
    }

    pub async fn delete_timesheet(&self, session: &Session, id: EntryId) -> LedgerResult<()> {
        session.require(Capability::Delete)?;
        let before = self
            .ports
            .timesheets
            .get_entry(id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Timesheet", id))?;

        self.ports.timesheets.delete_entry(id).await.map_err(conflict_or)?;

        info!(entry_id = %id, "Timesheet deleted");
        self.audit
            .emit(
                AuditFact::new(
                    &session.username,
                    AuditAction::Delete,
                    EntityKind::Timesheet,
                    id.to_string(),
                    format!("Deleted timesheet for {}", before.entry.client_id),
                )
                .with_before(before.entry.audit_snapshot()),
            )
            .await;
        Ok(())
    }

    /// Lists entries newest first, one page at a time
    pub async fn list_timesheets(&self, session: &Session, query: &TimesheetQuery) -> LedgerResult<TimesheetPage> {
        session.require(Capability::View)?;
        let page = query.page.unwrap_or(1).max(1);
        let page_size = query
            .page_size
            .unwrap_or(self.config.default_page_size)
            .clamp(1, MAX_PAGE_SIZE);
        let filter = query.filter();

        let total = self.ports.timesheets.count_entries(&filter).await?;
        let offset = u64::from(page - 1) * u64::from(page_size);
        let timesheets = self.ports.timesheets.page_entries(&filter, page_size, offset).await?;

        Ok(TimesheetPage {
            timesheets,
            total,
            page,
            page_size,
            total_pages: total.div_ceil(u64::from(page_size)),
        })
    }

    /// A client's entries within optional bounds, oldest first
    pub async fn timesheets_for_client(
        &self,
        session: &Session,
        client_id: &ClientId,
        bounds: PeriodBounds,
    ) -> LedgerResult<Vec<StoredEntry>> {
        session.require(Capability::View)?;
        let filter = EntryFilter::for_client(client_id.clone()).within(bounds);
        Ok(self.ports.timesheets.find_entries(&filter).await?)
    }

    /// Imports rows, tagging every inserted entry with today's date
    pub async fn import_timesheets(&self, session: &Session, rows: &[RowDraft]) -> LedgerResult<ImportOutcome> {
        session.require(Capability::Create)?;
        Ok(self.importer.import_rows(rows, self.today(), &session.username).await)
    }

    pub async fn balance(&self, session: &Session, scope: &BalanceScope) -> LedgerResult<Balance> {
        session.require(Capability::View)?;
        self.balances.balance(scope).await
    }

    // ------------------------------------------------------------------
    // Reports
    // ------------------------------------------------------------------

    pub async fn client_report(&self, session: &Session, id: &ClientId, bounds: PeriodBounds) -> LedgerResult<Report> {
        session.require(Capability::View)?;
        self.reports.for_client(id, bounds).await
    }

    pub async fn employee_report(
        &self,
        session: &Session,
        id: &EmployeeId,
        bounds: PeriodBounds,
    ) -> LedgerResult<Report> {
        session.require(Capability::View)?;
        self.reports.for_employee(id, bounds).await
    }

    pub async fn all_client_reports(&self, session: &Session, bounds: PeriodBounds) -> LedgerResult<Vec<Report>> {
        session.require(Capability::View)?;
        self.reports.for_all_clients(bounds).await
    }

    pub async fn all_employee_reports(&self, session: &Session, bounds: PeriodBounds) -> LedgerResult<Vec<Report>> {
        session.require(Capability::View)?;
        self.reports.for_all_employees(bounds).await
    }

    // ------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------

    pub async fn list_users(&self, session: &Session) -> LedgerResult<Vec<UserAccount>> {
        session.require(Capability::ManageUsers)?;
        Ok(self.ports.users.list_users().await?)
    }

    /// Looks up the account behind an authenticated username
    pub async fn find_user(&self, username: &str) -> LedgerResult<Option<UserAccount>> {
        Ok(self.ports.users.get_user(username).await?)
    }

    pub async fn create_user(&self, session: &Session, user: UserAccount) -> LedgerResult<UserAccount> {
        session.require(Capability::ManageUsers)?;
        user.validate()?;
        self.ports.users.insert_user(&user).await.map_err(conflict_or)?;

        info!(username = %user.username, role = %user.role, "User created");
        self.audit
            .emit(
                AuditFact::new(
                    &session.username,
                    AuditAction::Create,
                    EntityKind::User,
                    user.username.as_str(),
                    format!("Created user: {} with role {}", user.username, user.role),
                )
                .with_after(serde_json::json!(user)),
            )
            .await;
        Ok(user)
    }

    /// Replaces the account named `username`; the account may be renamed
    pub async fn update_user(&self, session: &Session, username: &str, user: UserAccount) -> LedgerResult<UserAccount> {
        session.require(Capability::ManageUsers)?;
        user.validate()?;
        let before = self
            .ports
            .users
            .get_user(username)
            .await?
            .ok_or_else(|| LedgerError::not_found("User", username))?;

        self.ports.users.update_user(username, &user).await.map_err(conflict_or)?;

        info!(username = %user.username, "User updated");
        self.audit
            .emit(
                AuditFact::new(
                    &session.username,
                    AuditAction::Update,
                    EntityKind::User,
                    user.username.as_str(),
                    format!("Updated user: {}", user.username),
                )
                .with_before(serde_json::json!(before))
                .with_after(serde_json::json!(user)),
            )
            .await;
        Ok(user)
    }

    pub async fn delete_user(&self, session: &Session, username: &str) -> LedgerResult<()> {
        session.require(Capability::ManageUsers)?;
        let before = self
            .ports
            .users
            .get_user(username)
            .await?
            .ok_or_else(|| LedgerError::not_found("User", username))?;

        self.ports.users.delete_user(username).await.map_err(conflict_or)?;

        info!(username = %username, "User deleted");
        self.audit
            .emit(
                AuditFact::new(
                    &session.username,
                    AuditAction::Delete,
                    EntityKind::User,
                    username,
                    format!("Deleted user: {}", username),
                )
                .with_before(serde_json::json!(before)),
            )
            .await;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Audit trail
    // ------------------------------------------------------------------

    pub async fn audit_log(&self, session: &Session, query: &AuditQuery) -> LedgerResult<Vec<AuditFact>> {
        session.require(Capability::View)?;
        Ok(self.ports.audit.query(query).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::EntryType;
    use crate::ports::mock::InMemoryLedgerStore;
    use crate::ports::EmployeePort;
    use core_kernel::{CapabilitySet, Role};
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn admin() -> Session {
        Session::admin("admin")
    }

    fn viewer() -> Session {
        Session::new("viewer", Role::Normal, CapabilitySet::read_only())
    }

    async fn service() -> (Arc<InMemoryLedgerStore>, LedgerService) {
        let store = Arc::new(InMemoryLedgerStore::new());
        let service = LedgerService::new(LedgerPorts::from_store(store.clone()), LedgerConfig::default());

        service
            .create_client(&admin(), Client::new(ClientId::parse("C1").unwrap(), "Acme"))
            .await
            .unwrap();
        service
            .create_employee(&admin(), Employee::new(EmployeeId::parse("E1").unwrap(), "Ann", dec!(80)))
            .await
            .unwrap();
        let e1 = EmployeeId::parse("E1").unwrap();
        for (on, rate) in [(date(2024, 1, 1), dec!(100)), (date(2024, 6, 1), dec!(150))] {
            store.append_rate(&RateHistoryRecord::new(e1.clone(), rate, on)).await.unwrap();
        }
        (store, service)
    }

    fn normal_draft(on: NaiveDate, time: &str) -> EntryDraft {
        EntryDraft::new(on, "C1", EntryType::Normal)
            .with_linked_id("E1")
            .with_time(time)
            .with_description("Advice")
    }

    // =========================================================================
    // Permissions
    // =========================================================================

    mod permissions {
        use super::*;

        #[tokio::test]
        async fn test_viewer_cannot_create() {
            let (store, service) = service().await;
            let before = store.audit_facts().await.len();

            let err = service
                .create_timesheet(&viewer(), &normal_draft(date(2024, 3, 1), "1"))
                .await
                .unwrap_err();
            assert_eq!(err.to_string(), "Permission denied: viewer may not create");
            assert!(store.entries().await.is_empty());
            assert_eq!(store.audit_facts().await.len(), before);
        }

        #[tokio::test]
        async fn test_user_management_is_admin_only() {
            let (_, service) = service().await;
            let clerk = Session::new("clerk", Role::Normal, CapabilitySet::all());
            let account = UserAccount::new("new", Role::Normal, CapabilitySet::read_only());

            assert!(matches!(
                service.create_user(&clerk, account.clone()).await,
                Err(LedgerError::PermissionDenied(_))
            ));
            assert!(service.create_user(&admin(), account).await.is_ok());
        }

        #[tokio::test]
        async fn test_import_denied_before_any_row() {
            let (store, service) = service().await;
            let rows = vec![RowDraft {
                date: Some("2024-03-01".into()),
                client_id: Some("C1".into()),
                time_spent: Some("1".into()),
                employee_id: Some("E1".into()),
                ..Default::default()
            }];

            assert!(service.import_timesheets(&viewer(), &rows).await.is_err());
            assert!(store.entries().await.is_empty());
        }
    }

    // =========================================================================
    // Timesheets
    // =========================================================================

    mod timesheets {
        use super::*;

        #[tokio::test]
        async fn test_create_values_with_rate_in_force() {
            let (store, service) = service().await;
            let stored = service
                .create_timesheet(&admin(), &normal_draft(date(2024, 3, 1), "1¼"))
                .await
                .unwrap();

            assert_eq!(stored.entry.charge_out, dec!(125));
            assert_eq!(stored.entry.time_spent, "1¼");
            let last = store.audit_facts().await.pop().unwrap();
            assert_eq!(last.summary, "Created Normal timesheet for C1");
            assert_eq!(last.after.unwrap()["chargeOut"], "125");
        }

        #[tokio::test]
        async fn test_create_against_unknown_client() {
            let (_, service) = service().await;
            let draft = EntryDraft::new(date(2024, 3, 1), "C9", EntryType::CloseOff).with_charge(dec!(10));
            let err = service.create_timesheet(&admin(), &draft).await.unwrap_err();
            assert_eq!(err.to_string(), "Client not found - C9");
        }

        #[tokio::test]
        async fn test_close_off_persisted_negative() {
            let (_, service) = service().await;
            let draft = EntryDraft::new(date(2024, 3, 1), "C1", EntryType::CloseOff).with_charge(dec!(50));
            let stored = service.create_timesheet(&admin(), &draft).await.unwrap();
            assert_eq!(stored.entry.charge_out, dec!(-50));
            assert_eq!(stored.entry.linked_id(), "C/O");
        }

        #[tokio::test]
        async fn test_update_revalues_and_audits_both_sides() {
            let (store, service) = service().await;
            let stored = service
                .create_timesheet(&admin(), &normal_draft(date(2024, 3, 1), "1"))
                .await
                .unwrap();

            let updated = service
                .update_timesheet(&admin(), stored.id, &normal_draft(date(2024, 7, 1), "2"))
                .await
                .unwrap();
            assert_eq!(updated.entry.charge_out, dec!(300));
            assert_eq!(updated.sequence, stored.sequence);

            let fact = store.audit_facts().await.pop().unwrap();
            assert_eq!(fact.action, AuditAction::Update);
            assert_eq!(fact.before.unwrap()["chargeOut"], "100");
            assert_eq!(fact.after.unwrap()["chargeOut"], "300");
        }

        #[tokio::test]
        async fn test_supplied_charge_without_employee() {
            let (store, service) = service().await;
            let draft = EntryDraft::new(date(2024, 3, 6), "C1", EntryType::Normal)
                .with_time("1")
                .with_charge(dec!(200));

            assert_eq!(service.valuate_entry(&viewer(), &draft).await.unwrap(), dec!(200));
            let stored = service.create_timesheet(&admin(), &draft).await.unwrap();
            assert_eq!(stored.entry.charge_out, dec!(200));
            assert_eq!(stored.entry.linked_id(), "");
            assert_eq!(store.entries().await.len(), 1);
        }

        #[tokio::test]
        async fn test_delete_missing_entry() {
            let (_, service) = service().await;
            let err = service.delete_timesheet(&admin(), EntryId::new()).await.unwrap_err();
            assert!(matches!(err, LedgerError::NotFound { entity: "Timesheet", .. }));
        }

        #[tokio::test]
        async fn test_listing_pages_newest_first() {
            let (_, service) = service().await;
            for day in 1..=5 {
                service
                    .create_timesheet(&admin(), &normal_draft(date(2024, 3, day), "1"))
                    .await
                    .unwrap();
            }

            let query = TimesheetQuery {
                page: Some(2),
                page_size: Some(2),
                ..Default::default()
            };
            let page = service.list_timesheets(&viewer(), &query).await.unwrap();
            assert_eq!(page.total, 5);
            assert_eq!(page.total_pages, 3);
            let days: Vec<NaiveDate> = page.timesheets.iter().map(|t| t.entry.date).collect();
            assert_eq!(days, vec![date(2024, 3, 3), date(2024, 3, 2)]);
        }

        #[tokio::test]
        async fn test_audit_failure_does_not_fail_mutation() {
            let (store, service) = service().await;
            store.reject_audit_writes(true);

            let stored = service
                .create_timesheet(&admin(), &normal_draft(date(2024, 3, 1), "1"))
                .await
                .unwrap();
            assert_eq!(store.entries().await, vec![stored]);
        }
    }

    // =========================================================================
    // Imports
    // =========================================================================

    mod imports {
        use super::*;

        fn row(date: &str, client: &str, time: &str) -> RowDraft {
            RowDraft {
                date: Some(date.into()),
                client_id: Some(client.into()),
                employee_id: Some("E1".into()),
                time_spent: Some(time.into()),
                ..Default::default()
            }
        }

        #[tokio::test]
        async fn test_rows_fail_independently() {
            let (store, service) = service().await;
            let rows = vec![
                row("05.03.2024", "C1", "1.25"),
                row("not-a-date", "C1", "1"),
                row("2024-03-06", "Nobody", "1"),
                row("2024-03-06", "C1", "0"),
                RowDraft {
                    employee_id: Some("E404".into()),
                    ..row("2024-03-06", "C1", "1")
                },
                RowDraft {
                    client_id: None,
                    client_name: Some("Acme".into()),
                    entry_type: Some("Close-off".into()),
                    charge_out: Some("50".into()),
                    ..row("45356", "C1", "½")
                },
            ];

            let outcome = service.import_timesheets(&admin(), &rows).await.unwrap();
            assert_eq!(outcome.success_count, 2);
            assert_eq!(
                outcome.errors,
                vec![
                    "Row 2: Invalid date format - not-a-date".to_string(),
                    "Row 3: Client not found - Nobody".to_string(),
                    "Row 4: Invalid or zero time value".to_string(),
                    "Row 5: No rate found for employee E404 on 2024-03-06".to_string(),
                ]
            );

            let entries = store.entries().await;
            assert_eq!(entries[0].entry.date, date(2024, 3, 5));
            assert_eq!(entries[0].entry.time_spent, "1¼");
            assert_eq!(entries[0].entry.charge_out, dec!(125));
            assert_eq!(entries[0].entry.imported_date, Some(service.today()));
            assert_eq!(entries[1].entry.charge_out, dec!(-50));
            assert_eq!(entries[1].entry.date, date(2024, 3, 5));
        }

        #[tokio::test]
        async fn test_charged_row_needs_no_employee() {
            let (store, service) = service().await;
            let rows = vec![RowDraft {
                employee_id: None,
                charge_out: Some("200".into()),
                ..row("2024-03-06", "C1", "1")
            }];

            let outcome = service.import_timesheets(&admin(), &rows).await.unwrap();
            assert_eq!(outcome.success_count, 1);
            assert!(outcome.errors.is_empty());
            assert_eq!(store.entries().await[0].entry.charge_out, dec!(200));
        }

        #[tokio::test]
        async fn test_transfer_row_keeps_sign_and_clients() {
            let (store, service) = service().await;
            let rows = vec![RowDraft {
                employee_id: None,
                linked_id: Some("C2".into()),
                entry_type: Some("Transfer".into()),
                charge_out: Some("-150".into()),
                transfer_from_client_id: Some("C2".into()),
                transfer_to_client_id: Some("C1".into()),
                ..row("2024-03-06", "C1", "1")
            }];

            let outcome = service.import_timesheets(&admin(), &rows).await.unwrap();
            assert_eq!(outcome.success_count, 1);

            let entry = store.entries().await.remove(0).entry;
            assert_eq!(entry.entry_type(), EntryType::Transfer);
            assert_eq!(entry.charge_out, dec!(-150));
            assert_eq!(entry.linked_id(), "C2");
            assert_eq!(entry.transfer_from().map(ClientId::as_str), Some("C2"));
            assert_eq!(entry.transfer_to().map(ClientId::as_str), Some("C1"));
        }

        #[tokio::test]
        async fn test_client_import_reports_duplicates_first() {
            let (_, service) = service().await;
            let rows = vec![
                ClientImportRow {
                    client_id: Some("C1".into()),
                    client_name: None,
                    notes: None,
                },
                ClientImportRow {
                    client_id: Some("C2".into()),
                    client_name: None,
                    notes: None,
                },
                ClientImportRow {
                    client_id: Some("C3".into()),
                    client_name: Some("Beta".into()),
                    notes: None,
                },
            ];

            let outcome = service.import_clients(&admin(), &rows).await.unwrap();
            assert_eq!(outcome.success_count, 1);
            assert_eq!(
                outcome.errors,
                vec![
                    "Row 1: Client ID C1 already exists".to_string(),
                    "Row 2: Missing required fields (Client ID or Client Name)".to_string(),
                ]
            );
        }
    }

    // =========================================================================
    // Employees, balances and audit trail
    // =========================================================================

    mod records {
        use super::*;

        #[tokio::test]
        async fn test_rate_change_appends_history() {
            let (store, service) = service().await;
            let e1 = EmployeeId::parse("E1").unwrap();

            service
                .update_employee(&admin(), &e1, EmployeeUpdate { name: "Ann".into(), hourly_rate: dec!(200) })
                .await
                .unwrap();
            service
                .update_employee(&admin(), &e1, EmployeeUpdate { name: "Ann B".into(), hourly_rate: dec!(200) })
                .await
                .unwrap();

            // creation, two seeded records, one rate change
            assert_eq!(store.rate_history(&e1).await.unwrap().len(), 4);
            let summaries: Vec<String> = store.audit_facts().await.iter().map(|f| f.summary.clone()).collect();
            assert!(summaries.contains(&"Created employee: Ann with rate R80".to_string()));
            assert!(summaries.contains(&"Updated employee: Ann (rate changed from R80 to R200)".to_string()));
            assert!(summaries.contains(&"Updated employee: Ann B".to_string()));
        }

        #[tokio::test]
        async fn test_rate_history_failure_keeps_employee() {
            let (store, service) = service().await;
            store.reject_rate_writes(true);
            let e2 = EmployeeId::parse("E2").unwrap();

            let created = service
                .create_employee(&admin(), Employee::new(e2.clone(), "Ben", dec!(90)))
                .await
                .unwrap();
            assert_eq!(created.hourly_rate, dec!(90));
            assert!(store.rate_history(&e2).await.unwrap().is_empty());
            assert_eq!(
                service.resolve_rate(&viewer(), &e2, date(2024, 3, 1)).await.unwrap(),
                dec!(90)
            );
        }

        #[tokio::test]
        async fn test_rate_history_newest_first() {
            let (_, service) = service().await;
            let history = service
                .rate_history(&viewer(), &EmployeeId::parse("E1").unwrap())
                .await
                .unwrap();
            let dates: Vec<NaiveDate> = history.iter().map(|r| r.effective_date).collect();
            let mut sorted = dates.clone();
            sorted.sort_by(|a, b| b.cmp(a));
            assert_eq!(dates, sorted);
        }

        #[tokio::test]
        async fn test_balance_law_holds() {
            let (_, service) = service().await;
            for (on, time) in [(date(2024, 1, 20), "1"), (date(2024, 2, 3), "2"), (date(2024, 2, 20), "½")] {
                service.create_timesheet(&admin(), &normal_draft(on, time)).await.unwrap();
            }
            let scope = BalanceScope {
                start_date: Some(date(2024, 2, 1)),
                end_date: Some(date(2024, 2, 29)),
                client_id: Some(ClientId::parse("C1").unwrap()),
                linked_id: None,
            };

            let balance = service.balance(&viewer(), &scope).await.unwrap();
            assert_eq!(balance.carry_forward, dec!(100));
            assert_eq!(balance.period_total, dec!(250));
            assert_eq!(balance.displayed, balance.carry_forward + balance.period_total);
        }

        #[tokio::test]
        async fn test_audit_log_filters_by_action() {
            let (_, service) = service().await;
            service
                .delete_client(&admin(), &ClientId::parse("C1").unwrap())
                .await
                .unwrap();

            let query = AuditQuery {
                action: Some(AuditAction::Delete),
                ..Default::default()
            };
            let facts = service.audit_log(&viewer(), &query).await.unwrap();
            assert_eq!(facts.len(), 1);
            assert_eq!(facts[0].summary, "Deleted client: Acme");
            assert_eq!(facts[0].entity_kind, EntityKind::Client);
        }
    }
}
