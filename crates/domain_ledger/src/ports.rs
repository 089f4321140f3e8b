//! Ledger Ports
//!
//! Storage collaborators the ledger core depends on. Each trait extends
//! [`DomainPort`] so adapters can be shared across request handlers.
//!
//! - **Internal Adapter**: PostgreSQL (`infra_db::PostgresLedgerStore`)
//! - **Mock Adapter**: [`mock::InMemoryLedgerStore`], behind the `mock` feature
//!
//! ```rust,ignore
//! let store = Arc::new(PostgresLedgerStore::new(pool));
//! let service = LedgerService::new(LedgerPorts::from_store(store), LedgerConfig::default());
//! ```

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::sync::Arc;

use core_kernel::{ClientId, DomainPort, EmployeeId, EntryId, HealthCheckable, PeriodBounds, PortError};

use crate::audit::{AuditFact, AuditQuery};
use crate::client::Client;
use crate::employee::{Employee, RateHistoryRecord};
use crate::entry::{StoredEntry, TimesheetEntry};
use crate::user::UserAccount;

/// Selects timesheet entries; every set field must match
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryFilter {
    /// Entries dated on or after this day
    pub from: Option<NaiveDate>,
    /// Entries dated on or before this day
    pub to: Option<NaiveDate>,
    /// Entries dated strictly before this day
    pub before: Option<NaiveDate>,
    pub client_id: Option<ClientId>,
    pub linked_id: Option<String>,
}

impl EntryFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn for_client(client_id: ClientId) -> Self {
        Self {
            client_id: Some(client_id),
            ..Default::default()
        }
    }

    pub fn for_linked_id(linked_id: impl Into<String>) -> Self {
        Self {
            linked_id: Some(linked_id.into()),
            ..Default::default()
        }
    }

    pub fn within(mut self, bounds: PeriodBounds) -> Self {
        self.from = bounds.start;
        self.to = bounds.end;
        self
    }

    pub fn dated_before(mut self, date: NaiveDate) -> Self {
        self.before = Some(date);
        self
    }

    pub fn matches(&self, entry: &TimesheetEntry) -> bool {
        self.from.map_or(true, |f| entry.date >= f)
            && self.to.map_or(true, |t| entry.date <= t)
            && self.before.map_or(true, |b| entry.date < b)
            && self.client_id.as_ref().map_or(true, |c| &entry.client_id == c)
            && self.linked_id.as_deref().map_or(true, |l| entry.linked_id() == l)
    }
}

#[async_trait]
pub trait EmployeePort: DomainPort {
    async fn get_employee(&self, id: &EmployeeId) -> Result<Option<Employee>, PortError>;

    /// All employees ordered by name
    async fn list_employees(&self) -> Result<Vec<Employee>, PortError>;

    /// Fails with `PortError::Conflict` if the key is taken
    async fn insert_employee(&self, employee: &Employee) -> Result<(), PortError>;

    async fn update_employee(&self, employee: &Employee) -> Result<(), PortError>;

    /// Removes the employee only; rate history is left in place
    async fn delete_employee(&self, id: &EmployeeId) -> Result<(), PortError>;

    async fn append_rate(&self, record: &RateHistoryRecord) -> Result<(), PortError>;

    /// Rate history for one employee in the order it was appended
    async fn rate_history(&self, id: &EmployeeId) -> Result<Vec<RateHistoryRecord>, PortError>;
}

#[async_trait]
pub trait ClientPort: DomainPort {
    async fn get_client(&self, id: &ClientId) -> Result<Option<Client>, PortError>;

    /// First client with exactly this name
    async fn find_client_by_name(&self, name: &str) -> Result<Option<Client>, PortError>;

    /// All clients ordered by name
    async fn list_clients(&self) -> Result<Vec<Client>, PortError>;

    /// Fails with `PortError::Conflict` if the key is taken
    async fn insert_client(&self, client: &Client) -> Result<(), PortError>;

    async fn update_client(&self, client: &Client) -> Result<(), PortError>;

    async fn delete_client(&self, id: &ClientId) -> Result<(), PortError>;
}

#[async_trait]
pub trait TimesheetPort: DomainPort {
    /// Persists an entry, assigning its id and insertion sequence
    async fn insert_entry(&self, entry: &TimesheetEntry) -> Result<StoredEntry, PortError>;

    async fn get_entry(&self, id: EntryId) -> Result<Option<StoredEntry>, PortError>;

    async fn update_entry(&self, id: EntryId, entry: &TimesheetEntry) -> Result<StoredEntry, PortError>;

    async fn delete_entry(&self, id: EntryId) -> Result<(), PortError>;

    /// Matching entries ordered by date then insertion, ascending
    async fn find_entries(&self, filter: &EntryFilter) -> Result<Vec<StoredEntry>, PortError>;

    /// One page of matching entries ordered by date then insertion, descending
    async fn page_entries(
        &self,
        filter: &EntryFilter,
        limit: u32,
        offset: u64,
    ) -> Result<Vec<StoredEntry>, PortError>;

    async fn count_entries(&self, filter: &EntryFilter) -> Result<u64, PortError>;

    /// Sum of `charge_out` over matching entries; zero when none match
    async fn sum_charges(&self, filter: &EntryFilter) -> Result<Decimal, PortError>;
}

#[async_trait]
pub trait UserPort: DomainPort {
    async fn get_user(&self, username: &str) -> Result<Option<UserAccount>, PortError>;

    async fn list_users(&self) -> Result<Vec<UserAccount>, PortError>;

    async fn insert_user(&self, user: &UserAccount) -> Result<(), PortError>;

    /// Replaces the account currently named `username`, which may be renamed
    async fn update_user(&self, username: &str, user: &UserAccount) -> Result<(), PortError>;

    async fn delete_user(&self, username: &str) -> Result<(), PortError>;
}

#[async_trait]
pub trait AuditSink: DomainPort {
    /// Appends one fact
    async fn record(&self, fact: &AuditFact) -> Result<(), PortError>;

    /// Matching facts, newest first, capped at the query limit
    async fn query(&self, query: &AuditQuery) -> Result<Vec<AuditFact>, PortError>;
}

/// A single store backing every ledger port
pub trait LedgerStore:
    EmployeePort + ClientPort + TimesheetPort + UserPort + AuditSink + HealthCheckable
{
}

impl<T> LedgerStore for T where
    T: EmployeePort + ClientPort + TimesheetPort + UserPort + AuditSink + HealthCheckable
{
}

/// The ports a [`LedgerService`](crate::service::LedgerService) runs against
#[derive(Clone)]
pub struct LedgerPorts {
    pub employees: Arc<dyn EmployeePort>,
    pub clients: Arc<dyn ClientPort>,
    pub timesheets: Arc<dyn TimesheetPort>,
    pub users: Arc<dyn UserPort>,
    pub audit: Arc<dyn AuditSink>,
    pub health: Arc<dyn HealthCheckable>,
}

impl LedgerPorts {
    /// Wires every port to the same store
    pub fn from_store<S: LedgerStore>(store: Arc<S>) -> Self {
        Self {
            employees: store.clone(),
            clients: store.clone(),
            timesheets: store.clone(),
            users: store.clone(),
            audit: store.clone(),
            health: store,
        }
    }
}

/// In-memory store for tests and local runs
#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::RwLock;

    use core_kernel::HealthCheckResult;

    #[derive(Debug, Default)]
    struct State {
        employees: BTreeMap<EmployeeId, Employee>,
        rate_history: Vec<RateHistoryRecord>,
        clients: BTreeMap<ClientId, Client>,
        entries: Vec<StoredEntry>,
        next_sequence: i64,
        users: BTreeMap<String, UserAccount>,
        audit: Vec<AuditFact>,
    }

    /// Holds every ledger table in memory behind a single lock
    #[derive(Debug, Default)]
    pub struct InMemoryLedgerStore {
        state: RwLock<State>,
        reject_audit: AtomicBool,
        reject_rates: AtomicBool,
    }

    impl InMemoryLedgerStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Makes every subsequent audit write fail, to exercise best-effort emission
        pub fn reject_audit_writes(&self, reject: bool) {
            self.reject_audit.store(reject, Ordering::SeqCst);
        }

        pub fn reject_rate_writes(&self, reject: bool) {
            self.reject_rates.store(reject, Ordering::SeqCst);
        }

        /// Every recorded fact in append order
        pub async fn audit_facts(&self) -> Vec<AuditFact> {
            self.state.read().await.audit.clone()
        }

        /// Every stored entry in insertion order
        pub async fn entries(&self) -> Vec<StoredEntry> {
            self.state.read().await.entries.clone()
        }
    }

    impl DomainPort for InMemoryLedgerStore {}

    #[async_trait]
    impl HealthCheckable for InMemoryLedgerStore {
        async fn health_check(&self) -> HealthCheckResult {
            HealthCheckResult::healthy("in-memory-ledger", 0)
        }
    }

    fn sort_by_name<T>(items: &mut [T], name: impl Fn(&T) -> &str) {
        items.sort_by(|a, b| name(a).cmp(name(b)));
    }

    #[async_trait]
    impl EmployeePort for InMemoryLedgerStore {
        async fn get_employee(&self, id: &EmployeeId) -> Result<Option<Employee>, PortError> {
            Ok(self.state.read().await.employees.get(id).cloned())
        }

        async fn list_employees(&self) -> Result<Vec<Employee>, PortError> {
            let mut employees: Vec<Employee> =
                self.state.read().await.employees.values().cloned().collect();
            sort_by_name(&mut employees, |e| &e.name);
            Ok(employees)
        }

        async fn insert_employee(&self, employee: &Employee) -> Result<(), PortError> {
            let mut state = self.state.write().await;
            if state.employees.contains_key(&employee.employee_id) {
                return Err(PortError::conflict(format!(
                    "Employee ID {} already exists",
                    employee.employee_id
                )));
            }
            state.employees.insert(employee.employee_id.clone(), employee.clone());
            Ok(())
        }

        async fn update_employee(&self, employee: &Employee) -> Result<(), PortError> {
            let mut state = self.state.write().await;
            match state.employees.get_mut(&employee.employee_id) {
                Some(existing) => {
                    *existing = employee.clone();
                    Ok(())
                }
                None => Err(PortError::not_found("Employee", &employee.employee_id)),
            }
        }

        async fn delete_employee(&self, id: &EmployeeId) -> Result<(), PortError> {
            self.state
                .write()
                .await
                .employees
                .remove(id)
                .map(|_| ())
                .ok_or_else(|| PortError::not_found("Employee", id))
        }

        async fn append_rate(&self, record: &RateHistoryRecord) -> Result<(), PortError> {
            if self.reject_rates.load(Ordering::SeqCst) {
                return Err(PortError::connection("rate history unavailable"));
            }
            self.state.write().await.rate_history.push(record.clone());
            Ok(())
        }

        async fn rate_history(&self, id: &EmployeeId) -> Result<Vec<RateHistoryRecord>, PortError> {
            Ok(self
                .state
                .read()
                .await
                .rate_history
                .iter()
                .filter(|r| &r.employee_id == id)
                .cloned()
                .collect())
        }
    }

    #[async_trait]
    impl ClientPort for InMemoryLedgerStore {
        async fn get_client(&self, id: &ClientId) -> Result<Option<Client>, PortError> {
            Ok(self.state.read().await.clients.get(id).cloned())
        }

        async fn find_client_by_name(&self, name: &str) -> Result<Option<Client>, PortError> {
            Ok(self
                .state
                .read()
                .await
                .clients
                .values()
                .find(|c| c.client_name == name)
                .cloned())
        }

        async fn list_clients(&self) -> Result<Vec<Client>, PortError> {
            let mut clients: Vec<Client> = self.state.read().await.clients.values().cloned().collect();
            sort_by_name(&mut clients, |c| &c.client_name);
            Ok(clients)
        }

        async fn insert_client(&self, client: &Client) -> Result<(), PortError> {
            let mut state = self.state.write().await;
            if state.clients.contains_key(&client.client_id) {
                return Err(PortError::conflict(format!(
                    "Client ID {} already exists",
                    client.client_id
                )));
            }
            state.clients.insert(client.client_id.clone(), client.clone());
            Ok(())
        }

        async fn update_client(&self, client: &Client) -> Result<(), PortError> {
            let mut state = self.state.write().await;
            match state.clients.get_mut(&client.client_id) {
                Some(existing) => {
                    *existing = client.clone();
                    Ok(())
                }
                None => Err(PortError::not_found("Client", &client.client_id)),
            }
        }

        async fn delete_client(&self, id: &ClientId) -> Result<(), PortError> {
            self.state
                .write()
                .await
                .clients
                .remove(id)
                .map(|_| ())
                .ok_or_else(|| PortError::not_found("Client", id))
        }
    }

    fn ascending(entries: &mut [StoredEntry]) {
        entries.sort_by_key(|e| (e.entry.date, e.sequence));
    }

    #[async_trait]
    impl TimesheetPort for InMemoryLedgerStore {
        async fn insert_entry(&self, entry: &TimesheetEntry) -> Result<StoredEntry, PortError> {
            let mut state = self.state.write().await;
            state.next_sequence += 1;
            let stored = StoredEntry {
                id: EntryId::new(),
                sequence: state.next_sequence,
                entry: entry.clone(),
            };
            state.entries.push(stored.clone());
            Ok(stored)
        }

        async fn get_entry(&self, id: EntryId) -> Result<Option<StoredEntry>, PortError> {
            Ok(self.state.read().await.entries.iter().find(|e| e.id == id).cloned())
        }

        async fn update_entry(&self, id: EntryId, entry: &TimesheetEntry) -> Result<StoredEntry, PortError> {
            let mut state = self.state.write().await;
            let stored = state
                .entries
                .iter_mut()
                .find(|e| e.id == id)
                .ok_or_else(|| PortError::not_found("Timesheet", id))?;
            stored.entry = entry.clone();
            Ok(stored.clone())
        }

        async fn delete_entry(&self, id: EntryId) -> Result<(), PortError> {
            let mut state = self.state.write().await;
            let before = state.entries.len();
            state.entries.retain(|e| e.id != id);
            if state.entries.len() == before {
                return Err(PortError::not_found("Timesheet", id));
            }
            Ok(())
        }

        async fn find_entries(&self, filter: &EntryFilter) -> Result<Vec<StoredEntry>, PortError> {
            let mut matching: Vec<StoredEntry> = self
                .state
                .read()
                .await
                .entries
                .iter()
                .filter(|e| filter.matches(&e.entry))
                .cloned()
                .collect();
            ascending(&mut matching);
            Ok(matching)
        }

        async fn page_entries(
            &self,
            filter: &EntryFilter,
            limit: u32,
            offset: u64,
        ) -> Result<Vec<StoredEntry>, PortError> {
            let mut matching = self.find_entries(filter).await?;
            matching.reverse();
            Ok(matching
                .into_iter()
                .skip(offset as usize)
                .take(limit as usize)
                .collect())
        }

        async fn count_entries(&self, filter: &EntryFilter) -> Result<u64, PortError> {
            Ok(self
                .state
                .read()
                .await
                .entries
                .iter()
                .filter(|e| filter.matches(&e.entry))
                .count() as u64)
        }

        async fn sum_charges(&self, filter: &EntryFilter) -> Result<Decimal, PortError> {
            Ok(self
                .state
                .read()
                .await
                .entries
                .iter()
                .filter(|e| filter.matches(&e.entry))
                .map(|e| e.entry.charge_out)
                .sum())
        }
    }

    #[async_trait]
    impl UserPort for InMemoryLedgerStore {
        async fn get_user(&self, username: &str) -> Result<Option<UserAccount>, PortError> {
            Ok(self.state.read().await.users.get(username).cloned())
        }

        async fn list_users(&self) -> Result<Vec<UserAccount>, PortError> {
            Ok(self.state.read().await.users.values().cloned().collect())
        }

        async fn insert_user(&self, user: &UserAccount) -> Result<(), PortError> {
            let mut state = self.state.write().await;
            if state.users.contains_key(&user.username) {
                return Err(PortError::conflict(format!("Username {} already exists", user.username)));
            }
            state.users.insert(user.username.clone(), user.clone());
            Ok(())
        }

        async fn update_user(&self, username: &str, user: &UserAccount) -> Result<(), PortError> {
            let mut state = self.state.write().await;
            if !state.users.contains_key(username) {
                return Err(PortError::not_found("User", username));
            }
            if user.username != username && state.users.contains_key(&user.username) {
                return Err(PortError::conflict(format!("Username {} already exists", user.username)));
            }
            state.users.remove(username);
            state.users.insert(user.username.clone(), user.clone());
            Ok(())
        }

        async fn delete_user(&self, username: &str) -> Result<(), PortError> {
            self.state
                .write()
                .await
                .users
                .remove(username)
                .map(|_| ())
                .ok_or_else(|| PortError::not_found("User", username))
        }
    }

    #[async_trait]
    impl AuditSink for InMemoryLedgerStore {
        async fn record(&self, fact: &AuditFact) -> Result<(), PortError> {
            if self.reject_audit.load(Ordering::SeqCst) {
                return Err(PortError::connection("audit log unavailable"));
            }
            self.state.write().await.audit.push(fact.clone());
            Ok(())
        }

        async fn query(&self, query: &AuditQuery) -> Result<Vec<AuditFact>, PortError> {
            let state = self.state.read().await;
            let mut facts: Vec<AuditFact> = state
                .audit
                .iter()
                .filter(|f| query.matches(f))
                .cloned()
                .collect();
            facts.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
            facts.truncate(query.effective_limit());
            Ok(facts)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::InMemoryLedgerStore;
    use super::*;
    use crate::entry::EntryKind;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn entry(client: &str, on: NaiveDate, charge: Decimal) -> TimesheetEntry {
        TimesheetEntry {
            date: on,
            client_id: ClientId::parse(client).unwrap(),
            description: String::new(),
            time_spent: "1".to_string(),
            charge_out: charge,
            kind: EntryKind::Normal { employee_id: Some(EmployeeId::parse("E1").unwrap()) },
            imported_date: None,
        }
    }

    #[test]
    fn test_entry_filter_bounds() {
        let e = entry("C1", date(2024, 2, 10), dec!(10));
        assert!(EntryFilter::all().matches(&e));
        assert!(EntryFilter::all().dated_before(date(2024, 2, 11)).matches(&e));
        assert!(!EntryFilter::all().dated_before(date(2024, 2, 10)).matches(&e));
        assert!(EntryFilter::for_linked_id("E1").matches(&e));
        assert!(!EntryFilter::for_client(ClientId::parse("C2").unwrap()).matches(&e));

        let feb = PeriodBounds::new(Some(date(2024, 2, 1)), Some(date(2024, 2, 10)));
        assert!(EntryFilter::all().within(feb).matches(&e));
    }

    #[tokio::test]
    async fn test_mock_orders_by_date_then_insertion() {
        let store = InMemoryLedgerStore::new();
        let late = store.insert_entry(&entry("C1", date(2024, 3, 1), dec!(1))).await.unwrap();
        let first = store.insert_entry(&entry("C1", date(2024, 2, 1), dec!(2))).await.unwrap();
        let second = store.insert_entry(&entry("C1", date(2024, 2, 1), dec!(3))).await.unwrap();

        let ids: Vec<EntryId> = store
            .find_entries(&EntryFilter::all())
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ids, vec![first.id, second.id, late.id]);

        let page = store.page_entries(&EntryFilter::all(), 2, 0).await.unwrap();
        assert_eq!(page[0].id, late.id);
        assert_eq!(page[1].id, second.id);
    }

    #[tokio::test]
    async fn test_mock_sum_and_count() {
        let store = InMemoryLedgerStore::new();
        store.insert_entry(&entry("C1", date(2024, 1, 20), dec!(-100))).await.unwrap();
        store.insert_entry(&entry("C1", date(2024, 2, 5), dec!(125))).await.unwrap();
        store.insert_entry(&entry("C2", date(2024, 2, 5), dec!(999))).await.unwrap();

        let c1 = EntryFilter::for_client(ClientId::parse("C1").unwrap());
        assert_eq!(store.sum_charges(&c1).await.unwrap(), dec!(25));
        assert_eq!(store.count_entries(&c1).await.unwrap(), 2);
        assert_eq!(store.sum_charges(&EntryFilter::for_linked_id("nobody")).await.unwrap(), dec!(0));
    }

    #[tokio::test]
    async fn test_mock_rejects_duplicate_client() {
        let store = InMemoryLedgerStore::new();
        let client = Client::new(ClientId::parse("C1").unwrap(), "Acme");
        store.insert_client(&client).await.unwrap();

        let err = store.insert_client(&client).await.unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_mock_rate_history_kept_after_employee_delete() {
        let store = InMemoryLedgerStore::new();
        let id = EmployeeId::parse("E1").unwrap();
        store.insert_employee(&Employee::new(id.clone(), "Ann", dec!(80))).await.unwrap();
        store
            .append_rate(&RateHistoryRecord::new(id.clone(), dec!(100), date(2024, 1, 1)))
            .await
            .unwrap();

        store.delete_employee(&id).await.unwrap();
        assert!(store.get_employee(&id).await.unwrap().is_none());
        assert_eq!(store.rate_history(&id).await.unwrap().len(), 1);
    }
}
