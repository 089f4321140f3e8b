//! Client and employee statements
//!
//! A report covers one subject over a window. Missing window bounds fall back
//! to the report floor and ceiling, so the opening balance of an unbounded
//! report is always zero.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use core_kernel::{ClientId, DateRange, EmployeeId, EntryId, PeriodBounds};

use crate::client::Client;
use crate::employee::Employee;
use crate::entry::{EntryType, StoredEntry};
use crate::error::{LedgerError, LedgerResult};
use crate::ports::{ClientPort, EmployeePort, EntryFilter, TimesheetPort};

/// Who a report is about
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ReportSubject {
    Client(Client),
    Employee(Employee),
}

impl ReportSubject {
    fn filter(&self) -> EntryFilter {
        match self {
            ReportSubject::Client(client) => EntryFilter::for_client(client.client_id.clone()),
            ReportSubject::Employee(employee) => EntryFilter::for_linked_id(employee.employee_id.as_str()),
        }
    }
}

/// One statement line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportLine {
    pub id: EntryId,
    pub date: chrono::NaiveDate,
    /// Reference shown in the ID column of the statement
    pub display_id: String,
    pub description: String,
    pub time_spent: String,
    pub charge_out: Decimal,
    pub entry_type: EntryType,
}

impl ReportLine {
    fn for_subject(stored: &StoredEntry, subject: &ReportSubject) -> Self {
        let entry = &stored.entry;
        let display_id = match subject {
            ReportSubject::Employee(_) => entry.client_id.to_string(),
            ReportSubject::Client(_) => match entry.entry_type() {
                EntryType::Transfer => entry
                    .transfer_to()
                    .or(entry.transfer_from())
                    .map(ClientId::to_string)
                    .unwrap_or_else(|| entry.linked_id().to_string()),
                EntryType::Normal | EntryType::CloseOff => entry.linked_id().to_string(),
            },
        };

        Self {
            id: stored.id,
            date: entry.date,
            display_id,
            description: entry.description.clone(),
            time_spent: entry.time_spent.clone(),
            charge_out: entry.charge_out,
            entry_type: entry.entry_type(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub subject: ReportSubject,
    pub period: DateRange,
    pub opening_balance: Decimal,
    pub period_total: Decimal,
    pub closing_balance: Decimal,
    /// Lines ordered by date, then by insertion
    pub lines: Vec<ReportLine>,
}

impl Report {
    /// True when there is nothing to show: no lines and a zero opening balance
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty() && self.opening_balance.is_zero()
    }
}

/// Builds statements from the stored ledger
#[derive(Clone)]
pub struct ReportGenerator {
    timesheets: Arc<dyn TimesheetPort>,
    clients: Arc<dyn ClientPort>,
    employees: Arc<dyn EmployeePort>,
}

impl ReportGenerator {
    pub fn new(
        timesheets: Arc<dyn TimesheetPort>,
        clients: Arc<dyn ClientPort>,
        employees: Arc<dyn EmployeePort>,
    ) -> Self {
        Self {
            timesheets,
            clients,
            employees,
        }
    }

    pub async fn for_client(&self, client_id: &ClientId, bounds: PeriodBounds) -> LedgerResult<Report> {
        let client = self
            .clients
            .get_client(client_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Client", client_id))?;
        self.generate(ReportSubject::Client(client), bounds).await
    }

    pub async fn for_employee(&self, employee_id: &EmployeeId, bounds: PeriodBounds) -> LedgerResult<Report> {
        let employee = self
            .employees
            .get_employee(employee_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Employee", employee_id))?;
        self.generate(ReportSubject::Employee(employee), bounds).await
    }

    /// Reports for every client by name, skipping clients with nothing to show
    pub async fn for_all_clients(&self, bounds: PeriodBounds) -> LedgerResult<Vec<Report>> {
        let mut reports = Vec::new();
        for client in self.clients.list_clients().await? {
            let report = self.generate(ReportSubject::Client(client), bounds).await?;
            if !report.is_empty() {
                reports.push(report);
            }
        }
        info!(count = reports.len(), "Generated client reports");
        Ok(reports)
    }

    /// Reports for every employee by name, skipping employees with nothing to show
    pub async fn for_all_employees(&self, bounds: PeriodBounds) -> LedgerResult<Vec<Report>> {
        let mut reports = Vec::new();
        for employee in self.employees.list_employees().await? {
            let report = self.generate(ReportSubject::Employee(employee), bounds).await?;
            if !report.is_empty() {
                reports.push(report);
            }
        }
        info!(count = reports.len(), "Generated employee reports");
        Ok(reports)
    }

    async fn generate(&self, subject: ReportSubject, bounds: PeriodBounds) -> LedgerResult<Report> {
        let period = bounds.to_report_range();
        let base = subject.filter();

        let opening_balance = self
            .timesheets
            .sum_charges(&base.clone().dated_before(period.start))
            .await?;
        let entries = self
            .timesheets
            .find_entries(&base.within(PeriodBounds::new(Some(period.start), Some(period.end))))
            .await?;

        let period_total: Decimal = entries.iter().map(|e| e.entry.charge_out).sum();
        let lines = entries.iter().map(|e| ReportLine::for_subject(e, &subject)).collect();
        debug!(%opening_balance, %period_total, "Report totals");

        Ok(Report {
            subject,
            period,
            opening_balance,
            period_total,
            closing_balance: opening_balance + period_total,
            lines,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{EntryKind, TimesheetEntry};
    use crate::ports::mock::InMemoryLedgerStore;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn entry(client: &str, on: NaiveDate, amount: Decimal, kind: EntryKind) -> TimesheetEntry {
        TimesheetEntry {
            date: on,
            client_id: ClientId::parse(client).unwrap(),
            description: String::new(),
            time_spent: "1".to_string(),
            charge_out: amount,
            kind,
            imported_date: None,
        }
    }

    fn normal() -> EntryKind {
        EntryKind::Normal { employee_id: Some(EmployeeId::parse("E1").unwrap()) }
    }

    async fn seeded() -> (Arc<InMemoryLedgerStore>, ReportGenerator) {
        let store = Arc::new(InMemoryLedgerStore::new());
        for (id, name) in [("C1", "Zulu Trading"), ("C2", "Acme"), ("C3", "Idle")] {
            store.insert_client(&Client::new(ClientId::parse(id).unwrap(), name)).await.unwrap();
        }
        store
            .insert_employee(&Employee::new(EmployeeId::parse("E1").unwrap(), "Ann", dec!(100)))
            .await
            .unwrap();
        store
            .insert_employee(&Employee::new(EmployeeId::parse("E2").unwrap(), "Bob", dec!(100)))
            .await
            .unwrap();

        for e in [
            entry("C1", date(2024, 1, 20), dec!(-100), normal()),
            entry("C1", date(2024, 2, 5), dec!(300), normal()),
            entry("C1", date(2024, 2, 5), dec!(-50), EntryKind::CloseOff { reference: "C/O".into() }),
            entry(
                "C2",
                date(2024, 2, 9),
                dec!(75),
                EntryKind::Transfer {
                    counterparty: "C1".into(),
                    from_client: Some(ClientId::parse("C1").unwrap()),
                    to_client: None,
                },
            ),
        ] {
            store.insert_entry(&e).await.unwrap();
        }

        let generator = ReportGenerator::new(store.clone(), store.clone(), store.clone());
        (store, generator)
    }

    fn february() -> PeriodBounds {
        PeriodBounds::new(Some(date(2024, 2, 1)), Some(date(2024, 2, 29)))
    }

    #[tokio::test]
    async fn test_client_report_balances_and_display_ids() {
        let (_, generator) = seeded().await;
        let report = generator
            .for_client(&ClientId::parse("C1").unwrap(), february())
            .await
            .unwrap();

        assert_eq!(report.opening_balance, dec!(-100));
        assert_eq!(report.period_total, dec!(250));
        assert_eq!(report.closing_balance, dec!(150));
        let ids: Vec<&str> = report.lines.iter().map(|l| l.display_id.as_str()).collect();
        assert_eq!(ids, vec!["E1", "C/O"]);
    }

    #[tokio::test]
    async fn test_close_off_shows_its_own_reference() {
        let (store, generator) = seeded().await;
        store
            .insert_entry(&entry(
                "C1",
                date(2024, 2, 10),
                dec!(-20),
                EntryKind::CloseOff { reference: "SETTLE-7".into() },
            ))
            .await
            .unwrap();

        let report = generator
            .for_client(&ClientId::parse("C1").unwrap(), february())
            .await
            .unwrap();
        let line = report.lines.iter().find(|l| l.charge_out == dec!(-20)).unwrap();
        assert_eq!(line.display_id, "SETTLE-7");
    }

    #[tokio::test]
    async fn test_transfer_shows_counterparty_client() {
        let (_, generator) = seeded().await;
        let report = generator
            .for_client(&ClientId::parse("C2").unwrap(), february())
            .await
            .unwrap();
        assert_eq!(report.lines[0].display_id, "C1");
    }

    #[tokio::test]
    async fn test_employee_report_shows_client_ids() {
        let (_, generator) = seeded().await;
        let report = generator
            .for_employee(&EmployeeId::parse("E1").unwrap(), PeriodBounds::unbounded())
            .await
            .unwrap();

        assert_eq!(report.opening_balance, dec!(0));
        assert_eq!(report.closing_balance, dec!(200));
        assert!(report.lines.iter().all(|l| l.display_id == "C1"));
    }

    #[tokio::test]
    async fn test_all_clients_skip_empty_and_sort_by_name() {
        let (_, generator) = seeded().await;
        let reports = generator.for_all_clients(february()).await.unwrap();

        let names: Vec<String> = reports
            .iter()
            .map(|r| match &r.subject {
                ReportSubject::Client(c) => c.client_name.clone(),
                ReportSubject::Employee(e) => e.name.clone(),
            })
            .collect();
        assert_eq!(names, vec!["Acme".to_string(), "Zulu Trading".to_string()]);
    }

    #[tokio::test]
    async fn test_all_employees_skip_idle() {
        let (_, generator) = seeded().await;
        let reports = generator.for_all_employees(february()).await.unwrap();
        assert_eq!(reports.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_client_is_not_found() {
        let (_, generator) = seeded().await;
        let err = generator
            .for_client(&ClientId::parse("C404").unwrap(), february())
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotFound { entity: "Client", .. }));
    }
}
