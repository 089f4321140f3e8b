//! Timesheet import pipeline
//!
//! Turns rows from spreadsheets or CSV files into ledger entries. Every row is
//! handled on its own: a bad row is reported as `Row N: <reason>` and the
//! next row is processed. Nothing already inserted is rolled back.
//!
//! Per row the pipeline:
//! 1. normalizes the date
//! 2. resolves the client by id, then by name, then by either
//! 3. canonicalizes the time value to a quarter-hour token
//! 4. values the entry (rate lookup for Normal rows without a charge)
//! 5. inserts it tagged with the run date

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use std::io;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use core_kernel::{parse_amount, ClientId, EmployeeId, PortError};

use crate::audit::{AuditAction, AuditEmitter, AuditFact, EntityKind};
use crate::client::Client;
use crate::dates::normalize_date;
use crate::entry::{EntryDraft, EntryType, TimesheetEntry};
use crate::error::{LedgerError, LedgerResult};
use crate::fraction::canonical_time_token;
use crate::ports::{ClientPort, TimesheetPort};
use crate::valuation::EntryValuator;

/// Why a single import row was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImportRowError {
    #[error("Invalid date format - {0}")]
    InvalidDate(String),

    #[error("Missing client identifier (Client ID or Client Name)")]
    MissingClientReference,

    #[error("Client not found - {0}")]
    ClientNotFound(String),

    #[error("Invalid or zero time value")]
    InvalidOrZeroTime,

    #[error("Invalid charge out - {0}")]
    InvalidCharge(String),

    #[error("Missing employee ID for charge-out calculation")]
    MissingEmployeeId,

    #[error("No rate found for employee {employee_id} on {date}")]
    NoRate { employee_id: EmployeeId, date: NaiveDate },

    #[error("Invalid time format - {0}")]
    InvalidTime(String),

    #[error("Could not calculate charge-out")]
    ChargeNotComputed,

    #[error("{0}")]
    Rejected(String),
}

impl ImportRowError {
    fn from_valuation(error: LedgerError, raw_time: &str) -> Self {
        match error {
            LedgerError::MissingEmployeeId => ImportRowError::MissingEmployeeId,
            LedgerError::RateUnavailable { employee_id, date } => ImportRowError::NoRate { employee_id, date },
            LedgerError::InvalidTimeValue(_) => ImportRowError::InvalidTime(raw_time.to_string()),
            LedgerError::InvalidComputedCharge => ImportRowError::ChargeNotComputed,
            other => ImportRowError::Rejected(other.to_string()),
        }
    }
}

/// A rejected row with its 1-based position
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Row {row}: {error}")]
pub struct RowFailure {
    pub row: usize,
    pub error: ImportRowError,
}

/// Result of an import run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportOutcome {
    pub success_count: usize,
    pub errors: Vec<String>,
}

impl ImportOutcome {
    fn record(&mut self, failure: RowFailure) {
        self.errors.push(failure.to_string());
    }
}

/// A scalar spreadsheet cell: text, number or boolean
#[derive(Deserialize)]
#[serde(untagged)]
enum Cell {
    Text(String),
    Integer(i64),
    Float(f64),
    Flag(bool),
}

fn cell_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let cell = Option::<Cell>::deserialize(deserializer)?;
    Ok(cell
        .map(|c| match c {
            Cell::Text(s) => s,
            Cell::Integer(n) => n.to_string(),
            Cell::Float(f) => f.to_string(),
            Cell::Flag(b) => b.to_string(),
        })
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty()))
}

/// One raw import row; every cell is optional text
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowDraft {
    #[serde(default, deserialize_with = "cell_text")]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "cell_text")]
    pub client_id: Option<String>,
    #[serde(default, deserialize_with = "cell_text")]
    pub client_name: Option<String>,
    #[serde(default, deserialize_with = "cell_text")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "cell_text")]
    pub employee_id: Option<String>,
    #[serde(default, deserialize_with = "cell_text")]
    pub linked_id: Option<String>,
    #[serde(default, deserialize_with = "cell_text")]
    pub time_spent: Option<String>,
    #[serde(default, deserialize_with = "cell_text")]
    pub entry_type: Option<String>,
    #[serde(default, deserialize_with = "cell_text")]
    pub charge_out: Option<String>,
    #[serde(default, deserialize_with = "cell_text")]
    pub transfer_from_client_id: Option<String>,
    #[serde(default, deserialize_with = "cell_text")]
    pub transfer_to_client_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Date,
    ClientId,
    ClientName,
    Description,
    EmployeeId,
    TimeSpent,
    EntryType,
    ChargeOut,
    TransferFrom,
    TransferTo,
}

/// Header spellings accepted for each column, after folding
const COLUMN_ALIASES: [(&str, Column); 26] = [
    ("date", Column::Date),
    ("clientid", Column::ClientId),
    ("clientcode", Column::ClientId),
    ("code", Column::ClientId),
    ("clientname", Column::ClientName),
    ("client", Column::ClientName),
    ("name", Column::ClientName),
    ("description", Column::Description),
    ("desc", Column::Description),
    ("details", Column::Description),
    ("employeeid", Column::EmployeeId),
    ("employee", Column::EmployeeId),
    ("id", Column::EmployeeId),
    ("linkedid", Column::EmployeeId),
    ("timespent", Column::TimeSpent),
    ("time", Column::TimeSpent),
    ("hours", Column::TimeSpent),
    ("entrytype", Column::EntryType),
    ("type", Column::EntryType),
    ("chargeout", Column::ChargeOut),
    ("charge", Column::ChargeOut),
    ("amount", Column::ChargeOut),
    ("transferfromclientid", Column::TransferFrom),
    ("transferfrom", Column::TransferFrom),
    ("transfertoclientid", Column::TransferTo),
    ("transferto", Column::TransferTo),
];

/// Lowercases a header and drops whitespace, `_` and `-`
fn fold_header(header: &str) -> String {
    header
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

fn column_for(header: &str) -> Option<Column> {
    let folded = fold_header(header);
    COLUMN_ALIASES
        .iter()
        .find(|(alias, _)| *alias == folded)
        .map(|(_, column)| *column)
}

impl RowDraft {
    /// Sets the field a header names; unknown headers and blank cells are ignored
    pub fn set(&mut self, header: &str, value: &str) {
        let value = value.trim();
        if value.is_empty() {
            return;
        }
        let Some(column) = column_for(header) else {
            return;
        };
        let slot = match column {
            Column::Date => &mut self.date,
            Column::ClientId => &mut self.client_id,
            Column::ClientName => &mut self.client_name,
            Column::Description => &mut self.description,
            Column::EmployeeId => &mut self.employee_id,
            Column::TimeSpent => &mut self.time_spent,
            Column::EntryType => &mut self.entry_type,
            Column::ChargeOut => &mut self.charge_out,
            Column::TransferFrom => &mut self.transfer_from_client_id,
            Column::TransferTo => &mut self.transfer_to_client_id,
        };
        if slot.is_none() {
            *slot = Some(value.to_string());
        }
    }

    /// Builds a row from header/value pairs, such as a spreadsheet row
    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut row = RowDraft::default();
        for (header, value) in pairs {
            row.set(header, value);
        }
        row
    }

    /// The employee or linked id recorded on the entry
    pub fn linked_reference(&self) -> Option<&str> {
        self.employee_id.as_deref().or(self.linked_id.as_deref())
    }

    /// The value used to find the client: its id if given, else its name
    pub fn client_reference(&self) -> Option<&str> {
        self.client_id.as_deref().or(self.client_name.as_deref())
    }
}

/// Reads import rows from CSV with a header line.
///
/// Headers are matched loosely (`Client ID`, `client_id` and `ClientId` all
/// name the client id column). Records may be shorter than the header.
pub fn read_csv_rows<R: io::Read>(reader: R) -> LedgerResult<Vec<RowDraft>> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr
        .headers()
        .map_err(|e| LedgerError::validation(format!("Unreadable CSV header: {}", e)))?
        .clone();

    let mut rows = Vec::new();
    for (index, record) in rdr.records().enumerate() {
        let record = record.map_err(|e| {
            LedgerError::validation(format!("Unreadable CSV record {}: {}", index + 1, e))
        })?;
        let row = RowDraft::from_pairs(headers.iter().zip(record.iter()));
        if row != RowDraft::default() {
            rows.push(row);
        }
    }
    Ok(rows)
}

/// Runs import batches against the ledger store
#[derive(Clone)]
pub struct ImportPipeline {
    clients: Arc<dyn ClientPort>,
    timesheets: Arc<dyn TimesheetPort>,
    valuator: EntryValuator,
    audit: AuditEmitter,
}

impl ImportPipeline {
    pub fn new(
        clients: Arc<dyn ClientPort>,
        timesheets: Arc<dyn TimesheetPort>,
        valuator: EntryValuator,
        audit: AuditEmitter,
    ) -> Self {
        Self {
            clients,
            timesheets,
            valuator,
            audit,
        }
    }

    /// Imports `rows` in order, tagging each entry with `run_date`.
    ///
    /// Each inserted row emits one audit fact under `actor`.
    pub async fn import_rows(&self, rows: &[RowDraft], run_date: NaiveDate, actor: &str) -> ImportOutcome {
        let mut outcome = ImportOutcome::default();

        for (index, row) in rows.iter().enumerate() {
            let row_number = index + 1;
            let result = match self.prepare(row, run_date).await {
                Ok(entry) => self.insert(entry, actor).await,
                Err(error) => Err(error),
            };

            match result {
                Ok(()) => outcome.success_count += 1,
                Err(error) => {
                    warn!(row = row_number, %error, "Import row rejected");
                    outcome.record(RowFailure { row: row_number, error });
                }
            }
        }

        info!(
            imported = outcome.success_count,
            rejected = outcome.errors.len(),
            %run_date,
            "Timesheet import finished"
        );
        outcome
    }

    /// Validates and values one row without storing it
    pub async fn prepare(&self, row: &RowDraft, run_date: NaiveDate) -> Result<TimesheetEntry, ImportRowError> {
        let raw_date = row.date.as_deref().unwrap_or_default();
        let date = normalize_date(raw_date).ok_or_else(|| ImportRowError::InvalidDate(raw_date.to_string()))?;

        let client = self.resolve_client(row).await?;

        let raw_time = row.time_spent.as_deref().unwrap_or_default();
        let time_spent = canonical_time_token(raw_time).ok_or(ImportRowError::InvalidOrZeroTime)?;

        let entry_type: EntryType = row
            .entry_type
            .as_deref()
            .unwrap_or_default()
            .parse()
            .map_err(|e: LedgerError| ImportRowError::Rejected(e.to_string()))?;

        let charge_out = match row.charge_out.as_deref() {
            Some(raw) => Some(parse_amount(raw).ok_or_else(|| ImportRowError::InvalidCharge(raw.to_string()))?),
            None => None,
        };

        let draft = EntryDraft {
            date,
            client_id: client.client_id.to_string(),
            description: row.description.clone().unwrap_or_default(),
            linked_id: row.linked_reference().unwrap_or_default().to_string(),
            time_spent,
            charge_out,
            entry_type,
            transfer_from_client_id: row.transfer_from_client_id.clone(),
            transfer_to_client_id: row.transfer_to_client_id.clone(),
        };

        let valuation = self
            .valuator
            .valuate(&draft)
            .await
            .map_err(|e| ImportRowError::from_valuation(e, raw_time))?;

        Ok(TimesheetEntry {
            date,
            client_id: client.client_id,
            description: draft.description,
            time_spent: draft.time_spent,
            charge_out: valuation.charge_out,
            kind: valuation.kind,
            imported_date: Some(run_date),
        })
    }

    async fn resolve_client(&self, row: &RowDraft) -> Result<Client, ImportRowError> {
        let reference = row.client_reference().ok_or(ImportRowError::MissingClientReference)?;
        let lookup_failed = |e: PortError| ImportRowError::Rejected(LedgerError::from(e).to_string());

        if let Some(id) = row.client_id.as_deref() {
            if let Some(client) = self.find_by_id(id).await.map_err(lookup_failed)? {
                return Ok(client);
            }
        }
        if let Some(name) = row.client_name.as_deref() {
            if let Some(client) = self.clients.find_client_by_name(name).await.map_err(lookup_failed)? {
                return Ok(client);
            }
        }
        if let Some(client) = self.find_by_id(reference).await.map_err(lookup_failed)? {
            return Ok(client);
        }
        if let Some(client) = self.clients.find_client_by_name(reference).await.map_err(lookup_failed)? {
            return Ok(client);
        }

        Err(ImportRowError::ClientNotFound(reference.to_string()))
    }

    async fn find_by_id(&self, raw: &str) -> Result<Option<Client>, PortError> {
        match ClientId::parse(raw) {
            Ok(id) => self.clients.get_client(&id).await,
            Err(_) => Ok(None),
        }
    }

    async fn insert(&self, entry: TimesheetEntry, actor: &str) -> Result<(), ImportRowError> {
        let stored = self
            .timesheets
            .insert_entry(&entry)
            .await
            .map_err(|e| ImportRowError::Rejected(LedgerError::from(e).to_string()))?;

        let fact = AuditFact::new(
            actor,
            AuditAction::Create,
            EntityKind::Timesheet,
            stored.id.to_string(),
            format!("Imported {} timesheet for {}", entry.entry_type(), entry.client_id),
        )
        .with_after(entry.audit_snapshot());
        self.audit.emit(fact).await;
        Ok(())
    }
}
