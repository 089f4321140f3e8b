//! Timesheet Ledger Domain
//!
//! This crate holds the billing ledger: who worked, for which client, for how
//! long, and what it was charged.
//!
//! # Ledger Model
//!
//! Every [`TimesheetEntry`] is one signed line against a client:
//!
//! - **Normal**: billable time; when no charge is given it is derived from the
//!   employee's rate in force on the entry date, `round(rate × hours)`
//! - **Close-off**: a settlement, always stored as a non-positive charge
//! - **Transfer**: a balance moved between clients, stored as given
//!
//! A client's balance is the sum of its lines. Reports split it into an
//! opening balance carried forward and the total charged within the period.
//!
//! # Examples
//!
//! ```rust
//! use domain_ledger::fraction::{parse_fraction, to_fraction_token};
//! use domain_ledger::dates::normalize_date;
//! use domain_ledger::valuation::charge_for_time;
//! use core_kernel::EmployeeId;
//! use rust_decimal_macros::dec;
//!
//! let date = normalize_date("05.03.2024").unwrap();
//! assert_eq!(date.to_string(), "2024-03-05");
//!
//! let hours = parse_fraction("1¼");
//! assert_eq!(to_fraction_token(hours), "1¼");
//!
//! let e1 = EmployeeId::parse("E1").unwrap();
//! assert_eq!(charge_for_time(&e1, date, dec!(100), "1¼").unwrap(), dec!(125));
//! ```

pub mod fraction;
pub mod dates;
pub mod employee;
pub mod client;
pub mod user;
pub mod entry;
pub mod audit;
pub mod error;
pub mod ports;
pub mod rate;
pub mod valuation;
pub mod import;
pub mod balance;
pub mod report;
pub mod service;

pub use fraction::{parse_fraction, to_fraction_token, canonical_time_token};
pub use dates::{normalize_date, migrate_legacy_date};
pub use employee::{Employee, EmployeeUpdate, RateHistoryRecord};
pub use client::{Client, ClientUpdate, ClientImportRow};
pub use user::UserAccount;
pub use entry::{EntryDraft, EntryKind, EntryType, StoredEntry, TimesheetEntry, CLOSE_OFF_MARKER};
pub use audit::{AuditAction, AuditEmitter, AuditFact, AuditQuery, EntityKind};
pub use error::{LedgerError, LedgerResult};
pub use ports::{
    AuditSink, ClientPort, EmployeePort, EntryFilter, LedgerPorts, LedgerStore, TimesheetPort,
    UserPort,
};
#[cfg(any(test, feature = "mock"))]
pub use ports::mock::InMemoryLedgerStore;
pub use rate::RateResolver;
pub use valuation::{EntryValuator, Valuation};
pub use import::{read_csv_rows, ImportOutcome, ImportPipeline, ImportRowError, RowDraft};
pub use balance::{Balance, BalanceAggregator, BalanceScope};
pub use report::{Report, ReportGenerator, ReportLine, ReportSubject};
pub use service::{LedgerConfig, LedgerService, TimesheetPage, TimesheetQuery};
