//! Core Kernel - Foundational types for the timesheet ledger
//!
//! This crate provides the building blocks shared by the ledger, its storage
//! adapter and the HTTP surface:
//! - Charge rounding and money display with precise decimal arithmetic
//! - Identifiers and business keys
//! - Calendar helpers: firm timezone, report windows, effective dating
//! - Ports infrastructure for adapters
//! - Sessions and capability checks

pub mod money;
pub mod temporal;
pub mod identifiers;
pub mod ports;
pub mod session;
pub mod error;

pub use money::{Money, Currency, MoneyError, round_charge, parse_amount};
pub use temporal::{
    DateRange, PeriodBounds, Timezone, TemporalError, EffectiveDated, in_force_on,
    REPORT_FLOOR, REPORT_CEILING,
};
pub use identifiers::{EntryId, AuditEventId, EmployeeId, ClientId, EmptyKeyError};
pub use ports::{PortError, DomainPort, HealthCheckable, HealthCheckResult, AdapterHealth};
pub use session::{Session, Role, Capability, CapabilitySet, PermissionDenied};
pub use error::CoreError;
