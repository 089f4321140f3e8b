//! Test Utilities Crate
//!
//! Shared test infrastructure for the ledger crates.
//!
//! # Modules
//!
//! - `fixtures`: the reference employee, clients and accounts, and a seeded in-memory store
//! - `builders`: builders for entries, drafts and import rows
//! - `assertions`: assertion helpers for balances, charges and import outcomes
//! - `generators`: proptest strategies for time tokens, charges and entries

pub mod fixtures;
pub mod builders;
pub mod assertions;
pub mod generators;

pub use fixtures::*;
pub use builders::*;
pub use assertions::*;
pub use generators::*;
