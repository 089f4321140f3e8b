//! Infrastructure Database Layer
//!
//! PostgreSQL storage for the timesheet ledger using SQLx.
//!
//! # Schema
//!
//! Table and column names are fixed (`"Timesheets"."chargeOut"` and so on);
//! the embedded migrations in `migrations/` create them. Timesheet dates are
//! ISO text, so lexical comparison matches calendar order once
//! [`migrate_legacy_dates`] has rewritten any day-first rows.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool, run_migrations, DatabaseConfig, PostgresLedgerStore};
//!
//! let pool = create_pool(DatabaseConfig::new("postgres://localhost/ledger")).await?;
//! run_migrations(&pool).await?;
//! let store = PostgresLedgerStore::new(pool);
//! ```

pub mod pool;
pub mod error;
pub mod rows;
pub mod migrate;
pub mod adapters;

pub use pool::{DatabasePool, create_pool, run_migrations, DatabaseConfig};
pub use error::DatabaseError;
pub use migrate::{migrate_legacy_dates, DateMigrationSummary};
pub use adapters::PostgresLedgerStore;
