//! Port Adapters
//!
//! PostgreSQL implementations of the ledger ports. A single store serves
//! every port so one pool backs the whole service.
//!
//! ```rust,ignore
//! use infra_db::adapters::PostgresLedgerStore;
//! use domain_ledger::ClientPort;
//!
//! let store = PostgresLedgerStore::new(pool);
//! let clients = store.list_clients().await?;
//! ```

pub mod ledger;

pub use ledger::PostgresLedgerStore;
