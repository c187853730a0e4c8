//! Local `SQLite` query and transaction layer for Mirrorlite.
//!
//! A [`LocalStore`] owns one connection over a local database file and
//! exposes a table-oriented async query surface (select/insert/update/
//! replace/delete/truncate), single-level transactions, and a change
//! notification channel that drives the replication layer.
//!
//! The store is the one mutable shared resource in a replica. It is never
//! mutated concurrently by two owners: all statements serialize through an
//! async mutex around the connection, and the sync layer swaps the backing
//! file only through [`LocalStore::reconnect_at`], which fully closes the
//! old connection before the new one opens.
//!
//! # Modules
//!
//! - [`store`] -- The [`LocalStore`] connection and query surface
//! - [`sql`] -- Parameterized statement construction
//! - [`transaction`] -- Transaction handle bookkeeping
//! - [`error`] -- Error types

pub mod error;
pub mod sql;
pub mod store;
pub mod transaction;

pub use error::{StoreError, TransactionError};
pub use store::LocalStore;
pub use transaction::TransactionTracker;
