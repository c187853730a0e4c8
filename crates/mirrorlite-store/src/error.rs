//! Error types for the local store.
//!
//! Statement failures wrap the underlying [`sqlx`] engine error and are
//! surfaced to the caller of the query API, never retried automatically.
//! Transaction bookkeeping violations get their own variant so callers can
//! distinguish a bad handle from a failed statement.

use mirrorlite_types::TransactionId;

/// Errors that can occur in the local store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A statement failed in the database engine.
    #[error("query error: {0}")]
    Query(#[from] sqlx::Error),

    /// A transaction operation violated the bookkeeping rules.
    #[error("transaction error: {0}")]
    Transaction(#[from] TransactionError),

    /// A filesystem operation on the backing file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A query-surface argument was malformed (empty column list, row
    /// arity mismatch).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Transaction bookkeeping violations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransactionError {
    /// The handle was never issued, or was already committed/rolled back.
    #[error("unknown transaction handle {0}")]
    UnknownHandle(TransactionId),

    /// A transaction is already open; only single-level transactions are
    /// supported.
    #[error("nested transactions are not supported")]
    NestedUnsupported,

    /// A deeper transaction level is still open; it must be closed first.
    #[error("cannot close transaction at level {level} while level {deepest} is open")]
    OutOfOrder {
        /// Level of the transaction being closed.
        level: u32,
        /// Deepest level currently open.
        deepest: u32,
    },
}
