//! Shared type definitions for the Mirrorlite replicated database.
//!
//! This crate is the single source of truth for the leaf types used across
//! the Mirrorlite workspace: version tags, blob locations, SQL values, and
//! the store event enum that drives replication.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers (transaction handles)
//! - [`version`] -- Opaque content version tags for divergence detection
//! - [`location`] -- Remote blob addressing (container + filename)
//! - [`value`] -- Dynamically typed SQL values, rows, and column maps
//! - [`events`] -- Store change/remote-update notifications

pub mod events;
pub mod ids;
pub mod location;
pub mod value;
pub mod version;

// Re-export all public types at crate root for convenience.
pub use events::StoreEvent;
pub use ids::TransactionId;
pub use location::BlobLocation;
pub use value::{SqlMap, SqlRow, SqlValue};
pub use version::VersionTag;
