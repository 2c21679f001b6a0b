//! deckstore store - SQLite persistence for control artifacts
//!
//! Provides:
//! - `SqliteStore`, the on-disk `PersistenceGateway`
//! - Embedded, checksummed schema migrations
//! - Store configuration (TOML) and attached checkout/config databases

pub mod config;
pub mod db;
pub mod errors;
pub mod migrations;
pub mod role;
pub mod sqlite_store;

// Re-export key types
pub use config::{JournalMode, StoreConfig};
pub use errors::Result;
pub use role::DbRole;
pub use sqlite_store::SqliteStore;
