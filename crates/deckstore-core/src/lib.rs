//! deckstore core - control artifacts and their persistence discipline
//!
//! This crate provides:
//! - The card model and the per-type card schema
//! - `Deck`: building, canonical encoding, loading and persisting artifacts
//! - Delta manifest reconstruction against a baseline
//! - Nested transactions with rollback-on-drop guards
//! - The persistence gateway boundary and an in-memory implementation
//! - The structured error and logging facilities shared by the workspace

pub mod baseline;
pub mod codec;
pub mod deck;
pub mod errors;
pub mod gateway;
pub mod interop;
pub mod logging_facility;
pub mod model;
pub mod rules;
pub mod transaction;

/// Canonical logging field names, re-exported for the logging macros
pub use deckstore_core_types as core_types;

// Re-export commonly used types
pub use baseline::{merge_file_lists, FileList};
pub use deck::Deck;
pub use errors::{DeckError, ExError, ExErrorKind, Result};
pub use gateway::{
    ArtifactFilter, ArtifactRecord, MemoryGateway, PersistenceGateway, QueryStatus, RowFlow,
};
pub use model::{ArtifactType, Card, FileCard, Permission, Rid, TagCard, TagKind, TagTarget, Timestamp};
pub use transaction::{with_transaction, TransactionDepth, TransactionGuard, Transactional, TxOutcome};
