//! Error handling for deckstore-store
//!
//! Store-specific constructors for the core `ExError`

use deckstore_core::errors::{DeckError, ExError, ExErrorKind};

/// Result type alias using ExError
pub type Result<T> = std::result::Result<T, ExError>;

/// Create a migration error
pub fn migration_error(migration_id: &str, reason: &str) -> ExError {
    ExError::new(ExErrorKind::Storage)
        .with_op("migration")
        .with_message(format!("Migration {} failed: {}", migration_id, reason))
}

/// An applied migration's SQL changed after it was applied
pub fn checksum_mismatch(migration_id: &str, expected: &str, actual: &str) -> ExError {
    ExError::new(ExErrorKind::Corrupt)
        .with_op("migration_checksum")
        .with_message(format!(
            "Checksum mismatch for migration {}: recorded {}, embedded {}",
            migration_id, expected, actual
        ))
}

/// Different bytes already stored under `uuid`
pub fn content_collision(uuid: &str) -> ExError {
    ExError::from(DeckError::ContentCollision {
        uuid: uuid.to_string(),
    })
    .with_op("put_content")
}

/// Create a database error from rusqlite::Error
pub fn from_rusqlite(err: rusqlite::Error) -> ExError {
    ExError::new(ExErrorKind::Storage)
        .with_op("sqlite")
        .with_message(err.to_string())
}

/// Create an IO error
pub fn io_error(operation: &str, err: std::io::Error) -> ExError {
    ExError::new(ExErrorKind::Io)
        .with_op(operation.to_string())
        .with_message(err.to_string())
}

/// Store configuration that does not parse or names an unknown role
pub fn config_error(reason: impl Into<String>) -> ExError {
    ExError::new(ExErrorKind::Serialization)
        .with_op("load_config")
        .with_message(reason)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_helper_kinds() {
        assert_eq!(migration_error("001", "x").kind(), ExErrorKind::Storage);
        assert_eq!(checksum_mismatch("001", "a", "b").kind(), ExErrorKind::Corrupt);
        assert_eq!(content_collision("abcd").artifact(), Some("abcd"));
        assert_eq!(config_error("bad").code(), "ERR_SERIALIZATION");
        let io = io_error("read_config", std::io::Error::other("gone"));
        assert_eq!(io.kind(), ExErrorKind::Io);
        assert_eq!(io.op(), Some("read_config"));
    }
}
