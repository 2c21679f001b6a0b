//! Checksums of migration SQL, recorded when a migration is applied so a
//! later edit to an already-applied migration is caught

use deckstore_core::model::hash::content_hash;

pub fn compute_checksum(sql: &str) -> String {
    content_hash(sql.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_tracks_content() {
        assert_eq!(compute_checksum("SELECT 1"), compute_checksum("SELECT 1"));
        assert_ne!(compute_checksum("SELECT 1"), compute_checksum("SELECT 2"));
        assert_eq!(compute_checksum("SELECT 1").len(), 64);
    }
}
