//! Content hashing for artifacts
//!
//! Artifact identity is the lowercase hex SHA-256 of the artifact bytes.

use sha2::{Digest, Sha256};

/// Length of a full hash in hex digits
pub const HASH_LEN: usize = 64;

/// Shortest prefix accepted when resolving references
pub const MIN_PREFIX_LEN: usize = 4;

/// Compute the content hash of `content`
pub fn content_hash(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hex::encode(hasher.finalize())
}

/// True for a full lowercase hex hash. SHA-1 length hashes are accepted so
/// decks can reference artifacts imported from older repositories.
pub fn is_valid_hash(s: &str) -> bool {
    (s.len() == HASH_LEN || s.len() == 40) && is_lower_hex(s)
}

/// True for a string that could be an abbreviated hash
pub fn is_hash_prefix(s: &str) -> bool {
    s.len() >= MIN_PREFIX_LEN && s.len() <= HASH_LEN && is_lower_hex(s)
}

fn is_lower_hex(s: &str) -> bool {
    s.bytes()
        .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}
