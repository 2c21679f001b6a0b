//! Persistence boundary
//!
//! [`PersistenceGateway`] is everything a deck needs from storage: resolve a
//! reference, fetch and store content by hash, and keep a small metadata
//! index. Mutating calls require an open transaction (see
//! [`crate::transaction`]); reads do not.

pub mod memory;

use std::cmp::Ordering;

use serde::Serialize;

use crate::deck::Deck;
use crate::errors::{ExError, Result};
use crate::model::hash::{is_hash_prefix, HASH_LEN};
use crate::model::{ArtifactType, Rid, Timestamp};
use crate::transaction::Transactional;

pub use memory::MemoryGateway;

/// Visitor verdict for one row of a query
#[derive(Debug)]
pub enum RowFlow {
    Continue,
    Stop,
    /// Abort the query; the error is returned from it
    Fail(ExError),
}

/// How a query that did not fail ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    /// Every matching row was visited
    Completed,
    /// The visitor returned `RowFlow::Stop`
    Stopped,
}

/// Index entry written when a deck is persisted
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtifactRecord {
    pub rid: Rid,
    pub uuid: String,
    pub artifact_type: ArtifactType,
    pub time: Option<Timestamp>,
    pub user: Option<String>,
    pub comment: Option<String>,
}

impl ArtifactRecord {
    pub fn from_deck(deck: &Deck, rid: Rid, uuid: impl Into<String>) -> Self {
        Self {
            rid,
            uuid: uuid.into(),
            artifact_type: deck.artifact_type(),
            time: deck.date(),
            user: deck.user().map(str::to_string),
            comment: deck.comment().map(str::to_string),
        }
    }
}

/// Selection over the metadata index
///
/// Matching records are visited newest first (time descending, records
/// without a time last, ties broken by higher rid first).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArtifactFilter {
    pub artifact_type: Option<ArtifactType>,
    pub user: Option<String>,
    pub limit: Option<usize>,
}

impl ArtifactFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn of_type(mut self, artifact_type: ArtifactType) -> Self {
        self.artifact_type = Some(artifact_type);
        self
    }

    pub fn by_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, record: &ArtifactRecord) -> bool {
        self.artifact_type
            .map_or(true, |t| t == record.artifact_type)
            && self
                .user
                .as_deref()
                .map_or(true, |u| record.user.as_deref() == Some(u))
    }
}

/// Index order: newest first, undated last, then higher rid first
pub fn newest_first(a: &ArtifactRecord, b: &ArtifactRecord) -> Ordering {
    b.time.cmp(&a.time).then_with(|| b.rid.cmp(&a.rid))
}

/// Syntactic classification of a reference string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceForm<'a> {
    /// `rid:<n>`
    Rid(Rid),
    /// `tip`: the most recent check-in
    Tip,
    /// A full-length hash
    Hash(&'a str),
    /// Something that could be an abbreviated hash; falls back to a name
    /// when no hash matches
    Prefix(&'a str),
    /// A symbolic name
    Name(&'a str),
}

pub fn parse_reference(reference: &str) -> ReferenceForm<'_> {
    if let Some(n) = reference.strip_prefix("rid:") {
        if let Ok(rid) = n.parse::<i64>() {
            if rid > 0 {
                return ReferenceForm::Rid(Rid(rid));
            }
        }
    }
    if reference == "tip" {
        return ReferenceForm::Tip;
    }
    if reference.len() == HASH_LEN && is_hash_prefix(reference) {
        return ReferenceForm::Hash(reference);
    }
    if is_hash_prefix(reference) {
        return ReferenceForm::Prefix(reference);
    }
    ReferenceForm::Name(reference)
}

/// Storage operations consumed by decks
pub trait PersistenceGateway: Transactional {
    /// Resolve a reference (see [`ReferenceForm`]) to a rid
    ///
    /// # Errors
    ///
    /// `NotFound` if a hash prefix matches more than one artifact; an
    /// unknown reference is `Ok(None)`.
    fn resolve(&self, reference: &str) -> Result<Option<Rid>>;

    /// Stored bytes of `rid`
    ///
    /// # Errors
    ///
    /// `NotFound` if nothing is stored under `rid`.
    fn get_content(&self, rid: Rid) -> Result<Vec<u8>>;

    /// Content hash of `rid`
    fn hash_of(&self, rid: Rid) -> Result<String>;

    /// Whether `rid` was stored as private content
    fn is_private(&self, rid: Rid) -> Result<bool>;

    /// Store `content` under its hash; storing identical bytes again
    /// returns the existing `(rid, uuid)`
    ///
    /// # Errors
    ///
    /// - `Misuse` outside a transaction
    /// - `Storage` on an engine failure or a hash collision
    fn put_content(&mut self, content: &[u8], is_private: bool) -> Result<(Rid, String)>;

    /// Insert or replace the index entry for `record.rid`
    fn record_artifact(&mut self, record: &ArtifactRecord) -> Result<()>;

    /// Point `name` at `rid`, or remove it when `rid` is `None`
    fn set_symbolic_name(&mut self, name: &str, rid: Option<Rid>) -> Result<()>;

    /// Visit index entries matching `filter` in index order
    fn for_each_artifact(
        &self,
        filter: &ArtifactFilter,
        visitor: &mut dyn FnMut(&ArtifactRecord) -> RowFlow,
    ) -> Result<QueryStatus>;

    /// Matching index entries, in index order
    fn collect_artifacts(&self, filter: &ArtifactFilter) -> Result<Vec<ArtifactRecord>> {
        let mut out = Vec::new();
        self.for_each_artifact(filter, &mut |record| {
            out.push(record.clone());
            RowFlow::Continue
        })?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(rid: i64, millis: Option<i64>) -> ArtifactRecord {
        ArtifactRecord {
            rid: Rid(rid),
            uuid: format!("{:064x}", rid),
            artifact_type: ArtifactType::Checkin,
            time: millis.map(Timestamp::from_unix_millis),
            user: Some("alice".into()),
            comment: None,
        }
    }

    #[test]
    fn test_parse_reference_forms() {
        let full = "a".repeat(64);
        assert_eq!(parse_reference("rid:12"), ReferenceForm::Rid(Rid(12)));
        assert_eq!(parse_reference("tip"), ReferenceForm::Tip);
        assert_eq!(parse_reference(&full), ReferenceForm::Hash(&full));
        assert_eq!(parse_reference("abcd12"), ReferenceForm::Prefix("abcd12"));
        assert_eq!(parse_reference("trunk"), ReferenceForm::Name("trunk"));
        assert_eq!(parse_reference("rid:0"), ReferenceForm::Name("rid:0"));
        assert_eq!(parse_reference("abc"), ReferenceForm::Name("abc"));
    }

    #[test]
    fn test_sha1_length_reference_is_prefix() {
        let short = "b".repeat(40);
        assert_eq!(parse_reference(&short), ReferenceForm::Prefix(&short));
    }

    #[test]
    fn test_newest_first_order() {
        let mut records = vec![
            record(1, Some(100)),
            record(2, None),
            record(3, Some(100)),
            record(4, Some(200)),
        ];
        records.sort_by(newest_first);
        let rids: Vec<i64> = records.iter().map(|r| r.rid.0).collect();
        assert_eq!(rids, vec![4, 3, 1, 2]);
    }

    #[test]
    fn test_filter_matches() {
        let r = record(1, Some(1));
        assert!(ArtifactFilter::all().matches(&r));
        assert!(ArtifactFilter::all().of_type(ArtifactType::Checkin).matches(&r));
        assert!(!ArtifactFilter::all().of_type(ArtifactType::Wiki).matches(&r));
        assert!(!ArtifactFilter::all().by_user("bob").matches(&r));
    }

    #[test]
    fn test_record_serializes_to_json() {
        let value = serde_json::to_value(record(7, Some(0))).unwrap();
        assert_eq!(value["rid"], 7);
        assert_eq!(value["artifact_type"], "checkin");
        assert_eq!(value["time"], "1970-01-01T00:00:00.000");
        assert_eq!(value["user"], "alice");
        assert!(value["comment"].is_null());
    }
}
