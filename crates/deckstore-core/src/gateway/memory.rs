//! In-memory gateway
//!
//! Holds everything in ordinary collections. A physical transaction is a
//! snapshot of the whole state taken at begin and restored on rollback.

use std::collections::{BTreeMap, HashMap, HashSet};

use super::{
    newest_first, parse_reference, ArtifactFilter, ArtifactRecord, PersistenceGateway,
    QueryStatus, ReferenceForm, RowFlow,
};
use crate::errors::{DeckError, ExError, ExErrorKind, Result};
use crate::model::hash::content_hash;
use crate::model::{ArtifactType, Rid};
use crate::transaction::{TransactionDepth, Transactional};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    blobs: HashMap<Rid, Vec<u8>>,
    uuids: HashMap<Rid, String>,
    /// Ordered so prefix lookups are a range scan
    by_hash: BTreeMap<String, Rid>,
    private: HashSet<Rid>,
    artifacts: BTreeMap<Rid, ArtifactRecord>,
    names: HashMap<String, Rid>,
    last_rid: i64,
}

/// Gateway over process memory, used by tests and tools that need no disk
#[derive(Debug, Default)]
pub struct MemoryGateway {
    state: MemoryState,
    snapshot: Option<MemoryState>,
    depth: TransactionDepth,
    fail_next_put: bool,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `put_content` fail with a storage error
    pub fn fail_next_put(&mut self) {
        self.fail_next_put = true;
    }

    pub fn blob_count(&self) -> usize {
        self.state.blobs.len()
    }

    pub fn artifact_count(&self) -> usize {
        self.state.artifacts.len()
    }

    fn resolve_prefix(&self, prefix: &str) -> Result<Option<Rid>> {
        let mut matches = self
            .state
            .by_hash
            .range(prefix.to_string()..)
            .take_while(|(hash, _)| hash.starts_with(prefix))
            .map(|(_, rid)| *rid);
        match (matches.next(), matches.next()) {
            (Some(rid), None) => Ok(Some(rid)),
            (Some(_), Some(_)) => Err(DeckError::AmbiguousReference {
                reference: prefix.to_string(),
            }
            .into()),
            (None, _) => Ok(self.state.names.get(prefix).copied()),
        }
    }

    fn tip(&self) -> Option<Rid> {
        self.state
            .artifacts
            .values()
            .filter(|r| r.artifact_type == ArtifactType::Checkin)
            .min_by(|a, b| newest_first(a, b))
            .map(|r| r.rid)
    }
}

fn not_found(rid: Rid) -> ExError {
    DeckError::ArtifactNotFound {
        reference: rid.to_string(),
    }
    .into()
}

impl Transactional for MemoryGateway {
    fn depth(&self) -> &TransactionDepth {
        &self.depth
    }

    fn depth_mut(&mut self) -> &mut TransactionDepth {
        &mut self.depth
    }

    fn begin_physical(&mut self) -> Result<()> {
        self.snapshot = Some(self.state.clone());
        Ok(())
    }

    fn commit_physical(&mut self) -> Result<()> {
        self.snapshot = None;
        Ok(())
    }

    fn rollback_physical(&mut self) -> Result<()> {
        if let Some(snapshot) = self.snapshot.take() {
            self.state = snapshot;
        }
        Ok(())
    }
}

impl PersistenceGateway for MemoryGateway {
    fn resolve(&self, reference: &str) -> Result<Option<Rid>> {
        match parse_reference(reference) {
            ReferenceForm::Rid(rid) => Ok(self.state.blobs.contains_key(&rid).then_some(rid)),
            ReferenceForm::Tip => Ok(self.tip()),
            ReferenceForm::Hash(hash) => Ok(self.state.by_hash.get(hash).copied()),
            ReferenceForm::Prefix(prefix) => self.resolve_prefix(prefix),
            ReferenceForm::Name(name) => Ok(self.state.names.get(name).copied()),
        }
    }

    fn get_content(&self, rid: Rid) -> Result<Vec<u8>> {
        self.state
            .blobs
            .get(&rid)
            .cloned()
            .ok_or_else(|| not_found(rid))
    }

    fn hash_of(&self, rid: Rid) -> Result<String> {
        self.state
            .uuids
            .get(&rid)
            .cloned()
            .ok_or_else(|| not_found(rid))
    }

    fn is_private(&self, rid: Rid) -> Result<bool> {
        if !self.state.blobs.contains_key(&rid) {
            return Err(not_found(rid));
        }
        Ok(self.state.private.contains(&rid))
    }

    fn put_content(&mut self, content: &[u8], is_private: bool) -> Result<(Rid, String)> {
        self.require_transaction("put_content")?;
        if std::mem::take(&mut self.fail_next_put) {
            return Err(ExError::new(ExErrorKind::Storage)
                .with_op("put_content")
                .with_message("injected storage failure"));
        }

        let uuid = content_hash(content);
        if let Some(rid) = self.state.by_hash.get(&uuid).copied() {
            if self.state.blobs.get(&rid).map(Vec::as_slice) != Some(content) {
                return Err(DeckError::ContentCollision { uuid }.into());
            }
            return Ok((rid, uuid));
        }

        self.state.last_rid += 1;
        let rid = Rid(self.state.last_rid);
        self.state.blobs.insert(rid, content.to_vec());
        self.state.uuids.insert(rid, uuid.clone());
        self.state.by_hash.insert(uuid.clone(), rid);
        if is_private {
            self.state.private.insert(rid);
        }
        Ok((rid, uuid))
    }

    fn record_artifact(&mut self, record: &ArtifactRecord) -> Result<()> {
        self.require_transaction("record_artifact")?;
        if !self.state.blobs.contains_key(&record.rid) {
            return Err(not_found(record.rid));
        }
        self.state.artifacts.insert(record.rid, record.clone());
        Ok(())
    }

    fn set_symbolic_name(&mut self, name: &str, rid: Option<Rid>) -> Result<()> {
        self.require_transaction("set_symbolic_name")?;
        match rid {
            Some(rid) => {
                self.state.names.insert(name.to_string(), rid);
            }
            None => {
                self.state.names.remove(name);
            }
        }
        Ok(())
    }

    fn for_each_artifact(
        &self,
        filter: &ArtifactFilter,
        visitor: &mut dyn FnMut(&ArtifactRecord) -> RowFlow,
    ) -> Result<QueryStatus> {
        let mut rows: Vec<&ArtifactRecord> = self
            .state
            .artifacts
            .values()
            .filter(|r| filter.matches(r))
            .collect();
        rows.sort_by(|a, b| newest_first(a, b));

        for record in rows.into_iter().take(filter.limit.unwrap_or(usize::MAX)) {
            match visitor(record) {
                RowFlow::Continue => {}
                RowFlow::Stop => return Ok(QueryStatus::Stopped),
                RowFlow::Fail(err) => return Err(err),
            }
        }
        Ok(QueryStatus::Completed)
    }
}
