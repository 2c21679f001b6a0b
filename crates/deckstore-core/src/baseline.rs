//! Delta manifest reconstruction
//!
//! A check-in with a B card lists only the files that changed against its
//! baseline (a deleted file appears as a tombstone). The effective file list
//! is a merge-join of the two name-sorted lists in which the delta's entry
//! wins whenever both name the same file. Baselines are one level deep: a
//! baseline that is itself a delta is rejected.

use std::cmp::Ordering;
use std::iter::FusedIterator;

use crate::deck::Deck;
use crate::errors::{DeckError, Result};
use crate::gateway::PersistenceGateway;
use crate::model::{ArtifactType, FileCard};

impl Deck {
    /// The cached baseline, if it has been resolved
    pub fn baseline(&self) -> Option<&Deck> {
        self.baseline.as_deref()
    }

    /// Load and cache the baseline named by the B card
    ///
    /// Returns `None` for a deck without a B card. The baseline is loaded
    /// at most once until the B card changes or the deck is reset.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the B card does not resolve
    /// - `Corrupt` if the baseline is not a check-in or is itself a delta
    /// - any other load failure, unchanged
    pub fn resolve_baseline<G: PersistenceGateway + ?Sized>(
        &mut self,
        gw: &G,
    ) -> Result<Option<&Deck>> {
        let Some(uuid) = self.baseline_uuid().map(str::to_string) else {
            return Ok(None);
        };
        if self.baseline.is_none() {
            let base = Deck::load_new(gw, &uuid, None)?;
            if base.artifact_type() != ArtifactType::Checkin {
                return Err(DeckError::BaselineChain {
                    baseline: uuid,
                    reason: format!("baseline is a {} artifact", base.artifact_type()),
                }
                .into());
            }
            if base.is_delta() {
                return Err(DeckError::BaselineChain {
                    baseline: uuid,
                    reason: "baseline is itself a delta".to_string(),
                }
                .into());
            }
            tracing::debug!(
                baseline = uuid.as_str(),
                file_count = base.own_files().len(),
                "baseline resolved"
            );
            self.baseline = Some(Box::new(base));
        }
        Ok(self.baseline.as_deref())
    }

    /// The effective file list, resolving the baseline first if needed
    ///
    /// Each call starts a fresh traversal. Deleted files are hidden unless
    /// `include_deleted`.
    pub fn file_list<'a, G: PersistenceGateway + ?Sized>(
        &'a mut self,
        gw: &G,
        include_deleted: bool,
    ) -> Result<FileList<'a>> {
        self.resolve_baseline(gw)?;
        let base = self.baseline.as_deref().map_or(&[][..], Deck::own_files);
        Ok(merge_file_lists(self.own_files(), base, include_deleted))
    }

    /// Effective entry for one file name; a deleted file is `None`
    pub fn find_file<G: PersistenceGateway + ?Sized>(
        &mut self,
        gw: &G,
        name: &str,
    ) -> Result<Option<&FileCard>> {
        self.resolve_baseline(gw)?;
        if let Ok(i) = search(self.own_files(), name) {
            let own = &self.own_files()[i];
            return Ok((!own.is_tombstone()).then_some(own));
        }
        let Some(base) = self.baseline.as_deref() else {
            return Ok(None);
        };
        Ok(search(base.own_files(), name)
            .ok()
            .map(|i| &base.own_files()[i]))
    }
}

fn search(files: &[FileCard], name: &str) -> std::result::Result<usize, usize> {
    files.binary_search_by(|f| f.name.as_str().cmp(name))
}

/// Merge-join `own` (the delta's entries) over `base`
///
/// Both inputs must be strictly ascending by name.
pub fn merge_file_lists<'a>(
    own: &'a [FileCard],
    base: &'a [FileCard],
    include_deleted: bool,
) -> FileList<'a> {
    FileList {
        own,
        base,
        i: 0,
        j: 0,
        include_deleted,
    }
}

/// Lazy, forward-only merge of a delta's files over its baseline's
#[derive(Debug, Clone)]
pub struct FileList<'a> {
    own: &'a [FileCard],
    base: &'a [FileCard],
    i: usize,
    j: usize,
    include_deleted: bool,
}

impl<'a> Iterator for FileList<'a> {
    type Item = &'a FileCard;

    fn next(&mut self) -> Option<&'a FileCard> {
        loop {
            let next = match (self.own.get(self.i), self.base.get(self.j)) {
                (None, None) => return None,
                (Some(own), None) => {
                    self.i += 1;
                    own
                }
                (None, Some(base)) => {
                    self.j += 1;
                    base
                }
                (Some(own), Some(base)) => match own.name.as_str().cmp(base.name.as_str()) {
                    Ordering::Less => {
                        self.i += 1;
                        own
                    }
                    Ordering::Greater => {
                        self.j += 1;
                        base
                    }
                    Ordering::Equal => {
                        self.i += 1;
                        self.j += 1;
                        own
                    }
                },
            };
            if self.include_deleted || !next.is_tombstone() {
                return Some(next);
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let own = self.own.len() - self.i;
        let base = self.base.len() - self.j;
        (0, Some(own + base))
    }
}

impl FusedIterator for FileList<'_> {}
