//! Load, persist, render and self-check
//!
//! A deck gets its identity (rid and uuid) exactly once: when it is loaded,
//! or when a persist succeeds. `reset` clears it again.

use std::io::Write;
use std::time::Instant;

use super::Deck;
use crate::codec;
use crate::errors::{DeckError, ExError, ExErrorKind, Result};
use crate::gateway::{ArtifactRecord, PersistenceGateway};
use crate::model::hash::{content_hash, is_valid_hash};
use crate::model::{ArtifactType, Rid, TagKind, TagTarget};
use crate::rules;
use crate::transaction::{TransactionGuard, TxOutcome};
use crate::{log_op_end, log_op_error, log_op_start};

impl Deck {
    /// Replace this deck with the artifact `reference` names
    ///
    /// Prior state is discarded first, even if loading fails. When
    /// `expected` is given the loaded artifact must be of that type.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the reference does not resolve (or is an ambiguous
    ///   hash prefix)
    /// - `Corrupt` if the stored text does not parse or hash
    /// - `TypeMismatch` if the artifact is not of the expected type
    pub fn load<G: PersistenceGateway + ?Sized>(
        &mut self,
        gw: &G,
        reference: &str,
        expected: Option<ArtifactType>,
    ) -> Result<()> {
        let start = Instant::now();
        log_op_start!("load", reference = reference);

        match self.load_inner(gw, reference, expected) {
            Ok(()) => {
                log_op_end!(
                    "load",
                    duration_ms = start.elapsed().as_millis() as u64,
                    rid = self.rid.0,
                    artifact_type = self.artifact_type.as_str()
                );
                Ok(())
            }
            Err(err) => {
                let err = err.with_op("load");
                log_op_error!(
                    "load",
                    err.clone(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    reference = reference
                );
                Err(err)
            }
        }
    }

    /// Load into a fresh deck
    pub fn load_new<G: PersistenceGateway + ?Sized>(
        gw: &G,
        reference: &str,
        expected: Option<ArtifactType>,
    ) -> Result<Deck> {
        let mut deck = Deck::new(expected.unwrap_or(ArtifactType::Checkin));
        deck.load(gw, reference, expected)?;
        Ok(deck)
    }

    fn load_inner<G: PersistenceGateway + ?Sized>(
        &mut self,
        gw: &G,
        reference: &str,
        expected: Option<ArtifactType>,
    ) -> Result<()> {
        self.reset();

        let rid = gw.resolve(reference)?.ok_or_else(|| {
            ExError::from(DeckError::ArtifactNotFound {
                reference: reference.to_string(),
            })
        })?;
        let content = gw.get_content(rid)?;
        let uuid = gw.hash_of(rid)?;
        if content_hash(&content) != uuid {
            return Err(ExError::new(ExErrorKind::Corrupt)
                .with_artifact(uuid)
                .with_message("stored content does not match its hash"));
        }

        let mut parsed = codec::parse(&content).map_err(|e| e.with_artifact(uuid.clone()))?;
        if let Some(expected) = expected {
            if parsed.artifact_type != expected {
                return Err(ExError::from(DeckError::TypeMismatch {
                    expected,
                    actual: parsed.artifact_type,
                })
                .with_artifact(uuid));
            }
        }
        parsed.set_identity(rid, uuid);
        *self = parsed;
        Ok(())
    }

    /// Store this deck through `gw` and assign its identity
    ///
    /// Runs inside its own transaction level, so it joins whatever
    /// transaction the caller has open and any failure dooms it.
    ///
    /// Inside an enclosing transaction the identity is assigned as soon as
    /// this level commits. If the enclosing transaction is later rolled
    /// back, the deck still carries a rid and uuid for content that was
    /// never stored; call [`Deck::clear_identity`] before persisting it
    /// again.
    ///
    /// # Errors
    ///
    /// - `Misuse` if the deck already has an identity
    /// - `Syntax` if a required card is missing or a deleted file has no
    ///   baseline; nothing is stored and the rid stays unassigned
    /// - `NotFound`/`Corrupt` if a delta's baseline does not resolve
    /// - `Storage` on gateway failure
    pub fn persist<G: PersistenceGateway + ?Sized>(
        &mut self,
        gw: &mut G,
        is_private: bool,
    ) -> Result<(Rid, String)> {
        let start = Instant::now();
        log_op_start!(
            "persist",
            artifact_type = self.artifact_type.as_str(),
            tx_level = gw.current_level()
        );

        match self.persist_inner(gw, is_private) {
            Ok((rid, uuid)) => {
                log_op_end!(
                    "persist",
                    duration_ms = start.elapsed().as_millis() as u64,
                    rid = rid.0,
                    uuid = uuid.as_str()
                );
                Ok((rid, uuid))
            }
            Err(err) => {
                let err = err.with_op("persist");
                log_op_error!(
                    "persist",
                    err.clone(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    artifact_type = self.artifact_type.as_str()
                );
                Err(err)
            }
        }
    }

    fn persist_inner<G: PersistenceGateway + ?Sized>(
        &mut self,
        gw: &mut G,
        is_private: bool,
    ) -> Result<(Rid, String)> {
        // Checks run under the guard so a failure dooms any enclosing
        // transaction too.
        let mut guard = TransactionGuard::begin(gw)?;
        if self.rid.is_assigned() || !self.uuid.is_empty() {
            return Err(DeckError::AlreadyPersisted {
                uuid: self.uuid.clone(),
            }
            .into());
        }
        rules::validate(self)?;
        self.check_tombstones()?;
        self.resolve_baseline(&*guard)?;

        let content = codec::render_finalized(self);
        let (rid, uuid) = guard.put_content(&content, is_private)?;
        guard.record_artifact(&ArtifactRecord::from_deck(self, rid, uuid.clone()))?;
        self.apply_symbolic_names(&mut *guard, rid)?;

        if guard.commit()? == TxOutcome::RolledBack {
            return Err(ExError::new(ExErrorKind::Storage)
                .with_artifact(uuid)
                .with_message("transaction was rolled back"));
        }
        self.set_identity(rid, uuid.clone());
        Ok((rid, uuid))
    }

    /// Apply `sym-*` tags to the name table. Add and propagate point the
    /// name at the target; cancel removes it if it still points there.
    fn apply_symbolic_names<G: PersistenceGateway + ?Sized>(
        &self,
        gw: &mut G,
        self_rid: Rid,
    ) -> Result<()> {
        for tag in &self.tags {
            let Some(name) = tag.symbolic_name() else {
                continue;
            };
            let target = match &tag.target {
                TagTarget::SelfArtifact => self_rid,
                TagTarget::Artifact(uuid) => match gw.resolve(uuid)? {
                    Some(rid) => rid,
                    None => {
                        tracing::debug!(name, uuid = uuid.as_str(), "tag target not stored; skipped");
                        continue;
                    }
                },
            };
            match tag.kind {
                TagKind::Add | TagKind::Propagating => gw.set_symbolic_name(name, Some(target))?,
                TagKind::Cancel => {
                    if gw.resolve(name)? == Some(target) {
                        gw.set_symbolic_name(name, None)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Write the finalized card text (Z card included) to `sink`
    ///
    /// # Errors
    ///
    /// `Io` if the sink fails.
    pub fn render<W: Write + ?Sized>(&self, sink: &mut W) -> Result<()> {
        let text = codec::render_finalized(self);
        sink.write_all(&text).map_err(|e| {
            ExError::new(ExErrorKind::Io)
                .with_op("render")
                .with_message(e.to_string())
        })
    }

    /// Check or derive the Z card
    ///
    /// With a recorded Z its format is checked and, if `recompute_hash`,
    /// compared against a fresh hash of the current cards. Without one, it
    /// is derived and recorded. Returns the self-hash.
    ///
    /// # Errors
    ///
    /// `Corrupt` if the recorded Z is malformed or does not match.
    pub fn self_check(&mut self, recompute_hash: bool) -> Result<String> {
        match self.self_hash.clone() {
            Some(recorded) => {
                if !is_valid_hash(&recorded) {
                    return Err(DeckError::MalformedCard {
                        line: 0,
                        reason: "Z card is not a hash".to_string(),
                    }
                    .into());
                }
                if recompute_hash {
                    let computed = content_hash(&codec::render_body(self));
                    if computed != recorded {
                        return Err(DeckError::SelfHashMismatch { recorded, computed }.into());
                    }
                }
                Ok(recorded)
            }
            None => {
                let computed = content_hash(&codec::render_body(self));
                self.self_hash = Some(computed.clone());
                Ok(computed)
            }
        }
    }
}
