//! Card-by-card construction with local validation
//!
//! Every add goes through [`Deck::push_card`], which checks the card against
//! the deck's type and its own well-formedness before touching any slot. A
//! rejected card leaves the deck unchanged.

use super::Deck;
use crate::errors::{DeckError, ExError, Result};
use crate::model::hash::is_valid_hash;
use crate::model::{
    ArtifactType, AttachmentCard, Card, CherryPick, EventCard, FileCard, Permission, TagCard,
    TagKind, TagTarget, TicketField, Timestamp,
};
use crate::rules;

impl Deck {
    /// Add one card, overwriting singletons and inserting repeatables in
    /// canonical position
    ///
    /// # Errors
    ///
    /// - `UnsupportedCard` if the letter is not legal for the deck's type
    /// - `Syntax` if the card is locally malformed (bad hash, empty name,
    ///   duplicate file, misplaced tag target)
    pub fn add_card(&mut self, card: Card) -> Result<()> {
        self.push_card(card)
            .map_err(|e| ExError::from(e).with_op("add_card"))
    }

    pub(crate) fn push_card(&mut self, card: Card) -> std::result::Result<(), DeckError> {
        let letter = card.letter();
        if !rules::is_legal(self.artifact_type, letter) {
            return Err(DeckError::UnsupportedCard {
                card: letter,
                artifact_type: self.artifact_type,
            });
        }

        match card {
            Card::A(a) => {
                non_empty('A', &a.filename, "filename")?;
                non_empty('A', &a.target, "target")?;
                if let Some(source) = &a.source {
                    hash('A', source)?;
                }
                self.attachment = Some(a);
            }
            Card::B(uuid) => {
                hash('B', &uuid)?;
                if self.baseline_uuid.as_deref() != Some(uuid.as_str()) {
                    self.baseline = None;
                }
                self.baseline_uuid = Some(uuid);
            }
            Card::C(comment) => self.comment = Some(comment),
            Card::D(ts) => {
                representable('D', ts)?;
                self.date = Some(ts);
            }
            Card::E(e) => {
                representable('E', e.time)?;
                hash('E', &e.id)?;
                self.event = Some(e);
            }
            Card::F(f) => self.insert_file(f)?,
            Card::J(j) => {
                non_empty('J', &j.key, "key")?;
                if j.key.starts_with('+') {
                    return Err(invalid('J', "key may not start with +"));
                }
                let at = self
                    .ticket_fields
                    .partition_point(|existing| existing.key <= j.key);
                self.ticket_fields.insert(at, j);
            }
            Card::K(id) => {
                hash('K', &id)?;
                self.ticket_id = Some(id);
            }
            Card::L(title) => {
                non_empty('L', &title, "title")?;
                self.title = Some(title);
            }
            Card::M(uuid) => {
                hash('M', &uuid)?;
                match self.cluster_members.binary_search(&uuid) {
                    Ok(_) => return Err(invalid('M', format!("duplicate member {}", uuid))),
                    Err(at) => self.cluster_members.insert(at, uuid),
                }
            }
            Card::N(mimetype) => {
                non_empty('N', &mimetype, "mimetype")?;
                self.mimetype = Some(mimetype);
            }
            Card::P(parents) => {
                if parents.is_empty() {
                    return Err(invalid('P', "no parents given"));
                }
                for (i, parent) in parents.iter().enumerate() {
                    hash('P', parent)?;
                    if self.parents.contains(parent) || parents[..i].contains(parent) {
                        return Err(invalid('P', format!("duplicate parent {}", parent)));
                    }
                }
                self.parents.extend(parents);
            }
            Card::Q(q) => {
                hash('Q', &q.target)?;
                if let Some(baseline) = &q.baseline {
                    hash('Q', baseline)?;
                }
                match self
                    .cherry_picks
                    .binary_search_by(|existing| existing.target.cmp(&q.target))
                {
                    Ok(_) => return Err(invalid('Q', format!("duplicate target {}", q.target))),
                    Err(at) => self.cherry_picks.insert(at, q),
                }
            }
            Card::T(t) => self.insert_tag(t)?,
            Card::U(user) => {
                non_empty('U', &user, "user")?;
                self.user = Some(user);
            }
            Card::W(content) => self.content = Some(content),
            Card::Z(_) => {
                return Err(invalid('Z', "the self-hash is produced by serialization"));
            }
        }

        self.self_hash = None;
        Ok(())
    }

    fn insert_file(&mut self, file: FileCard) -> std::result::Result<(), DeckError> {
        non_empty('F', &file.name, "name")?;
        if file.is_tombstone() {
            if file.permission != Permission::Regular || file.prior_name.is_some() {
                return Err(invalid('F', "a deleted file carries only its name"));
            }
        } else {
            hash('F', &file.uuid)?;
        }
        if let Some(prior) = &file.prior_name {
            non_empty('F', prior, "prior name")?;
        }

        match self
            .files
            .binary_search_by(|existing| existing.name.as_str().cmp(file.name.as_str()))
        {
            Ok(_) => Err(DeckError::DuplicateFile { name: file.name }),
            Err(at) => {
                self.files.insert(at, file);
                Ok(())
            }
        }
    }

    fn insert_tag(&mut self, tag: TagCard) -> std::result::Result<(), DeckError> {
        non_empty('T', &tag.name, "name")?;
        match (&tag.target, self.artifact_type) {
            (TagTarget::SelfArtifact, ArtifactType::Control) => {
                return Err(invalid('T', "control tags must name their target"));
            }
            (TagTarget::Artifact(_), ArtifactType::Checkin | ArtifactType::Event) => {
                return Err(invalid('T', "tags here may only target this artifact (*)"));
            }
            (TagTarget::Artifact(uuid), _) => hash('T', uuid)?,
            (TagTarget::SelfArtifact, _) => {}
        }
        if tag.kind == TagKind::Cancel && tag.value.is_some() {
            return Err(invalid('T', "a cancel tag carries no value"));
        }

        match self
            .tags
            .binary_search_by(|existing| existing.sort_key().cmp(&tag.sort_key()))
        {
            Ok(_) => Err(invalid(
                'T',
                format!("duplicate tag {} on {}", tag.name, tag.target.as_card_text()),
            )),
            Err(at) => {
                self.tags.insert(at, tag);
                Ok(())
            }
        }
    }

    /// Deleted-file entries are only meaningful against a baseline
    pub(crate) fn check_tombstones(&self) -> std::result::Result<(), DeckError> {
        if self.baseline_uuid.is_some() {
            return Ok(());
        }
        match self.files.iter().find(|f| f.is_tombstone()) {
            Some(f) => Err(DeckError::TombstoneWithoutBaseline {
                name: f.name.clone(),
            }),
            None => Ok(()),
        }
    }

    // ===== Convenience setters =====

    pub fn set_attachment(
        &mut self,
        filename: impl Into<String>,
        target: impl Into<String>,
        source: Option<String>,
    ) -> Result<()> {
        self.add_card(Card::A(AttachmentCard {
            filename: filename.into(),
            target: target.into(),
            source,
        }))
    }

    /// Make this a delta manifest against `uuid`
    pub fn set_baseline(&mut self, uuid: impl Into<String>) -> Result<()> {
        self.add_card(Card::B(uuid.into()))
    }

    pub fn set_comment(&mut self, comment: impl Into<String>) -> Result<()> {
        self.add_card(Card::C(comment.into()))
    }

    pub fn set_date(&mut self, date: Timestamp) -> Result<()> {
        self.add_card(Card::D(date))
    }

    pub fn set_event(&mut self, time: Timestamp, id: impl Into<String>) -> Result<()> {
        self.add_card(Card::E(EventCard {
            time,
            id: id.into(),
        }))
    }

    pub fn add_file(&mut self, file: FileCard) -> Result<()> {
        self.add_card(Card::F(file))
    }

    /// Set a ticket field, replacing its previous value
    pub fn add_ticket_field(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<()> {
        self.add_card(Card::J(TicketField {
            append: false,
            key: key.into(),
            value: value.into(),
        }))
    }

    /// Append to a ticket field's previous value
    pub fn append_ticket_field(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<()> {
        self.add_card(Card::J(TicketField {
            append: true,
            key: key.into(),
            value: value.into(),
        }))
    }

    pub fn set_ticket_id(&mut self, id: impl Into<String>) -> Result<()> {
        self.add_card(Card::K(id.into()))
    }

    pub fn set_title(&mut self, title: impl Into<String>) -> Result<()> {
        self.add_card(Card::L(title.into()))
    }

    pub fn add_cluster_member(&mut self, uuid: impl Into<String>) -> Result<()> {
        self.add_card(Card::M(uuid.into()))
    }

    pub fn set_mimetype(&mut self, mimetype: impl Into<String>) -> Result<()> {
        self.add_card(Card::N(mimetype.into()))
    }

    /// Append a parent; the first one added is the primary parent
    pub fn add_parent(&mut self, uuid: impl Into<String>) -> Result<()> {
        self.add_card(Card::P(vec![uuid.into()]))
    }

    pub fn add_cherry_pick(&mut self, pick: CherryPick) -> Result<()> {
        self.add_card(Card::Q(pick))
    }

    pub fn add_tag(&mut self, tag: TagCard) -> Result<()> {
        self.add_card(Card::T(tag))
    }

    pub fn set_user(&mut self, user: impl Into<String>) -> Result<()> {
        self.add_card(Card::U(user.into()))
    }

    pub fn set_content(&mut self, content: impl Into<Vec<u8>>) -> Result<()> {
        self.add_card(Card::W(content.into()))
    }
}

fn invalid(card: char, reason: impl Into<String>) -> DeckError {
    DeckError::InvalidCard {
        card,
        reason: reason.into(),
    }
}

fn non_empty(card: char, value: &str, what: &str) -> std::result::Result<(), DeckError> {
    if value.is_empty() {
        Err(invalid(card, format!("empty {}", what)))
    } else {
        Ok(())
    }
}

fn representable(card: char, ts: Timestamp) -> std::result::Result<(), DeckError> {
    if ts.is_card_representable() {
        Ok(())
    } else {
        Err(invalid(card, "timestamp outside years 0000-9999"))
    }
}

fn hash(card: char, value: &str) -> std::result::Result<(), DeckError> {
    if is_valid_hash(value) {
        Ok(())
    } else {
        Err(invalid(card, format!("invalid hash {:?}", value)))
    }
}
