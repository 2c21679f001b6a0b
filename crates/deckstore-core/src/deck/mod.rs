//! Deck - in-memory form of one artifact
//!
//! A deck is built card by card ([`builder`]) or loaded from the store
//! ([`lifecycle`]), never both at once. Cards live in typed slots; the
//! canonical card sequence is produced on demand by [`Deck::cards`].

pub mod builder;
pub mod lifecycle;

use crate::model::{
    ArtifactType, AttachmentCard, Card, CherryPick, EventCard, FileCard, Rid, TagCard,
    TicketField, Timestamp,
};

/// One artifact: its type, identity once persisted or loaded, and cards
#[derive(Debug, Clone)]
pub struct Deck {
    artifact_type: ArtifactType,
    rid: Rid,
    uuid: String,

    attachment: Option<AttachmentCard>,
    baseline_uuid: Option<String>,
    comment: Option<String>,
    date: Option<Timestamp>,
    event: Option<EventCard>,
    /// Sorted by name, no duplicates
    files: Vec<FileCard>,
    /// Sorted by key, stable among equal keys
    ticket_fields: Vec<TicketField>,
    ticket_id: Option<String>,
    title: Option<String>,
    /// Sorted, no duplicates
    cluster_members: Vec<String>,
    mimetype: Option<String>,
    /// Primary parent first
    parents: Vec<String>,
    /// Sorted by target
    cherry_picks: Vec<CherryPick>,
    /// Sorted by (name, target)
    tags: Vec<TagCard>,
    user: Option<String>,
    content: Option<Vec<u8>>,
    self_hash: Option<String>,

    /// Lazily loaded baseline of a delta manifest; owned, never shared
    pub(crate) baseline: Option<Box<Deck>>,
}

impl Deck {
    /// An empty deck of the given type
    pub fn new(artifact_type: ArtifactType) -> Self {
        Self {
            artifact_type,
            rid: Rid::NONE,
            uuid: String::new(),
            attachment: None,
            baseline_uuid: None,
            comment: None,
            date: None,
            event: None,
            files: Vec::new(),
            ticket_fields: Vec::new(),
            ticket_id: None,
            title: None,
            cluster_members: Vec::new(),
            mimetype: None,
            parents: Vec::new(),
            cherry_picks: Vec::new(),
            tags: Vec::new(),
            user: None,
            content: None,
            self_hash: None,
            baseline: None,
        }
    }

    /// Drop every card, the identity and the cached baseline. The type is
    /// kept.
    pub fn reset(&mut self) {
        *self = Deck::new(self.artifact_type);
    }

    pub fn artifact_type(&self) -> ArtifactType {
        self.artifact_type
    }

    /// Store id; `Rid::NONE` until persisted or loaded
    pub fn rid(&self) -> Rid {
        self.rid
    }

    /// Content hash; empty until persisted or loaded
    pub fn uuid(&self) -> &str {
        &self.uuid
    }

    pub fn attachment(&self) -> Option<&AttachmentCard> {
        self.attachment.as_ref()
    }

    /// B card: hash of the baseline manifest
    pub fn baseline_uuid(&self) -> Option<&str> {
        self.baseline_uuid.as_deref()
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn date(&self) -> Option<Timestamp> {
        self.date
    }

    pub fn event(&self) -> Option<&EventCard> {
        self.event.as_ref()
    }

    /// The deck's own F cards, without baseline resolution
    pub fn own_files(&self) -> &[FileCard] {
        &self.files
    }

    pub fn ticket_fields(&self) -> &[TicketField] {
        &self.ticket_fields
    }

    pub fn ticket_id(&self) -> Option<&str> {
        self.ticket_id.as_deref()
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn cluster_members(&self) -> &[String] {
        &self.cluster_members
    }

    pub fn mimetype(&self) -> Option<&str> {
        self.mimetype.as_deref()
    }

    pub fn parents(&self) -> &[String] {
        &self.parents
    }

    pub fn cherry_picks(&self) -> &[CherryPick] {
        &self.cherry_picks
    }

    pub fn tags(&self) -> &[TagCard] {
        &self.tags
    }

    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    pub fn content(&self) -> Option<&[u8]> {
        self.content.as_deref()
    }

    /// Z card recorded at load or derived by `self_check`
    pub fn self_hash(&self) -> Option<&str> {
        self.self_hash.as_deref()
    }

    /// Whether a card with this letter is present
    pub fn has_card(&self, letter: char) -> bool {
        match letter {
            'A' => self.attachment.is_some(),
            'B' => self.baseline_uuid.is_some(),
            'C' => self.comment.is_some(),
            'D' => self.date.is_some(),
            'E' => self.event.is_some(),
            'F' => !self.files.is_empty(),
            'J' => !self.ticket_fields.is_empty(),
            'K' => self.ticket_id.is_some(),
            'L' => self.title.is_some(),
            'M' => !self.cluster_members.is_empty(),
            'N' => self.mimetype.is_some(),
            'P' => !self.parents.is_empty(),
            'Q' => !self.cherry_picks.is_empty(),
            'T' => !self.tags.is_empty(),
            'U' => self.user.is_some(),
            'W' => self.content.is_some(),
            'Z' => self.self_hash.is_some(),
            _ => false,
        }
    }

    /// Letters of the cards present, in canonical order (Z excluded)
    pub fn present_cards(&self) -> Vec<char> {
        "ABCDEFJKLMNPQTUW"
            .chars()
            .filter(|c| self.has_card(*c))
            .collect()
    }

    /// The canonical card sequence, Z excluded
    pub fn cards(&self) -> Vec<Card> {
        let mut cards = Vec::new();
        if let Some(a) = &self.attachment {
            cards.push(Card::A(a.clone()));
        }
        if let Some(b) = &self.baseline_uuid {
            cards.push(Card::B(b.clone()));
        }
        if let Some(c) = &self.comment {
            cards.push(Card::C(c.clone()));
        }
        if let Some(d) = self.date {
            cards.push(Card::D(d));
        }
        if let Some(e) = &self.event {
            cards.push(Card::E(e.clone()));
        }
        cards.extend(self.files.iter().cloned().map(Card::F));
        cards.extend(self.ticket_fields.iter().cloned().map(Card::J));
        if let Some(k) = &self.ticket_id {
            cards.push(Card::K(k.clone()));
        }
        if let Some(l) = &self.title {
            cards.push(Card::L(l.clone()));
        }
        cards.extend(self.cluster_members.iter().cloned().map(Card::M));
        if let Some(n) = &self.mimetype {
            cards.push(Card::N(n.clone()));
        }
        if !self.parents.is_empty() {
            cards.push(Card::P(self.parents.clone()));
        }
        cards.extend(self.cherry_picks.iter().cloned().map(Card::Q));
        cards.extend(self.tags.iter().cloned().map(Card::T));
        if let Some(u) = &self.user {
            cards.push(Card::U(u.clone()));
        }
        if let Some(w) = &self.content {
            cards.push(Card::W(w.clone()));
        }
        cards
    }

    /// A delta manifest carries a B card
    pub fn is_delta(&self) -> bool {
        self.baseline_uuid.is_some()
    }

    pub(crate) fn set_self_hash(&mut self, hash: Option<String>) {
        self.self_hash = hash;
    }

    /// Drop the rid and uuid but keep every card
    ///
    /// For a deck persisted inside a transaction that was later rolled
    /// back: its content was never stored, and after this it can be
    /// persisted again.
    pub fn clear_identity(&mut self) {
        self.rid = Rid::NONE;
        self.uuid.clear();
    }

    pub(crate) fn set_identity(&mut self, rid: Rid, uuid: String) {
        self.rid = rid;
        self.uuid = uuid;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_deck_is_empty() {
        let deck = Deck::new(ArtifactType::Checkin);
        assert_eq!(deck.rid(), Rid::NONE);
        assert!(deck.uuid().is_empty());
        assert!(deck.cards().is_empty());
        assert!(deck.present_cards().is_empty());
        assert!(!deck.is_delta());
    }

    #[test]
    fn test_reset_keeps_type() {
        let mut deck = Deck::new(ArtifactType::Wiki);
        deck.set_title("Home").unwrap();
        deck.reset();
        assert_eq!(deck.artifact_type(), ArtifactType::Wiki);
        assert!(!deck.has_card('L'));
    }

    #[test]
    fn test_cards_are_in_letter_order() {
        let mut deck = Deck::new(ArtifactType::Checkin);
        deck.set_user("alice").unwrap();
        deck.set_comment("first").unwrap();
        deck.set_date(Timestamp::from_unix_millis(0)).unwrap();
        let letters: Vec<char> = deck.cards().iter().map(|c| c.letter()).collect();
        assert_eq!(letters, vec!['C', 'D', 'U']);
    }
}
