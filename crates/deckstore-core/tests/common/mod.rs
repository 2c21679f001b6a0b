//! Shared fixtures for deckstore-core integration tests

use deckstore_core::{ArtifactType, Deck, FileCard, MemoryGateway, Timestamp};

/// A syntactically valid hash made of one repeated hex digit
#[allow(dead_code)]
pub fn h(c: char) -> String {
    c.to_string().repeat(64)
}

/// A complete, non-delta check-in
#[allow(dead_code)]
pub fn checkin(comment: &str, millis: i64) -> Deck {
    let mut deck = Deck::new(ArtifactType::Checkin);
    deck.set_comment(comment).unwrap();
    deck.set_date(Timestamp::from_unix_millis(millis)).unwrap();
    deck.set_user("alice").unwrap();
    deck
}

/// Persist a baseline with files `a`, `b`, `c` and return its uuid
#[allow(dead_code)]
pub fn persist_abc_baseline(gw: &mut MemoryGateway) -> String {
    let mut base = checkin("baseline", 1_000);
    base.add_file(FileCard::new("a", h('1'))).unwrap();
    base.add_file(FileCard::new("b", h('2'))).unwrap();
    base.add_file(FileCard::new("c", h('3'))).unwrap();
    base.persist(gw, false).unwrap().1
}
