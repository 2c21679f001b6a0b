mod common;

use common::{checkin, h, persist_abc_baseline};
use deckstore_core::model::{CherryPick, CherryPickKind};
use deckstore_core::{
    ArtifactType, Deck, ExErrorKind, FileCard, MemoryGateway, Permission, TagCard, TagKind,
    TagTarget, Timestamp,
};

fn date() -> Timestamp {
    Timestamp::from_unix_millis(1_650_000_000_123)
}

fn assert_round_trip(gw: &mut MemoryGateway, mut deck: Deck) -> Deck {
    let (_, uuid) = deck.persist(gw, false).unwrap();
    let loaded = Deck::load_new(gw, &uuid, Some(deck.artifact_type())).unwrap();
    assert_eq!(loaded.cards(), deck.cards());
    assert_eq!(loaded.uuid(), uuid);
    loaded
}

#[test]
fn test_checkin_with_every_card_round_trips() {
    let mut gw = MemoryGateway::new();
    let mut deck = checkin("release 1.0\nwith notes", 2_000);
    deck.add_file(FileCard::new("bin/run", h('1')).with_permission(Permission::Executable))
        .unwrap();
    deck.add_file(FileCard::new("link", h('2')).with_permission(Permission::Symlink))
        .unwrap();
    deck.add_file(FileCard::new("src/new name.rs", h('3')).with_prior_name("src/old.rs"))
        .unwrap();
    deck.add_parent(h('4')).unwrap();
    deck.add_parent(h('5')).unwrap();
    deck.add_cherry_pick(CherryPick {
        kind: CherryPickKind::Backout,
        target: h('6'),
        baseline: None,
    })
    .unwrap();
    deck.add_tag(TagCard::new(TagKind::Propagating, "branch", TagTarget::SelfArtifact).with_value("trunk"))
        .unwrap();
    deck.add_tag(TagCard::new(TagKind::Propagating, "sym-trunk", TagTarget::SelfArtifact))
        .unwrap();

    let loaded = assert_round_trip(&mut gw, deck);
    assert_eq!(loaded.parents(), &[h('4'), h('5')]);
    assert_eq!(loaded.comment(), Some("release 1.0\nwith notes"));
}

#[test]
fn test_other_types_round_trip() {
    let mut gw = MemoryGateway::new();

    let mut wiki = Deck::new(ArtifactType::Wiki);
    wiki.set_date(date()).unwrap();
    wiki.set_title("Home Page").unwrap();
    wiki.set_mimetype("text/x-markdown").unwrap();
    wiki.set_user("alice").unwrap();
    wiki.set_content(b"# Welcome\n\nline two\n".to_vec()).unwrap();
    let loaded = assert_round_trip(&mut gw, wiki);
    assert_eq!(loaded.content(), Some(&b"# Welcome\n\nline two\n"[..]));

    let mut ticket = Deck::new(ArtifactType::Ticket);
    ticket.set_date(date()).unwrap();
    ticket.add_ticket_field("status", "open").unwrap();
    ticket.append_ticket_field("comment", "first remark").unwrap();
    ticket.set_ticket_id(h('7')).unwrap();
    ticket.set_user("bob").unwrap();
    assert_round_trip(&mut gw, ticket);

    let mut attachment = Deck::new(ArtifactType::Attachment);
    attachment
        .set_attachment("diagram.png", "Home Page", Some(h('8')))
        .unwrap();
    attachment.set_date(date()).unwrap();
    assert_round_trip(&mut gw, attachment);

    let mut event = Deck::new(ArtifactType::Event);
    event.set_date(date()).unwrap();
    event.set_event(date(), h('9')).unwrap();
    event.set_content(b"launch".to_vec()).unwrap();
    assert_round_trip(&mut gw, event);

    let mut cluster = Deck::new(ArtifactType::Cluster);
    cluster.add_cluster_member(h('b')).unwrap();
    cluster.add_cluster_member(h('a')).unwrap();
    let loaded = assert_round_trip(&mut gw, cluster);
    assert_eq!(loaded.cluster_members(), &[h('a'), h('b')]);
}

#[test]
fn test_earliest_and_latest_times_round_trip() {
    let mut gw = MemoryGateway::new();

    let mut first = Deck::new(ArtifactType::Checkin);
    first.set_comment("start of the calendar").unwrap();
    first.set_date(Timestamp::MIN).unwrap();
    first.set_user("alice").unwrap();
    let loaded = assert_round_trip(&mut gw, first);
    assert_eq!(loaded.date(), Some(Timestamp::MIN));

    let mut last = Deck::new(ArtifactType::Event);
    last.set_date(Timestamp::MAX).unwrap();
    last.set_event(Timestamp::MAX, h('9')).unwrap();
    last.set_content(b"end of the calendar".to_vec()).unwrap();
    let loaded = assert_round_trip(&mut gw, last);
    assert_eq!(loaded.date(), Some(Timestamp::MAX));
}

#[test]
fn test_unstorable_time_never_reaches_the_store() {
    let mut gw = MemoryGateway::new();
    let mut deck = Deck::new(ArtifactType::Checkin);
    deck.set_comment("far future").unwrap();
    deck.set_user("alice").unwrap();
    let err = deck
        .set_date(Timestamp::from_unix_millis(i64::MAX / 2))
        .unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::Syntax);

    let err = deck.persist(&mut gw, false).unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::Syntax);
    assert_eq!(err.cards(), Some(&['D'][..]));
    assert_eq!(gw.blob_count(), 0);
}

#[test]
fn test_round_trip_preserves_resolved_file_list() {
    let mut gw = MemoryGateway::new();
    let base_uuid = persist_abc_baseline(&mut gw);

    let mut delta = checkin("delta", 3_000);
    delta.set_baseline(base_uuid).unwrap();
    delta.add_file(FileCard::new("b", h('5'))).unwrap();
    delta.add_file(FileCard::tombstone("c")).unwrap();
    delta.add_file(FileCard::new("d", h('4'))).unwrap();

    let expected: Vec<FileCard> = delta.file_list(&gw, true).unwrap().cloned().collect();
    let (_, uuid) = delta.persist(&mut gw, false).unwrap();

    let mut loaded = Deck::load_new(&gw, &uuid, None).unwrap();
    let actual: Vec<FileCard> = loaded.file_list(&gw, true).unwrap().cloned().collect();
    assert_eq!(actual, expected);
}

#[test]
fn test_reset_then_reload_matches_fresh_load() {
    let mut gw = MemoryGateway::new();
    let base_uuid = persist_abc_baseline(&mut gw);
    let mut delta = checkin("delta", 3_000);
    delta.set_baseline(base_uuid).unwrap();
    delta.add_file(FileCard::new("e", h('6'))).unwrap();
    let (_, uuid) = delta.persist(&mut gw, false).unwrap();

    let mut reused = Deck::load_new(&gw, &uuid, None).unwrap();
    reused.file_list(&gw, false).unwrap().count();
    assert!(reused.baseline().is_some());

    reused.reset();
    assert!(reused.baseline().is_none());
    assert!(reused.cards().is_empty());
    reused.load(&gw, &uuid, None).unwrap();

    let fresh = Deck::load_new(&gw, &uuid, None).unwrap();
    assert_eq!(reused.rid(), fresh.rid());
    assert_eq!(reused.uuid(), fresh.uuid());
    assert_eq!(reused.cards(), fresh.cards());
    assert_eq!(reused.self_hash(), fresh.self_hash());
    assert_eq!(reused.baseline().is_some(), fresh.baseline().is_some());
}

#[test]
fn test_failed_load_leaves_deck_reset() {
    let mut gw = MemoryGateway::new();
    let (_, uuid) = checkin("first", 1_000).persist(&mut gw, false).unwrap();
    let mut deck = Deck::load_new(&gw, &uuid, None).unwrap();

    let err = deck.load(&gw, &h('f'), None).unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::NotFound);
    assert!(deck.cards().is_empty());
    assert!(!deck.rid().is_assigned());
}

#[test]
fn test_render_matches_stored_text() {
    let mut gw = MemoryGateway::new();
    let mut deck = checkin("render me", 1_000);
    let (rid, _) = deck.persist(&mut gw, false).unwrap();

    let mut sink = Vec::new();
    deck.render(&mut sink).unwrap();
    assert_eq!(sink, deckstore_core::PersistenceGateway::get_content(&gw, rid).unwrap());

    let mut loaded = Deck::load_new(&gw, deck.uuid(), None).unwrap();
    let recorded = loaded.self_hash().map(str::to_string);
    assert_eq!(loaded.self_check(true).unwrap(), recorded.unwrap());
}
