// SqliteStore as a PersistenceGateway

use std::collections::HashMap;

use deckstore_core::gateway::{ArtifactFilter, ArtifactRecord, PersistenceGateway, QueryStatus, RowFlow};
use deckstore_core::transaction::{with_transaction, Transactional, TxOutcome};
use deckstore_core::{ArtifactType, ExError, ExErrorKind, Rid, Timestamp};
use deckstore_store::{DbRole, SqliteStore, StoreConfig};

fn put(store: &mut SqliteStore, content: &[u8]) -> (Rid, String) {
    store.begin().unwrap();
    let stored = store.put_content(content, false).unwrap();
    assert_eq!(store.commit().unwrap(), TxOutcome::Committed);
    stored
}

fn record(
    store: &mut SqliteStore,
    content: &str,
    artifact_type: ArtifactType,
    millis: Option<i64>,
    user: &str,
) -> Rid {
    with_transaction(store, |s| {
        let (rid, uuid) = s.put_content(content.as_bytes(), false)?;
        s.record_artifact(&ArtifactRecord {
            rid,
            uuid,
            artifact_type,
            time: millis.map(Timestamp::from_unix_millis),
            user: Some(user.to_string()),
            comment: Some(content.to_string()),
        })?;
        Ok(rid)
    })
    .unwrap()
}

#[test]
fn test_put_content_is_idempotent() {
    let mut store = SqliteStore::open_in_memory().unwrap();
    let first = put(&mut store, b"hello");
    let second = put(&mut store, b"hello");
    assert_eq!(first, second);
    assert_eq!(store.get_content(first.0).unwrap(), b"hello");
    assert_eq!(store.hash_of(first.0).unwrap(), first.1);
    assert!(!store.is_private(first.0).unwrap());
}

#[test]
fn test_private_content() {
    let mut store = SqliteStore::open_in_memory().unwrap();
    store.begin().unwrap();
    let (rid, _) = store.put_content(b"secret", true).unwrap();
    store.commit().unwrap();
    assert!(store.is_private(rid).unwrap());
    assert_eq!(
        store.is_private(Rid(999)).unwrap_err().kind(),
        ExErrorKind::NotFound
    );
}

#[test]
fn test_resolve_forms() {
    let mut store = SqliteStore::open_in_memory().unwrap();
    let (rid, uuid) = put(&mut store, b"content");

    assert_eq!(store.resolve(&format!("rid:{}", rid.0)).unwrap(), Some(rid));
    assert_eq!(store.resolve(&uuid).unwrap(), Some(rid));
    assert_eq!(store.resolve(&uuid[..10]).unwrap(), Some(rid));
    assert_eq!(store.resolve("rid:77").unwrap(), None);
    assert_eq!(store.resolve("trunk").unwrap(), None);

    with_transaction(&mut store, |s| s.set_symbolic_name("trunk", Some(rid))).unwrap();
    assert_eq!(store.resolve("trunk").unwrap(), Some(rid));

    with_transaction(&mut store, |s| s.set_symbolic_name("trunk", None)).unwrap();
    assert_eq!(store.resolve("trunk").unwrap(), None);
}

#[test]
fn test_ambiguous_prefix_is_not_found() {
    let mut store = SqliteStore::open_in_memory().unwrap();
    let mut seen: HashMap<String, String> = HashMap::new();
    let mut shared = None;

    store.begin().unwrap();
    for i in 0..5000 {
        let (_, uuid) = store
            .put_content(format!("blob {}", i).as_bytes(), false)
            .unwrap();
        let prefix = uuid[..4].to_string();
        if seen.insert(prefix.clone(), uuid).is_some() {
            shared = Some(prefix);
            break;
        }
    }
    store.commit().unwrap();

    let prefix = shared.expect("some pair of blobs shares a 4-digit prefix");
    let err = store.resolve(&prefix).unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::NotFound);
}

#[test]
fn test_hex_looking_name_falls_back_to_name_table() {
    let mut store = SqliteStore::open_in_memory().unwrap();
    let (rid, uuid) = put(&mut store, b"named");
    // A prefix that cannot match the stored hash
    let name = if uuid.starts_with("cafe") { "beef" } else { "cafe" };
    with_transaction(&mut store, |s| s.set_symbolic_name(name, Some(rid))).unwrap();
    assert_eq!(store.resolve(name).unwrap(), Some(rid));
}

#[test]
fn test_for_each_artifact_order_and_filters() {
    let mut store = SqliteStore::open_in_memory().unwrap();
    let old = record(&mut store, "old", ArtifactType::Checkin, Some(1_000), "alice");
    let undated = record(&mut store, "undated", ArtifactType::Checkin, None, "bob");
    let new = record(&mut store, "new", ArtifactType::Checkin, Some(5_000), "bob");
    let wiki = record(&mut store, "wiki", ArtifactType::Wiki, Some(9_000), "alice");

    let all: Vec<Rid> = store
        .collect_artifacts(&ArtifactFilter::all())
        .unwrap()
        .iter()
        .map(|r| r.rid)
        .collect();
    assert_eq!(all, vec![wiki, new, old, undated]);

    let checkins = store
        .collect_artifacts(&ArtifactFilter::all().of_type(ArtifactType::Checkin).limit(2))
        .unwrap();
    assert_eq!(
        checkins.iter().map(|r| r.rid).collect::<Vec<_>>(),
        vec![new, old]
    );

    let bobs = store
        .collect_artifacts(&ArtifactFilter::all().by_user("bob"))
        .unwrap();
    assert_eq!(bobs.iter().map(|r| r.rid).collect::<Vec<_>>(), vec![new, undated]);
    assert_eq!(bobs[0].time, Some(Timestamp::from_unix_millis(5_000)));
    assert_eq!(bobs[0].comment.as_deref(), Some("new"));

    assert_eq!(store.resolve("tip").unwrap(), Some(new));
}

#[test]
fn test_for_each_artifact_stop_and_fail() {
    let mut store = SqliteStore::open_in_memory().unwrap();
    record(&mut store, "a", ArtifactType::Control, Some(1), "alice");
    record(&mut store, "b", ArtifactType::Control, Some(2), "alice");

    let mut visited = 0;
    let status = store
        .for_each_artifact(&ArtifactFilter::all(), &mut |_| {
            visited += 1;
            RowFlow::Stop
        })
        .unwrap();
    assert_eq!(status, QueryStatus::Stopped);
    assert_eq!(visited, 1);

    let err = store
        .for_each_artifact(&ArtifactFilter::all(), &mut |_| {
            RowFlow::Fail(ExError::new(ExErrorKind::Internal).with_message("stop here"))
        })
        .unwrap_err();
    assert_eq!(err.message(), "stop here");
}

#[test]
fn test_record_artifact_requires_blob() {
    let mut store = SqliteStore::open_in_memory().unwrap();
    store.begin().unwrap();
    let err = store
        .record_artifact(&ArtifactRecord {
            rid: Rid(12),
            uuid: "0".repeat(64),
            artifact_type: ArtifactType::Control,
            time: None,
            user: None,
            comment: None,
        })
        .unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::NotFound);
    store.rollback().unwrap();
}

#[test]
fn test_nested_failure_dooms_outer_transaction() {
    let mut store = SqliteStore::open_in_memory().unwrap();

    store.begin().unwrap();
    let (rid, _) = store.put_content(b"outer", false).unwrap();
    store.begin().unwrap();
    store.put_content(b"inner", false).unwrap();
    assert_eq!(store.rollback().unwrap(), TxOutcome::Pending);
    assert!(store.depth().is_doomed());
    assert_eq!(store.commit().unwrap(), TxOutcome::RolledBack);

    assert_eq!(store.current_level(), 0);
    assert_eq!(store.get_content(rid).unwrap_err().kind(), ExErrorKind::NotFound);
}

#[test]
fn test_attach_checkout_settings() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = SqliteStore::open_in_memory().unwrap();
    assert!(!store.is_attached(DbRole::Checkout));

    store
        .attach(DbRole::Checkout, &dir.path().join("checkout.db"))
        .unwrap();
    assert!(store.is_attached(DbRole::Checkout));
    store
        .set_setting(DbRole::Checkout, "checkout", "tip")
        .unwrap();
    assert_eq!(
        store.get_setting(DbRole::Checkout, "checkout").unwrap().as_deref(),
        Some("tip")
    );
    assert_eq!(store.get_setting(DbRole::Repository, "checkout").unwrap(), None);

    let again = store
        .attach(DbRole::Checkout, &dir.path().join("other.db"))
        .unwrap_err();
    assert_eq!(again.kind(), ExErrorKind::Misuse);

    store.detach(DbRole::Checkout).unwrap();
    assert!(!store.is_attached(DbRole::Checkout));
}

#[test]
fn test_attach_rejected_inside_transaction() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = SqliteStore::open_in_memory().unwrap();
    store.begin().unwrap();
    let err = store
        .attach(DbRole::Config, &dir.path().join("config.db"))
        .unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::Misuse);
    store.rollback().unwrap();

    let err = store
        .attach(DbRole::Repository, &dir.path().join("repo.db"))
        .unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::Misuse);
}

#[test]
fn test_open_attaches_configured_roles() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = StoreConfig::at_path(dir.path().join("repo.deckstore"));
    config
        .attach
        .insert("config".to_string(), dir.path().join("settings.db"));

    let mut store = SqliteStore::open(&config).unwrap();
    assert!(store.is_attached(DbRole::Config));
    store.set_setting(DbRole::Config, "user", "alice").unwrap();
    drop(store);

    let store = SqliteStore::open(&config).unwrap();
    assert_eq!(
        store.get_setting(DbRole::Config, "user").unwrap().as_deref(),
        Some("alice")
    );
}
