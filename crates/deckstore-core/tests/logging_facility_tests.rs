#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{checkin, h};
use deckstore_core::errors::DeckError;
use deckstore_core::logging_facility::test_capture::init_test_capture;
use deckstore_core::{log_op_end, log_op_error, log_op_start};
use deckstore_core::{with_transaction, Deck, MemoryGateway, PersistenceGateway};
use deckstore_core_types::schema::{
    EVENT_END, EVENT_END_ERROR, EVENT_START, FIELD_ERR_CODE, FIELD_REFERENCE, FIELD_UUID,
};

#[test]
fn test_log_op_macros() {
    let capture = init_test_capture();
    let op_name = "test_log_op_macros_unique";

    log_op_start!(op_name);
    log_op_end!(op_name, duration_ms = 42);

    capture.assert_event_exists(op_name, EVENT_START);
    let end = capture.find_with_field(op_name, EVENT_END, "duration_ms", "42");
    assert!(end.is_some(), "end event carries duration_ms");
}

#[test]
fn test_log_op_error_includes_code() {
    let capture = init_test_capture();
    let op_name = "test_log_op_error_unique";

    let err = DeckError::ArtifactNotFound {
        reference: "nowhere".to_string(),
    };
    log_op_error!(op_name, err, duration_ms = 10);

    let event = capture
        .find_with_field(op_name, EVENT_END_ERROR, FIELD_ERR_CODE, "ERR_NOT_FOUND")
        .expect("end_error event with err_code");
    assert_eq!(event.level, tracing::Level::ERROR);
    assert_eq!(event.field("err_kind"), Some("NotFound"));
}

#[test]
fn test_persist_logs_start_and_end() {
    let capture = init_test_capture();
    let mut gw = MemoryGateway::new();
    let (rid, uuid) = checkin("logged persist", 7_777).persist(&mut gw, false).unwrap();

    let end = capture
        .find_with_field("persist", EVENT_END, FIELD_UUID, &uuid)
        .expect("persist end event");
    assert_eq!(end.field("rid"), Some(rid.0.to_string().as_str()));
    assert!(end.field("duration_ms").is_some());
}

#[test]
fn test_failed_load_logs_end_error() {
    let capture = init_test_capture();
    let gw = MemoryGateway::new();
    let reference = "branch-that-does-not-exist";

    assert!(Deck::load_new(&gw, reference, None).is_err());

    capture
        .find_with_field("load", EVENT_START, FIELD_REFERENCE, reference)
        .expect("load start event");
    let failed = capture
        .find_with_field("load", EVENT_END_ERROR, FIELD_REFERENCE, reference)
        .expect("load end_error event");
    assert_eq!(failed.field(FIELD_ERR_CODE), Some("ERR_NOT_FOUND"));
}

#[test]
fn test_with_transaction_logs_boundary() {
    let capture = init_test_capture();
    let mut gw = MemoryGateway::new();
    let content = format!("tx logging {}", h('c'));

    with_transaction(&mut gw, |g| g.put_content(content.as_bytes(), false)).unwrap();

    capture.assert_event_exists("with_transaction", EVENT_START);
    capture.assert_event_exists("with_transaction", EVENT_END);
}
