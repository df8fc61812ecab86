#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::new_session;
use repomock_core::core_types::schema::{
    EVENT_END, EVENT_END_ERROR, EVENT_START, FIELD_ERR_CODE, FIELD_SESSION_ID,
};
use repomock_core::errors::RepoError;
use repomock_core::logging_facility::test_capture::{init_test_capture, CapturedEvent};
use repomock_core::{log_op_end, log_op_error, log_op_start, ResolveMode};

fn for_session<'a>(events: &'a [CapturedEvent], session_id: &str, op: &str) -> Vec<&'a CapturedEvent> {
    events
        .iter()
        .filter(|e| e.op.as_deref() == Some(op) && e.field(FIELD_SESSION_ID) == Some(session_id))
        .collect()
}

#[test]
fn test_log_op_start_macro() {
    let capture = init_test_capture();
    let op_name = "test_log_op_start_unique_1";

    log_op_start!(op_name, path = "/a");

    let events = capture.events_for_op(op_name);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event.as_deref(), Some(EVENT_START));
    assert_eq!(events[0].field("path"), Some("/a"));
}

#[test]
fn test_log_op_end_macro() {
    let capture = init_test_capture();
    let op_name = "test_log_op_end_unique_2";

    log_op_end!(op_name, duration_ms = 42);

    let events = capture.events_for_op(op_name);
    assert_eq!(events.len(), 1, "Should have exactly one end event");
    assert_eq!(events[0].event.as_deref(), Some(EVENT_END));
    assert_eq!(events[0].field("duration_ms"), Some("42"));
}

#[test]
fn test_log_op_error_includes_code() {
    let capture = init_test_capture();
    let op_name = "test_log_op_error_unique_3";

    let err = RepoError::PathNotFound {
        path: "/missing".to_string(),
    };
    log_op_error!(op_name, err, duration_ms = 10);

    let events = capture.events_for_op(op_name);
    assert_eq!(events.len(), 1, "Should have exactly one error event");
    assert_eq!(events[0].event.as_deref(), Some(EVENT_END_ERROR));
    assert_eq!(events[0].field(FIELD_ERR_CODE), Some("ERR_NOT_FOUND"));
    assert_eq!(events[0].level, tracing::Level::ERROR);
}

#[test]
fn test_session_move_logs_start_and_end() {
    // GIVEN a session with a node to move
    let capture = init_test_capture();
    let mut session = new_session(ResolveMode::Permissive);
    session.add_child("/", "a", None).unwrap();
    session.add_child("/", "x", None).unwrap();
    let session_id = session.id().as_str().to_string();

    // WHEN moving it
    session.move_item("/a", "/x/a").unwrap();

    // THEN exactly one start and one end event carry this session's id
    let events = capture.events();
    let moves = for_session(&events, &session_id, "move");
    assert_eq!(moves.len(), 2);
    assert_eq!(moves[0].event.as_deref(), Some(EVENT_START));
    assert_eq!(moves[0].field("path"), Some("/a"));
    assert_eq!(moves[1].event.as_deref(), Some(EVENT_END));
    assert!(moves[1].field("duration_ms").is_some());
}

#[test]
fn test_session_failure_logs_end_error() {
    // GIVEN a session
    let capture = init_test_capture();
    let mut session = new_session(ResolveMode::Permissive);
    let session_id = session.id().as_str().to_string();

    // WHEN removing a path that does not exist
    let result = session.remove("/nothing-here");

    // THEN the error event carries the stable code and no end event is logged
    assert!(result.is_err());
    let events = capture.events();
    let removes = for_session(&events, &session_id, "remove");
    assert_eq!(removes.len(), 2);
    assert_eq!(removes[1].event.as_deref(), Some(EVENT_END_ERROR));
    assert_eq!(removes[1].field(FIELD_ERR_CODE), Some("ERR_NOT_FOUND"));
    assert!(!removes.iter().any(|e| e.event.as_deref() == Some(EVENT_END)));
}

#[test]
fn test_closed_session_logs_session_closed() {
    let capture = init_test_capture();
    let mut session = new_session(ResolveMode::Permissive);
    let session_id = session.id().as_str().to_string();
    session.logout();

    session.save().unwrap_err();

    let events = capture.events();
    let saves = for_session(&events, &session_id, "save");
    assert_eq!(
        saves.last().and_then(|e| e.field(FIELD_ERR_CODE)),
        Some("ERR_SESSION_CLOSED")
    );
}

#[test]
fn test_authorizable_creation_logged() {
    let capture = init_test_capture();
    let mut session = new_session(ResolveMode::Permissive);

    session
        .user_manager()
        .unwrap()
        .create_user("logged_user_unique_7", None)
        .unwrap();

    let count = capture.count_events(|e| {
        e.op.as_deref() == Some("create_authorizable")
            && e.field("authorizable_id") == Some("logged_user_unique_7")
    });
    assert_eq!(count, 2);
}

#[test]
fn test_reads_emit_no_boundary_events() {
    let capture = init_test_capture();
    let mut session = new_session(ResolveMode::Permissive);
    session.add_child("/", "n", None).unwrap();
    let session_id = session.id().as_str().to_string();

    session.get("/n").unwrap();
    session.child_nodes("/", None).unwrap();

    let boundary_ops: Vec<String> = capture
        .events()
        .into_iter()
        .filter(|e| e.field(FIELD_SESSION_ID) == Some(session_id.as_str()))
        .filter_map(|e| e.op)
        .collect();
    assert!(boundary_ops.iter().all(|op| op == "add_child"));
}
