#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Item store: removal, subtree moves and sibling ordering through a session.
mod common;

use common::{child_names, session_with};
use repomock_core::{ExErrorKind, RepoError, Value};

#[test]
fn test_remove_deletes_whole_subtree() {
    // GIVEN a node with a nested child and a property
    let mut session = session_with(&["/a", "/a/b", "/a/b/c"]);
    session.set_property("/a/b", "title", "hello").unwrap();

    // WHEN removing the middle node
    session.remove("/a/b").expect("Should remove");

    // THEN nothing beneath it survives
    assert!(!session.item_exists("/a/b").unwrap());
    assert!(!session.item_exists("/a/b/c").unwrap());
    assert!(!session.item_exists("/a/b/title").unwrap());
    assert!(session.node_exists("/a").unwrap());
    assert!(session.is_modified("/a").unwrap() || session.is_new("/a").unwrap());
}

#[test]
fn test_remove_absent_and_root_rejected() {
    let mut session = session_with(&["/a"]);

    let err = session.remove("/missing").unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::NotFound);

    let err = session.remove("/").unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::InvalidArgument);
}

#[test]
fn test_move_preserves_shape_identity_and_values() {
    // GIVEN a subtree with a property and a separate target parent
    let mut session = session_with(&["/a", "/a/b", "/a/b/c", "/x"]);
    session.set_property("/a/b", "title", "hello").unwrap();
    let identity = session.get("/a/b").unwrap().identity;

    // WHEN moving the subtree root under a new name
    session.move_item("/a", "/x/moved").expect("Should move");

    // THEN the old paths are gone
    assert!(!session.item_exists("/a").unwrap());
    assert!(!session.item_exists("/a/b/c").unwrap());

    // AND every descendant exists at the relocated path
    assert!(session.node_exists("/x/moved").unwrap());
    assert!(session.node_exists("/x/moved/b/c").unwrap());
    let title = session.get_property("/x/moved/b/title").unwrap();
    assert_eq!(title.value(), Some(&Value::String("hello".to_string())));

    // AND identity tokens follow the moved records
    let moved = session.get_by_identity(&identity).unwrap();
    assert_eq!(moved.path, "/x/moved/b");
}

#[test]
fn test_move_appends_after_existing_children() {
    let mut session = session_with(&["/src", "/dst", "/dst/one", "/dst/two"]);

    session.move_item("/src", "/dst/three").unwrap();

    assert_eq!(child_names(&session, "/dst"), vec!["one", "two", "three"]);
}

#[test]
fn test_move_onto_indexed_destination_rejected() {
    let mut session = session_with(&["/a", "/x"]);

    let err = session.move_item("/a", "/x/a[2]").unwrap_err();

    assert!(matches!(err, RepoError::IndexedDestination { .. }));
    assert_eq!(err.kind(), ExErrorKind::InvalidArgument);
    assert!(session.node_exists("/a").unwrap());
}

#[test]
fn test_move_onto_occupied_destination_rejected() {
    let mut session = session_with(&["/a", "/x", "/x/a"]);

    let err = session.move_item("/a", "/x/a").unwrap_err();

    assert!(matches!(err, RepoError::ItemExists { .. }));
    assert!(session.node_exists("/a").unwrap());
}

#[test]
fn test_move_with_missing_destination_parent_rejected() {
    let mut session = session_with(&["/a"]);

    let err = session.move_item("/a", "/nowhere/a").unwrap_err();

    assert_eq!(err.kind(), ExErrorKind::NotFound);
    assert!(session.node_exists("/a").unwrap());
}

#[test]
fn test_move_of_missing_or_leaf_source_rejected() {
    let mut session = session_with(&["/a", "/x"]);
    session.set_property("/a", "title", "t").unwrap();

    let err = session.move_item("/missing", "/x/m").unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::NotFound);

    let err = session.move_item("/a/title", "/x/title").unwrap_err();
    assert!(matches!(err, RepoError::NotAContainer { .. }));
}

#[test]
fn test_move_into_own_subtree_rejected() {
    let mut session = session_with(&["/a", "/a/b"]);

    let err = session.move_item("/a", "/a/b/a").unwrap_err();

    assert_eq!(err.kind(), ExErrorKind::InvalidArgument);
    assert!(session.node_exists("/a/b").unwrap());
}

#[test]
fn test_move_does_not_capture_prefix_siblings() {
    // GIVEN siblings sharing a name prefix
    let mut session = session_with(&["/p", "/p/child1", "/p/child10", "/p/child10/deep", "/q"]);

    // WHEN moving the shorter one
    session.move_item("/p/child1", "/q/child1").unwrap();

    // THEN the longer sibling and its subtree stay in place
    assert!(session.node_exists("/p/child10/deep").unwrap());
    assert!(!session.item_exists("/q/child10").unwrap());
    assert_eq!(child_names(&session, "/p"), vec!["child10"]);
}

#[test]
fn test_order_before_scenario() {
    // GIVEN children one, two, three
    let mut session = session_with(&["/foo", "/foo/one", "/foo/two", "/foo/three"]);

    // WHEN placing three before two
    session.order_before("/foo", "three", Some("two")).unwrap();

    // THEN the order is one, three, two
    assert_eq!(child_names(&session, "/foo"), vec!["one", "three", "two"]);

    // WHEN sending one to the end
    session.order_before("/foo", "one", None).unwrap();

    // THEN the order is three, two, one
    assert_eq!(child_names(&session, "/foo"), vec!["three", "two", "one"]);
}

#[test]
fn test_order_before_carries_subtree() {
    let mut session = session_with(&["/foo", "/foo/one", "/foo/two", "/foo/two/inner"]);

    session.order_before("/foo", "two", Some("one")).unwrap();

    assert_eq!(child_names(&session, "/foo"), vec!["two", "one"]);
    assert_eq!(child_names(&session, "/foo/two"), vec!["inner"]);
}

#[test]
fn test_order_before_unknown_sibling_rejected() {
    let mut session = session_with(&["/foo", "/foo/one"]);

    let err = session.order_before("/foo", "one", Some("ghost")).unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::NotFound);

    let err = session.order_before("/foo", "ghost", None).unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::NotFound);
}

#[test]
fn test_order_before_rejects_properties() {
    // GIVEN a node with two children and a property
    let mut session = session_with(&["/foo", "/foo/one", "/foo/two"]);
    session.set_property("/foo", "title", "t").unwrap();

    // WHEN naming the property as the moved or the anchor sibling
    let moved_err = session.order_before("/foo", "title", None).unwrap_err();
    let anchor_err = session.order_before("/foo", "two", Some("title")).unwrap_err();

    // THEN both are rejected and the child order is unchanged
    assert!(matches!(moved_err, RepoError::NotAContainer { .. }));
    assert!(matches!(anchor_err, RepoError::NotAContainer { .. }));
    assert_eq!(child_names(&session, "/foo"), vec!["one", "two"]);
}

#[test]
fn test_prefix_siblings_listed_and_reordered_independently() {
    // GIVEN siblings child1, child10, child100
    let mut session = session_with(&["/p", "/p/child1", "/p/child10", "/p/child100"]);

    // THEN listing returns exactly those three
    assert_eq!(child_names(&session, "/p"), vec!["child1", "child10", "child100"]);

    // WHEN reordering child1 to the end
    session.order_before("/p", "child1", None).unwrap();

    // THEN the other two keep their relative order
    assert_eq!(child_names(&session, "/p"), vec!["child10", "child100", "child1"]);
}

#[test]
fn test_list_children_direct_only_with_predicate() {
    let mut session = session_with(&["/p", "/p/a", "/p/a/deep", "/p/b"]);
    session.set_property("/p", "flag", true).unwrap();

    let all = session.list_children("/p", None).unwrap();
    let names: Vec<&str> = all.iter().map(|r| r.name()).collect();
    assert!(names.contains(&"a"));
    assert!(names.contains(&"b"));
    assert!(names.contains(&"flag"));
    assert!(!names.contains(&"deep"));

    let leaves_only: &dyn Fn(&repomock_core::ItemRecord) -> bool = &|r| r.is_leaf();
    let leaves = session.list_children("/p", Some(leaves_only)).unwrap();
    assert!(leaves.iter().all(|r| r.is_leaf()));
    assert!(leaves.iter().any(|r| r.name() == "flag"));
}
