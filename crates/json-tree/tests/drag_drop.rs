mod common;

use common::assertions::{assert_consistent, assert_depths};
use common::fixtures::{numeric_doc, outline_doc, session};
use common::init_tracing;
use json_tree::{DropEvent, DropTarget, Identifier, SessionOptions, TreeError};
use serde_json::json;

#[test]
fn drop_into_parent_recomputes_depth() {
    init_tracing();
    let mut s = session(outline_doc());
    let outcome = s.move_node("2", &DropTarget::into_parent("1")).unwrap();
    assert_eq!(outcome.node, "2");
    assert_eq!(outcome.parent.as_deref(), Some("1"));
    assert!(outcome.renamed.is_empty());
    assert_eq!(s.roots(), ["1"]);
    assert_eq!(s.children("1"), ["1-1", "1-2", "2"]);
    assert_eq!(s.payload("2").unwrap()["depth"], json!(1));
    assert_eq!(s.payload("2-1").unwrap()["depth"], json!(2));
    assert_eq!(s.payload("1").unwrap()["children"], json!(["1-1", "1-2", "2"]));
    assert_consistent(&s);
    assert_depths(&s, "depth");
}

#[test]
fn drop_before_sibling_realigns_group_and_descendants() {
    init_tracing();
    let mut s = session(outline_doc());
    let outcome = s.move_node("1-2", &DropTarget::before("1-1")).unwrap();
    // Body moved in front of Intro and took the first number.
    assert_eq!(outcome.node, "1-1");
    assert_eq!(outcome.renamed.len(), 3);
    assert_eq!(s.children("1"), ["1-1", "1-2"]);
    assert_eq!(s.label_of("1-1").as_deref(), Some("Body"));
    assert_eq!(s.label_of("1-2").as_deref(), Some("Intro"));
    assert_eq!(s.children("1-2"), ["1-2-1"]);
    assert_eq!(s.label_of("1-2-1").as_deref(), Some("Scope"));
    assert_eq!(s.payload("1").unwrap()["children"], json!(["1-1", "1-2"]));
    assert_eq!(s.payload("1-2").unwrap()["children"], json!(["1-2-1"]));
    assert_consistent(&s);
}

#[test]
fn drop_without_realign_keeps_ids() {
    init_tracing();
    let mut s = session(outline_doc()).with_options(SessionOptions { auto_realign: false });
    let outcome = s.move_node("1-2", &DropTarget::before("1-1")).unwrap();
    assert_eq!(outcome.node, "1-2");
    assert!(outcome.renamed.is_empty());
    assert_eq!(s.children("1"), ["1-2", "1-1"]);
    assert_eq!(s.payload("1").unwrap()["children"], json!(["1-2", "1-1"]));
    assert_consistent(&s);
}

#[test]
fn drop_to_end_of_roots() {
    init_tracing();
    let mut s = session(outline_doc());
    s.move_node("1-1", &DropTarget::last_under(None)).unwrap();
    assert_eq!(s.roots(), ["1", "2", "1-1"]);
    assert_eq!(s.children("1"), ["1-2"]);
    assert_eq!(s.payload("1").unwrap()["children"], json!(["1-2"]));
    assert_consistent(&s);
    assert_depths(&s, "depth");
}

#[test]
fn drop_to_end_of_other_parent() {
    init_tracing();
    let mut s = session(outline_doc());
    s.move_node("2-1", &DropTarget::last_under(Some(Identifier::from("1")))).unwrap();
    assert_eq!(s.children("1"), ["1-1", "1-2", "2-1"]);
    assert!(s.children("2").is_empty());
    assert_eq!(s.payload("2").unwrap()["children"], json!([]));
    assert_consistent(&s);
}

#[test]
fn self_drop_is_rejected() {
    init_tracing();
    let mut s = session(outline_doc());
    let before = s.raw_array();
    for target in [DropTarget::into_parent("1"), DropTarget::before("1")] {
        let err = s.move_node("1", &target).unwrap_err();
        assert_eq!(err, TreeError::SelfDrop { id: "1".into() });
        assert!(err.is_rejection());
    }
    assert_eq!(s.raw_array(), before);
}

#[test]
fn drop_into_own_subtree_is_rejected() {
    init_tracing();
    let mut s = session(outline_doc());
    let before = s.raw_array();
    assert_eq!(
        s.move_node("1", &DropTarget::into_parent("1-1-1")),
        Err(TreeError::Cycle {
            node: "1".into(),
            target: "1-1-1".into()
        })
    );
    // Before a child means "into the node itself".
    assert!(matches!(
        s.move_node("1", &DropTarget::before("1-2")),
        Err(TreeError::Cycle { .. })
    ));
    assert_eq!(s.raw_array(), before);
    assert_consistent(&s);
}

#[test]
fn drop_with_unknown_ids_is_rejected() {
    init_tracing();
    let mut s = session(outline_doc());
    assert!(matches!(
        s.move_node("9", &DropTarget::into_parent("1")),
        Err(TreeError::UnknownNode { .. })
    ));
    assert!(matches!(
        s.move_node("1-1", &DropTarget::before("9")),
        Err(TreeError::UnknownNode { .. })
    ));
    assert!(matches!(
        s.move_node("1-1", &DropTarget::into_parent("9")),
        Err(TreeError::UnknownNode { .. })
    ));
}

#[test]
fn drop_event_from_json_renumbers_integer_ids() {
    init_tracing();
    let mut s = session(numeric_doc());
    let event: DropEvent =
        serde_json::from_value(json!({"draggedId": 13, "target": {"kind": "parent", "parentId": 10}})).unwrap();
    let outcome = s.apply_drop(&event).unwrap();
    assert_eq!(outcome.node, "3");
    assert_eq!(outcome.parent.as_deref(), Some("10"));
    assert_eq!(s.children("10"), ["1", "2", "3"]);
    assert_eq!(s.payload("10").unwrap()["children"], json!([1, 2, 3]));
    assert_eq!(s.payload("3").unwrap()["name"], json!("d"));
    assert!(s.children("2").is_empty());
    assert_consistent(&s);
}

#[test]
fn drop_event_sibling_shape() {
    let event: DropEvent =
        serde_json::from_value(json!({"draggedId": "2-1", "target": {"kind": "sibling", "beforeId": "1-1"}})).unwrap();
    assert_eq!(event.dragged, Identifier::from("2-1"));
    assert_eq!(event.target, DropTarget::before("1-1"));
    assert_eq!(
        serde_json::to_value(DropTarget::last_under(None)).unwrap(),
        json!({"kind": "sibling"})
    );
}

#[test]
fn selection_follows_realigned_id() {
    init_tracing();
    let mut s = session(outline_doc());
    s.select("1-1-1").unwrap();
    s.move_node("1-2", &DropTarget::before("1-1")).unwrap();
    assert_eq!(s.selected(), Some("1-2-1"));
}
