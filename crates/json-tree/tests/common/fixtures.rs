use json_tree::{TreeKeys, TreeSession};
use serde_json::{json, Value};

/// Identifier, children, depth and label keys used by most fixtures.
pub fn keys() -> TreeKeys {
    TreeKeys::new("id")
        .with_children("children")
        .with_depth("depth")
        .with_label("name")
}

/// A small outline with hierarchical text ids.
///
/// ```text
/// 1          Chapter one
///   1-1      Intro
///     1-1-1  Scope
///   1-2      Body
/// 2          Chapter two
///   2-1      Summary
/// ```
pub fn outline_doc() -> Value {
    json!([
        {"id": "1", "name": "Chapter one", "depth": 0, "children": ["1-1", "1-2"]},
        {"id": "1-1", "name": "Intro", "depth": 1, "children": ["1-1-1"]},
        {"id": "1-1-1", "name": "Scope", "depth": 2},
        {"id": "1-2", "name": "Body", "depth": 1},
        {"id": "2", "name": "Chapter two", "depth": 0, "children": ["2-1"]},
        {"id": "2-1", "name": "Summary", "depth": 1}
    ])
}

/// Integer ids, children lists, no depth field.
pub fn numeric_doc() -> Value {
    json!([
        {"id": 10, "name": "a", "children": [11, 12]},
        {"id": 11, "name": "b"},
        {"id": 12, "name": "c", "children": [13]},
        {"id": 13, "name": "d"},
        {"id": 20, "name": "e"}
    ])
}

pub fn session(raw: Value) -> TreeSession {
    TreeSession::from_value(raw, keys()).expect("fixture builds")
}

pub fn ids(raw: &[Value]) -> Vec<Value> {
    raw.iter().map(|item| item["id"].clone()).collect()
}
