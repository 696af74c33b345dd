//! The tree session: one owner for the index, the key roles, the options and
//! the selection.
//!
//! Mutations live in sibling modules (`mutate`, `reparent`, `realign`,
//! `fields`) as further `impl TreeSession` blocks.

use std::collections::{HashSet, VecDeque};

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::TreeError;
use crate::identifier::Identifier;
use crate::index::{read_depth, IndexMode, Node, TreeIndex, TreeIndexBuilder};
use crate::keys::{SessionOptions, TreeKeys};

#[derive(Debug, Clone)]
pub struct TreeSession {
    pub(crate) index: TreeIndex,
    pub(crate) keys: TreeKeys,
    pub(crate) options: SessionOptions,
    pub(crate) selected: Option<String>,
    /// Parents whose children field was added by the session, dropped
    /// again once their list empties.
    pub(crate) created_links: HashSet<String>,
}

/// Where a node sits: its parent (`None` for roots) and its position in
/// that sibling list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub parent: Option<String>,
    pub position: usize,
}

impl TreeSession {
    /// Builds a session from a flat array of objects.
    pub fn build(raw: Vec<Value>, keys: TreeKeys) -> Result<Self, TreeError> {
        let index = TreeIndexBuilder::new(&keys).build(raw)?;
        Ok(Self {
            index,
            keys,
            options: SessionOptions::default(),
            selected: None,
            created_links: HashSet::new(),
        })
    }

    /// Like [`TreeSession::build`], also accepting a single object.
    pub fn from_value(data: Value, keys: TreeKeys) -> Result<Self, TreeError> {
        match data {
            Value::Array(items) => Self::build(items, keys),
            Value::Object(_) => Self::build(vec![data], keys),
            other => Err(TreeError::StructuralInconsistency(format!(
                "expected an array of objects, found {}",
                json_tree_path::type_name(&other)
            ))),
        }
    }

    pub fn with_options(mut self, options: SessionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> SessionOptions {
        self.options
    }

    pub fn set_options(&mut self, options: SessionOptions) {
        self.options = options;
    }

    pub fn keys(&self) -> &TreeKeys {
        &self.keys
    }

    pub fn index(&self) -> &TreeIndex {
        &self.index
    }

    pub fn mode(&self) -> IndexMode {
        self.index.mode
    }

    pub fn len(&self) -> usize {
        self.index.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.nodes.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.nodes.contains_key(id)
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.index.nodes.get(id)
    }

    pub fn payload(&self, id: &str) -> Option<&Value> {
        self.node(id).map(Node::payload)
    }

    /// Ordered child keys of `id`; empty for leaves and unknown ids.
    pub fn children(&self, id: &str) -> &[String] {
        self.index.children.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn roots(&self) -> &[String] {
        &self.index.roots
    }

    /// The payloads in flat array order.
    pub fn raw_array(&self) -> Vec<Value> {
        self.index.raw_array()
    }

    pub fn into_raw_array(self) -> Vec<Value> {
        self.index.into_raw_array()
    }

    /// Rebuilds the index from the current flat array with new key roles.
    ///
    /// On failure the session is left unchanged.
    pub fn rebuild(&mut self, keys: TreeKeys) -> Result<(), TreeError> {
        let index = TreeIndexBuilder::new(&keys).build(self.index.raw_array())?;
        self.index = index;
        self.keys = keys;
        self.created_links.clear();
        if let Some(selected) = self.selected.take() {
            if self.contains(&selected) {
                self.selected = Some(selected);
            }
        }
        debug!(nodes = self.len(), "rebuilt tree index");
        Ok(())
    }

    pub fn find_parent(&self, id: &str) -> Option<Location> {
        if let Some(position) = self.index.roots.iter().position(|r| r == id) {
            return Some(Location { parent: None, position });
        }
        self.index.children.iter().find_map(|(parent, list)| {
            list.iter().position(|c| c == id).map(|position| Location {
                parent: Some(parent.clone()),
                position,
            })
        })
    }

    /// True if `ancestor` is a strict ancestor of `id`.
    pub fn is_ancestor(&self, ancestor: &str, id: &str) -> bool {
        let mut seen = HashSet::new();
        let mut current = id.to_string();
        while let Some(parent) = self.find_parent(&current).and_then(|l| l.parent) {
            if parent == ancestor {
                return true;
            }
            if !seen.insert(parent.clone()) {
                return false;
            }
            current = parent;
        }
        false
    }

    /// The depth field when it holds a number, otherwise the number of
    /// ancestors.
    pub fn depth_of(&self, id: &str) -> Option<i64> {
        let node = self.node(id)?;
        if let Some(depth) = self.depth_field().and_then(|key| read_depth(&node.payload, key)) {
            return Some(depth);
        }
        let mut depth = 0;
        let mut current = id.to_string();
        while let Some(parent) = self.find_parent(&current).and_then(|l| l.parent) {
            depth += 1;
            if depth as usize > self.len() {
                return None;
            }
            current = parent;
        }
        Some(depth)
    }

    /// Every reachable key in depth-first order.
    pub fn ordered_ids(&self) -> Vec<String> {
        let mut out = Vec::with_capacity(self.len());
        let mut seen = HashSet::with_capacity(self.len());
        let mut stack: Vec<&String> = self.index.roots.iter().rev().collect();
        while let Some(key) = stack.pop() {
            if !seen.insert(key) {
                continue;
            }
            out.push(key.clone());
            if let Some(list) = self.index.children.get(key) {
                stack.extend(list.iter().rev());
            }
        }
        out
    }

    /// `id` and all of its descendants, breadth first. Empty if `id` is
    /// unknown.
    pub fn subtree(&self, id: &str) -> Vec<String> {
        if !self.contains(id) {
            return Vec::new();
        }
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([id.to_string()]);
        while let Some(key) = queue.pop_front() {
            if !seen.insert(key.clone()) {
                continue;
            }
            if let Some(list) = self.index.children.get(&key) {
                queue.extend(list.iter().cloned());
            }
            out.push(key);
        }
        out
    }

    /// Display label: the label field if present, otherwise the id.
    pub fn label_of(&self, id: &str) -> Option<String> {
        let node = self.node(id)?;
        let label = self
            .keys
            .label_key
            .as_deref()
            .and_then(|key| node.payload.get(key))
            .and_then(|value| match value {
                Value::String(s) => Some(s.clone()),
                Value::Null => None,
                other => Some(other.to_string()),
            });
        Some(label.unwrap_or_else(|| node.id.key()))
    }

    pub fn select(&mut self, id: &str) -> Result<(), TreeError> {
        if !self.contains(id) {
            return Err(TreeError::unknown(id));
        }
        self.selected = Some(id.to_string());
        Ok(())
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// Checks the structural invariants of the index.
    ///
    /// Every child and root key names a node, every node is placed exactly
    /// once, the tree is acyclic, the flat order is a permutation of the
    /// node map, and payload identifiers agree with their keys.
    pub fn validate_invariants(&self) -> Result<(), TreeError> {
        let nodes = &self.index.nodes;
        let id_field = self.id_field();
        for (key, node) in nodes {
            if node.id.key() != *key {
                return violation(format!("node stored under {key:?} has id {:?}", node.id.key()));
            }
            if let Some(field) = id_field {
                let stored = node.payload.get(field).and_then(Identifier::from_value);
                if stored.as_ref() != Some(&node.id) {
                    return violation(format!("payload id of node {key:?} is {stored:?}"));
                }
            }
        }

        let mut placed: HashSet<&str> = HashSet::with_capacity(nodes.len());
        for root in &self.index.roots {
            if !nodes.contains_key(root) {
                return violation(format!("root {root:?} is not a node"));
            }
            if !placed.insert(root) {
                return violation(format!("root {root:?} is listed twice"));
            }
        }
        for (parent, list) in &self.index.children {
            if !nodes.contains_key(parent) {
                return violation(format!("children recorded for unknown parent {parent:?}"));
            }
            if list.is_empty() {
                return violation(format!("parent {parent:?} has an empty children entry"));
            }
            for child in list {
                if !nodes.contains_key(child) {
                    return violation(format!("child {child:?} of {parent:?} is not a node"));
                }
                if !placed.insert(child) {
                    return violation(format!("{child:?} has more than one place in the tree"));
                }
            }
        }
        if placed.len() != nodes.len() {
            return violation(format!("{} nodes are not placed in the tree", nodes.len() - placed.len()));
        }
        if self.ordered_ids().len() != nodes.len() {
            return violation("the children links contain a cycle".to_string());
        }

        let order = &self.index.order;
        let distinct: HashSet<&String> = order.iter().collect();
        if order.len() != nodes.len() || distinct.len() != order.len() || !order.iter().all(|k| nodes.contains_key(k)) {
            return violation("flat order is not a permutation of the nodes".to_string());
        }
        Ok(())
    }

    pub(crate) fn id_field(&self) -> Option<&str> {
        match self.index.mode {
            IndexMode::Keyed => self.keys.identifier_key.as_deref(),
            IndexMode::Virtual => None,
        }
    }

    pub(crate) fn children_field(&self) -> Option<&str> {
        match self.index.mode {
            IndexMode::Keyed => self.keys.children_key.as_deref(),
            IndexMode::Virtual => None,
        }
    }

    pub(crate) fn depth_field(&self) -> Option<&str> {
        match self.index.mode {
            IndexMode::Keyed => self.keys.depth_key.as_deref(),
            IndexMode::Virtual => None,
        }
    }

    /// Records `child` in the parent payload's children list, before the
    /// entry for `before` when given. New entries follow the element type
    /// already used by the list.
    pub(crate) fn link_child(&mut self, parent: &str, child: &str, before: Option<&str>) {
        let Some(field) = self.children_field().map(str::to_string) else {
            return;
        };
        let Some(child_id) = self.node(child).map(|n| n.id.clone()) else {
            return;
        };
        let Some(Value::Object(map)) = self.index.nodes.get_mut(parent).map(|n| &mut n.payload) else {
            return;
        };
        if !map.contains_key(&field) {
            self.created_links.insert(parent.to_string());
        }
        let slot = map.entry(field).or_insert_with(|| Value::Array(Vec::new()));
        if !slot.is_array() {
            warn!(node = %parent, "children field is not a list, replacing it");
            *slot = Value::Array(Vec::new());
        }
        let Value::Array(list) = slot else {
            return;
        };
        let entry = match list.iter().find_map(Identifier::from_value) {
            Some(template) => child_id.coerce_like(&template),
            None => child_id,
        };
        let at = before
            .and_then(|b| list.iter().position(|v| entry_key(v).as_deref() == Some(b)))
            .unwrap_or(list.len());
        list.insert(at, entry.to_value());
    }

    /// Removes `child` from the parent payload's children list. A list the
    /// session added itself is removed with its last entry.
    pub(crate) fn unlink_child(&mut self, parent: &str, child: &str) {
        let Some(field) = self.children_field().map(str::to_string) else {
            return;
        };
        let Some(Value::Object(map)) = self.index.nodes.get_mut(parent).map(|n| &mut n.payload) else {
            return;
        };
        let Some(Value::Array(list)) = map.get_mut(&field) else {
            return;
        };
        list.retain(|v| entry_key(v).as_deref() != Some(child));
        if list.is_empty() && self.created_links.remove(parent) {
            map.shift_remove(&field);
        }
    }

    /// Writes depth fields for `id` and its subtree from the parent's depth.
    pub(crate) fn refresh_depth(&mut self, id: &str) {
        let Some(field) = self.depth_field().map(str::to_string) else {
            return;
        };
        let base = match self.find_parent(id).and_then(|l| l.parent) {
            Some(parent) => self.depth_of(&parent).unwrap_or(0) + 1,
            None => 0,
        };
        let mut stack = vec![(id.to_string(), base)];
        while let Some((key, depth)) = stack.pop() {
            if let Some(Value::Object(map)) = self.index.nodes.get_mut(&key).map(|n| &mut n.payload) {
                map.insert(field.clone(), Value::from(depth));
            }
            if let Some(list) = self.index.children.get(&key) {
                stack.extend(list.iter().map(|c| (c.clone(), depth + 1)));
            }
        }
    }
}

pub(crate) fn entry_key(value: &Value) -> Option<String> {
    Identifier::from_value(value).map(|id| id.key())
}

fn violation(message: String) -> Result<(), TreeError> {
    Err(TreeError::InvariantViolation(message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn session() -> TreeSession {
        let raw = json!([
            {"id": 1, "name": "root", "children": [2, 3]},
            {"id": 2, "name": "left", "children": [4]},
            {"id": 4, "name": "leaf"},
            {"id": 3, "name": "right"}
        ]);
        TreeSession::from_value(raw, TreeKeys::new("id").with_children("children").with_label("name")).unwrap()
    }

    #[test]
    fn test_queries() {
        let s = session();
        assert_eq!(s.len(), 4);
        assert_eq!(s.roots(), ["1"]);
        assert_eq!(s.children("1"), ["2", "3"]);
        assert!(s.children("4").is_empty());
        assert_eq!(
            s.find_parent("3"),
            Some(Location {
                parent: Some("1".into()),
                position: 1
            })
        );
        assert_eq!(s.find_parent("1"), Some(Location { parent: None, position: 0 }));
        assert_eq!(s.find_parent("9"), None);
        assert!(s.is_ancestor("1", "4"));
        assert!(!s.is_ancestor("3", "4"));
        assert!(!s.is_ancestor("4", "4"));
        assert_eq!(s.depth_of("4"), Some(2));
        assert_eq!(s.ordered_ids(), ["1", "2", "4", "3"]);
        assert_eq!(s.subtree("2"), ["2", "4"]);
        assert_eq!(s.label_of("2").as_deref(), Some("left"));
        s.validate_invariants().unwrap();
    }

    #[test]
    fn test_from_value_single_object_and_scalar() {
        let s = TreeSession::from_value(json!({"id": "only"}), TreeKeys::new("id")).unwrap();
        assert_eq!(s.roots(), ["only"]);
        assert!(matches!(
            TreeSession::from_value(json!(3), TreeKeys::new("id")),
            Err(TreeError::StructuralInconsistency(_))
        ));
    }

    #[test]
    fn test_selection() {
        let mut s = session();
        assert!(s.select("9").is_err());
        s.select("2").unwrap();
        assert_eq!(s.selected(), Some("2"));
        s.clear_selection();
        assert_eq!(s.selected(), None);
    }

    #[test]
    fn test_rebuild_with_other_identifier() {
        let mut s = session();
        s.select("1").unwrap();
        s.rebuild(TreeKeys::new("name")).unwrap();
        assert_eq!(s.roots(), ["root", "left", "leaf", "right"]);
        assert_eq!(s.selected(), None);

        let before = s.raw_array();
        assert!(s.rebuild(TreeKeys::new("missing")).is_err());
        assert_eq!(s.raw_array(), before);
        assert_eq!(s.keys().identifier_key.as_deref(), Some("name"));
    }

    #[test]
    fn test_invariant_violation_detected() {
        let mut s = session();
        s.index.roots.push("2".to_string());
        assert!(matches!(
            s.validate_invariants(),
            Err(TreeError::InvariantViolation(_))
        ));
    }

    #[test]
    fn test_link_helpers_follow_list_type() {
        let mut s = TreeSession::from_value(
            json!([{"id": "a", "kids": ["b"]}, {"id": "b"}, {"id": 7}]),
            TreeKeys::new("id").with_children("kids"),
        )
        .unwrap();
        s.link_child("a", "7", Some("b"));
        assert_eq!(s.payload("a").unwrap()["kids"], json!(["7", "b"]));
        s.unlink_child("a", "b");
        assert_eq!(s.payload("a").unwrap()["kids"], json!(["7"]));
    }
}
