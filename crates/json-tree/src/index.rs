//! Tree index derived from a flat array of JSON objects.
//!
//! [`TreeIndexBuilder`] reads the array once and produces a [`TreeIndex`]:
//! a node map, a children map and an ordered root list, plus the array
//! order itself. Payloads are stored once, inside the node map; the flat
//! array is materialised on demand from [`TreeIndex::order`].

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::TreeError;
use crate::identifier::Identifier;
use crate::keys::TreeKeys;

/// How identifiers were obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexMode {
    /// Read from the configured identifier field.
    Keyed,
    /// No identifier field: every element is a root identified by its
    /// array position.
    Virtual,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub(crate) id: Identifier,
    pub(crate) payload: Value,
}

impl Node {
    pub fn id(&self) -> &Identifier {
        &self.id
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TreeIndex {
    pub(crate) nodes: IndexMap<String, Node>,
    /// Parent key to ordered child keys. Parents without children have no
    /// entry.
    pub(crate) children: IndexMap<String, Vec<String>>,
    pub(crate) roots: Vec<String>,
    /// Keys in flat array order.
    pub(crate) order: Vec<String>,
    pub(crate) mode: IndexMode,
    pub(crate) skipped: usize,
}

impl TreeIndex {
    pub fn nodes(&self) -> &IndexMap<String, Node> {
        &self.nodes
    }

    pub fn children_map(&self) -> &IndexMap<String, Vec<String>> {
        &self.children
    }

    pub fn roots(&self) -> &[String] {
        &self.roots
    }

    pub fn order(&self) -> &[String] {
        &self.order
    }

    pub fn mode(&self) -> IndexMode {
        self.mode
    }

    /// Number of input elements that did not become nodes.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// The payloads in flat array order.
    pub fn raw_array(&self) -> Vec<Value> {
        self.order
            .iter()
            .filter_map(|key| self.nodes.get(key))
            .map(|node| node.payload.clone())
            .collect()
    }

    pub(crate) fn into_raw_array(mut self) -> Vec<Value> {
        self.order
            .iter()
            .filter_map(|key| self.nodes.swap_remove(key))
            .map(|node| node.payload)
            .collect()
    }
}

pub struct TreeIndexBuilder<'k> {
    keys: &'k TreeKeys,
}

impl<'k> TreeIndexBuilder<'k> {
    pub fn new(keys: &'k TreeKeys) -> Self {
        Self { keys }
    }

    /// Builds the index, taking ownership of the payloads.
    ///
    /// Elements that are not objects, or lack a scalar identifier, are
    /// skipped with a warning. Links that would break the tree shape
    /// (dangling, self, or second parent) are dropped; nodes only reachable
    /// through a cycle become roots.
    ///
    /// # Errors
    ///
    /// [`TreeError::DuplicateIdentifier`] when two elements share an id and
    /// [`TreeError::StructuralInconsistency`] when nothing usable remains.
    pub fn build(&self, raw: Vec<Value>) -> Result<TreeIndex, TreeError> {
        match self.keys.identifier_key.as_deref() {
            Some(id_key) => self.build_keyed(raw, id_key),
            None => build_virtual(raw),
        }
    }

    fn build_keyed(&self, raw: Vec<Value>, id_key: &str) -> Result<TreeIndex, TreeError> {
        let mut nodes: IndexMap<String, Node> = IndexMap::with_capacity(raw.len());
        let mut declared: Vec<(String, Vec<String>)> = Vec::new();
        let mut skipped = 0;

        for (position, item) in raw.into_iter().enumerate() {
            let Some(map) = item.as_object() else {
                warn!(position, "skipping array element that is not an object");
                skipped += 1;
                continue;
            };
            let Some(id) = map.get(id_key).and_then(Identifier::from_value) else {
                warn!(position, key = id_key, "skipping element without a usable identifier");
                skipped += 1;
                continue;
            };
            let key = id.key();
            if nodes.contains_key(&key) {
                return Err(TreeError::DuplicateIdentifier { id: key });
            }
            if let Some(Value::Array(list)) = self.keys.children_key.as_deref().and_then(|k| map.get(k)) {
                let child_keys = list.iter().filter_map(Identifier::from_value).map(|c| c.key()).collect();
                declared.push((key.clone(), child_keys));
            }
            nodes.insert(key, Node { id, payload: item });
        }

        if nodes.is_empty() {
            return Err(TreeError::StructuralInconsistency(format!(
                "no element carries the identifier field {id_key:?}"
            )));
        }

        let (mut children, claimed) = sanitize_links(&nodes, declared);
        let mut roots = self.initial_roots(&nodes, &claimed);
        roots.retain(|key| {
            let is_child = claimed.contains_key(key);
            if is_child {
                debug!(node = %key, "root candidate is claimed as a child, keeping it as a child");
            }
            !is_child
        });
        let listed: HashSet<String> = roots.iter().cloned().collect();
        roots.extend(
            nodes
                .keys()
                .filter(|key| !claimed.contains_key(*key) && !listed.contains(*key))
                .cloned(),
        );

        break_cycles(&nodes, &mut children, &claimed, &mut roots);

        // Node map insertion order is array order.
        let position: HashMap<&str, usize> = nodes.keys().enumerate().map(|(i, k)| (k.as_str(), i)).collect();
        roots.sort_by_key(|key| position.get(key.as_str()).copied().unwrap_or(usize::MAX));

        if roots.is_empty() {
            return Err(TreeError::StructuralInconsistency("the tree has no root".to_string()));
        }
        debug!(nodes = nodes.len(), roots = roots.len(), skipped, "built tree index");

        let order = nodes.keys().cloned().collect();
        Ok(TreeIndex {
            nodes,
            children,
            roots,
            order,
            mode: IndexMode::Keyed,
            skipped,
        })
    }

    fn initial_roots(&self, nodes: &IndexMap<String, Node>, claimed: &HashMap<String, String>) -> Vec<String> {
        if let Some(depth_key) = self.keys.depth_key.as_deref() {
            let depths: Vec<(&String, i64)> = nodes
                .iter()
                .filter_map(|(key, node)| read_depth(&node.payload, depth_key).map(|d| (key, d)))
                .collect();
            if let Some(min) = depths.iter().map(|(_, d)| *d).min() {
                return depths
                    .into_iter()
                    .filter(|(_, d)| *d == min)
                    .map(|(key, _)| key.clone())
                    .collect();
            }
        }
        if self.keys.children_key.is_some() {
            return nodes.keys().filter(|key| !claimed.contains_key(*key)).cloned().collect();
        }
        warn!("no children or depth field, showing every node as a root");
        nodes.keys().cloned().collect()
    }
}

fn build_virtual(raw: Vec<Value>) -> Result<TreeIndex, TreeError> {
    let mut nodes = IndexMap::with_capacity(raw.len());
    let mut skipped = 0;
    for (position, item) in raw.into_iter().enumerate() {
        if !item.is_object() {
            warn!(position, "skipping array element that is not an object");
            skipped += 1;
            continue;
        }
        let id = Identifier::Int(position as i64);
        nodes.insert(id.key(), Node { id, payload: item });
    }
    if nodes.is_empty() {
        return Err(TreeError::StructuralInconsistency(
            "the array contains no objects".to_string(),
        ));
    }
    let order: Vec<String> = nodes.keys().cloned().collect();
    Ok(TreeIndex {
        nodes,
        children: IndexMap::new(),
        roots: order.clone(),
        order,
        mode: IndexMode::Virtual,
        skipped,
    })
}

/// Reads a depth value, accepting integers and integer strings.
pub(crate) fn read_depth(payload: &Value, depth_key: &str) -> Option<i64> {
    match payload.get(depth_key)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Keeps the first valid claim on every child. Returns the children map and
/// the child-to-parent relation.
fn sanitize_links(
    nodes: &IndexMap<String, Node>,
    declared: Vec<(String, Vec<String>)>,
) -> (IndexMap<String, Vec<String>>, HashMap<String, String>) {
    let mut children = IndexMap::new();
    let mut claimed: HashMap<String, String> = HashMap::new();
    for (parent, list) in declared {
        let mut kept = Vec::with_capacity(list.len());
        for child in list {
            if child == parent {
                warn!(node = %parent, "dropping self reference in children list");
            } else if !nodes.contains_key(&child) {
                warn!(parent = %parent, child = %child, "dropping reference to unknown child");
            } else if let Some(owner) = claimed.get(&child) {
                warn!(parent = %parent, child = %child, owner = %owner, "child already has a parent, dropping second claim");
            } else {
                claimed.insert(child.clone(), parent.clone());
                kept.push(child);
            }
        }
        if !kept.is_empty() {
            children.insert(parent, kept);
        }
    }
    (children, claimed)
}

/// Promotes nodes that no root reaches, detaching each from its parent.
fn break_cycles(
    nodes: &IndexMap<String, Node>,
    children: &mut IndexMap<String, Vec<String>>,
    claimed: &HashMap<String, String>,
    roots: &mut Vec<String>,
) {
    let mut reached: HashSet<String> = HashSet::with_capacity(nodes.len());
    for root in roots.iter() {
        mark_reachable(root, children, &mut reached);
    }
    for key in nodes.keys() {
        if reached.contains(key) {
            continue;
        }
        if let Some(parent) = claimed.get(key) {
            warn!(node = %key, parent = %parent, "cycle in children links, promoting node to root");
            if let Some(list) = children.get_mut(parent) {
                list.retain(|child| child != key);
                if list.is_empty() {
                    children.shift_remove(parent);
                }
            }
        }
        roots.push(key.clone());
        mark_reachable(key, children, &mut reached);
    }
}

fn mark_reachable(start: &str, children: &IndexMap<String, Vec<String>>, reached: &mut HashSet<String>) {
    let mut stack = vec![start.to_string()];
    while let Some(key) = stack.pop() {
        if !reached.insert(key.clone()) {
            continue;
        }
        if let Some(list) = children.get(&key) {
            stack.extend(list.iter().cloned());
        }
    }
}
