//! Add, delete and depth-first reorder.

use std::collections::HashSet;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::TreeError;
use crate::identifier::{next_prefixed_id, Identifier};
use crate::index::{IndexMode, Node};
use crate::session::TreeSession;

impl TreeSession {
    /// Adds a node under `parent`, or as the last root when `parent` is
    /// `None`, and returns its key.
    ///
    /// The id is read from the payload's identifier field and converted to
    /// the type used by its future siblings. In the flat fallback the next
    /// free position is used instead. The payload is placed in the flat
    /// array right after the parent's last descendant (or the last root's
    /// subtree for a new root). When a depth key is configured the depth
    /// field is always recomputed from the parent, replacing any value the
    /// payload carries.
    ///
    /// # Errors
    ///
    /// Fails before changing anything when the payload is not an object,
    /// lacks an identifier, names an unknown parent, or reuses an id.
    pub fn add_node(&mut self, parent: Option<&str>, payload: Value) -> Result<String, TreeError> {
        if !payload.is_object() {
            return Err(TreeError::InvalidPayload(format!(
                "a node must be an object, found {}",
                json_tree_path::type_name(&payload)
            )));
        }
        if let Some(p) = parent {
            if !self.contains(p) {
                return Err(TreeError::unknown(p));
            }
        }

        let mut payload = payload;
        let id = match self.index.mode {
            IndexMode::Keyed => {
                let field = self.id_field().unwrap_or_default();
                let id = payload
                    .get(field)
                    .and_then(Identifier::from_value)
                    .ok_or_else(|| TreeError::MissingIdentifier { key: field.to_string() })?;
                match self.sibling_template(parent) {
                    Some(template) => id.coerce_like(&template),
                    None => id,
                }
            }
            IndexMode::Virtual => self.next_virtual_id(),
        };
        let key = id.key();
        if self.contains(&key) {
            return Err(TreeError::DuplicateIdentifier { id: key });
        }

        if let Some(map) = payload.as_object_mut() {
            if let Some(field) = self.id_field() {
                map.insert(field.to_string(), id.to_value());
            }
            if let Some(field) = self.depth_field() {
                let depth = parent.map_or(0, |p| self.depth_of(p).unwrap_or(0) + 1);
                map.insert(field.to_string(), Value::from(depth));
            }
        }

        let position = self.insertion_position(parent);
        self.index.order.insert(position, key.clone());
        self.index.nodes.insert(key.clone(), Node { id, payload });
        match parent {
            Some(p) => {
                self.index.children.entry(p.to_string()).or_default().push(key.clone());
                self.link_child(p, &key, None);
            }
            None => self.index.roots.push(key.clone()),
        }
        info!(node = %key, parent = ?parent, position, "added node");
        Ok(key)
    }

    /// Deletes `id` and all of its descendants. Returns the number of
    /// removed nodes, 0 when `id` is unknown.
    pub fn delete_node(&mut self, id: &str) -> usize {
        let closure: HashSet<String> = self.subtree(id).into_iter().collect();
        if closure.is_empty() {
            debug!(node = %id, "delete of unknown node ignored");
            return 0;
        }
        let parent = self.find_parent(id).and_then(|l| l.parent);

        self.index.order.retain(|key| !closure.contains(key));
        self.index.nodes.retain(|key, _| !closure.contains(key));
        self.index.roots.retain(|key| !closure.contains(key));
        self.index.children.retain(|key, list| {
            if closure.contains(key) {
                return false;
            }
            list.retain(|child| !closure.contains(child));
            !list.is_empty()
        });
        if let Some(parent) = parent {
            self.unlink_child(&parent, id);
        }
        self.created_links.retain(|key| !closure.contains(key));
        if self.selected.as_ref().is_some_and(|s| closure.contains(s)) {
            self.selected = None;
        }
        info!(node = %id, removed = closure.len(), "deleted subtree");
        closure.len()
    }

    /// Rewrites the flat order as a depth-first walk of the tree.
    ///
    /// Keys reached in the tree without a node are logged and skipped;
    /// nodes the walk does not reach keep their relative order at the end.
    pub fn reorder(&mut self) {
        let mut order = Vec::with_capacity(self.index.order.len());
        for key in self.ordered_ids() {
            if self.index.nodes.contains_key(&key) {
                order.push(key);
            } else {
                warn!(node = %key, "orphan id in tree structure, skipping");
            }
        }
        let placed: HashSet<&String> = order.iter().collect();
        let unreached: Vec<String> = self
            .index
            .order
            .iter()
            .filter(|key| !placed.contains(key) && self.index.nodes.contains_key(*key))
            .cloned()
            .collect();
        for key in &unreached {
            warn!(node = %key, "node not reachable from any root, keeping it at the end");
        }
        order.extend(unreached);
        self.index.order = order;
    }

    /// Suggests an unused id for a new child of `parent` (or a new root).
    ///
    /// Integer groups continue at the highest integer plus one; text groups
    /// follow their dominant `prefix + zero-padded number` pattern.
    pub fn suggest_child_id(&self, parent: Option<&str>) -> Option<Identifier> {
        let siblings: &[String] = match parent {
            Some(p) => self.children(p),
            None => self.roots(),
        };
        let ids: Vec<Identifier> = siblings
            .iter()
            .filter_map(|key| self.node(key))
            .map(|node| node.id.clone())
            .collect();
        if ids.is_empty() {
            return None;
        }
        let candidate = if ids.iter().all(Identifier::is_int) {
            let max = ids
                .iter()
                .filter_map(|id| match id {
                    Identifier::Int(i) => Some(*i),
                    Identifier::Text(_) => None,
                })
                .max()?;
            Identifier::Int(max.checked_add(1)?)
        } else {
            next_prefixed_id(&ids)?
        };
        if self.contains(&candidate.key()) {
            return None;
        }
        Some(candidate)
    }

    /// Type of the existing sibling ids under `parent`, read from the parent
    /// payload's children list first.
    fn sibling_template(&self, parent: Option<&str>) -> Option<Identifier> {
        let parent = parent?;
        let from_payload = self.children_field().and_then(|field| {
            self.payload(parent)?
                .get(field)?
                .as_array()?
                .iter()
                .find_map(Identifier::from_value)
        });
        from_payload.or_else(|| {
            let first = self.children(parent).first()?;
            self.node(first).map(|n| n.id.clone())
        })
    }

    fn next_virtual_id(&self) -> Identifier {
        let mut next = self
            .index
            .nodes
            .values()
            .filter_map(|n| match n.id {
                Identifier::Int(i) => Some(i),
                Identifier::Text(_) => None,
            })
            .max()
            .map_or(0, |max| max + 1);
        while self.contains(&next.to_string()) {
            next += 1;
        }
        Identifier::Int(next)
    }

    fn insertion_position(&self, parent: Option<&str>) -> usize {
        let anchors: Vec<String> = match parent {
            Some(p) => self.subtree(p),
            None => match self.index.roots.last() {
                Some(last) => self.subtree(last),
                None => Vec::new(),
            },
        };
        let anchors: HashSet<&String> = anchors.iter().collect();
        self.index
            .order
            .iter()
            .rposition(|key| anchors.contains(key))
            .map_or(self.index.order.len(), |i| i + 1)
    }
}
