//! Drag-and-drop moves.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::TreeError;
use crate::identifier::Identifier;
use crate::session::TreeSession;

/// Where a dragged node lands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DropTarget {
    /// Into the sibling list of `before`, just ahead of it. With no
    /// `before`, at the end of `parent`'s list (the root list when `parent`
    /// is also absent).
    Sibling {
        #[serde(default, rename = "beforeId", skip_serializing_if = "Option::is_none")]
        before: Option<Identifier>,
        #[serde(default, rename = "parentId", skip_serializing_if = "Option::is_none")]
        parent: Option<Identifier>,
    },
    /// As the last child of `parent`.
    Parent {
        #[serde(rename = "parentId")]
        parent: Identifier,
    },
}

impl DropTarget {
    pub fn into_parent(parent: impl Into<Identifier>) -> Self {
        DropTarget::Parent { parent: parent.into() }
    }

    pub fn before(sibling: impl Into<Identifier>) -> Self {
        DropTarget::Sibling {
            before: Some(sibling.into()),
            parent: None,
        }
    }

    /// Last position of `parent`'s children, or of the roots.
    pub fn last_under(parent: Option<Identifier>) -> Self {
        DropTarget::Sibling { before: None, parent }
    }
}

/// A drop as delivered by a host UI:
/// `{"draggedId": 4, "target": {"kind": "parent", "parentId": 1}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropEvent {
    #[serde(rename = "draggedId")]
    pub dragged: Identifier,
    pub target: DropTarget,
}

/// Result of a successful move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveOutcome {
    /// Key of the moved node after any realignment.
    pub node: String,
    /// The new parent, `None` for the root list.
    pub parent: Option<String>,
    /// `(old, new)` keys changed by realignment of the target group, then
    /// of the old group.
    pub renamed: Vec<(String, String)>,
}

impl TreeSession {
    /// Moves `id` (with its subtree) to `target`.
    ///
    /// Self drops and drops into the node's own subtree are refused before
    /// anything changes. After the move the depth fields of the subtree are
    /// recomputed, the flat array is reordered, and with
    /// [`SessionOptions::auto_realign`](crate::SessionOptions) the target
    /// sibling group (and the old one, when different) is realigned.
    pub fn move_node(&mut self, id: &str, target: &DropTarget) -> Result<MoveOutcome, TreeError> {
        let (parent, before) = match self.check_drop(id, target) {
            Ok(placement) => placement,
            Err(err) => {
                warn!(node = %id, error = %err, "drop rejected");
                return Err(err);
            }
        };
        let origin = self
            .find_parent(id)
            .ok_or_else(|| TreeError::InvariantViolation(format!("node {id:?} has no place in the tree")))?;

        match &origin.parent {
            Some(old_parent) => {
                if let Some(list) = self.index.children.get_mut(old_parent) {
                    list.remove(origin.position);
                    if list.is_empty() {
                        self.index.children.shift_remove(old_parent);
                    }
                }
                self.unlink_child(old_parent, id);
            }
            None => {
                self.index.roots.remove(origin.position);
            }
        }

        let list = match &parent {
            Some(p) => self.index.children.entry(p.clone()).or_default(),
            None => &mut self.index.roots,
        };
        let at = before
            .as_deref()
            .and_then(|b| list.iter().position(|key| key == b))
            .unwrap_or(list.len());
        list.insert(at, id.to_string());
        if let Some(p) = &parent {
            self.link_child(p, id, before.as_deref());
        }

        self.refresh_depth(id);
        self.reorder();
        info!(node = %id, from = ?origin.parent, to = ?parent, "moved node");

        let mut outcome = MoveOutcome {
            node: id.to_string(),
            parent,
            renamed: Vec::new(),
        };
        if self.options.auto_realign {
            self.realign_after_move(&mut outcome, origin.parent);
        }
        Ok(outcome)
    }

    /// Applies a [`DropEvent`].
    pub fn apply_drop(&mut self, event: &DropEvent) -> Result<MoveOutcome, TreeError> {
        self.move_node(&event.dragged.key(), &event.target)
    }

    /// Resolves `target` to `(parent, before)` and runs every rejection
    /// check.
    fn check_drop(&self, id: &str, target: &DropTarget) -> Result<(Option<String>, Option<String>), TreeError> {
        if !self.contains(id) {
            return Err(TreeError::unknown(id));
        }
        let self_drop = || TreeError::SelfDrop { id: id.to_string() };
        let (parent, before) = match target {
            DropTarget::Parent { parent } => {
                let parent = parent.key();
                if parent == id {
                    return Err(self_drop());
                }
                (Some(parent), None)
            }
            DropTarget::Sibling { before: Some(before), .. } => {
                let before = before.key();
                if before == id {
                    return Err(self_drop());
                }
                let location = self.find_parent(&before).ok_or_else(|| TreeError::unknown(&before))?;
                (location.parent, Some(before))
            }
            DropTarget::Sibling { before: None, parent } => {
                let parent = parent.as_ref().map(Identifier::key);
                if parent.as_deref() == Some(id) {
                    return Err(self_drop());
                }
                (parent, None)
            }
        };
        if let Some(p) = &parent {
            if !self.contains(p) {
                return Err(TreeError::unknown(p));
            }
            if p == id || self.is_ancestor(id, p) {
                return Err(TreeError::Cycle {
                    node: id.to_string(),
                    target: p.clone(),
                });
            }
        }
        Ok((parent, before))
    }

    fn realign_after_move(&mut self, outcome: &mut MoveOutcome, old_parent: Option<String>) {
        let mut pending = (old_parent != outcome.parent).then_some(old_parent);
        let mut group = Some(outcome.parent.clone());
        while let Some(parent) = group.take() {
            match self.realign_group(parent.as_deref()) {
                Ok(batch) => {
                    remap(&mut outcome.node, &batch);
                    if let Some(p) = outcome.parent.as_mut() {
                        remap(p, &batch);
                    }
                    // The old group's parent may itself have been renamed.
                    if let Some(Some(p)) = pending.as_mut() {
                        remap(p, &batch);
                    }
                    outcome.renamed.extend(batch);
                }
                Err(err) => warn!(parent = ?parent, error = %err, "realignment after move failed"),
            }
            group = pending.take();
        }
    }
}

/// Applies one batch of simultaneous renames to `key`.
fn remap(key: &mut String, batch: &[(String, String)]) {
    if let Some((_, new)) = batch.iter().find(|(old, _)| old == key) {
        *key = new.clone();
    }
}
