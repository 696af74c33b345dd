//! Sibling id realignment and the rename primitive.
//!
//! A sibling group is split by id prefix (`item3` has prefix `item`, the
//! integer `3` has the empty prefix) and each prefix group of two or more is
//! renumbered `1..=n` in display order. Children whose ids embed a renamed
//! parent id (`1-2` under `1`) follow the parent's new id.
//!
//! The complete rename plan is computed and checked for collisions before
//! anything changes. It is then applied in two passes: every renamed node is
//! first moved to a temporary key that no live node uses, and only then to
//! its final key, so no two nodes ever share a key in between.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::TreeError;
use crate::identifier::Identifier;
use crate::session::{entry_key, TreeSession};

#[derive(Debug, Clone)]
struct PlannedRename {
    old: String,
    new: Identifier,
    /// Prefix of the group that caused the rename, used to name the
    /// temporary key.
    group: String,
}

impl TreeSession {
    /// Renumbers the children of `parent` (the roots for `None`) and returns
    /// how many ids changed.
    ///
    /// # Errors
    ///
    /// [`TreeError::UnknownNode`] for an unknown parent and
    /// [`TreeError::DuplicateIdentifier`] when a new id would collide with a
    /// node outside the plan. Either way nothing is renamed.
    pub fn realign(&mut self, parent: Option<&str>) -> Result<usize, TreeError> {
        Ok(self.realign_group(parent)?.len())
    }

    /// Like [`TreeSession::realign`], returning the applied `(old, new)` key
    /// pairs.
    pub(crate) fn realign_group(&mut self, parent: Option<&str>) -> Result<Vec<(String, String)>, TreeError> {
        let siblings: Vec<String> = match parent {
            Some(p) if !self.contains(p) => return Err(TreeError::unknown(p)),
            Some(p) => self.children(p).to_vec(),
            None => self.index.roots.clone(),
        };
        if siblings.len() < 2 {
            return Ok(Vec::new());
        }

        let mut plan = Vec::new();
        for (prefix, members) in self.prefix_groups(&siblings) {
            if members.len() < 2 {
                continue;
            }
            for (i, old) in members.iter().enumerate() {
                let Some(node) = self.node(old) else { continue };
                let n = i as i64 + 1;
                let fresh = if prefix.is_empty() {
                    Identifier::Int(n)
                } else {
                    Identifier::Text(format!("{prefix}{n}"))
                };
                let new = fresh.coerce_like(&node.id);
                let new_key = new.key();
                if new_key == *old {
                    continue;
                }
                plan.push(PlannedRename {
                    old: old.clone(),
                    new,
                    group: prefix.clone(),
                });
                self.plan_descendants(old, &new_key, &prefix, &mut plan);
            }
        }
        if plan.is_empty() {
            debug!(parent = ?parent, "sibling ids already aligned");
            return Ok(Vec::new());
        }

        self.check_plan(&plan)?;
        let applied = self.apply_plan(&plan);
        info!(parent = ?parent, renamed = applied.len(), "realigned sibling ids");
        Ok(applied)
    }

    /// Renames a single node, updating every structure that refers to it.
    ///
    /// `new` is converted to the type of the current id when possible.
    /// Returns the new key.
    pub fn rename_node(&mut self, old: &str, new: Identifier) -> Result<String, TreeError> {
        let Some(node) = self.node(old) else {
            return Err(TreeError::unknown(old));
        };
        let new = new.coerce_like(&node.id);
        let plan = [PlannedRename {
            old: old.to_string(),
            new,
            group: String::new(),
        }];
        self.check_plan(&plan)?;
        self.apply_plan(&plan);
        let key = plan[0].new.key();
        info!(old = %old, new = %key, "renamed node");
        Ok(key)
    }

    /// Groups sibling keys by id prefix, keeping display order. Ids without
    /// a numeric suffix are left out.
    fn prefix_groups(&self, siblings: &[String]) -> IndexMap<String, Vec<String>> {
        let mut groups: IndexMap<String, Vec<String>> = IndexMap::new();
        for key in siblings {
            let Some(split) = self.node(key).and_then(|n| n.id.split_numeric_suffix()) else {
                debug!(node = %key, "id has no numeric suffix, not realigned");
                continue;
            };
            groups.entry(split.prefix).or_default().push(key.clone());
        }
        groups
    }

    /// Plans renames for children whose ids start with `old` followed by a
    /// non-digit, recursively.
    fn plan_descendants(&self, old: &str, new_key: &str, group: &str, plan: &mut Vec<PlannedRename>) {
        for child in self.children(old) {
            let Some(rest) = child.strip_prefix(old) else { continue };
            if rest.is_empty() || rest.starts_with(|c: char| c.is_ascii_digit()) {
                continue;
            }
            let Some(node) = self.node(child) else { continue };
            let child_key = format!("{new_key}{rest}");
            plan.push(PlannedRename {
                old: child.clone(),
                new: Identifier::Text(child_key.clone()).coerce_like(&node.id),
                group: group.to_string(),
            });
            self.plan_descendants(child, &child_key, group, plan);
        }
    }

    fn check_plan(&self, plan: &[PlannedRename]) -> Result<(), TreeError> {
        let leaving: HashSet<&str> = plan.iter().map(|r| r.old.as_str()).collect();
        let mut taken = HashSet::with_capacity(plan.len());
        for rename in plan {
            if !self.contains(&rename.old) {
                return Err(TreeError::unknown(&rename.old));
            }
            let key = rename.new.key();
            let collides = self.contains(&key) && !leaving.contains(key.as_str());
            if collides || !taken.insert(key.clone()) {
                return Err(TreeError::DuplicateIdentifier { id: key });
            }
        }
        Ok(())
    }

    /// Applies a checked plan and returns the `(old, new)` key pairs.
    fn apply_plan(&mut self, plan: &[PlannedRename]) -> Vec<(String, String)> {
        let finals: HashSet<String> = plan.iter().map(|r| r.new.key()).collect();
        let mut to_temp = HashMap::with_capacity(plan.len());
        let mut to_final = HashMap::with_capacity(plan.len());
        for (i, rename) in plan.iter().enumerate() {
            let mut temp = format!("__temp_{}_{i}", rename.group);
            while self.contains(&temp) || to_final.contains_key(&temp) || finals.contains(&temp) {
                temp.push('_');
            }
            to_temp.insert(rename.old.clone(), temp.clone());
            to_final.insert(temp, rename.new.key());
        }

        self.rekey(&to_temp);
        self.rekey(&to_final);

        let id_field = self.id_field().map(str::to_string);
        for rename in plan {
            let Some(node) = self.index.nodes.get_mut(&rename.new.key()) else {
                continue;
            };
            node.id = rename.new.clone();
            if let (Some(field), Some(map)) = (&id_field, node.payload.as_object_mut()) {
                map.insert(field.clone(), rename.new.to_value());
            }
        }

        let by_old: HashMap<&str, &Identifier> = plan.iter().map(|r| (r.old.as_str(), &r.new)).collect();
        self.relink_payloads(&by_old);
        debug!(count = plan.len(), "applied id renames");
        plan.iter().map(|r| (r.old.clone(), r.new.key())).collect()
    }

    /// Replaces keys in the node map, children map, root list, flat order
    /// and selection.
    fn rekey(&mut self, mapping: &HashMap<String, String>) {
        let map = |key: String| mapping.get(&key).cloned().unwrap_or(key);
        let index = &mut self.index;
        index.nodes = std::mem::take(&mut index.nodes)
            .into_iter()
            .map(|(key, node)| (map(key), node))
            .collect();
        index.children = std::mem::take(&mut index.children)
            .into_iter()
            .map(|(key, list)| (map(key), list.into_iter().map(map).collect()))
            .collect();
        for key in index.roots.iter_mut().chain(index.order.iter_mut()) {
            if let Some(new) = mapping.get(key) {
                *key = new.clone();
            }
        }
        self.selected = self.selected.take().map(map);
        self.created_links = std::mem::take(&mut self.created_links).into_iter().map(map).collect();
    }

    /// Rewrites entries of payload children lists, keeping each entry's
    /// JSON type where the new id allows it.
    fn relink_payloads(&mut self, by_old: &HashMap<&str, &Identifier>) {
        let Some(field) = self.children_field().map(str::to_string) else {
            return;
        };
        for node in self.index.nodes.values_mut() {
            let Some(Value::Array(list)) = node.payload.get_mut(&field) else {
                continue;
            };
            for entry in list.iter_mut() {
                let Some(current) = Identifier::from_value(entry) else { continue };
                if let Some(new) = entry_key(entry).and_then(|key| by_old.get(key.as_str()).copied()) {
                    *entry = new.coerce_like(&current).to_value();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::TreeKeys;
    use serde_json::json;

    fn roots_session(raw: Value) -> TreeSession {
        TreeSession::from_value(raw, TreeKeys::new("id").with_children("children")).unwrap()
    }

    #[test]
    fn test_integer_roots_follow_display_order() {
        let mut s = roots_session(json!([{"id": 3}, {"id": 1}, {"id": 2}]));
        assert_eq!(s.realign(None).unwrap(), 3);
        assert_eq!(s.roots(), ["1", "2", "3"]);
        assert_eq!(Value::Array(s.raw_array()), json!([{"id": 1}, {"id": 2}, {"id": 3}]));
        s.validate_invariants().unwrap();
    }

    #[test]
    fn test_unchanged_ids_are_not_counted() {
        let mut s = roots_session(json!([{"id": 1}, {"id": 5}]));
        assert_eq!(s.realign(None).unwrap(), 1);
        assert_eq!(s.roots(), ["1", "2"]);
        assert_eq!(s.realign(None).unwrap(), 0);
    }

    #[test]
    fn test_text_ids_keep_type() {
        let mut s = roots_session(json!([{"id": "7"}, {"id": "4"}]));
        s.realign(None).unwrap();
        assert_eq!(s.payload("1").unwrap()["id"], json!("1"));
        assert_eq!(s.payload("2").unwrap()["id"], json!("2"));
    }

    #[test]
    fn test_ids_without_suffix_untouched() {
        let mut s = roots_session(json!([{"id": "alpha"}, {"id": "x9"}, {"id": "x3"}]));
        assert_eq!(s.realign(None).unwrap(), 2);
        assert_eq!(s.roots(), ["alpha", "x1", "x2"]);
    }

    #[test]
    fn test_payload_links_and_selection_follow() {
        let mut s = roots_session(json!([
            {"id": "p", "children": [20, 10]},
            {"id": 20},
            {"id": 10}
        ]));
        s.select("10").unwrap();
        assert_eq!(s.realign(Some("p")).unwrap(), 2);
        assert_eq!(s.children("p"), ["1", "2"]);
        assert_eq!(s.payload("p").unwrap()["children"], json!([1, 2]));
        assert_eq!(s.selected(), Some("2"));
        s.validate_invariants().unwrap();
    }

    #[test]
    fn test_cascade_to_embedded_prefix() {
        let mut s = roots_session(json!([
            {"id": "n2", "children": ["n2-1", "n2-2"]},
            {"id": "n2-1", "children": ["n2-1.a"]},
            {"id": "n2-1.a"},
            {"id": "n2-2"},
            {"id": "n5", "children": ["n50"]},
            {"id": "n50"}
        ]));
        assert_eq!(s.realign(None).unwrap(), 5);
        assert_eq!(s.roots(), ["n1", "n2"]);
        assert_eq!(s.children("n1"), ["n1-1", "n1-2"]);
        assert_eq!(s.children("n1-1"), ["n1-1.a"]);
        // `n50` does not embed `n5` followed by a separator.
        assert_eq!(s.children("n2"), ["n50"]);
        assert_eq!(s.payload("n1").unwrap()["children"], json!(["n1-1", "n1-2"]));
        s.validate_invariants().unwrap();
    }

    #[test]
    fn test_collision_outside_plan_rejected_without_change() {
        // n3 -> n1 carries its child n3-a to n1-a, which a root already uses.
        let mut s = roots_session(json!([
            {"id": "n1-a"},
            {"id": "n3", "children": ["n3-a"]},
            {"id": "n3-a"},
            {"id": "n4"}
        ]));
        let before = s.raw_array();
        assert_eq!(
            s.realign(None),
            Err(TreeError::DuplicateIdentifier { id: "n1-a".into() })
        );
        assert_eq!(s.raw_array(), before);
        s.validate_invariants().unwrap();
    }

    #[test]
    fn test_rename_node() {
        let mut s = roots_session(json!([{"id": 1, "children": [2]}, {"id": 2}]));
        assert_eq!(s.rename_node("2", Identifier::Text("9".into())).unwrap(), "9");
        assert_eq!(s.payload("9").unwrap()["id"], json!(9));
        assert_eq!(s.payload("1").unwrap()["children"], json!([9]));
        assert_eq!(
            s.rename_node("9", Identifier::Int(1)),
            Err(TreeError::DuplicateIdentifier { id: "1".into() })
        );
        assert!(matches!(s.rename_node("4", Identifier::Int(5)), Err(TreeError::UnknownNode { .. })));
        s.validate_invariants().unwrap();
    }
}
