//! Tree index and mutation engine for flat arrays of JSON objects.
//!
//! A [`TreeSession`] derives a parent/child tree from an array plus the
//! names of its identifier, children, depth and label fields ([`TreeKeys`]),
//! then keeps the array, node map, children map and root list consistent
//! across adds, cascading deletes, drag-and-drop moves, id renames and
//! sibling id realignment.
//!
//! # Example
//!
//! ```
//! use json_tree::{DropTarget, TreeKeys, TreeSession};
//! use serde_json::json;
//!
//! let raw = json!([
//!     {"id": "step1", "children": ["step1-a"]},
//!     {"id": "step1-a"},
//!     {"id": "step2"},
//!     {"id": "step3"}
//! ]);
//! let keys = TreeKeys::new("id").with_children("children");
//! let mut session = TreeSession::from_value(raw, keys).unwrap();
//!
//! // Moving the first step to the end renumbers the steps in their new
//! // order; the child id follows its parent.
//! let outcome = session.move_node("step1", &DropTarget::last_under(None)).unwrap();
//! assert_eq!(outcome.node, "step3");
//! assert_eq!(session.roots(), ["step1", "step2", "step3"]);
//! assert_eq!(session.children("step3"), ["step3-a"]);
//! assert_eq!(session.payload("step3").unwrap()["children"], json!(["step3-a"]));
//! session.validate_invariants().unwrap();
//! ```

pub mod cli;
mod error;
mod fields;
mod identifier;
mod index;
mod keys;
mod mutate;
mod realign;
mod reparent;
mod session;

pub use error::TreeError;
pub use fields::{convert_like, infer_value};
pub use identifier::{next_prefixed_id, Identifier, NumericSuffix};
pub use index::{IndexMode, Node, TreeIndex, TreeIndexBuilder};
pub use keys::{SessionOptions, TreeKeys};
pub use reparent::{DropEvent, DropTarget, MoveOutcome};
pub use session::{Location, TreeSession};

pub use json_tree_path as path;
