//! Key-role contract and session settings.
//!
//! Which field holds the identifier, the children list, the depth and the
//! display label is decided outside this crate. A host hands the decision
//! over as a [`TreeKeys`], typically deserialized from JSON:
//!
//! ```
//! use json_tree::TreeKeys;
//!
//! let keys: TreeKeys = serde_json::from_str(r#"{"identifier_key": "id", "children_key": "kids"}"#).unwrap();
//! assert_eq!(keys, TreeKeys::new("id").with_children("kids"));
//! ```

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeKeys {
    /// Field holding each node's identifier. `None` selects the flat
    /// fallback where every element is a root with a positional id.
    pub identifier_key: Option<String>,
    /// Field holding a list of child identifiers.
    pub children_key: Option<String>,
    /// Field holding a numeric nesting depth.
    pub depth_key: Option<String>,
    /// Field used as display label.
    pub label_key: Option<String>,
}

impl TreeKeys {
    pub fn new(identifier_key: impl Into<String>) -> Self {
        Self {
            identifier_key: Some(identifier_key.into()),
            ..Self::default()
        }
    }

    /// Keys for the flat fallback: no identifier field.
    pub fn flat() -> Self {
        Self::default()
    }

    pub fn with_children(mut self, key: impl Into<String>) -> Self {
        self.children_key = Some(key.into());
        self
    }

    pub fn with_depth(mut self, key: impl Into<String>) -> Self {
        self.depth_key = Some(key.into());
        self
    }

    pub fn with_label(mut self, key: impl Into<String>) -> Self {
        self.label_key = Some(key.into());
        self
    }

    /// True when `field` is one of the identifier, children or depth keys.
    pub fn is_structural(&self, field: &str) -> bool {
        [&self.identifier_key, &self.children_key, &self.depth_key]
            .into_iter()
            .any(|key| key.as_deref() == Some(field))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionOptions {
    /// Renumber the affected sibling groups after every successful drop.
    pub auto_realign: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self { auto_realign: true }
    }
}
