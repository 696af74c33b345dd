//! Type definitions for path expressions.

use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use crate::parse::{parse_path, PathSyntaxError};

/// A single step of a path expression.
///
/// Either an object field name or a non-negative array index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathToken {
    /// Object member access: `name`, `.name`.
    Field(String),
    /// Array element access: `[0]`.
    Index(usize),
}

impl PathToken {
    /// Returns the index this token addresses when applied to an array.
    ///
    /// A field made only of ASCII digits doubles as an index, so `items.0`
    /// and `items[0]` address the same element.
    pub fn as_index(&self) -> Option<usize> {
        match self {
            PathToken::Index(idx) => Some(*idx),
            PathToken::Field(name) if is_integer(name) => name.parse().ok(),
            PathToken::Field(_) => None,
        }
    }

    pub fn is_index(&self) -> bool {
        matches!(self, PathToken::Index(_))
    }
}

impl fmt::Display for PathToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathToken::Field(name) => f.write_str(name),
            PathToken::Index(idx) => write!(f, "[{idx}]"),
        }
    }
}

impl From<&str> for PathToken {
    fn from(name: &str) -> Self {
        PathToken::Field(name.to_string())
    }
}

impl From<usize> for PathToken {
    fn from(idx: usize) -> Self {
        PathToken::Index(idx)
    }
}

/// A parsed path: an ordered sequence of [`PathToken`]s.
///
/// The empty expression addresses the root value itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct PathExpression {
    tokens: Vec<PathToken>,
}

impl PathExpression {
    /// The empty path, addressing the root.
    pub fn root() -> Self {
        Self { tokens: Vec::new() }
    }

    pub fn new(tokens: Vec<PathToken>) -> Self {
        Self { tokens }
    }

    /// Appends a field step.
    ///
    /// # Example
    ///
    /// ```
    /// use json_tree_path::PathExpression;
    ///
    /// let path = PathExpression::root().field("tags").index(2);
    /// assert_eq!(path.to_string(), "tags[2]");
    /// ```
    pub fn field(mut self, name: impl Into<String>) -> Self {
        self.tokens.push(PathToken::Field(name.into()));
        self
    }

    /// Appends an index step.
    pub fn index(mut self, idx: usize) -> Self {
        self.tokens.push(PathToken::Index(idx));
        self
    }

    pub fn tokens(&self) -> &[PathToken] {
        &self.tokens
    }

    pub fn into_tokens(self) -> Vec<PathToken> {
        self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Check if the path addresses the root value.
    pub fn is_root(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn first(&self) -> Option<&PathToken> {
        self.tokens.first()
    }

    pub fn last(&self) -> Option<&PathToken> {
        self.tokens.last()
    }

    /// The path of the container holding the addressed value.
    ///
    /// Returns `None` for the root path.
    pub fn parent(&self) -> Option<PathExpression> {
        if self.tokens.is_empty() {
            return None;
        }
        Some(Self {
            tokens: self.tokens[..self.tokens.len() - 1].to_vec(),
        })
    }

    /// Check if `self` is a strict prefix of `other`.
    pub fn is_prefix_of(&self, other: &PathExpression) -> bool {
        self.tokens.len() < other.tokens.len() && other.tokens.starts_with(&self.tokens)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PathToken> {
        self.tokens.iter()
    }
}

impl fmt::Display for PathExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, token) in self.tokens.iter().enumerate() {
            if i > 0 && !token.is_index() {
                f.write_str(".")?;
            }
            write!(f, "{token}")?;
        }
        Ok(())
    }
}

impl FromStr for PathExpression {
    type Err = PathSyntaxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_path(s)
    }
}

impl From<Vec<PathToken>> for PathExpression {
    fn from(tokens: Vec<PathToken>) -> Self {
        Self { tokens }
    }
}

impl<'a> IntoIterator for &'a PathExpression {
    type Item = &'a PathToken;
    type IntoIter = std::slice::Iter<'a, PathToken>;

    fn into_iter(self) -> Self::IntoIter {
        self.tokens.iter()
    }
}

/// A resolved location inside a document: the mutable container plus the
/// key or index of the addressed value inside it.
///
/// Returned by [`crate::get_with_reference`] so a caller can read and replace
/// the value without walking the path a second time.
#[derive(Debug)]
pub struct PathReference<'a> {
    /// The object or array containing the addressed value.
    pub parent: &'a mut Value,
    /// Key (objects) or index (arrays) of the addressed value. Digit-only
    /// fields used on arrays are normalised to [`PathToken::Index`].
    pub key: PathToken,
}

impl PathReference<'_> {
    pub fn is_array_reference(&self) -> bool {
        self.parent.is_array()
    }

    pub fn is_object_reference(&self) -> bool {
        self.parent.is_object()
    }

    /// The addressed value.
    pub fn value(&self) -> Option<&Value> {
        match (&*self.parent, &self.key) {
            (Value::Object(map), PathToken::Field(name)) => map.get(name),
            (Value::Array(arr), PathToken::Index(idx)) => arr.get(*idx),
            _ => None,
        }
    }

    pub fn value_mut(&mut self) -> Option<&mut Value> {
        match (&mut *self.parent, &self.key) {
            (Value::Object(map), PathToken::Field(name)) => map.get_mut(name),
            (Value::Array(arr), PathToken::Index(idx)) => arr.get_mut(*idx),
            _ => None,
        }
    }

    /// Replaces the addressed value in place, returning the previous one.
    pub fn replace(&mut self, value: Value) -> Option<Value> {
        self.value_mut().map(|slot| std::mem::replace(slot, value))
    }
}

/// Check if a string consists only of ASCII digits.
pub fn is_integer(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}
