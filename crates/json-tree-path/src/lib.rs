//! Path expressions for addressing values inside JSON documents.
//!
//! A path is written as dotted field names with bracketed array indices,
//! e.g. `address.lines[1]` or `tags[0].label`. This crate parses such strings
//! into a [`PathExpression`] and reads or writes the addressed value.
//!
//! # Example
//!
//! ```
//! use json_tree_path::{get, parse_path, set};
//! use serde_json::json;
//!
//! let mut doc = json!({"name": "root"});
//! let path = parse_path("meta.tags[1]").unwrap();
//!
//! // Missing containers are created on write
//! set(&mut doc, &path, json!("beta")).unwrap();
//! assert_eq!(doc, json!({"name": "root", "meta": {"tags": [null, "beta"]}}));
//!
//! assert_eq!(get(&doc, &path).unwrap(), &json!("beta"));
//! ```

use serde_json::{Map, Value};
use thiserror::Error;

pub mod types;
pub use types::{is_integer, PathExpression, PathReference, PathToken};

pub mod parse;
pub use parse::{parse_path, PathSyntaxError};

pub mod validate;
pub use validate::{
    validate_expression, validate_path_string, MAX_ARRAY_PADDING, MAX_PATH_DEPTH, MAX_PATH_LENGTH,
};

/// The document does not contain the addressed location.
///
/// `depth` is the zero-based position of the failing token in the path.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathResolutionError {
    #[error("key {key:?} not found at step {depth}")]
    MissingKey { key: String, depth: usize },
    #[error("index {index} out of range for array of length {len} at step {depth}")]
    IndexOutOfRange {
        index: usize,
        len: usize,
        depth: usize,
    },
    #[error("index {index} is too far past the end of an array of length {len} at step {depth}")]
    IndexTooLarge {
        index: usize,
        len: usize,
        depth: usize,
    },
    #[error("cannot apply index {index} to an object at step {depth}")]
    NotAnArray { index: usize, depth: usize },
    #[error("cannot access {token} on a {found} value at step {depth}")]
    NotAContainer {
        token: String,
        found: &'static str,
        depth: usize,
    },
    #[error("the root path has no parent container")]
    EmptyPath,
}

/// Any failure from the string-based convenience functions.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error(transparent)]
    Syntax(#[from] PathSyntaxError),
    #[error(transparent)]
    Resolution(#[from] PathResolutionError),
}

/// Format a path expression back into its string form.
///
/// # Example
///
/// ```
/// use json_tree_path::{format_path, parse_path};
///
/// let path = parse_path("a.b[0].c").unwrap();
/// assert_eq!(format_path(&path), "a.b[0].c");
/// ```
pub fn format_path(path: &PathExpression) -> String {
    path.to_string()
}

/// Name of a value's JSON type, for error messages.
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn step<'a>(
    current: &'a Value,
    token: &PathToken,
    depth: usize,
) -> Result<&'a Value, PathResolutionError> {
    match current {
        Value::Object(map) => match token {
            PathToken::Field(key) => map.get(key).ok_or_else(|| PathResolutionError::MissingKey {
                key: key.clone(),
                depth,
            }),
            PathToken::Index(index) => Err(PathResolutionError::NotAnArray {
                index: *index,
                depth,
            }),
        },
        Value::Array(arr) => {
            let index = token.as_index().ok_or_else(|| not_a_container(current, token, depth))?;
            arr.get(index).ok_or(PathResolutionError::IndexOutOfRange {
                index,
                len: arr.len(),
                depth,
            })
        }
        _ => Err(not_a_container(current, token, depth)),
    }
}

fn step_mut<'a>(
    current: &'a mut Value,
    token: &PathToken,
    depth: usize,
) -> Result<&'a mut Value, PathResolutionError> {
    match current {
        Value::Object(map) => match token {
            PathToken::Field(key) => {
                map.get_mut(key)
                    .ok_or_else(|| PathResolutionError::MissingKey {
                        key: key.clone(),
                        depth,
                    })
            }
            PathToken::Index(index) => Err(PathResolutionError::NotAnArray {
                index: *index,
                depth,
            }),
        },
        Value::Array(arr) => {
            let Some(index) = token.as_index() else {
                return Err(PathResolutionError::NotAContainer {
                    token: token.to_string(),
                    found: "array",
                    depth,
                });
            };
            let len = arr.len();
            arr.get_mut(index)
                .ok_or(PathResolutionError::IndexOutOfRange { index, len, depth })
        }
        other => Err(not_a_container(other, token, depth)),
    }
}

fn not_a_container(value: &Value, token: &PathToken, depth: usize) -> PathResolutionError {
    PathResolutionError::NotAContainer {
        token: token.to_string(),
        found: type_name(value),
        depth,
    }
}

/// Get a value from a JSON document by path.
///
/// # Errors
///
/// Returns a [`PathResolutionError`] when an intermediate key is absent, an
/// index is out of range, or a token addresses a scalar.
///
/// # Example
///
/// ```
/// use json_tree_path::{get, parse_path, PathResolutionError};
/// use serde_json::json;
///
/// let doc = json!({"a": {"b": [10, 20]}});
/// assert_eq!(get(&doc, &parse_path("a.b[1]").unwrap()), Ok(&json!(20)));
/// assert!(matches!(
///     get(&doc, &parse_path("a.c").unwrap()),
///     Err(PathResolutionError::MissingKey { .. })
/// ));
/// ```
pub fn get<'a>(root: &'a Value, path: &PathExpression) -> Result<&'a Value, PathResolutionError> {
    let mut current = root;
    for (depth, token) in path.iter().enumerate() {
        current = step(current, token, depth)?;
    }
    Ok(current)
}

/// Get a mutable reference to a value in a JSON document by path.
pub fn get_mut<'a>(
    root: &'a mut Value,
    path: &PathExpression,
) -> Result<&'a mut Value, PathResolutionError> {
    resolve_mut(root, path.tokens())
}

fn resolve_mut<'a>(
    root: &'a mut Value,
    tokens: &[PathToken],
) -> Result<&'a mut Value, PathResolutionError> {
    let mut current = root;
    for (depth, token) in tokens.iter().enumerate() {
        current = step_mut(current, token, depth)?;
    }
    Ok(current)
}

/// Resolve a path and return the containing value plus the terminal key.
///
/// Same traversal as [`get`]; the returned [`PathReference`] lets the caller
/// replace the value without walking the path again.
///
/// # Example
///
/// ```
/// use json_tree_path::{get_with_reference, parse_path, PathToken};
/// use serde_json::json;
///
/// let mut doc = json!({"items": [{"qty": 1}]});
/// let path = parse_path("items[0].qty").unwrap();
/// let mut reference = get_with_reference(&mut doc, &path).unwrap();
/// assert_eq!(reference.key, PathToken::Field("qty".into()));
/// reference.replace(json!(5));
/// assert_eq!(doc, json!({"items": [{"qty": 5}]}));
/// ```
pub fn get_with_reference<'a>(
    root: &'a mut Value,
    path: &PathExpression,
) -> Result<PathReference<'a>, PathResolutionError> {
    let Some((last, init)) = path.tokens().split_last() else {
        return Err(PathResolutionError::EmptyPath);
    };
    let parent = resolve_mut(root, init)?;
    let depth = init.len();
    step(parent, last, depth)?;

    let key = match (&*parent, last) {
        (Value::Array(_), token) => match token.as_index() {
            Some(index) => PathToken::Index(index),
            None => last.clone(),
        },
        _ => last.clone(),
    };
    Ok(PathReference { parent, key })
}

/// Set a value in a JSON document by path, creating what is missing.
///
/// Missing intermediate containers are created as arrays when the next token
/// is an index and as objects otherwise; a `null` in the way is replaced the
/// same way. Arrays shorter than an addressed index are padded with `null`.
/// An empty path replaces the root. Returns the previous value, if any.
///
/// # Errors
///
/// Fails with [`PathResolutionError::NotAContainer`] when the walk runs into
/// a scalar, [`PathResolutionError::NotAnArray`] when an index step meets
/// an object, and [`PathResolutionError::IndexTooLarge`] when reaching an
/// index would append more than [`MAX_ARRAY_PADDING`] placeholders. An index
/// refused for its size leaves `root` unchanged.
pub fn set(
    root: &mut Value,
    path: &PathExpression,
    value: Value,
) -> Result<Option<Value>, PathResolutionError> {
    let Some((last, init)) = path.tokens().split_last() else {
        return Ok(Some(std::mem::replace(root, value)));
    };
    check_padding(root, path)?;

    let mut current = root;
    for (depth, token) in init.iter().enumerate() {
        let next_is_index = path.tokens()[depth + 1].is_index();
        current = descend_or_create(current, token, next_is_index, depth)?;
    }
    assign(current, last, value, init.len())
}

fn empty_container(as_array: bool) -> Value {
    if as_array {
        Value::Array(Vec::new())
    } else {
        Value::Object(Map::new())
    }
}

fn descend_or_create<'a>(
    current: &'a mut Value,
    token: &PathToken,
    next_is_index: bool,
    depth: usize,
) -> Result<&'a mut Value, PathResolutionError> {
    if current.is_null() {
        *current = empty_container(token.is_index());
    }
    let slot = match current {
        Value::Object(map) => match token {
            PathToken::Field(key) => map.entry(key.clone()).or_insert(Value::Null),
            PathToken::Index(index) => {
                return Err(PathResolutionError::NotAnArray {
                    index: *index,
                    depth,
                })
            }
        },
        Value::Array(arr) => {
            let Some(index) = token.as_index() else {
                return Err(PathResolutionError::NotAContainer {
                    token: token.to_string(),
                    found: "array",
                    depth,
                });
            };
            pad(arr, index, depth)?;
            &mut arr[index]
        }
        other => return Err(not_a_container(other, token, depth)),
    };
    if slot.is_null() {
        *slot = empty_container(next_is_index);
    }
    Ok(slot)
}

/// Refuses, before anything is written, an index that would need more than
/// [`MAX_ARRAY_PADDING`] placeholders.
fn check_padding(root: &Value, path: &PathExpression) -> Result<(), PathResolutionError> {
    for (depth, token) in path.tokens().iter().enumerate() {
        let Some(index) = token.as_index().filter(|i| *i > MAX_ARRAY_PADDING) else {
            continue;
        };
        let prefix = PathExpression::new(path.tokens()[..depth].to_vec());
        // A missing or null container is created as an array for index tokens.
        let len = match get(root, &prefix) {
            Ok(Value::Array(arr)) => arr.len(),
            Ok(Value::Null) | Err(_) if token.is_index() => 0,
            _ => continue,
        };
        if index >= len && index - len > MAX_ARRAY_PADDING {
            return Err(PathResolutionError::IndexTooLarge { index, len, depth });
        }
    }
    Ok(())
}

/// Grows `arr` with `null` so that `index` is in bounds.
fn pad(arr: &mut Vec<Value>, index: usize, depth: usize) -> Result<(), PathResolutionError> {
    let len = arr.len();
    if index < len {
        return Ok(());
    }
    let too_large = || PathResolutionError::IndexTooLarge { index, len, depth };
    if index - len > MAX_ARRAY_PADDING {
        return Err(too_large());
    }
    arr.resize(index.checked_add(1).ok_or_else(too_large)?, Value::Null);
    Ok(())
}

fn assign(
    current: &mut Value,
    token: &PathToken,
    value: Value,
    depth: usize,
) -> Result<Option<Value>, PathResolutionError> {
    if current.is_null() {
        *current = empty_container(token.is_index());
    }
    match current {
        Value::Object(map) => match token {
            PathToken::Field(key) => Ok(map.insert(key.clone(), value)),
            PathToken::Index(index) => Err(PathResolutionError::NotAnArray {
                index: *index,
                depth,
            }),
        },
        Value::Array(arr) => {
            let Some(index) = token.as_index() else {
                return Err(PathResolutionError::NotAContainer {
                    token: token.to_string(),
                    found: "array",
                    depth,
                });
            };
            if arr.len() <= index {
                pad(arr, index, depth)?;
                arr[index] = value;
                Ok(None)
            } else {
                Ok(Some(std::mem::replace(&mut arr[index], value)))
            }
        }
        other => Err(not_a_container(other, token, depth)),
    }
}

/// Parse `path` and get the addressed value.
pub fn get_by_path<'a>(root: &'a Value, path: &str) -> Result<&'a Value, PathError> {
    let path = parse_path(path)?;
    Ok(get(root, &path)?)
}

/// Parse `path` and set the addressed value. See [`set`].
pub fn set_by_path(root: &mut Value, path: &str, value: Value) -> Result<Option<Value>, PathError> {
    let path = parse_path(path)?;
    Ok(set(root, &path, value)?)
}
