//! Path-addressed field edits on node payloads.

use json_tree_path::{get, parse_path, set, PathError, PathToken};
use serde_json::Value;

use crate::error::TreeError;
use crate::identifier::Identifier;
use crate::session::TreeSession;

impl TreeSession {
    /// Reads the value at `path` inside the payload of `id`.
    pub fn get_field(&self, id: &str, path: &str) -> Result<&Value, TreeError> {
        let payload = self.payload(id).ok_or_else(|| TreeError::unknown(id))?;
        let path = parse_path(path)?;
        Ok(get(payload, &path)?)
    }

    /// Writes `value` at `path` inside the payload of `id`, creating missing
    /// containers, and returns the previous value.
    ///
    /// Writing the identifier field renames the node. The children field is
    /// maintained by the tree and refused, as is replacing the whole
    /// payload.
    pub fn set_field(&mut self, id: &str, path: &str, value: Value) -> Result<Option<Value>, TreeError> {
        if !self.contains(id) {
            return Err(TreeError::unknown(id));
        }
        let path = parse_path(path)?;
        if path.is_root() {
            return Err(TreeError::InvalidPayload(
                "the whole payload cannot be replaced through a field edit".to_string(),
            ));
        }
        if let Some(PathToken::Field(first)) = path.first() {
            if self.children_field() == Some(first.as_str()) {
                return Err(TreeError::ReservedField { field: first.clone() });
            }
            if self.id_field() == Some(first.as_str()) {
                if path.len() > 1 {
                    return Err(TreeError::ReservedField { field: first.clone() });
                }
                let new = Identifier::from_value(&value).ok_or_else(|| TreeError::ValueConversion {
                    input: value.to_string(),
                    expected: "an identifier (string or integer)",
                })?;
                let previous = self.payload(id).and_then(|p| p.get(first.as_str())).cloned();
                self.rename_node(id, new)?;
                return Ok(previous);
            }
        }

        let node = self
            .index
            .nodes
            .get_mut(id)
            .ok_or_else(|| TreeError::unknown(id))?;
        Ok(set(&mut node.payload, &path, value)?)
    }

    /// Form-layer write: converts `text` to the type of the value currently
    /// at `path`, or infers a type for a new field, then calls
    /// [`TreeSession::set_field`].
    pub fn set_field_text(&mut self, id: &str, path: &str, text: &str) -> Result<Option<Value>, TreeError> {
        let value = match self.get_field(id, path) {
            Ok(current) => convert_like(text, current)?,
            Err(TreeError::Path(PathError::Resolution(_))) => infer_value(text),
            Err(err) => return Err(err),
        };
        self.set_field(id, path, value)
    }
}

/// Converts `text` to the JSON type of `current`.
pub fn convert_like(text: &str, current: &Value) -> Result<Value, TreeError> {
    let trimmed = text.trim();
    let fail = |expected: &'static str| TreeError::ValueConversion {
        input: text.to_string(),
        expected,
    };
    match current {
        Value::Number(n) if n.is_i64() || n.is_u64() => {
            if let Ok(i) = trimmed.parse::<i64>() {
                return Ok(Value::from(i));
            }
            match trimmed.parse::<f64>() {
                Ok(f) if f.is_finite() && f.abs() < i64::MAX as f64 => Ok(Value::from(f.trunc() as i64)),
                _ => Err(fail("an integer")),
            }
        }
        Value::Number(_) => trimmed
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| fail("a number")),
        Value::Bool(_) => Ok(Value::Bool(matches!(
            trimmed.to_ascii_lowercase().as_str(),
            "true" | "1" | "yes" | "y" | "on"
        ))),
        Value::String(_) => Ok(Value::String(text.to_string())),
        Value::Array(_) => match serde_json::from_str::<Value>(trimmed) {
            Ok(parsed @ Value::Array(_)) => Ok(parsed),
            _ => Err(fail("a JSON array")),
        },
        Value::Object(_) => match serde_json::from_str::<Value>(trimmed) {
            Ok(parsed @ Value::Object(_)) => Ok(parsed),
            _ => Err(fail("a JSON object")),
        },
        Value::Null => Ok(infer_value(text)),
    }
}

/// Guesses a JSON value for text typed into a new field.
pub fn infer_value(text: &str) -> Value {
    let trimmed = text.trim();
    if let Ok(i) = trimmed.parse::<i64>() {
        return Value::from(i);
    }
    if trimmed.contains(|c: char| c.is_ascii_digit()) {
        if let Some(n) = trimmed.parse::<f64>().ok().and_then(serde_json::Number::from_f64) {
            return Value::Number(n);
        }
    }
    match trimmed {
        "true" | "True" => return Value::Bool(true),
        "false" | "False" => return Value::Bool(false),
        _ => {}
    }
    if trimmed.starts_with('[') || trimmed.starts_with('{') {
        if let Ok(parsed) = serde_json::from_str::<Value>(trimmed) {
            return parsed;
        }
    }
    Value::String(text.to_string())
}
