//! Node identifiers.
//!
//! Source data mixes integer ids, numeric strings and prefixed strings
//! (`7`, `"7"`, `"item7"`). [`Identifier`] keeps the original tag so a value
//! written back into a payload has the type it was read with, while all
//! maps are keyed by the canonical string form returned by
//! [`Identifier::key`].

use std::fmt;
use std::sync::OnceLock;

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Identifier {
    Int(i64),
    Text(String),
}

/// The `(prefix, number)` split of an identifier with a trailing digit run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumericSuffix {
    pub prefix: String,
    pub number: u64,
    /// Number of digits in the source text, including leading zeros.
    pub width: usize,
}

fn suffix_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(.*?)([0-9]+)$").expect("static pattern compiles"))
}

impl Identifier {
    /// Reads an identifier out of a JSON value.
    ///
    /// Integers become [`Identifier::Int`]; strings, floats and booleans
    /// become [`Identifier::Text`] with their JSON text. Null, arrays and
    /// objects are not identifiers.
    ///
    /// ```
    /// use json_tree::Identifier;
    /// use serde_json::json;
    ///
    /// assert_eq!(Identifier::from_value(&json!(4)), Some(Identifier::Int(4)));
    /// assert_eq!(Identifier::from_value(&json!("a1")), Some(Identifier::Text("a1".into())));
    /// assert_eq!(Identifier::from_value(&json!(null)), None);
    /// ```
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => Some(match n.as_i64() {
                Some(i) => Identifier::Int(i),
                None => Identifier::Text(n.to_string()),
            }),
            Value::String(s) => Some(Identifier::Text(s.clone())),
            Value::Bool(b) => Some(Identifier::Text(b.to_string())),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Identifier::Int(i) => Value::from(*i),
            Identifier::Text(s) => Value::String(s.clone()),
        }
    }

    /// Canonical string form, used as the key of every tree map.
    pub fn key(&self) -> String {
        self.to_string()
    }

    pub fn is_int(&self) -> bool {
        matches!(self, Identifier::Int(_))
    }

    /// Converts `self` to the tag of `template` when the conversion is
    /// lossless. The canonical key never changes.
    ///
    /// ```
    /// use json_tree::Identifier;
    ///
    /// let int = Identifier::Int(1);
    /// let text = Identifier::Text("x".into());
    /// assert_eq!(Identifier::Text("12".into()).coerce_like(&int), Identifier::Int(12));
    /// assert_eq!(Identifier::Int(12).coerce_like(&text), Identifier::Text("12".into()));
    /// assert_eq!(Identifier::Text("a2".into()).coerce_like(&int), Identifier::Text("a2".into()));
    /// ```
    pub fn coerce_like(&self, template: &Identifier) -> Identifier {
        match (self, template) {
            (Identifier::Text(s), Identifier::Int(_)) => match s.parse::<i64>() {
                Ok(i) if i.to_string() == *s => Identifier::Int(i),
                _ => self.clone(),
            },
            (Identifier::Int(i), Identifier::Text(_)) => Identifier::Text(i.to_string()),
            _ => self.clone(),
        }
    }

    /// Splits off the trailing digit run. Integers have an empty prefix;
    /// text without trailing digits has no split.
    pub fn split_numeric_suffix(&self) -> Option<NumericSuffix> {
        match self {
            Identifier::Int(i) => Some(NumericSuffix {
                prefix: String::new(),
                number: i.unsigned_abs(),
                width: 0,
            }),
            Identifier::Text(s) => {
                let caps = suffix_pattern().captures(s)?;
                let digits = caps.get(2)?.as_str();
                Some(NumericSuffix {
                    prefix: caps.get(1)?.as_str().to_string(),
                    number: digits.parse().ok()?,
                    width: digits.len(),
                })
            }
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Int(i) => write!(f, "{i}"),
            Identifier::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Identifier {
    fn from(i: i64) -> Self {
        Identifier::Int(i)
    }
}

impl From<&str> for Identifier {
    fn from(s: &str) -> Self {
        Identifier::Text(s.to_string())
    }
}

impl From<String> for Identifier {
    fn from(s: String) -> Self {
        Identifier::Text(s)
    }
}

/// Suggests the next identifier for a group of text ids.
///
/// Picks the most common `(prefix, width)` pattern among `existing` (first
/// seen wins a tie), takes the highest number in it plus one and pads it to
/// the same width. Returns `None` when no id has a numeric suffix or the
/// candidate is already taken.
///
/// ```
/// use json_tree::{next_prefixed_id, Identifier};
///
/// let ids: Vec<Identifier> = ["step01", "step02", "step07"].into_iter().map(Into::into).collect();
/// assert_eq!(next_prefixed_id(&ids), Some(Identifier::Text("step08".into())));
/// ```
pub fn next_prefixed_id(existing: &[Identifier]) -> Option<Identifier> {
    let mut patterns: IndexMap<(String, usize), (usize, u64)> = IndexMap::new();
    for id in existing {
        let Identifier::Text(_) = id else { continue };
        let Some(split) = id.split_numeric_suffix() else {
            continue;
        };
        let slot = patterns.entry((split.prefix, split.width)).or_insert((0, 0));
        slot.0 += 1;
        slot.1 = slot.1.max(split.number);
    }

    let mut best: Option<(&(String, usize), u64, usize)> = None;
    for (pattern, &(count, max)) in &patterns {
        match best {
            Some((_, _, best_count)) if best_count >= count => {}
            _ => best = Some((pattern, max, count)),
        }
    }
    let ((prefix, width), max, _) = best?;
    let candidate = Identifier::Text(format!("{prefix}{:0width$}", max.checked_add(1)?, width = *width));
    let key = candidate.key();
    if existing.iter().any(|id| id.key() == key) {
        tracing::debug!(candidate = %key, "suggested id already exists");
        return None;
    }
    Some(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn text(s: &str) -> Identifier {
        Identifier::Text(s.to_string())
    }

    #[test]
    fn test_from_value() {
        assert_eq!(Identifier::from_value(&json!(-3)), Some(Identifier::Int(-3)));
        assert_eq!(Identifier::from_value(&json!(1.5)), Some(text("1.5")));
        assert_eq!(Identifier::from_value(&json!(true)), Some(text("true")));
        assert_eq!(Identifier::from_value(&json!([1])), None);
        assert_eq!(Identifier::from_value(&json!({})), None);
    }

    #[test]
    fn test_key_is_type_independent() {
        assert_eq!(Identifier::Int(7).key(), text("7").key());
        assert_ne!(Identifier::Int(7), text("7"));
    }

    #[test]
    fn test_serde_untagged() {
        let ids: Vec<Identifier> = serde_json::from_value(json!([1, "a"])).unwrap();
        assert_eq!(ids, vec![Identifier::Int(1), text("a")]);
        assert_eq!(serde_json::to_value(&ids).unwrap(), json!([1, "a"]));
    }

    #[test]
    fn test_coerce_keeps_leading_zeros_as_text() {
        assert_eq!(text("007").coerce_like(&Identifier::Int(1)), text("007"));
    }

    #[test]
    fn test_split_numeric_suffix() {
        let split = text("item-004").split_numeric_suffix().unwrap();
        assert_eq!(split.prefix, "item-");
        assert_eq!(split.number, 4);
        assert_eq!(split.width, 3);

        let split = text("1-2").split_numeric_suffix().unwrap();
        assert_eq!(split.prefix, "1-");
        assert_eq!(split.number, 2);

        let split = Identifier::Int(12).split_numeric_suffix().unwrap();
        assert_eq!(split.prefix, "");
        assert_eq!(split.number, 12);

        assert!(text("root").split_numeric_suffix().is_none());
        assert!(text("x٣").split_numeric_suffix().is_none());
    }

    #[test]
    fn test_next_prefixed_id_majority_pattern() {
        let ids = vec![text("a1"), text("b01"), text("b02"), Identifier::Int(50)];
        assert_eq!(next_prefixed_id(&ids), Some(text("b03")));
    }

    #[test]
    fn test_next_prefixed_id_tie_keeps_first() {
        let ids = vec![text("a4"), text("b9")];
        assert_eq!(next_prefixed_id(&ids), Some(text("a5")));
    }

    #[test]
    fn test_next_prefixed_id_none() {
        assert_eq!(next_prefixed_id(&[]), None);
        assert_eq!(next_prefixed_id(&[text("alpha")]), None);
    }
}
