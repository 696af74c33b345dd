//! Error type shared by every tree operation.

use json_tree_path::{PathError, PathResolutionError, PathSyntaxError};
use thiserror::Error;

/// Why a tree operation was refused.
///
/// Reparent, rename and add perform all of their checks before touching any
/// structure, so receiving one of these leaves the session as it was.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TreeError {
    #[error("identifier {id:?} is already in use")]
    DuplicateIdentifier { id: String },
    #[error("cannot drop node {id:?} onto itself")]
    SelfDrop { id: String },
    #[error("cannot move node {node:?} under {target:?}, which is one of its descendants")]
    Cycle { node: String, target: String },
    #[error("structural inconsistency: {0}")]
    StructuralInconsistency(String),
    #[error("no node with identifier {id:?}")]
    UnknownNode { id: String },
    #[error("payload has no usable identifier in field {key:?}")]
    MissingIdentifier { key: String },
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
    #[error("field {field:?} is maintained by the tree and cannot be edited directly")]
    ReservedField { field: String },
    #[error("cannot convert {input:?} to {expected}")]
    ValueConversion { input: String, expected: &'static str },
    #[error("invariant violated: {0}")]
    InvariantViolation(String),
    #[error(transparent)]
    Path(#[from] PathError),
}

impl From<PathSyntaxError> for TreeError {
    fn from(err: PathSyntaxError) -> Self {
        TreeError::Path(err.into())
    }
}

impl From<PathResolutionError> for TreeError {
    fn from(err: PathResolutionError) -> Self {
        TreeError::Path(err.into())
    }
}

impl TreeError {
    pub(crate) fn unknown(id: &str) -> Self {
        TreeError::UnknownNode { id: id.to_string() }
    }

    /// True for the errors that reject a structural edit outright
    /// (duplicate id, self drop, cycle).
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            TreeError::DuplicateIdentifier { .. } | TreeError::SelfDrop { .. } | TreeError::Cycle { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_explain_refusal() {
        let err = TreeError::Cycle {
            node: "1".into(),
            target: "1-2".into(),
        };
        assert!(err.to_string().contains("descendants"));
        assert!(err.is_rejection());
        assert!(!TreeError::unknown("9").is_rejection());
    }

    #[test]
    fn test_path_errors_convert() {
        let err: TreeError = json_tree_path::parse_path("a[").unwrap_err().into();
        assert!(matches!(err, TreeError::Path(PathError::Syntax(_))));
        assert_eq!(
            err.to_string(),
            PathSyntaxError::UnclosedBracket { position: 1 }.to_string()
        );
    }
}
