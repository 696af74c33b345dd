//! Size limits for path expressions.

use crate::parse::PathSyntaxError;
use crate::types::PathExpression;

/// Maximum allowed path string length, in bytes.
pub const MAX_PATH_LENGTH: usize = 1024;

/// Maximum allowed number of tokens in one path.
pub const MAX_PATH_DEPTH: usize = 256;

/// Maximum number of `null` placeholders a single write may append to an
/// array to reach the addressed index.
pub const MAX_ARRAY_PADDING: usize = 1024;

/// Validate the raw length of a path string.
///
/// # Example
///
/// ```
/// use json_tree_path::validate_path_string;
///
/// validate_path_string("a.b[0]").unwrap();
/// validate_path_string(&"a".repeat(2000)).unwrap_err();
/// ```
pub fn validate_path_string(path: &str) -> Result<(), PathSyntaxError> {
    if path.len() > MAX_PATH_LENGTH {
        return Err(PathSyntaxError::TooLong {
            len: path.len(),
            max: MAX_PATH_LENGTH,
        });
    }
    Ok(())
}

/// Validate the depth of an already-built expression.
pub fn validate_expression(path: &PathExpression) -> Result<(), PathSyntaxError> {
    if path.len() > MAX_PATH_DEPTH {
        return Err(PathSyntaxError::TooDeep {
            depth: path.len(),
            max: MAX_PATH_DEPTH,
        });
    }
    Ok(())
}
