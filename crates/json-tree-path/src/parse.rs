//! Path string parser.
//!
//! Grammar: `segment ('.' segment | '[' digits ']')*`, where `segment` is any
//! run of characters other than `.`, `[` and `]`. A path may also open with an
//! index step (`[0].name`) when the root itself is an array.

use thiserror::Error;

use crate::types::{PathExpression, PathToken};
use crate::validate::{validate_expression, validate_path_string};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathSyntaxError {
    #[error("empty field name at position {position}")]
    EmptySegment { position: usize },
    #[error("unclosed '[' at position {position}")]
    UnclosedBracket { position: usize },
    #[error("invalid array index {text:?} at position {position}")]
    InvalidIndex { position: usize, text: String },
    #[error("unexpected character {ch:?} at position {position}")]
    UnexpectedChar { position: usize, ch: char },
    #[error("path is {len} bytes long, limit is {max}")]
    TooLong { len: usize, max: usize },
    #[error("path has {depth} steps, limit is {max}")]
    TooDeep { depth: usize, max: usize },
}

/// Parse a path string into a [`PathExpression`].
///
/// The empty string parses to the root path.
///
/// # Example
///
/// ```
/// use json_tree_path::{parse_path, PathToken};
///
/// let path = parse_path("a.b[0].c").unwrap();
/// assert_eq!(
///     path.tokens(),
///     &[
///         PathToken::Field("a".into()),
///         PathToken::Field("b".into()),
///         PathToken::Index(0),
///         PathToken::Field("c".into()),
///     ]
/// );
/// assert!(parse_path("a[").is_err());
/// ```
pub fn parse_path(input: &str) -> Result<PathExpression, PathSyntaxError> {
    validate_path_string(input)?;
    let mut parser = PathParser { input, pos: 0 };
    let tokens = parser.parse_tokens()?;
    let expression = PathExpression::new(tokens);
    validate_expression(&expression)?;
    Ok(expression)
}

struct PathParser<'a> {
    input: &'a str,
    pos: usize,
}

impl PathParser<'_> {
    fn parse_tokens(&mut self) -> Result<Vec<PathToken>, PathSyntaxError> {
        let mut tokens = Vec::new();
        if self.is_at_end() {
            return Ok(tokens);
        }

        if self.peek() == Some('[') {
            tokens.push(self.parse_index()?);
        } else {
            tokens.push(self.parse_segment()?);
        }

        while let Some(c) = self.peek() {
            match c {
                '.' => {
                    self.advance();
                    tokens.push(self.parse_segment()?);
                }
                '[' => tokens.push(self.parse_index()?),
                other => {
                    return Err(PathSyntaxError::UnexpectedChar {
                        position: self.pos,
                        ch: other,
                    })
                }
            }
        }
        Ok(tokens)
    }

    fn parse_segment(&mut self) -> Result<PathToken, PathSyntaxError> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            match c {
                '.' | '[' => break,
                ']' => {
                    return Err(PathSyntaxError::UnexpectedChar {
                        position: self.pos,
                        ch: c,
                    })
                }
                _ => self.advance(),
            }
        }
        if self.pos == start {
            return Err(PathSyntaxError::EmptySegment { position: start });
        }
        Ok(PathToken::Field(self.input[start..self.pos].to_string()))
    }

    fn parse_index(&mut self) -> Result<PathToken, PathSyntaxError> {
        let open = self.pos;
        self.advance(); // '['
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == ']' {
                break;
            }
            self.advance();
        }
        if self.is_at_end() {
            return Err(PathSyntaxError::UnclosedBracket { position: open });
        }
        let text = &self.input[start..self.pos];
        self.advance(); // ']'

        let invalid = || PathSyntaxError::InvalidIndex {
            position: start,
            text: text.to_string(),
        };
        if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let idx: usize = text.parse().map_err(|_| invalid())?;
        Ok(PathToken::Index(idx))
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
        }
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.input.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &str) -> PathToken {
        PathToken::Field(name.to_string())
    }

    #[test]
    fn test_parse_empty() {
        assert!(parse_path("").unwrap().is_root());
    }

    #[test]
    fn test_parse_dotted() {
        let path = parse_path("meta.owner.name").unwrap();
        assert_eq!(path.tokens(), &[field("meta"), field("owner"), field("name")]);
    }

    #[test]
    fn test_parse_brackets() {
        let path = parse_path("matrix[1][12]").unwrap();
        assert_eq!(
            path.tokens(),
            &[field("matrix"), PathToken::Index(1), PathToken::Index(12)]
        );
    }

    #[test]
    fn test_parse_leading_index() {
        let path = parse_path("[0].name").unwrap();
        assert_eq!(path.tokens(), &[PathToken::Index(0), field("name")]);
    }

    #[test]
    fn test_parse_unicode_and_spaces() {
        let path = parse_path("名前.first name").unwrap();
        assert_eq!(path.tokens(), &[field("名前"), field("first name")]);
    }

    #[test]
    fn test_parse_digit_segment_stays_field() {
        let path = parse_path("items.0").unwrap();
        assert_eq!(path.tokens(), &[field("items"), field("0")]);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            parse_path("a["),
            Err(PathSyntaxError::UnclosedBracket { position: 1 })
        );
        assert_eq!(
            parse_path("a[x]"),
            Err(PathSyntaxError::InvalidIndex {
                position: 2,
                text: "x".to_string()
            })
        );
        assert!(matches!(
            parse_path("a[]"),
            Err(PathSyntaxError::InvalidIndex { .. })
        ));
        assert!(matches!(
            parse_path("a[-1]"),
            Err(PathSyntaxError::InvalidIndex { .. })
        ));
        assert_eq!(
            parse_path("a]"),
            Err(PathSyntaxError::UnexpectedChar { position: 1, ch: ']' })
        );
        assert_eq!(
            parse_path("a[0]b"),
            Err(PathSyntaxError::UnexpectedChar { position: 4, ch: 'b' })
        );
        assert_eq!(
            parse_path("a..b"),
            Err(PathSyntaxError::EmptySegment { position: 2 })
        );
        assert_eq!(
            parse_path("a."),
            Err(PathSyntaxError::EmptySegment { position: 2 })
        );
        assert_eq!(
            parse_path(".a"),
            Err(PathSyntaxError::EmptySegment { position: 0 })
        );
    }

    #[test]
    fn test_parse_index_overflow() {
        assert!(matches!(
            parse_path("a[99999999999999999999999]"),
            Err(PathSyntaxError::InvalidIndex { .. })
        ));
    }
}
