//! stylescan grammar rules
//!
//! Composable, reference-counted grammar rules on top of `nom`. A [`Rule`]
//! attempts a match at the start of a `&str` and either consumes a prefix and
//! returns a value, or fails with a [`GrammarError`].
//!
//! Rules carry an optional leading skip (usually whitespace), an optional
//! name for error messages, and can be memoized in a thread-local packrat
//! cache that is cleared with [`reset_cache`].
//!
//! # Example
//!
//! ```
//! use stylescan_grammar::{integer, literal};
//!
//! let list = integer().padded().separated(literal(",").padded());
//! assert_eq!(list.parse_all("1, 2 ,3").unwrap(), vec![1, 2, 3]);
//! ```

pub mod cache;
pub mod journal;
pub mod rule;
pub mod terminals;

use std::borrow::Cow;

pub use cache::{cache_len, reset_cache};
pub use journal::{with_journal, Journal};
pub use rule::{longest, nesting, reset_nesting, Forward, PResult, Rule, MAX_NESTING};
pub use terminals::{
    caseless_keyword, chars_not_in, compiled_regex, end_of_input, fnumber, hex_digits, hex_word,
    identifier, integer, keyword, literal, number, number_text, one_of_literals, regex,
    whitespace, whitespace0,
};

/// Why a rule failed to match.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GrammarErrorKind {
    /// The ordinary "no match here" outcome.
    #[error("expected {expected}")]
    Mismatch { expected: Cow<'static, str> },
    /// A parse action attached with [`Rule::try_map`] returned an error.
    #[error("{message}")]
    Action { message: String },
}

/// Grammar failure with the position it happened at.
///
/// The position is stored as the number of input bytes left, so an error can
/// be located in any source string the failing input was a suffix of.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}")]
pub struct GrammarError {
    pub remaining: usize,
    pub kind: GrammarErrorKind,
}

impl GrammarError {
    pub fn mismatch(input: &str, expected: impl Into<Cow<'static, str>>) -> Self {
        Self {
            remaining: input.len(),
            kind: GrammarErrorKind::Mismatch {
                expected: expected.into(),
            },
        }
    }

    pub fn action(input: &str, message: impl Into<String>) -> Self {
        Self {
            remaining: input.len(),
            kind: GrammarErrorKind::Action {
                message: message.into(),
            },
        }
    }

    /// Convert a raw `nom` error into a grammar error.
    ///
    /// `Incomplete` cannot happen with complete-input parsers; it is reported
    /// as a mismatch at the end of `input`.
    pub fn from_nom(err: nom::Err<GrammarError>, input: &str) -> Self {
        match err {
            nom::Err::Error(e) | nom::Err::Failure(e) => e,
            nom::Err::Incomplete(_) => Self::mismatch(&input[input.len()..], "more input"),
        }
    }

    pub fn is_action(&self) -> bool {
        matches!(self.kind, GrammarErrorKind::Action { .. })
    }

    /// Byte offset of the failure in `source`.
    pub fn location(&self, source: &str) -> usize {
        source.len().saturating_sub(self.remaining)
    }

    /// 1-based line and column of the failure in `source`. Columns count
    /// characters, not bytes.
    pub fn line_col(&self, source: &str) -> (usize, usize) {
        let loc = self.location(source);
        let before = &source[..floor_boundary(source, loc)];
        let line = before.matches('\n').count() + 1;
        let line_start = before.rfind('\n').map_or(0, |i| i + 1);
        let column = before[line_start..].chars().count() + 1;
        (line, column)
    }

    /// Keep whichever of two errors got further into the input.
    pub fn furthest(self, other: GrammarError) -> GrammarError {
        if other.remaining < self.remaining {
            other
        } else {
            self
        }
    }
}

fn floor_boundary(s: &str, mut index: usize) -> usize {
    index = index.min(s.len());
    while !s.is_char_boundary(index) {
        index -= 1;
    }
    index
}

impl<'a> nom::error::ParseError<&'a str> for GrammarError {
    fn from_error_kind(input: &'a str, kind: nom::error::ErrorKind) -> Self {
        Self::mismatch(input, kind.description().to_lowercase())
    }

    fn append(_input: &'a str, _kind: nom::error::ErrorKind, other: Self) -> Self {
        other
    }

    fn or(self, other: Self) -> Self {
        self.furthest(other)
    }
}

impl<'a> nom::error::ContextError<&'a str> for GrammarError {}

impl<'a, E: std::fmt::Display> nom::error::FromExternalError<&'a str, E> for GrammarError {
    fn from_external_error(input: &'a str, _kind: nom::error::ErrorKind, e: E) -> Self {
        Self::mismatch(input, e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_from_remaining() {
        let source = "abc def";
        let err = GrammarError::mismatch(&source[4..], "x");
        assert_eq!(err.location(source), 4);
    }

    #[test]
    fn test_line_col_multiline() {
        let source = "test\ntest fail";
        let err = GrammarError::mismatch(&source[10..], "end of text");
        assert_eq!(err.line_col(source), (2, 6));
    }

    #[test]
    fn test_line_col_counts_chars() {
        let source = "é fail";
        let err = GrammarError::mismatch(&source[3..], "x");
        assert_eq!(err.line_col(source), (1, 3));
    }

    #[test]
    fn test_display() {
        let err = GrammarError::mismatch("", "integer");
        assert_eq!(err.to_string(), "expected integer");
        let err = GrammarError::action("", "division by zero");
        assert_eq!(err.to_string(), "division by zero");
        assert!(err.is_action());
    }

    #[test]
    fn test_furthest_prefers_less_remaining() {
        let a = GrammarError::mismatch("abcd", "a");
        let b = GrammarError::mismatch("cd", "b");
        assert_eq!(a.furthest(b.clone()), b);
    }
}
