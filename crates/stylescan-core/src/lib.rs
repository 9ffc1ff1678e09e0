//! stylescan core
//!
//! Grammar-driven syntax highlighting. A parser factory wraps the rules it
//! wants styled with a [`Styler`]; the [`Highlighter`] drives the resulting
//! grammar over a whole string with the resilient [`Scanner`], recovering
//! from failures one character at a time, and assembles the recorded spans
//! and the text between them into [`FormattedText`].
//!
//! Output comes as fragments (terminal rendering), HTML, or a [`LineView`]
//! for editors.

pub mod fragment;
pub mod highlighter;
pub mod html;
pub mod lines;
pub mod scanner;
pub mod style;
pub mod styler;
pub mod validator;

pub use fragment::{assemble, FormattedText, Fragment};
pub use highlighter::{Highlighter, HighlighterOptions};
pub use lines::{split_lines, LineView};
pub use scanner::{ScanDiagnostic, ScanReport, Scanner};
pub use style::{StyleTag, TokenType};
pub use styler::{SpanRecord, SpanTable, Styler};
pub use validator::{ValidationError, Validator};

/// Errors returned to callers of a highlight request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HighlightError {
    #[error("cannot highlight input that is not UTF-8 text: {0}")]
    InvalidInput(#[from] std::str::Utf8Error),
    #[error("line {index} out of range for a document of {lines} lines")]
    LineOutOfRange { index: usize, lines: usize },
}
