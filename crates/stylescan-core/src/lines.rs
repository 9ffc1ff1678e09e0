//! Line-oriented view of a fragment list, for editors that ask for one line
//! at a time.

use once_cell::unsync::OnceCell;

use crate::fragment::{FormattedText, Fragment};
use crate::HighlightError;

/// Split fragments at `\n`, keeping each piece's style.
///
/// Empty pieces before a break are dropped; the piece after the last break
/// is always kept, so text ending in `\n` yields a final line holding one
/// empty fragment.
pub fn split_lines(fragments: &FormattedText) -> Vec<FormattedText> {
    let mut lines = Vec::new();
    let mut line = FormattedText::new();
    for fragment in fragments {
        let mut parts = fragment.text.split('\n').peekable();
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                line.push(Fragment::new(fragment.style.clone(), part));
                break;
            }
            if !part.is_empty() {
                line.push(Fragment::new(fragment.style.clone(), part));
            }
            lines.push(std::mem::take(&mut line));
        }
    }
    lines.push(line);
    lines
}

/// Fragments of one highlighted document, split into lines on first access.
#[derive(Debug, Clone)]
pub struct LineView {
    fragments: FormattedText,
    lines: OnceCell<Vec<FormattedText>>,
}

impl LineView {
    pub fn new(fragments: FormattedText) -> Self {
        Self {
            fragments,
            lines: OnceCell::new(),
        }
    }

    fn lines(&self) -> &[FormattedText] {
        self.lines.get_or_init(|| split_lines(&self.fragments))
    }

    /// Fragments of line `index` (0-based).
    pub fn line(&self, index: usize) -> Result<&FormattedText, HighlightError> {
        let lines = self.lines();
        lines.get(index).ok_or(HighlightError::LineOutOfRange {
            index,
            lines: lines.len(),
        })
    }

    pub fn get(&self, index: usize) -> Option<&FormattedText> {
        self.lines().get(index)
    }

    pub fn len(&self) -> usize {
        self.lines().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines().is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FormattedText> {
        self.lines().iter()
    }

    /// The fragments the view was built from.
    pub fn fragments(&self) -> &FormattedText {
        &self.fragments
    }
}
