use std::fmt;
use std::ops::Deref;

use serde::Serialize;

use crate::style::StyleTag;
use crate::styler::SpanTable;

/// A run of uniformly styled text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fragment {
    pub style: StyleTag,
    pub text: String,
}

impl Fragment {
    pub fn new(style: impl Into<StyleTag>, text: impl Into<String>) -> Self {
        Self {
            style: style.into(),
            text: text.into(),
        }
    }
}

impl<S: Into<StyleTag>, T: Into<String>> From<(S, T)> for Fragment {
    fn from((style, text): (S, T)) -> Self {
        Fragment::new(style, text)
    }
}

/// Ordered fragments covering a source string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FormattedText(Vec<Fragment>);

impl FormattedText {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, fragment: Fragment) {
        self.0.push(fragment);
    }

    /// The concatenated text of all fragments.
    pub fn text(&self) -> String {
        self.0.iter().map(|f| f.text.as_str()).collect()
    }

    pub fn into_inner(self) -> Vec<Fragment> {
        self.0
    }

    /// Apply `f` to every style.
    pub fn map_styles(self, f: impl Fn(&StyleTag) -> StyleTag) -> Self {
        FormattedText(
            self.0
                .into_iter()
                .map(|fragment| Fragment {
                    style: f(&fragment.style),
                    text: fragment.text,
                })
                .collect(),
        )
    }
}

impl Deref for FormattedText {
    type Target = [Fragment];

    fn deref(&self) -> &[Fragment] {
        &self.0
    }
}

impl From<Vec<Fragment>> for FormattedText {
    fn from(fragments: Vec<Fragment>) -> Self {
        FormattedText(fragments)
    }
}

impl FromIterator<Fragment> for FormattedText {
    fn from_iter<I: IntoIterator<Item = Fragment>>(iter: I) -> Self {
        FormattedText(iter.into_iter().collect())
    }
}

impl IntoIterator for FormattedText {
    type Item = Fragment;
    type IntoIter = std::vec::IntoIter<Fragment>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a FormattedText {
    type Item = &'a Fragment;
    type IntoIter = std::slice::Iter<'a, Fragment>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for FormattedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for fragment in &self.0 {
            f.write_str(&fragment.text)?;
        }
        Ok(())
    }
}

/// Merge the spans recorded for `source` with the gaps between them.
///
/// A span is emitted when the walk reaches its start; spans starting inside
/// an emitted span are skipped. Text not covered by a span becomes a fragment
/// with `default_style`. Spans whose text does not match `source` at their
/// offset are ignored, so the fragments always spell out `source` exactly.
pub fn assemble(source: &str, table: &SpanTable, default_style: &StyleTag) -> FormattedText {
    let mut locs = table.locs();
    locs.push(source.len());

    let mut fragments = FormattedText::new();
    let mut gap_start: Option<usize> = None;
    let mut loc = 0;
    let mut i = 0;
    while loc < source.len() {
        while locs[i] < loc {
            i += 1;
        }
        let record = table
            .get(loc)
            .filter(|record| !record.text.is_empty())
            .filter(|record| source.get(loc..record.end()) == Some(record.text.as_str()));
        match record {
            Some(record) => {
                if let Some(start) = gap_start.take() {
                    fragments.push(Fragment {
                        style: default_style.clone(),
                        text: source[start..loc].to_string(),
                    });
                }
                fragments.push(Fragment {
                    style: record.style.clone(),
                    text: record.text.clone(),
                });
                loc = record.end();
            }
            None => {
                gap_start.get_or_insert(loc);
                while locs[i] <= loc {
                    i += 1;
                }
                loc = locs[i];
            }
        }
    }
    if let Some(start) = gap_start {
        fragments.push(Fragment {
            style: default_style.clone(),
            text: source[start..].to_string(),
        });
    }
    fragments
}
