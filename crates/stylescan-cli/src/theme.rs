//! Terminal themes.
//!
//! A theme maps class names to style strings in the prompt_toolkit format,
//! e.g. `"#b27a01 bold"` or `"bg:#222 italic"`. A fragment's style tag is
//! resolved by applying the rule of every class it names, parents first
//! (`number` before `number.int`), then the tag's own inline words.
//!
//! Theme files are JSON objects of `class → style string` and extend the
//! grammar's built-in theme.

use std::collections::HashMap;
use std::path::Path;

use crossterm::style::{Attribute, Attributes, Color, ContentStyle};
use serde::Deserialize;
use stylescan_core::StyleTag;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum ThemeError {
    #[error("cannot read theme {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid theme file: {0}")]
    Json(#[from] serde_json::Error),
}

/// Style attributes, each unset until a style word mentions it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TermStyle {
    pub fg: Option<Color>,
    pub bg: Option<Color>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub underline: Option<bool>,
    pub reverse: Option<bool>,
}

impl TermStyle {
    /// Parse a style string. Unknown words are ignored.
    pub fn parse(style: &str) -> Self {
        let mut parsed = TermStyle::default();
        for word in style.split_whitespace() {
            parsed.apply_word(word);
        }
        parsed
    }

    fn apply_word(&mut self, word: &str) {
        let lower = word.to_ascii_lowercase();
        match lower.as_str() {
            "bold" => self.bold = Some(true),
            "nobold" => self.bold = Some(false),
            "italic" => self.italic = Some(true),
            "noitalic" => self.italic = Some(false),
            "underline" => self.underline = Some(true),
            "nounderline" => self.underline = Some(false),
            "reverse" => self.reverse = Some(true),
            "noreverse" => self.reverse = Some(false),
            _ if lower.starts_with("class:") => {}
            _ => {
                let fg = lower.strip_prefix("fg:").unwrap_or(lower.as_str());
                if let Some(bg) = lower.strip_prefix("bg:") {
                    self.bg = parse_color(bg).or(self.bg);
                } else if let Some(color) = parse_color(fg) {
                    self.fg = Some(color);
                } else {
                    debug!(word, "ignoring unknown style word");
                }
            }
        }
    }

    /// `other` on top of `self`: attributes `other` sets win.
    pub fn overlay(self, other: TermStyle) -> Self {
        TermStyle {
            fg: other.fg.or(self.fg),
            bg: other.bg.or(self.bg),
            bold: other.bold.or(self.bold),
            italic: other.italic.or(self.italic),
            underline: other.underline.or(self.underline),
            reverse: other.reverse.or(self.reverse),
        }
    }

    pub fn is_plain(&self) -> bool {
        *self == TermStyle::default()
    }

    pub fn to_content_style(self) -> ContentStyle {
        let mut attributes = Attributes::default();
        for (flag, attribute) in [
            (self.bold, Attribute::Bold),
            (self.italic, Attribute::Italic),
            (self.underline, Attribute::Underlined),
            (self.reverse, Attribute::Reverse),
        ] {
            if flag == Some(true) {
                attributes.set(attribute);
            }
        }
        ContentStyle {
            foreground_color: self.fg,
            background_color: self.bg,
            attributes,
            ..ContentStyle::default()
        }
    }
}

/// Parse `#rgb`, `#rrggbb` or an `ansi*` color name.
fn parse_color(color: &str) -> Option<Color> {
    if let Some(hex) = color.strip_prefix('#') {
        if !hex.is_ascii() {
            return None;
        }
        let channel = |s: &str| u8::from_str_radix(s, 16).ok();
        return match hex.len() {
            6 => Some(Color::Rgb {
                r: channel(&hex[0..2])?,
                g: channel(&hex[2..4])?,
                b: channel(&hex[4..6])?,
            }),
            3 => {
                let double = |i: usize| channel(&hex[i..i + 1].repeat(2));
                Some(Color::Rgb {
                    r: double(0)?,
                    g: double(1)?,
                    b: double(2)?,
                })
            }
            _ => None,
        };
    }
    let named = match color {
        "ansiblack" => Color::Black,
        "ansired" => Color::DarkRed,
        "ansigreen" => Color::DarkGreen,
        "ansiyellow" => Color::DarkYellow,
        "ansiblue" => Color::DarkBlue,
        "ansimagenta" => Color::DarkMagenta,
        "ansicyan" => Color::DarkCyan,
        "ansigray" => Color::Grey,
        "ansibrightblack" => Color::DarkGrey,
        "ansibrightred" => Color::Red,
        "ansibrightgreen" => Color::Green,
        "ansibrightyellow" => Color::Yellow,
        "ansibrightblue" => Color::Blue,
        "ansibrightmagenta" => Color::Magenta,
        "ansibrightcyan" => Color::Cyan,
        "ansiwhite" => Color::White,
        _ => return None,
    };
    Some(named)
}

#[derive(Debug, Deserialize)]
#[serde(transparent)]
struct ThemeFile(HashMap<String, String>);

/// Class name to terminal style.
#[derive(Debug, Clone, Default)]
pub struct Theme {
    rules: HashMap<String, TermStyle>,
}

impl Theme {
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let rules = pairs
            .into_iter()
            .map(|(class, style)| (class.to_string(), TermStyle::parse(style)))
            .collect();
        Theme { rules }
    }

    pub fn from_json(json: &str) -> Result<Self, ThemeError> {
        let ThemeFile(rules) = serde_json::from_str(json)?;
        Ok(Theme::from_pairs(
            rules.iter().map(|(class, style)| (class.as_str(), style.as_str())),
        ))
    }

    pub fn load(path: &Path) -> Result<Self, ThemeError> {
        let json = std::fs::read_to_string(path).map_err(|source| ThemeError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Theme::from_json(&json)
    }

    /// Add `other`'s rules, replacing rules for the same class.
    pub fn extend(&mut self, other: Theme) {
        self.rules.extend(other.rules);
    }

    /// The style of a fragment tagged `tag`.
    pub fn resolve(&self, tag: &StyleTag) -> TermStyle {
        let tag = tag.to_class_style().to_string();
        let mut style = TermStyle::default();
        for word in tag.split_whitespace() {
            if let Some(class) = word.strip_prefix("class:") {
                for end in class
                    .match_indices('.')
                    .map(|(i, _)| i)
                    .chain([class.len()])
                {
                    if let Some(rule) = self.rules.get(&class[..end]) {
                        style = style.overlay(*rule);
                    }
                }
            }
        }
        style.overlay(TermStyle::parse(&tag))
    }
}
