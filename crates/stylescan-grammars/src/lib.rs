//! stylescan grammars
//!
//! Parser factories for a few small languages, each taking a
//! [`Styler`](stylescan_core::Styler) and returning the grammar's top rule,
//! plus a default terminal theme mapping their style classes to colors.
//!
//! ```text
//! GrammarKind::Json.highlighter().highlight(source) → FormattedText
//! ```

pub mod calc;
pub mod json;
pub mod repr;
pub mod sexp;

use std::fmt;
use std::str::FromStr;

use stylescan_core::{Highlighter, Styler, Validator};

/// ASCII control characters, C0 and DEL.
pub(crate) fn control_chars() -> String {
    (0u8..32).chain([0x7f]).map(char::from).collect()
}

/// Unknown grammar name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown grammar {name:?}; available: calc, sexp, json, repr")]
pub struct UnknownGrammar {
    pub name: String,
}

/// The bundled grammars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GrammarKind {
    Calc,
    Sexp,
    Json,
    Repr,
}

impl GrammarKind {
    pub const ALL: [GrammarKind; 4] = [
        GrammarKind::Calc,
        GrammarKind::Sexp,
        GrammarKind::Json,
        GrammarKind::Repr,
    ];

    pub fn name(self) -> &'static str {
        match self {
            GrammarKind::Calc => "calc",
            GrammarKind::Sexp => "sexp",
            GrammarKind::Json => "json",
            GrammarKind::Repr => "repr",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            GrammarKind::Calc => "four-function calculator expressions",
            GrammarKind::Sexp => "Lisp-style S-expressions",
            GrammarKind::Json => "JSON documents",
            GrammarKind::Repr => "Python repr() output",
        }
    }

    /// A highlighter for this grammar. Values are discarded.
    pub fn highlighter(self) -> Highlighter {
        match self {
            GrammarKind::Calc => Highlighter::new(|styler| calc::parser(styler).suppress()),
            GrammarKind::Sexp => Highlighter::new(|styler| sexp::parser(styler).suppress()),
            GrammarKind::Json => Highlighter::new(|styler| json::parser(styler).suppress()),
            GrammarKind::Repr => Highlighter::new(|styler| repr::parser(styler).suppress()),
        }
    }

    /// A validator for whole inputs, or `None` for token grammars.
    pub fn validator(self) -> Option<Validator<()>> {
        let styler = Styler::dummy();
        let rule = match self {
            GrammarKind::Calc => calc::parser(&styler).suppress(),
            GrammarKind::Sexp => sexp::parser(&styler).suppress(),
            GrammarKind::Json => json::parser(&styler).suppress(),
            GrammarKind::Repr => return None,
        };
        Some(Validator::new(rule))
    }

    /// Terminal styles keyed by class name.
    pub fn default_theme(self) -> &'static [(&'static str, &'static str)] {
        match self {
            GrammarKind::Calc => calc::THEME,
            GrammarKind::Sexp => sexp::THEME,
            GrammarKind::Json => json::THEME,
            GrammarKind::Repr => repr::THEME,
        }
    }
}

impl fmt::Display for GrammarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for GrammarKind {
    type Err = UnknownGrammar;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GrammarKind::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownGrammar {
                name: s.to_string(),
            })
    }
}
