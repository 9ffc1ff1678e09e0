//! Style tags attached to styled rules.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;
use serde::{Serialize, Serializer};

/// A style chosen by a grammar author for the text a rule matched.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StyleTag {
    /// A style string: whitespace separated words, where `class:name` words
    /// name CSS classes and other words (`bold`, `#f00`) are terminal
    /// attributes.
    Classes(String),
    /// A category in the token hierarchy.
    Token(TokenType),
}

impl Default for StyleTag {
    fn default() -> Self {
        StyleTag::Classes(String::new())
    }
}

impl From<&str> for StyleTag {
    fn from(style: &str) -> Self {
        StyleTag::Classes(style.to_string())
    }
}

impl From<String> for StyleTag {
    fn from(style: String) -> Self {
        StyleTag::Classes(style)
    }
}

impl From<TokenType> for StyleTag {
    fn from(token: TokenType) -> Self {
        StyleTag::Token(token)
    }
}

impl fmt::Display for StyleTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StyleTag::Classes(style) => f.write_str(style),
            StyleTag::Token(token) => write!(f, "{token}"),
        }
    }
}

impl Serialize for StyleTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl StyleTag {
    /// Class names for markup.
    ///
    /// For a style string these are the `class:` words with the prefix
    /// removed and dots turned into hyphens. For a token it is the token's
    /// short name, which is empty for plain text.
    pub fn css_classes(&self) -> Vec<String> {
        match self {
            StyleTag::Classes(style) => style
                .split_whitespace()
                .filter_map(|word| word.strip_prefix("class:"))
                .map(|class| class.replace('.', "-"))
                .collect(),
            StyleTag::Token(token) => vec![token.css_class().to_string()],
        }
    }

    /// The equivalent style string: tokens become `class:pygments.<path>`.
    pub fn to_class_style(&self) -> StyleTag {
        match self {
            StyleTag::Classes(_) => self.clone(),
            StyleTag::Token(token) => StyleTag::Classes(token.class_style()),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, StyleTag::Classes(style) if style.trim().is_empty())
    }
}

/// A category in the token hierarchy, written as a dotted path below the
/// root (`Literal.Number.Integer`). The root itself is the empty path.
///
/// `Number` and `String` at the top level are aliases of `Literal.Number`
/// and `Literal.String` and are stored in their long form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TokenType(Cow<'static, str>);

impl TokenType {
    pub const ROOT: TokenType = TokenType(Cow::Borrowed(""));
    pub const TEXT: TokenType = TokenType(Cow::Borrowed("Text"));
    pub const WHITESPACE: TokenType = TokenType(Cow::Borrowed("Text.Whitespace"));
    pub const ERROR: TokenType = TokenType(Cow::Borrowed("Error"));
    pub const KEYWORD: TokenType = TokenType(Cow::Borrowed("Keyword"));
    pub const KEYWORD_CONSTANT: TokenType = TokenType(Cow::Borrowed("Keyword.Constant"));
    pub const NAME: TokenType = TokenType(Cow::Borrowed("Name"));
    pub const NAME_BUILTIN: TokenType = TokenType(Cow::Borrowed("Name.Builtin"));
    pub const NAME_FUNCTION: TokenType = TokenType(Cow::Borrowed("Name.Function"));
    pub const NAME_TAG: TokenType = TokenType(Cow::Borrowed("Name.Tag"));
    pub const NUMBER: TokenType = TokenType(Cow::Borrowed("Literal.Number"));
    pub const NUMBER_INTEGER: TokenType = TokenType(Cow::Borrowed("Literal.Number.Integer"));
    pub const NUMBER_FLOAT: TokenType = TokenType(Cow::Borrowed("Literal.Number.Float"));
    pub const STRING: TokenType = TokenType(Cow::Borrowed("Literal.String"));
    pub const STRING_ESCAPE: TokenType = TokenType(Cow::Borrowed("Literal.String.Escape"));
    pub const OPERATOR: TokenType = TokenType(Cow::Borrowed("Operator"));
    pub const PUNCTUATION: TokenType = TokenType(Cow::Borrowed("Punctuation"));
    pub const COMMENT: TokenType = TokenType(Cow::Borrowed("Comment"));

    pub fn new(path: impl Into<Cow<'static, str>>) -> Self {
        let path: Cow<'static, str> = path.into();
        let path = match path.strip_prefix("Token.") {
            Some(rest) => rest.to_string(),
            None if path == "Token" => String::new(),
            None => path.into_owned(),
        };
        for alias in ["Number", "String"] {
            if path == alias || path.starts_with(&format!("{alias}.")) {
                return TokenType(Cow::Owned(format!("Literal.{path}")));
            }
        }
        TokenType(Cow::Owned(path))
    }

    pub fn path(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// The enclosing category; `None` for the root.
    pub fn parent(&self) -> Option<TokenType> {
        if self.is_root() {
            return None;
        }
        Some(match self.0.rfind('.') {
            Some(dot) => TokenType(Cow::Owned(self.0[..dot].to_string())),
            None => TokenType::ROOT,
        })
    }

    pub fn child(&self, name: &str) -> TokenType {
        if self.is_root() {
            TokenType::new(name.to_string())
        } else {
            TokenType(Cow::Owned(format!("{}.{name}", self.0)))
        }
    }

    /// Whether `self` is `other` or one of its descendants.
    pub fn is_within(&self, other: &TokenType) -> bool {
        other.is_root()
            || self.0 == other.0
            || (self.0.starts_with(other.path()) && self.0[other.0.len()..].starts_with('.'))
    }

    /// The standard short CSS class name, inherited from the nearest
    /// ancestor that has one.
    pub fn css_class(&self) -> &'static str {
        let mut current = self.clone();
        loop {
            if let Some(class) = STANDARD_TYPES.get(current.path()) {
                return *class;
            }
            match current.parent() {
                Some(parent) => current = parent,
                None => return "",
            }
        }
    }

    /// The style string used for this token in terminal output.
    pub fn class_style(&self) -> String {
        if self.is_root() {
            "class:pygments".to_string()
        } else {
            format!("class:pygments.{}", self.0.to_lowercase())
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            f.write_str("Token")
        } else {
            write!(f, "Token.{}", self.0)
        }
    }
}

static STANDARD_TYPES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    [
        ("", ""),
        ("Text", ""),
        ("Text.Whitespace", "w"),
        ("Escape", "esc"),
        ("Error", "err"),
        ("Other", "x"),
        ("Keyword", "k"),
        ("Keyword.Constant", "kc"),
        ("Keyword.Declaration", "kd"),
        ("Keyword.Namespace", "kn"),
        ("Keyword.Pseudo", "kp"),
        ("Keyword.Reserved", "kr"),
        ("Keyword.Type", "kt"),
        ("Name", "n"),
        ("Name.Attribute", "na"),
        ("Name.Builtin", "nb"),
        ("Name.Builtin.Pseudo", "bp"),
        ("Name.Class", "nc"),
        ("Name.Constant", "no"),
        ("Name.Decorator", "nd"),
        ("Name.Entity", "ni"),
        ("Name.Exception", "ne"),
        ("Name.Function", "nf"),
        ("Name.Function.Magic", "fm"),
        ("Name.Property", "py"),
        ("Name.Label", "nl"),
        ("Name.Namespace", "nn"),
        ("Name.Other", "nx"),
        ("Name.Tag", "nt"),
        ("Name.Variable", "nv"),
        ("Name.Variable.Class", "vc"),
        ("Name.Variable.Global", "vg"),
        ("Name.Variable.Instance", "vi"),
        ("Name.Variable.Magic", "vm"),
        ("Literal", "l"),
        ("Literal.Date", "ld"),
        ("Literal.String", "s"),
        ("Literal.String.Affix", "sa"),
        ("Literal.String.Backtick", "sb"),
        ("Literal.String.Char", "sc"),
        ("Literal.String.Delimiter", "dl"),
        ("Literal.String.Doc", "sd"),
        ("Literal.String.Double", "s2"),
        ("Literal.String.Escape", "se"),
        ("Literal.String.Heredoc", "sh"),
        ("Literal.String.Interpol", "si"),
        ("Literal.String.Other", "sx"),
        ("Literal.String.Regex", "sr"),
        ("Literal.String.Single", "s1"),
        ("Literal.String.Symbol", "ss"),
        ("Literal.Number", "m"),
        ("Literal.Number.Bin", "mb"),
        ("Literal.Number.Float", "mf"),
        ("Literal.Number.Hex", "mh"),
        ("Literal.Number.Integer", "mi"),
        ("Literal.Number.Integer.Long", "il"),
        ("Literal.Number.Oct", "mo"),
        ("Operator", "o"),
        ("Operator.Word", "ow"),
        ("Punctuation", "p"),
        ("Punctuation.Marker", "pm"),
        ("Comment", "c"),
        ("Comment.Hashbang", "ch"),
        ("Comment.Multiline", "cm"),
        ("Comment.Preproc", "cp"),
        ("Comment.PreprocFile", "cpf"),
        ("Comment.Single", "c1"),
        ("Comment.Special", "cs"),
        ("Generic", "g"),
        ("Generic.Deleted", "gd"),
        ("Generic.Emph", "ge"),
        ("Generic.Error", "gr"),
        ("Generic.Heading", "gh"),
        ("Generic.Inserted", "gi"),
        ("Generic.Output", "go"),
        ("Generic.Prompt", "gp"),
        ("Generic.Strong", "gs"),
        ("Generic.Subheading", "gu"),
        ("Generic.EmphStrong", "ges"),
        ("Generic.Traceback", "gt"),
    ]
    .into_iter()
    .collect()
});
