//! Tokens of Python `repr()` output.
//!
//! This is a token grammar: it matches one token at a time and relies on the
//! scanner to find tokens anywhere in the text, so it does not validate.

use once_cell::sync::Lazy;
use regex::Regex;
use stylescan_core::Styler;
use stylescan_grammar::{
    chars_not_in, compiled_regex, hex_digits, hex_word, identifier, literal, number,
    one_of_literals, Rule,
};

use crate::control_chars;

pub const THEME: &[(&str, &str)] = &[
    ("address", "#e45649"),
    ("call", "#4078f2"),
    ("constant", "#b27a01 bold"),
    ("escape", "#0092c7"),
    ("kwarg", "#b27a01 italic"),
    ("magic", "#e45649"),
    ("number", "#b27a01"),
    ("operator", "#b625b4 bold"),
    ("string", "#528f50"),
    ("string_prefix", "#528f50 bold"),
];

static MAGIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^__[a-zA-Z0-9_]+__").expect("magic name pattern is valid"));

/// A string literal delimited by `quote`, with an optional `b` prefix.
fn quoted(styler: &Styler, quote: &'static str, escape: &Rule<()>) -> Rule<()> {
    let mark = styler.wrap_literal("class:string", quote);
    let normal = chars_not_in(format!("{}\\{quote}", control_chars()));
    let chars = styler
        .wrap("class:string", normal)
        .suppress()
        .or(escape.clone());
    styler
        .wrap_literal("class:string_prefix", "b")
        .opt()
        .ignore_then(mark.clone())
        .ignore_then(chars.many0().then_ignore(mark).cut())
        .suppress()
}

/// Build the token grammar. The value of a match is its original text.
pub fn parser(styler: &Styler) -> Rule<String> {
    let simple_escape = one_of_literals(&["\\\\", "\\'", "\\\"", "\\n", "\\r", "\\t"]).suppress();
    let hex_escape = literal("\\x").then(hex_digits(2)).suppress();
    let escape = styler.wrap("class:escape", simple_escape.or(hex_escape));

    let string = quoted(styler, "'", &escape)
        .or(quoted(styler, "\"", &escape))
        .named("string");
    let address = styler
        .wrap("class:address", literal("0x").then(hex_word()))
        .suppress();
    let number = styler.wrap("class:number", number()).suppress();
    let constant = styler
        .wrap(
            "class:constant",
            one_of_literals(&["True", "False", "None", "NotImplemented", "Ellipsis", "..."]),
        )
        .suppress();
    let kwarg = styler
        .wrap("class:kwarg", identifier())
        .then(styler.wrap_literal("class:operator", "=").padded())
        .suppress();
    let call = styler
        .wrap("class:call", identifier())
        .followed_by(literal("(").padded())
        .suppress();
    let magic = styler
        .wrap("class:magic", compiled_regex(MAGIC.clone()))
        .suppress();

    string
        .or(address)
        .or(number)
        .or(constant)
        .or(kwarg)
        .or(call)
        .or(magic)
        .padded()
        .recognize()
        .named("token")
}
