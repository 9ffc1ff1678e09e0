//! JSON, with escape sequences styled apart from the rest of a string.

use serde_json::{Map, Number, Value};
use stylescan_core::Styler;
use stylescan_grammar::{
    chars_not_in, hex_digits, literal, number_text, one_of_literals, Forward, GrammarError, Rule,
};

use crate::control_chars;

pub const THEME: &[(&str, &str)] = &[
    ("constant", "#b27a01 bold"),
    ("escape", "#0092c7"),
    ("number", "#b27a01"),
    ("string", "#528f50"),
];

fn unescape(sequence: &str) -> char {
    match sequence {
        "\\b" => '\u{8}',
        "\\f" => '\u{c}',
        "\\n" => '\n',
        "\\r" => '\r',
        "\\t" => '\t',
        "\\/" => '/',
        "\\\\" => '\\',
        _ => '"',
    }
}

fn to_number(text: &str) -> Option<Value> {
    if let Ok(n) = text.parse::<i64>() {
        return Some(Value::from(n));
    }
    text.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
}

fn string(styler: &Styler) -> Rule<String> {
    let quote = styler.wrap_literal("class:string", "\"");
    let normal = styler.wrap(
        "class:string",
        chars_not_in(format!("{}\\\"", control_chars())),
    );
    let simple = one_of_literals(&[
        "\\\"", "\\/", "\\\\", "\\b", "\\f", "\\n", "\\r", "\\t",
    ])
    .map(unescape);
    let unicode = literal("\\u").ignore_then(hex_digits(4)).map(|hex| {
        u32::from_str_radix(&hex, 16)
            .ok()
            .and_then(char::from_u32)
            .unwrap_or(char::REPLACEMENT_CHARACTER)
    });
    let escape = styler
        .wrap("class:escape", simple.or(unicode))
        .map(String::from);
    let body = normal
        .or(escape)
        .many0()
        .map(|parts| parts.concat())
        .then_ignore(quote.clone());
    quote.ignore_then(body.cut()).padded().named("string")
}

/// Items between `open` and `close`, separated by commas. A trailing comma is
/// rejected. Everything after `open` is committed.
fn delimited<O: 'static>(open: &'static str, item: Rule<O>, close: &'static str) -> Rule<Vec<O>> {
    let comma = || literal(",").padded();
    let items = item
        .separated(comma())
        .opt()
        .not_followed_by(comma())
        .then_ignore(literal(close).padded())
        .map(Option::unwrap_or_default);
    literal(open).padded().ignore_then(items.cut())
}

pub fn parser(styler: &Styler) -> Rule<Value> {
    let strict = !styler.is_active();
    let value = Forward::<Value>::new();

    let string = string(styler);
    let pair = string
        .clone()
        .then_ignore(literal(":").padded())
        .then(value.rule());
    let object = delimited("{", pair, "}")
        .map(|pairs| Value::Object(pairs.into_iter().collect::<Map<_, _>>()))
        .named("object");
    let array = delimited("[", value.rule(), "]")
        .map(Value::Array)
        .named("array");

    let number = styler
        .wrap("class:number", number_text())
        .padded()
        .try_map(move |text| match to_number(&text) {
            Some(n) => Ok(n),
            None if strict => Err(format!("number out of range: {text}")),
            None => Ok(Value::Null),
        });
    let constant = styler
        .wrap(
            "class:constant",
            literal("true")
                .value(Value::Bool(true))
                .or(literal("false").value(Value::Bool(false)))
                .or(literal("null").value(Value::Null)),
        )
        .padded();

    let json = object
        .or(array)
        .or(string.map(Value::String))
        .or(number)
        .or(constant)
        .named("JSON value");
    value.define(json.clone());
    json
}

/// Parse a JSON document.
pub fn parse(source: &str) -> Result<Value, GrammarError> {
    parser(&Styler::dummy()).parse_all(source)
}
