//! Lisp-style S-expressions.
//!
//! The first form of a list is styled as a call. While highlighting, a
//! missing closing parenthesis or string quote is tolerated so that input
//! still being typed keeps its colors.

use stylescan_core::Styler;
use stylescan_grammar::{
    caseless_keyword, chars_not_in, literal, longest, number, Forward, GrammarError, Rule,
};

use crate::control_chars;

pub const THEME: &[(&str, &str)] = &[
    ("call", "#4078f2"),
    ("constant", "#b27a01 bold"),
    ("number", "#b27a01"),
    ("quote", "#0092c7"),
    ("string", "#528f50"),
];

/// A parsed form. `nil` reads as the empty list.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    True,
    Number(f64),
    Symbol(String),
    Str(String),
    List(Vec<Node>),
    Quote(Box<Node>),
}

/// `text`, which is optional while highlighting.
fn closing(styler: &Styler, text: &'static str) -> Rule<()> {
    if styler.is_active() {
        literal(text).opt().suppress()
    } else {
        literal(text).suppress()
    }
}

pub fn parser(styler: &Styler) -> Rule<Node> {
    let form_first = Forward::<Node>::new();
    let form = Forward::<Node>::new();

    let nil = caseless_keyword("nil").value(Node::List(Vec::new()));
    let t = caseless_keyword("t").value(Node::True);
    let constant = styler.wrap("class:constant", nil.or(t)).padded();

    let number = styler
        .wrap("class:number", number())
        .padded()
        .map(Node::Number);

    let excluded = format!("{}'\"`;,()[]{{}} ", control_chars());
    let symbol = styler
        .wrap("class:symbol", chars_not_in(excluded))
        .named("symbol")
        .padded();
    let call = styler.wrap("class:call", symbol.clone()).map(Node::Symbol);
    let symbol = symbol.map(Node::Symbol);

    let string = styler
        .wrap(
            "class:string",
            literal("\"")
                .ignore_then(chars_not_in("\"").opt())
                .then_ignore(closing(styler, "\"")),
        )
        .named("string")
        .padded()
        .map(|text| Node::Str(text.unwrap_or_default()));

    let forms = form_first
        .rule()
        .then(form.rule().many0())
        .map(|(first, mut rest)| {
            rest.insert(0, first);
            rest
        });
    let list = literal("(")
        .padded()
        .ignore_then(forms.opt())
        .then_ignore(closing(styler, ")").padded())
        .map(|forms| Node::List(forms.unwrap_or_default()))
        .named("s-expression");

    let quote = styler
        .wrap_literal("class:quote", "'")
        .padded()
        .ignore_then(form.rule())
        .map(|quoted| Node::Quote(Box::new(quoted)))
        .named("quoted form");

    form_first.define(
        constant
            .clone()
            .or(longest(vec![number.clone(), call]))
            .or(string.clone())
            .or(list.clone())
            .or(quote.clone()),
    );
    let top = constant
        .or(longest(vec![number, symbol]))
        .or(string)
        .or(list)
        .or(quote)
        .named("form");
    form.define(top.clone());
    top
}

/// Parse a single form.
pub fn parse(source: &str) -> Result<Node, GrammarError> {
    parser(&Styler::dummy()).parse_all(source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use stylescan_core::Highlighter;

    fn sym(name: &str) -> Node {
        Node::Symbol(name.to_string())
    }

    fn pairs(source: &str) -> Vec<(String, String)> {
        Highlighter::new(parser)
            .highlight(source)
            .iter()
            .map(|f| (f.style.to_string(), f.text.clone()))
            .collect()
    }

    fn frag(style: &str, text: &str) -> (String, String) {
        (style.to_string(), text.to_string())
    }

    // =========================================================================
    // Parsing
    // =========================================================================

    #[test]
    fn test_parse_nested() {
        assert_eq!(
            parse("(defun f (x) 'x)").unwrap(),
            Node::List(vec![
                sym("defun"),
                sym("f"),
                Node::List(vec![sym("x")]),
                Node::Quote(Box::new(sym("x"))),
            ])
        );
    }

    #[test]
    fn test_parse_atoms() {
        assert_eq!(
            parse("(nil T 1.5 \"hi\" t1)").unwrap(),
            Node::List(vec![
                Node::List(vec![]),
                Node::True,
                Node::Number(1.5),
                Node::Str("hi".to_string()),
                sym("t1"),
            ])
        );
    }

    #[test]
    fn test_symbol_longer_than_number() {
        assert_eq!(parse("1+").unwrap(), sym("1+"));
        assert_eq!(parse("12").unwrap(), Node::Number(12.0));
    }

    #[test]
    fn test_parse_requires_closing() {
        assert!(parse("(a b").is_err());
        assert!(parse("\"open").is_err());
    }

    // =========================================================================
    // Highlighting
    // =========================================================================

    #[test]
    fn test_highlight_call() {
        assert_eq!(
            pairs("(print 'x 2)"),
            vec![
                frag("", "("),
                frag("class:call", "print"),
                frag("", " "),
                frag("class:quote", "'"),
                frag("class:symbol", "x"),
                frag("", " "),
                frag("class:number", "2"),
                frag("", ")"),
            ]
        );
    }

    #[test]
    fn test_highlight_tolerates_unclosed_input() {
        assert_eq!(
            pairs("(print \"hi"),
            vec![
                frag("", "("),
                frag("class:call", "print"),
                frag("", " "),
                frag("class:string", "\"hi"),
            ]
        );
    }
}
