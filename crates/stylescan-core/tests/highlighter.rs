//! End-to-end highlighting of a nested number grammar.

use pretty_assertions::assert_eq;
use stylescan_core::{
    FormattedText, HighlightError, Highlighter, HighlighterOptions, StyleTag, Styler, TokenType,
};
use stylescan_grammar::{fnumber, integer, literal, longest, Forward, Rule};

/// Integers and decimals, possibly nested in `open`/`close` groups.
fn numbers(
    styler: &Styler,
    int_style: impl Into<StyleTag>,
    float_style: impl Into<StyleTag>,
    delimiters: (&'static str, &'static str),
) -> Rule<Vec<f64>> {
    let int = styler
        .wrap(int_style, integer())
        .padded()
        .map(|n| vec![n as f64]);
    let float = styler.wrap(float_style, fnumber()).padded().map(|x| vec![x]);
    let group_items = Forward::<Vec<f64>>::new();
    let group = literal(delimiters.0)
        .padded()
        .ignore_then(group_items.rule().many0())
        .then_ignore(literal(delimiters.1).padded())
        .map(|items| items.concat());
    group_items.define(longest(vec![int, float]).or(group));
    group_items.rule()
}

fn parser_factory(styler: &Styler) -> Rule<Vec<f64>> {
    numbers(styler, "class:int", "class:float", ("(", ")"))
}

fn highlighter() -> Highlighter<Vec<f64>> {
    Highlighter::new(parser_factory)
}

fn pairs(fragments: &FormattedText) -> Vec<(String, String)> {
    fragments
        .iter()
        .map(|f| (f.style.to_string(), f.text.clone()))
        .collect()
}

fn expected(items: &[(&str, &str)]) -> Vec<(String, String)> {
    items
        .iter()
        .map(|(style, text)| (style.to_string(), text.to_string()))
        .collect()
}

// =============================================================================
// Fragments
// =============================================================================

#[test]
fn test_single_int() {
    let fragments = highlighter().highlight("(1)");
    assert_eq!(
        pairs(&fragments),
        expected(&[("", "("), ("class:int", "1"), ("", ")")])
    );
}

#[test]
fn test_preserve_original() {
    let fragments = highlighter().highlight("(1.000)");
    assert_eq!(
        pairs(&fragments),
        expected(&[("", "("), ("class:float", "1.000"), ("", ")")])
    );
}

#[test]
fn test_tabs() {
    let fragments = highlighter().highlight("( \t 1)");
    assert_eq!(
        pairs(&fragments),
        expected(&[("", "( \t "), ("class:int", "1"), ("", ")")])
    );
}

#[test]
fn test_newlines() {
    let fragments = highlighter().highlight("( \n 1)");
    assert_eq!(
        pairs(&fragments),
        expected(&[("", "( \n "), ("class:int", "1"), ("", ")")])
    );
}

#[test]
fn test_nested() {
    let pph = highlighter();
    let source = "(1 (2 3.00 () 4) 5)";
    assert_eq!(pph.rule().parse_all(source).unwrap(), vec![1.0, 2.0, 3.0, 4.0, 5.0]);
    let fragments = pph.highlight(source);
    assert_eq!(
        pairs(&fragments),
        expected(&[
            ("", "("),
            ("class:int", "1"),
            ("", " ("),
            ("class:int", "2"),
            ("", " "),
            ("class:float", "3.00"),
            ("", " () "),
            ("class:int", "4"),
            ("", ") "),
            ("class:int", "5"),
            ("", ")"),
        ])
    );
}

#[test]
fn test_adjacent_styled_fragments() {
    let pph = Highlighter::new(|styler| {
        styler
            .wrap_literal("#f00", "a")
            .or(styler.wrap_literal("#00f", "b"))
            .or(literal("c"))
            .many1()
    });
    let source = "aabca";
    assert!(pph.rule().parse_all(source).is_ok());
    assert_eq!(
        pairs(&pph.highlight(source)),
        expected(&[("#f00", "a"), ("#f00", "a"), ("#00f", "b"), ("", "c"), ("#f00", "a")])
    );
}

#[test]
fn test_restart() {
    let fragments = highlighter().highlight("(1 (a 2))");
    assert_eq!(
        pairs(&fragments),
        expected(&[
            ("", "("),
            ("class:int", "1"),
            ("", " (a "),
            ("class:int", "2"),
            ("", "))"),
        ])
    );
}

#[test]
fn test_backout() {
    let pph = Highlighter::new(|styler| {
        let assignment = styler
            .wrap("class:int", integer())
            .padded()
            .then_ignore(literal("=").padded())
            .suppress();
        let expr = Forward::<()>::new();
        let group = literal("(")
            .padded()
            .ignore_then(expr.rule().many0())
            .then_ignore(literal(")").padded())
            .suppress();
        expr.define(assignment.or(group));
        expr.rule()
    });
    assert_eq!(pairs(&pph.highlight("(1)")), expected(&[("", "(1)")]));
    assert_eq!(
        pairs(&pph.highlight("(1=)")),
        expected(&[("", "("), ("class:int", "1"), ("", "=)")])
    );
}

#[test]
fn test_abandoned_alternative_leaves_no_span() {
    let pph = Highlighter::new(|styler| {
        let shout = styler.wrap_literal("class:a", "x").then_ignore(literal("!"));
        let pair = literal("x").ignore_then(styler.wrap_literal("class:b", "y"));
        shout.or(pair)
    });
    assert_eq!(
        pairs(&pph.highlight("xy")),
        expected(&[("", "x"), ("class:b", "y")])
    );
}

#[test]
fn test_overlap() {
    let pph = Highlighter::new(|styler| styler.wrap("bold", parser_factory(styler)));
    assert_eq!(
        pairs(&pph.highlight("(1 2) ")),
        expected(&[("bold", "(1 2)"), ("", " ")])
    );
}

#[test]
fn test_parse_action_on_styled_rule() {
    let pph = Highlighter::new(|styler| {
        let int = styler.wrap("class:int", integer()).map(|n| -n).padded();
        literal("(")
            .padded()
            .ignore_then(int.many0())
            .then_ignore(literal(")").padded())
    });
    assert_eq!(
        pairs(&pph.highlight("(1)")),
        expected(&[("", "("), ("class:int", "1"), ("", ")")])
    );
    assert_eq!(pph.rule().parse_all("(1)").unwrap(), vec![-1]);
}

#[test]
fn test_failing_action_is_reported() {
    let pph = Highlighter::new(|styler| {
        let int = styler
            .wrap("class:int", integer())
            .try_map(|_| Err::<i64, _>("test"))
            .padded()
            .map(|n| vec![n as f64]);
        let float = styler.wrap("class:float", fnumber()).padded().map(|x| vec![x]);
        longest(vec![int, float])
    });
    let fragments = pph.highlight("(1)");
    assert_eq!(fragments.text(), "(1)");
    let report = pph.last_report();
    assert!(!report.diagnostics.is_empty());
    assert_eq!(report.diagnostics[0].offset, 1);
}

#[test]
fn test_idempotent() {
    let pph = highlighter();
    let first = pph.highlight("(1 (2 x) 3.5)");
    let second = pph.highlight("(1 (2 x) 3.5)");
    assert_eq!(first, second);
    pph.highlight("(9)");
    assert_eq!(pph.highlight("(1 (2 x) 3.5)"), first);
}

#[test]
fn test_invalid_input() {
    let err = highlighter().highlight_bytes(&[0x28, 0xc3, 0x28]).unwrap_err();
    assert!(matches!(err, HighlightError::InvalidInput(_)));
}

#[test]
fn test_integer_beyond_64_bits_is_one_float() {
    let pph = highlighter();
    let fragments = pph.highlight("(12345678901234567890)");
    assert_eq!(
        pairs(&fragments),
        expected(&[
            ("", "("),
            ("class:float", "12345678901234567890"),
            ("", ")"),
        ])
    );
    assert!(pph.last_report().diagnostics.is_empty());
}

#[test]
fn test_deep_nesting_is_reported_not_fatal() {
    let pph = highlighter();
    let source = "(".repeat(10_000);
    let fragments = pph.highlight(&source);
    assert_eq!(fragments.text(), source);
    assert!(fragments.iter().all(|f| f.style.is_empty()));
    let report = pph.last_report();
    assert!(report.attempts <= source.len() + 1);
    assert_eq!(report.diagnostics[0].offset, 0);
    assert!(report.diagnostics[0].message.contains("recursion limit exceeded"));
}

#[test]
fn test_deep_nesting_inside_limit_still_highlights() {
    let (open, close) = ("(".repeat(40), ")".repeat(40));
    let fragments = highlighter().highlight(&format!("{open}7{close}"));
    assert_eq!(
        pairs(&fragments),
        expected(&[("", open.as_str()), ("class:int", "7"), ("", close.as_str())])
    );
}

// =============================================================================
// HTML
// =============================================================================

#[test]
fn test_html() {
    assert_eq!(
        highlighter().highlight_html("(1)"),
        "<pre class=\"highlight\">(<span class=\"int\">1</span>)</pre>"
    );
}

#[test]
fn test_html_wrapping_class() {
    assert_eq!(
        highlighter().highlight_html_with_class("(1)", "thing"),
        "<pre class=\"thing\">(<span class=\"int\">1</span>)</pre>"
    );
}

#[test]
fn test_html_multiclass() {
    let pph = Highlighter::new(|styler| {
        numbers(styler, "class:int class:number", "class:float class:number", ("(", ")"))
    });
    assert_eq!(
        pph.highlight_html("(1)"),
        "<pre class=\"highlight\">(<span class=\"int number\">1</span>)</pre>"
    );
}

#[test]
fn test_html_escape() {
    let pph = Highlighter::new(|styler| numbers(styler, "class:int", "class:float", ("<", ">")));
    assert_eq!(
        pph.highlight_html("<1>"),
        "<pre class=\"highlight\">&lt;<span class=\"int\">1</span>&gt;</pre>"
    );
}

#[test]
fn test_html_dotted_classes() {
    let pph = Highlighter::new(|styler| {
        numbers(styler, "class:number.int", "class:number.float", ("(", ")"))
    });
    assert_eq!(
        pph.highlight_html("(1)"),
        "<pre class=\"highlight\">(<span class=\"number-int\">1</span>)</pre>"
    );
}

// =============================================================================
// Token styles
// =============================================================================

fn token_highlighter() -> Highlighter<Vec<f64>> {
    Highlighter::with_options(
        |styler| {
            numbers(
                styler,
                TokenType::new("Number.Integer"),
                TokenType::new("Number.Float"),
                ("(", ")"),
            )
        },
        HighlighterOptions {
            uses_token_styles: true,
            ..Default::default()
        },
    )
}

#[test]
fn test_token_fragments() {
    assert_eq!(
        pairs(&token_highlighter().highlight("(1)")),
        expected(&[
            ("class:pygments.text", "("),
            ("class:pygments.literal.number.integer", "1"),
            ("class:pygments.text", ")"),
        ])
    );
}

#[test]
fn test_html_tokens() {
    assert_eq!(
        token_highlighter().highlight_html("(1)"),
        "<pre class=\"highlight\">(<span class=\"mi\">1</span>)</pre>"
    );
}

// =============================================================================
// Lines
// =============================================================================

#[test]
fn test_document_lexer() {
    let lines = highlighter().lex_document("(1)");
    assert_eq!(
        pairs(lines.line(0).unwrap()),
        expected(&[("", "("), ("class:int", "1"), ("", ")")])
    );
}

#[test]
fn test_document_lexer_multiline() {
    let lines = highlighter().lex_document("( \n 1)");
    assert_eq!(pairs(lines.line(0).unwrap()), expected(&[("", "( ")]));
    assert_eq!(
        pairs(lines.line(1).unwrap()),
        expected(&[("", " "), ("class:int", "1"), ("", ")")])
    );
    assert!(matches!(
        lines.line(2),
        Err(HighlightError::LineOutOfRange { index: 2, lines: 2 })
    ));
}
