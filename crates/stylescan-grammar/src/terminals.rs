//! Terminal rules: literals, keywords, words, numbers, whitespace.

use std::borrow::Cow;

use nom::branch::alt;
use nom::bytes::complete::{is_not, tag, tag_no_case, take_while, take_while1, take_while_m_n};
use nom::character::complete::{char, digit0, digit1, one_of};
use nom::combinator::{eof, opt, recognize};
use nom::sequence::{pair, tuple};

use crate::{GrammarError, PResult, Rule};

/// Replace a plain mismatch with one naming what was expected at `input`.
fn expecting<'a, O>(
    input: &'a str,
    result: PResult<'a, O>,
    expected: impl FnOnce() -> Cow<'static, str>,
) -> PResult<'a, O> {
    match result {
        Err(nom::Err::Error(_)) => Err(nom::Err::Error(GrammarError::mismatch(input, expected()))),
        other => other,
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

// =============================================================================
// Literals and keywords
// =============================================================================

/// Match `text` exactly.
pub fn literal(text: &'static str) -> Rule<&'static str> {
    Rule::new(move |input| {
        let result = tag::<_, _, GrammarError>(text)(input).map(|(rest, _)| (rest, text));
        expecting(input, result, || format!("{text:?}").into())
    })
    .named(format!("{text:?}"))
}

/// Match the longest of several literals.
pub fn one_of_literals(texts: &[&'static str]) -> Rule<&'static str> {
    let mut texts = texts.to_vec();
    texts.sort_by(|a, b| b.len().cmp(&a.len()));
    let expected = texts
        .iter()
        .map(|t| format!("{t:?}"))
        .collect::<Vec<_>>()
        .join(" | ");
    Rule::new(move |input| {
        for text in &texts {
            if let Some(rest) = input.strip_prefix(text) {
                return Ok((rest, *text));
            }
        }
        Err(nom::Err::Error(GrammarError::mismatch(input, expected.clone())))
    })
}

/// Match `word` when it is not immediately followed by a word character.
pub fn keyword(word: &'static str) -> Rule<&'static str> {
    Rule::new(move |input| {
        let result = tag::<_, _, GrammarError>(word)(input).and_then(|(rest, _)| {
            if rest.starts_with(is_word_char) {
                Err(nom::Err::Error(GrammarError::mismatch(input, "")))
            } else {
                Ok((rest, word))
            }
        });
        expecting(input, result, || format!("keyword {word:?}").into())
    })
}

/// Like [`keyword`], ignoring case. The value is `word` as given.
pub fn caseless_keyword(word: &'static str) -> Rule<&'static str> {
    Rule::new(move |input| {
        let result = tag_no_case::<_, _, GrammarError>(word)(input).and_then(|(rest, _)| {
            if rest.starts_with(is_word_char) {
                Err(nom::Err::Error(GrammarError::mismatch(input, "")))
            } else {
                Ok((rest, word))
            }
        });
        expecting(input, result, || format!("keyword {word:?}").into())
    })
}

// =============================================================================
// Words
// =============================================================================

/// One or more characters not in `excluded`.
pub fn chars_not_in(excluded: impl Into<String>) -> Rule<String> {
    let excluded = excluded.into();
    Rule::new(move |input| {
        let result = is_not::<_, _, GrammarError>(excluded.as_str())(input)
            .map(|(rest, text)| (rest, text.to_string()));
        expecting(input, result, || format!("characters not in {excluded:?}").into())
    })
}

/// A letter or underscore followed by letters, digits and underscores.
pub fn identifier() -> Rule<String> {
    Rule::new(|input| {
        let result = recognize(pair(
            take_while_m_n::<_, _, GrammarError>(1, 1, |c: char| c.is_alphabetic() || c == '_'),
            take_while(|c: char| c.is_alphanumeric() || c == '_'),
        ))(input)
        .map(|(rest, text)| (rest, text.to_string()));
        expecting(input, result, || "identifier".into())
    })
}

/// Exactly `count` hexadecimal digits.
pub fn hex_digits(count: usize) -> Rule<String> {
    Rule::new(move |input| {
        let result =
            take_while_m_n::<_, _, GrammarError>(count, count, |c: char| c.is_ascii_hexdigit())(
                input,
            )
            .map(|(rest, text)| (rest, text.to_string()));
        expecting(input, result, || format!("{count} hex digits").into())
    })
}

/// One or more hexadecimal digits.
pub fn hex_word() -> Rule<String> {
    Rule::new(|input| {
        let result = take_while1::<_, _, GrammarError>(|c: char| c.is_ascii_hexdigit())(input)
            .map(|(rest, text)| (rest, text.to_string()));
        expecting(input, result, || "hex digits".into())
    })
}

// =============================================================================
// Numbers
// =============================================================================

/// An unsigned decimal integer. A digit run too large for `i64` does not
/// match, leaving it to alternatives such as [`fnumber`].
pub fn integer() -> Rule<i64> {
    Rule::new(|input| {
        let (rest, digits) = expecting(input, digit1(input), || "integer".into())?;
        match digits.parse::<i64>() {
            Ok(value) => Ok((rest, value)),
            Err(_) => Err(nom::Err::Error(GrammarError::mismatch(
                input,
                "integer within 64 bits",
            ))),
        }
    })
}

fn sign(input: &str) -> PResult<'_, Option<char>> {
    opt(one_of("+-"))(input)
}

fn exponent(input: &str) -> PResult<'_, Option<&str>> {
    opt(recognize(tuple((one_of("eE"), sign, digit1))))(input)
}

/// Text of a number with a required integer part: `[+-]?\d+\.?\d*` with an
/// optional exponent.
fn fnumber_text(input: &str) -> PResult<'_, &str> {
    recognize(tuple((sign, digit1, opt(char('.')), digit0, exponent)))(input)
}

/// Text of a number whose integer part may be omitted (`.5`).
fn number_slice(input: &str) -> PResult<'_, &str> {
    recognize(tuple((
        sign,
        alt((
            recognize(tuple((digit1, opt(char('.')), digit0))),
            recognize(pair(char('.'), digit1)),
        )),
        exponent,
    )))(input)
}

fn to_float<'a>(input: &'a str, rest: &'a str, text: &str) -> PResult<'a, f64> {
    match text.parse::<f64>() {
        Ok(value) => Ok((rest, value)),
        Err(e) => Err(nom::Err::Failure(GrammarError::action(
            input,
            format!("invalid number {text:?}: {e}"),
        ))),
    }
}

/// A signed decimal number with optional fraction and exponent, as `f64`.
pub fn fnumber() -> Rule<f64> {
    Rule::new(|input| {
        let (rest, text) = expecting(input, fnumber_text(input), || "number".into())?;
        to_float(input, rest, text)
    })
}

/// Like [`fnumber`] but also accepts a bare fraction such as `.5`.
pub fn number() -> Rule<f64> {
    Rule::new(|input| {
        let (rest, text) = expecting(input, number_slice(input), || "number".into())?;
        to_float(input, rest, text)
    })
}

/// The text matched by [`number`].
pub fn number_text() -> Rule<String> {
    Rule::new(|input| {
        expecting(input, number_slice(input), || "number".into())
            .map(|(rest, text)| (rest, text.to_string()))
    })
}

// =============================================================================
// Patterns and whitespace
// =============================================================================

/// A regular expression anchored at the current position.
pub fn regex(pattern: &str) -> Result<Rule<String>, regex::Error> {
    let re = regex::Regex::new(&format!("^(?:{pattern})"))?;
    Ok(compiled_regex(re))
}

/// Match a compiled regular expression. Only matches starting at the current
/// position count, so `re` should be anchored with `^`.
pub fn compiled_regex(re: regex::Regex) -> Rule<String> {
    let expected: Cow<'static, str> = format!("/{}/", re.as_str()).into();
    Rule::new(move |input| match re.find(input) {
        Some(m) if m.start() == 0 => Ok((&input[m.end()..], m.as_str().to_string())),
        _ => Err(nom::Err::Error(GrammarError::mismatch(input, expected.clone()))),
    })
}

/// Zero or more whitespace characters, Unicode whitespace included. Never
/// fails.
pub fn whitespace0() -> Rule<()> {
    Rule::new(|input| take_while(char::is_whitespace)(input).map(|(rest, _)| (rest, ())))
}

/// One or more whitespace characters.
pub fn whitespace() -> Rule<String> {
    Rule::new(|input| {
        let result = take_while1::<_, _, GrammarError>(char::is_whitespace)(input)
            .map(|(rest, text)| (rest, text.to_string()));
        expecting(input, result, || "whitespace".into())
    })
}

/// Succeeds only at the end of the input.
pub fn end_of_input() -> Rule<()> {
    Rule::new(|input| {
        let result = eof::<_, GrammarError>(input).map(|(rest, _)| (rest, ()));
        expecting(input, result, || "end of text".into())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    // =========================================================================
    // Literals and keywords
    // =========================================================================

    #[test]
    fn test_literal() {
        assert_eq!(literal("(").parse_prefix("(1)").unwrap(), ("(", 1));
        let err = literal("(").parse_all("x").unwrap_err();
        assert_eq!(err.to_string(), "expected \"(\"");
    }

    #[test]
    fn test_one_of_literals_prefers_longest() {
        let rule = one_of_literals(&["<", "<=", "="]);
        assert_eq!(rule.parse_prefix("<=3").unwrap(), ("<=", 2));
        assert_eq!(rule.parse_prefix("<3").unwrap(), ("<", 1));
    }

    #[test]
    fn test_keyword_word_boundary() {
        assert!(keyword("true").parse_all("true").is_ok());
        assert!(keyword("true").parse_prefix("trueish").is_err());
        assert!(keyword("true").parse_prefix("true,").is_ok());
    }

    #[test]
    fn test_caseless_keyword() {
        assert_eq!(caseless_keyword("null").parse_all("NULL").unwrap(), "null");
    }

    // =========================================================================
    // Words and numbers
    // =========================================================================

    #[test]
    fn test_identifier_and_chars_not_in() {
        assert_eq!(identifier().parse_prefix("_a1 b").unwrap(), ("_a1".to_string(), 3));
        assert!(identifier().parse_prefix("1a").is_err());
        assert_eq!(
            chars_not_in("()\" ").parse_prefix("abc)").unwrap(),
            ("abc".to_string(), 3)
        );
    }

    #[test]
    fn test_hex() {
        assert_eq!(hex_digits(4).parse_prefix("00e9x").unwrap(), ("00e9".to_string(), 4));
        assert!(hex_digits(4).parse_prefix("0e9").is_err());
        assert_eq!(hex_word().parse_all("DEADbeef").unwrap(), "DEADbeef");
    }

    #[test]
    fn test_integer() {
        assert_eq!(integer().parse_prefix("123abc").unwrap(), (123, 3));
        assert!(integer().parse_prefix("-1").is_err());
    }

    #[test]
    fn test_integer_too_large_is_a_mismatch() {
        let err = integer().parse_all("99999999999999999999").unwrap_err();
        assert!(!err.is_action());
        assert_eq!(err.to_string(), "expected integer within 64 bits");

        let either = crate::longest(vec![integer().map(|n| n as f64), fnumber()]);
        assert_eq!(
            either.parse_prefix("12345678901234567890)").unwrap(),
            (12345678901234567890.0, 20)
        );
    }

    #[test]
    fn test_fnumber_forms() {
        assert_eq!(fnumber().parse_all("3.00").unwrap(), 3.0);
        assert_eq!(fnumber().parse_all("-2.5e3").unwrap(), -2500.0);
        assert_eq!(fnumber().parse_all("7.").unwrap(), 7.0);
        assert!(fnumber().parse_prefix(".5").is_err());
    }

    #[test]
    fn test_number_accepts_bare_fraction() {
        assert_eq!(number().parse_all(".5").unwrap(), 0.5);
        assert_eq!(number_text().parse_prefix("1e5,").unwrap(), ("1e5".to_string(), 3));
    }

    #[test]
    fn test_exponent_needs_digits() {
        assert_eq!(fnumber().parse_prefix("1e").unwrap(), (1.0, 1));
    }

    // =========================================================================
    // Patterns and whitespace
    // =========================================================================

    #[test]
    fn test_regex_is_anchored() {
        let rule = regex("[a-z]+").unwrap();
        assert_eq!(rule.parse_prefix("abc1").unwrap(), ("abc".to_string(), 3));
        assert!(rule.parse_prefix("1abc").is_err());
        assert!(regex("(").is_err());
    }

    #[test]
    fn test_compiled_regex_only_matches_at_start() {
        let rule = compiled_regex(regex::Regex::new("[0-9]+").unwrap());
        assert_eq!(rule.parse_prefix("12a").unwrap(), ("12".to_string(), 2));
        assert!(rule.parse_prefix("a12").is_err());
    }

    #[test]
    fn test_whitespace() {
        assert_eq!(whitespace0().parse_prefix("x").unwrap(), ((), 0));
        assert_eq!(whitespace().parse_prefix(" \n x").unwrap(), (" \n ".to_string(), 3));
        assert!(whitespace().parse_prefix("x").is_err());
    }

    #[test]
    fn test_whitespace_includes_unicode() {
        assert_eq!(whitespace0().parse_prefix("\x0c\u{a0}x").unwrap(), ((), 3));
        let rule = literal("x").padded();
        assert_eq!(rule.parse_all("\u{a0}x\u{a0}").unwrap(), "x");
        assert_eq!(rule.parse_all("\x0cx").unwrap(), "x");
    }

    #[test]
    fn test_end_of_input() {
        assert!(end_of_input().parse_all("").is_ok());
        assert!(end_of_input().parse_prefix("x").is_err());
    }
}
