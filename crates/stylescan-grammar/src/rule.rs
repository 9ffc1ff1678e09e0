use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use nom::Parser;

use crate::journal;
use crate::GrammarError;

/// Result of a rule match: the unconsumed input and the rule's value.
pub type PResult<'a, O> = nom::IResult<&'a str, O, GrammarError>;

type ParseFn<O> = dyn for<'a> Fn(&'a str) -> PResult<'a, O>;

/// A composable grammar rule producing values of type `O`.
///
/// Cloning a rule is cheap and shares the underlying parser. A rule may have
/// a leading skip (see [`Rule::skipping`]) which [`Rule::parse`] applies
/// before matching, and a name used in "expected ..." errors.
///
/// Unary transformations (`map`, `suppress`, `opt`, ...) keep the skip of the
/// rule they wrap on the outside, so `r.padded().map(f)` skips whitespace
/// before the match just like `r.padded()` does. A sequence takes the skip of
/// its first element.
pub struct Rule<O> {
    parser: Rc<ParseFn<O>>,
    skip: Option<Rc<Rule<()>>>,
    name: Option<Rc<str>>,
}

impl<O> Clone for Rule<O> {
    fn clone(&self) -> Self {
        Self {
            parser: Rc::clone(&self.parser),
            skip: self.skip.clone(),
            name: self.name.clone(),
        }
    }
}

impl<O> fmt::Debug for Rule<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("skips", &self.skip.is_some())
            .finish()
    }
}

impl<O> fmt::Display for Rule<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name.as_deref().unwrap_or("rule"))
    }
}

impl<O: 'static> Rule<O> {
    /// Build a rule from a parsing function.
    pub fn new<F>(parser: F) -> Self
    where
        F: for<'a> Fn(&'a str) -> PResult<'a, O> + 'static,
    {
        Self {
            parser: Rc::new(parser),
            skip: None,
            name: None,
        }
    }

    /// Build a rule around `parser` that keeps this rule's leading skip.
    /// `parser` is handed input the skip has already been applied to.
    pub fn decorate<P: 'static, F>(&self, parser: F) -> Rule<P>
    where
        F: for<'a> Fn(&'a str) -> PResult<'a, P> + 'static,
    {
        Rule {
            parser: Rc::new(parser),
            skip: self.skip.clone(),
            name: None,
        }
    }

    // =========================================================================
    // Matching
    // =========================================================================

    /// Skip leading input according to this rule's skip, if any.
    pub fn pre_skip<'a>(&self, input: &'a str) -> &'a str {
        match &self.skip {
            Some(skip) => match skip.parse(input) {
                Ok((rest, ())) => rest,
                Err(_) => input,
            },
            None => input,
        }
    }

    /// Match without applying the leading skip.
    pub fn parse_no_skip<'a>(&self, input: &'a str) -> PResult<'a, O> {
        match (self.parser)(input) {
            Err(nom::Err::Error(e)) if e.remaining == input.len() && !e.is_action() => {
                match &self.name {
                    Some(name) => Err(nom::Err::Error(GrammarError::mismatch(
                        input,
                        name.to_string(),
                    ))),
                    None => Err(nom::Err::Error(e)),
                }
            }
            result => result,
        }
    }

    /// Apply the leading skip, then match.
    pub fn parse<'a>(&self, input: &'a str) -> PResult<'a, O> {
        self.parse_no_skip(self.pre_skip(input))
    }

    /// Match the whole of `source`. Trailing whitespace is allowed.
    pub fn parse_all(&self, source: &str) -> Result<O, GrammarError> {
        let (rest, value) = self
            .parse(source)
            .map_err(|e| GrammarError::from_nom(e, source))?;
        let rest = rest.trim_start();
        if rest.is_empty() {
            Ok(value)
        } else {
            Err(GrammarError::mismatch(rest, "end of text"))
        }
    }

    /// Match at the start of `source` and return the value plus the number
    /// of bytes consumed (leading skip included).
    pub fn parse_prefix(&self, source: &str) -> Result<(O, usize), GrammarError> {
        let (rest, value) = self
            .parse(source)
            .map_err(|e| GrammarError::from_nom(e, source))?;
        Ok((value, source.len() - rest.len()))
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Name the rule; failures at its start report `expected <name>`.
    pub fn named(mut self, name: impl Into<Rc<str>>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the leading skip rule.
    pub fn skipping(mut self, skip: Rule<()>) -> Self {
        self.skip = Some(Rc::new(skip));
        self
    }

    /// Skip leading whitespace (including newlines) before matching.
    pub fn padded(self) -> Self {
        self.skipping(crate::whitespace0())
    }

    /// Drop the leading skip.
    pub fn leave_whitespace(mut self) -> Self {
        self.skip = None;
        self
    }

    pub fn skips(&self) -> bool {
        self.skip.is_some()
    }

    // =========================================================================
    // Sequences
    // =========================================================================

    /// Match `self`, then `next`; keep both values.
    pub fn then<P: 'static>(self, next: Rule<P>) -> Rule<(O, P)> {
        let first = self.clone();
        self.decorate(move |input| {
            let (input, a) = first.parse_no_skip(input)?;
            let (input, b) = next.parse(input)?;
            Ok((input, (a, b)))
        })
    }

    /// Match `self`, then `next`; keep the value of `self`.
    pub fn then_ignore<P: 'static>(self, next: Rule<P>) -> Rule<O> {
        let first = self.clone();
        self.decorate(move |input| {
            let (input, a) = first.parse_no_skip(input)?;
            let (input, _) = next.parse(input)?;
            Ok((input, a))
        })
    }

    /// Match `self`, then `next`; keep the value of `next`.
    pub fn ignore_then<P: 'static>(self, next: Rule<P>) -> Rule<P> {
        let first = self.clone();
        self.decorate(move |input| {
            let (input, _) = first.parse_no_skip(input)?;
            next.parse(input)
        })
    }

    /// Turn a mismatch of this rule into a committed failure: enclosing
    /// alternatives will not try other branches.
    pub fn cut(self) -> Rule<O> {
        let inner = self.clone();
        self.decorate(move |input| match inner.parse_no_skip(input) {
            Err(nom::Err::Error(e)) => Err(nom::Err::Failure(e)),
            result => result,
        })
    }

    // =========================================================================
    // Alternatives
    // =========================================================================

    /// Ordered alternative: the first of `self` and `other` that matches.
    pub fn or(self, other: Rule<O>) -> Rule<O> {
        Rule::new(move |input| {
            let mark = journal::mark();
            match self.parse(input) {
                Err(nom::Err::Error(first)) => {
                    journal::undo(mark);
                    match other.parse(input) {
                        Err(nom::Err::Error(second)) => {
                            journal::undo(mark);
                            Err(nom::Err::Error(first.furthest(second)))
                        }
                        result => result,
                    }
                }
                result => result,
            }
        })
    }

    /// Longest-match alternative between `self` and `other`.
    pub fn or_longest(self, other: Rule<O>) -> Rule<O> {
        longest(vec![self, other])
    }

    /// Zero or one match.
    pub fn opt(self) -> Rule<Option<O>> {
        let inner = self.clone();
        self.decorate(move |input| {
            let mark = journal::mark();
            match inner.parse_no_skip(input) {
                Ok((rest, value)) => Ok((rest, Some(value))),
                Err(nom::Err::Error(_)) => {
                    journal::undo(mark);
                    Ok((input, None))
                }
                Err(e) => Err(e),
            }
        })
    }

    // =========================================================================
    // Repetition
    // =========================================================================

    /// Zero or more matches. Stops after a match that consumed nothing.
    pub fn many0(self) -> Rule<Vec<O>> {
        let inner = self.clone();
        self.decorate(move |input| repeat(&inner, input, Vec::new()))
    }

    /// One or more matches.
    pub fn many1(self) -> Rule<Vec<O>> {
        let inner = self.clone();
        self.decorate(move |input| {
            let (rest, first) = inner.parse_no_skip(input)?;
            if rest.len() == input.len() {
                return Ok((rest, vec![first]));
            }
            repeat(&inner, rest, vec![first])
        })
    }

    /// One or more matches separated by `separator` (a delimited list).
    pub fn separated<S: 'static>(self, separator: Rule<S>) -> Rule<Vec<O>> {
        let item = self.clone();
        let tail = separator.ignore_then(self.clone());
        self.decorate(move |input| {
            let (rest, first) = item.parse_no_skip(input)?;
            let mut values = vec![first];
            let mut rest = rest;
            loop {
                let mark = journal::mark();
                match tail.parse(rest) {
                    Ok((next, value)) if next.len() < rest.len() => {
                        values.push(value);
                        rest = next;
                    }
                    Ok(_) => break,
                    Err(nom::Err::Error(_)) => {
                        journal::undo(mark);
                        break;
                    }
                    Err(e) => return Err(e),
                }
            }
            Ok((rest, values))
        })
    }

    // =========================================================================
    // Values
    // =========================================================================

    /// Transform the value of a successful match (a parse action).
    pub fn map<P: 'static, F>(self, f: F) -> Rule<P>
    where
        F: Fn(O) -> P + 'static,
    {
        let inner = self.clone();
        self.decorate(move |input| {
            let (rest, value) = inner.parse_no_skip(input)?;
            Ok((rest, f(value)))
        })
    }

    /// Transform the value with a fallible parse action. An `Err` from the
    /// action is not a mismatch: it is raised as a committed
    /// [`GrammarErrorKind::Action`](crate::GrammarErrorKind::Action) failure.
    pub fn try_map<P: 'static, E, F>(self, f: F) -> Rule<P>
    where
        E: fmt::Display,
        F: Fn(O) -> Result<P, E> + 'static,
    {
        let inner = self.clone();
        self.decorate(move |input| {
            let (rest, value) = inner.parse_no_skip(input)?;
            match f(value) {
                Ok(mapped) => Ok((rest, mapped)),
                Err(e) => Err(nom::Err::Failure(GrammarError::action(input, e.to_string()))),
            }
        })
    }

    /// Replace the value with a constant.
    pub fn value<P: Clone + 'static>(self, value: P) -> Rule<P> {
        self.map(move |_| value.clone())
    }

    /// Discard the value.
    pub fn suppress(self) -> Rule<()> {
        self.map(|_| ())
    }

    /// Replace the value with the text the match consumed.
    pub fn recognize(self) -> Rule<String> {
        let inner = self.clone();
        self.decorate(move |input| {
            let (rest, _) = inner.parse_no_skip(input)?;
            let consumed = &input[..input.len() - rest.len()];
            Ok((rest, consumed.to_string()))
        })
    }

    // =========================================================================
    // Lookahead
    // =========================================================================

    /// Match `self` only if `next` matches afterwards; `next` is not consumed.
    pub fn followed_by<P: 'static>(self, next: Rule<P>) -> Rule<O> {
        let inner = self.clone();
        self.decorate(move |input| {
            let (rest, value) = inner.parse_no_skip(input)?;
            let mark = journal::mark();
            let ahead = next.parse(rest);
            journal::undo(mark);
            match ahead {
                Ok(_) => Ok((rest, value)),
                Err(e) => Err(e),
            }
        })
    }

    /// Match `self` only if `next` does not match afterwards.
    pub fn not_followed_by<P: 'static>(self, next: Rule<P>) -> Rule<O> {
        let inner = self.clone();
        self.decorate(move |input| {
            let (rest, value) = inner.parse_no_skip(input)?;
            let mark = journal::mark();
            let ahead = next.parse(rest);
            journal::undo(mark);
            match ahead {
                Ok(_) => Err(nom::Err::Error(GrammarError::mismatch(
                    rest,
                    format!("no {next}"),
                ))),
                Err(nom::Err::Error(_)) => Ok((rest, value)),
                Err(e) => Err(e),
            }
        })
    }
}

// The first repetition is matched without the skip, which the caller has
// already applied.
fn repeat<'a, O: 'static>(
    rule: &Rule<O>,
    mut input: &'a str,
    mut values: Vec<O>,
) -> PResult<'a, Vec<O>> {
    loop {
        let mark = journal::mark();
        let attempt = if values.is_empty() {
            rule.parse_no_skip(input)
        } else {
            rule.parse(input)
        };
        match attempt {
            Ok((rest, value)) => {
                let progressed = rest.len() < input.len();
                values.push(value);
                input = rest;
                if !progressed {
                    return Ok((input, values));
                }
            }
            Err(nom::Err::Error(_)) => {
                journal::undo(mark);
                return Ok((input, values));
            }
            Err(e) => return Err(e),
        }
    }
}

/// Longest-match alternative: try every alternative and keep the one that
/// consumed the most input; ties go to the earliest. The winner is matched
/// once more after the trials so that its side effects are the ones left.
pub fn longest<O: 'static>(alternatives: Vec<Rule<O>>) -> Rule<O> {
    Rule::new(move |input| {
        let mark = journal::mark();
        let mut best: Option<(usize, usize)> = None;
        let mut error: Option<GrammarError> = None;
        for (index, alternative) in alternatives.iter().enumerate() {
            match alternative.parse(input) {
                Ok((rest, _)) => {
                    if best.map_or(true, |(_, remaining)| rest.len() < remaining) {
                        best = Some((index, rest.len()));
                    }
                }
                Err(nom::Err::Error(e)) => {
                    error = Some(match error {
                        Some(previous) => previous.furthest(e),
                        None => e,
                    });
                }
                Err(e) => return Err(e),
            }
            journal::undo(mark);
        }
        match best {
            Some((index, _)) => alternatives[index].parse(input),
            None => Err(nom::Err::Error(error.unwrap_or_else(|| {
                GrammarError::mismatch(input, "one of no alternatives")
            }))),
        }
    })
}

impl<'a, O: 'static> Parser<&'a str, O, GrammarError> for Rule<O> {
    fn parse(&mut self, input: &'a str) -> PResult<'a, O> {
        Rule::parse(&*self, input)
    }
}

/// Deepest nesting of forward rules one match may reach on a thread.
///
/// Past this depth a forward rule fails with a committed
/// [`GrammarErrorKind::Action`](crate::GrammarErrorKind::Action) error
/// instead of recursing, so deeply nested input cannot exhaust the stack.
pub const MAX_NESTING: usize = 64;

thread_local! {
    static NESTING: Cell<usize> = const { Cell::new(0) };
}

/// Forget any nesting left over on this thread. Drivers call this before
/// matching a new string.
pub fn reset_nesting() {
    NESTING.with(|depth| depth.set(0));
}

/// Current forward rule nesting on this thread.
pub fn nesting() -> usize {
    NESTING.with(Cell::get)
}

struct NestingGuard;

impl NestingGuard {
    fn enter() -> Option<NestingGuard> {
        NESTING.with(|depth| {
            if depth.get() >= MAX_NESTING {
                None
            } else {
                depth.set(depth.get() + 1);
                Some(NestingGuard)
            }
        })
    }
}

impl Drop for NestingGuard {
    fn drop(&mut self) {
        NESTING.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// A placeholder for a rule defined later, for recursive grammars.
///
/// ```
/// use stylescan_grammar::{literal, Forward};
///
/// let nested = Forward::<usize>::new();
/// let group = literal("(").ignore_then(nested.rule().opt()).then_ignore(literal(")"));
/// nested.define(group.map(|inner| inner.unwrap_or(0) + 1));
/// assert_eq!(nested.rule().parse_all("((()))").unwrap(), 3);
/// ```
pub struct Forward<O> {
    slot: Rc<RefCell<Option<Rule<O>>>>,
}

impl<O> Clone for Forward<O> {
    fn clone(&self) -> Self {
        Self {
            slot: Rc::clone(&self.slot),
        }
    }
}

impl<O: 'static> Default for Forward<O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O: 'static> Forward<O> {
    pub fn new() -> Self {
        Self {
            slot: Rc::new(RefCell::new(None)),
        }
    }

    /// Set (or replace) the rule this placeholder stands for.
    pub fn define(&self, rule: Rule<O>) {
        *self.slot.borrow_mut() = Some(rule);
    }

    pub fn is_defined(&self) -> bool {
        self.slot.borrow().is_some()
    }

    /// A rule that delegates to the defined rule at match time. Each
    /// delegation counts towards [`MAX_NESTING`].
    pub fn rule(&self) -> Rule<O> {
        let slot = Rc::clone(&self.slot);
        Rule::new(move |input| {
            let defined = slot.borrow().clone();
            match defined {
                Some(rule) => {
                    let Some(_guard) = NestingGuard::enter() else {
                        return Err(nom::Err::Failure(GrammarError::action(
                            input,
                            "recursion limit exceeded",
                        )));
                    };
                    rule.parse(input)
                }
                None => Err(nom::Err::Error(GrammarError::mismatch(
                    input,
                    "a defined forward rule",
                ))),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{integer, literal, whitespace0};
    use pretty_assertions::assert_eq;

    // =========================================================================
    // Skip and naming
    // =========================================================================

    #[test]
    fn test_padded_skips_whitespace() {
        let rule = integer().padded();
        assert_eq!(rule.parse_prefix(" \t\n42 rest").unwrap(), (42, 5));
    }

    #[test]
    fn test_map_keeps_skip_outside() {
        let rule = integer().padded().map(|n| n * 2);
        assert!(rule.skips());
        assert_eq!(rule.pre_skip("  7"), "7");
        assert_eq!(rule.parse_all("  7").unwrap(), 14);
    }

    #[test]
    fn test_named_rule_reports_name() {
        let rule = literal("x").then(literal("y")).named("xy pair");
        let err = rule.parse_all("q").unwrap_err();
        assert_eq!(err.to_string(), "expected xy pair");
    }

    #[test]
    fn test_named_keeps_deeper_error() {
        let rule = literal("x").then(literal("y")).named("xy pair");
        let err = rule.parse_all("xq").unwrap_err();
        assert_eq!(err.location("xq"), 1);
        assert_eq!(err.to_string(), "expected \"y\"");
    }

    #[test]
    fn test_parse_all_rejects_trailing_text() {
        let err = literal("test").padded().many1().parse_all("test fail").unwrap_err();
        assert_eq!(err.location("test fail"), 5);
    }

    // =========================================================================
    // Combinators
    // =========================================================================

    #[test]
    fn test_or_takes_first_match() {
        let rule = literal("ab").or(literal("a"));
        assert_eq!(rule.parse_prefix("abc").unwrap(), ("ab", 2));
        assert_eq!(rule.parse_prefix("ac").unwrap(), ("a", 1));
    }

    #[test]
    fn test_longest_takes_longest_match() {
        let rule = longest(vec![literal("a"), literal("abc"), literal("ab")]);
        assert_eq!(rule.parse_prefix("abcd").unwrap(), ("abc", 3));
    }

    #[test]
    fn test_longest_tie_goes_to_first() {
        let rule = longest(vec![
            integer().map(|_| "int"),
            crate::fnumber().map(|_| "float"),
        ]);
        assert_eq!(rule.parse_all("12").unwrap(), "int");
        assert_eq!(rule.parse_all("12.5").unwrap(), "float");
    }

    #[test]
    fn test_many0_stops_on_zero_length_match() {
        let rule = whitespace0().many0();
        assert_eq!(rule.parse_prefix("x").unwrap(), (vec![()], 0));
    }

    #[test]
    fn test_separated_list() {
        let rule = integer().padded().separated(literal(",").padded());
        assert_eq!(rule.parse_all("1, 2, 3").unwrap(), vec![1, 2, 3]);
        assert_eq!(rule.parse_prefix("1, 2,").unwrap(), (vec![1, 2], 4));
    }

    #[test]
    fn test_try_map_failure_is_action() {
        let rule = integer().try_map(|n| if n == 0 { Err("zero") } else { Ok(n) });
        let err = rule.parse_all("0").unwrap_err();
        assert!(err.is_action());
        assert_eq!(err.to_string(), "zero");
    }

    #[test]
    fn test_action_failure_skips_alternatives() {
        let failing = integer().try_map(|_| Err::<i64, _>("boom"));
        let rule = failing.or(integer());
        assert!(rule.parse_all("1").unwrap_err().is_action());
    }

    #[test]
    fn test_cut_commits() {
        let rule = literal("\"")
            .ignore_then(literal("x").cut())
            .or(literal("\"y"));
        let result = rule.parse("\"y");
        assert!(matches!(result, Err(nom::Err::Failure(_))));
    }

    #[test]
    fn test_followed_by_does_not_consume() {
        let rule = crate::identifier().followed_by(literal("("));
        assert_eq!(rule.parse_prefix("print(1)").unwrap(), ("print".to_string(), 5));
        assert!(rule.parse_prefix("print 1").is_err());
    }

    #[test]
    fn test_not_followed_by() {
        let rule = literal("[").ignore_then(integer()).not_followed_by(literal(","));
        assert!(rule.parse_prefix("[1]").is_ok());
        assert!(rule.parse_prefix("[1,").is_err());
    }

    #[test]
    fn test_recognize_excludes_skip() {
        let rule = integer().then(literal(".")).padded().recognize();
        assert_eq!(rule.parse_prefix("  12.").unwrap(), ("12.".to_string(), 5));
    }

    #[test]
    fn test_forward_recursion() {
        let list = Forward::<usize>::new();
        let item = integer().padded().map(|_| 1).or(literal("(")
            .padded()
            .ignore_then(list.rule().many0())
            .then_ignore(literal(")").padded())
            .map(|items| items.into_iter().sum()));
        list.define(item);
        assert_eq!(list.rule().parse_all("(1 (2 3) () 4)").unwrap(), 4);
    }

    fn nested_groups() -> Forward<usize> {
        let nested = Forward::<usize>::new();
        let group = literal("(")
            .ignore_then(nested.rule().opt())
            .then_ignore(literal(")"));
        nested.define(group.map(|inner| inner.unwrap_or(0) + 1));
        nested
    }

    #[test]
    fn test_forward_nesting_within_limit() {
        let nested = nested_groups();
        let depth = MAX_NESTING - 1;
        let source = format!("{}{}", "(".repeat(depth), ")".repeat(depth));
        assert_eq!(nested.rule().parse_all(&source).unwrap(), depth);
        assert_eq!(nesting(), 0);
    }

    #[test]
    fn test_forward_nesting_limit_is_an_action_failure() {
        let nested = nested_groups();
        let source = "(".repeat(10_000);
        let err = nested.rule().parse_all(&source).unwrap_err();
        assert!(err.is_action());
        assert_eq!(err.to_string(), "recursion limit exceeded");
        assert_eq!(err.location(&source), MAX_NESTING);
        assert_eq!(nesting(), 0);
    }

    #[test]
    fn test_reset_nesting() {
        reset_nesting();
        assert_eq!(nesting(), 0);
        assert!(nested_groups().rule().parse_all("(())").is_ok());
        assert_eq!(nesting(), 0);
    }

    #[test]
    fn test_undefined_forward_fails() {
        let forward = Forward::<()>::new();
        assert!(!forward.is_defined());
        assert!(forward.rule().parse_all("").is_err());
    }

    #[test]
    fn test_rule_is_nom_parser() {
        use nom::sequence::pair;
        let rule = Rule::new(|input| pair(integer(), literal("!")).parse(input));
        assert_eq!(rule.parse_all("5!").unwrap(), (5, "!"));
    }
}
