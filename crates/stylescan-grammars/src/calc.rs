//! Four-function calculator.
//!
//! ```text
//! expr  = term (('+' | '-') term)*
//! term  = signed (('*' | '/') signed)*
//! signed = atom | '-' atom
//! atom  = number | '(' expr ')'
//! ```
//!
//! Numbers are styled `class:value` and operators `class:operator`.

use stylescan_core::Styler;
use stylescan_grammar::{fnumber, literal, Forward, GrammarError, Rule};

pub const THEME: &[(&str, &str)] = &[("operator", "#b625b4 bold"), ("value", "#b27a01")];

fn operator(styler: &Styler, symbol: &'static str) -> Rule<&'static str> {
    styler.wrap_literal("class:operator", symbol).padded()
}

fn apply(op: &str, lhs: f64, rhs: f64, strict: bool) -> Result<f64, String> {
    match op {
        "+" => Ok(lhs + rhs),
        "-" => Ok(lhs - rhs),
        "*" => Ok(lhs * rhs),
        "/" if strict && rhs == 0.0 => Err("division by zero".to_string()),
        "/" => Ok(lhs / rhs),
        _ => Err(format!("unknown operator {op:?}")),
    }
}

/// Left-associative chain `operand (operator operand)*`.
fn chain(operand: Rule<f64>, operators: Rule<&'static str>, strict: bool) -> Rule<f64> {
    operand
        .clone()
        .then(operators.then(operand).many0())
        .try_map(move |(first, rest)| {
            rest.into_iter()
                .try_fold(first, |acc, (op, rhs)| apply(op, acc, rhs, strict))
        })
}

/// Build the calculator grammar. Division by zero is an error only when
/// `styler` is a dummy; while highlighting it yields infinity.
pub fn parser(styler: &Styler) -> Rule<f64> {
    let strict = !styler.is_active();
    let expr = Forward::<f64>::new();

    let value = styler.wrap("class:value", fnumber()).padded().named("number");
    let group = literal("(")
        .padded()
        .ignore_then(expr.rule())
        .then_ignore(literal(")").padded());
    let atom = value.or(group);
    let negated = operator(styler, "-").ignore_then(atom.clone()).map(|x| -x);
    let signed = atom.or(negated);

    let term = chain(
        signed,
        operator(styler, "*").or(operator(styler, "/")),
        strict,
    );
    let sum = chain(
        term,
        operator(styler, "+").or(operator(styler, "-")),
        strict,
    )
    .named("expression");
    expr.define(sum.clone());
    sum
}

/// Evaluate an arithmetic expression.
pub fn evaluate(source: &str) -> Result<f64, GrammarError> {
    parser(&Styler::dummy()).parse_all(source)
}
