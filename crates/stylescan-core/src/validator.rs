use std::panic::{self, AssertUnwindSafe};

use stylescan_grammar::{reset_cache, reset_nesting, Rule};

/// Input rejected by a [`Validator`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ValidationError {
    /// Character offset at which an editor should place the cursor.
    pub cursor_position: usize,
    pub message: String,
}

/// Checks that a whole input matches a grammar and reports where it does not.
#[derive(Debug, Clone)]
pub struct Validator<O> {
    rule: Rule<O>,
    multiline: bool,
    move_cursor_to_end: bool,
}

impl<O: 'static> Validator<O> {
    pub fn new(rule: Rule<O>) -> Self {
        Self {
            rule,
            multiline: true,
            move_cursor_to_end: false,
        }
    }

    /// Include the line number in messages (default `true`).
    pub fn multiline(mut self, multiline: bool) -> Self {
        self.multiline = multiline;
        self
    }

    /// Put the cursor at the end of the input when a parse action fails,
    /// rather than at the start (default `false`).
    pub fn move_cursor_to_end(mut self, move_cursor_to_end: bool) -> Self {
        self.move_cursor_to_end = move_cursor_to_end;
        self
    }

    pub fn validate(&self, text: &str) -> Result<(), ValidationError> {
        reset_cache();
        reset_nesting();
        let rule = &self.rule;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| rule.parse_all(text)));
        match outcome {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(err)) if err.is_action() => Err(self.internal_error(text, err.to_string())),
            Ok(Err(err)) => {
                let loc = err.location(text);
                let (line, column) = err.line_col(text);
                let message = if self.multiline {
                    format!("(line:{line}, col:{column}) {err}")
                } else {
                    format!("(col:{column}) {err}")
                };
                Err(ValidationError {
                    cursor_position: char_offset(text, loc),
                    message,
                })
            }
            Err(payload) => {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|m| m.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown error".to_string());
                Err(self.internal_error(text, format!("panic: {message}")))
            }
        }
    }

    fn internal_error(&self, text: &str, message: String) -> ValidationError {
        let cursor_position = if self.move_cursor_to_end {
            text.chars().count()
        } else {
            0
        };
        ValidationError {
            cursor_position,
            message,
        }
    }
}

fn char_offset(text: &str, byte_offset: usize) -> usize {
    text.char_indices().take_while(|(i, _)| *i < byte_offset).count()
}
