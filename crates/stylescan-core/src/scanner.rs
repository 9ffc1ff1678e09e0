use std::any::Any;
use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use stylescan_grammar::{reset_cache, reset_nesting, with_journal, GrammarError, PResult, Rule};

use crate::styler::{SpanTable, TableJournal};

/// An unexpected grammar failure met during a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanDiagnostic {
    /// Offset at which the failing attempt started.
    pub offset: usize,
    pub message: String,
}

/// Summary of one scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Match attempts made (at most one per offset, plus one at the end).
    pub attempts: usize,
    /// Attempts that matched.
    pub matches: usize,
    pub diagnostics: Vec<ScanDiagnostic>,
}

/// Outcome of one attempt at one offset.
enum Attempt {
    Matched(usize),
    Missed,
    Broken(String),
}

/// Resilient scanner.
///
/// Drives a grammar over a whole string, attempting a match at successive
/// offsets. A match moves the cursor to its end; a failure of any kind moves
/// it one character past the attempt's effective start, so every styled rule
/// that can match somewhere in the string gets its span recorded.
pub struct Scanner<'a, O> {
    source: &'a str,
    rule: &'a Rule<O>,
    table: Rc<RefCell<SpanTable>>,
    pos: usize,
    report: ScanReport,
}

impl<'a, O: 'static> Scanner<'a, O> {
    pub fn new(rule: &'a Rule<O>, table: Rc<RefCell<SpanTable>>, source: &'a str) -> Self {
        Self {
            source,
            rule,
            table,
            pos: 0,
            report: ScanReport::default(),
        }
    }

    /// Populate `table` with the spans of `source`.
    pub fn scan(rule: &Rule<O>, table: Rc<RefCell<SpanTable>>, source: &str) -> ScanReport {
        let mut scanner = Scanner::new(rule, table, source);
        scanner.run();
        scanner.report
    }

    fn run(&mut self) {
        reset_cache();
        reset_nesting();
        self.table.borrow_mut().anchor(self.source);

        let journal = Rc::new(TableJournal(Rc::clone(&self.table)));
        with_journal(journal, || {
            while self.pos <= self.source.len() {
                self.step();
            }
        });

        self.table.borrow_mut().release();
        tracing::debug!(
            target: "stylescan::scan",
            len = self.source.len(),
            attempts = self.report.attempts,
            matches = self.report.matches,
            spans = self.table.borrow().len(),
            warnings = self.report.diagnostics.len(),
            "scan finished"
        );
    }

    fn step(&mut self) {
        let input = &self.source[self.pos..];
        let preloc = self.source.len() - self.rule.pre_skip(input).len();
        let checkpoint = self.table.borrow().checkpoint();
        self.report.attempts += 1;

        match self.attempt(preloc) {
            Attempt::Matched(next) => {
                tracing::trace!(target: "stylescan::scan", preloc, next, "matched");
                self.table.borrow_mut().commit();
                self.report.matches += 1;
                self.pos = next.max(self.next_boundary(preloc));
            }
            Attempt::Missed => {
                tracing::trace!(target: "stylescan::scan", preloc, "no match");
                self.recover(checkpoint, preloc);
            }
            Attempt::Broken(message) => {
                tracing::warn!(
                    target: "stylescan::scan",
                    offset = preloc,
                    "exception during parsing: {message}"
                );
                self.report.diagnostics.push(ScanDiagnostic {
                    offset: preloc,
                    message,
                });
                self.recover(checkpoint, preloc);
            }
        }
    }

    fn attempt(&self, preloc: usize) -> Attempt {
        let input = &self.source[preloc..];
        let rule = self.rule;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| rule.parse_no_skip(input)));
        classify(self.source, outcome)
    }

    /// Discard what the failed attempt recorded and move past its start.
    fn recover(&mut self, checkpoint: usize, preloc: usize) {
        {
            let mut table = self.table.borrow_mut();
            table.rollback(checkpoint);
            table.delete(preloc);
            table.commit();
        }
        reset_cache();
        self.pos = self.next_boundary(preloc);
    }

    /// The offset of the character after `offset`, or one past the end.
    fn next_boundary(&self, offset: usize) -> usize {
        match self.source[offset..].chars().next() {
            Some(c) => offset + c.len_utf8(),
            None => offset + 1,
        }
    }
}

fn classify<O>(source: &str, outcome: Result<PResult<'_, O>, Box<dyn Any + Send>>) -> Attempt {
    match outcome {
        Ok(Ok((rest, _))) => Attempt::Matched(source.len() - rest.len()),
        Ok(Err(nom::Err::Error(_))) => Attempt::Missed,
        Ok(Err(nom::Err::Failure(err))) if !err.is_action() => Attempt::Missed,
        Ok(Err(nom::Err::Failure(err))) => Attempt::Broken(describe(&err)),
        Ok(Err(nom::Err::Incomplete(_))) => Attempt::Broken("incomplete input".to_string()),
        Err(payload) => Attempt::Broken(panic_message(payload.as_ref())),
    }
}

fn describe(err: &GrammarError) -> String {
    format!("parse action failed: {err}")
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panic: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panic: {message}")
    } else {
        "panic".to_string()
    }
}
