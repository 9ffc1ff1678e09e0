//! Span recording: styled rules write the text they matched into a table
//! keyed by start offset.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use stylescan_grammar::{
    literal, reset_cache, reset_nesting, with_journal, GrammarError, Journal, Rule,
};

use crate::style::StyleTag;

/// Text matched by a styled rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpanRecord {
    pub start: usize,
    pub style: StyleTag,
    pub text: String,
}

impl SpanRecord {
    pub fn end(&self) -> usize {
        self.start + self.text.len()
    }
}

#[derive(Debug, Clone, Copy)]
struct Anchor {
    base: usize,
    len: usize,
}

/// Span records of one source string, keyed by start offset.
///
/// While anchored to a source string, inputs handed to styled rules are
/// located in it by address. Every write is journaled so that the effects of
/// abandoned alternatives can be rolled back to a checkpoint.
#[derive(Debug, Default)]
pub struct SpanTable {
    records: BTreeMap<usize, SpanRecord>,
    anchor: Option<Anchor>,
    journal: Vec<(usize, Option<SpanRecord>)>,
}

impl SpanTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Locate subsequent inputs in `source`.
    pub fn anchor(&mut self, source: &str) {
        self.anchor = Some(Anchor {
            base: source.as_ptr() as usize,
            len: source.len(),
        });
    }

    pub fn release(&mut self) {
        self.anchor = None;
    }

    pub fn is_anchored(&self) -> bool {
        self.anchor.is_some()
    }

    /// Offset of `input` in the anchored source, if it is a suffix-or-slice
    /// of it.
    pub fn offset_of(&self, input: &str) -> Option<usize> {
        let anchor = self.anchor?;
        let start = input.as_ptr() as usize;
        if start >= anchor.base && start + input.len() <= anchor.base + anchor.len {
            Some(start - anchor.base)
        } else {
            None
        }
    }

    /// Write a record, replacing any record at the same offset.
    pub fn insert(&mut self, record: SpanRecord) {
        let start = record.start;
        let previous = self.records.insert(start, record);
        self.journal.push((start, previous));
    }

    pub fn get(&self, start: usize) -> Option<&SpanRecord> {
        self.records.get(&start)
    }

    /// Remove the record at `start` if there is one.
    pub fn delete(&mut self, start: usize) -> Option<SpanRecord> {
        let removed = self.records.remove(&start);
        if let Some(record) = &removed {
            self.journal.push((start, Some(record.clone())));
        }
        removed
    }

    /// Record start offsets in ascending order.
    pub fn locs(&self) -> Vec<usize> {
        self.records.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SpanRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.journal.clear();
    }

    pub fn checkpoint(&self) -> usize {
        self.journal.len()
    }

    /// Undo every write made after `checkpoint`. Returns the number of
    /// writes undone.
    pub fn rollback(&mut self, checkpoint: usize) -> usize {
        let mut undone = 0;
        while self.journal.len() > checkpoint {
            let Some((start, previous)) = self.journal.pop() else {
                break;
            };
            match previous {
                Some(record) => {
                    self.records.insert(start, record);
                }
                None => {
                    self.records.remove(&start);
                }
            }
            undone += 1;
        }
        undone
    }

    /// Forget the journal; the current records can no longer be rolled back.
    pub fn commit(&mut self) {
        self.journal.clear();
    }
}

/// Journal adapter installed while a shared table is being scanned.
pub(crate) struct TableJournal(pub(crate) Rc<RefCell<SpanTable>>);

impl Journal for TableJournal {
    fn mark(&self) -> usize {
        self.0.borrow().checkpoint()
    }

    fn undo(&self, mark: usize) {
        let undone = self.0.borrow_mut().rollback(mark);
        // Memoized results would skip re-recording the spans just removed.
        if undone > 0 {
            reset_cache();
        }
    }
}

/// Wraps grammar rules so that their matches are recorded as styled spans.
///
/// A styler handed to a parser factory shares its table with the highlighter
/// that created it. [`Styler::dummy`] returns rules unchanged, which lets one
/// factory build both a highlighting parser and a plain parser.
#[derive(Debug, Clone)]
pub struct Styler {
    table: Option<Rc<RefCell<SpanTable>>>,
}

impl Default for Styler {
    fn default() -> Self {
        Self::new()
    }
}

impl Styler {
    pub fn new() -> Self {
        Self {
            table: Some(Rc::new(RefCell::new(SpanTable::new()))),
        }
    }

    pub(crate) fn with_table(table: Rc<RefCell<SpanTable>>) -> Self {
        Self { table: Some(table) }
    }

    /// A styler that records nothing.
    pub fn dummy() -> Self {
        Self { table: None }
    }

    /// `false` for [`Styler::dummy`].
    pub fn is_active(&self) -> bool {
        self.table.is_some()
    }

    #[cfg(test)]
    pub(crate) fn table(&self) -> Option<&Rc<RefCell<SpanTable>>> {
        self.table.as_ref()
    }

    /// Wrap `rule` so that each successful match records `style` and the
    /// matched text at the match's start offset.
    ///
    /// The wrapped rule keeps the leading skip and name of `rule`, and its
    /// value is the value of `rule` (parse actions of `rule` included).
    /// Transformations chained onto the wrapped rule run after the record is
    /// written and do not affect it.
    pub fn wrap<O: 'static>(&self, style: impl Into<StyleTag>, rule: Rule<O>) -> Rule<O> {
        let Some(table) = self.table.clone() else {
            return rule;
        };
        let style = style.into();
        let inner = rule.clone();
        let wrapped = rule.decorate(move |input| {
            let (rest, value) = inner.parse_no_skip(input)?;
            let mut table = table.borrow_mut();
            if let Some(start) = table.offset_of(input) {
                let text = &input[..input.len() - rest.len()];
                table.insert(SpanRecord {
                    start,
                    style: style.clone(),
                    text: text.to_string(),
                });
            }
            Ok((rest, value))
        });
        match rule.name() {
            Some(name) => wrapped.named(name),
            None => wrapped,
        }
    }

    /// Wrap a literal string.
    pub fn wrap_literal(&self, style: impl Into<StyleTag>, text: &'static str) -> Rule<&'static str> {
        self.wrap(style, literal(text))
    }

    /// Style and text of the record at `start`.
    pub fn get(&self, start: usize) -> Option<(StyleTag, String)> {
        let table = self.table.as_ref()?.borrow();
        table
            .get(start)
            .map(|record| (record.style.clone(), record.text.clone()))
    }

    pub fn locs(&self) -> Vec<usize> {
        match &self.table {
            Some(table) => table.borrow().locs(),
            None => Vec::new(),
        }
    }

    pub fn delete(&self, start: usize) {
        if let Some(table) = &self.table {
            table.borrow_mut().delete(start);
        }
    }

    pub fn clear(&self) {
        if let Some(table) = &self.table {
            table.borrow_mut().clear();
        }
    }

    /// Match the whole of `source` with `rule`, recording spans. Records
    /// written by alternatives that were abandoned are undone.
    pub fn parse_all<O: 'static>(&self, rule: &Rule<O>, source: &str) -> Result<O, GrammarError> {
        let Some(table) = &self.table else {
            return rule.parse_all(source);
        };
        reset_cache();
        reset_nesting();
        table.borrow_mut().anchor(source);
        let journal = Rc::new(TableJournal(Rc::clone(table)));
        let result = with_journal(journal, || rule.parse_all(source));
        let mut table = table.borrow_mut();
        table.commit();
        table.release();
        result
    }
}
