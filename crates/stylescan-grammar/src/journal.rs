//! Undo hook for side effects performed while matching.
//!
//! Rules may do more than compute a value: a wrapped rule can write into a
//! table as it matches. When an ordered alternative, an optional rule, a
//! repetition or a lookahead abandons a branch, the effects of that branch
//! have to go too. A [`Journal`] installed with [`with_journal`] is asked for
//! a mark before each such branch and told to undo back to the mark when the
//! branch is abandoned.

use std::cell::RefCell;
use std::rc::Rc;

/// Side-effect log that can be rolled back to an earlier mark.
pub trait Journal {
    /// Current position in the log.
    fn mark(&self) -> usize;
    /// Undo every effect recorded after `mark`.
    fn undo(&self, mark: usize);
}

thread_local! {
    static ACTIVE: RefCell<Option<Rc<dyn Journal>>> = const { RefCell::new(None) };
}

struct Restore(Option<Rc<dyn Journal>>);

impl Drop for Restore {
    fn drop(&mut self) {
        let previous = self.0.take();
        ACTIVE.with(|active| *active.borrow_mut() = previous);
    }
}

/// Run `f` with `journal` as the active journal on this thread. The previous
/// journal is restored afterwards, also when `f` panics.
pub fn with_journal<R>(journal: Rc<dyn Journal>, f: impl FnOnce() -> R) -> R {
    let previous = ACTIVE.with(|active| active.borrow_mut().replace(journal));
    let _restore = Restore(previous);
    f()
}

fn active() -> Option<Rc<dyn Journal>> {
    ACTIVE.with(|active| active.borrow().clone())
}

/// A mark in the active journal, if there is one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Mark(Option<usize>);

pub(crate) fn mark() -> Mark {
    Mark(active().map(|journal| journal.mark()))
}

pub(crate) fn undo(mark: Mark) {
    if let (Some(position), Some(journal)) = (mark.0, active()) {
        journal.undo(position);
    }
}
