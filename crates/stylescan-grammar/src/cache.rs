//! Packrat cache for memoized rules.
//!
//! Entries are keyed by rule identity and the exact input slice (address and
//! length), so a cache is only meaningful for one source string at a time.
//! Drivers call [`reset_cache`] before scanning a new string, and whenever
//! side effects recorded during matching have been undone.

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::{GrammarError, Rule};

type Key = (usize, usize, usize);

thread_local! {
    static CACHE: RefCell<HashMap<Key, Box<dyn Any>>> = RefCell::new(HashMap::new());
}

static NEXT_ID: AtomicUsize = AtomicUsize::new(0);

#[derive(Clone)]
enum Memo<O> {
    Matched { consumed: usize, value: O },
    Failed(nom::Err<GrammarError>),
}

/// Drop every memoized result on this thread.
pub fn reset_cache() {
    CACHE.with(|cache| cache.borrow_mut().clear());
}

/// Number of memoized results held on this thread.
pub fn cache_len() -> usize {
    CACHE.with(|cache| cache.borrow().len())
}

fn lookup<O: Clone + 'static>(key: Key) -> Option<Memo<O>> {
    CACHE.with(|cache| {
        cache
            .borrow()
            .get(&key)
            .and_then(|entry| entry.downcast_ref::<Memo<O>>())
            .cloned()
    })
}

fn store<O: 'static>(key: Key, memo: Memo<O>) {
    CACHE.with(|cache| {
        cache.borrow_mut().insert(key, Box::new(memo));
    });
}

impl<O: Clone + 'static> Rule<O> {
    /// Memoize this rule: repeated attempts at the same position of the same
    /// input return the stored outcome without matching again.
    pub fn memoize(self) -> Rule<O> {
        let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        let inner = self.clone();
        self.decorate(move |input| {
            let key = (id, input.as_ptr() as usize, input.len());
            if let Some(memo) = lookup::<O>(key) {
                return match memo {
                    Memo::Matched { consumed, value } => Ok((&input[consumed..], value)),
                    Memo::Failed(err) => Err(err),
                };
            }
            let result = inner.parse_no_skip(input);
            match &result {
                Ok((rest, value)) => store(
                    key,
                    Memo::Matched {
                        consumed: input.len() - rest.len(),
                        value: value.clone(),
                    },
                ),
                Err(nom::Err::Incomplete(_)) => {}
                Err(err) => store::<O>(key, Memo::Failed(err.clone())),
            }
            result
        })
    }
}
