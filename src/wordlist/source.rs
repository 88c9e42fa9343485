//! Shared word cursor.

use std::fmt;
use std::iter::Fuse;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

type BoxedWords = Box<dyn Iterator<Item = String> + Send>;

/// A single-pass sequence of candidate words shared by every worker.
///
/// Each word is handed to exactly one caller of [`claim_next`](Self::claim_next).
/// Once the underlying sequence runs dry, or the source is closed, every later
/// claim reports exhaustion.
pub struct WordSource {
    /// Fused so an iterator that resumes after `None` cannot revive the source
    words: Mutex<Fuse<BoxedWords>>,
    /// Set on exhaustion or by `close`
    closed: AtomicBool,
    /// Words handed out so far
    claimed: AtomicU64,
    /// Exact length of the sequence when known up front
    len_hint: Option<usize>,
}

impl WordSource {
    /// Wraps a sequence of words. The sequence is consumed lazily.
    pub fn new<I>(words: I) -> Self
    where
        I: IntoIterator<Item = String>,
        I::IntoIter: Send + 'static,
    {
        let iter = words.into_iter();
        let len_hint = match iter.size_hint() {
            (lower, Some(upper)) if lower == upper => Some(upper),
            _ => None,
        };
        let boxed: BoxedWords = Box::new(iter);

        Self {
            words: Mutex::new(boxed.fuse()),
            closed: AtomicBool::new(false),
            claimed: AtomicU64::new(0),
            len_hint,
        }
    }

    /// Claims the next unclaimed word, or `None` once the source is exhausted.
    pub fn claim_next(&self) -> Option<String> {
        if self.is_exhausted() {
            return None;
        }

        let next = {
            // A panic inside the iterator poisons the lock; the cursor itself is still usable.
            let mut words = self.words.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            if self.is_exhausted() {
                return None;
            }
            words.next()
        };

        match next {
            Some(word) => {
                self.claimed.fetch_add(1, Ordering::Relaxed);
                Some(word)
            }
            None => {
                self.closed.store(true, Ordering::Release);
                None
            }
        }
    }

    /// Forces exhaustion. Words not yet claimed are never handed out.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    /// Returns true once no further word will be handed out.
    pub fn is_exhausted(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Returns the number of words claimed so far.
    pub fn claimed(&self) -> u64 {
        self.claimed.load(Ordering::Relaxed)
    }

    /// Returns the total number of words, if the sequence reported it exactly.
    pub fn len_hint(&self) -> Option<usize> {
        self.len_hint
    }
}

impl fmt::Debug for WordSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WordSource")
            .field("claimed", &self.claimed())
            .field("exhausted", &self.is_exhausted())
            .field("len_hint", &self.len_hint)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    fn words(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("w{}", i)).collect()
    }

    #[test]
    fn test_claims_in_order_single_caller() {
        let source = WordSource::new(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(source.len_hint(), Some(2));
        assert_eq!(source.claim_next().as_deref(), Some("a"));
        assert_eq!(source.claim_next().as_deref(), Some("b"));
        assert_eq!(source.claim_next(), None);
        assert!(source.is_exhausted());
        assert_eq!(source.claimed(), 2);
    }

    #[test]
    fn test_empty_source_is_exhausted_on_first_claim() {
        let source = WordSource::new(Vec::new());
        assert_eq!(source.claim_next(), None);
        assert_eq!(source.claimed(), 0);
    }

    #[test]
    fn test_concurrent_claims_are_exactly_once() {
        let source = Arc::new(WordSource::new(words(5_000)));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let source = source.clone();
                thread::spawn(move || {
                    let mut mine = Vec::new();
                    while let Some(word) = source.claim_next() {
                        mine.push(word);
                    }
                    mine
                })
            })
            .collect();

        let mut all = Vec::new();
        for handle in handles {
            all.extend(handle.join().unwrap());
        }

        let unique: HashSet<String> = all.iter().cloned().collect();
        let expected: HashSet<String> = words(5_000).into_iter().collect();
        assert_eq!(all.len(), 5_000);
        assert_eq!(unique, expected);
        assert_eq!(source.claimed(), 5_000);
    }

    #[test]
    fn test_close_stops_claims() {
        let source = WordSource::new(words(10));
        assert!(source.claim_next().is_some());
        source.close();
        assert_eq!(source.claim_next(), None);
        assert_eq!(source.claimed(), 1);
    }

    /// Yields `None` once, then starts producing again.
    struct Flaky {
        calls: usize,
    }

    impl Iterator for Flaky {
        type Item = String;

        fn next(&mut self) -> Option<String> {
            self.calls += 1;
            if self.calls == 2 {
                None
            } else {
                Some(format!("call{}", self.calls))
            }
        }
    }

    #[test]
    fn test_exhaustion_is_permanent() {
        let source = WordSource::new(Flaky { calls: 0 });
        assert_eq!(source.len_hint(), None);
        assert_eq!(source.claim_next().as_deref(), Some("call1"));
        assert_eq!(source.claim_next(), None);
        assert_eq!(source.claim_next(), None);
    }
}
