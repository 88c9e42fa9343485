//! The claim-probe-record loop run by every worker thread.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_channel::Sender;
use tracing::{debug, trace};

use crate::probe::{ProbeError, ProbeOutcome, ProbeTarget, Prober};
use crate::wordlist::WordSource;

/// A discovered subdomain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discovery {
    /// The URL that answered 200
    pub url: String,
    /// The ID of the worker that found it
    pub worker_id: usize,
}

/// What a worker does when a probe fails in an unexpected way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Stop this worker and report the error when the pool is joined
    #[default]
    AbortWorker,
    /// Count the error and move on to the next word
    Continue,
}

/// How a worker loop ended.
#[derive(Debug)]
pub enum WorkerExit {
    /// The word source reported exhaustion
    Exhausted,
    /// An unexpected probe error stopped the worker
    Aborted(ProbeError),
}

/// Statistics shared by all workers of a pool.
#[derive(Debug, Default)]
pub struct WorkerStats {
    /// Probes issued
    pub probes: AtomicU64,
    /// Hosts that answered 200
    pub discoveries: AtomicU64,
    /// Hosts that answered with another status
    pub misses: AtomicU64,
    /// Connect failures and timeouts
    pub transient: AtomicU64,
    /// Unexpected probe errors
    pub errors: AtomicU64,
}

impl WorkerStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total probes issued.
    pub fn total_probes(&self) -> u64 {
        self.probes.load(Ordering::Relaxed)
    }

    /// Returns the total discoveries.
    pub fn total_discoveries(&self) -> u64 {
        self.discoveries.load(Ordering::Relaxed)
    }

    /// Takes a point-in-time copy of every counter.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            probes: self.probes.load(Ordering::Relaxed),
            discoveries: self.discoveries.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            transient: self.transient.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

/// Plain copy of [`WorkerStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub probes: u64,
    pub discoveries: u64,
    pub misses: u64,
    pub transient: u64,
    pub errors: u64,
}

/// A worker that probes `https://<word>.<domain>` for each word it claims.
pub struct ProbeWorker {
    /// Worker ID
    id: usize,
    /// Base domain appended to every word
    domain: Arc<str>,
    /// Shared word source
    words: Arc<WordSource>,
    /// Shared network prober
    prober: Arc<dyn Prober>,
    /// Channel to send discoveries
    result_tx: Sender<Discovery>,
    /// Held only so the pool sees a disconnect once every worker is gone
    _done_tx: Sender<()>,
    /// Shared statistics
    stats: Arc<WorkerStats>,
    /// Print discoveries as they happen
    verbose: bool,
    error_policy: ErrorPolicy,
}

impl ProbeWorker {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: usize,
        domain: Arc<str>,
        words: Arc<WordSource>,
        prober: Arc<dyn Prober>,
        result_tx: Sender<Discovery>,
        done_tx: Sender<()>,
        stats: Arc<WorkerStats>,
        verbose: bool,
        error_policy: ErrorPolicy,
    ) -> Self {
        Self {
            id,
            domain,
            words,
            prober,
            result_tx,
            _done_tx: done_tx,
            stats,
            verbose,
            error_policy,
        }
    }

    /// Runs the worker loop until the word source is exhausted.
    ///
    /// Connect failures, timeouts and non-200 statuses consume the word and
    /// produce nothing. Any other probe error is handled per the error policy.
    pub fn run(self) -> WorkerExit {
        while let Some(word) = self.words.claim_next() {
            let target = ProbeTarget::new(&word, &self.domain);
            self.stats.probes.fetch_add(1, Ordering::Relaxed);

            match self.prober.probe(&target) {
                Ok(ProbeOutcome::Success) => self.record(target),
                Ok(ProbeOutcome::Miss(status)) => {
                    self.stats.misses.fetch_add(1, Ordering::Relaxed);
                    trace!(worker = self.id, %target, status, "miss");
                }
                Ok(ProbeOutcome::Transient(kind)) => {
                    self.stats.transient.fetch_add(1, Ordering::Relaxed);
                    trace!(worker = self.id, %target, %kind, "no answer");
                }
                Err(error) => {
                    self.stats.errors.fetch_add(1, Ordering::Relaxed);
                    match self.error_policy {
                        ErrorPolicy::AbortWorker => return WorkerExit::Aborted(error),
                        ErrorPolicy::Continue => {
                            debug!(worker = self.id, %error, "probe failed, skipping word")
                        }
                    }
                }
            }
        }

        WorkerExit::Exhausted
    }

    fn record(&self, target: ProbeTarget) {
        self.stats.discoveries.fetch_add(1, Ordering::Relaxed);
        let url = target.into_string();
        debug!(worker = self.id, %url, "discovered");

        if self.verbose {
            println!("{}", url);
        }

        // The pool keeps the receiver until every worker has been joined.
        let _ = self.result_tx.send(Discovery {
            url,
            worker_id: self.id,
        });
    }

    /// Returns the worker ID.
    pub fn id(&self) -> usize {
        self.id
    }
}
