//! Worker pool management.

use std::any::Any;
use std::collections::HashSet;
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use tracing::{info, warn};

use crate::probe::{ProbeError, Prober};
use crate::wordlist::WordSource;

use super::probe_worker::{Discovery, ErrorPolicy, ProbeWorker, StatsSnapshot, WorkerExit, WorkerStats};

/// Parameters of one pool run.
#[derive(Debug, Clone)]
pub struct PoolSettings {
    /// Base domain, e.g. `example.com`
    pub domain: String,
    /// Number of worker threads
    pub workers: usize,
    /// Print each discovery as it happens
    pub verbose: bool,
    /// Handling of unexpected probe errors
    pub error_policy: ErrorPolicy,
}

impl PoolSettings {
    pub fn new(domain: impl Into<String>, workers: usize) -> Self {
        Self {
            domain: domain.into(),
            workers,
            verbose: false,
            error_policy: ErrorPolicy::default(),
        }
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn error_policy(mut self, error_policy: ErrorPolicy) -> Self {
        self.error_policy = error_policy;
        self
    }
}

/// A worker that did not end by exhausting the word source.
#[derive(Debug, thiserror::Error)]
pub enum WorkerFailure {
    #[error("worker {worker_id} aborted: {error}")]
    Aborted {
        worker_id: usize,
        #[source]
        error: ProbeError,
    },

    #[error("worker {worker_id} panicked: {message}")]
    Panicked { worker_id: usize, message: String },
}

/// Final outcome of a pool run.
#[derive(Debug)]
pub struct RunReport {
    /// Discovered subdomains in arrival order
    pub discoveries: Vec<Discovery>,
    /// Wall-clock time from spawn to full join
    pub elapsed: Duration,
    /// Counters at the end of the run
    pub stats: StatsSnapshot,
    /// Words handed out to workers
    pub words_claimed: u64,
    /// Workers that stopped early
    pub failures: Vec<WorkerFailure>,
}

impl RunReport {
    /// Returns the discovered URLs.
    pub fn urls(&self) -> impl Iterator<Item = &str> + '_ {
        self.discoveries.iter().map(|d| d.url.as_str())
    }

    /// Returns the number of discoveries.
    pub fn count(&self) -> usize {
        self.discoveries.len()
    }

    /// Returns the elapsed time rounded to whole seconds.
    pub fn elapsed_secs_rounded(&self) -> u64 {
        self.elapsed.as_secs_f64().round() as u64
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("Worker count must be at least 1")]
    NoWorkers,

    #[error("Domain cannot be empty")]
    EmptyDomain,

    #[error("Failed to spawn worker thread {worker_id}: {source}")]
    Spawn {
        worker_id: usize,
        #[source]
        source: io::Error,
    },
}

/// Manages a fixed set of probe workers draining one word source.
pub struct ProbePool {
    /// Number of workers
    num_workers: usize,
    /// Shared word source
    words: Arc<WordSource>,
    /// Worker thread handles (Option to allow taking during join)
    handles: Option<Vec<JoinHandle<WorkerExit>>>,
    /// Channel receiver for discoveries
    result_rx: Receiver<Discovery>,
    /// Disconnects once every worker has exited
    done_rx: Receiver<()>,
    /// Shared statistics
    stats: Arc<WorkerStats>,
    /// Start time
    start_time: Instant,
}

impl ProbePool {
    /// Spawns `settings.workers` threads that probe until `words` is exhausted.
    pub fn start(
        settings: PoolSettings,
        words: Arc<WordSource>,
        prober: Arc<dyn Prober>,
    ) -> Result<Self, PoolError> {
        if settings.workers == 0 {
            return Err(PoolError::NoWorkers);
        }
        if settings.domain.is_empty() {
            return Err(PoolError::EmptyDomain);
        }

        let (result_tx, result_rx) = unbounded();
        let (done_tx, done_rx) = unbounded();
        let stats = Arc::new(WorkerStats::new());
        let start_time = Instant::now();

        info!(
            domain = %settings.domain,
            workers = settings.workers,
            words = ?words.len_hint(),
            "starting probe pool"
        );

        // The senders passed in here are the only ones kept; once every worker
        // returns both channels disconnect.
        let handles = Self::spawn_workers(&settings, &words, prober, result_tx, done_tx, &stats)?;

        Ok(Self {
            num_workers: settings.workers,
            words,
            handles: Some(handles),
            result_rx,
            done_rx,
            stats,
            start_time,
        })
    }

    /// Spawns worker threads.
    fn spawn_workers(
        settings: &PoolSettings,
        words: &Arc<WordSource>,
        prober: Arc<dyn Prober>,
        result_tx: Sender<Discovery>,
        done_tx: Sender<()>,
        stats: &Arc<WorkerStats>,
    ) -> Result<Vec<JoinHandle<WorkerExit>>, PoolError> {
        let domain: Arc<str> = Arc::from(settings.domain.as_str());
        let mut handles = Vec::with_capacity(settings.workers);

        for id in 0..settings.workers {
            let worker = ProbeWorker::new(
                id,
                domain.clone(),
                words.clone(),
                prober.clone(),
                result_tx.clone(),
                done_tx.clone(),
                stats.clone(),
                settings.verbose,
                settings.error_policy,
            );

            let spawned = thread::Builder::new()
                .name(format!("probe-worker-{}", id))
                .spawn(move || worker.run());

            match spawned {
                Ok(handle) => handles.push(handle),
                Err(source) => {
                    // Let the workers already running drain out before bailing.
                    words.close();
                    for handle in handles {
                        let _ = handle.join();
                    }
                    return Err(PoolError::Spawn {
                        worker_id: id,
                        source,
                    });
                }
            }
        }

        Ok(handles)
    }

    /// Blocks for up to `timeout` waiting for every worker to exit.
    ///
    /// Returns true once all workers are done.
    pub fn wait(&self, timeout: Duration) -> bool {
        matches!(
            self.done_rx.recv_timeout(timeout),
            Err(RecvTimeoutError::Disconnected)
        )
    }

    /// Closes the word source. Workers finish their in-flight probe and exit.
    pub fn stop(&self) {
        self.words.close();
    }

    /// Waits for all workers to complete and collects the run report.
    pub fn join(mut self) -> RunReport {
        let mut failures = Vec::new();

        if let Some(handles) = self.handles.take() {
            for (worker_id, handle) in handles.into_iter().enumerate() {
                match handle.join() {
                    Ok(WorkerExit::Exhausted) => {}
                    Ok(WorkerExit::Aborted(error)) => {
                        warn!(worker = worker_id, %error, "worker aborted");
                        failures.push(WorkerFailure::Aborted { worker_id, error });
                    }
                    Err(payload) => {
                        let message = panic_message(payload.as_ref());
                        warn!(worker = worker_id, %message, "worker panicked");
                        failures.push(WorkerFailure::Panicked { worker_id, message });
                    }
                }
            }
        }

        let elapsed = self.start_time.elapsed();

        // Every sender is gone now, so this drains the channel completely.
        let mut seen = HashSet::new();
        let discoveries: Vec<Discovery> = self
            .result_rx
            .try_iter()
            .filter(|d| seen.insert(d.url.clone()))
            .collect();

        let report = RunReport {
            discoveries,
            elapsed,
            stats: self.stats.snapshot(),
            words_claimed: self.words.claimed(),
            failures,
        };

        info!(
            found = report.count(),
            probes = report.stats.probes,
            failed_workers = report.failures.len(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "probe pool finished"
        );

        report
    }

    /// Returns the number of workers.
    pub fn num_workers(&self) -> usize {
        self.num_workers
    }

    /// Returns the shared word source.
    pub fn words(&self) -> &Arc<WordSource> {
        &self.words
    }

    /// Returns the total probes issued across all workers.
    pub fn total_probes(&self) -> u64 {
        self.stats.total_probes()
    }

    /// Returns the total discoveries so far.
    pub fn total_discoveries(&self) -> u64 {
        self.stats.total_discoveries()
    }

    /// Returns the elapsed time since the pool was started.
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Returns the current probe rate.
    pub fn probes_per_second(&self) -> f64 {
        let elapsed = self.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.total_probes() as f64 / elapsed
        } else {
            0.0
        }
    }
}

impl Drop for ProbePool {
    fn drop(&mut self) {
        // Joined pools have no handles left; anything else is abandoned mid-run.
        if let Some(handles) = self.handles.take() {
            self.stop();
            for handle in handles {
                let _ = handle.join();
            }
        }
    }
}

/// Runs a pool to completion and returns its report.
pub fn run(
    settings: PoolSettings,
    words: Arc<WordSource>,
    prober: Arc<dyn Prober>,
) -> Result<RunReport, PoolError> {
    Ok(ProbePool::start(settings, words, prober)?.join())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::{ProbeOutcome, ProbeTarget, TransientKind};
    use std::sync::Mutex;

    /// Succeeds for a fixed set of URLs, reports a connect failure otherwise,
    /// and logs every URL it is asked about.
    struct FakeProber {
        live: HashSet<String>,
        slow: Option<(String, Duration)>,
        probed: Mutex<Vec<String>>,
    }

    impl FakeProber {
        fn new(live: &[&str]) -> Self {
            Self {
                live: live.iter().map(|s| s.to_string()).collect(),
                slow: None,
                probed: Mutex::new(Vec::new()),
            }
        }

        fn with_slow(mut self, url: &str, delay: Duration) -> Self {
            self.slow = Some((url.to_string(), delay));
            self
        }

        fn probed(&self) -> Vec<String> {
            self.probed.lock().unwrap().clone()
        }
    }

    impl Prober for FakeProber {
        fn probe(&self, target: &ProbeTarget) -> Result<ProbeOutcome, ProbeError> {
            self.probed.lock().unwrap().push(target.to_string());

            if let Some((url, delay)) = &self.slow {
                if url == target.as_str() {
                    thread::sleep(*delay);
                    return Ok(ProbeOutcome::Transient(TransientKind::Timeout));
                }
            }

            if self.live.contains(target.as_str()) {
                Ok(ProbeOutcome::Success)
            } else {
                Ok(ProbeOutcome::Transient(TransientKind::Connect))
            }
        }
    }

    fn source(words: &[&str]) -> Arc<WordSource> {
        Arc::new(WordSource::new(
            words.iter().map(|w| w.to_string()).collect::<Vec<_>>(),
        ))
    }

    fn numbered(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("w{}", i)).collect()
    }

    fn url_set(report: &RunReport) -> HashSet<String> {
        report.urls().map(str::to_owned).collect()
    }

    #[test]
    fn test_single_live_subdomain() {
        let prober = Arc::new(FakeProber::new(&["https://b.example.com"]));
        let report = run(
            PoolSettings::new("example.com", 3),
            source(&["a", "b", "c"]),
            prober,
        )
        .unwrap();

        assert_eq!(report.urls().collect::<Vec<_>>(), vec!["https://b.example.com"]);
        assert_eq!(report.count(), 1);
        assert_eq!(report.words_claimed, 3);
        assert!(report.failures.is_empty());
    }

    #[test]
    fn test_empty_wordlist_many_workers() {
        let report = run(
            PoolSettings::new("x.io", 50),
            source(&[]),
            Arc::new(FakeProber::new(&[])),
        )
        .unwrap();

        assert_eq!(report.count(), 0);
        assert_eq!(report.stats.probes, 0);
    }

    #[test]
    fn test_more_workers_than_words() {
        let prober = Arc::new(FakeProber::new(&["https://a.x.io", "https://c.x.io"]));
        let report = run(PoolSettings::new("x.io", 10), source(&["a", "b", "c"]), prober).unwrap();

        let expected: HashSet<String> = ["https://a.x.io", "https://c.x.io"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(url_set(&report), expected);
        assert!(report.failures.is_empty());
    }

    #[test]
    fn test_every_word_probed_exactly_once() {
        let words = numbered(2_000);
        let prober = Arc::new(FakeProber::new(&[]));
        let report = run(
            PoolSettings::new("example.com", 64),
            Arc::new(WordSource::new(words.clone())),
            prober.clone(),
        )
        .unwrap();

        let mut probed = prober.probed();
        probed.sort();
        let mut expected: Vec<String> = words
            .iter()
            .map(|w| format!("https://{}.example.com", w))
            .collect();
        expected.sort();

        assert_eq!(probed, expected);
        assert_eq!(report.words_claimed, 2_000);
        assert_eq!(report.stats.probes, 2_000);
        assert_eq!(report.stats.transient, 2_000);
    }

    #[test]
    fn test_results_independent_of_worker_count() {
        let words = numbered(10);
        let live = ["https://w1.t.dev", "https://w4.t.dev", "https://w9.t.dev"];
        let expected: HashSet<String> = live.iter().map(|s| s.to_string()).collect();

        for workers in [1, 2, 7, 500] {
            let report = run(
                PoolSettings::new("t.dev", workers),
                Arc::new(WordSource::new(words.clone())),
                Arc::new(FakeProber::new(&live)),
            )
            .unwrap();

            assert_eq!(url_set(&report), expected, "workers = {}", workers);
            assert_eq!(report.count(), 3);
        }
    }

    #[test]
    fn test_single_worker_single_word() {
        let report = run(
            PoolSettings::new("t.dev", 1),
            source(&["w0"]),
            Arc::new(FakeProber::new(&["https://w0.t.dev"])),
        )
        .unwrap();

        assert_eq!(report.urls().collect::<Vec<_>>(), vec!["https://w0.t.dev"]);
        assert_eq!(report.discoveries[0].worker_id, 0);
    }

    #[test]
    fn test_repeat_runs_agree() {
        let words = numbered(200);
        let live: Vec<String> = (0..200)
            .step_by(3)
            .map(|i| format!("https://w{}.repeat.io", i))
            .collect();
        let live_refs: Vec<&str> = live.iter().map(String::as_str).collect();

        let first = run(
            PoolSettings::new("repeat.io", 16),
            Arc::new(WordSource::new(words.clone())),
            Arc::new(FakeProber::new(&live_refs)),
        )
        .unwrap();
        let second = run(
            PoolSettings::new("repeat.io", 16),
            Arc::new(WordSource::new(words)),
            Arc::new(FakeProber::new(&live_refs)),
        )
        .unwrap();

        assert_eq!(url_set(&first), url_set(&second));
        assert_eq!(first.count(), live.len());
    }

    #[test]
    fn test_slow_probe_does_not_block_others() {
        let delay = Duration::from_millis(400);
        let prober = Arc::new(
            FakeProber::new(&["https://w39.slow.io"]).with_slow("https://w0.slow.io", delay),
        );

        let pool = ProbePool::start(
            PoolSettings::new("slow.io", 4),
            Arc::new(WordSource::new(numbered(40))),
            prober,
        )
        .unwrap();

        // The other three workers drain the remaining words while w0 hangs.
        let started = Instant::now();
        while pool.words().claimed() < 40 {
            assert!(started.elapsed() < delay, "words stuck behind the slow probe");
            thread::sleep(Duration::from_millis(5));
        }

        let report = pool.join();
        assert_eq!(report.urls().collect::<Vec<_>>(), vec!["https://w39.slow.io"]);
        assert!(report.elapsed < delay * 10);
    }

    struct Failing;

    impl Prober for Failing {
        fn probe(&self, target: &ProbeTarget) -> Result<ProbeOutcome, ProbeError> {
            match target.as_str() {
                "https://bad.f.io" => Err(ProbeError::Other {
                    url: target.to_string(),
                    reason: "unexpected".into(),
                }),
                "https://boom.f.io" => panic!("prober blew up"),
                _ => Ok(ProbeOutcome::Success),
            }
        }
    }

    #[test]
    fn test_unexpected_error_is_reported() {
        let report = run(PoolSettings::new("f.io", 1), source(&["bad", "good"]), Arc::new(Failing)).unwrap();

        assert_eq!(report.count(), 0);
        assert_eq!(report.words_claimed, 1);
        assert_eq!(report.failures.len(), 1);
        assert!(matches!(
            report.failures[0],
            WorkerFailure::Aborted { worker_id: 0, error: ProbeError::Other { .. } }
        ));
        assert_eq!(
            report.failures[0].to_string(),
            "worker 0 aborted: Probe of https://bad.f.io failed: unexpected"
        );
    }

    #[test]
    fn test_continue_policy_keeps_going() {
        let settings = PoolSettings::new("f.io", 1).error_policy(ErrorPolicy::Continue);
        let report = run(settings, source(&["bad", "good"]), Arc::new(Failing)).unwrap();

        assert_eq!(report.urls().collect::<Vec<_>>(), vec!["https://good.f.io"]);
        assert_eq!(report.stats.errors, 1);
        assert!(report.failures.is_empty());
    }

    #[test]
    fn test_panicking_worker_is_reported() {
        let report = run(PoolSettings::new("f.io", 1), source(&["boom", "good"]), Arc::new(Failing)).unwrap();

        assert_eq!(report.failures.len(), 1);
        match &report.failures[0] {
            WorkerFailure::Panicked { worker_id, message } => {
                assert_eq!(*worker_id, 0);
                assert_eq!(message, "prober blew up");
            }
            other => panic!("expected panic failure, got {:?}", other),
        }
    }

    #[test]
    fn test_rejects_bad_settings() {
        let zero = ProbePool::start(PoolSettings::new("x.io", 0), source(&["a"]), Arc::new(Failing));
        assert!(matches!(zero, Err(PoolError::NoWorkers)));

        let empty = ProbePool::start(PoolSettings::new("", 4), source(&["a"]), Arc::new(Failing));
        assert!(matches!(empty, Err(PoolError::EmptyDomain)));
    }

    #[test]
    fn test_stop_ends_run_early() {
        let prober = Arc::new(
            FakeProber::new(&[]).with_slow("https://w0.stop.io", Duration::from_millis(100)),
        );
        let pool = ProbePool::start(
            PoolSettings::new("stop.io", 1),
            Arc::new(WordSource::new(numbered(1_000))),
            prober,
        )
        .unwrap();

        pool.stop();
        let report = pool.join();
        assert!(report.words_claimed < 1_000);
        assert!(report.failures.is_empty());
    }

    #[test]
    fn test_wait_signals_completion() {
        let pool = ProbePool::start(
            PoolSettings::new("x.io", 8),
            source(&["a", "b"]),
            Arc::new(FakeProber::new(&[])),
        )
        .unwrap();

        assert_eq!(pool.num_workers(), 8);
        assert!(pool.wait(Duration::from_secs(5)));
        assert_eq!(pool.total_probes(), 2);
        assert_eq!(pool.total_discoveries(), 0);
        assert_eq!(pool.join().count(), 0);
    }

    #[test]
    fn test_elapsed_rounding() {
        let report = RunReport {
            discoveries: Vec::new(),
            elapsed: Duration::from_millis(2_600),
            stats: StatsSnapshot::default(),
            words_claimed: 0,
            failures: Vec::new(),
        };
        assert_eq!(report.elapsed_secs_rounded(), 3);
    }
}
