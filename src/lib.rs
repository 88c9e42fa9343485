//! # subprobe
//!
//! Multi-threaded subdomain finder: every word of a wordlist becomes
//! `https://<word>.<domain>` and hosts answering 200 are reported.
//!
//! ## Architecture
//!
//! - `wordlist`: Wordlist loading and the shared exactly-once word source
//! - `probe`: Target construction, outcome classification and the HTTPS prober
//! - `worker`: Worker threads, the pool and its run report
//! - `config`: Command-line configuration
//! - `telemetry`: Logging setup

pub mod config;
pub mod probe;
pub mod telemetry;
pub mod wordlist;
pub mod worker;

pub use config::Config;
pub use probe::{HttpProber, ProbeOutcome, ProbeTarget, Prober};
pub use wordlist::{load_words, WordSource};
pub use worker::{run, PoolSettings, ProbePool, RunReport};
