//! Worker pool for concurrent subdomain probing.
//!
//! This module provides:
//! - One OS thread per worker, each draining the shared word source
//! - Lock-free run statistics
//! - A message-passing result collector joined into a final report

mod pool;
mod probe_worker;

pub use pool::{run, PoolError, PoolSettings, ProbePool, RunReport, WorkerFailure};
pub use probe_worker::{Discovery, ErrorPolicy, ProbeWorker, StatsSnapshot, WorkerExit, WorkerStats};
