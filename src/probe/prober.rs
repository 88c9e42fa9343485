//! Probe outcomes and the prober seam.

use std::fmt;

use super::ProbeTarget;

/// Why a probe produced no answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransientKind {
    /// DNS, TCP or TLS setup failed
    Connect,
    /// No complete response within the timeout
    Timeout,
}

impl fmt::Display for TransientKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransientKind::Connect => write!(f, "connect"),
            TransientKind::Timeout => write!(f, "timeout"),
        }
    }
}

/// Classified result of a single probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The host answered 200
    Success,
    /// The host answered with any other status
    Miss(u16),
    /// Expected network failure; the word yields nothing
    Transient(TransientKind),
}

impl ProbeOutcome {
    #[inline]
    pub fn is_success(self) -> bool {
        matches!(self, ProbeOutcome::Success)
    }
}

/// Maps a final HTTP status code to an outcome. Only 200 counts as a discovery.
#[inline]
pub fn classify_status(status: u16) -> ProbeOutcome {
    if status == 200 {
        ProbeOutcome::Success
    } else {
        ProbeOutcome::Miss(status)
    }
}

/// A probe failure that is neither a connect failure nor a timeout.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("Invalid probe URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Probe of {url} failed: {reason}")]
    Other { url: String, reason: String },
}

/// Issues one network probe against a target.
///
/// Implementations are shared by every worker, so they must be callable
/// concurrently. Connect failures and timeouts are reported as
/// [`ProbeOutcome::Transient`]; everything else that goes wrong is a
/// [`ProbeError`].
pub trait Prober: Send + Sync {
    fn probe(&self, target: &ProbeTarget) -> Result<ProbeOutcome, ProbeError>;
}
