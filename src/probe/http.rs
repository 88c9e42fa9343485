//! HTTPS prober backed by a blocking reqwest client.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::Url;

use super::prober::{classify_status, ProbeError, ProbeOutcome, Prober, TransientKind};
use super::ProbeTarget;

/// Per-probe timeout used when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Issues a plain GET per target with default headers and no retries.
///
/// One client is shared by all workers; it pools connections internally.
#[derive(Debug, Clone)]
pub struct HttpProber {
    client: Client,
    timeout: Duration,
}

impl HttpProber {
    /// Creates a prober whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, timeout })
    }

    /// Returns the per-probe timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Prober for HttpProber {
    fn probe(&self, target: &ProbeTarget) -> Result<ProbeOutcome, ProbeError> {
        let url = Url::parse(target.as_str()).map_err(|e| ProbeError::InvalidUrl {
            url: target.to_string(),
            reason: e.to_string(),
        })?;

        match self.client.get(url).send() {
            Ok(response) => Ok(classify_status(response.status().as_u16())),
            // Connect timeouts set both flags; report them as timeouts.
            Err(e) if e.is_timeout() => Ok(ProbeOutcome::Transient(TransientKind::Timeout)),
            Err(e) if e.is_connect() => Ok(ProbeOutcome::Transient(TransientKind::Connect)),
            Err(source) => Err(ProbeError::Request {
                url: target.to_string(),
                source,
            }),
        }
    }
}
