//! Runtime configuration for the subdomain finder.

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser};

use crate::worker::{ErrorPolicy, PoolSettings};

/// Fast multi-threaded subdomain finder
#[derive(Parser, Debug, Clone)]
#[command(
    author,
    version,
    about,
    long_about = None,
    disable_version_flag = true,
    after_help = "Example: subprobe -w /path/to/wordlist -t 500 -V google.com"
)]
pub struct Config {
    /// Domain name to find subdomains for
    pub domain: String,

    /// Wordlist of subdomain candidates
    #[arg(short = 'w', long, value_name = "PATH", default_value = "wordlist.txt")]
    pub wordlist: PathBuf,

    /// Number of worker threads
    #[arg(short = 't', long, value_name = "N", default_value = "500")]
    pub threads: usize,

    /// Print subdomains as they are found
    #[arg(short = 'V', long)]
    pub verbose: bool,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECS", default_value = "5")]
    pub timeout: u64,

    /// Keep a worker running after an unexpected probe error
    #[arg(long)]
    pub keep_going: bool,

    /// Progress report interval in seconds (0 = off)
    #[arg(short = 'r', long, value_name = "SECS", default_value = "0")]
    pub report_interval: u64,

    /// Print version
    #[arg(short = 'v', long, action = ArgAction::Version)]
    pub version: Option<bool>,
}

impl Config {
    /// Validates the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let domain = self.domain.trim();

        if domain.is_empty() {
            return Err(ConfigError::InvalidDomain("Domain cannot be empty".into()));
        }

        if domain.contains("://") {
            return Err(ConfigError::InvalidDomain(
                "Domain must not include a scheme (use example.com, not https://example.com)".into(),
            ));
        }

        if domain.contains('/') || domain.chars().any(char::is_whitespace) {
            return Err(ConfigError::InvalidDomain(
                "Domain must be a bare host name".into(),
            ));
        }

        if self.threads == 0 {
            return Err(ConfigError::InvalidThreads);
        }

        if self.timeout == 0 {
            return Err(ConfigError::InvalidTimeout);
        }

        Ok(())
    }

    /// Returns the domain without surrounding whitespace or dots.
    pub fn normalized_domain(&self) -> String {
        self.domain.trim().trim_matches('.').to_lowercase()
    }

    /// Returns the per-probe timeout.
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// Returns the progress report interval, if reporting is enabled.
    pub fn report_every(&self) -> Option<Duration> {
        (self.report_interval > 0).then(|| Duration::from_secs(self.report_interval))
    }

    /// Returns how workers treat unexpected probe errors.
    pub fn error_policy(&self) -> ErrorPolicy {
        if self.keep_going {
            ErrorPolicy::Continue
        } else {
            ErrorPolicy::AbortWorker
        }
    }

    /// Builds the pool settings for this configuration.
    pub fn pool_settings(&self) -> PoolSettings {
        PoolSettings::new(self.normalized_domain(), self.threads)
            .verbose(self.verbose)
            .error_policy(self.error_policy())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid domain: {0}")]
    InvalidDomain(String),

    #[error("Thread count must be at least 1")]
    InvalidThreads,

    #[error("Timeout must be at least 1 second")]
    InvalidTimeout,
}
