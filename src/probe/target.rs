//! Probe target construction.

use std::fmt;

/// A candidate URL derived from one word and the base domain.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProbeTarget(String);

impl ProbeTarget {
    /// Builds `https://<word>.<domain>`.
    #[inline]
    pub fn new(word: &str, domain: &str) -> Self {
        Self(format!("https://{}.{}", word, domain))
    }

    /// Returns the URL as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the target, returning the URL.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ProbeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
