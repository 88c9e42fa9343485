//! Network probing of candidate hostnames.
//!
//! - `target`: builds `https://<word>.<domain>` URLs
//! - `prober`: the `Prober` seam and outcome classification
//! - `http`: the reqwest-backed prober used in production

mod http;
mod prober;
mod target;

pub use http::{HttpProber, DEFAULT_TIMEOUT};
pub use prober::{classify_status, ProbeError, ProbeOutcome, Prober, TransientKind};
pub use target::ProbeTarget;
