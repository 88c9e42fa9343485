//! Candidate words for subdomain probing.
//!
//! - `loader`: reads a wordlist file into memory
//! - `source`: the shared, exactly-once word cursor drained by workers

mod loader;
mod source;

pub use loader::{load_words, parse_words, WordlistError};
pub use source::WordSource;
