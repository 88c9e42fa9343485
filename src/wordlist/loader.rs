//! Wordlist file loading.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Reads a wordlist file and returns its words.
///
/// The file is split on any whitespace, so one-per-line and space separated
/// lists both work. Duplicates are dropped, keeping the first occurrence.
pub fn load_words(path: impl AsRef<Path>) -> Result<Vec<String>, WordlistError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| WordlistError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(parse_words(&contents))
}

/// Splits wordlist contents into unique words in file order.
pub fn parse_words(contents: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    contents
        .split_whitespace()
        .filter(|word| seen.insert(*word))
        .map(str::to_owned)
        .collect()
}

#[derive(Debug, thiserror::Error)]
pub enum WordlistError {
    #[error("Cannot read wordlist {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
