//! Errors produced while syncing or loading a tool's cached configuration.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failure modes of the config sync engine.
///
/// Every variant leaves the previous cache document untouched.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SyncError {
    /// The native document does not exist.
    #[error("native config for '{tool}' not found at {}", path.display())]
    NativeNotFound { tool: String, path: PathBuf },

    /// The native document exists but could not be read.
    #[error("failed to read native config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The native document is malformed or lacks the expected structure.
    #[error("failed to parse {tool} config {}: {detail}", path.display())]
    Parse {
        tool: String,
        path: PathBuf,
        detail: String,
    },

    /// The cache document exists but is unreadable or not ours.
    #[error("cache document {} is unusable: {detail}", path.display())]
    CacheCorrupt { path: PathBuf, detail: String },

    /// The new cache document could not be written.
    #[error("failed to write cache {}: {detail}", path.display())]
    CacheWrite { path: PathBuf, detail: String },
}

impl SyncError {
    /// True for malformed-document failures.
    pub fn is_parse_error(&self) -> bool {
        matches!(self, Self::Parse { .. })
    }
}
