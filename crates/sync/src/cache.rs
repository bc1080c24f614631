//! On-disk cache document holding a tool's canonical config and sync record.

use crate::common::CanonicalConfig;
use crate::error::SyncError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use time::OffsetDateTime;

/// Layout version written into every cache document.
pub const CACHE_FORMAT_VERSION: u32 = 1;

/// Provenance of the cached config.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncRecord {
    #[serde(with = "time::serde::rfc3339")]
    pub synced_at: OffsetDateTime,
    /// `sha256:<hex>` of the raw native document.
    pub fingerprint: String,
    pub source_path: PathBuf,
}

impl SyncRecord {
    pub fn new(fingerprint: impl Into<String>, source_path: impl Into<PathBuf>) -> Self {
        Self {
            synced_at: OffsetDateTime::now_utc(),
            fingerprint: fingerprint.into(),
            source_path: source_path.into(),
        }
    }
}

/// Self-describing cache file: `{format, tool, record, config}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheDocument {
    pub format: u32,
    pub tool: String,
    pub record: SyncRecord,
    pub config: CanonicalConfig,
}

impl CacheDocument {
    pub fn new(tool: impl Into<String>, record: SyncRecord, config: CanonicalConfig) -> Self {
        Self {
            format: CACHE_FORMAT_VERSION,
            tool: tool.into(),
            record,
            config,
        }
    }

    /// Pretty JSON with a trailing newline.
    pub fn to_bytes(&self) -> serde_json::Result<Vec<u8>> {
        let mut bytes = serde_json::to_vec_pretty(self)?;
        bytes.push(b'\n');
        Ok(bytes)
    }

    /// Decodes and checks that the document belongs to `tool`.
    pub fn from_bytes(path: &Path, tool: &str, bytes: &[u8]) -> Result<Self, SyncError> {
        let corrupt = |detail: String| SyncError::CacheCorrupt {
            path: path.to_path_buf(),
            detail,
        };
        let doc: Self = serde_json::from_slice(bytes).map_err(|e| corrupt(e.to_string()))?;
        if doc.format != CACHE_FORMAT_VERSION {
            return Err(corrupt(format!("unsupported cache format {}", doc.format)));
        }
        if doc.tool != tool {
            return Err(corrupt(format!(
                "cache belongs to '{}', expected '{tool}'",
                doc.tool
            )));
        }
        Ok(doc)
    }
}

/// Reads the cache document at `path`; `Ok(None)` when it does not exist.
pub fn load_cache(path: &Path, tool: &str) -> Result<Option<CacheDocument>, SyncError> {
    let bytes = lorch_state::read_optional(path).map_err(|e| SyncError::CacheCorrupt {
        path: path.to_path_buf(),
        detail: format!("{e:#}"),
    })?;
    bytes
        .map(|bytes| CacheDocument::from_bytes(path, tool, &bytes))
        .transpose()
}

/// Replaces the cache document at `path` in one atomic rename.
pub fn store_cache(path: &Path, doc: &CacheDocument) -> Result<(), SyncError> {
    let write_err = |detail: String| SyncError::CacheWrite {
        path: path.to_path_buf(),
        detail,
    };
    let bytes = doc.to_bytes().map_err(|e| write_err(e.to_string()))?;
    lorch_state::write_atomic(path, &bytes).map_err(|e| write_err(format!("{e:#}")))
}

/// Freshness of a tool's cache relative to its native document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CacheStatus {
    /// No cache document yet.
    Unsynced,
    /// Cached fingerprint matches the native document.
    Fresh { fingerprint: String },
    /// The native document changed since the last sync.
    Stale { cached: String, current: String },
    /// The cache exists but the native document is gone.
    NativeMissing { cached: String },
}

impl CacheStatus {
    pub fn is_fresh(&self) -> bool {
        matches!(self, Self::Fresh { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Unsynced => "unsynced",
            Self::Fresh { .. } => "fresh",
            Self::Stale { .. } => "stale",
            Self::NativeMissing { .. } => "native-missing",
        }
    }
}
