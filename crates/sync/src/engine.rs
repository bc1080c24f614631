//! Config sync engine: native document → canonical config → cache.

use crate::adapters::traits::NativeParser;
use crate::adapters::utils::fingerprint;
use crate::cache::{load_cache, store_cache, CacheDocument, CacheStatus, SyncRecord};
use crate::common::CanonicalConfig;
use crate::error::SyncError;
use crate::report::SyncChange;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Result of a successful [`ConfigSync::sync`].
#[derive(Debug, Clone)]
pub struct SyncOutcome {
    pub record: SyncRecord,
    pub config: CanonicalConfig,
    pub change: SyncChange,
}

/// Mirrors one tool's native document into its cache document.
///
/// The native document is only ever read. Every failure leaves the previous
/// cache document exactly as it was.
pub struct ConfigSync {
    parser: Box<dyn NativeParser>,
    native_path: PathBuf,
    cache_path: PathBuf,
}

impl std::fmt::Debug for ConfigSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigSync")
            .field("tool", &self.parser.tool())
            .field("native_path", &self.native_path)
            .field("cache_path", &self.cache_path)
            .finish()
    }
}

impl ConfigSync {
    pub fn new(
        parser: Box<dyn NativeParser>,
        native_path: impl Into<PathBuf>,
        cache_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            parser,
            native_path: native_path.into(),
            cache_path: cache_path.into(),
        }
    }

    pub fn tool(&self) -> &str {
        self.parser.tool()
    }

    pub fn native_path(&self) -> &Path {
        &self.native_path
    }

    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }

    /// Loads the cache document, if one was ever written.
    pub fn load_cached(&self) -> Result<Option<CacheDocument>, SyncError> {
        load_cache(&self.cache_path, self.tool())
    }

    /// Parses the native document and atomically replaces the cache.
    ///
    /// When the fingerprint and source path match the existing cache,
    /// nothing is written and the existing record is returned.
    pub fn sync(&self) -> Result<SyncOutcome, SyncError> {
        let tool = self.tool().to_string();
        let raw = self.read_native()?;
        let fp = fingerprint(&raw);

        let text = std::str::from_utf8(&raw).map_err(|e| SyncError::Parse {
            tool: tool.clone(),
            path: self.native_path.clone(),
            detail: format!("document is not valid UTF-8: {e}"),
        })?;
        let config = self.parser.parse(text).map_err(|e| {
            tracing::warn!(
                tool = %tool,
                path = %self.native_path.display(),
                error = %format!("{e:#}"),
                "native config failed to parse; keeping previous cache"
            );
            SyncError::Parse {
                tool: tool.clone(),
                path: self.native_path.clone(),
                detail: format!("{e:#}"),
            }
        })?;

        let previous = match self.load_cached() {
            Ok(previous) => previous,
            Err(err) => {
                tracing::warn!(tool = %tool, error = %err, "replacing unusable cache document");
                None
            }
        };
        if let Some(previous) = previous {
            // Parsers are deterministic, so equal bytes mean an equal config.
            // Comparing configs read back from JSON would trip on lossy floats.
            if previous.record.fingerprint == fp && previous.record.source_path == self.native_path
            {
                tracing::debug!(tool = %tool, fingerprint = %fp, "native config unchanged");
                return Ok(SyncOutcome {
                    record: previous.record,
                    config,
                    change: SyncChange::Unchanged,
                });
            }
        }

        let record = SyncRecord::new(fp, self.native_path.clone());
        let doc = CacheDocument::new(tool.clone(), record, config);
        store_cache(&self.cache_path, &doc)?;
        tracing::info!(
            tool = %tool,
            fingerprint = %doc.record.fingerprint,
            path = %self.cache_path.display(),
            sources = doc.config.sources.len(),
            sinks = doc.config.sinks.len(),
            "cache updated"
        );

        Ok(SyncOutcome {
            record: doc.record,
            config: doc.config,
            change: SyncChange::Updated,
        })
    }

    /// Compares the cached fingerprint with a fresh hash of the native file.
    pub fn status(&self) -> Result<CacheStatus, SyncError> {
        let Some(doc) = self.load_cached()? else {
            return Ok(CacheStatus::Unsynced);
        };
        let cached = doc.record.fingerprint;
        match self.read_native() {
            Ok(raw) => {
                let current = fingerprint(&raw);
                if current == cached {
                    Ok(CacheStatus::Fresh {
                        fingerprint: cached,
                    })
                } else {
                    Ok(CacheStatus::Stale { cached, current })
                }
            }
            Err(SyncError::NativeNotFound { .. }) => Ok(CacheStatus::NativeMissing { cached }),
            Err(err) => Err(err),
        }
    }

    fn read_native(&self) -> Result<Vec<u8>, SyncError> {
        fs::read(&self.native_path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                SyncError::NativeNotFound {
                    tool: self.tool().to_string(),
                    path: self.native_path.clone(),
                }
            } else {
                SyncError::Read {
                    path: self.native_path.clone(),
                    source,
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::traits::MockNativeParser;
    use crate::common::ActionSpec;
    use anyhow::anyhow;
    use tempfile::tempdir;

    fn mock_parser(fail: bool) -> Box<dyn NativeParser> {
        let mut parser = MockNativeParser::new();
        parser.expect_tool().return_const("t1".to_string());
        parser.expect_parse().returning(move |doc| {
            if fail {
                return Err(anyhow!("broken document"));
            }
            let mut config = CanonicalConfig::default();
            for name in doc.split_whitespace() {
                config.sources.insert(name.into(), ActionSpec::new(name));
            }
            Ok(config)
        });
        Box::new(parser)
    }

    #[test]
    fn sync_then_resync_is_unchanged() {
        let dir = tempdir().unwrap();
        let native = dir.path().join("t1.yml");
        fs::write(&native, "a b").unwrap();
        let engine = ConfigSync::new(mock_parser(false), &native, dir.path().join("t1.json"));

        let first = engine.sync().unwrap();
        assert_eq!(first.change, SyncChange::Updated);
        assert!(first.config.source("a").is_some());

        let second = engine.sync().unwrap();
        assert_eq!(second.change, SyncChange::Unchanged);
        assert_eq!(second.record, first.record);
    }

    #[test]
    fn parse_failure_is_reported_as_parse_error() {
        let dir = tempdir().unwrap();
        let native = dir.path().join("t1.yml");
        fs::write(&native, "a").unwrap();
        let engine = ConfigSync::new(mock_parser(true), &native, dir.path().join("t1.json"));

        let err = engine.sync().unwrap_err();
        assert!(err.is_parse_error());
        assert!(err.to_string().contains("broken document"));
        assert!(!engine.cache_path().exists());
    }

    #[test]
    fn missing_native_document() {
        let dir = tempdir().unwrap();
        let engine = ConfigSync::new(
            mock_parser(false),
            dir.path().join("absent.yml"),
            dir.path().join("t1.json"),
        );
        assert!(matches!(
            engine.sync(),
            Err(SyncError::NativeNotFound { .. })
        ));
        assert_eq!(engine.status().unwrap(), CacheStatus::Unsynced);
    }

    #[test]
    fn status_tracks_native_changes() {
        let dir = tempdir().unwrap();
        let native = dir.path().join("t1.yml");
        fs::write(&native, "a").unwrap();
        let engine = ConfigSync::new(mock_parser(false), &native, dir.path().join("t1.json"));
        engine.sync().unwrap();
        assert!(engine.status().unwrap().is_fresh());

        fs::write(&native, "a b").unwrap();
        assert!(matches!(engine.status().unwrap(), CacheStatus::Stale { .. }));

        fs::remove_file(&native).unwrap();
        assert!(matches!(
            engine.status().unwrap(),
            CacheStatus::NativeMissing { .. }
        ));
    }
}
