//! Tool config sync for lorch.
//!
//! Reads a tool's native configuration document (read-only), maps it into
//! a tool-agnostic [`CanonicalConfig`] with a per-tool [`NativeParser`], and
//! writes it with its [`SyncRecord`] to a cache document in one atomic
//! replace. A failed sync never touches the previous cache.
//!
//! # Examples
//!
//! ```
//! use lorch_sync::{ActionSpec, CanonicalConfig, ConfigSync, NativeParser, Result, SyncChange};
//!
//! struct Lines;
//!
//! impl NativeParser for Lines {
//!     fn tool(&self) -> &str {
//!         "t1"
//!     }
//!
//!     fn parse(&self, document: &str) -> Result<CanonicalConfig> {
//!         let mut config = CanonicalConfig::default();
//!         for name in document.lines() {
//!             config.sources.insert(name.into(), ActionSpec::new(name));
//!         }
//!         Ok(config)
//!     }
//! }
//!
//! let dir = tempfile::tempdir().unwrap();
//! let native = dir.path().join("t1.txt");
//! std::fs::write(&native, "a\n").unwrap();
//!
//! let engine = ConfigSync::new(Box::new(Lines), &native, dir.path().join("t1.json"));
//! assert_eq!(engine.sync().unwrap().change, SyncChange::Updated);
//! assert_eq!(engine.sync().unwrap().change, SyncChange::Unchanged);
//! ```

#![deny(unsafe_code)]

pub type Error = anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;

pub mod adapters;
pub mod cache;
pub mod common;
pub mod engine;
pub mod error;
pub mod report;

pub use adapters::utils::fingerprint;
pub use adapters::{CanonizerParser, IndexerParser, MeltanoParser, NativeParser};
pub use cache::{
    load_cache, store_cache, CacheDocument, CacheStatus, SyncRecord, CACHE_FORMAT_VERSION,
};
pub use common::{
    lookup_setting, setting_display, setting_is_set, ActionSinkSpec, ActionSourceSpec,
    ActionSpec, CanonicalConfig, JobStep, SelectionRule, SelectionRules, SettingsMap,
};
pub use engine::{ConfigSync, SyncOutcome};
pub use error::SyncError;
pub use report::{SyncChange, SyncReport};
