//! Shared utility functions for native parsers.

use crate::common::{ActionSpec, SettingsMap};
use anyhow::{bail, Context};
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Computes a SHA-256 hash of the given content, returning a lowercase hex string.
pub fn hash_content(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("{:x}", hasher.finalize())
}

/// Content fingerprint stored in the sync record (`sha256:<hex>`).
pub fn fingerprint(content: &[u8]) -> String {
    format!("sha256:{}", hash_content(content))
}

/// Deserializes a YAML document, rejecting empty input.
pub(crate) fn parse_yaml<T: DeserializeOwned>(document: &str) -> crate::Result<T> {
    if document.trim().is_empty() {
        bail!("document is empty");
    }
    serde_yaml::from_str(document).context("invalid YAML")
}

/// Inserts `spec` keyed by its name, failing on duplicates.
pub(crate) fn insert_unique(
    map: &mut BTreeMap<String, ActionSpec>,
    spec: ActionSpec,
    kind: &str,
) -> crate::Result<()> {
    if spec.name.trim().is_empty() {
        bail!("{kind} with an empty name");
    }
    if map.contains_key(&spec.name) {
        bail!("duplicate {kind} '{}'", spec.name);
    }
    map.insert(spec.name.clone(), spec);
    Ok(())
}

/// Overlays `child` onto `parent`, child keys winning.
pub(crate) fn merge_settings(parent: &SettingsMap, child: &SettingsMap) -> SettingsMap {
    let mut merged = parent.clone();
    merged.extend(child.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
}
