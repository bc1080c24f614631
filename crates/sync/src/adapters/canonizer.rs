//! Parser for canonizer mapping documents (`canonizer.yml`).
//!
//! ```yaml
//! transform_registry: transforms
//! vault: vault
//! mappings:
//!   - source_pattern: email/gmail
//!     transform: email/gmail_to_canonical_v1
//!     output_name: gmail
//! ```
//!
//! Vault source patterns become action sources, transforms become action
//! sinks, and every mapping is a one-step job named after its output.

use super::traits::NativeParser;
use super::utils::parse_yaml;
use crate::common::{ActionSpec, CanonicalConfig, JobStep, SettingsMap};
use crate::Result;
use anyhow::bail;
use serde::Deserialize;
use serde_json::Value;
use std::path::PathBuf;

#[derive(Debug, Deserialize)]
struct CanonizerDocument {
    transform_registry: Option<PathBuf>,
    #[serde(default)]
    vault: Option<PathBuf>,
    #[serde(default)]
    mappings: Vec<Mapping>,
}

#[derive(Debug, Deserialize)]
struct Mapping {
    source_pattern: String,
    transform: String,
    #[serde(default)]
    output_name: Option<String>,
    /// Extra per-source settings (e.g. a fixed `input` file).
    #[serde(default)]
    settings: SettingsMap,
}

/// Parser for canonizer transform mappings.
#[derive(Debug, Default, Clone, Copy)]
pub struct CanonizerParser;

impl CanonizerParser {
    pub fn new() -> Self {
        Self
    }
}

impl NativeParser for CanonizerParser {
    fn tool(&self) -> &str {
        "canonizer"
    }

    fn parse(&self, document: &str) -> Result<CanonicalConfig> {
        let doc: CanonizerDocument = parse_yaml(document)?;
        let Some(registry) = doc.transform_registry else {
            bail!("missing `transform_registry`");
        };
        if doc.mappings.is_empty() {
            bail!("No transform mappings configured");
        }

        let mut config = CanonicalConfig::default();
        for mapping in doc.mappings {
            if mapping.source_pattern.trim().is_empty() || mapping.transform.trim().is_empty() {
                bail!("mapping needs both `source_pattern` and `transform`");
            }

            let source = config
                .sources
                .entry(mapping.source_pattern.clone())
                .or_insert_with(|| {
                    let mut spec = ActionSpec::new(&mapping.source_pattern);
                    if let Some(vault) = &doc.vault {
                        spec.settings.insert(
                            "path".into(),
                            Value::String(
                                vault.join(&mapping.source_pattern).display().to_string(),
                            ),
                        );
                    }
                    spec
                });
            for (key, value) in mapping.settings {
                if let Some(existing) = source.settings.get(&key) {
                    if existing != &value {
                        bail!(
                            "conflicting `{key}` settings for source '{}'",
                            mapping.source_pattern
                        );
                    }
                }
                source.settings.insert(key, value);
            }

            config
                .sinks
                .entry(mapping.transform.clone())
                .or_insert_with(|| {
                    let meta = registry.join(format!("{}.meta.yaml", mapping.transform));
                    ActionSpec::new(&mapping.transform)
                        .with_setting("meta", meta.display().to_string())
                });

            let job = mapping
                .output_name
                .clone()
                .unwrap_or_else(|| mapping.source_pattern.clone());
            config
                .jobs
                .entry(job)
                .or_default()
                .push(JobStep::new(mapping.source_pattern, mapping.transform));
        }

        Ok(config)
    }
}
