//! The task being validated: one source paired with one sink.

use anyhow::{bail, Result};
use lorch_sync::{ActionSourceSpec, SettingsMap};
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// One requested action. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskSpec {
    source: String,
    sink: String,
    #[serde(skip_serializing_if = "SettingsMap::is_empty")]
    overrides: SettingsMap,
}

impl TaskSpec {
    pub fn new(source: impl Into<String>, sink: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            sink: sink.into(),
            overrides: SettingsMap::new(),
        }
    }

    /// Adds a setting override applied on top of the source's settings.
    pub fn with_override(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.overrides.insert(key.into(), value.into());
        self
    }

    pub fn with_overrides(mut self, overrides: SettingsMap) -> Self {
        self.overrides.extend(overrides);
        self
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn sink(&self) -> &str {
        &self.sink
    }

    pub fn overrides(&self) -> &SettingsMap {
        &self.overrides
    }

    /// Source settings with this task's overrides applied.
    pub fn effective_source_settings(&self, source: Option<&ActionSourceSpec>) -> SettingsMap {
        let mut settings = source.map(|s| s.settings.clone()).unwrap_or_default();
        settings.extend(
            self.overrides
                .iter()
                .map(|(key, value)| (key.clone(), value.clone())),
        );
        settings
    }
}

impl fmt::Display for TaskSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.source, self.sink)
    }
}

/// Parses a `key=value` override.
///
/// The value is read as JSON when it parses (`768`, `true`, `["a"]`) and
/// taken as a plain string otherwise.
pub fn parse_override(text: &str) -> Result<(String, Value)> {
    let Some((key, raw)) = text.split_once('=') else {
        bail!("override '{text}' must look like key=value");
    };
    let key = key.trim();
    if key.is_empty() {
        bail!("override '{text}' has an empty key");
    }
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lorch_sync::ActionSpec;
    use serde_json::json;

    #[test]
    fn overrides_win_over_source_settings() {
        let source = ActionSpec::new("tap-gmail")
            .with_setting("user_id", "me")
            .with_setting("messages.q", "after:2024/01/01");
        let task = TaskSpec::new("tap-gmail", "target-jsonl").with_override("user_id", "work");

        let settings = task.effective_source_settings(Some(&source));
        assert_eq!(settings.get("user_id"), Some(&json!("work")));
        assert_eq!(settings.get("messages.q"), Some(&json!("after:2024/01/01")));

        let orphan = task.effective_source_settings(None);
        assert_eq!(orphan.len(), 1);
    }

    #[test]
    fn parses_typed_and_plain_overrides() {
        assert_eq!(parse_override("dimensions=768").unwrap(), ("dimensions".into(), json!(768)));
        assert_eq!(
            parse_override("messages.q=after:2024/01/01").unwrap(),
            ("messages.q".into(), json!("after:2024/01/01"))
        );
        assert_eq!(parse_override("empty=").unwrap().1, json!(""));
        assert!(parse_override("novalue").is_err());
        assert!(parse_override("=x").is_err());
    }

    #[test]
    fn displays_as_pair() {
        assert_eq!(TaskSpec::new("a", "b").to_string(), "a -> b");
    }
}
