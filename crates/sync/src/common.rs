//! Tool-agnostic representation of a synced tool configuration.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Settings for one action: string keys mapping to scalars or nested mappings.
pub type SettingsMap = BTreeMap<String, Value>;

/// Looks up `key` in `settings`.
///
/// Tries the literal key first (Meltano style `messages.q`), then walks the
/// dot-separated path through nested mappings.
pub fn lookup_setting<'a>(settings: &'a SettingsMap, key: &str) -> Option<&'a Value> {
    if let Some(value) = settings.get(key) {
        return Some(value);
    }
    let mut parts = key.split('.');
    let mut current = settings.get(parts.next()?)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

/// Returns true when a setting carries an actual value.
///
/// `null`, empty strings, empty lists, and empty mappings count as unset.
pub fn setting_is_set(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        Value::Bool(_) | Value::Number(_) => true,
    }
}

/// Renders a setting value for messages and command lines.
pub fn setting_display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// One inclusion or exclusion pattern from a field-selection list.
///
/// Patterns are dot-separated segments (`stream.property.subproperty`) where
/// each segment may use `*` and `?` wildcards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SelectionRule {
    pub pattern: String,
    #[serde(default)]
    pub exclude: bool,
}

impl SelectionRule {
    /// Parses the native text form: `pattern` or `!pattern`.
    pub fn parse(text: &str) -> Self {
        let trimmed = text.trim();
        match trimmed.strip_prefix('!') {
            Some(rest) => Self {
                pattern: rest.trim().to_string(),
                exclude: true,
            },
            None => Self {
                pattern: trimmed.to_string(),
                exclude: false,
            },
        }
    }

    fn segments(&self) -> impl Iterator<Item = &str> {
        self.pattern.split('.')
    }

    /// True when the leading segment matches `name`.
    pub fn targets(&self, name: &str) -> bool {
        self.segments()
            .next()
            .is_some_and(|head| glob_matches(head, name))
    }

    /// True when this is an exclusion that drops `name` as a whole.
    ///
    /// `!message_list`, `!message_list.*` and `!message_list.*.*` all drop the
    /// stream; `!message_list.payload` only drops one property.
    pub fn drops_entirely(&self, name: &str) -> bool {
        self.exclude && self.targets(name) && self.segments().skip(1).all(|s| s == "*")
    }
}

impl fmt::Display for SelectionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.exclude {
            write!(f, "!{}", self.pattern)
        } else {
            f.write_str(&self.pattern)
        }
    }
}

fn glob_matches(pattern: &str, name: &str) -> bool {
    if !pattern.contains(['*', '?']) {
        return pattern == name;
    }
    let expr = format!(
        "^{}$",
        regex::escape(pattern)
            .replace(r"\*", ".*")
            .replace(r"\?", ".")
    );
    Regex::new(&expr).is_ok_and(|re| re.is_match(name))
}

/// Ordered field-selection rules for an action.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct SelectionRules(Vec<SelectionRule>);

impl SelectionRules {
    /// Builds rules from native pattern strings, keeping their order.
    pub fn from_patterns<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            patterns
                .into_iter()
                .map(|p| SelectionRule::parse(p.as_ref()))
                .filter(|r| !r.pattern.is_empty())
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SelectionRule> {
        self.0.iter()
    }

    /// First exclusion that drops `name` entirely, if any.
    pub fn excluding_rule(&self, name: &str) -> Option<&SelectionRule> {
        self.0.iter().find(|r| r.drops_entirely(name))
    }

    /// Whether `name` (a stream or field) survives the selection.
    ///
    /// Exclusions that drop the whole name win. Otherwise, when any inclusion
    /// exists, one of them must target the name; with no inclusions everything
    /// is selected.
    pub fn selects(&self, name: &str) -> bool {
        if self.excluding_rule(name).is_some() {
            return false;
        }
        let mut inclusions = self.0.iter().filter(|r| !r.exclude).peekable();
        if inclusions.peek().is_none() {
            return true;
        }
        inclusions.any(|r| r.targets(name))
    }
}

/// A named action source or sink with its settings and field selection.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ActionSpec {
    pub name: String,
    #[serde(default)]
    pub settings: SettingsMap,
    #[serde(default)]
    pub selection: SelectionRules,
}

impl ActionSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_setting(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.settings.insert(key.into(), value.into());
        self
    }

    pub fn with_selection<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.selection = SelectionRules::from_patterns(patterns);
        self
    }

    /// Shorthand for [`lookup_setting`] on this action's settings.
    pub fn setting(&self, key: &str) -> Option<&Value> {
        lookup_setting(&self.settings, key)
    }
}

/// An action source (extractor, vault path, index input).
pub type ActionSourceSpec = ActionSpec;
/// An action sink (loader, transform, vector index).
pub type ActionSinkSpec = ActionSpec;

/// One step of a job: run `source` into `sink`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JobStep {
    pub source: String,
    pub sink: String,
}

impl JobStep {
    pub fn new(source: impl Into<String>, sink: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            sink: sink.into(),
        }
    }
}

/// Complete synced configuration for one tool.
///
/// Replaced wholesale on every successful sync; never patched in place.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CanonicalConfig {
    #[serde(default)]
    pub sources: BTreeMap<String, ActionSourceSpec>,
    #[serde(default)]
    pub sinks: BTreeMap<String, ActionSinkSpec>,
    #[serde(default)]
    pub jobs: BTreeMap<String, Vec<JobStep>>,
}

impl CanonicalConfig {
    pub fn source(&self, name: &str) -> Option<&ActionSourceSpec> {
        self.sources.get(name)
    }

    pub fn sink(&self, name: &str) -> Option<&ActionSinkSpec> {
        self.sinks.get(name)
    }

    pub fn job(&self, name: &str) -> Option<&[JobStep]> {
        self.jobs.get(name).map(Vec::as_slice)
    }

    /// Jobs in name order.
    pub fn jobs(&self) -> impl Iterator<Item = (&str, &[JobStep])> {
        self.jobs.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// True when some job runs `source` into `sink`.
    pub fn declares_pair(&self, source: &str, sink: &str) -> bool {
        self.jobs
            .values()
            .flatten()
            .any(|step| step.source == source && step.sink == sink)
    }
}
