//! Rule abstraction, ordered rule packs, and reusable semantic rules.
//!
//! A rule is a self-contained predicate over the task's source, sink, and
//! effective settings. Tool knowledge is added by appending rules to a
//! [`RulePack`], never by branching on the tool name.

use crate::common::ErrorEntry;
use crate::task::TaskSpec;
use lorch_sync::{
    lookup_setting, setting_display, setting_is_set, ActionSinkSpec, ActionSourceSpec,
    CanonicalConfig, SettingsMap,
};
use serde_json::Value;

/// Everything a rule may look at for one task.
#[derive(Debug)]
pub struct RuleContext<'a> {
    pub config: &'a CanonicalConfig,
    pub task: &'a TaskSpec,
    /// `None` when the task names an undeclared source.
    pub source: Option<&'a ActionSourceSpec>,
    /// `None` when the task names an undeclared sink.
    pub sink: Option<&'a ActionSinkSpec>,
    /// Source settings with the task's overrides applied.
    pub source_settings: SettingsMap,
}

impl<'a> RuleContext<'a> {
    pub fn new(config: &'a CanonicalConfig, task: &'a TaskSpec) -> Self {
        let source = config.source(task.source());
        Self {
            config,
            task,
            source,
            sink: config.sink(task.sink()),
            source_settings: task.effective_source_settings(source),
        }
    }

    /// Effective source setting, if present and non-empty.
    pub fn source_setting(&self, key: &str) -> Option<&Value> {
        lookup_setting(&self.source_settings, key).filter(|v| setting_is_set(v))
    }

    /// Sink setting, if present and non-empty.
    pub fn sink_setting(&self, key: &str) -> Option<&Value> {
        self.sink?.setting(key).filter(|v| setting_is_set(v))
    }
}

/// A single validation predicate.
pub trait Rule: Send + Sync {
    /// Stable identifier copied into every entry this rule emits.
    fn id(&self) -> &str;

    /// Returns zero or more violations for the task in `ctx`.
    fn check(&self, ctx: &RuleContext<'_>) -> Vec<ErrorEntry>;
}

/// Ordered list of rules applied to every task of one tool.
#[derive(Default)]
pub struct RulePack {
    rules: Vec<Box<dyn Rule>>,
}

impl std::fmt::Debug for RulePack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.ids()).finish()
    }
}

impl RulePack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `rule`; rules run in insertion order.
    pub fn with_rule(mut self, rule: impl Rule + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|r| r.id())
    }

    /// Runs every rule and concatenates their entries.
    pub fn check(&self, ctx: &RuleContext<'_>) -> Vec<ErrorEntry> {
        self.rules.iter().flat_map(|rule| rule.check(ctx)).collect()
    }
}

/// A source filter setting that only works when a stream stays selected.
///
/// A filter on an excluded stream is silently ignored by the tool, so the
/// run extracts far more than intended.
#[derive(Debug, Clone)]
pub struct SelectionDependency {
    pub id: String,
    pub setting: String,
    pub stream: String,
}

impl SelectionDependency {
    pub fn new(
        id: impl Into<String>,
        setting: impl Into<String>,
        stream: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            setting: setting.into(),
            stream: stream.into(),
        }
    }
}

impl Rule for SelectionDependency {
    fn id(&self) -> &str {
        &self.id
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Vec<ErrorEntry> {
        let Some(source) = ctx.source else {
            return Vec::new();
        };
        let Some(value) = ctx.source_setting(&self.setting) else {
            return Vec::new();
        };
        // Only an explicit exclusion is a conflict; a stream that no rule
        // mentions is left to the tap's own defaults.
        let Some(rule) = source.selection.excluding_rule(&self.stream) else {
            return Vec::new();
        };
        vec![ErrorEntry::error(
            &self.id,
            format!(
                "source '{}' sets `{}` = {} which filters stream '{}', but selection rule `{rule}` excludes that stream; the filter would be ignored",
                source.name,
                self.setting,
                setting_display(value),
                self.stream
            ),
        )
        .with_suggestion(format!(
            "remove `{rule}` or drop the `{}` setting",
            self.setting
        ))]
    }
}

/// The sink reads a field from the source that must survive field selection.
#[derive(Debug, Clone)]
pub struct SinkFieldSelected {
    pub id: String,
    /// Sink setting naming the field (e.g. `text_field`).
    pub sink_setting: String,
}

impl SinkFieldSelected {
    pub fn new(id: impl Into<String>, sink_setting: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            sink_setting: sink_setting.into(),
        }
    }
}

impl Rule for SinkFieldSelected {
    fn id(&self) -> &str {
        &self.id
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Vec<ErrorEntry> {
        let (Some(source), Some(sink)) = (ctx.source, ctx.sink) else {
            return Vec::new();
        };
        let Some(field) = ctx.sink_setting(&self.sink_setting).and_then(Value::as_str) else {
            return Vec::new();
        };
        if source.selection.selects(field) {
            return Vec::new();
        }
        vec![ErrorEntry::error(
            &self.id,
            format!(
                "sink '{}' reads field '{field}' (`{}`) but source '{}' does not select it",
                sink.name, self.sink_setting, source.name
            ),
        )
        .with_suggestion(format!("add '{field}' to the source's field selection"))]
    }
}

/// The source/sink pair must appear in at least one declared job.
#[derive(Debug, Clone)]
pub struct DeclaredPair {
    pub id: String,
}

impl DeclaredPair {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

impl Rule for DeclaredPair {
    fn id(&self) -> &str {
        &self.id
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Vec<ErrorEntry> {
        let (Some(source), Some(sink)) = (ctx.source, ctx.sink) else {
            return Vec::new();
        };
        if ctx.config.declares_pair(&source.name, &sink.name) {
            return Vec::new();
        }
        vec![ErrorEntry::error(
            &self.id,
            format!("no job maps '{}' into '{}'", source.name, sink.name),
        )]
    }
}

/// The effective source settings must carry a value for `key`.
#[derive(Debug, Clone)]
pub struct RequiredSourceSetting {
    pub id: String,
    pub key: String,
}

impl RequiredSourceSetting {
    pub fn new(id: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            key: key.into(),
        }
    }
}

impl Rule for RequiredSourceSetting {
    fn id(&self) -> &str {
        &self.id
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Vec<ErrorEntry> {
        let Some(source) = ctx.source else {
            return Vec::new();
        };
        if ctx.source_setting(&self.key).is_some() {
            return Vec::new();
        }
        vec![ErrorEntry::error(
            &self.id,
            format!("source '{}' has no `{}` setting", source.name, self.key),
        )
        .with_suggestion(format!("pass --set {}=<value>", self.key))]
    }
}

/// A sink setting that must be a positive integer.
#[derive(Debug, Clone)]
pub struct PositiveIntegerSetting {
    pub id: String,
    pub key: String,
}

impl PositiveIntegerSetting {
    pub fn new(id: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            key: key.into(),
        }
    }
}

impl Rule for PositiveIntegerSetting {
    fn id(&self) -> &str {
        &self.id
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Vec<ErrorEntry> {
        let Some(sink) = ctx.sink else {
            return Vec::new();
        };
        match sink.setting(&self.key) {
            Some(value) if value.as_u64().is_some_and(|n| n > 0) => Vec::new(),
            Some(value) => vec![ErrorEntry::error(
                &self.id,
                format!(
                    "sink '{}' has `{}` = {}, expected a positive integer",
                    sink.name,
                    self.key,
                    setting_display(value)
                ),
            )],
            None => vec![ErrorEntry::error(
                &self.id,
                format!("sink '{}' has no `{}` setting", sink.name, self.key),
            )],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lorch_sync::{ActionSpec, JobStep};
    use serde_json::json;

    fn config(source: ActionSpec, sink: ActionSpec) -> CanonicalConfig {
        let mut config = CanonicalConfig::default();
        config.sources.insert(source.name.clone(), source);
        config.sinks.insert(sink.name.clone(), sink);
        config
    }

    fn gmail(select: &[&str]) -> ActionSpec {
        ActionSpec::new("tap-gmail")
            .with_setting("messages.q", "after:2024/01/01")
            .with_selection(select)
    }

    #[test]
    fn selection_dependency_flags_excluded_stream() {
        let config = config(
            gmail(&["messages.*", "!message_list.*.*"]),
            ActionSpec::new("target-jsonl"),
        );
        let task = TaskSpec::new("tap-gmail", "target-jsonl");
        let rule = SelectionDependency::new("dep", "messages.q", "message_list");

        let entries = rule.check(&RuleContext::new(&config, &task));
        assert_eq!(entries.len(), 1);
        assert!(entries[0].message.contains("message_list"));
        assert!(entries[0].message.contains("!message_list.*.*"));
    }

    #[test]
    fn selection_dependency_only_fires_on_exclusion() {
        let config = config(gmail(&["messages.*"]), ActionSpec::new("target-jsonl"));
        let task = TaskSpec::new("tap-gmail", "target-jsonl");
        let rule = SelectionDependency::new("dep", "messages.q", "message_list");
        assert!(rule.check(&RuleContext::new(&config, &task)).is_empty());
    }

    #[test]
    fn selection_dependency_ignores_unset_filter() {
        let source = ActionSpec::new("tap-gmail").with_selection(["!message_list.*.*"]);
        let config = config(source, ActionSpec::new("target-jsonl"));
        let task = TaskSpec::new("tap-gmail", "target-jsonl");
        let rule = SelectionDependency::new("dep", "messages.q", "message_list");
        assert!(rule.check(&RuleContext::new(&config, &task)).is_empty());

        let with_override = task.with_override("messages.q", "after:2024/06/01");
        assert_eq!(
            rule.check(&RuleContext::new(&config, &with_override)).len(),
            1
        );
    }

    #[test]
    fn sink_field_must_be_selected() {
        let source = ActionSpec::new("email").with_selection(["subject", "!body"]);
        let sink = ActionSpec::new("idx").with_setting("text_field", "body");
        let config = config(source, sink);
        let task = TaskSpec::new("email", "idx");
        let entries = SinkFieldSelected::new("field", "text_field")
            .check(&RuleContext::new(&config, &task));
        assert_eq!(entries.len(), 1);
        assert!(entries[0].message.contains("'body'"));
    }

    #[test]
    fn declared_pair_requires_job() {
        let mut config = config(ActionSpec::new("a"), ActionSpec::new("b"));
        let task = TaskSpec::new("a", "b");
        let rule = DeclaredPair::new("pair");
        assert_eq!(rule.check(&RuleContext::new(&config, &task)).len(), 1);

        config.jobs.insert("ab".into(), vec![JobStep::new("a", "b")]);
        assert!(rule.check(&RuleContext::new(&config, &task)).is_empty());
    }

    #[test]
    fn positive_integer_setting() {
        let rule = PositiveIntegerSetting::new("dims", "dimensions");
        for (value, ok) in [(json!(768), true), (json!(0), false), (json!("768"), false)] {
            let config = config(
                ActionSpec::new("a"),
                ActionSpec::new("b").with_setting("dimensions", value),
            );
            let task = TaskSpec::new("a", "b");
            assert_eq!(rule.check(&RuleContext::new(&config, &task)).is_empty(), ok);
        }
    }

    #[test]
    fn required_setting_accepts_override() {
        let config = config(ActionSpec::new("a"), ActionSpec::new("b"));
        let rule = RequiredSourceSetting::new("input", "input");
        let task = TaskSpec::new("a", "b");
        assert_eq!(rule.check(&RuleContext::new(&config, &task)).len(), 1);
        let task = task.with_override("input", "data.jsonl");
        assert!(rule.check(&RuleContext::new(&config, &task)).is_empty());
    }

    #[test]
    fn pack_keeps_rule_order() {
        let pack = RulePack::new()
            .with_rule(DeclaredPair::new("first"))
            .with_rule(RequiredSourceSetting::new("second", "input"));
        assert_eq!(pack.ids().collect::<Vec<_>>(), ["first", "second"]);

        let config = config(ActionSpec::new("a"), ActionSpec::new("b"));
        let task = TaskSpec::new("a", "b");
        let rules: Vec<_> = pack
            .check(&RuleContext::new(&config, &task))
            .into_iter()
            .map(|e| e.rule)
            .collect();
        assert_eq!(rules, ["first", "second"]);
    }
}
