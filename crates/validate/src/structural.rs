//! Structural rules applied to every tool: the named source and sink exist.

use crate::common::ErrorEntry;
use crate::rules::{Rule, RuleContext, RulePack};
use std::collections::BTreeMap;

pub const SOURCE_EXISTS: &str = "structural.source-exists";
pub const SINK_EXISTS: &str = "structural.sink-exists";

/// The generic pack that runs before any tool pack.
pub fn structural_rules() -> RulePack {
    RulePack::new().with_rule(SourceExists).with_rule(SinkExists)
}

#[derive(Debug, Clone, Copy)]
pub struct SourceExists;

impl Rule for SourceExists {
    fn id(&self) -> &str {
        SOURCE_EXISTS
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Vec<ErrorEntry> {
        if ctx.source.is_some() {
            return Vec::new();
        }
        vec![missing(
            SOURCE_EXISTS,
            "source",
            ctx.task.source(),
            &ctx.config.sources,
        )]
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SinkExists;

impl Rule for SinkExists {
    fn id(&self) -> &str {
        SINK_EXISTS
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Vec<ErrorEntry> {
        if ctx.sink.is_some() {
            return Vec::new();
        }
        vec![missing(SINK_EXISTS, "sink", ctx.task.sink(), &ctx.config.sinks)]
    }
}

fn missing<V>(rule: &str, kind: &str, name: &str, declared: &BTreeMap<String, V>) -> ErrorEntry {
    let entry = ErrorEntry::error(
        rule,
        format!("{kind} '{name}' is not declared in the synced config"),
    );
    if declared.is_empty() {
        entry.with_suggestion(format!("no {kind}s are declared; run `config sync` first"))
    } else {
        let names: Vec<&str> = declared.keys().map(String::as_str).collect();
        entry.with_suggestion(format!("known {kind}s: {}", names.join(", ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskSpec;
    use lorch_sync::{ActionSpec, CanonicalConfig};

    #[test]
    fn reports_both_missing_names() {
        let mut config = CanonicalConfig::default();
        config.sources.insert("a".into(), ActionSpec::new("a"));
        let task = TaskSpec::new("ghost", "missing");

        let entries = structural_rules().check(&RuleContext::new(&config, &task));
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].rule, SOURCE_EXISTS);
        assert!(entries[0].message.contains("'ghost'"));
        assert_eq!(entries[0].suggestion.as_deref(), Some("known sources: a"));
        assert_eq!(entries[1].rule, SINK_EXISTS);
        assert!(entries[1].message.contains("'missing'"));
    }
}
