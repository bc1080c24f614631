//! Sync reporting types for what a sync run did to the cache.

use crate::cache::SyncRecord;
use crate::common::CanonicalConfig;
use serde::Serialize;
use std::fmt;

/// Whether a sync rewrote the cache document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncChange {
    /// A new cache document was written.
    Updated,
    /// Native document and parsed config matched the cache; nothing written.
    Unchanged,
}

impl SyncChange {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Updated => "updated",
            Self::Unchanged => "unchanged",
        }
    }
}

/// Summary of one sync for display.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub tool: String,
    pub change: SyncChange,
    pub record: SyncRecord,
    pub sources: usize,
    pub sinks: usize,
    pub jobs: usize,
}

impl SyncReport {
    pub fn new(
        tool: impl Into<String>,
        change: SyncChange,
        record: SyncRecord,
        config: &CanonicalConfig,
    ) -> Self {
        Self {
            tool: tool.into(),
            change,
            record,
            sources: config.sources.len(),
            sinks: config.sinks.len(),
            jobs: config.jobs.len(),
        }
    }

    /// One-line human-readable summary.
    pub fn summary(&self) -> String {
        format!(
            "{}: {} ({} sources, {} sinks, {} jobs)",
            self.tool,
            self.change.as_str(),
            self.sources,
            self.sinks,
            self.jobs
        )
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.summary())?;
        writeln!(f, "  source:      {}", self.record.source_path.display())?;
        writeln!(f, "  fingerprint: {}", self.record.fingerprint)?;
        let synced_at = self
            .record
            .synced_at
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_else(|_| self.record.synced_at.to_string());
        write!(f, "  synced at:   {synced_at}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::ActionSpec;

    #[test]
    fn summary_counts_config_entries() {
        let mut config = CanonicalConfig::default();
        config.sources.insert("a".into(), ActionSpec::new("a"));
        config.sinks.insert("b".into(), ActionSpec::new("b"));
        let report = SyncReport::new(
            "t1",
            SyncChange::Updated,
            SyncRecord::new("sha256:ab", "t1.yml"),
            &config,
        );
        assert_eq!(report.summary(), "t1: updated (1 sources, 1 sinks, 0 jobs)");

        let text = report.to_string();
        assert!(text.contains("fingerprint: sha256:ab"));
        assert!(text.contains("source:      t1.yml"));
    }
}
