//! Meltano rule pack.
//!
//! Tap settings that filter a specific stream silently do nothing when
//! the stream is deselected, which turns a bounded extraction into a full
//! mailbox download.

use crate::rules::{RulePack, SelectionDependency};

/// `messages.q` (Gmail search query) is applied while listing `message_list`.
pub const FILTER_STREAM_EXCLUDED: &str = "meltano.filter-stream-excluded";

/// Filter settings and the stream each one depends on.
const STREAM_FILTERS: &[(&str, &str)] = &[("messages.q", "message_list")];

pub fn meltano_rules() -> RulePack {
    STREAM_FILTERS
        .iter()
        .fold(RulePack::new(), |pack, (setting, stream)| {
            pack.with_rule(SelectionDependency::new(
                FILTER_STREAM_EXCLUDED,
                *setting,
                *stream,
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{validate_job, validate_task, TaskSpec, SOURCE_EXISTS};
    use lorch_sync::SettingsMap;
    use lorch_sync::{MeltanoParser, NativeParser};
    use lorch_test_utils::{GMAIL_CONFLICT_MELTANO_YML, GMAIL_OK_MELTANO_YML};

    #[test]
    fn gmail_query_with_excluded_message_list_is_invalid() {
        let config = MeltanoParser.parse(GMAIL_CONFLICT_MELTANO_YML).unwrap();
        let task = TaskSpec::new("tap-gmail", "target-jsonl");

        let result = validate_task(&config, &task, &meltano_rules());
        assert!(!result.is_valid());
        let entry = result.by_rule(FILTER_STREAM_EXCLUDED).next().unwrap();
        assert!(entry.message.contains("messages.q"));
        assert!(entry.message.contains("!message_list.*.*"));
    }

    #[test]
    fn dropping_only_the_exclusion_makes_task_valid() {
        let without_exclusion: String = GMAIL_CONFLICT_MELTANO_YML
            .lines()
            .filter(|line| !line.contains("!message_list"))
            .map(|line| format!("{line}\n"))
            .collect();
        assert_eq!(
            without_exclusion.lines().count() + 1,
            GMAIL_CONFLICT_MELTANO_YML.lines().count()
        );
        let task = TaskSpec::new("tap-gmail", "target-jsonl");

        let config = MeltanoParser.parse(&without_exclusion).unwrap();
        let result = validate_task(&config, &task, &meltano_rules());
        assert!(result.is_valid(), "{result}");
    }

    #[test]
    fn shared_ok_fixture_is_valid() {
        let config = MeltanoParser.parse(GMAIL_OK_MELTANO_YML).unwrap();
        let task = TaskSpec::new("tap-gmail", "target-jsonl");
        assert!(validate_task(&config, &task, &meltano_rules()).is_valid());
    }

    #[test]
    fn misspelled_job_extractor_is_reported() {
        let doc = GMAIL_OK_MELTANO_YML.replace("- tap-gmail target-jsonl", "- tap-gmial target-jsonl");
        let config = MeltanoParser.parse(&doc).unwrap();

        let steps =
            validate_job(&config, "gmail-to-jsonl", &SettingsMap::new(), &meltano_rules()).unwrap();
        assert_eq!(steps.len(), 1);
        assert!(!steps[0].result.is_valid());
        let entry = steps[0].result.by_rule(SOURCE_EXISTS).next().unwrap();
        assert!(entry.message.contains("tap-gmial"));
    }
}
