//! Task validation for lorch.
//!
//! Checks a proposed task (one source run into one sink) against a tool's
//! synced [`CanonicalConfig`]. Structural rules run first for every tool,
//! then the tool's [`RulePack`]. Every rule runs; a single call reports
//! every problem.
//!
//! # Example
//!
//! ```rust
//! use lorch_sync::{ActionSpec, CanonicalConfig};
//! use lorch_validate::{meltano_rules, validate_task, TaskSpec};
//!
//! let mut config = CanonicalConfig::default();
//! config.sources.insert("a".into(), ActionSpec::new("a"));
//! config.sinks.insert("b".into(), ActionSpec::new("b"));
//!
//! let result = validate_task(&config, &TaskSpec::new("a", "missing"), &meltano_rules());
//! assert!(!result.is_valid());
//! assert!(result.errors()[0].message.contains("missing"));
//! ```

pub mod canonizer;
pub mod common;
pub mod indexer;
pub mod meltano;
pub mod rules;
pub mod structural;
pub mod task;

pub use canonizer::canonizer_rules;
pub use common::{ErrorEntry, Severity, ValidationResult};
pub use indexer::indexer_rules;
pub use meltano::meltano_rules;
pub use rules::{
    DeclaredPair, PositiveIntegerSetting, RequiredSourceSetting, Rule, RuleContext, RulePack,
    SelectionDependency, SinkFieldSelected,
};
pub use structural::{structural_rules, SINK_EXISTS, SOURCE_EXISTS};
pub use task::{parse_override, TaskSpec};

use lorch_sync::{CanonicalConfig, JobStep, SettingsMap};
use serde::Serialize;

/// Validates one task: structural rules, then `pack`, all errors kept.
///
/// Never mutates `config` and never runs the tool.
pub fn validate_task(
    config: &CanonicalConfig,
    task: &TaskSpec,
    pack: &RulePack,
) -> ValidationResult {
    let ctx = RuleContext::new(config, task);
    let mut errors = structural_rules().check(&ctx);
    errors.extend(pack.check(&ctx));

    let result = ValidationResult::from_entries(errors);
    tracing::debug!(
        source = task.source(),
        sink = task.sink(),
        errors = result.errors().len(),
        "validated task"
    );
    result
}

/// Validation of one step of a declared job.
#[derive(Debug, Clone, Serialize)]
pub struct StepValidation {
    pub job: String,
    pub step: JobStep,
    pub result: ValidationResult,
}

/// Validates every step of `job`, or `None` when the job is not declared.
pub fn validate_job(
    config: &CanonicalConfig,
    job: &str,
    overrides: &SettingsMap,
    pack: &RulePack,
) -> Option<Vec<StepValidation>> {
    let steps = config.job(job)?;
    Some(
        steps
            .iter()
            .map(|step| {
                let task =
                    TaskSpec::new(&step.source, &step.sink).with_overrides(overrides.clone());
                StepValidation {
                    job: job.to_string(),
                    step: step.clone(),
                    result: validate_task(config, &task, pack),
                }
            })
            .collect(),
    )
}

/// Validates every step of every declared job, in job-name order.
pub fn validate_all_jobs(
    config: &CanonicalConfig,
    overrides: &SettingsMap,
    pack: &RulePack,
) -> Vec<StepValidation> {
    config
        .jobs()
        .filter_map(|(job, _)| validate_job(config, job, overrides, pack))
        .flatten()
        .collect()
}

/// Summary of several validation results.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ValidationSummary {
    pub total: usize,
    pub valid: usize,
    pub error_count: usize,
    pub warning_count: usize,
}

impl ValidationSummary {
    pub fn from_results<'a>(results: impl IntoIterator<Item = &'a ValidationResult>) -> Self {
        results
            .into_iter()
            .fold(Self::default(), |mut summary, result| {
                summary.total += 1;
                if result.is_valid() {
                    summary.valid += 1;
                }
                summary.error_count += result.error_count();
                summary.warning_count += result.warning_count();
                summary
            })
    }

    pub fn all_valid(&self) -> bool {
        self.valid == self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lorch_sync::ActionSpec;

    fn config() -> CanonicalConfig {
        let mut config = CanonicalConfig::default();
        config.sources.insert("a".into(), ActionSpec::new("a"));
        config.sinks.insert("b".into(), ActionSpec::new("b"));
        config
            .jobs
            .insert("ab".into(), vec![JobStep::new("a", "b"), JobStep::new("a", "c")]);
        config
    }

    #[test]
    fn missing_sink_is_the_only_error() {
        let result = validate_task(&config(), &TaskSpec::new("a", "missing"), &RulePack::new());
        assert!(!result.is_valid());
        assert_eq!(result.errors().len(), 1);
        assert_eq!(result.errors()[0].rule, SINK_EXISTS);
        assert!(result.errors()[0].message.contains("missing"));
    }

    #[test]
    fn job_steps_are_validated_in_order() {
        let steps = validate_job(&config(), "ab", &SettingsMap::new(), &RulePack::new()).unwrap();
        assert_eq!(steps.len(), 2);
        assert!(steps[0].result.is_valid());
        assert!(!steps[1].result.is_valid());

        let summary = ValidationSummary::from_results(steps.iter().map(|s| &s.result));
        assert_eq!(summary.total, 2);
        assert_eq!(summary.valid, 1);
        assert!(!summary.all_valid());

        assert!(validate_job(&config(), "nope", &SettingsMap::new(), &RulePack::new()).is_none());
        assert_eq!(
            validate_all_jobs(&config(), &SettingsMap::new(), &RulePack::new()).len(),
            2
        );
    }
}
