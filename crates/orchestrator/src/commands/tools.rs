use super::{is_json, print_json};
use crate::cli::{OutputFormat, ValidateArgs};
use crate::error::OrchestratorError;
use crate::gateway::ExecuteOptions;
use crate::registry::AdapterRegistry;
use anyhow::{bail, Result};
use lorch_sync::SettingsMap;
use lorch_validate::{parse_override, TaskSpec, ValidationResult, ValidationSummary};
use serde::Serialize;
use serde_json::json;

/// Handle `tools list`.
pub(crate) fn handle_tools_list(registry: &AdapterRegistry, format: OutputFormat) -> Result<()> {
    if is_json(format) {
        let tools: Vec<_> = registry
            .iter()
            .map(|adapter| {
                json!({
                    "name": adapter.name(),
                    "native": adapter.native_path(),
                    "cache": adapter.cache_path(),
                    "synced": adapter.record().is_some(),
                })
            })
            .collect();
        return print_json(&tools);
    }
    for name in registry.names() {
        println!("{name}");
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct TaskReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    job: Option<String>,
    task: TaskSpec,
    result: ValidationResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    command: Option<String>,
}

/// Handle `tools validate`.
///
/// Validates one `--source/--sink` task, the steps of `--job`, or every
/// declared job step. Fails (non-zero exit) when anything is invalid.
pub(crate) fn handle_tools_validate(registry: &AdapterRegistry, args: ValidateArgs) -> Result<()> {
    let adapter = registry.get(&args.tool)?;
    let overrides = parse_overrides(&args.overrides)?;

    let job = args.job.clone();
    let mut reports = match (args.source, args.sink) {
        (Some(source), Some(sink)) => {
            let task = TaskSpec::new(source, sink).with_overrides(overrides);
            let result = adapter.validate(&task)?;
            vec![TaskReport {
                job: None,
                task,
                result,
                command: None,
            }]
        }
        _ => adapter
            .validate_job(job.as_deref(), &overrides)?
            .into_iter()
            .map(|step| TaskReport {
                job: Some(step.job),
                task: TaskSpec::new(step.step.source, step.step.sink)
                    .with_overrides(overrides.clone()),
                result: step.result,
                command: None,
            })
            .collect(),
    };

    if args.show_command {
        for report in reports.iter_mut().filter(|r| r.result.is_valid()) {
            match adapter.execute(&report.task, &ExecuteOptions::dry_run()) {
                Ok(outcome) => report.command = Some(outcome.command().command_line()),
                Err(OrchestratorError::CommandBuild { detail, .. }) => {
                    report.command = Some(format!("<cannot build command: {detail}>"));
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    if let (Some(job), true) = (&job, reports.is_empty()) {
        bail!(
            "job '{job}' has no extractor/loader steps to validate for '{}'",
            adapter.name()
        );
    }

    if is_json(args.format) {
        print_json(&reports)?;
    } else if reports.is_empty() {
        println!("{}: no job steps declared", adapter.name());
    } else {
        for report in &reports {
            match &report.job {
                Some(job) => println!("{job}: {}: {}", report.task, report.result),
                None => println!("{}: {}", report.task, report.result),
            }
            if let Some(command) = &report.command {
                println!("  command: {command}");
            }
        }
    }

    let summary = ValidationSummary::from_results(reports.iter().map(|r| &r.result));
    if !summary.all_valid() {
        bail!(
            "validation failed: {} of {} task(s) invalid",
            summary.total - summary.valid,
            summary.total
        );
    }
    Ok(())
}

fn parse_overrides(raw: &[String]) -> Result<SettingsMap> {
    raw.iter().map(|text| parse_override(text)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn overrides_collect_into_settings() {
        let overrides =
            parse_overrides(&["a=1".to_string(), "b.c=x y".to_string(), "a=2".to_string()])
                .unwrap();
        assert_eq!(overrides.get("a"), Some(&json!(2)));
        assert_eq!(overrides.get("b.c"), Some(&json!("x y")));
        assert!(parse_overrides(&["broken".to_string()]).is_err());
    }
}
