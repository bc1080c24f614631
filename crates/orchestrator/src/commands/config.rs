use super::{is_json, print_json};
use crate::adapter::ToolAdapter;
use crate::cli::OutputFormat;
use crate::error::OrchestratorError;
use crate::registry::AdapterRegistry;
use anyhow::{bail, Result};
use lorch_sync::{setting_display, ActionSpec, CanonicalConfig, SyncError, SyncReport};
use serde::Serialize;
use serde_json::json;
use std::fmt::Write as _;

/// Handle `config show <tool>`.
pub(crate) fn handle_config_show(
    registry: &AdapterRegistry,
    tool: &str,
    format: OutputFormat,
) -> Result<()> {
    let adapter = registry.get(tool)?;
    let config = adapter.load_cached_config()?;
    if is_json(format) {
        return print_json(&json!({
            "tool": adapter.name(),
            "record": adapter.record(),
            "config": config.as_ref(),
        }));
    }
    print!("{}", render_config(adapter, &config));
    Ok(())
}

fn render_config(adapter: &dyn ToolAdapter, config: &CanonicalConfig) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", adapter.name());
    if let Some(record) = adapter.record() {
        let _ = writeln!(out, "  native:      {}", record.source_path.display());
        let _ = writeln!(out, "  fingerprint: {}", record.fingerprint);
    }
    render_actions(&mut out, "sources", config.sources.values());
    render_actions(&mut out, "sinks", config.sinks.values());
    let _ = writeln!(out, "jobs:");
    for (job, steps) in config.jobs() {
        let pairs: Vec<String> = steps
            .iter()
            .map(|s| format!("{} -> {}", s.source, s.sink))
            .collect();
        let _ = writeln!(out, "  {job}: {}", pairs.join(", "));
    }
    out
}

fn render_actions<'a>(
    out: &mut String,
    title: &str,
    actions: impl Iterator<Item = &'a ActionSpec>,
) {
    let _ = writeln!(out, "{title}:");
    for action in actions {
        let _ = writeln!(out, "  {}", action.name);
        for (key, value) in &action.settings {
            let _ = writeln!(out, "    {key} = {}", setting_display(value));
        }
        if !action.selection.is_empty() {
            let rules: Vec<String> = action.selection.iter().map(|r| r.to_string()).collect();
            let _ = writeln!(out, "    select: {}", rules.join(", "));
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
enum SyncLine {
    Synced(SyncReport),
    Skipped { tool: String, reason: String },
    Failed { tool: String, error: String },
}

/// Handle `config sync [tool]`.
///
/// With no tool, every registered tool is synced; tools without a native
/// document are skipped rather than failed.
pub(crate) fn handle_config_sync(
    registry: &AdapterRegistry,
    tool: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let adapters: Vec<&dyn ToolAdapter> = match tool {
        Some(tool) => vec![registry.get(tool)?],
        None => registry.iter().collect(),
    };
    let sync_all = tool.is_none();

    let mut lines = Vec::new();
    for adapter in adapters {
        let line = match adapter.sync() {
            Ok(outcome) => SyncLine::Synced(SyncReport::new(
                adapter.name(),
                outcome.change,
                outcome.record,
                &outcome.config,
            )),
            Err(OrchestratorError::Sync(SyncError::NativeNotFound { path, .. })) if sync_all => {
                SyncLine::Skipped {
                    tool: adapter.name().to_string(),
                    reason: format!("no native config at {}", path.display()),
                }
            }
            Err(err) if sync_all => SyncLine::Failed {
                tool: adapter.name().to_string(),
                error: err.to_string(),
            },
            Err(err) => return Err(err.into()),
        };
        lines.push(line);
    }

    if is_json(format) {
        print_json(&lines)?;
    } else {
        for line in &lines {
            match line {
                SyncLine::Synced(report) => println!("{report}"),
                SyncLine::Skipped { tool, reason } => println!("{tool}: skipped ({reason})"),
                SyncLine::Failed { tool, error } => println!("{tool}: failed: {error}"),
            }
        }
    }

    let failed = lines
        .iter()
        .filter(|l| matches!(l, SyncLine::Failed { .. }))
        .count();
    if failed > 0 {
        bail!("{failed} tool(s) failed to sync");
    }
    Ok(())
}

/// Handle `config status [tool]`.
pub(crate) fn handle_config_status(
    registry: &AdapterRegistry,
    tool: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let adapters: Vec<&dyn ToolAdapter> = match tool {
        Some(tool) => vec![registry.get(tool)?],
        None => registry.iter().collect(),
    };

    let mut statuses = Vec::new();
    for adapter in adapters {
        statuses.push((adapter.name().to_string(), adapter.status()?));
    }

    if is_json(format) {
        let entries: Vec<_> = statuses
            .iter()
            .map(|(tool, status)| json!({ "tool": tool, "cache": status }))
            .collect();
        return print_json(&entries);
    }
    for (tool, status) in &statuses {
        println!("{tool}: {}", status.label());
    }
    Ok(())
}
