//! Parser for Meltano project files (`meltano.yml`).
//!
//! Extractors become action sources, loaders become action sinks, and each
//! `jobs[].tasks[]` entry contributes one extractor→loader step.

use super::traits::NativeParser;
use super::utils::{insert_unique, merge_settings, parse_yaml};
use crate::common::{ActionSpec, CanonicalConfig, JobStep, SelectionRules, SettingsMap};
use crate::Result;
use anyhow::{anyhow, bail};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};

/// Inheritance chains longer than this are treated as cycles.
const MAX_INHERIT_DEPTH: usize = 16;

#[derive(Debug, Deserialize)]
struct MeltanoProject {
    plugins: Option<MeltanoPlugins>,
    #[serde(default)]
    jobs: Vec<MeltanoJob>,
}

#[derive(Debug, Default, Deserialize)]
struct MeltanoPlugins {
    #[serde(default)]
    extractors: Vec<MeltanoPlugin>,
    #[serde(default)]
    loaders: Vec<MeltanoPlugin>,
}

#[derive(Debug, Clone, Deserialize)]
struct MeltanoPlugin {
    name: String,
    #[serde(default)]
    inherit_from: Option<String>,
    #[serde(default)]
    config: Option<SettingsMap>,
    #[serde(default)]
    select: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct MeltanoJob {
    name: String,
    #[serde(default)]
    tasks: Vec<TaskEntry>,
}

/// A task is either `"tap target"` or a list of block names.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TaskEntry {
    Line(String),
    Blocks(Vec<String>),
}

impl TaskEntry {
    fn tokens(&self) -> Vec<&str> {
        match self {
            Self::Line(line) => line.split_whitespace().collect(),
            Self::Blocks(blocks) => blocks.iter().flat_map(|b| b.split_whitespace()).collect(),
        }
    }

    fn describe(&self) -> String {
        self.tokens().join(" ")
    }
}

/// Parser for the ELT runner's `meltano.yml`.
#[derive(Debug, Default, Clone, Copy)]
pub struct MeltanoParser;

impl MeltanoParser {
    pub fn new() -> Self {
        Self
    }
}

impl NativeParser for MeltanoParser {
    fn tool(&self) -> &str {
        "meltano"
    }

    fn parse(&self, document: &str) -> Result<CanonicalConfig> {
        let project: MeltanoProject = parse_yaml(document)?;
        let plugins = project
            .plugins
            .ok_or_else(|| anyhow!("missing `plugins` section"))?;

        let mut config = CanonicalConfig::default();
        for spec in resolve_plugins(&plugins.extractors, "extractor")? {
            insert_unique(&mut config.sources, spec, "extractor")?;
        }
        for spec in resolve_plugins(&plugins.loaders, "loader")? {
            insert_unique(&mut config.sinks, spec, "loader")?;
        }

        for job in project.jobs {
            let mut steps = Vec::new();
            for task in &job.tasks {
                match pair_from_tokens(&task.tokens()) {
                    Some(step) => steps.push(step),
                    None => tracing::debug!(
                        job = %job.name,
                        task = %task.describe(),
                        "task is a single block, skipping"
                    ),
                }
            }
            if config.jobs.insert(job.name.clone(), steps).is_some() {
                bail!("duplicate job '{}'", job.name);
            }
        }

        Ok(config)
    }
}

/// `<extractor> <loader> [blocks..]`; names are kept even when undeclared
/// so validation can report them.
fn pair_from_tokens(tokens: &[&str]) -> Option<JobStep> {
    match tokens {
        [source, sink, ..] => Some(JobStep::new(*source, *sink)),
        _ => None,
    }
}

/// Applies `inherit_from` within one plugin type and builds action specs.
///
/// Parents not declared in the same list (hub plugins) contribute nothing.
fn resolve_plugins(plugins: &[MeltanoPlugin], kind: &str) -> Result<Vec<ActionSpec>> {
    let by_name: HashMap<&str, &MeltanoPlugin> =
        plugins.iter().map(|p| (p.name.as_str(), p)).collect();

    plugins
        .iter()
        .map(|plugin| {
            let mut chain = vec![plugin];
            let mut cursor = plugin;
            while let Some(parent) = cursor
                .inherit_from
                .as_deref()
                .and_then(|name| by_name.get(name).copied())
            {
                if chain.len() > MAX_INHERIT_DEPTH || chain.iter().any(|p| p.name == parent.name)
                {
                    bail!("{kind} '{}' has a cyclic inherit_from chain", plugin.name);
                }
                chain.push(parent);
                cursor = parent;
            }

            let mut settings = BTreeMap::new();
            let mut select: Option<&Vec<String>> = None;
            for link in chain.iter().rev() {
                if let Some(cfg) = &link.config {
                    settings = merge_settings(&settings, cfg);
                }
                if let Some(own) = link.select.as_ref().filter(|s| !s.is_empty()) {
                    select = Some(own);
                }
            }

            Ok(ActionSpec {
                name: plugin.name.clone(),
                settings,
                selection: select
                    .map(SelectionRules::from_patterns)
                    .unwrap_or_default(),
            })
        })
        .collect()
}
