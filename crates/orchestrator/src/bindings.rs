//! Tool bindings: the static list of supported tools and their command builders.

use crate::gateway::CommandSpec;
use anyhow::{anyhow, Result};
use lorch_state::{Settings, ToolSettings};
use lorch_sync::{
    setting_display, CanonicalConfig, CanonizerParser, IndexerParser, MeltanoParser, NativeParser,
};
use lorch_validate::{canonizer_rules, indexer_rules, meltano_rules, RulePack, TaskSpec};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[cfg(test)]
use mockall::automock;

/// Turns a validated task into a concrete process invocation.
#[cfg_attr(test, automock)]
pub trait CommandBuilder: Send + Sync {
    fn build(&self, config: &CanonicalConfig, task: &TaskSpec) -> Result<CommandSpec>;
}

/// Where and how a tool's executable runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub binary: String,
    pub working_dir: PathBuf,
    pub env: BTreeMap<String, String>,
}

impl Invocation {
    fn command(&self) -> CommandSpec {
        let mut spec = CommandSpec::new(&self.binary).cwd(&self.working_dir);
        spec.env = self.env.clone();
        spec
    }
}

/// One entry of the static tool list.
pub struct ToolBinding {
    pub name: &'static str,
    /// Native document, relative to the project root.
    pub default_native: &'static str,
    pub default_binary: &'static str,
    pub parser: fn() -> Box<dyn NativeParser>,
    pub rules: fn() -> RulePack,
    pub builder: fn(Invocation) -> Box<dyn CommandBuilder>,
}

impl std::fmt::Debug for ToolBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolBinding")
            .field("name", &self.name)
            .field("default_native", &self.default_native)
            .field("default_binary", &self.default_binary)
            .finish()
    }
}

/// Paths and invocation for one binding after applying `lorch.toml`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedBinding {
    pub native_path: PathBuf,
    pub invocation: Invocation,
}

impl ToolBinding {
    /// Applies the `[tools.<name>]` table; unset keys fall back to defaults.
    ///
    /// The working directory defaults to the native document's directory.
    pub fn resolve(&self, settings: &Settings) -> ResolvedBinding {
        let ToolSettings {
            native,
            working_dir,
            binary,
            env,
        } = settings.tool(self.name);
        let native_path =
            settings.resolve(native.as_deref().unwrap_or(Path::new(self.default_native)));
        let working_dir = match working_dir {
            Some(dir) => settings.resolve(&dir),
            None => native_path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| settings.project_root.clone()),
        };
        ResolvedBinding {
            native_path,
            invocation: Invocation {
                binary: binary.unwrap_or_else(|| self.default_binary.to_string()),
                working_dir,
                env,
            },
        }
    }
}

/// Every tool known to the registry.
pub static BINDINGS: &[ToolBinding] = &[
    ToolBinding {
        name: "meltano",
        default_native: "meltano.yml",
        default_binary: "meltano",
        parser: meltano_parser,
        rules: meltano_rules,
        builder: meltano_command,
    },
    ToolBinding {
        name: "canonizer",
        default_native: "canonizer.yml",
        default_binary: "can",
        parser: canonizer_parser,
        rules: canonizer_rules,
        builder: canonizer_command,
    },
    ToolBinding {
        name: "indexer",
        default_native: "indexer.yml",
        default_binary: "indexer",
        parser: indexer_parser,
        rules: indexer_rules,
        builder: indexer_command,
    },
];

fn meltano_parser() -> Box<dyn NativeParser> {
    Box::new(MeltanoParser::new())
}

fn canonizer_parser() -> Box<dyn NativeParser> {
    Box::new(CanonizerParser::new())
}

fn indexer_parser() -> Box<dyn NativeParser> {
    Box::new(IndexerParser::new())
}

fn meltano_command(invocation: Invocation) -> Box<dyn CommandBuilder> {
    Box::new(MeltanoCommand { invocation })
}

fn canonizer_command(invocation: Invocation) -> Box<dyn CommandBuilder> {
    Box::new(CanonizerCommand { invocation })
}

fn indexer_command(invocation: Invocation) -> Box<dyn CommandBuilder> {
    Box::new(IndexerCommand { invocation })
}

/// Environment variable name Meltano reads for a plugin setting.
///
/// `tap-gmail` + `messages.q` → `TAP_GMAIL_MESSAGES_Q`.
pub fn meltano_env_var(plugin: &str, setting: &str) -> String {
    format!("{plugin}_{setting}")
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// `meltano run <extractor> <loader>`; overrides travel as plugin env vars.
#[derive(Debug, Clone)]
pub struct MeltanoCommand {
    pub invocation: Invocation,
}

impl CommandBuilder for MeltanoCommand {
    fn build(&self, _config: &CanonicalConfig, task: &TaskSpec) -> Result<CommandSpec> {
        let mut spec = self
            .invocation
            .command()
            .args(["run", task.source(), task.sink()]);
        for (key, value) in task.overrides() {
            spec = spec.env(meltano_env_var(task.source(), key), setting_display(value));
        }
        Ok(spec)
    }
}

/// `can transform run --meta <meta> --input <input>`.
#[derive(Debug, Clone)]
pub struct CanonizerCommand {
    pub invocation: Invocation,
}

impl CommandBuilder for CanonizerCommand {
    fn build(&self, config: &CanonicalConfig, task: &TaskSpec) -> Result<CommandSpec> {
        let sink = config
            .sink(task.sink())
            .ok_or_else(|| anyhow!("unknown transform '{}'", task.sink()))?;
        let meta = required(sink.setting("meta"), "meta", sink.name.as_str())?;
        let settings = task.effective_source_settings(config.source(task.source()));
        let input = required(
            lorch_sync::lookup_setting(&settings, "input"),
            "input",
            task.source(),
        )?;
        Ok(self
            .invocation
            .command()
            .args(["transform", "run", "--meta"])
            .arg(meta)
            .arg("--input")
            .arg(input))
    }
}

/// `indexer build --input <path> --index <name> [--model ..] [--dimensions ..] [--text-field ..]`.
#[derive(Debug, Clone)]
pub struct IndexerCommand {
    pub invocation: Invocation,
}

impl CommandBuilder for IndexerCommand {
    fn build(&self, config: &CanonicalConfig, task: &TaskSpec) -> Result<CommandSpec> {
        let sink = config
            .sink(task.sink())
            .ok_or_else(|| anyhow!("unknown index '{}'", task.sink()))?;
        let settings = task.effective_source_settings(config.source(task.source()));
        let input = required(
            lorch_sync::lookup_setting(&settings, "path"),
            "path",
            task.source(),
        )?;

        let mut spec = self
            .invocation
            .command()
            .args(["build", "--input"])
            .arg(input)
            .args(["--index", sink.name.as_str()]);
        for (flag, key) in [
            ("--model", "model"),
            ("--dimensions", "dimensions"),
            ("--text-field", "text_field"),
        ] {
            if let Some(value) = sink.setting(key) {
                spec = spec.arg(flag).arg(setting_display(value));
            }
        }
        Ok(spec)
    }
}

fn required(value: Option<&Value>, key: &str, owner: &str) -> Result<String> {
    value
        .filter(|v| lorch_sync::setting_is_set(v))
        .map(setting_display)
        .ok_or_else(|| anyhow!("'{owner}' has no `{key}` setting"))
}
