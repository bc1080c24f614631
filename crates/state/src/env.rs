use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Returns the user's home directory.
pub fn home_dir() -> Result<PathBuf> {
    #[cfg(unix)]
    if let Ok(home) = std::env::var("HOME") {
        return Ok(PathBuf::from(home));
    }
    dirs::home_dir().ok_or_else(|| anyhow::anyhow!("home directory not found"))
}

/// Returns the orchestrator state root (`LORCH_HOME`, default `~/.lorch`).
pub fn lorch_home() -> Result<PathBuf> {
    if let Ok(custom) = std::env::var("LORCH_HOME") {
        return Ok(PathBuf::from(custom));
    }
    Ok(home_dir()?.join(".lorch"))
}

/// Returns the directory holding per-tool cache documents.
///
/// `LORCH_CACHE_DIR` wins; otherwise `$LORCH_HOME/cache`.
pub fn cache_dir() -> Result<PathBuf> {
    if let Ok(custom) = std::env::var("LORCH_CACHE_DIR") {
        return Ok(PathBuf::from(custom));
    }
    Ok(lorch_home()?.join("cache"))
}

/// Returns the base directory for relative paths in `lorch.toml`.
pub fn project_root() -> Result<PathBuf> {
    if let Ok(custom) = std::env::var("LORCH_PROJECT_ROOT") {
        return Ok(PathBuf::from(custom));
    }
    std::env::current_dir().context("could not determine current directory")
}

/// Returns the path to the orchestrator settings file.
pub fn config_file() -> Result<PathBuf> {
    if let Ok(custom) = std::env::var("LORCH_CONFIG") {
        return Ok(PathBuf::from(custom));
    }
    Ok(project_root()?.join("lorch.toml"))
}

/// Per-tool overrides from a `[tools.<name>]` table.
#[derive(Debug, Default, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ToolSettings {
    /// Path to the tool's native configuration document.
    #[serde(default)]
    pub native: Option<PathBuf>,
    /// Working directory for the tool's child process.
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
    /// Executable to invoke.
    #[serde(default)]
    pub binary: Option<String>,
    /// Extra environment variables passed to the child process.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

/// Settings parsed from `lorch.toml`.
#[derive(Debug, Default, Clone, Deserialize, PartialEq, Eq)]
pub struct Settings {
    /// Directory relative paths are resolved against. Not read from the file.
    #[serde(skip)]
    pub project_root: PathBuf,
    #[serde(default)]
    pub tools: BTreeMap<String, ToolSettings>,
}

impl Settings {
    /// Settings with no overrides, rooted at `project_root`.
    pub fn rooted_at(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            tools: BTreeMap::new(),
        }
    }

    /// Returns the overrides for `tool`, or empty defaults.
    pub fn tool(&self, tool: &str) -> ToolSettings {
        self.tools.get(tool).cloned().unwrap_or_default()
    }

    /// Resolves `path` against the project root unless it is already absolute.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_root.join(path)
        }
    }

    /// Parses settings from TOML text.
    pub fn from_toml(text: &str, project_root: impl Into<PathBuf>) -> Result<Self> {
        let mut settings: Settings = toml::from_str(text).context("invalid lorch settings")?;
        settings.project_root = project_root.into();
        Ok(settings)
    }
}

/// Loads settings from `config_file()`, falling back to defaults when absent.
pub fn load_settings() -> Result<Settings> {
    let root = project_root()?;
    let path = config_file()?;
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no settings file, using defaults");
        return Ok(Settings::rooted_at(root));
    }
    let text = fs::read_to_string(&path)
        .with_context(|| format!("failed to read settings file: {}", path.display()))?;
    Settings::from_toml(&text, root)
        .with_context(|| format!("failed to parse settings file: {}", path.display()))
}
