//! Process-wide adapter registry.
//!
//! Built once from [`BINDINGS`] at startup and read-only afterwards.

use crate::adapter::{Adapter, ToolAdapter};
use crate::bindings::{ToolBinding, BINDINGS};
use crate::error::OrchestratorError;
use lorch_state::Settings;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;

static GLOBAL: OnceLock<AdapterRegistry> = OnceLock::new();

/// Tool name → adapter.
pub struct AdapterRegistry {
    adapters: BTreeMap<String, Box<dyn ToolAdapter>>,
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.adapters.keys()).finish()
    }
}

impl AdapterRegistry {
    /// Builds one adapter per binding; cache documents live in `cache_dir`.
    pub fn from_bindings(bindings: &[ToolBinding], settings: &Settings, cache_dir: &Path) -> Self {
        Self::from_adapters(bindings.iter().map(|binding| {
            let resolved = binding.resolve(settings);
            let adapter = Adapter::new(
                (binding.parser)(),
                (binding.rules)(),
                (binding.builder)(resolved.invocation),
                resolved.native_path,
                cache_dir.join(format!("{}.json", binding.name)),
            );
            Box::new(adapter) as Box<dyn ToolAdapter>
        }))
    }

    /// Registry over every built-in tool.
    pub fn builtin(settings: &Settings, cache_dir: &Path) -> Self {
        Self::from_bindings(BINDINGS, settings, cache_dir)
    }

    pub fn from_adapters(adapters: impl IntoIterator<Item = Box<dyn ToolAdapter>>) -> Self {
        Self {
            adapters: adapters
                .into_iter()
                .map(|adapter| (adapter.name().to_string(), adapter))
                .collect(),
        }
    }

    /// Looks up `tool`, failing with `AdapterNotRegistered`.
    pub fn get(&self, tool: &str) -> Result<&dyn ToolAdapter, OrchestratorError> {
        self.adapters
            .get(tool)
            .map(|adapter| adapter.as_ref())
            .ok_or_else(|| OrchestratorError::AdapterNotRegistered {
                tool: tool.to_string(),
                known: self.names().collect::<Vec<_>>().join(", "),
            })
    }

    /// Registered tool names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.adapters.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn ToolAdapter> {
        self.adapters.values().map(|adapter| adapter.as_ref())
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

/// Installs the process-wide registry on first call; later calls return
/// the installed one and never run `build`.
pub fn init_global<F>(build: F) -> anyhow::Result<&'static AdapterRegistry>
where
    F: FnOnce() -> anyhow::Result<AdapterRegistry>,
{
    if let Some(registry) = GLOBAL.get() {
        return Ok(registry);
    }
    let registry = build()?;
    Ok(GLOBAL.get_or_init(|| registry))
}

/// The process-wide registry, if installed.
pub fn global() -> Option<&'static AdapterRegistry> {
    GLOBAL.get()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn builtin_registry_lists_every_binding() {
        let dir = tempdir().unwrap();
        let registry = AdapterRegistry::builtin(&Settings::rooted_at(dir.path()), dir.path());
        assert_eq!(
            registry.names().collect::<Vec<_>>(),
            ["canonizer", "indexer", "meltano"]
        );
        let meltano = registry.get("meltano").unwrap();
        assert_eq!(meltano.native_path(), dir.path().join("meltano.yml"));
        assert_eq!(meltano.cache_path(), dir.path().join("meltano.json"));
    }

    #[test]
    fn unknown_tool_is_not_registered() {
        let dir = tempdir().unwrap();
        let registry = AdapterRegistry::builtin(&Settings::rooted_at(dir.path()), dir.path());
        let err = registry.get("airflow").err().unwrap();
        assert!(matches!(err, OrchestratorError::AdapterNotRegistered { .. }));
        assert!(err.to_string().contains("canonizer, indexer, meltano"));
    }

    #[test]
    fn global_is_built_once() {
        let dir = tempdir().unwrap();
        let root = dir.path().to_path_buf();
        let first = init_global(|| Ok(AdapterRegistry::builtin(&Settings::rooted_at(&root), &root)))
            .unwrap();
        let second = init_global(|| anyhow::bail!("must not rebuild")).unwrap();
        assert!(std::ptr::eq(first, second));
        assert!(global().is_some());
    }
}
