//! Shared test utilities for lorch crates.
//!
//! This crate provides common test fixtures and utilities used across
//! multiple crates in the lorch workspace.

use std::path::{Path, PathBuf};
use std::sync::{LazyLock, Mutex, MutexGuard};

/// Serialize tests that mutate process-global state (env vars, cwd, etc).
///
/// Acquire this guard at the start of any test that modifies environment
/// variables to prevent race conditions between parallel tests.
pub fn env_guard() -> MutexGuard<'static, ()> {
    static TEST_SERIAL: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));
    TEST_SERIAL.lock().unwrap_or_else(|e| e.into_inner())
}

/// RAII guard for environment variables - restores original value on drop.
pub struct EnvVarGuard {
    key: &'static str,
    previous: Option<String>,
}

impl Drop for EnvVarGuard {
    fn drop(&mut self) {
        if let Some(v) = &self.previous {
            std::env::set_var(self.key, v);
        } else {
            std::env::remove_var(self.key);
        }
    }
}

/// Set an environment variable and return a guard that restores the original on drop.
///
/// # Example
/// ```
/// let _guard = lorch_test_utils::set_env_var("MY_VAR", Some("value"));
/// // MY_VAR is set to "value"
/// // When _guard drops, MY_VAR is restored to its original value
/// ```
pub fn set_env_var(key: &'static str, value: Option<&str>) -> EnvVarGuard {
    let previous = std::env::var(key).ok();
    if let Some(val) = value {
        std::env::set_var(key, val);
    } else {
        std::env::remove_var(key);
    }
    EnvVarGuard { key, previous }
}

/// A Meltano project whose Gmail extractor filters on `message_list`
/// while the selection rules drop that stream entirely.
pub const GMAIL_CONFLICT_MELTANO_YML: &str = r#"version: 1
project_id: lorch-test
plugins:
  extractors:
    - name: tap-gmail
      variant: hotgluexyz
      config:
        user_id: me
        messages.q: "after:2024/01/01"
      select:
        - messages.*
        - "!message_list.*.*"
  loaders:
    - name: target-jsonl
      config:
        destination_path: output
jobs:
  - name: gmail-to-jsonl
    tasks:
      - tap-gmail target-jsonl
"#;

/// The same project with the exclusion removed.
pub const GMAIL_OK_MELTANO_YML: &str = r#"version: 1
project_id: lorch-test
plugins:
  extractors:
    - name: tap-gmail
      variant: hotgluexyz
      config:
        user_id: me
        messages.q: "after:2024/01/01"
      select:
        - messages.*
  loaders:
    - name: target-jsonl
      config:
        destination_path: output
jobs:
  - name: gmail-to-jsonl
    tasks:
      - tap-gmail target-jsonl
"#;

/// Standard test fixture: a temp project directory plus a separate cache directory.
///
/// The tempdir is automatically cleaned up when this struct is dropped.
pub struct TestFixture {
    pub tempdir: tempfile::TempDir,
    /// Directory native documents are written to.
    pub project: PathBuf,
    /// Directory cache documents are written to.
    pub cache: PathBuf,
}

impl TestFixture {
    /// Create a new fixture with `project/` and `cache/` under a tempdir.
    ///
    /// Does NOT set any env var - use `env_guards()` for that.
    pub fn new() -> std::io::Result<Self> {
        let tempdir = tempfile::tempdir()?;
        let project = tempdir.path().join("project");
        let cache = tempdir.path().join("cache");
        std::fs::create_dir_all(&project)?;
        std::fs::create_dir_all(&cache)?;
        Ok(Self {
            tempdir,
            project,
            cache,
        })
    }

    /// Write a native document relative to the project directory.
    pub fn write_native(&self, relative: &str, content: &str) -> std::io::Result<PathBuf> {
        let path = self.project.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, content)?;
        Ok(path)
    }

    /// Path of the cache document for `tool`.
    pub fn cache_file(&self, tool: &str) -> PathBuf {
        self.cache.join(format!("{tool}.json"))
    }

    /// Point `LORCH_PROJECT_ROOT`, `LORCH_CACHE_DIR`, and `LORCH_CONFIG` at this fixture.
    ///
    /// Hold the returned guards for the duration of the test, together with
    /// [`env_guard`].
    pub fn env_guards(&self) -> Vec<EnvVarGuard> {
        vec![
            set_env_var("LORCH_PROJECT_ROOT", path_str(&self.project)),
            set_env_var("LORCH_CACHE_DIR", path_str(&self.cache)),
            set_env_var("LORCH_CONFIG", path_str(&self.project.join("lorch.toml"))),
        ]
    }
}

fn path_str(path: &Path) -> Option<&str> {
    path.to_str()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_env_var_sets_and_restores() {
        let _g = env_guard();

        const KEY: &str = "LORCH_TEST_UTILS_TEST_VAR";
        std::env::remove_var(KEY);

        {
            let _guard = set_env_var(KEY, Some("test_value"));
            assert_eq!(std::env::var(KEY).ok(), Some("test_value".to_string()));
        }
        assert!(std::env::var(KEY).is_err());
    }

    #[test]
    fn test_set_env_var_removes_when_none() {
        let _g = env_guard();

        const KEY: &str = "LORCH_TEST_REMOVE_VAR";
        std::env::set_var(KEY, "exists");

        {
            let _guard = set_env_var(KEY, None);
            assert!(std::env::var(KEY).is_err());
        }
        assert_eq!(std::env::var(KEY).ok(), Some("exists".to_string()));

        std::env::remove_var(KEY);
    }

    #[test]
    fn test_fixture_layout() {
        let fixture = TestFixture::new().expect("fixture creation");
        assert!(fixture.project.is_dir());
        assert!(fixture.cache.is_dir());
        assert_eq!(fixture.cache_file("meltano"), fixture.cache.join("meltano.json"));

        let path = fixture
            .write_native("elt/meltano.yml", GMAIL_OK_MELTANO_YML)
            .expect("write native");
        assert_eq!(path, fixture.project.join("elt/meltano.yml"));
        assert!(std::fs::read_to_string(path).unwrap().contains("tap-gmail"));
    }

    #[test]
    fn test_fixture_env_guards() {
        let _g = env_guard();
        let fixture = TestFixture::new().expect("fixture creation");
        {
            let _env = fixture.env_guards();
            assert_eq!(
                std::env::var("LORCH_CACHE_DIR").unwrap(),
                fixture.cache.to_str().unwrap()
            );
        }
    }
}
