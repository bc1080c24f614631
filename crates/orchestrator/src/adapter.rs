//! The per-tool adapter: {load, sync, validate, execute} over one tool.
//!
//! An [`Adapter`] is composed, not subclassed: it holds the tool's sync
//! engine (with its native parser), its rule pack, and its command builder.

use crate::bindings::CommandBuilder;
use crate::error::OrchestratorError;
use crate::gateway::{self, ExecuteOptions, ExecutionOutcome};
use lorch_sync::{
    CacheStatus, CanonicalConfig, ConfigSync, NativeParser, SettingsMap, SyncOutcome, SyncRecord,
};
use lorch_validate::{
    validate_all_jobs, validate_job, validate_task, RulePack, StepValidation, TaskSpec,
    ValidationResult,
};
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Capabilities every tool binding exposes.
pub trait ToolAdapter: Send + Sync {
    /// Tool identifier (e.g., "meltano").
    fn name(&self) -> &str;

    fn native_path(&self) -> &Path;

    fn cache_path(&self) -> &Path;

    /// Record of the config currently held in memory; `None` when unsynced.
    fn record(&self) -> Option<SyncRecord>;

    /// Re-reads the cache document into memory.
    ///
    /// Fails with `ConfigNotFound` when the tool was never synced.
    fn load_cached_config(&self) -> Result<Arc<CanonicalConfig>, OrchestratorError>;

    /// Syncs from the native document and replaces the in-memory config.
    fn sync(&self) -> Result<SyncOutcome, OrchestratorError>;

    /// Checks `task` against the in-memory config.
    fn validate(&self, task: &TaskSpec) -> Result<ValidationResult, OrchestratorError>;

    /// Validates every step of `job`, or of every job when `job` is `None`.
    fn validate_job(
        &self,
        job: Option<&str>,
        overrides: &SettingsMap,
    ) -> Result<Vec<StepValidation>, OrchestratorError>;

    /// Freshness of the cache relative to the native document.
    fn status(&self) -> Result<CacheStatus, OrchestratorError>;

    /// Validates `task` and, only if valid, runs (or plans) its command.
    fn execute(
        &self,
        task: &TaskSpec,
        options: &ExecuteOptions,
    ) -> Result<ExecutionOutcome, OrchestratorError>;
}

#[derive(Debug, Clone)]
struct Loaded {
    config: Arc<CanonicalConfig>,
    record: SyncRecord,
}

/// Composed adapter for one tool.
pub struct Adapter {
    name: String,
    sync: ConfigSync,
    rules: RulePack,
    builder: Box<dyn CommandBuilder>,
    state: RwLock<Option<Loaded>>,
}

impl std::fmt::Debug for Adapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Adapter")
            .field("name", &self.name)
            .field("sync", &self.sync)
            .field("rules", &self.rules)
            .field("synced", &self.state.read().is_some())
            .finish()
    }
}

impl Adapter {
    /// Builds the adapter and loads its cache, failing soft to unsynced.
    pub fn new(
        parser: Box<dyn NativeParser>,
        rules: RulePack,
        builder: Box<dyn CommandBuilder>,
        native_path: impl Into<PathBuf>,
        cache_path: impl Into<PathBuf>,
    ) -> Self {
        let name = parser.tool().to_string();
        let sync = ConfigSync::new(parser, native_path, cache_path);
        let state = match sync.load_cached() {
            Ok(Some(doc)) => {
                tracing::debug!(
                    tool = %name,
                    fingerprint = %doc.record.fingerprint,
                    "loaded cached config"
                );
                Some(Loaded {
                    config: Arc::new(doc.config),
                    record: doc.record,
                })
            }
            Ok(None) => {
                tracing::debug!(tool = %name, "no cached config; adapter is unsynced");
                None
            }
            Err(err) => {
                tracing::warn!(tool = %name, error = %err, "ignoring unusable cache document");
                None
            }
        };
        Self {
            name,
            sync,
            rules,
            builder,
            state: RwLock::new(state),
        }
    }

    pub fn rules(&self) -> &RulePack {
        &self.rules
    }

    /// Snapshot of the in-memory config; one snapshot serves a whole call.
    fn current(&self) -> Result<Arc<CanonicalConfig>, OrchestratorError> {
        self.state
            .read()
            .as_ref()
            .map(|l| Arc::clone(&l.config))
            .ok_or_else(|| OrchestratorError::ConfigNotFound {
                tool: self.name.clone(),
            })
    }
}

impl ToolAdapter for Adapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn native_path(&self) -> &Path {
        self.sync.native_path()
    }

    fn cache_path(&self) -> &Path {
        self.sync.cache_path()
    }

    fn record(&self) -> Option<SyncRecord> {
        self.state.read().as_ref().map(|l| l.record.clone())
    }

    fn load_cached_config(&self) -> Result<Arc<CanonicalConfig>, OrchestratorError> {
        let doc = self
            .sync
            .load_cached()?
            .ok_or_else(|| OrchestratorError::ConfigNotFound {
                tool: self.name.clone(),
            })?;
        let config = Arc::new(doc.config);
        *self.state.write() = Some(Loaded {
            config: Arc::clone(&config),
            record: doc.record,
        });
        Ok(config)
    }

    fn sync(&self) -> Result<SyncOutcome, OrchestratorError> {
        let outcome = self.sync.sync()?;
        *self.state.write() = Some(Loaded {
            config: Arc::new(outcome.config.clone()),
            record: outcome.record.clone(),
        });
        Ok(outcome)
    }

    fn validate(&self, task: &TaskSpec) -> Result<ValidationResult, OrchestratorError> {
        let config = self.current()?;
        let result = validate_task(&config, task, &self.rules);
        tracing::info!(
            tool = %self.name,
            task = %task,
            valid = result.is_valid(),
            errors = result.errors().len(),
            "validated task"
        );
        Ok(result)
    }

    fn validate_job(
        &self,
        job: Option<&str>,
        overrides: &SettingsMap,
    ) -> Result<Vec<StepValidation>, OrchestratorError> {
        let config = self.current()?;
        match job {
            Some(job) => validate_job(&config, job, overrides, &self.rules).ok_or_else(|| {
                OrchestratorError::JobNotFound {
                    tool: self.name.clone(),
                    job: job.to_string(),
                }
            }),
            None => Ok(validate_all_jobs(&config, overrides, &self.rules)),
        }
    }

    fn status(&self) -> Result<CacheStatus, OrchestratorError> {
        Ok(self.sync.status()?)
    }

    fn execute(
        &self,
        task: &TaskSpec,
        options: &ExecuteOptions,
    ) -> Result<ExecutionOutcome, OrchestratorError> {
        // Validation and command building see the same snapshot, even if a
        // sync replaces the in-memory config meanwhile.
        let config = self.current()?;
        let result = validate_task(&config, task, &self.rules);
        if !result.is_valid() {
            tracing::warn!(
                tool = %self.name,
                task = %task,
                errors = result.errors().len(),
                "refusing to execute invalid task"
            );
            return Err(OrchestratorError::ValidationFailed(result));
        }

        let spec = self
            .builder
            .build(&config, task)
            .map_err(|e| OrchestratorError::CommandBuild {
                tool: self.name.clone(),
                detail: format!("{e:#}"),
            })?;
        let spec = options.apply(spec);

        if options.dry_run {
            tracing::info!(tool = %self.name, command = %spec, "dry run; not spawning");
            return Ok(ExecutionOutcome::Planned(spec));
        }
        Ok(ExecutionOutcome::Completed(gateway::spawn(&spec)?))
    }
}
