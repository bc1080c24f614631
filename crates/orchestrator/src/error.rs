//! Error taxonomy for adapter lookup, gated execution, and sync.

use crate::gateway::ExecutionError;
use lorch_sync::SyncError;
use lorch_validate::ValidationResult;
use thiserror::Error;

/// Failures surfaced by adapters and the registry.
///
/// Validation problems are a value ([`ValidationResult`]); this type only
/// carries one when [`execute`](crate::ToolAdapter::execute) refuses to run.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum OrchestratorError {
    #[error("no adapter registered for tool '{tool}' (known tools: {known})")]
    AdapterNotRegistered { tool: String, known: String },

    #[error("no synced config for '{tool}'; run `lorch config sync {tool}` first")]
    ConfigNotFound { tool: String },

    #[error("job '{job}' is not declared in the synced config for '{tool}'")]
    JobNotFound { tool: String, job: String },

    #[error(transparent)]
    Sync(#[from] SyncError),

    /// The gate refused to execute; nothing was spawned.
    #[error("task failed validation: {0}")]
    ValidationFailed(ValidationResult),

    #[error("cannot build '{tool}' command: {detail}")]
    CommandBuild { tool: String, detail: String },

    #[error(transparent)]
    Execution(#[from] ExecutionError),
}

impl OrchestratorError {
    /// The validation result carried by a gated execution, if any.
    pub fn validation(&self) -> Option<&ValidationResult> {
        match self {
            Self::ValidationFailed(result) => Some(result),
            _ => None,
        }
    }
}
