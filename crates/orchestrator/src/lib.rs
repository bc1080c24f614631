//! Adapter orchestration for the `lorch` application.
//!
//! Each supported data tool is reached through one [`ToolAdapter`]: its
//! native config is synced into a cached canonical model, tasks are
//! validated against that model, and only validated tasks are handed to
//! the execution gateway. Adapters are registered once per process in the
//! [`AdapterRegistry`].
//!
//! The main entry point is [`run`], which parses the command line and
//! dispatches to the command handlers.

#![deny(unsafe_code)]

pub mod adapter;
pub mod bindings;
pub mod cli;
mod commands;
pub mod error;
pub mod gateway;
pub mod registry;

pub use adapter::{Adapter, ToolAdapter};
pub use bindings::{
    meltano_env_var, CanonizerCommand, CommandBuilder, IndexerCommand, Invocation,
    MeltanoCommand, ResolvedBinding, ToolBinding, BINDINGS,
};
pub use error::OrchestratorError;
pub use gateway::{
    CommandSpec, ExecuteOptions, ExecutionError, ExecutionOutcome, ExecutionResult,
    STDERR_DISPLAY_LIMIT,
};
pub use registry::AdapterRegistry;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands, ConfigCommand, ToolsCommand};

/// The main entry point for the `lorch` application.
pub fn run() -> Result<()> {
    // Logs go to stderr so `--format json` output stays parseable.
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let registry = registry::init_global(|| {
        let settings = lorch_state::load_settings()?;
        let cache_dir = lorch_state::cache_dir()?;
        tracing::debug!(
            project_root = %settings.project_root.display(),
            cache_dir = %cache_dir.display(),
            "building adapter registry"
        );
        Ok(AdapterRegistry::builtin(&settings, &cache_dir))
    })?;

    match cli.command {
        Commands::Config(ConfigCommand::Show { tool, format }) => {
            commands::handle_config_show(registry, &tool, format)
        }
        Commands::Config(ConfigCommand::Sync { tool, format }) => {
            commands::handle_config_sync(registry, tool.as_deref(), format)
        }
        Commands::Config(ConfigCommand::Status { tool, format }) => {
            commands::handle_config_status(registry, tool.as_deref(), format)
        }
        Commands::Tools(ToolsCommand::List { format }) => {
            commands::handle_tools_list(registry, format)
        }
        Commands::Tools(ToolsCommand::Validate(args)) => {
            commands::handle_tools_validate(registry, args)
        }
    }
}
