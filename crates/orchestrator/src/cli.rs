use clap::{Args, Parser, Subcommand, ValueEnum};

/// Output format for command results.
#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// Pretty-printed JSON on stdout.
    Json,
}

/// Command-line interface for the `lorch` tool orchestrator.
#[derive(Debug, Parser)]
#[command(
    name = "lorch",
    version,
    about = "Sync, validate, and run data-pipeline tools through one gated interface"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available `lorch` commands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Inspects and refreshes cached tool configs.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Lists and validates registered tools.
    #[command(subcommand)]
    Tools(ToolsCommand),
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Prints the cached canonical config for a tool.
    Show {
        /// Tool name (see `lorch tools list`).
        tool: String,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Re-reads the native config and atomically replaces the cache.
    Sync {
        /// Tool name; all registered tools when omitted.
        tool: Option<String>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Reports whether the cache matches the native config.
    Status {
        /// Tool name; all registered tools when omitted.
        tool: Option<String>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

#[derive(Debug, Subcommand)]
pub enum ToolsCommand {
    /// Lists registered tools.
    List {
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Validates a task, a job, or every declared job step. Exits non-zero if invalid.
    Validate(ValidateArgs),
}

#[derive(Debug, Args)]
pub struct ValidateArgs {
    /// Tool name.
    pub tool: String,
    /// Action source (extractor, vault pattern, index input).
    #[arg(long, requires = "sink", conflicts_with = "job")]
    pub source: Option<String>,
    /// Action sink (loader, transform, index).
    #[arg(long, requires = "source", conflicts_with = "job")]
    pub sink: Option<String>,
    /// Validate every step of one declared job.
    #[arg(long)]
    pub job: Option<String>,
    /// Setting override applied on top of the source's settings (repeatable).
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub overrides: Vec<String>,
    /// Also print the command that would run (dry run; nothing is spawned).
    #[arg(long, default_value_t = false)]
    pub show_command: bool,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}
