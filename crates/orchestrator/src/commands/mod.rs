//! CLI command handlers for the lorch application.

mod config;
mod tools;

pub(crate) use config::{handle_config_show, handle_config_status, handle_config_sync};
pub(crate) use tools::{handle_tools_list, handle_tools_validate};

use crate::cli::OutputFormat;
use anyhow::Result;
use serde::Serialize;

/// Prints `value` as pretty JSON on stdout.
pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub(crate) fn is_json(format: OutputFormat) -> bool {
    format == OutputFormat::Json
}
