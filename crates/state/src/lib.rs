//! Manages orchestrator state and configuration.
//!
//! This crate provides utilities for:
//! - Resolving the state, cache, and project directories from environment variables.
//! - Loading per-tool settings from `lorch.toml`.
//! - Writing files atomically so readers never observe a partial document.

pub mod env;
pub mod persistence;

pub use env::{
    cache_dir, config_file, home_dir, load_settings, lorch_home, project_root, Settings,
    ToolSettings,
};
pub use persistence::{read_optional, write_atomic};
