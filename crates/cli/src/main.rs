//! Command-line interface for the `lorch` application.
//!
//! This crate serves as the main entry point for the executable, delegating
//! its core functionality to the `lorch-orchestrator` crate.

fn main() -> anyhow::Result<()> {
    lorch_orchestrator::run()
}
