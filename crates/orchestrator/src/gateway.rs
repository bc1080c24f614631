//! Execution gateway: runs a tool's native executable as a child process.
//!
//! Spawning is crate-private. The only caller is the adapter's gated
//! `execute`, after validation has passed for the same task.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Captured stderr longer than this is cut in error messages.
pub const STDERR_DISPLAY_LIMIT: usize = 500;

/// A concrete external process invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cwd: Option<PathBuf>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Program and arguments as a single shell-style line.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .map(quote)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn quote(word: &str) -> String {
    if !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=@%+,".contains(c))
    {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', r"'\''"))
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.command_line())
    }
}

/// Caller options for one execution.
#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    /// Validate and build the command, but do not spawn it.
    pub dry_run: bool,
    /// Extra environment for the child, on top of the binding's own.
    pub extra_env: BTreeMap<String, String>,
    /// Arguments appended after the built ones.
    pub extra_args: Vec<String>,
}

impl ExecuteOptions {
    pub fn dry_run() -> Self {
        Self {
            dry_run: true,
            ..Default::default()
        }
    }

    pub(crate) fn apply(&self, mut spec: CommandSpec) -> CommandSpec {
        spec.env.extend(self.extra_env.clone());
        spec.args.extend(self.extra_args.iter().cloned());
        spec
    }
}

/// Captured result of a child that exited successfully.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    pub command: CommandSpec,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
}

/// What a gated execution did.
#[derive(Debug, Clone)]
pub enum ExecutionOutcome {
    /// Dry run: validation passed and this command would have been spawned.
    Planned(CommandSpec),
    Completed(ExecutionResult),
}

impl ExecutionOutcome {
    pub fn command(&self) -> &CommandSpec {
        match self {
            Self::Planned(spec) => spec,
            Self::Completed(result) => &result.command,
        }
    }

    pub fn result(&self) -> Option<&ExecutionResult> {
        match self {
            Self::Planned(_) => None,
            Self::Completed(result) => Some(result),
        }
    }
}

/// The child could not be started or did not exit cleanly.
///
/// Never retried; the full streams stay on the value.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExecutionError {
    #[error("failed to start `{program}`: {source}")]
    SpawnFailed {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("`{command}` exited with {}: {}", exit_label(.exit_code), truncate(.stderr, STDERR_DISPLAY_LIMIT))]
    NonZeroExit {
        command: String,
        /// `None` when the child was killed by a signal.
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
        duration: Duration,
    },
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("code {code}"),
        None => "a signal".to_string(),
    }
}

/// Cuts `text` to at most `limit` characters, marking the cut.
fn truncate(text: &str, limit: usize) -> String {
    let text = text.trim_end();
    match text.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}... [truncated]", &text[..cut]),
        None => text.to_string(),
    }
}

/// Runs `spec` to completion, blocking the calling thread.
///
/// No timeout is applied; bound the whole process externally if needed.
pub(crate) fn spawn(spec: &CommandSpec) -> Result<ExecutionResult, ExecutionError> {
    let mut cmd = Command::new(&spec.program);
    cmd.args(&spec.args)
        .envs(&spec.env)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(dir) = &spec.cwd {
        cmd.current_dir(dir);
    }

    tracing::info!(command = %spec, cwd = ?spec.cwd, "spawning tool");
    let started = Instant::now();
    let output = cmd.output().map_err(|source| ExecutionError::SpawnFailed {
        program: spec.program.clone(),
        source,
    })?;
    let duration = started.elapsed();

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    let exit_code = output.status.code();
    tracing::info!(
        command = %spec,
        exit_code = ?exit_code,
        elapsed_ms = duration.as_millis() as u64,
        "tool exited"
    );

    match exit_code {
        Some(code) if output.status.success() => Ok(ExecutionResult {
            command: spec.clone(),
            exit_code: code,
            stdout,
            stderr,
            duration,
        }),
        _ => Err(ExecutionError::NonZeroExit {
            command: spec.command_line(),
            exit_code,
            stdout,
            stderr,
            duration,
        }),
    }
}
