//! External process execution for git and manifest build steps.
//!
//! Every command runs to completion on the calling thread with stdout and
//! stderr captured. Callers are worker threads, never the coordinating
//! thread, so blocking here is expected. Exit status and output are logged at
//! debug level for diagnosis.

use std::ffi::OsStr;
use std::path::Path;
use std::process::{Command, Output, Stdio};
use std::sync::Arc;

use tracing::debug;

use crate::error::PluginError;

/// Tracing target for process operations.
const PROCESS_TARGET: &str = "hyprload_plugins::process";

/// Shell used to run manifest build steps.
const SHELL: &str = "sh";

/// Captured result of a finished command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    status: Option<i32>,
    stdout: String,
    stderr: String,
}

impl CommandOutput {
    fn from_output(output: &Output) -> Self {
        Self {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }

    /// Returns `true` when the command exited with status zero.
    #[must_use]
    pub const fn success(&self) -> bool {
        matches!(self.status, Some(0))
    }

    /// Exit status, or `-1` when the process was killed by a signal.
    #[must_use]
    pub fn status(&self) -> i32 {
        self.status.unwrap_or(-1)
    }

    /// Captured standard output.
    #[must_use]
    pub fn stdout(&self) -> &str {
        &self.stdout
    }

    /// Stdout followed by stderr, trimmed, for error reports.
    #[must_use]
    pub fn combined(&self) -> String {
        let mut text = self.stdout.trim_end().to_owned();
        let stderr = self.stderr.trim_end();
        if !stderr.is_empty() {
            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str(stderr);
        }
        text
    }
}

/// Runs `script` with `sh -c` inside `dir`, adding `env` to the environment.
///
/// # Errors
///
/// Returns [`PluginError::Spawn`] if the shell cannot be started. A non-zero
/// exit is not an error here; inspect [`CommandOutput::success`].
pub fn run_shell<K, V>(script: &str, dir: &Path, env: &[(K, V)]) -> Result<CommandOutput, PluginError>
where
    K: AsRef<OsStr>,
    V: AsRef<OsStr>,
{
    let mut command = Command::new(SHELL);
    command.arg("-c").arg(script).current_dir(dir);
    for (key, value) in env {
        command.env(key, value);
    }
    run(SHELL, &mut command, script)
}

/// Runs `git` with `args`, optionally inside `dir`.
///
/// Interactive credential prompts are disabled so an unreachable remote fails
/// instead of blocking the worker.
///
/// # Errors
///
/// Returns [`PluginError::Spawn`] if git cannot be started.
pub fn run_git<I, S>(dir: Option<&Path>, args: I) -> Result<CommandOutput, PluginError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut command = Command::new("git");
    if let Some(dir) = dir {
        command.arg("-C").arg(dir);
    }
    command.args(args).env("GIT_TERMINAL_PROMPT", "0");
    let description = format!("{command:?}");
    run("git", &mut command, &description)
}

fn run(program: &str, command: &mut Command, description: &str) -> Result<CommandOutput, PluginError> {
    command.stdin(Stdio::null());
    debug!(target: PROCESS_TARGET, program, command = description, "running command");

    let output = command.output().map_err(|source| PluginError::Spawn {
        program: program.to_owned(),
        source: Arc::new(source),
    })?;
    let captured = CommandOutput::from_output(&output);

    debug!(
        target: PROCESS_TARGET,
        program,
        status = captured.status(),
        output = %captured.combined(),
        "command finished"
    );
    Ok(captured)
}
