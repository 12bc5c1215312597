//! Hook execution for workflow stages.
//!
//! Hooks are user-configured shell commands that run at stage boundaries.
//! Commands run one at a time, in order, and the first failure stops the
//! list.
//!
//! # Variables
//!
//! Commands support `{var}` interpolation for `{current_version}`,
//! `{next_version}` and `{changelog_path}`. The same values are exported as
//! `UPSHIFT_CURRENT_VERSION` and `UPSHIFT_NEXT_VERSION`.

use std::collections::BTreeMap;
use std::process::Command;
use std::time::{Duration, Instant};

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;
use tracing::{debug, info, instrument};

/// Errors from hook execution.
#[derive(Error, Debug)]
pub enum HookError {
    /// A hook command exited with a non-zero status.
    #[error("hook command failed: {command}")]
    CommandFailed {
        /// The command that failed.
        command: String,
        /// The exit code, if available.
        exit_code: Option<i32>,
        /// Captured stderr.
        stderr: String,
    },

    /// Failed to spawn a hook command.
    #[error("failed to execute hook: {0}")]
    Exec(#[from] std::io::Error),
}

/// Result alias for hook operations.
pub type HookResult<T> = Result<T, HookError>;

/// Variables available for interpolation in hook commands.
///
/// Usually built by [`Context::hook_options`](crate::context::Context::hook_options).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HookVars {
    /// The version before this run (e.g., `v1.1.0`).
    pub current_version: String,
    /// The version being released (e.g., `v1.2.0`). Empty before calculation.
    pub next_version: String,
    /// Path to the changelog file.
    pub changelog_path: String,
}

/// How a list of hook commands should run.
#[derive(Debug, Clone, Default)]
pub struct HookOptions {
    /// Log commands instead of running them.
    pub dry_run: bool,
    /// Log command output at info level.
    pub debug: bool,
    /// Extra environment for every command.
    pub env: BTreeMap<String, String>,
    /// Interpolation values.
    pub vars: HookVars,
}

/// Result of running a single hook command.
#[derive(Debug, Clone)]
pub struct HookOutput {
    /// The command after interpolation.
    pub command: String,
    /// Captured stdout.
    pub stdout: String,
    /// Captured stderr.
    pub stderr: String,
    /// How long the command took to run.
    pub duration: Duration,
}

/// Runs hook commands.
pub trait HookExecutor {
    /// Run `commands` in order, returning the first failure.
    ///
    /// Under `dry_run` nothing is executed and the result is empty.
    fn execute(&self, commands: &[String], options: &HookOptions) -> HookResult<Vec<HookOutput>>;
}

/// [`HookExecutor`] that runs each command through `sh -c`.
#[derive(Debug, Clone)]
pub struct ShellExecutor {
    root: Utf8PathBuf,
}

impl ShellExecutor {
    /// Run commands with `root` as the working directory.
    pub fn new(root: impl AsRef<Utf8Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn run_single(&self, command: &str, options: &HookOptions) -> HookResult<HookOutput> {
        debug!(%command, "running hook");

        let start = Instant::now();
        let output = Command::new("sh")
            .args(["-c", command])
            .current_dir(self.root.as_std_path())
            .envs(&options.env)
            .env("UPSHIFT_CURRENT_VERSION", &options.vars.current_version)
            .env("UPSHIFT_NEXT_VERSION", &options.vars.next_version)
            .output()?;
        let duration = start.elapsed();

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if options.debug {
            info!(%command, stdout = %stdout.trim_end(), stderr = %stderr.trim_end(), "hook output");
        }

        if !output.status.success() {
            return Err(HookError::CommandFailed {
                command: command.to_string(),
                exit_code: output.status.code(),
                stderr: stderr.trim().to_string(),
            });
        }

        Ok(HookOutput {
            command: command.to_string(),
            stdout,
            stderr,
            duration,
        })
    }
}

impl HookExecutor for ShellExecutor {
    #[instrument(skip_all, fields(count = commands.len(), dry_run = options.dry_run))]
    fn execute(&self, commands: &[String], options: &HookOptions) -> HookResult<Vec<HookOutput>> {
        let mut results = Vec::with_capacity(commands.len());

        for command in commands {
            let interpolated = interpolate(command, &options.vars);
            if options.dry_run {
                info!(command = %interpolated, "dry run: would run hook");
                continue;
            }
            results.push(self.run_single(&interpolated, options)?);
        }

        Ok(results)
    }
}

/// Replace `{var}` placeholders with values from `vars`.
///
/// Unknown placeholders are left untouched.
pub fn interpolate(command: &str, vars: &HookVars) -> String {
    command
        .replace("{current_version}", &vars.current_version)
        .replace("{next_version}", &vars.next_version)
        .replace("{changelog_path}", &vars.changelog_path)
}
