//! Command execution through the resolved environment

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;

use crate::environment::ExecutionContext;
use crate::error::ExecutionFailure;

/// Raw result of one external invocation
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
    pub exit_code: i32,
}

/// Executes a fully-built argv under an [`ExecutionContext`].
///
/// Invocations are strictly sequential: each call is awaited to completion
/// before the caller issues the next one. brew is not safe for concurrent
/// mutating invocations against the same package database.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `argv` under `ctx`. `combine` folds stderr into the returned
    /// stdout; `fail_on_failure` turns a non-zero exit into an
    /// [`ExecutionFailure`] carrying the tool output verbatim.
    async fn run(
        &self,
        argv: &[String],
        ctx: &ExecutionContext,
        combine: bool,
        fail_on_failure: bool,
    ) -> Result<CommandOutput, ExecutionFailure>;
}

/// Runner backed by real subprocesses
pub struct SystemCommandRunner;

impl Default for SystemCommandRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemCommandRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for SystemCommandRunner {
    async fn run(
        &self,
        argv: &[String],
        ctx: &ExecutionContext,
        combine: bool,
        fail_on_failure: bool,
    ) -> Result<CommandOutput, ExecutionFailure> {
        let full: Vec<String> = ctx
            .command_prefix
            .iter()
            .chain(argv.iter())
            .cloned()
            .collect();
        let command_line = full.join(" ");
        let (program, args) = full.split_first().ok_or_else(|| ExecutionFailure::Spawn {
            command: String::new(),
            error: "empty argv".to_string(),
        })?;

        let mut command = Command::new(program);
        command.args(args);
        // brew is sensitive to HOME for its cache and config location, so
        // the owner's home always wins over the caller's.
        command.env("HOME", &ctx.home);
        for (key, value) in &ctx.extra_env {
            command.env(key, value);
        }
        #[cfg(unix)]
        if let Some(user) = ctx.working_user {
            command.uid(user.uid);
            command.gid(user.gid);
        }

        let output = command
            .output()
            .await
            .map_err(|e| ExecutionFailure::Spawn {
                command: command_line.clone(),
                error: e.to_string(),
            })?;

        let mut stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        if combine {
            stdout.push_str(&stderr);
        }
        let exit_code = output.status.code().unwrap_or(-1);

        if fail_on_failure && !output.status.success() {
            let mut diagnostic = String::from_utf8_lossy(&output.stdout).to_string();
            diagnostic.push_str(&stderr);
            return Err(ExecutionFailure::NonZeroExit {
                command: command_line,
                code: exit_code,
                output: diagnostic,
            });
        }

        Ok(CommandOutput { stdout, exit_code })
    }
}

/// Path of the brew binary, honoring the `HOMEBREW_PROVIDER_COMMAND`
/// override for non-standard install locations.
pub fn brew_command() -> PathBuf {
    std::env::var_os("HOMEBREW_PROVIDER_COMMAND")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("brew"))
}

/// Build an argv for one brew subcommand invocation.
pub fn brew_argv(brew: &Path, args: &[&str]) -> Vec<String> {
    std::iter::once(brew.display().to_string())
        .chain(args.iter().map(|s| s.to_string()))
        .collect()
}
