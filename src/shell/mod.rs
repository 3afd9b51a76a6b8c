//! External command execution.
//!
//! Every subprocess the render engine starts (`helm fetch`, `helm dependency
//! update`, `helmfile template`, the manifest validator) goes through the
//! [`ShellRunner`] trait. Production code injects [`ProcessRunner`]; tests
//! inject `test_utils::MockRunner`, which records commands and fakes their
//! filesystem side-effects.

pub mod command_builder;

pub use command_builder::{ShellCommand, ShellOutput};

use anyhow::{Context, Result};
use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;
use tokio::process::Command;
use tokio::time::timeout;

use crate::core::TerraError;

/// Runs a [`ShellCommand`] to completion.
///
/// Implementations must return an error (normally
/// [`TerraError::CommandFailed`]) when the command exits unsuccessfully.
pub trait ShellRunner: Send + Sync {
    /// Execute the command and return its captured output.
    fn run(&self, command: ShellCommand)
    -> Pin<Box<dyn Future<Output = Result<ShellOutput>> + Send + '_>>;

    /// Fail with [`TerraError::ToolNotFound`] unless `tool` can be run.
    fn check_tool(&self, tool: &str) -> Result<()> {
        require_tool(tool)
    }
}

/// [`ShellRunner`] backed by real processes via `tokio::process`.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    /// Create a new process runner.
    pub fn new() -> Self {
        Self
    }
}

impl ShellRunner for ProcessRunner {
    fn run(
        &self,
        command: ShellCommand,
    ) -> Pin<Box<dyn Future<Output = Result<ShellOutput>> + Send + '_>> {
        Box::pin(execute(command))
    }
}

async fn execute(command: ShellCommand) -> Result<ShellOutput> {
    let start = std::time::Instant::now();
    let cmd_display = command.display();
    let mut cmd = Command::new(command.program());
    cmd.args(command.arguments());

    if let Some(dir) = command.dir_path() {
        cmd.current_dir(dir);
    }

    match command.context() {
        Some(ctx) => tracing::debug!(target: "shell", "({}) Executing command: {}", ctx, cmd_display),
        None => tracing::debug!(target: "shell", "Executing command: {}", cmd_display),
    }

    for (key, value) in command.env_vars() {
        tracing::trace!(target: "shell", "Setting env var: {}={}", key, value);
        cmd.env(key, value);
    }

    if command.captures_output() {
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
    } else {
        cmd.stdout(Stdio::inherit());
        cmd.stderr(Stdio::inherit());
    }

    let output_future = cmd.output();
    let output = if let Some(duration) = command.timeout_duration() {
        match timeout(duration, output_future).await {
            Ok(result) => result.with_context(|| format!("Failed to execute {cmd_display}"))?,
            Err(_) => {
                tracing::warn!(
                    target: "shell",
                    "Command timed out after {} seconds: {}",
                    duration.as_secs(),
                    cmd_display
                );
                return Err(TerraError::CommandFailed {
                    command: cmd_display,
                    stderr: format!("timed out after {} seconds", duration.as_secs()),
                }
                .into());
            }
        }
    } else {
        output_future.await.with_context(|| format!("Failed to execute {cmd_display}"))?
    };

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    if !output.status.success() {
        tracing::debug!(
            target: "shell",
            "Command failed with exit code: {:?}",
            output.status.code()
        );
        let detail = if stderr.trim().is_empty() {
            stdout.trim().to_string()
        } else {
            stderr.trim().to_string()
        };
        return Err(TerraError::CommandFailed {
            command: cmd_display,
            stderr: detail,
        }
        .into());
    }

    if !stdout.is_empty() {
        tracing::debug!(target: "shell", "{}", stdout.trim());
    }
    if !stderr.is_empty() {
        tracing::debug!(target: "shell", "{}", stderr.trim());
    }

    let elapsed = start.elapsed();
    if elapsed.as_secs() > 1 {
        tracing::info!(target: "shell::perf", "{} took {:.2}s", cmd_display, elapsed.as_secs_f64());
    } else if elapsed.as_millis() > 100 {
        tracing::debug!(target: "shell::perf", "{} took {}ms", cmd_display, elapsed.as_millis());
    }

    Ok(ShellOutput {
        stdout,
        stderr,
    })
}

/// Fail with [`TerraError::ToolNotFound`] unless `tool` resolves on `PATH`.
pub fn require_tool(tool: &str) -> Result<()> {
    if which::which(tool).is_ok() {
        Ok(())
    } else {
        Err(TerraError::ToolNotFound {
            tool: tool.to_string(),
        }
        .into())
    }
}
