//! Recording [`ShellRunner`] for tests.

use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Result;

use crate::core::TerraError;
use crate::shell::{ShellCommand, ShellOutput, ShellRunner};

type Handler = Box<dyn Fn(&ShellCommand) -> Result<ShellOutput> + Send + Sync>;

/// A [`ShellRunner`] that records every command and answers through a handler.
///
/// The handler runs synchronously and may touch the filesystem, e.g.
/// [`fake_helm_fetch`](super::fake_helm_fetch) unpacks a fake chart where
/// `helm fetch -d` would.
pub struct MockRunner {
    commands: Mutex<Vec<ShellCommand>>,
    handler: Handler,
    delay: Option<Duration>,
    missing_tools: Vec<String>,
}

impl Default for MockRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRunner {
    /// A runner where every command succeeds with empty output.
    pub fn new() -> Self {
        Self::with_handler(|_| Ok(ShellOutput::default()))
    }

    /// A runner answering through `handler`.
    pub fn with_handler<F>(handler: F) -> Self
    where
        F: Fn(&ShellCommand) -> Result<ShellOutput> + Send + Sync + 'static,
    {
        Self {
            commands: Mutex::new(Vec::new()),
            handler: Box::new(handler),
            delay: None,
            missing_tools: Vec::new(),
        }
    }

    /// A runner where every command fails with `stderr`.
    pub fn failing(stderr: &str) -> Self {
        let stderr = stderr.to_string();
        Self::with_handler(move |cmd| Err(command_failed(cmd, &stderr)))
    }

    /// Commands whose command line starts with `prefix` fail with `stderr`;
    /// everything else behaves like [`fake_helm_fetch`](super::fake_helm_fetch)
    /// and [`fake_helmfile_template`](super::fake_helmfile_template).
    pub fn failing_matching(prefix: &str, stderr: &str) -> Self {
        let prefix = prefix.to_string();
        let stderr = stderr.to_string();
        Self::with_handler(move |cmd| {
            if cmd.display().starts_with(&prefix) {
                Err(command_failed(cmd, &stderr))
            } else {
                super::fake_helm_fetch(cmd)?;
                super::fake_helmfile_template(cmd)
            }
        })
    }

    /// Sleep for `delay` before answering each command.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Report `tool` as not installed from [`ShellRunner::check_tool`].
    ///
    /// Every other tool is treated as installed.
    pub fn without_tool(mut self, tool: &str) -> Self {
        self.missing_tools.push(tool.to_string());
        self
    }

    /// Recorded commands, in the order they started.
    pub fn commands(&self) -> Vec<ShellCommand> {
        self.commands.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Recorded command lines.
    pub fn command_lines(&self) -> Vec<String> {
        self.commands().iter().map(ShellCommand::display).collect()
    }
}

impl ShellRunner for MockRunner {
    fn run(
        &self,
        command: ShellCommand,
    ) -> Pin<Box<dyn Future<Output = Result<ShellOutput>> + Send + '_>> {
        Box::pin(async move {
            if let Ok(mut commands) = self.commands.lock() {
                commands.push(command.clone());
            }
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            (self.handler)(&command)
        })
    }

    fn check_tool(&self, tool: &str) -> Result<()> {
        if self.missing_tools.iter().any(|t| t == tool) {
            return Err(TerraError::ToolNotFound {
                tool: tool.to_string(),
            }
            .into());
        }
        Ok(())
    }
}

fn command_failed(cmd: &ShellCommand, stderr: &str) -> anyhow::Error {
    TerraError::CommandFailed {
        command: cmd.display(),
        stderr: stderr.to_string(),
    }
    .into()
}
