//! Builder for external commands with consistent logging and error handling.
//!
//! [`ShellCommand`] is a plain value: it describes a program, its arguments,
//! working directory, environment and timeout. Running it is the job of a
//! [`ShellRunner`](super::ShellRunner), which keeps command construction
//! testable without spawning processes.
//!
//! # Examples
//!
//! ```rust,no_run
//! use terra_cli::shell::{ProcessRunner, ShellCommand, ShellRunner};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let cmd = ShellCommand::new("helm")
//!     .args(["repo", "list"])
//!     .with_context("repo-check");
//! let output = ProcessRunner::new().run(cmd).await?;
//! println!("{}", output.stdout);
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::COMMAND_TIMEOUT;

/// Description of an external command.
///
/// New commands default to captured output, the current process directory,
/// inherited environment, and a 5-minute timeout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellCommand {
    /// Executable name or path
    program: String,

    /// Arguments passed to the program, in order
    args: Vec<String>,

    /// Working directory (defaults to the current process directory)
    dir: Option<PathBuf>,

    /// Additional environment variables
    env_vars: Vec<(String, String)>,

    /// Whether stdout/stderr are captured (true) or inherited (false)
    capture_output: bool,

    /// Maximum duration to wait for completion (None = no timeout)
    timeout_duration: Option<Duration>,

    /// Optional label included in log lines to tell concurrent jobs apart
    context: Option<String>,
}

impl ShellCommand {
    /// Create a command for `program` with default settings.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            dir: None,
            env_vars: Vec::new(),
            capture_output: true,
            timeout_duration: Some(COMMAND_TIMEOUT),
            context: None,
        }
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set the working directory.
    pub fn dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Add an environment variable for this command only.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.push((key.into(), value.into()));
        self
    }

    /// Let the command write directly to the terminal.
    ///
    /// Used for `--stdout` rendering, where manifests stream to the user.
    pub const fn inherit_stdio(mut self) -> Self {
        self.capture_output = false;
        self
    }

    /// Set a custom timeout (None for no timeout).
    pub const fn with_timeout(mut self, duration: Option<Duration>) -> Self {
        self.timeout_duration = duration;
        self
    }

    /// Set a label for log messages, typically the render job description.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Executable name or path.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments, in order.
    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    /// Working directory, if one was set.
    pub fn dir_path(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    pub(crate) fn env_vars(&self) -> &[(String, String)] {
        &self.env_vars
    }

    /// Whether output is captured.
    pub const fn captures_output(&self) -> bool {
        self.capture_output
    }

    pub(crate) const fn timeout_duration(&self) -> Option<Duration> {
        self.timeout_duration
    }

    pub(crate) fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    /// The command line as a single string, for logs and error messages.
    pub fn display(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }
}

/// Captured output from a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShellOutput {
    /// Standard output
    pub stdout: String,
    /// Standard error
    pub stderr: String,
}

// Convenience builders for the helm operations the resolvers need

impl ShellCommand {
    /// `helm fetch <repo>/<name> --version <v> --untar -d <dest>`
    pub fn helm_fetch(
        helm: &str,
        repo: &str,
        name: &str,
        version: &str,
        dest: impl AsRef<Path>,
    ) -> Self {
        Self::new(helm).args([
            "fetch".to_string(),
            format!("{repo}/{name}"),
            "--version".to_string(),
            version.to_string(),
            "--untar".to_string(),
            "-d".to_string(),
            dest.as_ref().display().to_string(),
        ])
    }

    /// `helm dependency update --skip-refresh`, run inside the chart directory.
    pub fn helm_dependency_update(helm: &str, chart_dir: impl AsRef<Path>) -> Self {
        Self::new(helm).args(["dependency", "update", "--skip-refresh"]).dir(chart_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cmd = ShellCommand::new("helm");
        assert_eq!(cmd.program(), "helm");
        assert!(cmd.arguments().is_empty());
        assert!(cmd.captures_output());
        assert_eq!(cmd.timeout_duration(), Some(COMMAND_TIMEOUT));
        assert_eq!(cmd.display(), "helm");
    }

    #[test]
    fn test_builder_chain() {
        let cmd = ShellCommand::new("helmfile")
            .arg("template")
            .args(["--skip-deps", "--skip-tests"])
            .dir("/tmp/repo")
            .env("HELM_CACHE_HOME", "/tmp/cache")
            .inherit_stdio()
            .with_timeout(None)
            .with_context("leonardo in dev");

        assert_eq!(cmd.display(), "helmfile template --skip-deps --skip-tests");
        assert_eq!(cmd.dir_path(), Some(Path::new("/tmp/repo")));
        assert_eq!(cmd.env_vars(), &[("HELM_CACHE_HOME".to_string(), "/tmp/cache".to_string())]);
        assert!(!cmd.captures_output());
        assert_eq!(cmd.timeout_duration(), None);
        assert_eq!(cmd.context(), Some("leonardo in dev"));
    }

    #[test]
    fn test_helm_fetch_args() {
        let cmd = ShellCommand::helm_fetch("helm", "terra-helm", "leonardo", "1.2.3", "/scratch/x");
        assert_eq!(
            cmd.display(),
            "helm fetch terra-helm/leonardo --version 1.2.3 --untar -d /scratch/x"
        );
    }

    #[test]
    fn test_helm_dependency_update_runs_in_chart_dir() {
        let cmd = ShellCommand::helm_dependency_update("helm", "/charts/leonardo");
        assert_eq!(cmd.arguments(), &["dependency", "update", "--skip-refresh"]);
        assert_eq!(cmd.dir_path(), Some(Path::new("/charts/leonardo")));
    }
}
