//! Per-job `helmfile template` invocations.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use super::output::normalize_output_dir;
use super::state_values::StateValues;
use crate::shell::{ShellCommand, ShellRunner};
use crate::utils::fs::ensure_dir;

/// helmfile settings shared by every job in a run.
#[derive(Debug, Clone)]
pub struct HelmfileSettings {
    /// `helmfile` executable
    pub helmfile_bin: String,
    /// `--log-level`
    pub log_level: Option<String>,
    /// `--debug`
    pub debug: bool,
    /// `--kube-version`
    pub kube_version: Option<String>,
    /// Per-command timeout
    pub command_timeout: Option<Duration>,
}

/// One `helmfile template` run: state values, working directory and output.
#[derive(Debug, Clone)]
pub struct TemplateCommand {
    /// Job description, used as the command's log context
    pub description: String,
    /// Values written to `state_values_file` before running
    pub state_values: StateValues,
    /// Per-job scratch path for the state values
    pub state_values_file: PathBuf,
    /// helmfile working directory
    pub working_dir: PathBuf,
    /// Output directory; `None` renders to stdout
    pub output_dir: Option<PathBuf>,
    /// Extra `--values` files
    pub values_files: Vec<PathBuf>,
}

impl TemplateCommand {
    /// Build the helmfile command line.
    ///
    /// ```text
    /// helmfile [--log-level=L] --state-values-file=F [--debug] template
    ///     --skip-deps --skip-tests [--values=A,B] [--output-dir=D] [--kube-version=V]
    /// ```
    ///
    /// Dependencies are always skipped; the chart resolver has already
    /// updated them.
    pub fn shell_command(&self, settings: &HelmfileSettings) -> ShellCommand {
        let mut args = Vec::new();
        if let Some(level) = &settings.log_level {
            args.push(format!("--log-level={level}"));
        }
        args.push(format!("--state-values-file={}", self.state_values_file.display()));
        if settings.debug {
            args.push("--debug".to_string());
        }
        args.push("template".to_string());
        args.push("--skip-deps".to_string());
        args.push("--skip-tests".to_string());
        if !self.values_files.is_empty() {
            let joined: Vec<String> =
                self.values_files.iter().map(|f| f.display().to_string()).collect();
            args.push(format!("--values={}", joined.join(",")));
        }
        if let Some(dir) = &self.output_dir {
            args.push(format!("--output-dir={}", dir.display()));
        }
        if let Some(version) = &settings.kube_version {
            args.push(format!("--kube-version={version}"));
        }

        let command = ShellCommand::new(&settings.helmfile_bin)
            .args(args)
            .dir(&self.working_dir)
            .with_timeout(settings.command_timeout)
            .with_context(&self.description);

        if self.output_dir.is_none() {
            command.inherit_stdio()
        } else {
            command
        }
    }

    /// Write the state values, run helmfile, and normalize its output.
    ///
    /// Returns the final chart output directory, or `None` in stdout mode.
    pub async fn run(
        &self,
        runner: &dyn ShellRunner,
        settings: &HelmfileSettings,
    ) -> Result<Option<PathBuf>> {
        self.state_values.write(&self.state_values_file).with_context(|| {
            format!("Failed to write state values for {}", self.description)
        })?;
        if let Some(dir) = &self.output_dir {
            ensure_dir(dir)?;
        }

        runner.run(self.shell_command(settings)).await?;

        match &self.output_dir {
            Some(dir) => normalize_output_dir(dir).map(Some),
            None => Ok(None),
        }
    }
}
