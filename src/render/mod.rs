//! The render driver: from fleet state and flags to manifests on disk.
//!
//! A run proceeds in one pass:
//!
//! 1. select releases and validate flags ([`crate::selector`]), before any
//!    side effects
//! 2. clean the output directory's contents (not in stdout mode)
//! 3. check that helmfile is installed and refresh repository indexes once
//! 4. build one [`RenderJob`] per release, plus ArgoCD app and project jobs
//!    when `--argocd` is set
//! 5. run the jobs on the [`ParallelExecutor`]
//!
//! Each release job resolves its chart through the shared
//! [`ChartResolver`], writes its state values under the run's scratch
//! directory, runs `helmfile template`, normalizes the output and optionally
//! validates it.
//!
//! # Module Organization
//!
//! - [`options`] - [`RenderOptions`], [`Scope`], [`ValidateMode`]
//! - [`state_values`] - the `--state-values-file` document
//! - [`command`] - helmfile invocation per job
//! - [`output`] - output layout and normalization
//! - [`validate`] - kubeconform validation
//! - [`executor`] - bounded fail-fast job execution

pub mod command;
pub mod executor;
pub mod options;
pub mod output;
pub mod state_values;
pub mod validate;

pub use command::{HelmfileSettings, TemplateCommand};
pub use executor::{ParallelExecutor, RenderJob};
pub use options::{RenderOptions, Scope, ValidateMode};
pub use state_values::StateValues;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::ConfigRepo;
use crate::fleet::{Destination, FleetState, Release};
use crate::resolver::{ChartIdentity, ChartResolver, ChartResolverOptions, RemotePaths};
use crate::selector::{RenderSelection, SelectorArgs, select};
use crate::shell::{ShellCommand, ShellRunner};
use crate::utils::ProgressBar;
use crate::utils::fs::clean_dir_contents;

/// What a finished render run did.
#[derive(Debug, Clone, Default)]
pub struct RenderSummary {
    /// Descriptions of every job that was run
    pub jobs: Vec<String>,
    /// Scratch directory kept for inspection (`--debug`)
    pub scratch_dir: Option<PathBuf>,
}

/// Renders releases from a config repository.
pub struct Renderer {
    repo: ConfigRepo,
    options: RenderOptions,
    runner: Arc<dyn ShellRunner>,
}

/// State shared by every job in a run.
struct JobContext {
    repo: ConfigRepo,
    options: RenderOptions,
    runner: Arc<dyn ShellRunner>,
    resolver: ChartResolver,
    settings: HelmfileSettings,
    scratch_dir: PathBuf,
}

impl Renderer {
    /// A renderer running subprocesses through `runner`.
    pub fn new(repo: ConfigRepo, options: RenderOptions, runner: Arc<dyn ShellRunner>) -> Self {
        Self {
            repo,
            options,
            runner,
        }
    }

    /// Load the fleet from the config repository and render.
    pub async fn run(&self, args: &SelectorArgs) -> Result<RenderSummary> {
        let fleet = FleetState::load(&self.repo.root)?;
        self.render(&fleet, args).await
    }

    /// Render the releases of `fleet` selected by `args`.
    ///
    /// # Errors
    ///
    /// Selector errors are returned before anything is touched on disk.
    /// Otherwise fails on a missing helmfile binary, a failed repository
    /// refresh, or the executor's timeout and aggregated job errors.
    pub async fn render(&self, fleet: &FleetState, args: &SelectorArgs) -> Result<RenderSummary> {
        let selection = select(fleet, args)?;
        if selection.is_empty() {
            return Ok(RenderSummary::default());
        }

        if !self.options.stdout {
            tracing::debug!(target: "render", "Cleaning output directory {}", self.options.output_dir.display());
            clean_dir_contents(&self.options.output_dir)?;
        }

        self.runner.check_tool(&self.repo.helmfile_bin)?;
        if self.options.validate != ValidateMode::Skip && !self.options.stdout {
            self.runner.check_tool(&self.repo.validator_bin)?;
        }
        self.refresh_repositories().await?;

        let scratch = tempfile::Builder::new()
            .prefix("terra-render-")
            .tempdir()
            .context("Failed to create scratch directory")?;
        let context = Arc::new(self.job_context(scratch.path()));

        let jobs = build_jobs(&context, &selection);
        let descriptions: Vec<String> =
            jobs.iter().map(|j| j.description().to_string()).collect();
        if jobs.is_empty() {
            tracing::warn!(
                target: "render",
                "Nothing to render: scope {:?} without --argocd selects no jobs",
                self.options.scope
            );
        }

        let hidden = !self.options.show_progress || self.options.stdout;
        let progress = ProgressBar::for_jobs(jobs.len() as u64, hidden);
        let result = ParallelExecutor::new(self.options.parallel_workers, self.options.render_timeout)
            .with_progress(progress.clone())
            .execute(jobs)
            .await;
        progress.finish_and_clear();

        let scratch_dir = if self.options.debug {
            let kept = scratch.keep();
            tracing::info!(target: "render", "Keeping scratch directory {}", kept.display());
            Some(kept)
        } else {
            None
        };

        result?;
        Ok(RenderSummary {
            jobs: descriptions,
            scratch_dir,
        })
    }

    async fn refresh_repositories(&self) -> Result<()> {
        let command = ShellCommand::new(&self.repo.helmfile_bin)
            .arg("repos")
            .dir(&self.repo.root)
            .with_timeout(Some(self.repo.command_timeout));
        self.runner.run(command).await.context("Failed to refresh helm repositories")?;
        Ok(())
    }

    fn job_context(&self, scratch_dir: &Path) -> JobContext {
        let resolver = ChartResolver::new(
            ChartResolverOptions {
                mode: self.options.mode,
                source_dir: self.options.chart_source_dir.clone(),
                remote: RemotePaths {
                    cache_dir: self.repo.cache_dir.clone(),
                    scratch_dir: scratch_dir.join("charts"),
                    index_dir: self.repo.helm_index_dir.clone(),
                },
                helm_bin: self.repo.helm_bin.clone(),
            },
            Arc::clone(&self.runner),
        );

        let kube_version = Some(self.options.kube_version.clone()).filter(|v| !v.is_empty());
        JobContext {
            repo: self.repo.clone(),
            options: self.options.clone(),
            runner: Arc::clone(&self.runner),
            resolver,
            settings: HelmfileSettings {
                helmfile_bin: self.repo.helmfile_bin.clone(),
                log_level: self.options.helmfile_log_level.clone(),
                debug: self.options.debug,
                kube_version,
                command_timeout: Some(self.repo.command_timeout),
            },
            scratch_dir: scratch_dir.to_path_buf(),
        }
    }
}

fn build_jobs(context: &Arc<JobContext>, selection: &RenderSelection) -> Vec<RenderJob> {
    let scope = context.options.scope.unwrap_or(Scope::default_for(selection.is_release_scoped));
    let argocd = context.options.argocd;
    let mut jobs = Vec::new();

    if scope.includes_releases() {
        for release in &selection.releases {
            jobs.push(release_job(context, release));
            if argocd {
                jobs.push(argocd_app_job(context, release));
            }
        }
    }

    if scope.includes_destinations() && argocd {
        let mut seen = std::collections::HashSet::new();
        for release in &selection.releases {
            if seen.insert(release.destination.name().to_string()) {
                jobs.push(argocd_project_job(context, &release.destination));
            }
        }
    }

    jobs
}

fn release_job(context: &Arc<JobContext>, release: &Release) -> RenderJob {
    let context = Arc::clone(context);
    let release = release.clone();
    RenderJob::new(release.description(), move || async move {
        context.render_release(&release).await
    })
}

fn argocd_app_job(context: &Arc<JobContext>, release: &Release) -> RenderJob {
    let context = Arc::clone(context);
    let release = release.clone();
    let description = format!("argocd app {}", release.description());
    RenderJob::new(description.clone(), move || async move {
        let options = &context.options;
        let command = TemplateCommand {
            state_values: StateValues::for_argocd_app(&release),
            state_values_file: state_values::state_values_path(
                &context.scratch_dir,
                release.destination.name(),
                &format!("argocd-app-{}", release.name),
            ),
            working_dir: context.repo.argocd_app_dir(),
            output_dir: (!options.stdout)
                .then(|| output::argocd_app_output_dir(&options.output_dir, &release)),
            values_files: Vec::new(),
            description,
        };
        command.run(context.runner.as_ref(), &context.settings).await.map(|_| ())
    })
}

fn argocd_project_job(context: &Arc<JobContext>, destination: &Destination) -> RenderJob {
    let context = Arc::clone(context);
    let destination = destination.clone();
    let description = format!("argocd project for {}", destination.name());
    RenderJob::new(description.clone(), move || async move {
        let options = &context.options;
        let command = TemplateCommand {
            state_values: StateValues::for_destination(&destination),
            state_values_file: state_values::state_values_path(
                &context.scratch_dir,
                destination.name(),
                "argocd-project",
            ),
            working_dir: context.repo.argocd_project_dir(),
            output_dir: (!options.stdout)
                .then(|| output::argocd_project_output_dir(&options.output_dir, destination.name())),
            values_files: Vec::new(),
            description,
        };
        command.run(context.runner.as_ref(), &context.settings).await.map(|_| ())
    })
}

impl JobContext {
    async fn render_release(&self, release: &Release) -> Result<()> {
        let chart = match &self.options.chart_version {
            Some(version) => ChartIdentity::new(&release.repo, &release.chart_name, version),
            None => release.chart(),
        };
        let resolved = self.resolver.resolve(&chart).await?;
        tracing::debug!(target: "render", "Rendering {} from {}", release.full_name(), resolved);

        let output_dir = (!self.options.stdout)
            .then(|| output::release_output_dir(&self.options.output_dir, release));
        let command = TemplateCommand {
            description: release.description(),
            state_values: StateValues::for_release(
                release,
                &resolved,
                self.options.app_version.as_deref(),
            ),
            state_values_file: state_values::state_values_path(
                &self.scratch_dir,
                release.destination.name(),
                &release.name,
            ),
            working_dir: self.repo.root.clone(),
            output_dir: output_dir.clone(),
            values_files: self.options.values_files.clone(),
        };
        command.run(self.runner.as_ref(), &self.settings).await?;

        if let Some(dir) = output_dir {
            let validator = validate::validator_command(
                &self.repo.validator_bin,
                &self.options.kube_version,
                &dir,
                Some(self.repo.command_timeout),
            );
            validate::validate_output(self.runner.as_ref(), validator, &dir, self.options.validate)
                .await?;
        }
        Ok(())
    }
}
