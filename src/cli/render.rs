//! `terra render`: render Helm manifests for selected releases.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use crate::config::{ConfigRepo, TerraConfig};
use crate::constants::{DEFAULT_KUBE_VERSION, DEFAULT_PARALLEL_WORKERS};
use crate::render::{RenderOptions, Renderer, Scope, ValidateMode};
use crate::resolver::ResolverMode;
use crate::selector::SelectorArgs;
use crate::shell::ProcessRunner;

use super::CliConfig;

/// How charts are resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum ModeArg {
    /// Prefer the local chart source tree
    Development,
    /// Prefer published chart versions
    Deploy,
    /// Pick from ARGOCD_APP_SOURCE_TARGET_REVISION
    ArgocdAuto,
}

impl ModeArg {
    fn resolve(self) -> ResolverMode {
        match self {
            Self::Development => ResolverMode::Development,
            Self::Deploy => ResolverMode::Deploy,
            Self::ArgocdAuto => ResolverMode::from_argocd_env(),
        }
    }
}

/// Render manifests for releases in the fleet.
///
/// Values within one selector flag are unioned and different flags
/// intersect: `-r leonardo,sam -e dev` renders leonardo and sam in dev.
#[derive(Args, Debug)]
pub struct RenderCommand {
    /// Release to render, or ALL
    #[arg(value_name = "RELEASE")]
    release: Option<String>,

    /// Render releases with these names
    #[arg(short = 'r', long = "release", value_name = "REL", value_delimiter = ',')]
    releases: Vec<String>,

    /// Render releases in these environments
    #[arg(short = 'e', long = "environment", value_name = "ENV", value_delimiter = ',')]
    environments: Vec<String>,

    /// Render releases in these clusters
    #[arg(short = 'c', long = "cluster", value_name = "CLUSTER", value_delimiter = ',')]
    clusters: Vec<String>,

    /// Render releases in destinations of this type (environment or cluster)
    #[arg(long = "destination-type", value_name = "TYPE", value_delimiter = ',')]
    destination_types: Vec<String>,

    /// Render releases in destinations with this config base
    #[arg(long = "destination-base", value_name = "BASE", value_delimiter = ',')]
    destination_bases: Vec<String>,

    /// Render releases in environments with this lifecycle (static, template, dynamic)
    #[arg(long = "environment-lifecycle", value_name = "LC", value_delimiter = ',')]
    lifecycles: Vec<String>,

    /// Render releases in environments created from this template
    #[arg(long = "environment-template", value_name = "TEMPLATE", value_delimiter = ',')]
    templates: Vec<String>,

    /// Render releases by full name, e.g. leonardo-dev
    #[arg(long = "exact-release", value_name = "FULLNAME", value_delimiter = ',')]
    exact_releases: Vec<String>,

    /// Render ArgoCD manifests
    #[arg(long)]
    argocd: bool,

    /// Output directory [default: <terra home>/output]
    #[arg(short = 'd', long, value_name = "PATH")]
    output_dir: Option<PathBuf>,

    /// Write manifests to stdout
    #[arg(long)]
    stdout: bool,

    /// Pass --debug to helmfile and keep the scratch directory
    #[arg(long)]
    debug: bool,

    /// Number of releases to render in parallel
    #[arg(long, default_value_t = DEFAULT_PARALLEL_WORKERS)]
    parallel_workers: usize,

    /// Chart resolution mode
    #[arg(long, value_enum, default_value = "development")]
    mode: ModeArg,

    /// Resources to render [default: release when releases are named, else all]
    #[arg(long, value_enum)]
    scope: Option<Scope>,

    /// Validate rendered manifests
    #[arg(long, value_enum, default_value = "skip")]
    validate: ValidateMode,

    /// Succeed when no releases match
    #[arg(long)]
    exit_zero_no_matching_releases: bool,

    /// Kubernetes version for templating and validation
    #[arg(long, default_value = DEFAULT_KUBE_VERSION)]
    kube_version: String,

    /// Override the chart version (single chart only)
    #[arg(long, value_name = "V")]
    chart_version: Option<String>,

    /// Override the app version (single chart only)
    #[arg(long, value_name = "V")]
    app_version: Option<String>,

    /// Extra values file (repeatable, single chart only)
    #[arg(long = "values-file", value_name = "FILE")]
    values_files: Vec<PathBuf>,

    /// Render charts from this source directory (implies development mode)
    #[arg(long, value_name = "DIR")]
    chart_dir: Option<PathBuf>,
}

impl RenderCommand {
    /// Load configuration and render.
    pub async fn execute(self, config: &CliConfig) -> Result<()> {
        let terra_config = TerraConfig::load_with_optional(config.config_path.clone()).await?;
        let repo = ConfigRepo::from_config(&terra_config)?;
        let (args, options) = self.into_parts(&repo, config.no_progress || config.quiet);

        let stdout = options.stdout;
        let output_dir = options.output_dir.clone();
        let renderer = Renderer::new(repo, options, Arc::new(ProcessRunner::new()));
        let summary = renderer.run(&args).await?;

        if !config.quiet && !stdout {
            if summary.jobs.is_empty() {
                eprintln!("{}", "No releases matched; nothing rendered".yellow());
            } else {
                eprintln!(
                    "{} {} jobs to {}",
                    "Rendered".green().bold(),
                    summary.jobs.len(),
                    output_dir.display()
                );
            }
        }
        if let Some(scratch) = summary.scratch_dir {
            eprintln!("Scratch directory kept at {}", scratch.display());
        }
        Ok(())
    }

    /// Split flags into selector arguments and render options.
    pub(crate) fn into_parts(self, repo: &ConfigRepo, hide_progress: bool) -> (SelectorArgs, RenderOptions) {
        let mut mode = self.mode.resolve();
        let mut chart_source_dir = repo.chart_source_dir.clone();
        if let Some(dir) = &self.chart_dir {
            if mode != ResolverMode::Development {
                tracing::warn!(target: "render", "--chart-dir forces development mode (requested {})", mode);
            }
            mode = ResolverMode::Development;
            chart_source_dir = dir.clone();
        }

        let options = RenderOptions {
            mode,
            output_dir: self.output_dir.clone().unwrap_or_else(|| repo.output_dir.clone()),
            stdout: self.stdout,
            debug: self.debug,
            parallel_workers: self.parallel_workers,
            chart_source_dir,
            kube_version: self.kube_version,
            validate: self.validate,
            scope: self.scope,
            argocd: self.argocd,
            chart_version: self.chart_version.clone(),
            app_version: self.app_version.clone(),
            values_files: self.values_files.clone(),
            helmfile_log_level: repo.helmfile_log_level.clone(),
            render_timeout: repo.render_timeout,
            show_progress: !hide_progress,
        };

        let args = SelectorArgs {
            positional: self.release,
            releases: self.releases,
            environments: self.environments,
            clusters: self.clusters,
            destination_types: self.destination_types,
            destination_bases: self.destination_bases,
            lifecycles: self.lifecycles,
            templates: self.templates,
            exact_releases: self.exact_releases,
            exit_zero_no_matching: self.exit_zero_no_matching_releases,
            chart_version: self.chart_version,
            app_version: self.app_version,
            values_files: self.values_files,
            chart_dir: self.chart_dir,
            stdout: self.stdout,
            output_dir: self.output_dir,
            parallel_workers: self.parallel_workers,
        };

        (args, options)
    }
}
