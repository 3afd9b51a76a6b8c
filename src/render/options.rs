//! Options controlling a render run.

use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{DEFAULT_KUBE_VERSION, DEFAULT_PARALLEL_WORKERS, RENDER_TIMEOUT};
use crate::resolver::ResolverMode;

/// Which resources a render run produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum Scope {
    /// Release manifests (and per-release ArgoCD apps)
    Release,
    /// Destination-level ArgoCD projects
    Destination,
    /// Both
    All,
}

impl Scope {
    /// `release` for release-scoped selections, `all` otherwise.
    pub const fn default_for(is_release_scoped: bool) -> Self {
        if is_release_scoped {
            Self::Release
        } else {
            Self::All
        }
    }

    /// Returns `true` if per-release jobs are rendered.
    pub const fn includes_releases(self) -> bool {
        matches!(self, Self::Release | Self::All)
    }

    /// Returns `true` if per-destination jobs are rendered.
    pub const fn includes_destinations(self) -> bool {
        matches!(self, Self::Destination | Self::All)
    }
}

/// What to do with rendered manifests that fail validation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ValidateMode {
    /// Don't validate
    #[default]
    Skip,
    /// Log validation failures as warnings
    Warn,
    /// Fail the job
    Fail,
}

/// Everything a render run needs beyond the release selection.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Local vs. published chart preference
    pub mode: ResolverMode,
    /// Output root, `<outputRoot>/<destination>/<release>`
    pub output_dir: PathBuf,
    /// Write manifests to stdout instead of `output_dir`
    pub stdout: bool,
    /// Pass `--debug` to helmfile and keep the scratch directory
    pub debug: bool,
    /// Requested worker count
    pub parallel_workers: usize,
    /// Chart source tree
    pub chart_source_dir: PathBuf,
    /// Kubernetes version for templating and validation
    pub kube_version: String,
    /// Validation of rendered output
    pub validate: ValidateMode,
    /// Explicit `--scope`; `None` picks [`Scope::default_for`] the selection
    pub scope: Option<Scope>,
    /// Render ArgoCD app and project manifests
    pub argocd: bool,
    /// Chart version override (single-chart selections only)
    pub chart_version: Option<String>,
    /// App version override (single-chart selections only)
    pub app_version: Option<String>,
    /// Extra values files (single-chart selections only)
    pub values_files: Vec<PathBuf>,
    /// `--log-level` passed to helmfile
    pub helmfile_log_level: Option<String>,
    /// Hard cap on the whole executor
    pub render_timeout: Duration,
    /// Draw a progress bar
    pub show_progress: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            mode: ResolverMode::default(),
            output_dir: PathBuf::from("output"),
            stdout: false,
            debug: false,
            parallel_workers: DEFAULT_PARALLEL_WORKERS,
            chart_source_dir: PathBuf::from("charts"),
            kube_version: DEFAULT_KUBE_VERSION.to_string(),
            validate: ValidateMode::default(),
            scope: None,
            argocd: false,
            chart_version: None,
            app_version: None,
            values_files: Vec::new(),
            helmfile_log_level: None,
            render_timeout: RENDER_TIMEOUT,
            show_progress: true,
        }
    }
}
