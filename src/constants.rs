//! Global constants used throughout terra-cli.
//!
//! Timeouts, default values, file names, and environment variable names that
//! are shared across modules.

use std::time::Duration;

/// Hard cap on the whole parallel render executor (5 minutes).
pub const RENDER_TIMEOUT: Duration = Duration::from_secs(300);

/// Default timeout for a single external command (5 minutes).
pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(300);

/// Default Kubernetes version passed to the template tool and validator.
pub const DEFAULT_KUBE_VERSION: &str = "1.25.0";

/// Default number of parallel render workers.
pub const DEFAULT_PARALLEL_WORKERS: usize = 1;

/// Default chart repository for releases that don't name one.
pub const DEFAULT_CHART_REPO: &str = "terra-helm";

/// Chart manifest file name.
pub const CHART_MANIFEST: &str = "Chart.yaml";

/// Prefix of the nondeterministic directory the template tool writes into.
pub const HELMFILE_OUTPUT_PREFIX: &str = "helmfile-";

/// Output directory name for destination-level ArgoCD project manifests.
pub const ARGOCD_PROJECT_DIR: &str = "terra-argocd-project";

/// Prefix of output directories for per-release ArgoCD app manifests.
pub const ARGOCD_APP_DIR_PREFIX: &str = "terra-argocd-app-";

/// Positional release argument meaning "every release".
pub const ALL_RELEASES: &str = "ALL";

/// Environment variable set by ArgoCD to the tracked git revision.
pub const ARGOCD_REVISION_ENV: &str = "ARGOCD_APP_SOURCE_TARGET_REVISION";

/// Environment variable overriding the terra home directory.
pub const TERRA_HOME_ENV: &str = "TERRA_HOME";

/// Environment variable overriding the config file path.
pub const TERRA_CONFIG_ENV: &str = "TERRA_CONFIG";

/// Environment variable overriding the config repository root.
pub const TERRA_HELMFILE_ROOT_ENV: &str = "TERRA_HELMFILE_ROOT";

/// Environment variable disabling progress bars.
pub const TERRA_NO_PROGRESS_ENV: &str = "TERRA_NO_PROGRESS";

/// Minimum Jaro-Winkler similarity for "did you mean" suggestions.
pub const SUGGESTION_THRESHOLD: f64 = 0.8;
