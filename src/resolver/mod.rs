//! Chart resolution: turning a chart identity into a directory on disk.
//!
//! Every render job needs its release's chart materialized before the
//! template tool can run. Charts come from one of two places:
//!
//! - the **local** chart source tree, where `file://` dependencies must be
//!   updated in dependency order ([`local::LocalResolver`]),
//! - a **remote** chart repository, fetched into a shared cache directory
//!   ([`remote::RemoteResolver`]).
//!
//! [`ChartResolver`] picks between them according to the [`ResolverMode`]:
//!
//! | Mode | Policy |
//! |------|--------|
//! | Development | local if the chart exists in the source tree, else remote (with a warning) |
//! | Deploy | remote first; on failure, local if the source tree declares the requested version |
//!
//! Both resolvers and the facade memoize through [`SyncCache`], so each chart
//! is fetched or updated at most once per process however many jobs share it.
//!
//! # Module Organization
//!
//! - [`dependency_graph`] - cycle detection and topological ordering of local charts
//! - [`resolved`] - the [`ResolvedChart`] record
//! - [`local`] - source tree resolution
//! - [`remote`] - repository fetches

pub mod dependency_graph;
pub mod local;
pub mod remote;
pub mod resolved;

pub use local::LocalResolver;
pub use remote::{RemotePaths, RemoteResolver};
pub use resolved::ResolvedChart;

use std::cmp::Ordering;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;

use crate::cache::SyncCache;
use crate::constants::ARGOCD_REVISION_ENV;
use crate::core::TerraError;
use crate::shell::ShellRunner;
use crate::version::VersionComparator;

/// `(repo, name, version)`: one published chart version.
///
/// An empty version means "latest"; the remote resolver pins it against the
/// repository index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChartIdentity {
    /// Chart repository name, e.g. `terra-helm`
    pub repo: String,
    /// Chart name
    pub name: String,
    /// Chart version
    pub version: String,
}

impl ChartIdentity {
    /// Create a chart identity.
    pub fn new(
        repo: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            repo: repo.into(),
            name: name.into(),
            version: version.into(),
        }
    }

    /// `repo/name`, as passed to `helm fetch`.
    pub fn reference(&self) -> String {
        format!("{}/{}", self.repo, self.name)
    }

    /// Cache key covering the full identity.
    pub fn cache_key(&self) -> String {
        format!("{}/{}/{}", self.repo, self.name, self.version)
    }
}

impl fmt::Display for ChartIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.version.is_empty() {
            write!(f, "{}", self.reference())
        } else {
            write!(f, "{}@{}", self.reference(), self.version)
        }
    }
}

/// How charts are sourced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolverMode {
    /// Prefer the local source tree.
    #[default]
    Development,
    /// Prefer published chart versions.
    Deploy,
}

impl ResolverMode {
    /// Mode for ArgoCD-driven renders, keyed on the tracked git revision.
    ///
    /// An unset revision or `master`, `main`, or `HEAD` means the app tracks
    /// the mainline and renders published charts; anything else is a
    /// development branch.
    pub fn from_argocd_revision(revision: Option<&str>) -> Self {
        match revision.unwrap_or("") {
            "" | "master" | "main" | "HEAD" => Self::Deploy,
            _ => Self::Development,
        }
    }

    /// [`Self::from_argocd_revision`] using `ARGOCD_APP_SOURCE_TARGET_REVISION`.
    pub fn from_argocd_env() -> Self {
        let revision = std::env::var(ARGOCD_REVISION_ENV).ok();
        let mode = Self::from_argocd_revision(revision.as_deref());
        tracing::debug!(
            target: "resolver",
            "{}={:?} selects {} mode",
            ARGOCD_REVISION_ENV,
            revision,
            mode
        );
        mode
    }
}

impl fmt::Display for ResolverMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Deploy => write!(f, "deploy"),
        }
    }
}

/// Everything [`ChartResolver`] needs to build its local and remote resolvers.
#[derive(Debug, Clone)]
pub struct ChartResolverOptions {
    /// Local vs. remote preference
    pub mode: ResolverMode,
    /// Chart source tree
    pub source_dir: PathBuf,
    /// Cache, scratch and index locations for remote fetches
    pub remote: RemotePaths,
    /// `helm` executable
    pub helm_bin: String,
}

struct Resolvers {
    mode: ResolverMode,
    local: LocalResolver,
    remote: RemoteResolver,
}

/// Mode-driven facade over [`LocalResolver`] and [`RemoteResolver`].
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use terra_cli::resolver::{ChartIdentity, ChartResolver, ChartResolverOptions, RemotePaths, ResolverMode};
/// use terra_cli::shell::ProcessRunner;
///
/// # async fn example() -> anyhow::Result<()> {
/// let resolver = ChartResolver::new(
///     ChartResolverOptions {
///         mode: ResolverMode::Development,
///         source_dir: "terra-helmfile/charts".into(),
///         remote: RemotePaths {
///             cache_dir: "/tmp/terra/cache".into(),
///             scratch_dir: "/tmp/terra/scratch".into(),
///             index_dir: "/home/me/.cache/helm/repository".into(),
///         },
///         helm_bin: "helm".into(),
///     },
///     Arc::new(ProcessRunner::new()),
/// );
/// let chart = resolver.resolve(&ChartIdentity::new("terra-helm", "leonardo", "0.14.0")).await?;
/// println!("{chart}");
/// # Ok(())
/// # }
/// ```
pub struct ChartResolver {
    mode: ResolverMode,
    cache: SyncCache<ChartIdentity, ResolvedChart>,
}

impl ChartResolver {
    /// Create a resolver running subprocesses through `runner`.
    pub fn new(options: ChartResolverOptions, runner: Arc<dyn ShellRunner>) -> Self {
        let resolvers = Arc::new(Resolvers {
            mode: options.mode,
            local: LocalResolver::new(
                options.source_dir,
                Arc::clone(&runner),
                options.helm_bin.clone(),
            ),
            remote: RemoteResolver::new(options.remote, runner, options.helm_bin),
        });

        let cache = SyncCache::new("charts", ChartIdentity::cache_key, move |chart: ChartIdentity| {
            let resolvers = Arc::clone(&resolvers);
            Box::pin(async move { resolvers.resolve(&chart).await.map_err(TerraError::from) })
        });

        Self {
            mode: options.mode,
            cache,
        }
    }

    /// Active mode.
    pub const fn mode(&self) -> ResolverMode {
        self.mode
    }

    /// Resolve `chart` to a directory on disk, once per identity.
    pub async fn resolve(&self, chart: &ChartIdentity) -> Result<ResolvedChart> {
        Ok(self.cache.get(chart.clone()).await?)
    }
}

impl Resolvers {
    async fn resolve(&self, chart: &ChartIdentity) -> Result<ResolvedChart> {
        let resolved = match self.mode {
            ResolverMode::Development => self.resolve_development(chart).await?,
            ResolverMode::Deploy => self.resolve_deploy(chart).await?,
        };
        tracing::debug!(target: "resolver", "Resolved {} to {}", chart, resolved);
        Ok(resolved)
    }

    async fn resolve_development(&self, chart: &ChartIdentity) -> Result<ResolvedChart> {
        if self.local.chart_exists(&chart.name) {
            return self.local.resolve(&chart.name).await;
        }

        tracing::warn!(
            target: "resolver",
            "Chart {} not found in {}, assuming it is not a first-party chart and fetching {}",
            chart.name,
            self.local.source_dir().display(),
            chart
        );
        self.remote.resolve(chart).await
    }

    async fn resolve_deploy(&self, chart: &ChartIdentity) -> Result<ResolvedChart> {
        let remote_err = match self.remote.resolve(chart).await {
            Ok(resolved) => return Ok(resolved),
            Err(e) => e,
        };

        if !self.local.chart_exists(&chart.name) {
            return Err(remote_err);
        }

        let source_version = match self.local.source_version(&chart.name) {
            Ok(v) => v,
            Err(e) => {
                tracing::debug!(target: "resolver", "Cannot read source version of {}: {:#}", chart.name, e);
                return Err(remote_err);
            }
        };
        if !same_version(&source_version, &chart.version) {
            tracing::debug!(
                target: "resolver",
                "Not falling back to local {}: source version {} != requested {}",
                chart.name,
                source_version,
                chart.version
            );
            return Err(remote_err);
        }

        tracing::warn!(
            target: "resolver",
            "Failed to fetch {} ({:#}); source tree declares the same version, using local chart",
            chart,
            remote_err
        );
        self.local.resolve(&chart.name).await
    }
}

fn same_version(a: &str, b: &str) -> bool {
    a == b || matches!(VersionComparator::compare(a, b), Ok(Ordering::Equal))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{MockRunner, capture_logs, fake_helm_fetch, write_chart};
    use tracing::Level;
    use tempfile::TempDir;

    struct Fixture {
        temp: TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            let temp = TempDir::new().unwrap();
            std::fs::create_dir_all(temp.path().join("charts")).unwrap();
            Self {
                temp,
            }
        }

        fn source(&self) -> PathBuf {
            self.temp.path().join("charts")
        }

        fn resolver(&self, mode: ResolverMode, runner: &Arc<MockRunner>) -> ChartResolver {
            ChartResolver::new(
                ChartResolverOptions {
                    mode,
                    source_dir: self.source(),
                    remote: RemotePaths {
                        cache_dir: self.temp.path().join("cache"),
                        scratch_dir: self.temp.path().join("scratch"),
                        index_dir: self.temp.path().join("repository"),
                    },
                    helm_bin: "helm".into(),
                },
                Arc::clone(runner) as Arc<dyn ShellRunner>,
            )
        }
    }

    fn fetch_count(runner: &MockRunner) -> usize {
        runner.command_lines().iter().filter(|l| l.starts_with("helm fetch")).count()
    }

    #[test]
    fn test_argocd_revision_mode() {
        assert_eq!(ResolverMode::from_argocd_revision(None), ResolverMode::Deploy);
        for rev in ["", "master", "main", "HEAD"] {
            assert_eq!(ResolverMode::from_argocd_revision(Some(rev)), ResolverMode::Deploy);
        }
        assert_eq!(
            ResolverMode::from_argocd_revision(Some("my-feature")),
            ResolverMode::Development
        );
    }

    #[tokio::test]
    async fn test_development_prefers_local() {
        let fx = Fixture::new();
        write_chart(&fx.source(), "leonardo", "0.14.0", &[]);
        let runner = Arc::new(MockRunner::with_handler(fake_helm_fetch));
        let resolver = fx.resolver(ResolverMode::Development, &runner);

        let resolved =
            resolver.resolve(&ChartIdentity::new("terra-helm", "leonardo", "0.1.0")).await.unwrap();
        assert!(resolved.is_local());
        assert_eq!(resolved.version(), "0.14.0");
        assert_eq!(fetch_count(&runner), 0);
    }

    #[tokio::test]
    async fn test_development_falls_back_to_remote() {
        let fx = Fixture::new();
        let runner = Arc::new(MockRunner::with_handler(fake_helm_fetch));
        let resolver = fx.resolver(ResolverMode::Development, &runner);

        let resolved = resolver
            .resolve(&ChartIdentity::new("datarepo-helm", "datarepo", "1.2.0"))
            .await
            .unwrap();
        assert!(!resolved.is_local());
        assert_eq!(resolved.origin_description(), "datarepo-helm");
    }

    #[tokio::test]
    async fn test_deploy_prefers_remote() {
        let fx = Fixture::new();
        write_chart(&fx.source(), "sam", "1.0.0", &[]);
        let runner = Arc::new(MockRunner::with_handler(fake_helm_fetch));
        let resolver = fx.resolver(ResolverMode::Deploy, &runner);

        let resolved =
            resolver.resolve(&ChartIdentity::new("terra-helm", "sam", "1.0.0")).await.unwrap();
        assert!(!resolved.is_local());
        assert_eq!(fetch_count(&runner), 1);
    }

    #[tokio::test]
    async fn test_deploy_falls_back_to_local_on_matching_version() {
        let fx = Fixture::new();
        write_chart(&fx.source(), "sam", "1.0.0", &[]);
        let runner = Arc::new(MockRunner::failing_matching("helm fetch", "chart not found"));
        let resolver = fx.resolver(ResolverMode::Deploy, &runner);
        let (logs, _guard) = capture_logs(Level::WARN);

        let resolved =
            resolver.resolve(&ChartIdentity::new("terra-helm", "sam", "1.0.0")).await.unwrap();
        assert!(resolved.is_local());
        assert_eq!(resolved.path(), fx.source().join("sam"));

        let logs = logs.contents();
        assert!(logs.contains("WARN"), "{logs}");
        assert!(logs.contains("source tree declares the same version, using local chart"), "{logs}");
    }

    #[tokio::test]
    async fn test_deploy_surfaces_remote_error_on_version_mismatch() {
        let fx = Fixture::new();
        write_chart(&fx.source(), "sam", "1.1.0", &[]);
        let runner = Arc::new(MockRunner::failing_matching("helm fetch", "chart not found"));
        let resolver = fx.resolver(ResolverMode::Deploy, &runner);

        let err =
            resolver.resolve(&ChartIdentity::new("terra-helm", "sam", "1.0.0")).await.unwrap_err();
        assert!(matches!(err.downcast_ref::<TerraError>(), Some(TerraError::FetchFailed { .. })));
    }

    #[tokio::test]
    async fn test_repeated_resolution_is_memoized() {
        let fx = Fixture::new();
        let runner = Arc::new(MockRunner::with_handler(fake_helm_fetch));
        let resolver = fx.resolver(ResolverMode::Deploy, &runner);
        let chart = ChartIdentity::new("terra-helm", "rawls", "3.0.0");

        let first = resolver.resolve(&chart).await.unwrap();
        let second = resolver.resolve(&chart).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(fetch_count(&runner), 1);
    }
}
