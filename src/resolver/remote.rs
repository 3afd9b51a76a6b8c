//! Remote chart resolution: fetch published chart versions into a cache directory.
//!
//! Each chart identity is fetched into a fresh scratch directory and then
//! renamed into its canonical location `<cacheDir>/<repo>/<name>-<version>`.
//! The canonical directory is therefore either absent or complete, and a
//! directory left by an earlier run is reused without fetching again.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use super::ChartIdentity;
use super::resolved::ResolvedChart;
use crate::cache::SyncCache;
use crate::charts::ChartIndex;
use crate::core::TerraError;
use crate::shell::{ShellCommand, ShellRunner};
use crate::utils::fs::{ensure_dir, ensure_parent_dir, subdirectories};

/// Filesystem locations used by [`RemoteResolver`].
#[derive(Debug, Clone)]
pub struct RemotePaths {
    /// Root of the chart cache, `<cacheDir>`
    pub cache_dir: PathBuf,
    /// Process-private scratch root; each fetch gets a unique subdirectory
    pub scratch_dir: PathBuf,
    /// Helm repository cache holding `<repo>-index.yaml` files
    pub index_dir: PathBuf,
}

/// Fetches charts from chart repositories.
pub struct RemoteResolver {
    index_dir: PathBuf,
    cache: SyncCache<ChartIdentity, ResolvedChart>,
}

impl RemoteResolver {
    /// Create a resolver that runs `helm_bin fetch` through `runner`.
    pub fn new(paths: RemotePaths, runner: Arc<dyn ShellRunner>, helm_bin: String) -> Self {
        let RemotePaths {
            cache_dir,
            scratch_dir,
            index_dir,
        } = paths;

        let cache = SyncCache::new(
            "remote-charts",
            ChartIdentity::cache_key,
            move |chart: ChartIdentity| {
                let runner = Arc::clone(&runner);
                let helm_bin = helm_bin.clone();
                let cache_dir = cache_dir.clone();
                let scratch_dir = scratch_dir.clone();
                Box::pin(async move {
                    fetch_chart(runner.as_ref(), &helm_bin, &chart, &cache_dir, &scratch_dir)
                        .await
                        .map_err(TerraError::from)
                })
            },
        );

        Self {
            index_dir,
            cache,
        }
    }

    /// Fetch `chart` (once per process) and return its cache location.
    ///
    /// An empty version resolves to the most recent version in the
    /// repository index.
    ///
    /// # Errors
    ///
    /// - [`TerraError::VersionNotFound`] if no version was requested and the index has none
    /// - [`TerraError::FetchFailed`] if `helm fetch` fails
    /// - [`TerraError::FetchShapeError`] if the fetch did not unpack exactly one directory
    pub async fn resolve(&self, chart: &ChartIdentity) -> Result<ResolvedChart> {
        let chart = self.pin_version(chart)?;
        Ok(self.cache.get(chart).await?)
    }

    fn index(&self, repo: &str) -> Result<ChartIndex> {
        ChartIndex::load(&self.index_dir.join(format!("{repo}-index.yaml")))
    }

    fn pin_version(&self, chart: &ChartIdentity) -> Result<ChartIdentity> {
        if chart.version.is_empty() {
            let index = self.index(&chart.repo)?;
            let latest = index.most_recent_version(&chart.name);
            if latest.is_empty() {
                return Err(TerraError::VersionNotFound {
                    chart: chart.reference(),
                    version: String::new(),
                }
                .into());
            }
            tracing::debug!(target: "resolver", "Unpinned chart {} resolved to {}", chart.reference(), latest);
            return Ok(ChartIdentity::new(&chart.repo, &chart.name, latest));
        }

        // Advisory only for pinned versions
        let index = match self.index(&chart.repo) {
            Ok(index) => index,
            Err(e) => {
                tracing::warn!(
                    target: "resolver",
                    "Ignoring unreadable index for {} while fetching {}: {:#}",
                    chart.repo,
                    chart.reference(),
                    e
                );
                return Ok(chart.clone());
            }
        };
        if !index.is_empty() && !index.has_version(&chart.name, &chart.version) {
            tracing::warn!(
                target: "resolver",
                "Chart {} version {} is not in the local index for {}; the index may be stale",
                chart.reference(),
                chart.version,
                chart.repo
            );
        }
        Ok(chart.clone())
    }
}

/// Canonical cache location for a chart identity.
pub fn cache_path(cache_dir: &Path, chart: &ChartIdentity) -> PathBuf {
    cache_dir.join(&chart.repo).join(format!("{}-{}", chart.name, chart.version))
}

async fn fetch_chart(
    runner: &dyn ShellRunner,
    helm_bin: &str,
    chart: &ChartIdentity,
    cache_dir: &Path,
    scratch_root: &Path,
) -> Result<ResolvedChart> {
    let destination = cache_path(cache_dir, chart);
    if destination.is_dir() {
        tracing::debug!(target: "resolver", "Reusing cached chart {}", destination.display());
        return Ok(ResolvedChart::remote(destination, &chart.version, &chart.repo));
    }

    let scratch = scratch_root.join(uuid::Uuid::new_v4().to_string());
    ensure_dir(&scratch)?;

    let result = fetch_into(runner, helm_bin, chart, &scratch, &destination).await;

    if let Err(e) = tokio::fs::remove_dir_all(&scratch).await
        && scratch.exists()
    {
        tracing::warn!(
            target: "resolver",
            "Failed to remove scratch directory {}: {}",
            scratch.display(),
            e
        );
    }

    result?;
    Ok(ResolvedChart::remote(destination, &chart.version, &chart.repo))
}

async fn fetch_into(
    runner: &dyn ShellRunner,
    helm_bin: &str,
    chart: &ChartIdentity,
    scratch: &Path,
    destination: &Path,
) -> Result<()> {
    tracing::debug!(target: "resolver", "Fetching {} {}", chart.reference(), chart.version);
    let command =
        ShellCommand::helm_fetch(helm_bin, &chart.repo, &chart.name, &chart.version, scratch)
            .with_context(chart.to_string());
    runner.run(command).await.map_err(|e| TerraError::FetchFailed {
        chart: chart.reference(),
        version: chart.version.clone(),
        reason: format!("{e:#}"),
    })?;

    let unpacked = subdirectories(scratch)?;
    let [chart_dir] = unpacked.as_slice() else {
        return Err(TerraError::FetchShapeError {
            dir: scratch.display().to_string(),
            found: unpacked.len(),
        }
        .into());
    };

    ensure_parent_dir(destination)?;
    tokio::fs::rename(chart_dir, destination).await.with_context(|| {
        format!("Failed to move {} to {}", chart_dir.display(), destination.display())
    })?;
    Ok(())
}
