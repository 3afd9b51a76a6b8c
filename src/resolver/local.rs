//! Local chart resolution from the chart source tree.
//!
//! `helm dependency update` is not safe to run concurrently against the same
//! chart directory, and a chart's `file://` dependencies must be updated
//! before the chart itself. The resolver therefore:
//!
//! 1. reads the requested chart's `Chart.yaml` and walks its local
//!    dependencies breadth-first to collect the closure,
//! 2. orders the closure with a [`DependencyGraph`],
//! 3. updates each chart through a [`SyncCache`] keyed by chart name, so every
//!    chart in the source tree is updated at most once per process no matter
//!    how many render jobs share it.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;

use super::dependency_graph::DependencyGraph;
use super::resolved::ResolvedChart;
use crate::cache::SyncCache;
use crate::charts::ChartManifest;
use crate::core::TerraError;
use crate::shell::{ShellCommand, ShellRunner};

/// Resolves charts from a local source directory.
pub struct LocalResolver {
    source_dir: PathBuf,
    cache: SyncCache<String, ResolvedChart>,
}

impl LocalResolver {
    /// Create a resolver for charts under `source_dir`, running `helm_bin`
    /// through `runner` for dependency updates.
    pub fn new(source_dir: PathBuf, runner: Arc<dyn ShellRunner>, helm_bin: String) -> Self {
        let dir = source_dir.clone();
        let cache = SyncCache::new(
            "local-charts",
            |chart: &String| chart.clone(),
            move |chart: String| {
                let chart_dir = dir.join(&chart);
                let runner = Arc::clone(&runner);
                let helm_bin = helm_bin.clone();
                Box::pin(async move {
                    update_dependencies(runner.as_ref(), &helm_bin, &chart, chart_dir)
                        .await
                        .map_err(TerraError::from)
                })
            },
        );

        Self {
            source_dir,
            cache,
        }
    }

    /// Chart source directory.
    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    /// Returns `true` if `<source_dir>/<chart>` exists.
    pub fn chart_exists(&self, chart: &str) -> bool {
        self.source_dir.join(chart).exists()
    }

    /// The version declared in the chart's `Chart.yaml`.
    pub fn source_version(&self, chart: &str) -> Result<String> {
        Ok(ChartManifest::load(&self.source_dir.join(chart))?.version)
    }

    /// Update `chart` and its local dependency closure, dependencies first,
    /// and return the record for `chart`.
    ///
    /// # Errors
    ///
    /// - [`TerraError::ChartNotFound`] if the chart (or a local dependency) is missing
    /// - [`TerraError::CircularDependency`] if local dependencies form a cycle
    /// - [`TerraError::DependencyUpdateFailed`] if `helm dependency update` fails
    pub async fn resolve(&self, chart: &str) -> Result<ResolvedChart> {
        let closure = self.dependency_closure(chart)?;
        let graph = DependencyGraph::new(&closure)?;

        let mut order: Vec<String> = closure.into_keys().collect();
        graph.topo_sort(&mut order);
        tracing::debug!(target: "resolver", "Local update order for {}: {:?}", chart, order);

        let mut requested = None;
        for name in order {
            let resolved = self.cache.get(name.clone()).await?;
            if name == chart {
                requested = Some(resolved);
            }
        }

        requested.ok_or_else(|| {
            TerraError::ProgrammerError {
                message: format!("chart {chart} missing from its own dependency closure"),
            }
            .into()
        })
    }

    /// Breadth-first walk of local `file://` dependencies starting at `chart`.
    fn dependency_closure(&self, chart: &str) -> Result<HashMap<String, Vec<String>>> {
        let mut closure = HashMap::new();
        let mut queue = VecDeque::from([chart.to_string()]);

        while let Some(name) = queue.pop_front() {
            if closure.contains_key(&name) {
                continue;
            }
            let manifest = ChartManifest::load(&self.source_dir.join(&name))?;
            let local = manifest.local_dependencies();
            for dep in &local {
                if !closure.contains_key(dep) {
                    queue.push_back(dep.clone());
                }
            }
            closure.insert(name, local);
        }

        Ok(closure)
    }
}

async fn update_dependencies(
    runner: &dyn ShellRunner,
    helm_bin: &str,
    chart: &str,
    chart_dir: PathBuf,
) -> Result<ResolvedChart> {
    let manifest = ChartManifest::load(&chart_dir)?;

    tracing::debug!(target: "resolver", "Updating dependencies for local chart {}", chart);
    let command = ShellCommand::helm_dependency_update(helm_bin, &chart_dir).with_context(chart);
    runner.run(command).await.map_err(|e| TerraError::DependencyUpdateFailed {
        chart: chart.to_string(),
        reason: format!("{e:#}"),
    })?;

    Ok(ResolvedChart::local(chart_dir, manifest.version))
}
