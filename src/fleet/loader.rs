//! Loads [`FleetState`] from the config repository.
//!
//! ```text
//! <helmfile_root>/
//! ├── environments/
//! │   ├── dev.yaml
//! │   └── prod.yaml
//! └── clusters/
//!     └── terra-dev.yaml
//! ```
//!
//! Each file describes one destination and its releases:
//!
//! ```yaml
//! base: live
//! defaultCluster: terra-dev
//! lifecycle: static
//! releases:
//!   leonardo:
//!     chartVersion: 0.14.0
//!     appVersion: "1b2c3d"
//!   sam:
//!     enabled: false
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Deserialize;

use super::{Cluster, Destination, Environment, FleetState, Lifecycle, Release, ReleaseKind};
use crate::constants::DEFAULT_CHART_REPO;
use crate::core::TerraError;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnvironmentFile {
    name: Option<String>,
    #[serde(default)]
    base: String,
    namespace: Option<String>,
    #[serde(default)]
    default_cluster: String,
    #[serde(default)]
    lifecycle: Lifecycle,
    template: Option<String>,
    #[serde(default)]
    releases: BTreeMap<String, ReleaseEntry>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClusterFile {
    name: Option<String>,
    #[serde(default)]
    base: String,
    #[serde(default)]
    project: String,
    #[serde(default)]
    location: String,
    #[serde(default)]
    address: String,
    #[serde(default)]
    releases: BTreeMap<String, ReleaseEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReleaseEntry {
    #[serde(default = "default_enabled")]
    enabled: bool,
    chart_name: Option<String>,
    repo: Option<String>,
    #[serde(default)]
    chart_version: String,
    #[serde(default)]
    app_version: String,
    namespace: Option<String>,
}

const fn default_enabled() -> bool {
    true
}

impl FleetState {
    /// Load every environment and cluster under `root`.
    ///
    /// Missing `environments/` or `clusters/` directories yield no
    /// destinations of that type.
    ///
    /// # Errors
    ///
    /// Returns [`TerraError::FleetLoadError`] if a file cannot be read or parsed,
    /// or if two releases share a full name.
    pub fn load(root: &Path) -> Result<Self> {
        let mut environments = Vec::new();
        let mut clusters = Vec::new();
        let mut releases = Vec::new();

        for path in yaml_files(&root.join("environments"))? {
            let file: EnvironmentFile = parse_file(&path)?;
            let name = file.name.clone().unwrap_or_else(|| file_stem(&path));
            let environment = Environment {
                namespace: file.namespace.clone().unwrap_or_else(|| format!("terra-{name}")),
                base: file.base,
                default_cluster: file.default_cluster,
                lifecycle: file.lifecycle,
                template: file.template,
                name,
            };
            for (release_name, entry) in file.releases {
                if !entry.enabled {
                    continue;
                }
                releases.push(Release {
                    chart_name: entry.chart_name.unwrap_or_else(|| release_name.clone()),
                    repo: entry.repo.unwrap_or_else(|| DEFAULT_CHART_REPO.to_string()),
                    chart_version: entry.chart_version,
                    namespace: entry.namespace.unwrap_or_else(|| environment.namespace.clone()),
                    destination: Destination::Environment(environment.clone()),
                    kind: ReleaseKind::App {
                        app_version: entry.app_version,
                    },
                    name: release_name,
                });
            }
            environments.push(environment);
        }

        for path in yaml_files(&root.join("clusters"))? {
            let file: ClusterFile = parse_file(&path)?;
            let cluster = Cluster {
                name: file.name.unwrap_or_else(|| file_stem(&path)),
                base: file.base,
                project: file.project,
                location: file.location,
                address: file.address,
            };
            for (release_name, entry) in file.releases {
                if !entry.enabled {
                    continue;
                }
                if !entry.app_version.is_empty() {
                    tracing::debug!(
                        target: "selector",
                        "Ignoring appVersion for cluster release {} in {}",
                        release_name,
                        cluster.name
                    );
                }
                releases.push(Release {
                    chart_name: entry.chart_name.unwrap_or_else(|| release_name.clone()),
                    repo: entry.repo.unwrap_or_else(|| DEFAULT_CHART_REPO.to_string()),
                    chart_version: entry.chart_version,
                    namespace: entry.namespace.unwrap_or_else(|| release_name.clone()),
                    destination: Destination::Cluster(cluster.clone()),
                    kind: ReleaseKind::Cluster,
                    name: release_name,
                });
            }
            clusters.push(cluster);
        }

        tracing::debug!(
            target: "selector",
            "Loaded {} environments, {} clusters, {} releases from {}",
            environments.len(),
            clusters.len(),
            releases.len(),
            root.display()
        );
        Self::new(environments, clusters, releases)
    }
}

fn yaml_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    // The directory may itself contain glob metacharacters
    let pattern = format!("{}/*.yaml", glob::Pattern::escape(&dir.to_string_lossy()));
    let mut files: Vec<PathBuf> = glob::glob(&pattern)
        .map_err(|e| TerraError::FleetLoadError {
            path: dir.display().to_string(),
            reason: e.to_string(),
        })?
        .filter_map(Result::ok)
        .collect();
    files.sort();
    Ok(files)
}

fn parse_file<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let load_error = |reason: String| TerraError::FleetLoadError {
        path: path.display().to_string(),
        reason,
    };
    let content = std::fs::read_to_string(path).map_err(|e| load_error(e.to_string()))?;
    if content.trim().is_empty() {
        return serde_yaml::from_str("{}").map_err(|e| load_error(e.to_string()).into());
    }
    serde_yaml::from_str(&content).map_err(|e| load_error(e.to_string()).into())
}

fn file_stem(path: &Path) -> String {
    path.file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_default()
}
