//! `Chart.yaml` parsing.

use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::constants::CHART_MANIFEST;
use crate::core::TerraError;

const LOCAL_REPOSITORY_PREFIX: &str = "file://";

/// The subset of a Helm chart manifest the resolvers need.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartManifest {
    /// Chart name
    pub name: String,

    /// Chart version as declared by the chart
    #[serde(default)]
    pub version: String,

    /// Declared dependencies
    #[serde(default)]
    pub dependencies: Vec<ChartDependency>,
}

/// One entry of a chart's `dependencies` list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartDependency {
    /// Dependency chart name
    pub name: String,

    /// Version constraint
    #[serde(default)]
    pub version: String,

    /// Repository URL; `file://../<chart>` for charts in the same source tree
    #[serde(default)]
    pub repository: String,
}

impl ChartDependency {
    /// Returns `true` if the dependency lives in the local source tree.
    pub fn is_local(&self) -> bool {
        self.repository.starts_with(LOCAL_REPOSITORY_PREFIX)
    }

    /// The chart directory name of a local dependency, taken from the last
    /// component of its `file://` path.
    pub fn local_chart_name(&self) -> Option<&str> {
        let path = self.repository.strip_prefix(LOCAL_REPOSITORY_PREFIX)?;
        path.trim_end_matches('/').rsplit('/').next().filter(|name| !name.is_empty())
    }
}

impl ChartManifest {
    /// Loads `Chart.yaml` from `chart_dir`.
    ///
    /// # Errors
    ///
    /// - [`TerraError::ChartNotFound`] if the manifest does not exist
    /// - [`TerraError::ManifestParseError`] if it is not valid YAML
    pub fn load(chart_dir: &Path) -> Result<Self> {
        let path = chart_dir.join(CHART_MANIFEST);
        if !path.is_file() {
            let chart = chart_dir
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            return Err(TerraError::ChartNotFound {
                chart,
                path: chart_dir.display().to_string(),
            }
            .into());
        }

        let content = std::fs::read_to_string(&path)?;
        serde_yaml::from_str(&content).map_err(|e| {
            TerraError::ManifestParseError {
                file: path.display().to_string(),
                reason: e.to_string(),
            }
            .into()
        })
    }

    /// Chart names of dependencies in the local source tree.
    pub fn local_dependencies(&self) -> Vec<String> {
        self.dependencies
            .iter()
            .filter_map(ChartDependency::local_chart_name)
            .map(str::to_string)
            .collect()
    }
}
