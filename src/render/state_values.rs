//! State values handed to helmfile through `--state-values-file`.
//!
//! The helmfile templates in the config repo read these as
//! `.StateValues.Release.Name`, `.StateValues.Destination.ConfigBase` and so
//! on, hence the PascalCase keys.

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Serialize;

use crate::fleet::{Destination, Release};
use crate::resolver::ResolvedChart;
use crate::utils::fs::write_yaml_file;

/// Top-level state values document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct StateValues {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release: Option<ReleaseValues>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart_path: Option<String>,
    pub destination: DestinationValues,
}

/// Release identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReleaseValues {
    pub name: String,
    pub chart_name: String,
    /// `app` or `cluster`
    #[serde(rename = "Type")]
    pub release_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,
    pub chart_version: String,
    pub repo: String,
    pub namespace: String,
}

/// Destination identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DestinationValues {
    pub name: String,
    /// `environment` or `cluster`
    #[serde(rename = "Type")]
    pub destination_type: String,
    pub config_base: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_cluster: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lifecycle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl From<&Destination> for DestinationValues {
    fn from(destination: &Destination) -> Self {
        let mut values = Self {
            name: destination.name().to_string(),
            destination_type: destination.destination_type().to_string(),
            config_base: destination.base().to_string(),
            namespace: None,
            default_cluster: None,
            lifecycle: None,
            project: None,
            location: None,
            address: None,
        };
        match destination {
            Destination::Environment(env) => {
                values.namespace = Some(env.namespace.clone());
                values.default_cluster = Some(env.default_cluster.clone());
                values.lifecycle = Some(env.lifecycle.to_string());
            }
            Destination::Cluster(cluster) => {
                values.project = Some(cluster.project.clone());
                values.location = Some(cluster.location.clone());
                values.address = Some(cluster.address.clone());
            }
        }
        values
    }
}

impl ReleaseValues {
    fn new(release: &Release, chart_version: &str, app_version_override: Option<&str>) -> Self {
        let app_version = if release.is_cluster_release() {
            if app_version_override.is_some() {
                tracing::warn!(
                    target: "render",
                    "Ignoring --app-version for cluster release {}",
                    release.full_name()
                );
            }
            None
        } else {
            app_version_override.or(release.app_version()).map(str::to_string)
        };

        Self {
            name: release.name.clone(),
            chart_name: release.chart_name.clone(),
            release_type: if release.is_cluster_release() { "cluster" } else { "app" }.to_string(),
            app_version,
            chart_version: chart_version.to_string(),
            repo: release.repo.clone(),
            namespace: release.namespace.clone(),
        }
    }
}

impl StateValues {
    /// Values for rendering `release` from the resolved `chart`.
    ///
    /// `app_version_override` replaces the release's app version; it is
    /// ignored, with a warning, for cluster releases.
    pub fn for_release(
        release: &Release,
        chart: &ResolvedChart,
        app_version_override: Option<&str>,
    ) -> Self {
        Self {
            release: Some(ReleaseValues::new(release, chart.version(), app_version_override)),
            chart_path: Some(chart.path().display().to_string()),
            destination: DestinationValues::from(&release.destination),
        }
    }

    /// Values for a release's ArgoCD app; no chart is resolved.
    pub fn for_argocd_app(release: &Release) -> Self {
        Self {
            release: Some(ReleaseValues::new(release, &release.chart_version, None)),
            chart_path: None,
            destination: DestinationValues::from(&release.destination),
        }
    }

    /// Values for a destination's ArgoCD project.
    pub fn for_destination(destination: &Destination) -> Self {
        Self {
            release: None,
            chart_path: None,
            destination: DestinationValues::from(destination),
        }
    }

    /// Serialize to `path` as YAML, creating parent directories.
    pub fn write(&self, path: &Path) -> Result<()> {
        write_yaml_file(path, self)
    }
}

/// Per-job state values file under the scratch directory.
pub fn state_values_path(scratch_dir: &Path, destination: &str, job: &str) -> PathBuf {
    scratch_dir.join("state-values").join(destination).join(job).join("state-values.yaml")
}
