//! Fleet state: destinations (environments and clusters) and their releases.
//!
//! A [`FleetState`] is a read-only snapshot loaded once per run (see
//! [`loader`]) and shared by every render worker.
//!
//! # Release kinds
//!
//! Releases are either **app releases**, deployed into an environment and
//! carrying an application version, or **cluster releases**, deployed into a
//! cluster itself. The kind is a tag on [`Release`] rather than separate types
//! so selectors and job builders can treat both uniformly.

pub mod loader;

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::core::TerraError;
use crate::resolver::ChartIdentity;

/// Environment lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lifecycle {
    /// Long-lived, hand-maintained environment
    #[default]
    Static,
    /// Template from which dynamic environments are created
    Template,
    /// Short-lived environment created from a template
    Dynamic,
}

impl Lifecycle {
    /// All lifecycles, for error messages and suggestions.
    pub const ALL: [Self; 3] = [Self::Static, Self::Template, Self::Dynamic];

    /// Lowercase name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Static => "static",
            Self::Template => "template",
            Self::Dynamic => "dynamic",
        }
    }
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Lifecycle {
    type Err = TerraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|l| l.as_str() == s)
            .ok_or_else(|| TerraError::selector(format!("unknown environment lifecycle {s:?}")))
    }
}

/// Kind of destination a release targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DestinationType {
    /// A namespaced tenant environment
    Environment,
    /// A Kubernetes cluster
    Cluster,
}

impl DestinationType {
    /// Lowercase name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Environment => "environment",
            Self::Cluster => "cluster",
        }
    }
}

impl fmt::Display for DestinationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DestinationType {
    type Err = TerraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "environment" => Ok(Self::Environment),
            "cluster" => Ok(Self::Cluster),
            other => Err(TerraError::selector(format!(
                "unknown destination type {other:?}, expected environment or cluster"
            ))),
        }
    }
}

/// A namespaced deployment environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    /// Environment name
    pub name: String,
    /// Configuration base, e.g. `live` or `bee`
    pub base: String,
    /// Kubernetes namespace
    pub namespace: String,
    /// Cluster the environment's releases deploy to
    pub default_cluster: String,
    /// Lifecycle
    pub lifecycle: Lifecycle,
    /// Template this environment was created from (dynamic environments)
    pub template: Option<String>,
}

/// A Kubernetes cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cluster {
    /// Cluster name
    pub name: String,
    /// Configuration base, e.g. `terra`
    pub base: String,
    /// Cloud project hosting the cluster
    pub project: String,
    /// Cloud location
    pub location: String,
    /// API server address
    pub address: String,
}

/// Where a release is deployed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// An environment
    Environment(Environment),
    /// A cluster
    Cluster(Cluster),
}

impl Destination {
    /// Destination name.
    pub fn name(&self) -> &str {
        match self {
            Self::Environment(e) => &e.name,
            Self::Cluster(c) => &c.name,
        }
    }

    /// Configuration base.
    pub fn base(&self) -> &str {
        match self {
            Self::Environment(e) => &e.base,
            Self::Cluster(c) => &c.base,
        }
    }

    /// Environment or cluster.
    pub const fn destination_type(&self) -> DestinationType {
        match self {
            Self::Environment(_) => DestinationType::Environment,
            Self::Cluster(_) => DestinationType::Cluster,
        }
    }

    /// The environment, if this is one.
    pub const fn as_environment(&self) -> Option<&Environment> {
        match self {
            Self::Environment(e) => Some(e),
            Self::Cluster(_) => None,
        }
    }

    /// Returns `true` for clusters.
    pub const fn is_cluster(&self) -> bool {
        matches!(self, Self::Cluster(_))
    }
}

/// App vs. cluster release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseKind {
    /// Deployed into an environment
    App {
        /// Application version (image tag)
        app_version: String,
    },
    /// Deployed into a cluster
    Cluster,
}

/// A deployment of one chart version to one destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    /// Release name
    pub name: String,
    /// Chart name
    pub chart_name: String,
    /// Chart repository name
    pub repo: String,
    /// Chart version (empty means latest)
    pub chart_version: String,
    /// Kubernetes namespace
    pub namespace: String,
    /// Destination
    pub destination: Destination,
    /// App or cluster release
    pub kind: ReleaseKind,
}

impl Release {
    /// `<name>-<destination>`, unique across the fleet.
    pub fn full_name(&self) -> String {
        format!("{}-{}", self.name, self.destination.name())
    }

    /// Returns `true` for cluster releases.
    pub const fn is_cluster_release(&self) -> bool {
        matches!(self.kind, ReleaseKind::Cluster)
    }

    /// Application version of an app release.
    pub fn app_version(&self) -> Option<&str> {
        match &self.kind {
            ReleaseKind::App {
                app_version,
            } => Some(app_version),
            ReleaseKind::Cluster => None,
        }
    }

    /// Chart identity of this release.
    pub fn chart(&self) -> ChartIdentity {
        ChartIdentity::new(&self.repo, &self.chart_name, &self.chart_version)
    }

    /// Human-readable job description, `<release> in <destination>`.
    pub fn description(&self) -> String {
        format!("{} in {}", self.name, self.destination.name())
    }
}

/// Read-only snapshot of the fleet.
#[derive(Debug, Clone, Default)]
pub struct FleetState {
    environments: BTreeMap<String, Environment>,
    clusters: BTreeMap<String, Cluster>,
    releases: Vec<Release>,
}

impl FleetState {
    /// Assemble a fleet, checking that release full names are unique.
    ///
    /// # Errors
    ///
    /// Returns [`TerraError::FleetLoadError`] on duplicate full names.
    pub fn new(
        environments: Vec<Environment>,
        clusters: Vec<Cluster>,
        mut releases: Vec<Release>,
    ) -> Result<Self> {
        let mut seen = HashSet::new();
        for release in &releases {
            let full_name = release.full_name();
            if !seen.insert(full_name.clone()) {
                return Err(TerraError::FleetLoadError {
                    path: release.destination.name().to_string(),
                    reason: format!("duplicate release full name {full_name}"),
                }
                .into());
            }
        }

        releases.sort_by(|a, b| {
            (a.destination.name(), &a.name).cmp(&(b.destination.name(), &b.name))
        });

        Ok(Self {
            environments: environments.into_iter().map(|e| (e.name.clone(), e)).collect(),
            clusters: clusters.into_iter().map(|c| (c.name.clone(), c)).collect(),
            releases,
        })
    }

    /// All releases, ordered by destination then name.
    pub fn releases(&self) -> &[Release] {
        &self.releases
    }

    /// Environment by name.
    pub fn environment(&self, name: &str) -> Option<&Environment> {
        self.environments.get(name)
    }

    /// Cluster by name.
    pub fn cluster(&self, name: &str) -> Option<&Cluster> {
        self.clusters.get(name)
    }

    /// All environments, by name.
    pub fn environments(&self) -> impl Iterator<Item = &Environment> {
        self.environments.values()
    }

    /// All clusters, by name.
    pub fn clusters(&self) -> impl Iterator<Item = &Cluster> {
        self.clusters.values()
    }

    /// Releases deployed to the destination called `name`.
    pub fn releases_in<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Release> + 'a {
        self.releases.iter().filter(move |r| r.destination.name() == name)
    }

    /// Distinct release names across the fleet.
    pub fn release_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.releases.iter().map(|r| r.name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        names
    }
}
