//! Resolved chart records.

use std::path::{Path, PathBuf};

use crate::utils::fs::relative_display;

/// A chart materialized on disk, ready to be templated.
///
/// Records are immutable once produced; caches hand out clones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedChart {
    /// A chart from the local source tree, with dependencies updated in place.
    Local {
        /// Chart directory in the source tree
        path: PathBuf,
        /// Version declared in the chart's `Chart.yaml`
        version: String,
        /// Path relative to the working directory, e.g. `./charts/leonardo`
        origin: String,
    },
    /// A chart fetched from a chart repository into the cache directory.
    Remote {
        /// Canonical cache path `<cacheDir>/<repo>/<name>-<version>`
        path: PathBuf,
        /// Fetched version
        version: String,
        /// Repository the chart was fetched from
        repo: String,
    },
}

impl ResolvedChart {
    /// Builds a local record, describing its origin relative to the process CWD.
    pub fn local(path: PathBuf, version: impl Into<String>) -> Self {
        let origin = match std::env::current_dir() {
            Ok(cwd) => relative_display(&path, &cwd),
            Err(_) => path.display().to_string(),
        };
        Self::Local {
            path,
            version: version.into(),
            origin,
        }
    }

    /// Builds a remote record.
    pub fn remote(path: PathBuf, version: impl Into<String>, repo: impl Into<String>) -> Self {
        Self::Remote {
            path,
            version: version.into(),
            repo: repo.into(),
        }
    }

    /// Chart directory.
    pub fn path(&self) -> &Path {
        match self {
            Self::Local {
                path,
                ..
            }
            | Self::Remote {
                path,
                ..
            } => path,
        }
    }

    /// Concrete chart version.
    pub fn version(&self) -> &str {
        match self {
            Self::Local {
                version,
                ..
            }
            | Self::Remote {
                version,
                ..
            } => version,
        }
    }

    /// Where the chart came from: a `./`-relative path or a repository name.
    pub fn origin_description(&self) -> &str {
        match self {
            Self::Local {
                origin,
                ..
            } => origin,
            Self::Remote {
                repo,
                ..
            } => repo,
        }
    }

    /// Returns `true` for charts resolved from the source tree.
    pub const fn is_local(&self) -> bool {
        matches!(self, Self::Local { .. })
    }
}

impl std::fmt::Display for ResolvedChart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}) from {}", self.path().display(), self.version(), self.origin_description())
    }
}
