//! Helm repository index (`<repo>-index.yaml`) queries.
//!
//! Only the `entries.<chart>[].version` fields are read. Entries whose version
//! does not parse are dropped with a warning when the index is loaded, so
//! every query below only ever sees valid versions.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;
use serde::Deserialize;

use crate::core::TerraError;
use crate::version::VersionComparator;

#[derive(Debug, Default, Deserialize)]
struct RawIndex {
    #[serde(default)]
    entries: HashMap<String, Vec<RawEntry>>,
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    #[serde(default)]
    version: Option<String>,
}

/// Parsed chart repository index.
#[derive(Debug, Clone, Default)]
pub struct ChartIndex {
    entries: HashMap<String, Vec<String>>,
}

impl ChartIndex {
    /// Loads an index file. A missing file yields an empty index.
    ///
    /// # Errors
    ///
    /// Returns [`TerraError::ManifestParseError`] if the file exists but is
    /// not a valid index.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(target: "resolver", "No chart index at {}", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content).map_err(|e| {
            TerraError::ManifestParseError {
                file: path.display().to_string(),
                reason: format!("{e:#}"),
            }
            .into()
        })
    }

    /// Parses index YAML.
    pub fn parse(content: &str) -> Result<Self> {
        let raw: RawIndex = serde_yaml::from_str(content)?;
        let mut entries = HashMap::with_capacity(raw.entries.len());

        for (chart, versions) in raw.entries {
            let valid: Vec<String> = versions
                .into_iter()
                .filter_map(|entry| match entry.version {
                    Some(v) if VersionComparator::is_valid(&v) => Some(v),
                    other => {
                        tracing::warn!(
                            target: "resolver",
                            "Ignoring invalid version {:?} for chart {} in index",
                            other.unwrap_or_default(),
                            chart
                        );
                        None
                    }
                })
                .collect();
            entries.insert(chart, valid);
        }

        Ok(Self {
            entries,
        })
    }

    /// Valid versions of `chart`, in index order.
    pub fn versions(&self, chart: &str) -> &[String] {
        self.entries.get(chart).map(Vec::as_slice).unwrap_or_default()
    }

    /// Returns `true` if `chart` has a version equal to `version` by semver precedence.
    pub fn has_version(&self, chart: &str, version: &str) -> bool {
        self.versions(chart).iter().any(|v| {
            matches!(VersionComparator::compare(v, version), Ok(Ordering::Equal))
        })
    }

    /// The highest version of `chart`, or an empty string if it has none.
    pub fn most_recent_version(&self, chart: &str) -> String {
        VersionComparator::get_latest(self.versions(chart)).cloned().unwrap_or_default()
    }

    /// Returns `true` if the index lists no charts at all.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const INDEX: &str = r#"
apiVersion: v1
entries:
  leonardo:
    - version: 0.13.0
      appVersion: abc
    - version: 0.14.0
    - version: not-a-version
  sam:
    - version: 1.0.0-beta
  empty: []
generated: "2024-01-01T00:00:00Z"
"#;

    #[test]
    fn test_versions_drop_invalid() {
        let index = ChartIndex::parse(INDEX).unwrap();
        assert_eq!(index.versions("leonardo"), &["0.13.0", "0.14.0"]);
        assert!(index.versions("missing").is_empty());
    }

    #[test]
    fn test_has_version() {
        let index = ChartIndex::parse(INDEX).unwrap();
        assert!(index.has_version("leonardo", "0.14.0"));
        assert!(index.has_version("leonardo", "v0.14.0"));
        assert!(!index.has_version("leonardo", "0.15.0"));
        assert!(!index.has_version("missing", "0.14.0"));
    }

    #[test]
    fn test_most_recent_version() {
        let index = ChartIndex::parse(INDEX).unwrap();
        assert_eq!(index.most_recent_version("leonardo"), "0.14.0");
        assert_eq!(index.most_recent_version("sam"), "1.0.0-beta");
        assert_eq!(index.most_recent_version("empty"), "");
        assert_eq!(index.most_recent_version("missing"), "");
    }

    #[test]
    fn test_missing_file_is_empty() {
        let temp = TempDir::new().unwrap();
        let index = ChartIndex::load(&temp.path().join("terra-helm-index.yaml")).unwrap();
        assert!(index.is_empty());
    }

    #[test]
    fn test_load_from_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("terra-helm-index.yaml");
        std::fs::write(&path, INDEX).unwrap();
        let index = ChartIndex::load(&path).unwrap();
        assert_eq!(index.most_recent_version("leonardo"), "0.14.0");
    }
}
