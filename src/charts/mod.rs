//! Helm chart metadata: chart manifests and repository indexes.
//!
//! - [`manifest`] reads `Chart.yaml` and classifies dependencies as local
//!   (`file://`) or remote.
//! - [`index`] reads a repository index (`<repo>-index.yaml`) and answers
//!   version queries.

pub mod index;
pub mod manifest;

pub use index::ChartIndex;
pub use manifest::{ChartDependency, ChartManifest};
