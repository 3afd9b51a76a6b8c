//! terra-cli - multi-release Helm rendering for the Terra fleet
//!
//! Renders Kubernetes manifests for many releases across many environments
//! and clusters. Given the fleet description in a config repository, a render
//! run:
//!
//! - selects releases with a small filter algebra ([`selector`])
//! - resolves each release's chart to a directory, from the local chart source
//!   tree or a published chart repository, updating `file://` dependencies in
//!   dependency order ([`resolver`])
//! - runs `helmfile template` per release on a bounded, fail-fast worker pool
//!   with a deterministic output layout ([`render`])
//!
//! Chart resolution is memoized per chart identity by a concurrency-safe
//! cache ([`cache`]), so a chart shared by many releases is fetched or
//! updated exactly once per run.
//!
//! # Core Modules
//!
//! ## Rendering
//! - [`render`] - render driver, helmfile invocation, parallel executor
//! - [`selector`] - release selection and flag validation
//! - [`fleet`] - environments, clusters, releases, and their YAML loader
//!
//! ## Charts
//! - [`resolver`] - local/remote chart resolution and the dependency graph
//! - [`charts`] - `Chart.yaml` manifests and repository indexes
//! - [`cache`] - once-per-key async materialization
//! - [`version`] - lenient semantic version comparison
//!
//! ## Supporting Modules
//! - [`cli`] - the `terra` command line
//! - [`config`] - `config.toml` and resolved repository paths
//! - [`core`] - error types and user-facing error formatting
//! - [`shell`] - subprocess execution behind the [`shell::ShellRunner`] trait
//! - [`utils`] - filesystem helpers and progress bars
//!
//! # Output Layout
//!
//! ```text
//! <output>/<destination>/<release>/<chart>/templates/...
//! <output>/<destination>/terra-argocd-app-<release>/...
//! <output>/<destination>/terra-argocd-project/...
//! ```

// Rendering
pub mod fleet;
pub mod render;
pub mod selector;

// Charts
pub mod cache;
pub mod charts;
pub mod resolver;
pub mod version;

// Supporting modules
pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod shell;
pub mod utils;

// test_utils module is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
