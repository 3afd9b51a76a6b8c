//! Resolved locations of the config repository and local caches.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};

use super::global::{TerraConfig, terra_home};
use crate::constants::{COMMAND_TIMEOUT, RENDER_TIMEOUT, TERRA_HELMFILE_ROOT_ENV};
use crate::utils::fs::resolve_path;

/// Paths and tool names for a render run, with every default applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigRepo {
    /// Config repository root; helmfile runs here
    pub root: PathBuf,
    /// Chart source tree, default `<root>/charts`
    pub chart_source_dir: PathBuf,
    /// Chart cache, default `<home>/cache/charts`
    pub cache_dir: PathBuf,
    /// helm repository index cache, default `~/.cache/helm/repository`
    pub helm_index_dir: PathBuf,
    /// Default output root, `<home>/output`
    pub output_dir: PathBuf,
    pub helm_bin: String,
    pub helmfile_bin: String,
    pub validator_bin: String,
    pub helmfile_log_level: Option<String>,
    pub render_timeout: Duration,
    pub command_timeout: Duration,
}

impl ConfigRepo {
    /// Resolve `config` against the environment.
    ///
    /// The repository root comes from `TERRA_HELMFILE_ROOT`, then
    /// `helmfile_root`, then the current directory.
    pub fn from_config(config: &TerraConfig) -> Result<Self> {
        let home = match &config.home {
            Some(home) => resolve_path(home)?,
            None => terra_home()?,
        };

        let root = match std::env::var(TERRA_HELMFILE_ROOT_ENV) {
            Ok(root) if !root.is_empty() => resolve_path(&root)?,
            _ => match &config.helmfile_root {
                Some(root) => resolve_path(root)?,
                None => std::env::current_dir().context("Failed to read current directory")?,
            },
        };

        let optional_path = |value: &Option<String>, default: PathBuf| -> Result<PathBuf> {
            value.as_deref().map_or(Ok(default), resolve_path)
        };

        let index_default = dirs::home_dir()
            .unwrap_or_else(|| home.clone())
            .join(".cache")
            .join("helm")
            .join("repository");

        Ok(Self {
            chart_source_dir: optional_path(&config.chart_source_dir, root.join("charts"))?,
            cache_dir: optional_path(&config.cache_dir, home.join("cache").join("charts"))?,
            helm_index_dir: optional_path(&config.helm_index_dir, index_default)?,
            output_dir: home.join("output"),
            root,
            helm_bin: config.helm_bin.clone().unwrap_or_else(|| "helm".to_string()),
            helmfile_bin: config.helmfile_bin.clone().unwrap_or_else(|| "helmfile".to_string()),
            validator_bin: config.validator_bin.clone().unwrap_or_else(|| "kubeconform".to_string()),
            helmfile_log_level: config.helmfile_log_level.clone(),
            render_timeout: config.render_timeout_secs.map_or(RENDER_TIMEOUT, Duration::from_secs),
            command_timeout: config
                .command_timeout_secs
                .map_or(COMMAND_TIMEOUT, Duration::from_secs),
        })
    }

    /// A repository rooted at `root` with defaults under `home`, for tests
    /// and embedding.
    pub fn at(root: &Path, home: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            chart_source_dir: root.join("charts"),
            cache_dir: home.join("cache").join("charts"),
            helm_index_dir: home.join("helm").join("repository"),
            output_dir: home.join("output"),
            helm_bin: "helm".to_string(),
            helmfile_bin: "helmfile".to_string(),
            validator_bin: "kubeconform".to_string(),
            helmfile_log_level: None,
            render_timeout: RENDER_TIMEOUT,
            command_timeout: COMMAND_TIMEOUT,
        }
    }

    /// helmfile working directory for ArgoCD app manifests.
    pub fn argocd_app_dir(&self) -> PathBuf {
        self.root.join("argocd").join("app")
    }

    /// helmfile working directory for ArgoCD project manifests.
    pub fn argocd_project_dir(&self) -> PathBuf {
        self.root.join("argocd").join("project")
    }
}
