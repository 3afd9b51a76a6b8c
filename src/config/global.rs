//! User configuration file (`~/.terra/config.toml`).

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::constants::{TERRA_CONFIG_ENV, TERRA_HOME_ENV};
use crate::core::TerraError;
use crate::utils::fs::resolve_path;

/// Settings read from `config.toml`.
///
/// Every field is optional; [`ConfigRepo`](super::ConfigRepo) fills in
/// defaults when resolving paths.
///
/// ```toml
/// helmfile_root = "~/src/terra-helmfile"
/// cache_dir = "/var/cache/terra/charts"
/// helmfile_log_level = "info"
/// render_timeout_secs = 600
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TerraConfig {
    /// Data directory for caches and default output
    pub home: Option<String>,
    /// Config repository root (fleet state, helmfile.yaml, charts)
    pub helmfile_root: Option<String>,
    /// Chart source tree
    pub chart_source_dir: Option<String>,
    /// Chart cache directory
    pub cache_dir: Option<String>,
    /// helm repository cache holding `<repo>-index.yaml`
    pub helm_index_dir: Option<String>,
    pub helm_bin: Option<String>,
    pub helmfile_bin: Option<String>,
    pub validator_bin: Option<String>,
    /// `--log-level` passed to helmfile
    pub helmfile_log_level: Option<String>,
    /// Executor timeout in seconds
    pub render_timeout_secs: Option<u64>,
    /// Per-command timeout in seconds
    pub command_timeout_secs: Option<u64>,
}

impl TerraConfig {
    /// Load from `path`, else `TERRA_CONFIG`, else [`Self::default_path`].
    ///
    /// A missing file yields the default configuration.
    pub async fn load_with_optional(path: Option<PathBuf>) -> Result<Self> {
        let path = match path {
            Some(path) => path,
            None => match std::env::var(TERRA_CONFIG_ENV) {
                Ok(env_path) if !env_path.is_empty() => resolve_path(&env_path)?,
                _ => Self::default_path()?,
            },
        };

        if path.exists() {
            Self::load_from(&path).await
        } else {
            tracing::debug!(target: "config", "No config file at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Load and parse a TOML config file.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        toml::from_str(&content).map_err(|e| {
            TerraError::ConfigError {
                message: format!("{}: {}", path.display(), e.message()),
            }
            .into()
        })
    }

    /// `<terra home>/config.toml`
    pub fn default_path() -> Result<PathBuf> {
        Ok(terra_home()?.join("config.toml"))
    }
}

/// `TERRA_HOME`, or `~/.terra`.
pub fn terra_home() -> Result<PathBuf> {
    match std::env::var(TERRA_HOME_ENV) {
        Ok(home) if !home.is_empty() => return resolve_path(&home),
        _ => {}
    }

    let home = dirs::home_dir().ok_or_else(|| TerraError::ConfigError {
        message: "unable to determine home directory".to_string(),
    })?;
    Ok(home.join(".terra"))
}
