//! Configuration for terra-cli.
//!
//! Two layers:
//!
//! - [`TerraConfig`]: the optional user file `$TERRA_HOME/config.toml`
//!   (default `~/.terra/config.toml`, overridden by `--config` or
//!   `TERRA_CONFIG`)
//! - [`ConfigRepo`]: the resolved paths and tool names a render run uses,
//!   with defaults applied and `TERRA_HELMFILE_ROOT` honoured
//!
//! ```toml
//! # ~/.terra/config.toml
//! helmfile_root = "~/src/terra-helmfile"
//! helmfile_log_level = "info"
//! ```

pub mod global;
pub mod repo;

pub use global::{TerraConfig, terra_home};
pub use repo::ConfigRepo;
