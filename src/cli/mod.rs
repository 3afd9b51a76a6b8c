//! Command-line interface for terra.
//!
//! Only the `render` command lives here; it turns flags into
//! [`SelectorArgs`](crate::selector::SelectorArgs) and
//! [`RenderOptions`](crate::render::RenderOptions) and hands them to the
//! render driver.
//!
//! # Global Options
//!
//! - `--verbose` - debug logging
//! - `--quiet` - errors only, no progress bar
//! - `--no-progress` - disable the progress bar
//! - `--config` - path to `config.toml`
//!
//! `RUST_LOG` overrides the log level chosen by `--verbose`/`--quiet`.
//!
//! ```bash
//! terra render -e dev ALL
//! terra render -r leonardo --chart-version 0.14.0 --stdout
//! terra --verbose render --exact-release sam-dev --validate fail
//! ```

mod render;


pub use render::RenderCommand;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Settings derived from global flags.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Log filter used when `RUST_LOG` is unset
    pub log_level: String,
    /// Hide progress bars
    pub no_progress: bool,
    /// Suppress non-error output
    pub quiet: bool,
    /// Explicit `config.toml` path
    pub config_path: Option<PathBuf>,
}

impl CliConfig {
    /// Install the global tracing subscriber, writing to stderr.
    ///
    /// Only the first call in a process takes effect.
    pub fn init_logging(&self) {
        let filter = if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            EnvFilter::new(&self.log_level)
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    }
}

#[derive(Parser)]
#[command(
    name = "terra",
    about = "Render Helm manifests for the Terra fleet",
    version,
    long_about = "terra renders Kubernetes manifests for Terra releases across environments and clusters, resolving charts from the local source tree or published chart repositories."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only print errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Path to config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Disable progress bars
    #[arg(long, global = true)]
    no_progress: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Render manifests for selected releases
    Render(RenderCommand),
}

impl Cli {
    /// Settings from the global flags.
    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "warn"
        };

        CliConfig {
            log_level: log_level.to_string(),
            no_progress: self.no_progress,
            quiet: self.quiet,
            config_path: self.config.clone(),
        }
    }

    /// Run the selected command.
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        self.execute_with_config(config).await
    }

    /// Run the selected command with explicit settings.
    pub async fn execute_with_config(self, config: CliConfig) -> Result<()> {
        match self.command {
            Commands::Render(cmd) => cmd.execute(&config).await,
        }
    }
}
