//! Error handling for terra-cli
//!
//! The error system follows two rules:
//! 1. **Strongly-typed errors** ([`TerraError`]) for every failure the render
//!    engine can surface, so callers can match on kinds (the chart resolver's
//!    deploy-mode fallback, the executor's aggregation).
//! 2. **User-friendly messages** ([`ErrorContext`]) with details and an
//!    actionable suggestion, produced once at the CLI edge.
//!
//! [`TerraError`] is `Clone`. The sync cache stores the outcome of every chart
//! resolution, failures included, and hands the same value to each caller that
//! asks for the same key.
//!
//! # Examples
//!
//! ```rust,no_run
//! use terra_cli::core::{ErrorContext, TerraError, user_friendly_error};
//!
//! let err = anyhow::Error::from(TerraError::ToolNotFound {
//!     tool: "helmfile".to_string(),
//! });
//! let ctx: ErrorContext = user_friendly_error(err);
//! ctx.display();
//! ```

use colored::Colorize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// The main error type for terra-cli operations.
///
/// # Error Categories
///
/// ## Versions and charts
/// - [`InvalidVersion`](TerraError::InvalidVersion) - unparseable semver string
/// - [`VersionNotFound`](TerraError::VersionNotFound) - no usable version in a chart index
/// - [`ChartNotFound`](TerraError::ChartNotFound) - chart missing from the source tree
/// - [`CircularDependency`](TerraError::CircularDependency) - chart dependency cycle
/// - [`DependencyUpdateFailed`](TerraError::DependencyUpdateFailed) - `helm dependency update` failed
/// - [`FetchFailed`](TerraError::FetchFailed) / [`FetchShapeError`](TerraError::FetchShapeError) - remote chart download problems
///
/// ## Selection and rendering
/// - [`SelectorError`](TerraError::SelectorError) - invalid flags or empty selection
/// - [`OutputShapeError`](TerraError::OutputShapeError) - unexpected template tool output layout
/// - [`ValidationFailed`](TerraError::ValidationFailed) - rendered manifests failed validation
/// - [`RenderTimeout`](TerraError::RenderTimeout) / [`AggregatedRenderError`](TerraError::AggregatedRenderError) - executor outcomes
///
/// ## Environment
/// - [`ToolNotFound`](TerraError::ToolNotFound), [`CommandFailed`](TerraError::CommandFailed),
///   [`ConfigError`](TerraError::ConfigError), [`FleetLoadError`](TerraError::FleetLoadError),
///   [`ManifestParseError`](TerraError::ManifestParseError), [`FileSystemError`](TerraError::FileSystemError)
#[derive(Error, Debug)]
pub enum TerraError {
    /// A version string could not be parsed as semver, even after normalization.
    #[error("invalid version: {version:?}")]
    InvalidVersion {
        /// The rejected version string
        version: String,
    },

    /// A chart index had no usable version for a chart.
    #[error("no version {version:?} found for chart {chart}")]
    VersionNotFound {
        /// Chart reference (`repo/name`)
        chart: String,
        /// Requested version, empty when the latest version was requested
        version: String,
    },

    /// A chart directory does not exist in the chart source tree.
    #[error("chart {chart} not found at {path}")]
    ChartNotFound {
        /// Chart name
        chart: String,
        /// Expected chart directory
        path: String,
    },

    /// Chart-to-chart dependencies form a cycle.
    ///
    /// `chain` is printed in edge direction, e.g. `a -> b -> a`.
    #[error("cycle detected: {chain}")]
    CircularDependency {
        /// The cycle path
        chain: String,
    },

    /// `helm dependency update` failed for a local chart.
    #[error("dependency update failed for chart {chart}: {reason}")]
    DependencyUpdateFailed {
        /// Chart name
        chart: String,
        /// Underlying failure
        reason: String,
    },

    /// `helm fetch` failed for a remote chart.
    #[error("failed to fetch chart {chart} version {version}: {reason}")]
    FetchFailed {
        /// Chart reference (`repo/name`)
        chart: String,
        /// Requested version
        version: String,
        /// Underlying failure
        reason: String,
    },

    /// `helm fetch --untar` did not produce exactly one directory.
    #[error("expected exactly one chart directory in {dir}, found {found}")]
    FetchShapeError {
        /// Scratch directory that was inspected
        dir: String,
        /// Number of directories found
        found: usize,
    },

    /// Invalid selector flags, unknown names, or an empty selection.
    #[error("{message}")]
    SelectorError {
        /// Description of the problem
        message: String,
        /// Closest known name, when the problem is an unknown name
        suggestion: Option<String>,
    },

    /// The template tool output did not match `<dir>/helmfile-*/*` exactly once.
    #[error("expected exactly one match for {pattern}, found {matches}")]
    OutputShapeError {
        /// Glob pattern that was evaluated
        pattern: String,
        /// Number of matches
        matches: usize,
    },

    /// Rendered manifests failed validation.
    #[error("validation failed for {dir}: {reason}")]
    ValidationFailed {
        /// Output directory that was validated
        dir: String,
        /// Validator output
        reason: String,
    },

    /// The parallel executor hit its global timeout.
    #[error("render timed out after {}s", .timeout.as_secs())]
    RenderTimeout {
        /// The configured executor timeout
        timeout: Duration,
    },

    /// One or more render jobs failed.
    #[error("{count} render errors:\n{joined}")]
    AggregatedRenderError {
        /// Number of failed jobs
        count: usize,
        /// `description: error` lines joined by newlines
        joined: String,
    },

    /// A required executable is not on `PATH`.
    #[error("{tool} is not installed or not found in PATH")]
    ToolNotFound {
        /// Executable name
        tool: String,
    },

    /// An external command exited unsuccessfully or timed out.
    #[error("command failed: {command}")]
    CommandFailed {
        /// The command line that was executed
        command: String,
        /// Captured standard error (or stdout when stderr was empty)
        stderr: String,
    },

    /// Configuration file problems.
    #[error("configuration error: {message}")]
    ConfigError {
        /// Description of the configuration error
        message: String,
    },

    /// Fleet state files could not be loaded.
    #[error("failed to load fleet state from {path}: {reason}")]
    FleetLoadError {
        /// File or directory being loaded
        path: String,
        /// Reason for the failure
        reason: String,
    },

    /// A chart manifest (`Chart.yaml`) is malformed.
    #[error("invalid chart manifest {file}: {reason}")]
    ManifestParseError {
        /// Manifest path
        file: String,
        /// Parse failure
        reason: String,
    },

    /// An API was used in a way that is never valid (a bug, not user input).
    #[error("internal error: {message}")]
    ProgrammerError {
        /// What was misused
        message: String,
    },

    /// A filesystem operation failed.
    #[error("file system error: {operation} {path}")]
    FileSystemError {
        /// The operation that failed
        operation: String,
        /// Path involved
        path: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// Semver parsing error
    #[error("semver parsing error: {0}")]
    SemverError(#[from] semver::Error),

    /// Other error
    #[error("{message}")]
    Other {
        /// Generic error message
        message: String,
    },
}

impl TerraError {
    /// Shorthand for a [`TerraError::SelectorError`] without a suggestion.
    pub fn selector(message: impl Into<String>) -> Self {
        Self::SelectorError {
            message: message.into(),
            suggestion: None,
        }
    }
}

impl Clone for TerraError {
    fn clone(&self) -> Self {
        match self {
            Self::InvalidVersion {
                version,
            } => Self::InvalidVersion {
                version: version.clone(),
            },
            Self::VersionNotFound {
                chart,
                version,
            } => Self::VersionNotFound {
                chart: chart.clone(),
                version: version.clone(),
            },
            Self::ChartNotFound {
                chart,
                path,
            } => Self::ChartNotFound {
                chart: chart.clone(),
                path: path.clone(),
            },
            Self::CircularDependency {
                chain,
            } => Self::CircularDependency {
                chain: chain.clone(),
            },
            Self::DependencyUpdateFailed {
                chart,
                reason,
            } => Self::DependencyUpdateFailed {
                chart: chart.clone(),
                reason: reason.clone(),
            },
            Self::FetchFailed {
                chart,
                version,
                reason,
            } => Self::FetchFailed {
                chart: chart.clone(),
                version: version.clone(),
                reason: reason.clone(),
            },
            Self::FetchShapeError {
                dir,
                found,
            } => Self::FetchShapeError {
                dir: dir.clone(),
                found: *found,
            },
            Self::SelectorError {
                message,
                suggestion,
            } => Self::SelectorError {
                message: message.clone(),
                suggestion: suggestion.clone(),
            },
            Self::OutputShapeError {
                pattern,
                matches,
            } => Self::OutputShapeError {
                pattern: pattern.clone(),
                matches: *matches,
            },
            Self::ValidationFailed {
                dir,
                reason,
            } => Self::ValidationFailed {
                dir: dir.clone(),
                reason: reason.clone(),
            },
            Self::RenderTimeout {
                timeout,
            } => Self::RenderTimeout {
                timeout: *timeout,
            },
            Self::AggregatedRenderError {
                count,
                joined,
            } => Self::AggregatedRenderError {
                count: *count,
                joined: joined.clone(),
            },
            Self::ToolNotFound {
                tool,
            } => Self::ToolNotFound {
                tool: tool.clone(),
            },
            Self::CommandFailed {
                command,
                stderr,
            } => Self::CommandFailed {
                command: command.clone(),
                stderr: stderr.clone(),
            },
            Self::ConfigError {
                message,
            } => Self::ConfigError {
                message: message.clone(),
            },
            Self::FleetLoadError {
                path,
                reason,
            } => Self::FleetLoadError {
                path: path.clone(),
                reason: reason.clone(),
            },
            Self::ManifestParseError {
                file,
                reason,
            } => Self::ManifestParseError {
                file: file.clone(),
                reason: reason.clone(),
            },
            Self::ProgrammerError {
                message,
            } => Self::ProgrammerError {
                message: message.clone(),
            },
            Self::FileSystemError {
                operation,
                path,
            } => Self::FileSystemError {
                operation: operation.clone(),
                path: path.clone(),
            },
            // For errors that don't implement Clone, convert to Other
            Self::IoError(e) => Self::Other {
                message: format!("IO error: {e}"),
            },
            Self::YamlError(e) => Self::Other {
                message: format!("YAML error: {e}"),
            },
            Self::SemverError(e) => Self::Other {
                message: format!("semver parsing error: {e}"),
            },
            Self::Other {
                message,
            } => Self::Other {
                message: message.clone(),
            },
        }
    }
}

impl From<anyhow::Error> for TerraError {
    /// Recover a typed error from an `anyhow` chain, or flatten the chain into
    /// [`TerraError::Other`] when no [`TerraError`] is inside.
    fn from(error: anyhow::Error) -> Self {
        if let Some(terra) = error.downcast_ref::<TerraError>() {
            return terra.clone();
        }
        Self::Other {
            message: format!("{error:#}"),
        }
    }
}

/// Error context wrapper that provides user-friendly error information.
///
/// When displayed, errors show:
/// 1. **error**: the main message in red
/// 2. **details**: additional context in yellow (optional)
/// 3. **suggestion**: actionable next step in green (optional)
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: TerraError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with no details or suggestion.
    #[must_use]
    pub const fn new(error: TerraError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add additional details explaining the error.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error context to stderr with terminal colors.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error into a user-friendly [`ErrorContext`].
///
/// Recognizes [`TerraError`] anywhere in the chain and attaches a tailored
/// suggestion. IO errors get filesystem guidance. Anything else is shown with
/// its full cause chain.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(terra_error) = error.chain().find_map(|e| e.downcast_ref::<TerraError>()) {
        return create_error_context(terra_error.clone());
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        match io_error.kind() {
            std::io::ErrorKind::PermissionDenied => {
                return ErrorContext::new(TerraError::FileSystemError {
                    operation: "file access".to_string(),
                    path: "unknown".to_string(),
                })
                .with_suggestion("Check ownership and permissions of the output and cache directories");
            }
            std::io::ErrorKind::NotFound => {
                return ErrorContext::new(TerraError::FileSystemError {
                    operation: "file access".to_string(),
                    path: "unknown".to_string(),
                })
                .with_suggestion("Check that the file or directory exists and the path is correct");
            }
            _ => {}
        }
    }

    // Generic error - include the full error chain for better diagnostics
    let mut message = error.to_string();
    let chain: Vec<String> =
        error.chain().skip(1).map(std::string::ToString::to_string).collect();

    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }

    ErrorContext::new(TerraError::Other {
        message,
    })
}

/// Map each [`TerraError`] variant to an [`ErrorContext`] with tailored advice.
fn create_error_context(error: TerraError) -> ErrorContext {
    match &error {
        TerraError::ToolNotFound {
            tool,
        } => {
            let tool = tool.clone();
            ErrorContext::new(error)
                .with_suggestion(format!("Install {tool} and make sure it is on your PATH"))
                .with_details("Rendering shells out to helm and helmfile for chart and template work")
        }
        TerraError::SelectorError {
            suggestion,
            ..
        } => {
            let hint = match suggestion {
                Some(name) => format!("Did you mean '{name}'?"),
                None => "Run 'terra render --help' to see valid flag combinations".to_string(),
            };
            ErrorContext::new(error).with_suggestion(hint)
        }
        TerraError::CircularDependency {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Remove one of the file:// dependencies that closes the cycle")
            .with_details("Local chart dependencies must form a directed acyclic graph"),
        TerraError::ChartNotFound {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Check the chart source directory, or render in deploy mode to use published charts"),
        TerraError::FetchFailed {
            ..
        }
        | TerraError::VersionNotFound {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Run 'helm repo update' and verify the chart version was published"),
        TerraError::RenderTimeout {
            ..
        } => ErrorContext::new(error).with_suggestion(
            "Reduce the selection or raise render_timeout_secs in the terra config file",
        ),
        TerraError::ConfigError {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Check ~/.terra/config.toml or the file passed with --config"),
        TerraError::FleetLoadError {
            ..
        } => ErrorContext::new(error).with_suggestion(
            "Point TERRA_HELMFILE_ROOT at a terra-helmfile checkout with environments/ and clusters/",
        ),
        TerraError::ProgrammerError {
            ..
        } => ErrorContext::new(error).with_details("This is a bug in terra-cli; please report it"),
        _ => ErrorContext::new(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_message_format() {
        let err = TerraError::CircularDependency {
            chain: "a -> b -> a".to_string(),
        };
        assert_eq!(err.to_string(), "cycle detected: a -> b -> a");
    }

    #[test]
    fn test_aggregated_message_format() {
        let err = TerraError::AggregatedRenderError {
            count: 2,
            joined: "a: boom\nb: bang".to_string(),
        };
        assert_eq!(err.to_string(), "2 render errors:\na: boom\nb: bang");
    }

    #[test]
    fn test_clone_io_error_becomes_other() {
        let err = TerraError::IoError(std::io::Error::other("disk full"));
        match err.clone() {
            TerraError::Other {
                message,
            } => assert!(message.contains("disk full")),
            other => panic!("unexpected clone: {other:?}"),
        }
    }

    #[test]
    fn test_from_anyhow_recovers_typed_error() {
        let err = anyhow::Error::from(TerraError::ToolNotFound {
            tool: "helm".to_string(),
        })
        .context("while refreshing repositories");
        let terra: TerraError = err.into();
        assert!(matches!(terra, TerraError::ToolNotFound { .. }));
    }

    #[test]
    fn test_from_anyhow_flattens_untyped_chain() {
        let err = anyhow::anyhow!("inner").context("outer");
        let terra: TerraError = err.into();
        assert_eq!(terra.to_string(), "outer: inner");
    }

    #[test]
    fn test_selector_suggestion_is_surfaced() {
        let err = TerraError::SelectorError {
            message: "unknown release: leonardoo".to_string(),
            suggestion: Some("leonardo".to_string()),
        };
        let ctx = user_friendly_error(err.into());
        assert_eq!(ctx.suggestion.as_deref(), Some("Did you mean 'leonardo'?"));
    }

    #[test]
    fn test_generic_error_includes_chain() {
        let err = anyhow::anyhow!("root cause").context("top level");
        let ctx = user_friendly_error(err);
        let rendered = ctx.to_string();
        assert!(rendered.contains("top level"));
        assert!(rendered.contains("Caused by:"));
        assert!(rendered.contains("root cause"));
    }
}
