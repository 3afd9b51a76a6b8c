//! Core types for terra-cli
//!
//! This module holds the error vocabulary shared by every other module:
//!
//! - [`TerraError`] - enumerated failure kinds for fleet loading, chart
//!   resolution, selection and rendering
//! - [`ErrorContext`] - a user-facing wrapper adding details and suggestions
//! - [`user_friendly_error`] - converts any [`anyhow::Error`] into an
//!   [`ErrorContext`] for display at the CLI edge
//!
//! Library code raises [`TerraError`] values and propagates them through
//! `anyhow::Result`; only `main` turns them into colored terminal output.

pub mod error;

pub use error::{ErrorContext, TerraError, user_friendly_error};
