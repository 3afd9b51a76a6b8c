//! Version comparison utilities for chart versions.
//!
//! # Examples
//!
//! ```rust
//! use std::cmp::Ordering;
//! use terra_cli::version::VersionComparator;
//!
//! # fn example() -> anyhow::Result<()> {
//! assert!(VersionComparator::is_valid("v1.2.3"));
//! assert!(!VersionComparator::is_valid(""));
//!
//! assert_eq!(VersionComparator::compare("0.2.4-beta", "0.2.4")?, Ordering::Less);
//! assert_eq!(VersionComparator::minor_bump("1.2")?, "1.3.0");
//! # Ok(())
//! # }
//! ```

use std::cmp::Ordering;

use anyhow::Result;
use semver::{BuildMetadata, Prerelease, Version};

use crate::core::TerraError;

/// Version comparison utilities for chart version strings.
///
/// All methods accept an optional leading `v` and pad missing minor/patch
/// components with zeros.
pub struct VersionComparator;

impl VersionComparator {
    /// Returns `true` if `version` parses after normalization.
    pub fn is_valid(version: &str) -> bool {
        Self::parse_version(version).is_ok()
    }

    /// Compares two versions by semver precedence.
    ///
    /// # Errors
    ///
    /// Returns [`TerraError::InvalidVersion`] naming whichever side failed to parse.
    pub fn compare(v: &str, w: &str) -> Result<Ordering> {
        let left = Self::parse_version(v)?;
        let right = Self::parse_version(w)?;
        Ok(left.cmp(&right))
    }

    /// Increments the minor component, resets patch, and drops any prerelease
    /// or build metadata.
    ///
    /// `1.2.3` → `1.3.0`, `1.2` → `1.3.0`, `1.2.3-beta` → `1.3.0`.
    ///
    /// # Errors
    ///
    /// Returns [`TerraError::InvalidVersion`] if `version` is unparseable.
    pub fn minor_bump(version: &str) -> Result<String> {
        let mut parsed = Self::parse_version(version)?;
        parsed.minor += 1;
        parsed.patch = 0;
        parsed.pre = Prerelease::EMPTY;
        parsed.build = BuildMetadata::EMPTY;
        Ok(parsed.to_string())
    }

    /// Returns the highest valid version in `versions`, ignoring invalid entries.
    pub fn get_latest(versions: &[String]) -> Option<&String> {
        let mut latest: Option<(&String, Version)> = None;

        for version_str in versions {
            if let Ok(version) = Self::parse_version(version_str) {
                match &latest {
                    Some((_, current)) if *current >= version => {}
                    _ => latest = Some((version_str, version)),
                }
            }
        }

        latest.map(|(s, _)| s)
    }

    /// Parses a version string after normalization.
    ///
    /// # Supported forms
    ///
    /// - `v1.2.3` → `1.2.3`
    /// - `1.2` → `1.2.0`
    /// - `1` → `1.0.0`
    /// - `1.2-rc.1` → `1.2.0-rc.1`
    ///
    /// # Errors
    ///
    /// Returns [`TerraError::InvalidVersion`] when the normalized string is not semver.
    pub fn parse_version(version_str: &str) -> Result<Version> {
        let invalid = || TerraError::InvalidVersion {
            version: version_str.to_string(),
        };

        let trimmed = version_str.trim();
        let clean = trimmed.strip_prefix('v').unwrap_or(trimmed);
        if clean.is_empty() {
            return Err(invalid().into());
        }

        // Pad only the numeric core, leaving any -prerelease/+build suffix intact
        let split_at = clean.find(['-', '+']).unwrap_or(clean.len());
        let (core, suffix) = clean.split_at(split_at);
        let padded = match core.split('.').count() {
            1 => format!("{core}.0.0{suffix}"),
            2 => format!("{core}.0{suffix}"),
            _ => clean.to_string(),
        };

        Version::parse(&padded).map_err(|_| invalid().into())
    }
}
