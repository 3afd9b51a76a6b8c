//! Semantic version handling for chart versions.
//!
//! Chart versions in fleet files and repository indexes are mostly semver,
//! but are not always written strictly: a leading `v` and missing minor or
//! patch components (`1.2`) both occur. [`VersionComparator`] normalizes such
//! strings before handing them to the `semver` crate.
//!
//! - [`comparison`] - normalization, validity checks, ordering, minor bumps

pub mod comparison;

pub use comparison::VersionComparator;
