//! Filesystem helpers and terminal progress reporting.
//!
//! # Modules
//!
//! - [`fs`] - directory creation/cleaning, YAML files, display paths
//! - [`progress`] - progress bar for render jobs

pub mod fs;
pub mod progress;

pub use fs::{
    clean_dir_contents, ensure_dir, ensure_parent_dir, read_yaml_file, relative_display,
    remove_dir_all, resolve_path, subdirectories, write_yaml_file,
};
pub use progress::ProgressBar;
