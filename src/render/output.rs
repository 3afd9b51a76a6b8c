//! Output directory layout and helmfile output normalization.
//!
//! ```text
//! <outputRoot>/<destination>/<release>/<chart>/...
//! <outputRoot>/<destination>/terra-argocd-app-<release>/...
//! <outputRoot>/<destination>/terra-argocd-project/...
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::constants::{ARGOCD_APP_DIR_PREFIX, ARGOCD_PROJECT_DIR, HELMFILE_OUTPUT_PREFIX};
use crate::core::TerraError;
use crate::fleet::Release;
use crate::utils::fs::remove_dir_all;

/// `<root>/<destination>/<release>`
pub fn release_output_dir(root: &Path, release: &Release) -> PathBuf {
    root.join(release.destination.name()).join(&release.name)
}

/// `<root>/<destination>/terra-argocd-app-<release>`
pub fn argocd_app_output_dir(root: &Path, release: &Release) -> PathBuf {
    root.join(release.destination.name())
        .join(format!("{ARGOCD_APP_DIR_PREFIX}{}", release.name))
}

/// `<root>/<destination>/terra-argocd-project`
pub fn argocd_project_output_dir(root: &Path, destination: &str) -> PathBuf {
    root.join(destination).join(ARGOCD_PROJECT_DIR)
}

/// Flatten helmfile's `<dir>/helmfile-<hash>/<chart>` into `<dir>/<chart>`.
///
/// helmfile names the intermediate directory nondeterministically. Exactly
/// one `<dir>/helmfile-*/*` entry must exist; it is moved up one level and
/// the intermediate directory removed. Returns the final chart directory.
///
/// # Errors
///
/// Returns [`TerraError::OutputShapeError`] unless the glob matches once.
pub fn normalize_output_dir(dir: &Path) -> Result<PathBuf> {
    let pattern = format!(
        "{}/{HELMFILE_OUTPUT_PREFIX}*/*",
        glob::Pattern::escape(&dir.to_string_lossy())
    );

    let matches: Vec<PathBuf> = glob::glob(&pattern)
        .with_context(|| format!("Invalid output glob {pattern}"))?
        .filter_map(std::result::Result::ok)
        .collect();

    let [rendered] = matches.as_slice() else {
        return Err(TerraError::OutputShapeError {
            pattern,
            matches: matches.len(),
        }
        .into());
    };

    let (Some(intermediate), Some(name)) = (rendered.parent(), rendered.file_name()) else {
        return Err(TerraError::ProgrammerError {
            message: format!("glob match without parent: {}", rendered.display()),
        }
        .into());
    };

    let target = dir.join(name);
    remove_dir_all(&target)?;
    std::fs::rename(rendered, &target).with_context(|| {
        format!("Failed to move {} to {}", rendered.display(), target.display())
    })?;
    remove_dir_all(intermediate)?;

    tracing::trace!(target: "render", "Normalized output to {}", target.display());
    Ok(target)
}
