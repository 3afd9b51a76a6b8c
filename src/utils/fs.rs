//! File system operations used by the resolvers and the render driver.

use std::fs;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Ensures a directory exists, creating it and all parent directories if necessary.
///
/// # Errors
///
/// Fails if the path exists but is not a directory, or creation fails.
///
/// # Examples
///
/// ```rust,no_run
/// use terra_cli::utils::fs::ensure_dir;
/// use std::path::Path;
///
/// # fn example() -> anyhow::Result<()> {
/// ensure_dir(Path::new("output/dev/leonardo"))?;
/// # Ok(())
/// # }
/// ```
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("Failed to create directory: {}", path.display()))?;
    } else if !path.is_dir() {
        return Err(anyhow::anyhow!("Path exists but is not a directory: {}", path.display()));
    }
    Ok(())
}

/// Ensures that the parent directory of a file path exists.
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    Ok(())
}

/// Removes a directory tree. A missing directory is not an error.
pub fn remove_dir_all(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_dir_all(path)
            .with_context(|| format!("Failed to remove directory: {}", path.display()))?;
    }
    Ok(())
}

/// Deletes everything inside `dir` but keeps `dir` itself.
///
/// Output directories are frequently bind-mounted into containers, where
/// removing and recreating the mount point breaks the mount. A missing
/// directory is a no-op.
pub fn clean_dir_contents(dir: &Path) -> Result<()> {
    if !dir.exists() {
        return Ok(());
    }

    for entry in fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory: {}", dir.display()))?
    {
        let path = entry?.path();
        // symlink_metadata so a symlinked directory is unlinked, not traversed
        let is_dir = fs::symlink_metadata(&path).map(|m| m.is_dir()).unwrap_or(false);
        if is_dir {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        }
        .with_context(|| format!("Failed to remove {}", path.display()))?;
    }
    Ok(())
}

/// Immediate subdirectories of `dir`, sorted by path.
pub fn subdirectories(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory: {}", dir.display()))?
    {
        let path = entry?.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// Reads and parses a YAML file.
pub fn read_yaml_file<T>(path: &Path) -> Result<T>
where
    T: DeserializeOwned,
{
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;
    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse YAML from file: {}", path.display()))
}

/// Serializes `data` to YAML and writes it, creating parent directories.
pub fn write_yaml_file<T>(path: &Path, data: &T) -> Result<()>
where
    T: Serialize,
{
    let content = serde_yaml::to_string(data)
        .with_context(|| format!("Failed to serialize data to YAML for: {}", path.display()))?;
    ensure_parent_dir(path)?;
    fs::write(path, content).with_context(|| format!("Failed to write file: {}", path.display()))
}

/// Expands `~` and environment variables in a user-supplied path.
pub fn resolve_path(path: &str) -> Result<PathBuf> {
    let expanded = shellexpand::full(path)
        .with_context(|| format!("Failed to expand path: {path}"))?;
    Ok(PathBuf::from(expanded.as_ref()))
}

/// Renders `path` relative to `base`, always starting with `./` or `../`.
///
/// Used for human-readable origins of locally resolved charts, e.g.
/// `./charts/leonardo`. Paths on a different root are returned as-is.
pub fn relative_display(path: &Path, base: &Path) -> String {
    let path_parts: Vec<Component<'_>> = path.components().collect();
    let base_parts: Vec<Component<'_>> = base.components().collect();

    if path_parts.first() != base_parts.first() {
        return path.display().to_string();
    }

    let common = path_parts.iter().zip(&base_parts).take_while(|(a, b)| a == b).count();

    let mut relative = PathBuf::new();
    for _ in common..base_parts.len() {
        relative.push("..");
    }
    for part in &path_parts[common..] {
        relative.push(part.as_os_str());
    }

    let rendered = relative.display().to_string();
    if rendered.is_empty() {
        ".".to_string()
    } else if rendered.starts_with("..") {
        rendered
    } else {
        format!("./{rendered}")
    }
}
