//! Filesystem utilities.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use glob::glob;

/// Remove a directory and all its contents, if it exists.
pub fn remove_dir_all_if_exists(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_dir_all(path)
            .with_context(|| format!("failed to remove directory: {}", path.display()))?;
    }
    Ok(())
}

/// Ensure a directory exists, creating it if necessary.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("failed to create directory: {}", path.display()))?;
    }
    Ok(())
}

/// Write a string to a file, creating parent directories if needed.
pub fn write_string(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    fs::write(path, contents).with_context(|| format!("failed to write file: {}", path.display()))
}

/// Find files matching glob patterns relative to a base directory, sorted
/// and de-duplicated.
pub fn glob_files(base: &Path, patterns: &[&str]) -> Result<Vec<PathBuf>> {
    let mut results = Vec::new();

    for pattern in patterns {
        let full_pattern = base.join(pattern);
        let pattern_str = full_pattern.to_string_lossy();

        for entry in glob(&pattern_str).with_context(|| format!("invalid glob pattern: {}", pattern))? {
            match entry {
                Ok(path) if path.is_file() => results.push(path),
                Ok(_) => {}
                Err(e) => tracing::warn!("glob error: {}", e),
            }
        }
    }

    results.sort();
    results.dedup();
    Ok(results)
}

/// Make a path absolute against the current directory without touching the
/// filesystem.
pub fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    }
}
