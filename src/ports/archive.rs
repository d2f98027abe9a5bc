//! Source tarball extraction.

use std::io::Cursor;
use std::path::{Component, Path, PathBuf};

use anyhow::{bail, Context, Result};
use flate2::read::GzDecoder;
use tar::{Archive, EntryType};

/// Extract a gzip-compressed tarball into `dest`.
///
/// When `strip_prefix` is given, the leading `<prefix>/` directory is removed
/// from every entry so `libxml2-2.9.1/configure` lands at `dest/configure`.
/// Entries outside the prefix are kept as-is.
pub fn extract_tarball(data: &[u8], dest: &Path, strip_prefix: Option<&str>) -> Result<()> {
    let mut archive = Archive::new(GzDecoder::new(Cursor::new(data)));

    std::fs::create_dir_all(dest)
        .with_context(|| format!("failed to create destination directory: {}", dest.display()))?;

    for entry in archive.entries().context("failed to read tarball entries")? {
        let mut entry = entry.context("failed to read tarball entry")?;
        let entry_path = entry.path().context("failed to get entry path")?.into_owned();

        let Some(relative) = relative_entry_path(&entry_path, strip_prefix)? else {
            continue;
        };
        let output_path = dest.join(&relative);

        if let Some(parent) = output_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory: {}", parent.display()))?;
        }

        match entry.header().entry_type() {
            EntryType::Directory => {
                std::fs::create_dir_all(&output_path).with_context(|| {
                    format!("failed to create directory: {}", output_path.display())
                })?;
            }
            EntryType::Regular | EntryType::Continuous | EntryType::Link => {
                entry.unpack(&output_path).with_context(|| {
                    format!("failed to extract file: {}", output_path.display())
                })?;
            }
            EntryType::Symlink => {
                #[cfg(unix)]
                if let Some(target) = entry.link_name()? {
                    std::os::unix::fs::symlink(target.as_ref(), &output_path).with_context(|| {
                        format!("failed to create symlink: {}", output_path.display())
                    })?;
                }
                #[cfg(not(unix))]
                tracing::debug!("Skipping symlink: {}", entry_path.display());
            }
            other => {
                tracing::debug!(
                    "Skipping unsupported entry type {:?}: {}",
                    other,
                    entry_path.display()
                );
            }
        }
    }

    Ok(())
}

/// Strip the prefix and reject entries that would escape the destination.
/// `None` means the entry is the prefix directory itself.
fn relative_entry_path(entry: &Path, strip_prefix: Option<&str>) -> Result<Option<PathBuf>> {
    let mut relative = entry.to_path_buf();

    if let Some(prefix) = strip_prefix {
        let prefix = prefix.trim_end_matches('/');
        if let Ok(stripped) = entry.strip_prefix(prefix) {
            relative = stripped.to_path_buf();
        }
    }

    if relative.as_os_str().is_empty() || relative == Path::new(".") {
        return Ok(None);
    }

    if relative
        .components()
        .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)))
    {
        bail!("tarball entry escapes destination directory: {}", entry.display());
    }

    Ok(Some(relative))
}
