//! Downloading source archives.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use url::Url;

/// Retrieves the bytes behind a source URL.
pub trait Fetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// Fetches over HTTP(S), or reads `file://` URLs and plain paths from disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpFetcher;

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        if let Some(path) = local_path(url) {
            tracing::debug!("Reading source archive from {}", path.display());
            return std::fs::read(&path)
                .with_context(|| format!("failed to read source archive: {}", path.display()));
        }

        let response = reqwest::blocking::get(url)
            .with_context(|| format!("failed to download {}", url))?;

        if !response.status().is_success() {
            bail!("failed to download {}: HTTP {}", url, response.status());
        }

        let bytes = response
            .bytes()
            .with_context(|| format!("failed to read response body from {}", url))?;
        Ok(bytes.to_vec())
    }
}

/// `file:///x/y.tar.gz` and `/x/y.tar.gz` name local files; http(s) URLs do
/// not.
fn local_path(source: &str) -> Option<PathBuf> {
    match Url::parse(source) {
        Ok(url) if url.scheme() == "file" => url.to_file_path().ok(),
        Ok(_) => None,
        Err(_) => Some(PathBuf::from(source)),
    }
}
