//! Pinned dependency versions (`dependencies.toml`).
//!
//! ```toml
//! libxml2 = "2.9.1"
//! libxslt = { version = "1.1.28", sha256 = "5fc7151a..." }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use semver::Version;
use serde::Deserialize;

/// File name of the version manifest in the project root.
pub const MANIFEST_FILE: &str = "dependencies.toml";

/// A single pinned dependency.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum PinnedVersion {
    /// `libxml2 = "2.9.1"`
    Simple(String),
    /// `libxml2 = { version = "2.9.1", sha256 = "..." }`
    Detailed {
        version: String,
        #[serde(default)]
        sha256: Option<String>,
    },
}

impl PinnedVersion {
    pub fn version(&self) -> &str {
        match self {
            PinnedVersion::Simple(v) => v,
            PinnedVersion::Detailed { version, .. } => version,
        }
    }

    pub fn sha256(&self) -> Option<&str> {
        match self {
            PinnedVersion::Simple(_) => None,
            PinnedVersion::Detailed { sha256, .. } => sha256.as_deref(),
        }
    }
}

/// Name → pinned version mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct VersionManifest {
    entries: BTreeMap<String, PinnedVersion>,
}

impl VersionManifest {
    /// Load and validate a manifest file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read version manifest: {}", path.display()))?;
        Self::parse(&contents)
            .with_context(|| format!("failed to parse version manifest: {}", path.display()))
    }

    /// Parse manifest contents. Every version must be a `major.minor.patch`
    /// release.
    pub fn parse(contents: &str) -> Result<Self> {
        let manifest: VersionManifest = toml::from_str(contents)?;
        for (name, pinned) in &manifest.entries {
            Version::parse(pinned.version())
                .with_context(|| format!("invalid version `{}` for {}", pinned.version(), name))?;
        }
        Ok(manifest)
    }

    /// Get the pinned entry for a library.
    pub fn get(&self, name: &str) -> Option<&PinnedVersion> {
        self.entries.get(name)
    }

    /// Get the pinned entry, failing with a pointer at the manifest.
    pub fn require(&self, name: &str) -> Result<&PinnedVersion> {
        self.get(name).with_context(|| {
            format!(
                "no version pinned for `{}`\n\
                 help: Add `{} = \"<version>\"` to {}",
                name, name, MANIFEST_FILE
            )
        })
    }
}
