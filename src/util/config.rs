//! Configuration file support.
//!
//! Two locations are read:
//! - Global: `~/.extconf/config.toml` - user-wide defaults
//! - Project: `extconf.toml` next to `dependencies.toml`
//!
//! Project config takes precedence over global config; command-line flags
//! and environment variables take precedence over both.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// File name of the project configuration.
pub const PROJECT_CONFIG_FILE: &str = "extconf.toml";

/// Default mirror for libxml2/libxslt tarballs.
pub const DEFAULT_MIRROR: &str = "http://xmlsoft.org/sources/{name}-{version}.tar.gz";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub build: BuildConfig,

    /// Per-dependency directory overrides, keyed by dependency name
    /// (`zlib`, `iconv`, `xml2`, `xslt`, `exslt`, or `opt` for all).
    pub dirs: BTreeMap<String, DirOverride>,

    pub ports: PortsConfig,

    pub cross: CrossConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Link against system libxml2/libxslt instead of building them
    pub use_system_libraries: Option<bool>,

    /// C compiler command
    pub cc: Option<String>,

    /// Extension target, e.g. `xmlext/xmlext`
    pub extension: Option<String>,

    /// URL printed in fatal diagnostics
    pub support_url: Option<String>,
}

/// Explicit directories for one dependency.
///
/// `dir` implies `<dir>/include` and `<dir>/lib`; `include` and `lib`
/// override either half.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirOverride {
    pub dir: Option<PathBuf>,
    pub include: Option<PathBuf>,
    pub lib: Option<PathBuf>,
}

impl DirOverride {
    pub fn is_empty(&self) -> bool {
        self.dir.is_none() && self.include.is_none() && self.lib.is_none()
    }

    /// Resolved (include, lib) directories.
    pub fn resolve(&self) -> (Option<PathBuf>, Option<PathBuf>) {
        let include = self
            .include
            .clone()
            .or_else(|| self.dir.as_ref().map(|d| d.join("include")));
        let lib = self
            .lib
            .clone()
            .or_else(|| self.dir.as_ref().map(|d| d.join("lib")));
        (include, lib)
    }

    /// Merge another override into this one (other takes precedence).
    pub fn merge(&mut self, other: DirOverride) {
        if other.dir.is_some() {
            self.dir = other.dir;
        }
        if other.include.is_some() {
            self.include = other.include;
        }
        if other.lib.is_some() {
            self.lib = other.lib;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortsConfig {
    /// Where vendored libraries are installed (default: `<project>/ports`)
    pub dir: Option<PathBuf>,

    /// Tarball URL template with `{name}`, `{version}`, `{major}`, `{minor}`
    pub mirror: Option<String>,

    /// Host triple passed to `configure --host`
    pub host: Option<String>,
}

/// SDK-style directories used when cross-building for Windows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrossConfig {
    pub include_dir: Option<PathBuf>,
    pub lib_dir: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if the file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        if other.build.use_system_libraries.is_some() {
            self.build.use_system_libraries = other.build.use_system_libraries;
        }
        if other.build.cc.is_some() {
            self.build.cc = other.build.cc;
        }
        if other.build.extension.is_some() {
            self.build.extension = other.build.extension;
        }
        if other.build.support_url.is_some() {
            self.build.support_url = other.build.support_url;
        }

        for (name, dirs) in other.dirs {
            self.dirs.entry(name).or_default().merge(dirs);
        }

        if other.ports.dir.is_some() {
            self.ports.dir = other.ports.dir;
        }
        if other.ports.mirror.is_some() {
            self.ports.mirror = other.ports.mirror;
        }
        if other.ports.host.is_some() {
            self.ports.host = other.ports.host;
        }

        if other.cross.include_dir.is_some() {
            self.cross.include_dir = other.cross.include_dir;
        }
        if other.cross.lib_dir.is_some() {
            self.cross.lib_dir = other.cross.lib_dir;
        }
    }

    pub fn mirror(&self) -> &str {
        self.ports.mirror.as_deref().unwrap_or(DEFAULT_MIRROR)
    }
}

/// Load merged configuration from global and project locations.
pub fn load_config(global_path: Option<&Path>, project_path: &Path) -> Config {
    let mut config = Config::default();

    if let Some(global) = global_path {
        config.merge(Config::load_or_default(global));
    }
    config.merge(Config::load_or_default(project_path));

    config
}

/// Get the global config directory (`~/.extconf`).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".extconf"))
}

/// Get the global config path (`~/.extconf/config.toml`).
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}

/// Interpret an environment toggle the way shells usually spell booleans.
/// Unset, empty, `0`, `false` and `no` are off.
pub fn env_flag(name: &str) -> Option<bool> {
    let value = std::env::var(name).ok()?;
    let value = value.trim().to_ascii_lowercase();
    Some(!(value.is_empty() || value == "0" || value == "false" || value == "no"))
}
