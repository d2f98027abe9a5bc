//! Search strategies for native libraries.
//!
//! Each strategy proposes candidate directory sets for a dependency. The
//! locator tries them in list order and keeps the first that passes
//! detection, so the order of the list *is* the priority.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::core::{DependencyDescriptor, FlagSet};
use crate::util::config::DirOverride;

/// Prefixes conventionally used by package managers: MacPorts, Homebrew on
/// Apple silicon, local installs, `/opt` and Fink.
pub const OPT_PREFIXES: &[&str] = &["/opt/local", "/opt/homebrew", "/usr/local", "/opt", "/sw"];

/// Prefix of the system's own headers and libraries.
pub const SYSTEM_PREFIX: &str = "/usr";

/// Override key that applies to every dependency.
pub const SHARED_OVERRIDE: &str = "opt";

/// A set of directories to try for one dependency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    /// Name of the strategy that proposed it
    pub strategy: &'static str,
    pub include_dirs: Vec<PathBuf>,
    pub lib_dirs: Vec<PathBuf>,
}

impl Candidate {
    pub fn new(strategy: &'static str) -> Self {
        Candidate {
            strategy,
            include_dirs: Vec::new(),
            lib_dirs: Vec::new(),
        }
    }

    pub fn include(mut self, dir: impl Into<PathBuf>) -> Self {
        self.include_dirs.push(dir.into());
        self
    }

    pub fn lib(mut self, dir: impl Into<PathBuf>) -> Self {
        self.lib_dirs.push(dir.into());
        self
    }

    /// A copy of `flags` with this candidate's directories in front,
    /// preserving the candidate's own order.
    pub fn apply(&self, flags: &FlagSet) -> FlagSet {
        let mut applied = flags.clone();
        for dir in self.lib_dirs.iter().rev() {
            applied = applied.with_lib_dir(dir);
        }
        for dir in self.include_dirs.iter().rev() {
            applied = applied.with_include_dir(dir);
        }
        applied
    }

    /// Like [`Candidate::apply`], but directories already in `flags` keep
    /// their position. Earlier commits win over later ones.
    pub fn apply_missing(&self, flags: &FlagSet) -> FlagSet {
        let mut applied = flags.clone();
        for dir in self.lib_dirs.iter().rev() {
            applied = applied.with_lib_dir_if_absent(dir);
        }
        for dir in self.include_dirs.iter().rev() {
            applied = applied.with_include_dir_if_absent(dir);
        }
        applied
    }

    pub fn is_empty(&self) -> bool {
        self.include_dirs.is_empty() && self.lib_dirs.is_empty()
    }
}

/// Include directories for a prefix, with the dependency's sub-directory
/// (e.g. `include/libxml2`) ahead of the plain root.
fn prefix_candidate(strategy: &'static str, prefix: &Path, dep: &DependencyDescriptor) -> Candidate {
    let include = prefix.join("include");
    let mut candidate = Candidate::new(strategy);
    if let Some(subdir) = dep.include_subdir {
        candidate = candidate.include(include.join(subdir));
    }
    candidate.include(include).lib(prefix.join("lib"))
}

/// A way of proposing directories for a dependency.
pub trait SearchStrategy {
    fn name(&self) -> &'static str;

    fn candidates(&self, dep: &DependencyDescriptor) -> Vec<Candidate>;
}

/// Directories given explicitly by the user. The dependency's own override
/// comes first, then the shared `opt` override.
#[derive(Debug, Clone, Default)]
pub struct ExplicitDirs {
    overrides: BTreeMap<String, DirOverride>,
}

impl ExplicitDirs {
    pub fn new(overrides: BTreeMap<String, DirOverride>) -> Self {
        ExplicitDirs { overrides }
    }

    fn candidate_for(&self, key: &str, dep: &DependencyDescriptor) -> Option<Candidate> {
        let dirs = self.overrides.get(key).filter(|d| !d.is_empty())?;
        let (include, lib) = dirs.resolve();

        let mut candidate = Candidate::new(self.name());
        if let Some(include) = include {
            if let Some(subdir) = dep.include_subdir {
                candidate = candidate.include(include.join(subdir));
            }
            candidate = candidate.include(include);
        }
        if let Some(lib) = lib {
            candidate = candidate.lib(lib);
        }
        Some(candidate)
    }
}

impl SearchStrategy for ExplicitDirs {
    fn name(&self) -> &'static str {
        "explicit"
    }

    fn candidates(&self, dep: &DependencyDescriptor) -> Vec<Candidate> {
        [dep.name, SHARED_OVERRIDE]
            .iter()
            .filter_map(|key| self.candidate_for(key, dep))
            .collect()
    }
}

/// The fixed system location.
#[derive(Debug, Clone)]
pub struct WellKnownPath {
    prefix: PathBuf,
}

impl WellKnownPath {
    pub fn new(prefix: impl Into<PathBuf>) -> Self {
        WellKnownPath {
            prefix: prefix.into(),
        }
    }
}

impl Default for WellKnownPath {
    fn default() -> Self {
        WellKnownPath::new(SYSTEM_PREFIX)
    }
}

impl SearchStrategy for WellKnownPath {
    fn name(&self) -> &'static str {
        "system"
    }

    fn candidates(&self, dep: &DependencyDescriptor) -> Vec<Candidate> {
        vec![prefix_candidate(self.name(), &self.prefix, dep)]
    }
}

/// Package-manager prefixes that actually exist on this machine.
#[derive(Debug, Clone)]
pub struct OptDirs {
    prefixes: Vec<PathBuf>,
}

impl OptDirs {
    pub fn new(prefixes: Vec<PathBuf>) -> Self {
        OptDirs { prefixes }
    }
}

impl Default for OptDirs {
    fn default() -> Self {
        OptDirs::new(OPT_PREFIXES.iter().map(PathBuf::from).collect())
    }
}

impl SearchStrategy for OptDirs {
    fn name(&self) -> &'static str {
        "opt"
    }

    fn candidates(&self, dep: &DependencyDescriptor) -> Vec<Candidate> {
        self.prefixes
            .iter()
            .filter(|prefix| prefix.join("include").is_dir())
            .map(|prefix| prefix_candidate(self.name(), prefix, dep))
            .collect()
    }
}

/// What pkg-config reports for a package.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PkgConfigInfo {
    pub version: String,
    pub include_dirs: Vec<PathBuf>,
    pub lib_dirs: Vec<PathBuf>,
    pub libs: Vec<String>,
}

/// Package metadata lookup.
pub trait PackageConfig {
    fn query(&self, package: &str) -> Option<PkgConfigInfo>;
}

/// Queries the `pkg-config` found on the system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemPkgConfig;

impl PackageConfig for SystemPkgConfig {
    fn query(&self, package: &str) -> Option<PkgConfigInfo> {
        let probed = pkg_config::Config::new()
            .cargo_metadata(false)
            .env_metadata(false)
            .print_system_cflags(true)
            .print_system_libs(true)
            .probe(package);

        match probed {
            Ok(lib) => Some(PkgConfigInfo {
                version: lib.version,
                include_dirs: lib.include_paths,
                lib_dirs: lib.link_paths,
                libs: lib.libs,
            }),
            Err(e) => {
                tracing::debug!("pkg-config {}: {}", package, e);
                None
            }
        }
    }
}

/// Include and library directories from pkg-config metadata.
pub struct PkgConfigDirs<P> {
    pkg_config: P,
}

impl<P: PackageConfig> PkgConfigDirs<P> {
    pub fn new(pkg_config: P) -> Self {
        PkgConfigDirs { pkg_config }
    }
}

impl<P: PackageConfig> SearchStrategy for PkgConfigDirs<P> {
    fn name(&self) -> &'static str {
        "pkg-config"
    }

    fn candidates(&self, dep: &DependencyDescriptor) -> Vec<Candidate> {
        let Some(package) = dep.pkg_config else {
            return Vec::new();
        };
        let Some(info) = self.pkg_config.query(package) else {
            return Vec::new();
        };

        tracing::debug!("pkg-config found {} {}", package, info.version);
        vec![Candidate {
            strategy: self.name(),
            include_dirs: info.include_dirs,
            lib_dirs: info.lib_dirs,
        }]
    }
}
