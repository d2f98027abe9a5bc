//! Test doubles for the compiler, pkg-config, downloads and source builds.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{bail, Result};
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::builder::strategy::{Candidate, PackageConfig, PkgConfigInfo, SearchStrategy};
use crate::builder::SymbolChecker;
use crate::core::{DependencyDescriptor, FlagSet};
use crate::ports::Fetcher;
use crate::util::process::{CommandRunner, ProcessBuilder};

#[derive(Debug, Clone)]
struct FakeFunction {
    name: String,
    library: Option<String>,
    lib_dir: Option<PathBuf>,
}

/// A compiler that "finds" exactly what it was told about.
///
/// A header registered with a directory is only visible when that directory
/// is on the include path; with `None` it is always visible. Functions work
/// the same way for `-l` and `-L`.
#[derive(Debug, Default)]
pub struct FakeChecker {
    headers: Vec<(String, Option<PathBuf>)>,
    functions: Vec<FakeFunction>,
    header_checks: Cell<usize>,
    function_checks: Cell<usize>,
}

impl FakeChecker {
    pub fn new() -> Self {
        FakeChecker::default()
    }

    /// A checker for which every header and function exists.
    pub fn accept_all() -> Self {
        FakeChecker::new().header("*", None).function("*", None)
    }

    pub fn header(mut self, name: &str, include_dir: Option<&str>) -> Self {
        self.headers
            .push((name.to_string(), include_dir.map(PathBuf::from)));
        self
    }

    pub fn function(mut self, name: &str, library: Option<&str>) -> Self {
        self.functions.push(FakeFunction {
            name: name.to_string(),
            library: library.map(str::to_string),
            lib_dir: None,
        });
        self
    }

    /// A function that only links with `-L<lib_dir> -l<library>`.
    pub fn function_in(mut self, name: &str, library: &str, lib_dir: &str) -> Self {
        self.functions.push(FakeFunction {
            name: name.to_string(),
            library: Some(library.to_string()),
            lib_dir: Some(PathBuf::from(lib_dir)),
        });
        self
    }

    pub fn header_checks(&self) -> usize {
        self.header_checks.get()
    }

    pub fn function_checks(&self) -> usize {
        self.function_checks.get()
    }
}

impl SymbolChecker for FakeChecker {
    fn has_header(&self, flags: &FlagSet, header: &str) -> bool {
        self.header_checks.set(self.header_checks.get() + 1);
        self.headers.iter().any(|(name, dir)| {
            (name == header || name == "*")
                && dir.as_ref().is_none_or(|d| flags.include_dirs.contains(d))
        })
    }

    fn has_function(&self, flags: &FlagSet, func: &str, _header: Option<&str>) -> bool {
        self.function_checks.set(self.function_checks.get() + 1);
        self.functions.iter().any(|f| {
            (f.name == func || f.name == "*")
                && f.library.as_ref().is_none_or(|l| flags.libs.contains(l))
                && f.lib_dir.as_ref().is_none_or(|d| flags.lib_dirs.contains(d))
        })
    }
}

/// pkg-config answers from a fixed table. Clones share one query counter.
#[derive(Debug, Clone, Default)]
pub struct FakePkgConfig {
    packages: BTreeMap<String, PkgConfigInfo>,
    queries: Rc<Cell<usize>>,
}

impl FakePkgConfig {
    pub fn new() -> Self {
        FakePkgConfig::default()
    }

    pub fn package(mut self, name: &str, info: PkgConfigInfo) -> Self {
        self.packages.insert(name.to_string(), info);
        self
    }

    pub fn queries(&self) -> usize {
        self.queries.get()
    }
}

impl PackageConfig for FakePkgConfig {
    fn query(&self, package: &str) -> Option<PkgConfigInfo> {
        self.queries.set(self.queries.get() + 1);
        self.packages.get(package).cloned()
    }
}

/// Proposes the same candidates for every dependency.
#[derive(Debug, Clone)]
pub struct StaticCandidates {
    candidates: Vec<Candidate>,
}

impl StaticCandidates {
    pub fn new(candidates: Vec<Candidate>) -> Self {
        StaticCandidates { candidates }
    }
}

impl SearchStrategy for StaticCandidates {
    fn name(&self) -> &'static str {
        "static"
    }

    fn candidates(&self, _dep: &DependencyDescriptor) -> Vec<Candidate> {
        self.candidates.clone()
    }
}

/// Serves archives from memory and records every URL asked for.
#[derive(Debug, Default)]
pub struct RecordingFetcher {
    archives: BTreeMap<String, Vec<u8>>,
    requests: RefCell<Vec<String>>,
}

impl RecordingFetcher {
    pub fn new() -> Self {
        RecordingFetcher::default()
    }

    pub fn archive(mut self, url: &str, data: Vec<u8>) -> Self {
        self.archives.insert(url.to_string(), data);
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }
}

impl Fetcher for RecordingFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        self.requests.borrow_mut().push(url.to_string());
        match self.archives.get(url) {
            Some(data) => Ok(data.clone()),
            None => bail!("no archive served for {}", url),
        }
    }
}

/// Records commands instead of running them. Commands whose display form
/// contains the failure pattern return an error.
#[derive(Debug, Default)]
pub struct RecordingRunner {
    commands: RefCell<Vec<ProcessBuilder>>,
    fail_on: Option<String>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        RecordingRunner::default()
    }

    pub fn failing_on(pattern: &str) -> Self {
        RecordingRunner {
            commands: RefCell::new(Vec::new()),
            fail_on: Some(pattern.to_string()),
        }
    }

    pub fn commands(&self) -> Vec<ProcessBuilder> {
        self.commands.borrow().clone()
    }

    pub fn command_lines(&self) -> Vec<String> {
        self.commands
            .borrow()
            .iter()
            .map(ProcessBuilder::display_command)
            .collect()
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&self, cmd: &ProcessBuilder) -> Result<()> {
        self.commands.borrow_mut().push(cmd.clone());
        let line = cmd.display_command();
        if let Some(pattern) = &self.fail_on {
            if line.contains(pattern.as_str()) {
                bail!("`{}` failed with exit code Some(2)", line);
            }
        }
        Ok(())
    }
}

/// A gzip tarball whose entries all live under `<prefix>/`, the way release
/// tarballs are laid out.
pub fn source_tarball(prefix: &str, files: &[(&str, &str)]) -> Vec<u8> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);

    for (path, contents) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o755);
        header.set_cksum();
        builder
            .append_data(&mut header, format!("{}/{}", prefix, path), contents.as_bytes())
            .unwrap();
    }

    builder.into_inner().unwrap().finish().unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fake_checker_respects_dirs() {
        let checker = FakeChecker::new()
            .header("zlib.h", Some("/z/include"))
            .function_in("gzdopen", "z", "/z/lib");

        let bare = FlagSet::new();
        assert!(!checker.has_header(&bare, "zlib.h"));

        let flags = bare
            .with_include_dir("/z/include")
            .with_lib_dir("/z/lib")
            .with_lib("z");
        assert!(checker.has_header(&flags, "zlib.h"));
        assert!(checker.has_function(&flags, "gzdopen", None));
        assert_eq!(checker.header_checks(), 2);
    }

    #[test]
    fn test_recording_runner_failure() {
        let runner = RecordingRunner::failing_on("install");
        assert!(runner.run(&ProcessBuilder::new("make")).is_ok());
        assert!(runner.run(&ProcessBuilder::new("make").arg("install")).is_err());
        assert_eq!(runner.command_lines(), vec!["make", "make install"]);
    }
}
