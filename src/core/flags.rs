//! Compiler and linker flag sets.
//!
//! A [`FlagSet`] is a plain value. Every `with_*` method consumes the set and
//! returns the extended one, so a caller that only lends out `&FlagSet` keeps
//! its snapshot intact no matter what the borrower tries. Probes rely on this:
//! a failed attempt simply drops its working copy.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static OPTIMIZATION_FLAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(^|\s)-O\d").expect("valid regex"));

/// Accumulated compile and link configuration for the extension.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagSet {
    /// Compiler flags (`CFLAGS`)
    pub cflags: Vec<String>,
    /// Preprocessor flags other than include directories (`CPPFLAGS`)
    pub cppflags: Vec<String>,
    /// Include directories, highest priority first
    pub include_dirs: Vec<PathBuf>,
    /// Linker flags (`LDFLAGS`)
    pub ldflags: Vec<String>,
    /// Library search directories, highest priority first
    pub lib_dirs: Vec<PathBuf>,
    /// Libraries to link, without the `-l` prefix
    pub libs: Vec<String>,
    /// Preprocessor defines discovered by feature checks (`DEFS`)
    pub defines: Vec<String>,
}

impl FlagSet {
    /// Create an empty flag set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append whitespace-separated compiler flags.
    pub fn with_cflags(mut self, flags: &str) -> Self {
        self.cflags
            .extend(flags.split_whitespace().map(str::to_string));
        self
    }

    /// Append a single compiler flag.
    pub fn with_cflag(mut self, flag: impl Into<String>) -> Self {
        self.cflags.push(flag.into());
        self
    }

    /// Append a preprocessor flag.
    pub fn with_cppflag(mut self, flag: impl Into<String>) -> Self {
        self.cppflags.push(flag.into());
        self
    }

    /// Prepend an include directory, skipping duplicates.
    pub fn with_include_dir(mut self, dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref().to_path_buf();
        self.include_dirs.retain(|d| d != &dir);
        self.include_dirs.insert(0, dir);
        self
    }

    /// Prepend a library directory, skipping duplicates.
    pub fn with_lib_dir(mut self, dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref().to_path_buf();
        self.lib_dirs.retain(|d| d != &dir);
        self.lib_dirs.insert(0, dir);
        self
    }

    /// Prepend an include directory unless it is already on the path, in
    /// which case its position is kept.
    pub fn with_include_dir_if_absent(self, dir: impl AsRef<Path>) -> Self {
        if self.include_dirs.iter().any(|d| d == dir.as_ref()) {
            return self;
        }
        self.with_include_dir(dir)
    }

    /// Prepend a library directory unless it is already on the path.
    pub fn with_lib_dir_if_absent(self, dir: impl AsRef<Path>) -> Self {
        if self.lib_dirs.iter().any(|d| d == dir.as_ref()) {
            return self;
        }
        self.with_lib_dir(dir)
    }

    /// Add a library to link. Later libraries go first on the link line,
    /// matching how dependent libraries must precede their dependencies.
    pub fn with_lib(mut self, lib: impl Into<String>) -> Self {
        let lib = lib.into();
        if !self.libs.contains(&lib) {
            self.libs.insert(0, lib);
        }
        self
    }

    /// Append whitespace-separated libraries given in `-lfoo` form.
    pub fn with_lib_flags(mut self, flags: &str) -> Self {
        for flag in flags.split_whitespace() {
            match flag.strip_prefix("-l") {
                Some(lib) => {
                    if !self.libs.iter().any(|l| l == lib) {
                        self.libs.push(lib.to_string());
                    }
                }
                None => self.ldflags.push(flag.to_string()),
            }
        }
        self
    }

    /// Add a feature define (`NAME` or `NAME=VALUE`).
    pub fn with_define(mut self, define: impl Into<String>) -> Self {
        let define = define.into();
        if !self.defines.contains(&define) {
            self.defines.push(define);
        }
        self
    }

    /// Whether an explicit `-O<level>` has already been requested.
    pub fn has_optimization_level(&self) -> bool {
        OPTIMIZATION_FLAG.is_match(&self.cflags.join(" "))
    }

    /// Whether a flag appears in `CFLAGS`.
    pub fn has_cflag(&self, flag: &str) -> bool {
        self.cflags.iter().any(|f| f == flag)
    }

    /// `CPPFLAGS` as passed to the compiler: include dirs first.
    pub fn cppflags_line(&self) -> Vec<String> {
        self.include_dirs
            .iter()
            .map(|d| format!("-I{}", d.display()))
            .chain(self.cppflags.iter().cloned())
            .collect()
    }

    /// `DEFS` as passed to the compiler.
    pub fn defines_line(&self) -> Vec<String> {
        self.defines.iter().map(|d| format!("-D{}", d)).collect()
    }

    /// Library search path flags.
    pub fn libpath_line(&self) -> Vec<String> {
        self.lib_dirs
            .iter()
            .map(|d| format!("-L{}", d.display()))
            .collect()
    }

    /// Libraries as `-l` flags.
    pub fn libs_line(&self) -> Vec<String> {
        self.libs.iter().map(|l| format!("-l{}", l)).collect()
    }
}

impl fmt::Display for FlagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "CFLAGS   = {}", self.cflags.join(" "))?;
        writeln!(f, "CPPFLAGS = {}", self.cppflags_line().join(" "))?;
        writeln!(f, "DEFS     = {}", self.defines_line().join(" "))?;
        writeln!(f, "LDFLAGS  = {}", self.ldflags.join(" "))?;
        writeln!(f, "LIBPATH  = {}", self.libpath_line().join(" "))?;
        write!(f, "LIBS     = {}", self.libs_line().join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_include_dirs_are_prepended() {
        let flags = FlagSet::new()
            .with_include_dir("/usr/include")
            .with_include_dir("/opt/local/include");

        assert_eq!(
            flags.cppflags_line(),
            vec!["-I/opt/local/include", "-I/usr/include"]
        );
    }

    #[test]
    fn test_duplicate_dirs_move_to_front() {
        let flags = FlagSet::new()
            .with_lib_dir("/a")
            .with_lib_dir("/b")
            .with_lib_dir("/a");

        assert_eq!(flags.lib_dirs, vec![PathBuf::from("/a"), PathBuf::from("/b")]);
    }

    #[test]
    fn test_if_absent_keeps_existing_position() {
        let flags = FlagSet::new()
            .with_include_dir("/inc")
            .with_include_dir("/inc/libxml2")
            .with_include_dir_if_absent("/inc")
            .with_include_dir_if_absent("/extra")
            .with_lib_dir("/a")
            .with_lib_dir("/b")
            .with_lib_dir_if_absent("/a");

        assert_eq!(
            flags.include_dirs,
            vec![
                PathBuf::from("/extra"),
                PathBuf::from("/inc/libxml2"),
                PathBuf::from("/inc")
            ]
        );
        assert_eq!(flags.lib_dirs, vec![PathBuf::from("/b"), PathBuf::from("/a")]);
    }

    #[test]
    fn test_optimization_detection() {
        assert!(FlagSet::new().with_cflags("-g -O2").has_optimization_level());
        assert!(!FlagSet::new().with_cflags("-g -Wall").has_optimization_level());
        assert!(!FlagSet::new().with_cflags("-fno-O3ish").has_optimization_level());
    }

    #[test]
    fn test_lib_flags_split() {
        let flags = FlagSet::new().with_lib_flags("-lz -pthread -lm -lz");
        assert_eq!(flags.libs, vec!["z", "m"]);
        assert_eq!(flags.ldflags, vec!["-pthread"]);
    }

    #[test]
    fn test_borrowed_snapshot_is_untouched() {
        let base = FlagSet::new().with_cflag("-g");
        let before = base.clone();

        let attempt = |snapshot: &FlagSet| snapshot.clone().with_include_dir("/nowhere");
        let _discarded = attempt(&base);

        assert_eq!(base, before);
    }
}
