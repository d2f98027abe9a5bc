//! Header and symbol detection.
//!
//! A [`SymbolChecker`] answers two questions against a flag snapshot: does a
//! header preprocess, and does a function link. The free functions on top of
//! it combine those answers the way autoconf-style configure scripts do, and
//! every one of them returns a *new* flag set on success rather than touching
//! the snapshot it was given.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tempfile::TempDir;

use crate::core::{DependencyDescriptor, FlagSet};
use crate::util::process::ProcessBuilder;

/// Compile-and-link probing capability.
pub trait SymbolChecker {
    /// Whether `#include <header>` preprocesses with these flags.
    fn has_header(&self, flags: &FlagSet, header: &str) -> bool;

    /// Whether a program referencing `func` links with these flags.
    fn has_function(&self, flags: &FlagSet, func: &str, header: Option<&str>) -> bool;
}

/// Probes by running the real C compiler on tiny test programs.
pub struct CcChecker {
    program: PathBuf,
    leading_args: Vec<String>,
    work_dir: TempDir,
}

impl CcChecker {
    /// `cc` may carry a wrapper or arguments, e.g. `ccache gcc -m32`.
    pub fn new(cc: &str) -> Result<Self> {
        let mut parts = cc.split_whitespace().map(str::to_string);
        let program = parts.next().unwrap_or_else(|| "cc".to_string());
        let work_dir = tempfile::Builder::new()
            .prefix("extconf-conftest-")
            .tempdir()
            .context("failed to create a scratch directory for compiler checks")?;

        Ok(CcChecker {
            program: PathBuf::from(program),
            leading_args: parts.collect(),
            work_dir,
        })
    }

    fn write_source(&self, source: &str) -> Option<PathBuf> {
        let path = self.work_dir.path().join("conftest.c");
        match std::fs::write(&path, source) {
            Ok(()) => Some(path),
            Err(e) => {
                tracing::warn!("failed to write {}: {}", path.display(), e);
                None
            }
        }
    }

    fn compiler(&self) -> ProcessBuilder {
        ProcessBuilder::new(&self.program)
            .args(&self.leading_args)
            .cwd(self.work_dir.path())
    }

    fn succeeds(&self, cmd: ProcessBuilder) -> bool {
        tracing::trace!("check: {}", cmd.display_command());
        match cmd.exec() {
            Ok(output) => output.status.success(),
            Err(e) => {
                tracing::debug!("{:#}", e);
                false
            }
        }
    }
}

impl SymbolChecker for CcChecker {
    fn has_header(&self, flags: &FlagSet, header: &str) -> bool {
        let Some(source) = self.write_source(&header_program(header)) else {
            return false;
        };
        let cmd = self
            .compiler()
            .args(flags.cppflags_line())
            .args(&flags.cflags)
            .arg("-E")
            .arg(&source)
            .arg("-o")
            .arg(self.work_dir.path().join("conftest.i"));
        self.succeeds(cmd)
    }

    fn has_function(&self, flags: &FlagSet, func: &str, header: Option<&str>) -> bool {
        let exe = self.work_dir.path().join("conftest");
        let link = |program: String| {
            let Some(source) = self.write_source(&program) else {
                return false;
            };
            let cmd = self
                .compiler()
                .args(flags.cppflags_line())
                .args(flags.defines_line())
                .args(&flags.cflags)
                .arg(&source)
                .arg("-o")
                .arg(&exe)
                .args(flags.libpath_line())
                .args(&flags.ldflags)
                .args(flags.libs_line());
            self.succeeds(cmd)
        };

        link(function_program(func, header)) || link(function_program(func, None))
    }
}

fn header_program(header: &str) -> String {
    format!("#include <{}>\n", header)
}

/// Take the function's address through a volatile pointer so the reference
/// survives optimization. Without a header the function is declared by hand.
fn function_program(func: &str, header: Option<&str>) -> String {
    let mut src = String::new();
    match header {
        Some(h) => src.push_str(&header_program(h)),
        None => src.push_str(&format!("extern void {}();\n", func)),
    }
    src.push_str(&format!(
        "int t(void) {{ void ((*volatile p)()); p = (void ((*)())){func}; return !p; }}\n\
         int main(void) {{ return t(); }}\n",
    ));
    src
}

/// Link `func` directly, or by adding `-l<library>`.
pub fn have_func_or_library(
    checker: &dyn SymbolChecker,
    flags: &FlagSet,
    func: &str,
    library: &str,
    header: Option<&str>,
) -> Option<FlagSet> {
    if checker.has_function(flags, func, header) {
        return Some(flags.clone());
    }
    have_library(checker, flags, library, func, header)
}

/// Link `func` with `-l<library>` added.
pub fn have_library(
    checker: &dyn SymbolChecker,
    flags: &FlagSet,
    library: &str,
    func: &str,
    header: Option<&str>,
) -> Option<FlagSet> {
    let candidate = flags.clone().with_lib(library);
    checker
        .has_function(&candidate, func, header)
        .then_some(candidate)
}

/// Search `lib_dirs` (and the current flags first) for a library exporting
/// `func`.
pub fn find_library(
    checker: &dyn SymbolChecker,
    flags: &FlagSet,
    library: &str,
    func: &str,
    lib_dirs: &[PathBuf],
) -> Option<FlagSet> {
    if let Some(found) = have_library(checker, flags, library, func, None) {
        return Some(found);
    }
    lib_dirs.iter().find_map(|dir| {
        let candidate = flags.clone().with_lib_dir(dir);
        have_library(checker, &candidate, library, func, None)
    })
}

/// Header present and any of the descriptor's symbols links.
pub fn detect(
    checker: &dyn SymbolChecker,
    flags: &FlagSet,
    dep: &DependencyDescriptor,
) -> Option<FlagSet> {
    let header = (!dep.header.is_empty()).then_some(dep.header);
    if let Some(h) = header {
        if !checker.has_header(flags, h) {
            tracing::debug!("{}: header <{}> not found", dep.name, h);
            return None;
        }
    }

    dep.symbols
        .iter()
        .find_map(|sym| have_func_or_library(checker, flags, sym, dep.library, header))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::dependency::{ICONV, XML2};
    use crate::test_support::FakeChecker;

    #[test]
    fn test_function_program_with_header() {
        let src = function_program("xmlParseDoc", Some("libxml/parser.h"));
        assert!(src.starts_with("#include <libxml/parser.h>\n"));
        assert!(src.contains("(void ((*)()))xmlParseDoc;"));
        assert!(src.contains("int main(void)"));
    }

    #[test]
    fn test_function_program_without_header() {
        let src = function_program("ProfilerEnable", None);
        assert!(src.starts_with("extern void ProfilerEnable();"));
    }

    #[test]
    fn test_have_func_prefers_direct_link() {
        let checker = FakeChecker::new().function("iconv_open", None);
        let flags = FlagSet::new();

        let found = have_func_or_library(&checker, &flags, "iconv_open", "iconv", None).unwrap();
        assert!(found.libs.is_empty());
    }

    #[test]
    fn test_have_library_adds_lib() {
        let checker = FakeChecker::new().function("libiconv_open", Some("iconv"));
        let flags = FlagSet::new();

        let found =
            have_func_or_library(&checker, &flags, "libiconv_open", "iconv", None).unwrap();
        assert_eq!(found.libs, vec!["iconv"]);
        assert!(flags.libs.is_empty());
    }

    #[test]
    fn test_detect_any_symbol() {
        let checker = FakeChecker::new()
            .header("iconv.h", None)
            .function("libiconv_open", Some("iconv"));

        let found = detect(&checker, &FlagSet::new(), &ICONV).unwrap();
        assert_eq!(found.libs, vec!["iconv"]);
    }

    #[test]
    fn test_detect_requires_header() {
        let checker = FakeChecker::new().function("xmlParseDoc", Some("xml2"));
        assert!(detect(&checker, &FlagSet::new(), &XML2).is_none());
    }

    #[test]
    fn test_find_library_searches_dirs() {
        let checker = FakeChecker::new().function_in("ProfilerEnable", "profiler", "/opt/lib");
        let dirs = vec![PathBuf::from("/usr/lib"), PathBuf::from("/opt/lib")];

        let found = find_library(&checker, &FlagSet::new(), "profiler", "ProfilerEnable", &dirs)
            .unwrap();
        assert_eq!(found.lib_dirs, vec![PathBuf::from("/opt/lib")]);
        assert_eq!(found.libs, vec!["profiler"]);
    }

    #[test]
    #[cfg(unix)]
    fn test_missing_compiler_fails_closed() {
        let checker = CcChecker::new("/nonexistent/bin/cc").unwrap();
        assert!(!checker.has_header(&FlagSet::new(), "stdio.h"));
        assert!(!checker.has_function(&FlagSet::new(), "printf", Some("stdio.h")));
    }
}
