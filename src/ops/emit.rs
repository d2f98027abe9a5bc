//! Final symbol checks and Makefile generation.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Serialize;

use crate::builder::checker::have_func_or_library;
use crate::builder::{Environment, Located, SymbolChecker};
use crate::core::dependency::{have_define, LINKED_LIBRARIES, OPTIONAL_FUNCTIONS, REQUIRED_FUNCTIONS};
use crate::core::{FlagSet, HostOs};
use crate::ops::mode::BuildMode;
use crate::ports::Activation;
use crate::util::diagnostic::FatalError;
use crate::util::fs::{glob_files, write_string};

/// Name of the generated build file.
pub const MAKEFILE: &str = "Makefile";

/// Everything the generated Makefile is made from.
#[derive(Debug, Clone, Serialize)]
pub struct BuildPlan {
    pub mode: BuildMode,
    pub target_os: String,
    pub cc: String,
    /// Extension path, e.g. `xmlext/xmlext`
    pub extension: String,
    pub source_dir: PathBuf,
    pub dlext: &'static str,
    pub flags: FlagSet,
    pub located: Vec<Located>,
    pub packaged: Vec<Activation>,
    /// Optional functions that were found
    pub have_functions: Vec<String>,
    /// Source file names relative to `source_dir`
    pub sources: Vec<String>,
}

impl BuildPlan {
    /// Shared-object base name: the last component of the extension path.
    pub fn target_name(&self) -> &str {
        target_name(&self.extension)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("failed to serialize build plan")
    }
}

pub fn target_name(extension: &str) -> &str {
    extension.rsplit('/').next().unwrap_or(extension)
}

/// Shared-object extension for the target platform.
pub fn dlext(env: &Environment) -> &'static str {
    match env.os {
        HostOs::Windows => "dll",
        _ if env.is_darwin() => "bundle",
        _ => "so",
    }
}

/// `*.c` files directly in `source_dir`, sorted. The directory ends up in
/// a pattern rule's prerequisite, which make cannot express with whitespace.
pub fn collect_sources(source_dir: &Path) -> Result<Vec<String>> {
    if source_dir.to_string_lossy().contains(char::is_whitespace) {
        bail!(
            "source directory `{}` contains whitespace\n\
             help: move the extension sources to a path without spaces",
            source_dir.display()
        );
    }
    Ok(glob_files(source_dir, &["*.c"])?
        .iter()
        .filter_map(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .collect())
}

/// Every linked library must export its primary symbol, and every required
/// function must be present. Missing pieces are fatal.
pub fn verify_required(
    checker: &dyn SymbolChecker,
    flags: FlagSet,
    support_url: &str,
) -> Result<FlagSet> {
    let flags = LINKED_LIBRARIES.iter().try_fold(flags, |flags, dep| {
        have_func_or_library(
            checker,
            &flags,
            dep.primary_symbol(),
            dep.library,
            Some(dep.header),
        )
        .ok_or_else(|| FatalError::MissingLibrary {
            library: dep.display_name(),
            support_url: support_url.to_string(),
        })
    })?;

    for func in REQUIRED_FUNCTIONS {
        if !checker.has_function(&flags, func.name, None) {
            return Err(FatalError::MissingSymbol {
                symbol: func.name.to_string(),
                library: func.library.to_string(),
                support_url: support_url.to_string(),
            }
            .into());
        }
    }

    Ok(flags)
}

/// Add a `HAVE_<NAME>` define for each optional function that links.
pub fn detect_optional(checker: &dyn SymbolChecker, flags: FlagSet) -> (FlagSet, Vec<String>) {
    let mut found = Vec::new();
    let mut flags = flags;
    for func in OPTIONAL_FUNCTIONS {
        if checker.has_function(&flags, func, None) {
            flags = flags.with_define(have_define(func));
            found.push(func.to_string());
        } else {
            tracing::debug!("{} not available", func);
        }
    }
    (flags, found)
}

/// Render the Makefile for a finished plan.
pub fn render_makefile(plan: &BuildPlan) -> String {
    let flags = &plan.flags;
    let windows = plan.dlext == "dll";
    let pic = if windows { "" } else { " -fPIC" };
    let ldshared = if plan.dlext == "bundle" {
        "$(CC) -dynamic -bundle -undefined dynamic_lookup"
    } else {
        "$(CC) -shared"
    };

    let mut out = String::new();
    let _ = writeln!(out, "# Generated by extconf ({} mode). Do not edit.", plan.mode);
    let _ = writeln!(out);
    let _ = writeln!(out, "SHELL = /bin/sh");
    let _ = writeln!(
        out,
        "srcdir = {}",
        plan.source_dir.display().to_string().replace('$', "$$")
    );
    let _ = writeln!(out, "TARGET = {}", plan.target_name());
    let _ = writeln!(out, "DLEXT = {}", plan.dlext);
    let _ = writeln!(out, "DLLIB = $(TARGET).$(DLEXT)");
    let _ = writeln!(out);
    let _ = writeln!(out, "CC = {}", plan.cc);
    let _ = writeln!(out, "CFLAGS = {}", make_line(&flags.cflags));
    let _ = writeln!(out, "CPPFLAGS = {}", make_line(&flags.cppflags_line()));
    let _ = writeln!(out, "DEFS = {}", make_line(&flags.defines_line()));
    let _ = writeln!(out, "LDFLAGS = {}", make_line(&flags.ldflags));
    let _ = writeln!(out, "LIBPATH = {}", make_line(&flags.libpath_line()));
    let _ = writeln!(out, "LIBS = {}", make_line(&flags.libs_line()));
    let _ = writeln!(out, "LDSHARED = {}", ldshared);
    let _ = writeln!(out);
    let _ = writeln!(out, "SRCS = {}", make_line(&plan.sources));
    let _ = writeln!(out, "OBJS = $(SRCS:.c=.o)");
    let _ = writeln!(out);
    let _ = writeln!(out, "all: $(DLLIB)");
    let _ = writeln!(out);
    let _ = writeln!(out, "$(DLLIB): $(OBJS)");
    let _ = writeln!(out, "\t$(LDSHARED) -o $@ $(OBJS) $(LDFLAGS) $(LIBPATH) $(LIBS)");
    let _ = writeln!(out);
    let _ = writeln!(out, "%.o: $(srcdir)/%.c");
    let _ = writeln!(out, "\t$(CC) $(CFLAGS){} $(CPPFLAGS) $(DEFS) -c $< -o $@", pic);
    let _ = writeln!(out);
    let _ = writeln!(out, "clean:");
    let _ = writeln!(out, "\trm -f $(OBJS) $(DLLIB)");
    let _ = writeln!(out);
    let _ = writeln!(out, ".PHONY: all clean");
    out
}

/// Write the Makefile into `output_dir`.
pub fn write_makefile(plan: &BuildPlan, output_dir: &Path) -> Result<PathBuf> {
    let path = output_dir.join(MAKEFILE);
    write_string(&path, &render_makefile(plan))?;
    tracing::info!("Wrote {}", path.display());
    Ok(path)
}

fn make_line<S: AsRef<str>>(words: &[S]) -> String {
    words
        .iter()
        .map(|w| make_word(w.as_ref()))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Quote a word for a make recipe line: `$` doubles, and words with quotes or
/// whitespace are single-quoted for the shell.
fn make_word(word: &str) -> String {
    let escaped = word.replace('$', "$$");
    if escaped.contains(['"', '\'', ' ', '\t']) {
        format!("'{}'", escaped.replace('\'', r"'\''"))
    } else {
        escaped
    }
}
