//! The `configure` pipeline.
//!
//! Baseline flags from the environment, then the libraries according to the
//! build mode, then the profiler, then the final symbol checks. The result is
//! a [`BuildPlan`] ready to be written out.

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::builder::checker::find_library;
use crate::builder::strategy::{OPT_PREFIXES, SYSTEM_PREFIX};
use crate::builder::{Candidate, Environment, Located, Locator, SymbolChecker};
use crate::core::dependency::{DEPENDENCIES, EXSLT, PROFILER, XML2, XSLT, ZLIB};
use crate::core::{DependencyDescriptor, FlagSet, VersionManifest};
use crate::ops::emit::{self, BuildPlan};
use crate::ops::mode::BuildMode;
use crate::ports::{Activation, PortBuilder, PortsLayout, LIBXML2, LIBXSLT};
use crate::util::config::CrossConfig;
use crate::util::diagnostic::FatalError;

/// Extension built when none is configured.
pub const DEFAULT_EXTENSION: &str = "xmlext/xmlext";

#[derive(Debug, Clone)]
pub struct ConfigureOptions {
    pub mode: BuildMode,
    /// Extension path, e.g. `xmlext/xmlext`
    pub extension: String,
    /// Directory holding the extension's C sources
    pub source_dir: PathBuf,
    pub ports: PortsLayout,
    pub cross: CrossConfig,
    pub enable_profiler: bool,
}

/// Run the whole pipeline and return the finished plan.
pub fn configure(
    opts: &ConfigureOptions,
    env: &Environment,
    locator: &Locator<'_>,
    ports: &PortBuilder<'_>,
    manifest: &VersionManifest,
) -> Result<BuildPlan> {
    tracing::info!(
        "Configuring {} for {} with {} ({} libraries)",
        opts.extension,
        env.target_os,
        env.compiler,
        opts.mode
    );

    let sources = emit::collect_sources(&opts.source_dir)?;
    let base = env.baseline_flags();
    let (flags, located, packaged) = match opts.mode {
        BuildMode::CrossBuild => {
            let (flags, located) = cross_build(base, &opts.cross, &opts.ports.host);
            (flags, located, Vec::new())
        }
        BuildMode::System => {
            let (flags, located) = system_libraries(locator, base)?;
            (flags, located, Vec::new())
        }
        BuildMode::Packaged => packaged_libraries(opts, locator, ports, manifest, base)?,
    };

    let checker = locator.checker();
    let flags = profiler(checker, flags, opts.enable_profiler)?;
    let flags = emit::verify_required(checker, flags, locator.support_url())?;
    let (flags, have_functions) = emit::detect_optional(checker, flags);

    Ok(BuildPlan {
        mode: opts.mode,
        target_os: env.target_os.clone(),
        cc: env.compiler.command.clone(),
        extension: opts.extension.clone(),
        source_dir: opts.source_dir.clone(),
        dlext: emit::dlext(env),
        flags,
        located,
        packaged,
        have_functions,
        sources,
    })
}

/// Locate every dependency on the system.
pub fn system_libraries(locator: &Locator<'_>, flags: FlagSet) -> Result<(FlagSet, Vec<Located>)> {
    let mut flags = flags;
    let mut located = Vec::new();
    for dep in DEPENDENCIES {
        if let Some(found) = locator.locate(dep, &flags)? {
            flags = found.flags.clone();
            located.push(found);
        }
    }
    Ok((flags, located))
}

/// Build libxml2 and libxslt from source and point the flags at them.
pub fn packaged_libraries(
    opts: &ConfigureOptions,
    locator: &Locator<'_>,
    ports: &PortBuilder<'_>,
    manifest: &VersionManifest,
    flags: FlagSet,
) -> Result<(FlagSet, Vec<Located>, Vec<Activation>)> {
    let mut flags = flags;
    let mut located = Vec::new();
    if let Some(zlib) = locator.locate(&ZLIB, &flags)? {
        flags = zlib.flags.clone();
        located.push(zlib);
    }

    let iconv_prefix = locator.iconv_prefix(&flags)?;

    let libxml2 = opts
        .ports
        .libxml2(manifest.require(LIBXML2)?, &iconv_prefix)?;
    let xml = ports.process(&libxml2)?;

    let libxslt = opts.ports.libxslt(manifest.require(LIBXSLT)?, &libxml2)?;
    let xslt = ports.process(&libxslt)?;

    let flags = activate_packaged(flags, &xml, &xslt, &define_prefix(&opts.extension));
    Ok((flags, located, vec![xml, xslt]))
}

/// Put the vendored installs first on the include and library paths and
/// record where they live.
pub fn activate_packaged(flags: FlagSet, xml: &Activation, xslt: &Activation, prefix: &str) -> FlagSet {
    flags
        .with_lib_dir(&xslt.lib_dir)
        .with_lib_dir(&xml.lib_dir)
        .with_include_dir(&xslt.include_dir)
        .with_include_dir(xml.include_dir.join("libxml2"))
        .with_define(format!("{}_USE_PACKAGED_LIBRARIES", prefix))
        .with_define(format!("{}_LIBXML2_PATH=\"{}\"", prefix, xml.prefix.display()))
        .with_define(format!("{}_LIBXSLT_PATH=\"{}\"", prefix, xslt.prefix.display()))
}

/// Commit SDK-style directories for a Windows cross build. Nothing is probed.
/// A directory keeps the position of its first commit, so the result is
/// `<inc>/libxml2` ahead of `<inc>`.
pub fn cross_build(flags: FlagSet, cross: &CrossConfig, host: &str) -> (FlagSet, Vec<Located>) {
    let sysroot = Path::new(SYSTEM_PREFIX).join(host);
    let inc = cross
        .include_dir
        .clone()
        .unwrap_or_else(|| sysroot.join("include"));
    let lib = cross.lib_dir.clone().unwrap_or_else(|| sysroot.join("lib"));

    let plan: [(&DependencyDescriptor, Candidate); 4] = [
        (&ZLIB, Candidate::new("cross").include(&inc).lib(&lib)),
        (
            &XML2,
            Candidate::new("cross").include(inc.join("libxml2")).include(&inc),
        ),
        (&XSLT, Candidate::new("cross").include(&inc)),
        (&EXSLT, Candidate::new("cross").include(&inc)),
    ];

    let mut flags = flags;
    let mut located = Vec::new();
    for (dep, candidate) in plan {
        flags = candidate.apply_missing(&flags);
        tracing::debug!("Cross build: using {} from {}", dep.display_name(), inc.display());
        located.push(Located {
            dependency: dep.name,
            candidate,
            flags: flags.clone(),
        });
    }
    (flags, located)
}

/// Link the Google performance tools profiler when enabled.
pub fn profiler(checker: &dyn SymbolChecker, flags: FlagSet, enabled: bool) -> Result<FlagSet> {
    if !enabled {
        return Ok(flags);
    }

    let lib_dirs: Vec<PathBuf> = OPT_PREFIXES
        .iter()
        .chain(std::iter::once(&SYSTEM_PREFIX))
        .map(|prefix| Path::new(prefix).join("lib"))
        .collect();

    let found = find_library(
        checker,
        &flags,
        PROFILER.library,
        PROFILER.primary_symbol(),
        &lib_dirs,
    )
    .ok_or(FatalError::ProfilerMissing)?;
    tracing::info!("Profiling enabled");
    Ok(found)
}

/// Define prefix for an extension: `xmlext/xmlext` → `XMLEXT`.
pub fn define_prefix(extension: &str) -> String {
    emit::target_name(extension)
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}
