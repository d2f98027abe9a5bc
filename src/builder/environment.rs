//! Environment probing: turn the target OS and compiler identity into the
//! baseline flag set every later step builds on.

use crate::core::{CompilerId, FlagSet, HostOs, TargetTriple};

/// Default C compiler when nothing else is configured.
pub const DEFAULT_CC: &str = "cc";

/// Warnings enabled for GCC-family compilers.
const GCC_WARNINGS: &[&str] = &[
    "-Wall",
    "-Wcast-qual",
    "-Wwrite-strings",
    "-Wconversion",
    "-Wmissing-noreturn",
    "-Winline",
];

/// What the build is running on and with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    /// Target OS identifier as reported by the toolchain (e.g. `linux`,
    /// `mingw32`, `solaris2.11`)
    pub target_os: String,
    pub os: HostOs,
    pub compiler: CompilerId,
    /// `CFLAGS` supplied by the user
    pub user_cflags: Option<String>,
    /// `LIBS` supplied by the user
    pub user_libs: Option<String>,
}

impl Environment {
    pub fn new(target_os: impl Into<String>, compiler: impl Into<String>) -> Self {
        let target_os = target_os.into();
        Environment {
            os: HostOs::from_target_os(&target_os),
            target_os,
            compiler: CompilerId::new(compiler),
            user_cflags: None,
            user_libs: None,
        }
    }

    /// Add the user's own `CFLAGS` and `LIBS`.
    pub fn with_user_flags(mut self, cflags: Option<String>, libs: Option<String>) -> Self {
        self.user_cflags = cflags.filter(|s| !s.trim().is_empty());
        self.user_libs = libs.filter(|s| !s.trim().is_empty());
        self
    }

    /// Probe the process environment. The compiler is taken from
    /// `cc_override`, then `CC`, then [`DEFAULT_CC`].
    pub fn detect(target: &TargetTriple, cc_override: Option<&str>) -> Self {
        let cc = cc_override
            .map(str::to_string)
            .or_else(|| std::env::var("CC").ok().filter(|s| !s.is_empty()))
            .unwrap_or_else(|| DEFAULT_CC.to_string());

        Environment::new(target.os.clone(), cc)
            .with_user_flags(std::env::var("CFLAGS").ok(), std::env::var("LIBS").ok())
    }

    /// Windows targets are always cross-built against SDK-style directories.
    pub fn is_cross_build(&self) -> bool {
        self.os == HostOs::Windows
    }

    pub fn is_darwin(&self) -> bool {
        self.target_os.starts_with("darwin")
    }

    /// Compute the baseline flag set.
    pub fn baseline_flags(&self) -> FlagSet {
        let mut flags = FlagSet::new();

        if let Some(ref cflags) = self.user_cflags {
            flags = flags.with_cflags(cflags);
        }
        if let Some(ref libs) = self.user_libs {
            flags = flags.with_lib_flags(libs);
        }

        flags = match self.os {
            HostOs::Windows => flags
                .with_cflag("-DXP_WIN")
                .with_cflag("-DXP_WIN32")
                .with_cflag("-DUSE_INCLUDED_VASPRINTF"),
            HostOs::Solaris => flags.with_cflag("-DUSE_INCLUDED_VASPRINTF"),
            HostOs::Unix => flags.with_cflag("-g").with_cflag("-DXP_UNIX"),
        };

        if self.compiler.is_cross_toolchain() {
            flags = flags.with_cflag("-DIN_LIBXML").with_lib_flags("-lz");
        }

        if self.compiler.is_gcc_family() {
            if !flags.has_optimization_level() {
                flags = flags.with_cflag("-O3");
            }
            for warning in GCC_WARNINGS {
                flags = flags.with_cflag(*warning);
            }
        }

        tracing::debug!(
            "Baseline flags for {} ({}) with {}: {}",
            self.target_os,
            self.os,
            self.compiler,
            flags.cflags.join(" ")
        );

        flags
    }

    /// Environment variables exported to vendored source builds.
    pub fn build_env(&self) -> Vec<(String, String)> {
        let mut env = vec![("CC".to_string(), self.compiler.command.clone())];
        if self.is_darwin() {
            env.push(("RC_ARCHS".to_string(), String::new()));
        }
        env
    }
}
