//! Host platform and compiler identity.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Operating system branch that decides the baseline flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostOs {
    /// mingw32, mswin and friends
    Windows,
    Solaris,
    /// Linux, macOS, the BSDs
    Unix,
}

impl HostOs {
    /// Classify a target OS identifier such as `linux-gnu`, `mingw32`,
    /// `solaris2.11` or `darwin21`.
    pub fn from_target_os(os: &str) -> Self {
        let os = os.to_ascii_lowercase();
        if os == "mingw32" || os.contains("mswin") || os.contains("windows") {
            HostOs::Windows
        } else if os.contains("solaris") {
            HostOs::Solaris
        } else {
            HostOs::Unix
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HostOs::Windows => "windows",
            HostOs::Solaris => "solaris",
            HostOs::Unix => "unix",
        }
    }
}

impl fmt::Display for HostOs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the configured C compiler command says about its vendor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilerId {
    /// The compiler command as configured (e.g. `x86_64-w64-mingw32-gcc`)
    pub command: String,
}

impl CompilerId {
    pub fn new(command: impl Into<String>) -> Self {
        CompilerId {
            command: command.into(),
        }
    }

    /// GCC-family drivers accept GCC's optimization and warning flags.
    pub fn is_gcc_family(&self) -> bool {
        self.command.contains("gcc")
    }

    /// A mingw cross toolchain.
    pub fn is_cross_toolchain(&self) -> bool {
        self.command.contains("mingw")
    }
}

impl fmt::Display for CompilerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.command)
    }
}

/// Target triple components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetTriple {
    /// CPU architecture (x86_64, aarch64, etc.)
    pub arch: String,
    /// Vendor (unknown, apple, pc, w64, etc.)
    pub vendor: String,
    /// Operating system (linux, darwin, mingw32, etc.)
    pub os: String,
    /// Environment/ABI (gnu, musl, etc.)
    pub env: Option<String>,
}

impl TargetTriple {
    pub fn new(arch: &str, vendor: &str, os: &str, env: Option<&str>) -> Self {
        TargetTriple {
            arch: arch.to_string(),
            vendor: vendor.to_string(),
            os: os.to_string(),
            env: env.map(|s| s.to_string()),
        }
    }

    /// The triple of the machine running the build, spelled the way
    /// autoconf's `config.guess` would.
    pub fn host() -> Self {
        let arch = std::env::consts::ARCH;
        match std::env::consts::OS {
            "linux" => TargetTriple::new(arch, "unknown", "linux", Some("gnu")),
            "macos" => TargetTriple::new(arch, "apple", "darwin", None),
            "windows" => TargetTriple::new(arch, "w64", "mingw32", None),
            "solaris" | "illumos" => TargetTriple::new(arch, "pc", "solaris2", None),
            os => TargetTriple::new(arch, "unknown", os, None),
        }
    }

    /// Parse a target triple string.
    pub fn parse(s: &str) -> Option<Self> {
        let parts: Vec<&str> = s.split('-').collect();
        if parts.len() < 3 || parts.iter().any(|p| p.is_empty()) {
            return None;
        }

        Some(TargetTriple {
            arch: parts[0].to_string(),
            vendor: parts[1].to_string(),
            os: parts[2].to_string(),
            env: parts.get(3).map(|s| s.to_string()),
        })
    }

    pub fn host_os(&self) -> HostOs {
        HostOs::from_target_os(&self.os)
    }

    pub fn is_darwin(&self) -> bool {
        self.os.starts_with("darwin")
    }
}

impl fmt::Display for TargetTriple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.env {
            Some(env) => write!(f, "{}-{}-{}-{}", self.arch, self.vendor, self.os, env),
            None => write!(f, "{}-{}-{}", self.arch, self.vendor, self.os),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_os_classification() {
        assert_eq!(HostOs::from_target_os("mingw32"), HostOs::Windows);
        assert_eq!(HostOs::from_target_os("mswin64"), HostOs::Windows);
        assert_eq!(HostOs::from_target_os("solaris2.11"), HostOs::Solaris);
        assert_eq!(HostOs::from_target_os("linux-gnu"), HostOs::Unix);
        assert_eq!(HostOs::from_target_os("darwin21"), HostOs::Unix);
    }

    #[test]
    fn test_compiler_family() {
        let mingw = CompilerId::new("x86_64-w64-mingw32-gcc");
        assert!(mingw.is_gcc_family());
        assert!(mingw.is_cross_toolchain());

        let clang = CompilerId::new("clang");
        assert!(!clang.is_gcc_family());
        assert!(!clang.is_cross_toolchain());
    }

    #[test]
    fn test_triple_roundtrip_display() {
        let triple = TargetTriple::parse("x86_64-w64-mingw32").unwrap();
        assert_eq!(triple.os, "mingw32");
        assert_eq!(triple.host_os(), HostOs::Windows);
        assert_eq!(triple.to_string(), "x86_64-w64-mingw32");

        let triple = TargetTriple::parse("x86_64-unknown-linux-gnu").unwrap();
        assert_eq!(triple.env.as_deref(), Some("gnu"));
        assert_eq!(triple.to_string(), "x86_64-unknown-linux-gnu");
    }

    #[test]
    fn test_triple_rejects_short_input() {
        assert!(TargetTriple::parse("x86_64").is_none());
        assert!(TargetTriple::parse("x86_64--linux").is_none());
    }
}
