//! Choosing how the XML libraries are provided.

use std::fmt;

use serde::Serialize;

use crate::builder::Environment;

/// Environment variable that requests system libraries.
pub const USE_SYSTEM_LIBRARIES_ENV: &str = "EXTCONF_USE_SYSTEM_LIBRARIES";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BuildMode {
    /// Windows target: commit SDK-style directories without probing
    CrossBuild,
    /// Locate libxml2/libxslt already installed on the system
    System,
    /// Build pinned libxml2/libxslt from source under the ports directory
    Packaged,
}

impl BuildMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildMode::CrossBuild => "cross-build",
            BuildMode::System => "system",
            BuildMode::Packaged => "packaged",
        }
    }
}

impl fmt::Display for BuildMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the system-libraries request came from, highest precedence first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SystemLibrariesRequest {
    /// `--use-system-libraries` on the command line
    pub cli: bool,
    /// `EXTCONF_USE_SYSTEM_LIBRARIES`, when set
    pub env: Option<bool>,
    /// `[build] use_system_libraries`, when set
    pub config: Option<bool>,
}

impl SystemLibrariesRequest {
    pub fn requested(&self) -> bool {
        self.cli || self.env.or(self.config).unwrap_or(false)
    }
}

/// Cross-building wins over everything; then an explicit request for system
/// libraries; otherwise the libraries are packaged.
pub fn select_mode(env: &Environment, request: SystemLibrariesRequest) -> BuildMode {
    let mode = if env.is_cross_build() {
        BuildMode::CrossBuild
    } else if request.requested() {
        BuildMode::System
    } else {
        BuildMode::Packaged
    };
    tracing::debug!("Selected {} mode for {}", mode, env.target_os);
    mode
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linux() -> Environment {
        Environment::new("linux", "gcc")
    }

    #[test]
    fn test_cross_build_wins() {
        let env = Environment::new("mingw32", "x86_64-w64-mingw32-gcc");
        let request = SystemLibrariesRequest {
            cli: true,
            ..Default::default()
        };
        assert_eq!(select_mode(&env, request), BuildMode::CrossBuild);
    }

    #[test]
    fn test_default_is_packaged() {
        assert_eq!(
            select_mode(&linux(), SystemLibrariesRequest::default()),
            BuildMode::Packaged
        );
    }

    #[test]
    fn test_request_precedence() {
        let env_off_config_on = SystemLibrariesRequest {
            cli: false,
            env: Some(false),
            config: Some(true),
        };
        assert_eq!(select_mode(&linux(), env_off_config_on), BuildMode::Packaged);

        let config_only = SystemLibrariesRequest {
            config: Some(true),
            ..Default::default()
        };
        assert_eq!(select_mode(&linux(), config_only), BuildMode::System);

        let cli_over_env = SystemLibrariesRequest {
            cli: true,
            env: Some(false),
            config: Some(false),
        };
        assert_eq!(select_mode(&linux(), cli_over_env), BuildMode::System);
    }
}
