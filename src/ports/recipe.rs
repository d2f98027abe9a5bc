//! Build recipes for vendored libraries.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// One library to build from source at a pinned version.
///
/// The recipe fully determines where the library is installed and where its
/// checkpoint marker lives, so two runs with the same recipe share both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    pub name: String,
    pub version: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    /// Ports directory everything is installed under
    pub target: PathBuf,
    /// Host triple passed to `configure --host`
    pub host: String,
    #[serde(default)]
    pub configure_options: Vec<String>,
}

impl Recipe {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        target: impl Into<PathBuf>,
        host: impl Into<String>,
    ) -> Self {
        Recipe {
            name: name.into(),
            version: version.into(),
            url: String::new(),
            sha256: None,
            target: target.into(),
            host: host.into(),
            configure_options: Vec::new(),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_sha256(mut self, sha256: Option<&str>) -> Self {
        self.sha256 = sha256.map(str::to_string);
        self
    }

    pub fn with_configure_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.configure_options
            .extend(options.into_iter().map(Into::into));
        self
    }

    /// Install prefix: `<target>/<host>/<name>/<version>`.
    pub fn path(&self) -> PathBuf {
        self.target
            .join(&self.host)
            .join(&self.name)
            .join(&self.version)
    }

    /// Completion marker: `<target>/<name>-<version>-<host>.installed`.
    pub fn checkpoint(&self) -> PathBuf {
        self.target.join(format!(
            "{}-{}-{}.installed",
            self.name, self.version, self.host
        ))
    }

    /// Scratch directory the tarball is extracted into.
    pub fn work_dir(&self) -> PathBuf {
        self.target
            .join("tmp")
            .join(&self.host)
            .join(&self.name)
            .join(&self.version)
    }

    /// Top-level directory inside the release tarball.
    pub fn archive_prefix(&self) -> String {
        format!("{}-{}", self.name, self.version)
    }

    pub fn is_installed(&self) -> bool {
        self.checkpoint().is_file()
    }

    pub fn include_dir(&self) -> PathBuf {
        self.path().join("include")
    }

    pub fn lib_dir(&self) -> PathBuf {
        self.path().join("lib")
    }

    /// Every argument given to `configure`.
    pub fn configure_args(&self) -> Vec<String> {
        let mut args = vec![
            format!("--prefix={}", self.path().display()),
            format!("--host={}", self.host),
        ];
        args.extend(self.configure_options.iter().cloned());
        args
    }

    /// Record this recipe as the checkpoint marker.
    pub fn write_checkpoint(&self) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .with_context(|| format!("failed to serialize recipe for {}", self.name))?;
        crate::util::fs::write_string(&self.checkpoint(), &contents)
    }

    /// Read back the recipe a checkpoint marker was written from.
    pub fn read_checkpoint(path: &Path) -> Result<Recipe> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read checkpoint: {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("failed to parse checkpoint: {}", path.display()))
    }
}

/// Fill a mirror template. Recognised placeholders: `{name}`, `{version}`,
/// `{major}`, `{minor}` and `{patch}`.
pub fn source_url(template: &str, name: &str, version: &str) -> Result<String> {
    let parsed = semver::Version::parse(version)
        .with_context(|| format!("invalid version `{}` for {}", version, name))?;

    Ok(template
        .replace("{name}", name)
        .replace("{version}", version)
        .replace("{major}", &parsed.major.to_string())
        .replace("{minor}", &parsed.minor.to_string())
        .replace("{patch}", &parsed.patch.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn libxml2(target: &Path) -> Recipe {
        Recipe::new("libxml2", "2.9.1", target, "x86_64-unknown-linux-gnu")
            .with_configure_options(["--enable-shared", "--without-python"])
    }

    #[test]
    fn test_recipe_paths() {
        let recipe = libxml2(Path::new("/proj/ports"));
        assert_eq!(
            recipe.path(),
            PathBuf::from("/proj/ports/x86_64-unknown-linux-gnu/libxml2/2.9.1")
        );
        assert_eq!(
            recipe.checkpoint(),
            PathBuf::from("/proj/ports/libxml2-2.9.1-x86_64-unknown-linux-gnu.installed")
        );
        assert_eq!(recipe.include_dir(), recipe.path().join("include"));
        assert_eq!(recipe.archive_prefix(), "libxml2-2.9.1");
    }

    #[test]
    fn test_configure_args_order() {
        let recipe = libxml2(Path::new("/p"));
        let args = recipe.configure_args();
        assert_eq!(args[0], "--prefix=/p/x86_64-unknown-linux-gnu/libxml2/2.9.1");
        assert_eq!(args[1], "--host=x86_64-unknown-linux-gnu");
        assert_eq!(&args[2..], ["--enable-shared", "--without-python"]);
    }

    #[test]
    fn test_checkpoint_records_recipe() {
        let tmp = TempDir::new().unwrap();
        let recipe = libxml2(tmp.path()).with_url("http://mirror/libxml2-2.9.1.tar.gz");

        assert!(!recipe.is_installed());
        recipe.write_checkpoint().unwrap();
        assert!(recipe.is_installed());

        let recorded = Recipe::read_checkpoint(&recipe.checkpoint()).unwrap();
        assert_eq!(recorded, recipe);
    }

    #[test]
    fn test_source_url_template() {
        let url = source_url(
            "https://download.gnome.org/sources/{name}/{major}.{minor}/{name}-{version}.tar.gz",
            "libxml2",
            "2.9.1",
        )
        .unwrap();
        assert_eq!(
            url,
            "https://download.gnome.org/sources/libxml2/2.9/libxml2-2.9.1.tar.gz"
        );

        assert!(source_url("{name}", "libxml2", "latest").is_err());
    }
}
