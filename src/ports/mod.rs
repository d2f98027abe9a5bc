//! Vendored builds of libxml2 and libxslt.
//!
//! A [`Recipe`] names a pinned source release and where it installs.
//! [`PortBuilder::process`] cooks it once (download, extract, configure,
//! make, install) and afterwards only activates the existing install, gated
//! by the recipe's checkpoint marker.

pub mod archive;
pub mod fetch;
pub mod recipe;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::core::manifest::PinnedVersion;
use crate::core::FlagSet;
use crate::util::fs::remove_dir_all_if_exists;
use crate::util::hash::verify_sha256;
use crate::util::process::{find_make, CommandRunner, ProcessBuilder};
use crate::util::progress::Step;

pub use fetch::{Fetcher, HttpFetcher};
pub use recipe::{source_url, Recipe};

pub const LIBXML2: &str = "libxml2";
pub const LIBXSLT: &str = "libxslt";

/// The directories an installed recipe contributes to a build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Activation {
    pub name: String,
    pub version: String,
    pub prefix: PathBuf,
    pub include_dir: PathBuf,
    pub lib_dir: PathBuf,
}

impl Activation {
    pub fn of(recipe: &Recipe) -> Self {
        Activation {
            name: recipe.name.clone(),
            version: recipe.version.clone(),
            prefix: recipe.path(),
            include_dir: recipe.include_dir(),
            lib_dir: recipe.lib_dir(),
        }
    }

    /// `flags` with this install's include and lib directories in front.
    pub fn apply(&self, flags: &FlagSet) -> FlagSet {
        flags
            .clone()
            .with_lib_dir(&self.lib_dir)
            .with_include_dir(&self.include_dir)
    }
}

/// Runs recipes through fetch and build.
pub struct PortBuilder<'a> {
    fetcher: &'a dyn Fetcher,
    runner: &'a dyn CommandRunner,
    make: PathBuf,
    env: Vec<(String, String)>,
}

impl<'a> PortBuilder<'a> {
    pub fn new(fetcher: &'a dyn Fetcher, runner: &'a dyn CommandRunner) -> Self {
        PortBuilder {
            fetcher,
            runner,
            make: find_make(),
            env: Vec::new(),
        }
    }

    pub fn with_make(mut self, make: impl Into<PathBuf>) -> Self {
        self.make = make.into();
        self
    }

    /// Environment applied to configure and make.
    pub fn with_env(mut self, env: Vec<(String, String)>) -> Self {
        self.env = env;
        self
    }

    /// Ensure the recipe is installed, then activate it. With the checkpoint
    /// present nothing is fetched or run.
    pub fn process(&self, recipe: &Recipe) -> Result<Activation> {
        if recipe.is_installed() {
            tracing::info!(
                "Using {} {} from {}",
                recipe.name,
                recipe.version,
                recipe.path().display()
            );
        } else {
            self.cook(recipe)
                .with_context(|| format!("failed to build {} {}", recipe.name, recipe.version))?;
            recipe.write_checkpoint()?;
        }

        Ok(Activation::of(recipe))
    }

    /// Download, extract, configure, compile and install. Writes no marker.
    pub fn cook(&self, recipe: &Recipe) -> Result<()> {
        let data = self.download(recipe)?;
        self.extract(recipe, &data)?;
        self.configure(recipe)?;
        self.compile(recipe)?;
        self.install(recipe)
    }

    fn download(&self, recipe: &Recipe) -> Result<Vec<u8>> {
        let step = Step::start(format!("Downloading {}", recipe.url));
        let data = self.fetcher.fetch(&recipe.url)?;
        if let Some(expected) = &recipe.sha256 {
            verify_sha256(&data, expected, &recipe.archive_prefix())?;
        }
        step.finish();
        Ok(data)
    }

    fn extract(&self, recipe: &Recipe, data: &[u8]) -> Result<()> {
        let step = Step::start(format!("Extracting {}", recipe.archive_prefix()));
        let work_dir = recipe.work_dir();
        remove_dir_all_if_exists(&work_dir)?;
        archive::extract_tarball(data, &work_dir, Some(&recipe.archive_prefix()))?;
        step.finish();
        Ok(())
    }

    fn configure(&self, recipe: &Recipe) -> Result<()> {
        let step = Step::start(format!("Configuring {} {}", recipe.name, recipe.version));
        let cmd = self
            .command("sh", recipe)
            .arg("configure")
            .args(recipe.configure_args());
        self.runner.run(&cmd)?;
        step.finish();
        Ok(())
    }

    fn compile(&self, recipe: &Recipe) -> Result<()> {
        let step = Step::start(format!("Compiling {} {}", recipe.name, recipe.version));
        self.runner.run(&self.command(&self.make, recipe))?;
        step.finish();
        Ok(())
    }

    fn install(&self, recipe: &Recipe) -> Result<()> {
        let step = Step::start(format!("Installing {} {}", recipe.name, recipe.version));
        self.runner
            .run(&self.command(&self.make, recipe).arg("install"))?;
        step.finish();
        Ok(())
    }

    fn command(&self, program: impl AsRef<Path>, recipe: &Recipe) -> ProcessBuilder {
        self.env
            .iter()
            .fold(ProcessBuilder::new(program), |cmd, (k, v)| cmd.env(k, v))
            .cwd(recipe.work_dir())
    }
}

/// Where and how vendored libraries are built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortsLayout {
    pub target: PathBuf,
    pub host: String,
    pub mirror: String,
}

impl PortsLayout {
    fn recipe(&self, name: &str, pin: &PinnedVersion) -> Result<Recipe> {
        let url = source_url(&self.mirror, name, pin.version())?;
        Ok(
            Recipe::new(name, pin.version(), &self.target, &self.host)
                .with_url(url)
                .with_sha256(pin.sha256()),
        )
    }

    /// libxml2, built against the iconv found under `iconv_prefix`.
    pub fn libxml2(&self, pin: &PinnedVersion, iconv_prefix: &Path) -> Result<Recipe> {
        Ok(self.recipe(LIBXML2, pin)?.with_configure_options([
            "--enable-shared".to_string(),
            "--disable-static".to_string(),
            "--without-python".to_string(),
            "--without-readline".to_string(),
            format!("--with-iconv={}", iconv_prefix.display()),
            "--with-c14n".to_string(),
            "--with-debug".to_string(),
            "--with-threads".to_string(),
        ]))
    }

    /// libxslt, built against an installed libxml2 recipe.
    pub fn libxslt(&self, pin: &PinnedVersion, libxml2: &Recipe) -> Result<Recipe> {
        Ok(self.recipe(LIBXSLT, pin)?.with_configure_options([
            "--enable-shared".to_string(),
            "--disable-static".to_string(),
            "--without-python".to_string(),
            "--without-crypto".to_string(),
            "--with-debug".to_string(),
            format!("--with-libxml-prefix={}", libxml2.path().display()),
        ]))
    }
}
