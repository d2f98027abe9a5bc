//! Subprocess execution for configure, make and compiler checks.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use anyhow::{bail, Context, Result};

/// Builder for a subprocess invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessBuilder {
    program: PathBuf,
    args: Vec<String>,
    env: Vec<(String, String)>,
    cwd: Option<PathBuf>,
}

impl ProcessBuilder {
    pub fn new(program: impl AsRef<Path>) -> Self {
        ProcessBuilder {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            env: Vec::new(),
            cwd: None,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_string_lossy().into_owned());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(
            args.into_iter()
                .map(|s| s.as_ref().to_string_lossy().into_owned()),
        );
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn cwd(mut self, cwd: impl AsRef<Path>) -> Self {
        self.cwd = Some(cwd.as_ref().to_path_buf());
        self
    }

    pub fn get_env(&self) -> &[(String, String)] {
        &self.env
    }

    pub fn get_cwd(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    fn build_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        for (key, value) in &self.env {
            cmd.env(key, value);
        }
        if let Some(ref cwd) = self.cwd {
            cmd.current_dir(cwd);
        }
        cmd
    }

    /// Run to completion, capturing stdout and stderr.
    pub fn exec(&self) -> Result<Output> {
        let mut cmd = self.build_command();
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        cmd.output()
            .with_context(|| format!("failed to spawn `{}`", self.program.display()))
    }

    /// Run and require a zero exit status.
    pub fn exec_and_check(&self) -> Result<Output> {
        let output = self.exec()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "`{}` failed with exit code {:?}\n{}",
                self.display_command(),
                output.status.code(),
                stderr
            );
        }
        Ok(output)
    }

    /// The command line as a single string, for logs and errors.
    pub fn display_command(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

/// Runs the long-lived steps of a source build (configure, make, install).
pub trait CommandRunner {
    fn run(&self, cmd: &ProcessBuilder) -> Result<()>;
}

/// Runs commands for real.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, cmd: &ProcessBuilder) -> Result<()> {
        tracing::debug!("Running {}", cmd.display_command());
        cmd.exec_and_check()?;
        Ok(())
    }
}

/// Find an executable in PATH.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    which::which(name).ok()
}

/// Pick the make program: `MAKE` from the environment, then `gmake` (BSDs
/// ship a non-GNU `make`), then `make`.
pub fn find_make() -> PathBuf {
    if let Ok(make) = std::env::var("MAKE") {
        if !make.is_empty() {
            return PathBuf::from(make);
        }
    }

    ["gmake", "make"]
        .iter()
        .find_map(|name| find_executable(name))
        .unwrap_or_else(|| PathBuf::from("make"))
}
