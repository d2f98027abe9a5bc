//! Command implementations

pub mod completions;
pub mod configure;
pub mod env;
pub mod locate;

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::cli::DirArgs;
use extconf::util::config::{global_config_path, load_config, Config, PROJECT_CONFIG_FILE};

/// The project root (the current directory) and its merged configuration,
/// with command-line directory hints applied last.
fn project_config(dirs: &DirArgs) -> Result<(PathBuf, Config)> {
    let root = std::env::current_dir().context("failed to determine the current directory")?;
    let mut config = load_config(
        global_config_path().as_deref(),
        &root.join(PROJECT_CONFIG_FILE),
    );
    dirs.apply(&mut config);
    Ok((root, config))
}
