//! High-level operations.
//!
//! This module contains the implementation of the `configure` command.

pub mod configure;
pub mod emit;
pub mod mode;

pub use configure::{configure, ConfigureOptions, DEFAULT_EXTENSION};
pub use emit::{render_makefile, write_makefile, BuildPlan};
pub use mode::{select_mode, BuildMode, SystemLibrariesRequest, USE_SYSTEM_LIBRARIES_ENV};
