//! Shared utilities

pub mod config;
pub mod diagnostic;
pub mod fs;
pub mod hash;
pub mod process;
pub mod progress;

pub use config::Config;
pub use diagnostic::{Diagnostic, FatalError};
pub use process::{CommandRunner, ProcessBuilder, SystemRunner};
