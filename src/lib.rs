//! extconf - build configuration for a native XML/XSLT extension
//!
//! This crate locates libxml2, libxslt, libexslt, zlib and iconv on the
//! build machine, or builds pinned versions of libxml2 and libxslt from
//! source, and then writes the Makefile for the extension.

pub mod builder;
pub mod core;
pub mod ops;
pub mod ports;
pub mod util;

/// Test doubles for the compiler, pkg-config, downloads and source builds.
///
/// Only compiled for unit tests.
#[cfg(test)]
pub mod test_support;

pub use builder::{Environment, Locator};
pub use core::{DependencyDescriptor, FlagSet, VersionManifest};
pub use ops::{BuildMode, BuildPlan};
