//! Core data types: dependency descriptors, flag sets, platform identity and
//! the version manifest.

pub mod dependency;
pub mod flags;
pub mod manifest;
pub mod platform;

pub use dependency::DependencyDescriptor;
pub use flags::FlagSet;
pub use manifest::VersionManifest;
pub use platform::{CompilerId, HostOs, TargetTriple};
