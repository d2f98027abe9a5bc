//! Environment probing and library location.

pub mod checker;
pub mod environment;
pub mod locator;
pub mod strategy;

pub use checker::{CcChecker, SymbolChecker};
pub use environment::Environment;
pub use locator::{Located, Locator};
pub use strategy::{Candidate, PackageConfig, SearchStrategy, SystemPkgConfig};
