//! Library location.
//!
//! For each dependency the locator walks its strategies in order, probing
//! every candidate against a borrowed flag snapshot. Only the winning probe's
//! flags leave this module; failed probes drop their working copy.

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Serialize;

use crate::builder::checker::{detect, SymbolChecker};
use crate::builder::strategy::{
    Candidate, ExplicitDirs, OptDirs, PackageConfig, PkgConfigDirs, SearchStrategy, WellKnownPath,
};
use crate::core::dependency::ICONV;
use crate::core::{DependencyDescriptor, FlagSet};
use crate::util::config::Config;
use crate::util::diagnostic::FatalError;

/// A dependency that passed detection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Located {
    pub dependency: &'static str,
    pub candidate: Candidate,
    /// The flag set with the candidate committed
    #[serde(skip)]
    pub flags: FlagSet,
}

/// Ordered strategies plus the checker that validates their candidates.
pub struct Locator<'a> {
    checker: &'a dyn SymbolChecker,
    strategies: Vec<Box<dyn SearchStrategy + 'a>>,
    support_url: String,
}

impl<'a> Locator<'a> {
    /// A locator with no strategies.
    pub fn new(checker: &'a dyn SymbolChecker, support_url: impl Into<String>) -> Self {
        Locator {
            checker,
            strategies: Vec::new(),
            support_url: support_url.into(),
        }
    }

    /// The standard order: explicit directories, the system prefix, opt
    /// prefixes, then pkg-config.
    pub fn standard(
        checker: &'a dyn SymbolChecker,
        config: &Config,
        pkg_config: impl PackageConfig + 'a,
        support_url: impl Into<String>,
    ) -> Self {
        Locator::new(checker, support_url)
            .with_strategy(ExplicitDirs::new(config.dirs.clone()))
            .with_strategy(WellKnownPath::default())
            .with_strategy(OptDirs::default())
            .with_strategy(PkgConfigDirs::new(pkg_config))
    }

    /// Append a strategy at the lowest priority.
    pub fn with_strategy(mut self, strategy: impl SearchStrategy + 'a) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    pub fn checker(&self) -> &'a dyn SymbolChecker {
        self.checker
    }

    pub fn support_url(&self) -> &str {
        &self.support_url
    }

    /// Candidates from one strategy, empty ones dropped.
    fn candidates_from(
        strategy: &dyn SearchStrategy,
        dep: &DependencyDescriptor,
    ) -> Vec<Candidate> {
        let mut candidates = strategy.candidates(dep);
        candidates.retain(|c| !c.is_empty());
        candidates
    }

    /// Try one candidate. `flags` is never modified; on success the returned
    /// set has the candidate's directories and any needed library applied.
    pub fn probe(
        &self,
        flags: &FlagSet,
        candidate: &Candidate,
        dep: &DependencyDescriptor,
    ) -> Option<FlagSet> {
        let trial = candidate.apply(flags);
        detect(self.checker, &trial, dep)
    }

    /// Find a dependency. Required dependencies that cannot be found are
    /// fatal; optional ones return `None`.
    ///
    /// Strategies are asked lazily: once a candidate passes, later
    /// strategies are never consulted.
    pub fn locate(&self, dep: &DependencyDescriptor, flags: &FlagSet) -> Result<Option<Located>> {
        for strategy in &self.strategies {
            for candidate in Self::candidates_from(strategy.as_ref(), dep) {
                match self.probe(flags, &candidate, dep) {
                    Some(found) => {
                        tracing::info!(
                            "Found {} via {} ({})",
                            dep.display_name(),
                            candidate.strategy,
                            display_dirs(&candidate.include_dirs)
                        );
                        return Ok(Some(Located {
                            dependency: dep.name,
                            candidate,
                            flags: found,
                        }));
                    }
                    None => tracing::debug!(
                        "{} not usable via {} ({})",
                        dep.display_name(),
                        candidate.strategy,
                        display_dirs(&candidate.include_dirs)
                    ),
                }
            }
        }

        if dep.required {
            return Err(self.missing(dep).into());
        }
        tracing::warn!("{} not found, continuing without it", dep.display_name());
        Ok(None)
    }

    /// Find the prefix of the iconv that libxml2's own configure will pick up
    /// with `--with-iconv=<prefix>`. Only `<prefix>/include` directories that
    /// contain `iconv.h` qualify, and the probe links against `<prefix>/lib`.
    /// The flag set is only borrowed for probing; nothing is committed.
    pub fn iconv_prefix(&self, flags: &FlagSet) -> Result<PathBuf> {
        for strategy in &self.strategies {
            for candidate in Self::candidates_from(strategy.as_ref(), &ICONV) {
                for idir in &candidate.include_dirs {
                    let Some(prefix) = include_prefix(idir) else {
                        continue;
                    };
                    if !idir.join(ICONV.header).is_file() {
                        continue;
                    }

                    let trial = Candidate::new(candidate.strategy)
                        .include(idir)
                        .lib(prefix.join("lib"));
                    if self.probe(flags, &trial, &ICONV).is_some() {
                        tracing::info!("Using iconv from {}", prefix.display());
                        return Ok(prefix.to_path_buf());
                    }
                }
            }
        }

        Err(self.missing(&ICONV).into())
    }

    fn missing(&self, dep: &DependencyDescriptor) -> FatalError {
        FatalError::MissingLibrary {
            library: dep.display_name(),
            support_url: self.support_url.clone(),
        }
    }
}

/// `/usr/local/include` → `/usr/local`; anything not ending in `include`
/// has no prefix, and neither do `include` or `/include`.
fn include_prefix(idir: &Path) -> Option<&Path> {
    if idir.file_name()? != "include" {
        return None;
    }
    idir.parent()
        .filter(|p| !p.as_os_str().is_empty() && p.parent().is_some())
}

fn display_dirs(dirs: &[PathBuf]) -> String {
    dirs.iter()
        .map(|d| d.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::strategy::PkgConfigInfo;
    use crate::core::dependency::{XML2, XSLT, ZLIB};
    use crate::test_support::{FakeChecker, FakePkgConfig, StaticCandidates};
    use crate::util::config::DirOverride;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    const URL: &str = "https://support.example/install";

    fn xml2_checker(include: &str) -> FakeChecker {
        FakeChecker::new()
            .header("libxml/parser.h", Some(include))
            .function("xmlParseDoc", Some("xml2"))
    }

    #[test]
    fn test_failed_probe_leaves_flags_identical() {
        let checker = xml2_checker("/real/include/libxml2");
        let locator = Locator::new(&checker, URL);
        let flags = FlagSet::new().with_cflag("-g").with_include_dir("/base");
        let before = flags.clone();

        let candidate = Candidate::new("test").include("/wrong/include").lib("/wrong/lib");
        assert!(locator.probe(&flags, &candidate, &XML2).is_none());
        assert_eq!(flags, before);
        assert_eq!(format!("{:?}", flags), format!("{:?}", before));
    }

    #[test]
    fn test_first_successful_candidate_wins() {
        let checker = xml2_checker("/b/include/libxml2");
        let locator = Locator::new(&checker, URL).with_strategy(StaticCandidates::new(vec![
            Candidate::new("first").include("/a/include/libxml2"),
            Candidate::new("second").include("/b/include/libxml2").lib("/b/lib"),
            Candidate::new("third").include("/b/include/libxml2"),
        ]));

        let located = locator.locate(&XML2, &FlagSet::new()).unwrap().unwrap();
        assert_eq!(located.candidate.strategy, "second");
        assert_eq!(located.flags.include_dirs, vec![PathBuf::from("/b/include/libxml2")]);
        assert_eq!(located.flags.lib_dirs, vec![PathBuf::from("/b/lib")]);
        assert_eq!(located.flags.libs, vec!["xml2"]);
        assert_eq!(checker.header_checks(), 2);
    }

    #[test]
    fn test_explicit_override_beats_pkg_config() {
        let checker = FakeChecker::new()
            .header("libxslt/xslt.h", Some("/custom/include"))
            .header("libxslt/xslt.h", Some("/pc/include"))
            .function("xsltParseStylesheetDoc", Some("xslt"));

        let mut overrides = BTreeMap::new();
        overrides.insert(
            "xslt".to_string(),
            DirOverride {
                dir: Some("/custom".into()),
                ..Default::default()
            },
        );
        let pc = FakePkgConfig::new().package(
            "libxslt",
            PkgConfigInfo {
                version: "1.1.34".into(),
                include_dirs: vec!["/pc/include".into()],
                lib_dirs: vec!["/pc/lib".into()],
                libs: vec!["xslt".into()],
            },
        );

        let locator = Locator::new(&checker, URL)
            .with_strategy(PkgConfigDirs::new(pc.clone()))
            .with_strategy(ExplicitDirs::new(overrides.clone()));
        let located = locator.locate(&XSLT, &FlagSet::new()).unwrap().unwrap();
        assert_eq!(located.candidate.strategy, "pkg-config", "list order decides");

        let mut config = Config::default();
        config.dirs = overrides;
        let locator = Locator::standard(&checker, &config, pc, URL);
        let located = locator.locate(&XSLT, &FlagSet::new()).unwrap().unwrap();
        assert_eq!(located.candidate.strategy, "explicit");
        assert_eq!(located.flags.include_dirs[0], PathBuf::from("/custom/include"));
    }

    #[test]
    fn test_later_strategies_untouched_after_success() {
        let checker = FakeChecker::new()
            .header("libxslt/xslt.h", Some("/custom/include"))
            .function("xsltParseStylesheetDoc", Some("xslt"));

        let mut config = Config::default();
        config.dirs.insert(
            "xslt".to_string(),
            DirOverride {
                dir: Some("/custom".into()),
                ..Default::default()
            },
        );
        let pc = FakePkgConfig::new();
        let locator = Locator::standard(&checker, &config, pc.clone(), URL);

        let located = locator.locate(&XSLT, &FlagSet::new()).unwrap().unwrap();
        assert_eq!(located.candidate.strategy, "explicit");
        assert_eq!(checker.header_checks(), 1);
        assert_eq!(checker.function_checks(), 2);
        assert_eq!(pc.queries(), 0);
    }

    #[test]
    fn test_pkg_config_queried_when_reached() {
        let checker = FakeChecker::new();
        let pc = FakePkgConfig::new();
        let locator = Locator::new(&checker, URL).with_strategy(PkgConfigDirs::new(pc.clone()));

        assert!(locator.locate(&ZLIB, &FlagSet::new()).unwrap().is_none());
        assert_eq!(pc.queries(), 1);
    }

    #[test]
    fn test_missing_required_is_fatal_and_named() {
        let checker = FakeChecker::new();
        let locator = Locator::new(&checker, URL).with_strategy(StaticCandidates::new(vec![
            Candidate::new("only").include("/nowhere/include"),
        ]));

        let err = locator.locate(&XML2, &FlagSet::new()).unwrap_err();
        let fatal = err.downcast_ref::<FatalError>().unwrap();
        assert_eq!(
            fatal,
            &FatalError::MissingLibrary {
                library: "libxml2".into(),
                support_url: URL.into()
            }
        );
        assert!(err.to_string().contains("libxml2 is missing"));
    }

    #[test]
    fn test_missing_optional_continues() {
        let checker = FakeChecker::new();
        let locator = Locator::new(&checker, URL);
        let flags = FlagSet::new().with_cflag("-g");

        assert!(locator.locate(&ZLIB, &flags).unwrap().is_none());
        assert_eq!(flags, FlagSet::new().with_cflag("-g"));
    }

    #[test]
    fn test_iconv_prefix_requires_header_on_disk() {
        let tmp = TempDir::new().unwrap();
        let empty = tmp.path().join("empty");
        let real = tmp.path().join("real");
        std::fs::create_dir_all(empty.join("include")).unwrap();
        std::fs::create_dir_all(real.join("include")).unwrap();
        std::fs::write(real.join("include/iconv.h"), "").unwrap();

        let checker = FakeChecker::new()
            .header("iconv.h", None)
            .function("iconv_open", None);
        let locator = Locator::new(&checker, URL).with_strategy(StaticCandidates::new(vec![
            Candidate::new("a").include(empty.join("include")),
            Candidate::new("b").include(tmp.path().join("not-an-include-dir")),
            Candidate::new("c").include(real.join("include")),
        ]));

        let flags = FlagSet::new();
        assert_eq!(locator.iconv_prefix(&flags).unwrap(), real);
        assert_eq!(flags, FlagSet::new());
    }

    #[test]
    fn test_iconv_prefix_missing_is_fatal() {
        let checker = FakeChecker::new();
        let locator = Locator::new(&checker, URL);
        let err = locator.iconv_prefix(&FlagSet::new()).unwrap_err();
        assert!(err.to_string().contains("libiconv is missing"));
    }

    #[test]
    fn test_include_prefix() {
        assert_eq!(
            include_prefix(Path::new("/usr/local/include")),
            Some(Path::new("/usr/local"))
        );
        assert_eq!(include_prefix(Path::new("/usr/include/libxml2")), None);
        assert_eq!(include_prefix(Path::new("/include")), None);
        assert_eq!(include_prefix(Path::new("include")), None);
    }
}
