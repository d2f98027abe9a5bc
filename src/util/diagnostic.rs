//! User-facing diagnostics.
//!
//! Fatal conditions are typed so callers (and tests) can tell a missing
//! library apart from an I/O failure. Everything else travels as
//! `anyhow::Error` with context attached.

use std::fmt;

use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

/// Where users are sent when a native dependency is missing.
pub const DEFAULT_SUPPORT_URL: &str = "http://xmlsoft.org/downloads.html";

/// A condition that ends the run without producing a Makefile.
#[derive(Debug, Clone, Error, MietteDiagnostic, PartialEq, Eq)]
pub enum FatalError {
    /// No strategy produced a usable header and symbol.
    #[error("{library} is missing.  please visit {support_url} for help with installing dependencies.")]
    #[diagnostic(code(extconf::locate::missing_library))]
    MissingLibrary {
        library: String,
        support_url: String,
    },

    /// The library links but is too old.
    #[error(
        "The function '{symbol}' is missing from your installation of {library}.  \
         Likely this means that your installed version of {library} is old enough \
         that the extension will not work well.  To get around this problem, please \
         upgrade your installation of {library}.\n\n\
         Please visit {support_url} for more help!"
    )]
    #[diagnostic(
        code(extconf::check::missing_symbol),
        help("upgrade {library} or build without --use-system-libraries")
    )]
    MissingSymbol {
        symbol: String,
        library: String,
        support_url: String,
    },

    /// Profiling was requested but libprofiler cannot be linked.
    #[error("google performance tools are not installed")]
    #[diagnostic(
        code(extconf::check::profiler),
        help("install gperftools (https://github.com/gperftools/gperftools) or unset CPUPROFILE")
    )]
    ProfilerMissing,
}

/// A message with optional context lines and suggestions, framed the way
/// native-extension installers frame their failures.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub message: String,
    pub context: Vec<String>,
    pub suggestions: Vec<String>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic {
            message: message.into(),
            context: Vec::new(),
            suggestions: Vec::new(),
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    /// Build the banner diagnostic for a fatal error, including any
    /// `anyhow` context frames wrapped around it.
    pub fn from_error(err: &anyhow::Error) -> Self {
        let mut diag = match err.downcast_ref::<FatalError>() {
            Some(fatal) => {
                let mut diag = Diagnostic::error(fatal.to_string());
                if let Some(help) = MietteDiagnostic::help(fatal) {
                    diag = diag.with_suggestion(help.to_string());
                }
                diag
            }
            None => Diagnostic::error(err.to_string()),
        };
        for cause in err.chain().skip(1) {
            diag = diag.with_context(cause.to_string());
        }
        diag
    }

    pub fn format(&self, color: bool) -> String {
        let mut output = String::new();

        let label = if color { "\x1b[1;31merror\x1b[0m" } else { "error" };

        output.push_str("-----\n");
        output.push_str(&format!("{}: {}\n", label, self.message));

        for ctx in &self.context {
            output.push_str(&format!("  caused by: {}\n", ctx));
        }

        if !self.suggestions.is_empty() {
            output.push_str("help: consider:\n");
            for (i, suggestion) in self.suggestions.iter().enumerate() {
                output.push_str(&format!("  {}. {}\n", i + 1, suggestion));
            }
        }

        output.push_str("-----\n");
        output
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format(false))
    }
}

/// Print a diagnostic to stderr.
pub fn emit(diagnostic: &Diagnostic, color: bool) {
    eprint!("{}", diagnostic.format(color));
}
