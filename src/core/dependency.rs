//! Native dependency descriptors.
//!
//! The extension links against five native libraries. Each is described by
//! the header it needs, the symbols that prove the library is usable, and the
//! names it goes by for the linker and pkg-config.

use std::fmt;

/// Static description of a native library the extension depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DependencyDescriptor {
    /// Short name, also the key for directory overrides (`--with-dir xml2=...`)
    pub name: &'static str,
    /// Header that must be includable
    pub header: &'static str,
    /// Any one of these symbols must link
    pub symbols: &'static [&'static str],
    /// Library name for `-l`
    pub library: &'static str,
    /// pkg-config package name
    pub pkg_config: Option<&'static str>,
    /// Sub-directory of an include root that holds the headers
    pub include_subdir: Option<&'static str>,
    /// Whether failing to find it aborts the run
    pub required: bool,
}

impl DependencyDescriptor {
    /// Name used in user-facing messages (`libxml2`, `libiconv`, ...).
    pub fn display_name(&self) -> String {
        if self.library.starts_with("lib") {
            self.library.to_string()
        } else {
            format!("lib{}", self.library)
        }
    }

    /// The symbol reported when detection fails.
    pub fn primary_symbol(&self) -> &'static str {
        self.symbols.first().copied().unwrap_or_default()
    }
}

impl fmt::Display for DependencyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

pub const ZLIB: DependencyDescriptor = DependencyDescriptor {
    name: "zlib",
    header: "zlib.h",
    symbols: &["gzdopen"],
    library: "z",
    pkg_config: Some("zlib"),
    include_subdir: None,
    required: false,
};

pub const ICONV: DependencyDescriptor = DependencyDescriptor {
    name: "iconv",
    header: "iconv.h",
    symbols: &["iconv_open", "libiconv_open"],
    library: "iconv",
    pkg_config: Some("libiconv"),
    include_subdir: None,
    required: true,
};

pub const XML2: DependencyDescriptor = DependencyDescriptor {
    name: "xml2",
    header: "libxml/parser.h",
    symbols: &["xmlParseDoc"],
    library: "xml2",
    pkg_config: Some("libxml-2.0"),
    include_subdir: Some("libxml2"),
    required: true,
};

pub const XSLT: DependencyDescriptor = DependencyDescriptor {
    name: "xslt",
    header: "libxslt/xslt.h",
    symbols: &["xsltParseStylesheetDoc"],
    library: "xslt",
    pkg_config: Some("libxslt"),
    include_subdir: None,
    required: true,
};

pub const EXSLT: DependencyDescriptor = DependencyDescriptor {
    name: "exslt",
    header: "libexslt/exslt.h",
    symbols: &["exsltFuncRegister"],
    library: "exslt",
    pkg_config: Some("libexslt"),
    include_subdir: None,
    required: true,
};

/// All dependencies, in the order they are located.
pub const DEPENDENCIES: &[DependencyDescriptor] = &[ZLIB, ICONV, XML2, XSLT, EXSLT];

/// The libraries whose symbols are verified before the Makefile is written.
pub const LINKED_LIBRARIES: &[DependencyDescriptor] = &[XML2, XSLT, EXSLT];

/// A function whose absence is fatal even when its library links.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequiredFunction {
    pub name: &'static str,
    pub library: &'static str,
}

/// Present in every libxml2 recent enough to be supported.
pub const REQUIRED_FUNCTIONS: &[RequiredFunction] = &[RequiredFunction {
    name: "xmlHasFeature",
    library: "libxml2",
}];

/// Functions that enable optional code paths through `HAVE_*` defines.
pub const OPTIONAL_FUNCTIONS: &[&str] = &[
    "xmlFirstElementChild",
    "xmlRelaxNGSetParserStructuredErrors",
    "xmlRelaxNGSetValidStructuredErrors",
    "xmlSchemaSetValidStructuredErrors",
    "xmlSchemaSetParserStructuredErrors",
];

/// Profiling library pulled in when the profiler is enabled.
pub const PROFILER: DependencyDescriptor = DependencyDescriptor {
    name: "profiler",
    header: "",
    symbols: &["ProfilerEnable"],
    library: "profiler",
    pkg_config: Some("libprofiler"),
    include_subdir: None,
    required: true,
};

/// Look up a descriptor by name.
pub fn find(name: &str) -> Option<&'static DependencyDescriptor> {
    DEPENDENCIES.iter().find(|d| d.name == name)
}

/// The `HAVE_*` define for a detected function.
pub fn have_define(func: &str) -> String {
    format!("HAVE_{}", func.to_uppercase())
}
