//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

use extconf::builder::strategy::SHARED_OVERRIDE;
use extconf::core::dependency;
use extconf::util::config::{Config, DirOverride};

/// extconf - configure a native XML/XSLT extension against libxml2 and libxslt
#[derive(Parser)]
#[command(name = "extconf")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Locate or build the XML libraries and write the Makefile
    Configure(ConfigureArgs),

    /// Show the baseline flags for a target OS and compiler
    Env(EnvArgs),

    /// Locate a single dependency and show the flags it contributes
    Locate(LocateArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args)]
pub struct ConfigureArgs {
    /// Link against libxml2/libxslt already installed on the system
    #[arg(long)]
    pub use_system_libraries: bool,

    /// C compiler (defaults to $CC, then `cc`)
    #[arg(long)]
    pub cc: Option<String>,

    /// Host triple to build for, e.g. x86_64-w64-mingw32
    #[arg(long)]
    pub host: Option<String>,

    /// Extension path; its last component names the shared object
    #[arg(long)]
    pub extension: Option<String>,

    /// Directory containing the extension's C sources
    #[arg(long, default_value = ".")]
    pub source_dir: PathBuf,

    /// Where to write the Makefile (defaults to the current directory)
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Where vendored libraries are built (defaults to ./ports)
    #[arg(long)]
    pub ports_dir: Option<PathBuf>,

    /// Version manifest (defaults to ./dependencies.toml)
    #[arg(long)]
    pub manifest: Option<PathBuf>,

    /// Link the Google performance tools profiler (also enabled by $CPUPROFILE)
    #[arg(long)]
    pub enable_profiler: bool,

    /// Print the build plan as JSON instead of writing the Makefile
    #[arg(long)]
    pub plan: bool,

    #[command(flatten)]
    pub dirs: DirArgs,
}

#[derive(Args)]
pub struct EnvArgs {
    /// Target OS identifier, e.g. linux, darwin21, mingw32, solaris2.11
    #[arg(long)]
    pub os: Option<String>,

    /// C compiler (defaults to $CC, then `cc`)
    #[arg(long)]
    pub cc: Option<String>,
}

#[derive(Args)]
pub struct LocateArgs {
    /// Dependency name: zlib, iconv, xml2, xslt or exslt
    pub name: String,

    /// C compiler (defaults to $CC, then `cc`)
    #[arg(long)]
    pub cc: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub dirs: DirArgs,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

/// Per-dependency directory hints. `NAME` is a dependency name or `opt` for
/// all of them.
#[derive(Args, Default)]
pub struct DirArgs {
    /// Prefix with include/ and lib/ below it
    #[arg(long = "with-dir", value_name = "NAME=DIR", value_parser = parse_dir_spec)]
    pub with_dir: Vec<(String, PathBuf)>,

    /// Include directory
    #[arg(long = "with-include", value_name = "NAME=DIR", value_parser = parse_dir_spec)]
    pub with_include: Vec<(String, PathBuf)>,

    /// Library directory
    #[arg(long = "with-lib", value_name = "NAME=DIR", value_parser = parse_dir_spec)]
    pub with_lib: Vec<(String, PathBuf)>,
}

impl DirArgs {
    /// Fold the command-line hints over the configured ones.
    pub fn apply(&self, config: &mut Config) {
        for (name, dir) in &self.with_dir {
            config.dirs.entry(name.clone()).or_default().merge(DirOverride {
                dir: Some(dir.clone()),
                ..Default::default()
            });
        }
        for (name, dir) in &self.with_include {
            config.dirs.entry(name.clone()).or_default().merge(DirOverride {
                include: Some(dir.clone()),
                ..Default::default()
            });
        }
        for (name, dir) in &self.with_lib {
            config.dirs.entry(name.clone()).or_default().merge(DirOverride {
                lib: Some(dir.clone()),
                ..Default::default()
            });
        }
    }
}

fn parse_dir_spec(s: &str) -> Result<(String, PathBuf), String> {
    let (name, dir) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=DIR, got `{}`", s))?;
    if name != SHARED_OVERRIDE && dependency::find(name).is_none() {
        return Err(format!(
            "unknown dependency `{}` (expected zlib, iconv, xml2, xslt, exslt or opt)",
            name
        ));
    }
    if dir.is_empty() {
        return Err(format!("empty directory for `{}`", name));
    }
    Ok((name.to_string(), PathBuf::from(dir)))
}
