//! `extconf locate`

use anyhow::{anyhow, Context, Result};

use crate::cli::LocateArgs;
use extconf::builder::{CcChecker, Environment, Locator, SystemPkgConfig};
use extconf::core::dependency::{self, ICONV};
use extconf::core::TargetTriple;
use extconf::util::diagnostic::DEFAULT_SUPPORT_URL;

pub fn execute(args: LocateArgs) -> Result<()> {
    let dep = dependency::find(&args.name).ok_or_else(|| {
        anyhow!(
            "unknown dependency `{}`\n\
             help: expected one of: zlib, iconv, xml2, xslt, exslt",
            args.name
        )
    })?;

    let (_, config) = super::project_config(&args.dirs)?;
    let cc = args.cc.clone().or_else(|| config.build.cc.clone());
    let env = Environment::detect(&TargetTriple::host(), cc.as_deref());

    let support_url = config
        .build
        .support_url
        .clone()
        .unwrap_or_else(|| DEFAULT_SUPPORT_URL.to_string());
    let checker = CcChecker::new(&env.compiler.command)?;
    let locator = Locator::standard(&checker, &config, SystemPkgConfig, support_url);

    let flags = env.baseline_flags();
    let Some(located) = locator.locate(dep, &flags)? else {
        println!("{} not found", dep.display_name());
        return Ok(());
    };

    if args.json {
        let json = serde_json::to_string_pretty(&located).context("failed to serialize result")?;
        println!("{}", json);
        return Ok(());
    }

    println!("{} found via {}", dep.display_name(), located.candidate.strategy);
    for dir in &located.candidate.include_dirs {
        println!("  -I{}", dir.display());
    }
    for dir in &located.candidate.lib_dirs {
        println!("  -L{}", dir.display());
    }
    let libs = located.flags.libs_line();
    if !libs.is_empty() {
        println!("  {}", libs.join(" "));
    }

    if dep.name == ICONV.name {
        let prefix = locator.iconv_prefix(&flags)?;
        println!("  prefix for --with-iconv: {}", prefix.display());
    }

    Ok(())
}
