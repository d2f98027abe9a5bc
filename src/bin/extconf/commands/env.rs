//! `extconf env`

use anyhow::Result;

use crate::cli::EnvArgs;
use extconf::builder::environment::DEFAULT_CC;
use extconf::builder::Environment;
use extconf::core::TargetTriple;

pub fn execute(args: EnvArgs) -> Result<()> {
    let target_os = args.os.unwrap_or_else(|| TargetTriple::host().os);
    let cc = args
        .cc
        .or_else(|| std::env::var("CC").ok().filter(|s| !s.is_empty()))
        .unwrap_or_else(|| DEFAULT_CC.to_string());

    let env = Environment::new(target_os, cc)
        .with_user_flags(std::env::var("CFLAGS").ok(), std::env::var("LIBS").ok());
    let flags = env.baseline_flags();

    println!("# Baseline flags for {} ({}) with {}:", env.target_os, env.os, env.compiler);
    println!("CFLAGS = {}", flags.cflags.join(" "));
    println!("LDFLAGS = {}", flags.ldflags.join(" "));
    println!("LIBS = {}", flags.libs_line().join(" "));
    println!("CROSS_BUILD = {}", if env.is_cross_build() { "yes" } else { "no" });

    for (key, value) in env.build_env() {
        println!("# {}={:?} for vendored builds", key, value);
    }

    Ok(())
}
