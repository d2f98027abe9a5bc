//! `extconf configure`

use anyhow::{anyhow, Result};

use crate::cli::ConfigureArgs;
use extconf::builder::{CcChecker, Environment, Locator, SystemPkgConfig};
use extconf::core::manifest::MANIFEST_FILE;
use extconf::core::{TargetTriple, VersionManifest};
use extconf::ops::{
    configure, select_mode, write_makefile, ConfigureOptions, SystemLibrariesRequest,
    DEFAULT_EXTENSION, USE_SYSTEM_LIBRARIES_ENV,
};
use extconf::ports::{HttpFetcher, PortBuilder, PortsLayout};
use extconf::util::config::env_flag;
use extconf::util::diagnostic::DEFAULT_SUPPORT_URL;
use extconf::util::fs::absolute;
use extconf::util::SystemRunner;

pub fn execute(args: ConfigureArgs) -> Result<()> {
    let (root, config) = super::project_config(&args.dirs)?;

    let host = args.host.clone().or_else(|| config.ports.host.clone());
    let target = match &host {
        Some(triple) => TargetTriple::parse(triple)
            .ok_or_else(|| anyhow!("invalid host triple `{}`\nhelp: expected ARCH-VENDOR-OS[-ENV]", triple))?,
        None => TargetTriple::host(),
    };
    let host = host.unwrap_or_else(|| target.to_string());

    let cc = args.cc.clone().or_else(|| config.build.cc.clone());
    let env = Environment::detect(&target, cc.as_deref());

    let mode = select_mode(
        &env,
        SystemLibrariesRequest {
            cli: args.use_system_libraries,
            env: env_flag(USE_SYSTEM_LIBRARIES_ENV),
            config: config.build.use_system_libraries,
        },
    );

    let manifest_path = args.manifest.clone().unwrap_or_else(|| root.join(MANIFEST_FILE));
    let manifest = if manifest_path.exists() {
        VersionManifest::load(&manifest_path)?
    } else {
        tracing::debug!("No version manifest at {}", manifest_path.display());
        VersionManifest::default()
    };

    let ports_dir = args
        .ports_dir
        .clone()
        .or_else(|| config.ports.dir.clone())
        .unwrap_or_else(|| root.join("ports"));

    let opts = ConfigureOptions {
        mode,
        extension: args
            .extension
            .clone()
            .or_else(|| config.build.extension.clone())
            .unwrap_or_else(|| DEFAULT_EXTENSION.to_string()),
        source_dir: absolute(&args.source_dir),
        ports: PortsLayout {
            target: absolute(&ports_dir),
            host,
            mirror: config.mirror().to_string(),
        },
        cross: config.cross.clone(),
        enable_profiler: args.enable_profiler || std::env::var_os("CPUPROFILE").is_some(),
    };

    let support_url = config
        .build
        .support_url
        .clone()
        .unwrap_or_else(|| DEFAULT_SUPPORT_URL.to_string());
    let checker = CcChecker::new(&env.compiler.command)?;
    let locator = Locator::standard(&checker, &config, SystemPkgConfig, support_url);
    let runner = SystemRunner;
    let ports = PortBuilder::new(&HttpFetcher, &runner).with_env(env.build_env());

    let plan = configure(&opts, &env, &locator, &ports, &manifest)?;

    if args.plan {
        println!("{}", plan.to_json()?);
        return Ok(());
    }

    let output_dir = args.output_dir.unwrap_or(root);
    let path = write_makefile(&plan, &output_dir)?;
    println!("Created {}", path.display());
    Ok(())
}
