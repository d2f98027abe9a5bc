//! extconf CLI - configure a native XML/XSLT extension

use std::io::{stderr, IsTerminal};

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use extconf::util::diagnostic::{emit, Diagnostic};

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();
    let color = !cli.no_color && stderr().is_terminal();

    if let Err(e) = run(cli) {
        emit(&Diagnostic::from_error(&e), color);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("extconf=debug")
    } else {
        EnvFilter::new("extconf=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(stderr)
        .with_target(false)
        .without_time()
        .with_ansi(!cli.no_color)
        .init();

    match cli.command {
        Commands::Configure(args) => commands::configure::execute(args),
        Commands::Env(args) => commands::env::execute(args),
        Commands::Locate(args) => commands::locate::execute(args),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}
