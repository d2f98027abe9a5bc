//! `extconf completions`

use std::io::{self, Write};

use anyhow::{Context, Result};
use clap::CommandFactory;
use clap_complete::generate;

use crate::cli::{Cli, CompletionsArgs};

pub fn execute(args: CompletionsArgs) -> Result<()> {
    let mut cmd = Cli::command();
    let mut out = io::stdout().lock();

    generate(args.shell, &mut cmd, "extconf", &mut out);
    out.flush().context("failed to write completions")
}
