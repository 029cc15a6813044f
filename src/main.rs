//! Doclink command-line entry point.

use anyhow::Result;
use clap::{ColorChoice, Parser};
use doclink::cli::{Cli, Commands, build::build_docset};
use doclink::logger;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    let status = match &cli.command {
        Commands::Build { args } => build_docset(&cli, args)?,
    };

    let code = status.exit_code();
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
