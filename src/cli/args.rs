//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

/// Link, xref and dependency resolution for documentation docsets
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Enable verbose output for debugging
    #[arg(short = 'V', long, global = true)]
    pub verbose: bool,

    /// Config file path, searched upward from the current directory
    #[arg(short = 'C', long, default_value = "docset.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Resolve every reference and write the dependency map
    #[command(visible_alias = "b")]
    Build {
        #[command(flatten)]
        args: BuildArgs,
    },
}

#[derive(clap::Args, Debug, Clone)]
pub struct BuildArgs {
    /// Output directory path (relative to the docset root)
    #[arg(short, long, value_hint = clap::ValueHint::DirPath)]
    pub output: Option<PathBuf>,

    /// Hide the progress line
    #[arg(short, long)]
    pub quiet: bool,

    /// Treat warnings as errors for the exit status
    #[arg(short = 'W', long)]
    pub warnings_as_errors: bool,

    /// Print at most this many diagnostics (the report file has all of them)
    #[arg(long, value_name = "N")]
    pub max_diagnostics: Option<usize>,
}
