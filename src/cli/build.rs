//! `doclink build`: run a build and write its artifacts.
//!
//! - **Config** - Discover `docset.toml`, apply CLI overrides
//! - **Build** - Run the [`Builder`], Ctrl+C cancels between waves
//! - **Write** - Dependency manifest and diagnostics report
//! - **Report** - Print diagnostics and a one-line summary

use std::env;
use std::sync::Arc;

use anyhow::{Context, Result};

use super::{BuildArgs, Cli, setup_shutdown_handler};
use crate::build::{BuildOutput, Builder};
use crate::config::DocsetConfig;
use crate::diagnostic::Diagnostics;
use crate::log;

/// How a finished build went, for the exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStatus {
    Success,
    /// Error diagnostics (or warnings, with `--warnings-as-errors`).
    Failed,
    Cancelled,
}

impl BuildStatus {
    pub fn exit_code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::Failed => 1,
            Self::Cancelled => 130,
        }
    }
}

pub fn build_docset(cli: &Cli, args: &BuildArgs) -> Result<BuildStatus> {
    let cwd = env::current_dir().context("cannot read the current directory")?;
    let mut config = DocsetConfig::discover(&cwd, &cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    if let Some(output) = &args.output {
        config.set_output_dir(output.clone());
    }
    let config = Arc::new(config);
    log!("build"; "docset at {}", config.root().display());

    let builder = Builder::new(Arc::clone(&config)).with_progress(!args.quiet);
    setup_shutdown_handler(builder.cancel_flag())?;

    let diagnostics = Diagnostics::new();
    let output = builder.run(&diagnostics)?;

    write_artifacts(&config, &output, &diagnostics)?;
    print_diagnostics(&diagnostics, args.max_diagnostics);

    let status = status_of(&output, &diagnostics, args.warnings_as_errors);
    log_result(&output, &diagnostics, status);
    Ok(status)
}

fn write_artifacts(
    config: &DocsetConfig,
    output: &BuildOutput,
    diagnostics: &Diagnostics,
) -> Result<()> {
    let manifest = config.manifest_path();
    output.dependency_map.write_manifest(&manifest)?;

    let report = config.report_path();
    diagnostics
        .write_report(&report)
        .with_context(|| format!("failed to write {}", report.display()))?;

    crate::debug!("build"; "wrote {} and {}", manifest.display(), report.display());
    Ok(())
}

/// Print diagnostics with a `max` limit
fn print_diagnostics(diagnostics: &Diagnostics, max: Option<usize>) {
    let items = diagnostics.sorted();
    let max = max.unwrap_or(usize::MAX);

    for item in items.iter().take(max) {
        eprintln!("{item}");
    }

    let hidden = items.len().saturating_sub(max);
    if hidden > 0 {
        eprintln!("... and {} more", plural_count(hidden, "diagnostic"));
    }
}

fn status_of(output: &BuildOutput, diagnostics: &Diagnostics, strict: bool) -> BuildStatus {
    if output.cancelled {
        BuildStatus::Cancelled
    } else if diagnostics.error_count() > 0 || (strict && diagnostics.warning_count() > 0) {
        BuildStatus::Failed
    } else {
        BuildStatus::Success
    }
}

fn log_result(output: &BuildOutput, diagnostics: &Diagnostics, status: BuildStatus) {
    let verb = match status {
        BuildStatus::Success => "done",
        BuildStatus::Failed => "failed",
        BuildStatus::Cancelled => "cancelled",
    };
    log!(
        "build";
        "{verb}: {}, {}, {}, {}",
        plural_count(output.built.len(), "document"),
        plural_count(output.dependency_map.len(), "dependency edge"),
        plural_count(diagnostics.error_count(), "error"),
        plural_count(diagnostics.warning_count(), "warning")
    );
}

/// `plural_count(1, "file")` is `"1 file"`, `plural_count(5, "file")` is `"5 files"`.
fn plural_count(count: usize, noun: &str) -> String {
    format!("{count} {noun}{}", if count == 1 { "" } else { "s" })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dependency::DependencyMapBuilder;
    use crate::diagnostic::{Code, Diagnostic};

    fn output(cancelled: bool) -> BuildOutput {
        BuildOutput {
            dependency_map: DependencyMapBuilder::default().build(),
            rendered_ids: Default::default(),
            built: Vec::new(),
            cancelled,
        }
    }

    #[test]
    fn test_status() {
        let diagnostics = Diagnostics::new();
        assert_eq!(status_of(&output(false), &diagnostics, true), BuildStatus::Success);

        diagnostics.push(Diagnostic::warning(Code::BookmarkNotFound, "missing"));
        assert_eq!(status_of(&output(false), &diagnostics, false), BuildStatus::Success);
        assert_eq!(status_of(&output(false), &diagnostics, true), BuildStatus::Failed);

        diagnostics.push(Diagnostic::error(Code::FileNotFound, "gone"));
        assert_eq!(status_of(&output(false), &diagnostics, false), BuildStatus::Failed);
        assert_eq!(status_of(&output(true), &diagnostics, false), BuildStatus::Cancelled);
        assert_eq!(BuildStatus::Cancelled.exit_code(), 130);
    }

    #[test]
    fn test_plural_count() {
        assert_eq!(plural_count(0, "error"), "0 errors");
        assert_eq!(plural_count(1, "error"), "1 error");
        assert_eq!(plural_count(2, "dependency edge"), "2 dependency edges");
    }
}
