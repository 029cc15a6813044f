//! Build diagnostics (errors, warnings, suggestions).
//!
//! A [`Diagnostics`] sink is created per build and passed by reference into
//! every resolver call. Nothing here is global.

use std::fmt;
use std::path::Path;

use owo_colors::OwoColorize;
use parking_lot::Mutex;
use serde::Serialize;

use crate::core::PathAddress;

// ============================================================================
// Level & Code
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    Error,
    Warning,
    Suggestion,
}

impl Level {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Suggestion => "suggestion",
        }
    }
}

/// Stable, machine-readable diagnostic codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Code {
    FileNotFound,
    IncludeNotFound,
    LinkOutOfScope,
    LocalFilePath,
    LinkIntoDependency,
    IncludeRedirection,
    CircularReference,
    InvalidPath,
    XrefNotFound,
    BookmarkNotFound,
    DuplicateCasing,
    UnknownConfigKey,
}

impl Code {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FileNotFound => "file-not-found",
            Self::IncludeNotFound => "include-not-found",
            Self::LinkOutOfScope => "link-out-of-scope",
            Self::LocalFilePath => "local-file-path",
            Self::LinkIntoDependency => "link-into-dependency",
            Self::IncludeRedirection => "include-redirection",
            Self::CircularReference => "circular-reference",
            Self::InvalidPath => "invalid-path",
            Self::XrefNotFound => "xref-not-found",
            Self::BookmarkNotFound => "bookmark-not-found",
            Self::DuplicateCasing => "duplicate-casing",
            Self::UnknownConfigKey => "unknown-config-key",
        }
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Diagnostic
// ============================================================================

/// Where a diagnostic points: a file and, when known, a 1-based line.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SourceInfo {
    pub file: PathAddress,
    pub line: Option<usize>,
}

impl SourceInfo {
    pub fn new(file: PathAddress) -> Self {
        Self { file, line: None }
    }

    pub fn with_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }
}

impl fmt::Display for SourceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}:{line}", self.file),
            None => write!(f, "{}", self.file),
        }
    }
}

/// A single actionable diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub level: Level,
    pub code: Code,
    pub message: String,
    pub source: Option<SourceInfo>,
}

impl Diagnostic {
    pub fn error(code: Code, message: impl Into<String>) -> Self {
        Self {
            level: Level::Error,
            code,
            message: message.into(),
            source: None,
        }
    }

    pub fn warning(code: Code, message: impl Into<String>) -> Self {
        Self {
            level: Level::Warning,
            ..Self::error(code, message)
        }
    }

    pub fn with_source(mut self, source: SourceInfo) -> Self {
        self.source = Some(source);
        self
    }

    /// Attach a source only if none is set yet.
    pub fn or_source(mut self, source: impl FnOnce() -> SourceInfo) -> Self {
        if self.source.is_none() {
            self.source = Some(source());
        }
        self
    }

    fn sort_key(&self) -> (Option<&SourceInfo>, Level, Code, &str) {
        (self.source.as_ref(), self.level, self.code, &self.message)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.level {
            Level::Error => self.level.name().red().bold().to_string(),
            Level::Warning => self.level.name().yellow().bold().to_string(),
            Level::Suggestion => self.level.name().cyan().to_string(),
        };
        write!(f, "{level}[{}]", self.code.as_str().dimmed())?;
        if let Some(source) = &self.source {
            write!(f, " {}", source.to_string().cyan())?;
        }
        write!(f, " {} {}", "→".red(), self.message)
    }
}

// ============================================================================
// Diagnostics sink
// ============================================================================

/// Thread-safe, append-only collection of diagnostics for one build.
#[derive(Debug, Default)]
pub struct Diagnostics {
    items: Mutex<Vec<Diagnostic>>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, diagnostic: Diagnostic) {
        self.items.lock().push(diagnostic);
    }

    pub fn extend(&self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        self.items.lock().extend(diagnostics);
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.count(Level::Error)
    }

    pub fn warning_count(&self) -> usize {
        self.count(Level::Warning)
    }

    fn count(&self, level: Level) -> usize {
        self.items.lock().iter().filter(|d| d.level == level).count()
    }

    /// Check whether any diagnostic with `code` was reported.
    pub fn has(&self, code: Code) -> bool {
        self.items.lock().iter().any(|d| d.code == code)
    }

    /// Snapshot, sorted by source then level then code for stable output.
    pub fn sorted(&self) -> Vec<Diagnostic> {
        let mut items = self.items.lock().clone();
        items.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        items
    }

    /// Write all diagnostics as a JSON report.
    pub fn write_report(&self, path: &Path) -> std::io::Result<()> {
        #[derive(Serialize)]
        struct Record<'a> {
            level: &'static str,
            code: &'static str,
            message: &'a str,
            #[serde(skip_serializing_if = "Option::is_none")]
            file: Option<String>,
            #[serde(skip_serializing_if = "Option::is_none")]
            line: Option<usize>,
        }

        let items = self.sorted();
        let records: Vec<_> = items
            .iter()
            .map(|d| Record {
                level: d.level.name(),
                code: d.code.as_str(),
                message: &d.message,
                file: d.source.as_ref().map(|s| s.file.to_string()),
                line: d.source.as_ref().and_then(|s| s.line),
            })
            .collect();

        let json = serde_json::to_string_pretty(&records).map_err(std::io::Error::other)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
    }
}
