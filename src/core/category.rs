//! Content type classification.

use serde::Serialize;

use super::RelPath;

/// File names that configure a docset and are never content.
const CONFIG_FILES: &[&str] = &["docfx.yml", "docfx.json", "docset.toml"];

/// Table-of-contents file names.
const TOC_FILES: &[&str] = &["toc.md", "toc.yml", "toc.json"];

/// Kind of content file, determines how it resolves and renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ContentType {
    /// Conceptual markdown page (.md)
    Markdown,
    /// Table of contents (toc.md / toc.yml / toc.json)
    TableOfContents,
    /// Structured YAML/JSON page rendered through a schema
    SchemaDocument,
    /// Copied as-is (images, downloads, ...)
    Resource,
    /// Redirection entry standing in for a removed page
    Redirection,
    /// Configuration and other non-content files
    Unknown,
}

impl ContentType {
    /// Classify a path by file name and extension.
    ///
    /// Redirection is never produced here: it comes from the redirection table.
    pub fn from_path(path: &RelPath) -> Self {
        Self::from_file_name(path.file_name())
    }

    /// Classify a bare file name (`a.md`, `toc.yml`, `logo.png`).
    pub fn from_file_name(name: &str) -> Self {
        let name = name.to_ascii_lowercase();

        if name.is_empty() || CONFIG_FILES.contains(&name.as_str()) {
            return Self::Unknown;
        }
        if TOC_FILES.contains(&name.as_str()) {
            return Self::TableOfContents;
        }

        let extension = name.rfind('.').filter(|&idx| idx > 0).map(|idx| &name[idx + 1..]);
        match extension {
            Some("md") => Self::Markdown,
            Some("yml" | "yaml" | "json") => Self::SchemaDocument,
            _ => Self::Resource,
        }
    }

    /// Markdown and schema documents: can be built into pages and redirected.
    #[inline]
    pub const fn is_master_content(self) -> bool {
        matches!(self, Self::Markdown | Self::SchemaDocument)
    }

    /// Display name for this content type.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Markdown => "markdown",
            Self::TableOfContents => "toc",
            Self::SchemaDocument => "schema",
            Self::Resource => "resource",
            Self::Redirection => "redirection",
            Self::Unknown => "unknown",
        }
    }
}
