//! `[[dependencies]]` array configuration.
//!
//! Each entry mounts an external, read-only docset under a path prefix.
//! Entries are tried in the order they are declared.
//!
//! # Example
//!
//! ```toml
//! [[dependencies]]
//! name = "_themes"                                   # Mount prefix
//! url = "https://github.com/example/theme-docs"      # Restore source
//! branch = "main"
//!
//! [[dependencies]]
//! name = "shared/api"
//! path = "../api-docs"                               # Already on disk
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// One dependency docset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyConfig {
    /// Mount prefix, also the dependency's identity.
    pub name: String,

    /// Remote repository the docset is restored from.
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub branch: Option<String>,

    /// Local checkout, relative to the docset root. Skips restoring.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl DependencyConfig {
    /// Mount prefix without surrounding slashes.
    pub fn prefix(&self) -> &str {
        self.name.trim_matches('/')
    }
}
