//! `[files]` section configuration.
//!
//! Glob rules deciding which files of the docset are in build scope.
//!
//! # Example
//!
//! ```toml
//! [files]
//! include = ["**"]                       # Globs relative to the docset root
//! exclude = ["_site/**", "drafts/**"]    # Applied after include
//! ```

use serde::{Deserialize, Serialize};

/// Include/exclude glob lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilesConfig {
    /// A file must match at least one of these.
    pub include: Vec<String>,

    /// A file matching any of these is out of scope.
    pub exclude: Vec<String>,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            include: vec!["**".to_string()],
            exclude: vec![
                "_site/**".to_string(),
                "**/.*".to_string(),
                "**/.*/**".to_string(),
            ],
        }
    }
}
