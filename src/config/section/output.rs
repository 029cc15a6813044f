//! `[output]` and `[xref]` sections.
//!
//! # Example
//!
//! ```toml
//! [output]
//! dir = "_site"
//! manifest = "dependency-map.json"
//! report = "diagnostics.json"
//!
//! [xref]
//! maps = ["xrefmap.json"]
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Where build artifacts are written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Output directory, relative to the docset root.
    pub dir: PathBuf,

    /// Dependency manifest file name inside `dir`.
    pub manifest: String,

    /// Diagnostics report file name inside `dir`.
    pub report: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("_site"),
            manifest: "dependency-map.json".to_string(),
            report: "diagnostics.json".to_string(),
        }
    }
}

/// External cross reference maps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct XrefConfig {
    /// JSON files of `[{ "uid", "href", "name" }]`, relative to the docset root.
    pub maps: Vec<PathBuf>,
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use crate::config::test_parse_config;

    #[test]
    fn test_output_config() {
        let config = test_parse_config("[output]\ndir = \"out\"\n[xref]\nmaps = [\"x.json\"]");
        assert_eq!(config.output.dir, Path::new("out"));
        assert_eq!(config.output.manifest, "dependency-map.json");
        assert_eq!(config.xref.maps, [Path::new("x.json")]);
    }
}
