//! Docset configuration management for `docset.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # Configuration section definitions
//! │   ├── files         # [files]
//! │   ├── dependency    # [[dependencies]]
//! │   ├── localization  # [localization]
//! │   └── output        # [output], [xref]
//! ├── error          # ConfigError
//! ├── util           # find_config_file, base path helpers
//! └── mod.rs         # DocsetConfig (this file)
//! ```
//!
//! # Sections
//!
//! | Section              | Purpose                                     |
//! |----------------------|---------------------------------------------|
//! | `base_path`          | URL prefix of every site URL                |
//! | `site_url`           | Published URL; its path overrides base_path |
//! | `[files]`            | Build scope globs                           |
//! | `[resolve_alias]`    | Path prefix rewrites (`~/` = docset root)   |
//! | `[[dependencies]]`   | Mounted dependency docsets, in order        |
//! | `[localization]`     | Locale and fallback docset                  |
//! | `[redirections]`     | Legacy path to replacement URL              |
//! | `[xref]`             | External xref maps                          |
//! | `[output]`           | Manifest and report locations               |
//!
//! Configuration is an explicit value handed to the build; there is no
//! global handle.

mod error;
pub mod section;
mod util;

pub use error::ConfigError;
pub use section::{
    DependencyConfig, FilesConfig, LocalizationConfig, OutputConfig, XrefConfig,
};
pub use util::find_config_file;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::core::RelPath;
use crate::debug;
use util::{extract_url_path, normalize_base_path};

/// Default config file name.
pub const CONFIG_FILE: &str = "docset.toml";

/// Alias every docset gets: `~/a.md` is `a.md` at the docset root.
const ROOT_ALIAS: (&str, &str) = ("~/", "");

/// Root configuration structure for `docset.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DocsetConfig {
    /// Docset root directory (parent of the config file).
    #[serde(skip)]
    root: PathBuf,

    /// Unknown keys found while parsing.
    #[serde(skip)]
    unknown_fields: Vec<String>,

    pub base_path: String,

    pub site_url: Option<String>,

    pub files: FilesConfig,

    /// Prefix rewrites, merged with the built-in `~/` alias.
    pub resolve_alias: BTreeMap<String, String>,

    pub dependencies: Vec<DependencyConfig>,

    pub localization: LocalizationConfig,

    /// Source path to target href.
    pub redirections: BTreeMap<String, String>,

    pub xref: XrefConfig,

    pub output: OutputConfig,

    /// Where restored dependencies are materialized, relative to root.
    pub cache_dir: PathBuf,
}

impl Default for DocsetConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            unknown_fields: Vec::new(),
            base_path: "/".to_string(),
            site_url: None,
            files: FilesConfig::default(),
            resolve_alias: BTreeMap::new(),
            dependencies: Vec::new(),
            localization: LocalizationConfig::default(),
            redirections: BTreeMap::new(),
            xref: XrefConfig::default(),
            output: OutputConfig::default(),
            cache_dir: PathBuf::from(".doclink"),
        }
    }
}

impl DocsetConfig {
    /// Find `config_name` upward from `start` and load it.
    pub fn discover(start: &Path, config_name: &Path) -> Result<Self, ConfigError> {
        let path = find_config_file(start, config_name).ok_or_else(|| {
            ConfigError::Validation(format!(
                "config file '{}' not found in '{}' or any parent",
                config_name.display(),
                start.display()
            ))
        })?;
        Self::load(&path)
    }

    /// Load configuration from file path.
    ///
    /// Unknown fields are kept in [`Self::unknown_fields`] and reported as
    /// build diagnostics.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let root = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let config = Self::from_str(&content, &root)?;
        debug!("config"; "loaded {}", path.display());
        Ok(config)
    }

    /// Parse configuration from TOML string, rooted at `root`.
    pub fn from_str(content: &str, root: &Path) -> Result<Self, ConfigError> {
        let (mut config, ignored) = Self::parse_with_ignored(content)?;
        config.unknown_fields = ignored;
        config.finalize(root);
        config.validate()?;
        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    fn finalize(&mut self, root: &Path) {
        self.root = root.to_path_buf();

        // site_url wins so published URLs and links agree
        if let Some(url) = &self.site_url
            && let Some(path) = extract_url_path(url)
        {
            self.base_path = path;
        }
        self.base_path = normalize_base_path(&self.base_path);
    }

    /// Check invariants serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = FxHashSet::default();
        for dep in &self.dependencies {
            let prefix = dep.prefix();
            if prefix.is_empty() {
                return Err(ConfigError::Validation(
                    "dependency name must not be empty".to_string(),
                ));
            }
            if RelPath::normalize(prefix).map_or(true, |p| p.as_str() != prefix) {
                return Err(ConfigError::Validation(format!(
                    "dependency name `{}` must be a plain relative path",
                    dep.name
                )));
            }
            if !seen.insert(prefix.to_ascii_lowercase()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate dependency `{}`",
                    dep.name
                )));
            }
        }

        for alias in self.resolve_alias.keys() {
            if alias.is_empty() {
                return Err(ConfigError::Validation(
                    "resolve_alias keys must not be empty".to_string(),
                ));
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    /// Get the docset root directory path
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Join a path with the root directory.
    pub fn root_join(&self, path: impl AsRef<Path>) -> PathBuf {
        self.root.join(path)
    }

    pub fn unknown_fields(&self) -> &[String] {
        &self.unknown_fields
    }

    /// Aliases sorted longest prefix first, built-in `~/` included.
    pub fn aliases(&self) -> Vec<(String, String)> {
        let mut aliases: Vec<(String, String)> = self
            .resolve_alias
            .iter()
            .map(|(from, to)| (from.replace('\\', "/"), to.replace('\\', "/")))
            .collect();
        if !aliases.iter().any(|(from, _)| from == ROOT_ALIAS.0) {
            aliases.push((ROOT_ALIAS.0.to_string(), ROOT_ALIAS.1.to_string()));
        }
        aliases.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));
        aliases
    }

    pub fn dependency(&self, name: &str) -> Option<&DependencyConfig> {
        self.dependencies.iter().find(|d| d.prefix() == name)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.root.join(&self.output.dir)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.output_dir().join(&self.output.manifest)
    }

    pub fn report_path(&self) -> PathBuf {
        self.output_dir().join(&self.output.report)
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.root.join(&self.cache_dir)
    }

    /// Override the output directory (from `--output`).
    pub fn set_output_dir(&mut self, dir: PathBuf) {
        self.output.dir = dir;
    }
}

/// Parse a test config rooted at `.`, asserting there are no unknown fields.
#[cfg(test)]
pub fn test_parse_config(extra: &str) -> DocsetConfig {
    let config = DocsetConfig::from_str(extra, Path::new(".")).unwrap();
    assert!(
        config.unknown_fields.is_empty(),
        "test config has unknown fields: {:?}",
        config.unknown_fields
    );
    config
}

// ============================================================================
// tests
// ============================================================================
