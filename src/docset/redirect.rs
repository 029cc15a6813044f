//! Redirection table: legacy paths mapped to replacement URLs.
//!
//! Loaded once from `[redirections]`; immutable for the build. Only master
//! content can be redirected, anything else aborts the build.

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;

use crate::core::url::resolve_url;
use crate::core::{ContentType, Origin, PathAddress, RelPath};
use crate::docset::Document;
use crate::error::BuildError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectionEntry {
    pub source: RelPath,
    /// Absolute site URL or external URL.
    pub target: String,
}

#[derive(Debug, Default)]
pub struct RedirectionTable {
    /// Keyed by lowercased source path.
    entries: FxHashMap<String, RedirectionEntry>,
}

impl RedirectionTable {
    /// Validate and normalize the configured redirections.
    ///
    /// Relative targets resolve against the URL the source page had.
    pub fn create(map: &BTreeMap<String, String>, base_path: &str) -> Result<Self, BuildError> {
        let mut entries = FxHashMap::default();

        for (source, target) in map {
            let path = RelPath::normalize(source).map_err(|err| {
                BuildError::InvalidRedirectionPath {
                    path: source.clone(),
                    source: err,
                }
            })?;
            if path.is_empty() || !ContentType::from_path(&path).is_master_content() {
                return Err(BuildError::InvalidRedirection {
                    path: source.clone(),
                });
            }

            let address = PathAddress::new(path.clone(), Origin::Current);
            let source_url = Document::new(address, None, base_path).site_url;
            let target = resolve_url(&source_url, target.trim());

            entries.insert(path.to_lower(), RedirectionEntry {
                source: path,
                target,
            });
        }

        Ok(Self { entries })
    }

    /// Look up a path, ignoring case.
    pub fn try_get(&self, path: &RelPath) -> Option<&RedirectionEntry> {
        self.entries.get(&path.to_lower())
    }

    pub fn entries(&self) -> impl Iterator<Item = &RedirectionEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(pairs: &[(&str, &str)]) -> Result<RedirectionTable, BuildError> {
        let map = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        RedirectionTable::create(&map, "/")
    }

    #[test]
    fn test_lookup_ignores_case() {
        let table = table(&[("docs/Old.md", "/new-location")]).unwrap();
        let entry = table
            .try_get(&RelPath::normalize("DOCS/old.md").unwrap())
            .unwrap();
        assert_eq!(entry.source.as_str(), "docs/Old.md");
        assert_eq!(entry.target, "/new-location");
        assert!(table.try_get(&RelPath::normalize("docs/new.md").unwrap()).is_none());
    }

    #[test]
    fn test_relative_target() {
        let table = table(&[("a/old.md", "new"), ("b/index.md", "../c/")]).unwrap();
        let lookup = |p: &str| table.try_get(&RelPath::normalize(p).unwrap()).unwrap().target.clone();
        assert_eq!(lookup("a/old.md"), "/a/new");
        assert_eq!(lookup("b/index.md"), "/c/");
    }

    #[test]
    fn test_external_target_kept() {
        let table = table(&[("old.md", "https://example.com/x")]).unwrap();
        assert_eq!(table.entries().next().unwrap().target, "https://example.com/x");
    }

    #[test]
    fn test_non_master_content_is_fatal() {
        assert!(matches!(
            table(&[("img/logo.png", "/x")]),
            Err(BuildError::InvalidRedirection { .. })
        ));
        assert!(matches!(
            table(&[("toc.yml", "/x")]),
            Err(BuildError::InvalidRedirection { .. })
        ));
        assert!(matches!(
            table(&[("../old.md", "/x")]),
            Err(BuildError::InvalidRedirectionPath { .. })
        ));
    }
}
