//! Cross references (`xref:uid`).
//!
//! [`XrefResolver`] is the seam; [`XrefMap`] is the implementation used by
//! the build. It knows uids declared by in-scope content:
//!
//! - markdown front matter: `uid: some.id`
//! - a top-level `uid:` key of a schema document
//! - external xref map files: `[{ "uid": ..., "href": ..., "name": ... }]`

use std::path::Path;

use rayon::prelude::*;
use rustc_hash::FxHashMap;
use serde::Deserialize;

use crate::core::ContentType;
use crate::docset::{Docset, Document};
use crate::error::BuildError;
use crate::{debug, log};

/// A resolved uid.
#[derive(Debug, Clone, PartialEq)]
pub struct XrefSpec {
    pub uid: String,
    /// Absolute site URL or external URL.
    pub href: String,
    pub name: Option<String>,
    /// Declaring document, when the uid belongs to this build.
    pub declaring: Option<Document>,
}

pub trait XrefResolver: Send + Sync {
    fn resolve_xref(&self, uid: &str, referencing: &Document) -> Option<XrefSpec>;
}

#[derive(Debug, Deserialize)]
struct ExternalXref {
    uid: String,
    href: String,
    #[serde(default)]
    name: Option<String>,
}

/// Uid table for one build.
#[derive(Debug, Default)]
pub struct XrefMap {
    specs: FxHashMap<String, XrefSpec>,
}

impl XrefMap {
    /// Collect uids of in-scope content and configured external maps.
    ///
    /// Local declarations shadow external ones. For duplicate local uids the
    /// first file in path order wins. Redirected pages declare nothing.
    pub fn build(docset: &Docset) -> Result<Self, BuildError> {
        let mut specs = FxHashMap::default();

        for map_path in &docset.config().xref.maps {
            let full = docset.config().root_join(map_path);
            for spec in load_external(&full)? {
                specs.insert(spec.uid.clone(), spec);
            }
        }

        let mut declared: Vec<(String, Document)> = docset
            .scope()
            .files()
            .par_iter()
            .filter(|address| ContentType::from_path(&address.path).is_master_content())
            .filter(|address| docset.redirections().try_get(&address.path).is_none())
            .filter_map(|address| {
                let text = docset.read_text(address).ok()?;
                let uid = declared_uid(&text, ContentType::from_path(&address.path))?;
                Some((uid, docset.document(address.clone())))
            })
            .collect();
        declared.sort_by(|a, b| a.1.address.cmp(&b.1.address));

        let mut local = 0;
        for (uid, doc) in declared.into_iter().rev() {
            local += 1;
            specs.insert(uid.clone(), XrefSpec {
                href: doc.site_url.to_string(),
                name: None,
                declaring: Some(doc),
                uid,
            });
        }
        debug!("xref"; "{} local uids, {} total", local, specs.len());

        Ok(Self { specs })
    }

    pub fn from_specs(specs: impl IntoIterator<Item = XrefSpec>) -> Self {
        Self {
            specs: specs.into_iter().map(|s| (s.uid.clone(), s)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

impl XrefResolver for XrefMap {
    fn resolve_xref(&self, uid: &str, _referencing: &Document) -> Option<XrefSpec> {
        self.specs.get(uid).cloned()
    }
}

fn load_external(path: &Path) -> Result<Vec<XrefSpec>, BuildError> {
    let content =
        std::fs::read_to_string(path).map_err(|err| BuildError::Io(path.to_path_buf(), err))?;
    let entries: Vec<ExternalXref> = serde_json::from_str(&content).map_err(|err| {
        BuildError::Io(
            path.to_path_buf(),
            std::io::Error::new(std::io::ErrorKind::InvalidData, err),
        )
    })?;
    log!("xref"; "loaded {} uids from {}", entries.len(), path.display());

    Ok(entries
        .into_iter()
        .map(|e| XrefSpec {
            uid: e.uid,
            href: e.href,
            name: e.name,
            declaring: None,
        })
        .collect())
}

/// Uid declared by a document, if any.
fn declared_uid(text: &str, content_type: ContentType) -> Option<String> {
    match content_type {
        ContentType::Markdown => front_matter(text).and_then(top_level_uid),
        ContentType::SchemaDocument => top_level_uid(text),
        _ => None,
    }
}

/// Body between the leading `---` fences.
fn front_matter(text: &str) -> Option<&str> {
    let rest = text.strip_prefix("---")?;
    let rest = rest.strip_prefix("\r\n").or_else(|| rest.strip_prefix('\n'))?;
    let end = rest
        .match_indices("\n---")
        .map(|(idx, _)| idx)
        .next()?;
    Some(&rest[..end])
}

/// Value of an unindented `uid:` line.
fn top_level_uid(yaml: &str) -> Option<String> {
    yaml.lines().find_map(|line| {
        let value = line.strip_prefix("uid:")?.trim();
        let value = value.trim_matches(|c| c == '"' || c == '\'');
        (!value.is_empty()).then(|| value.to_string())
    })
}

/// Split `uid?query#fragment` into the uid and the `query+fragment` suffix.
///
/// Only the fragment survives into links; display options in the query are
/// for the renderer.
pub fn split_xref(href: &str) -> (&str, &str) {
    let (head, fragment) = match href.find('#') {
        Some(idx) => (&href[..idx], &href[idx..]),
        None => (href, ""),
    };
    let uid = head.split('?').next().unwrap_or(head);
    (uid, fragment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PathAddress;
    use crate::resolve::file::tests::{docset_with, write_files};
    use crate::repo::tests::MockGit;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn test_front_matter_uid() {
        let text = "---\ntitle: A\nuid: guide.intro\n---\n# A";
        assert_eq!(declared_uid(text, ContentType::Markdown).as_deref(), Some("guide.intro"));
        assert_eq!(declared_uid("# no front matter\nuid: x", ContentType::Markdown), None);
    }

    #[test]
    fn test_schema_uid() {
        let text = "### YamlMime:Module\nuid: learn.module\nunits:\n  uid: nested";
        assert_eq!(
            declared_uid(text, ContentType::SchemaDocument).as_deref(),
            Some("learn.module")
        );
        assert_eq!(declared_uid("uid: 'quoted'", ContentType::SchemaDocument).as_deref(), Some("quoted"));
    }

    #[test]
    fn test_split_xref() {
        assert_eq!(split_xref("System.String"), ("System.String", ""));
        assert_eq!(split_xref("a.b?displayProperty=name#m"), ("a.b", "#m"));
    }

    #[test]
    fn test_build_from_docset() {
        let dir = TempDir::new().unwrap();
        write_files(&dir.path().join("docs"), &[
            ("a.md", "---\nuid: page.a\n---\n# A"),
            ("ref/b.yml", "### YamlMime:Ref\nuid: page.b"),
            ("c.md", "# no uid"),
        ]);
        write_files(dir.path(), &[(
            "docs/xrefmap.json",
            r#"[{ "uid": "System.String", "href": "https://example.com/string", "name": "String" },
                { "uid": "page.a", "href": "https://example.com/shadowed" }]"#,
        )]);

        let docset = docset_with(&dir, "[xref]\nmaps = [\"xrefmap.json\"]", Arc::new(MockGit::default()));
        let map = XrefMap::build(&docset).unwrap();
        let referencing = docset.document(PathAddress::current("c.md").unwrap());

        let a = map.resolve_xref("page.a", &referencing).unwrap();
        assert_eq!(a.href, "/a");
        assert_eq!(a.declaring.unwrap().address.path.as_str(), "a.md");

        let b = map.resolve_xref("page.b", &referencing).unwrap();
        assert_eq!(b.href, "/ref/b");

        let external = map.resolve_xref("System.String", &referencing).unwrap();
        assert!(external.declaring.is_none());
        assert_eq!(external.name.as_deref(), Some("String"));
        assert_eq!(external.href, "https://example.com/string");

        assert!(map.resolve_xref("missing", &referencing).is_none());
    }

    #[test]
    fn test_redirected_page_declares_nothing() {
        let dir = TempDir::new().unwrap();
        write_files(&dir.path().join("docs"), &[
            ("old.md", "---\nuid: legacy\n---\n# Old"),
            ("new.md", "---\nuid: current\n---\n# New"),
        ]);
        let docset = docset_with(
            &dir,
            "[redirections]\n\"old.md\" = \"new\"",
            Arc::new(MockGit::default()),
        );
        let map = XrefMap::build(&docset).unwrap();
        let referencing = docset.document(PathAddress::current("new.md").unwrap());

        assert!(map.resolve_xref("legacy", &referencing).is_none());
        assert!(map.resolve_xref("current", &referencing).is_some());
    }

    #[test]
    fn test_missing_external_map_is_fatal() {
        let dir = TempDir::new().unwrap();
        let docset = docset_with(&dir, "[xref]\nmaps = [\"nope.json\"]", Arc::new(MockGit::default()));
        assert!(matches!(XrefMap::build(&docset), Err(BuildError::Io(..))));
    }
}
