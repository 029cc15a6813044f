//! Addressable content units.
//!
//! A [`Document`] is created lazily the first time a path resolves and is
//! immutable afterwards. Site path and URL are pure functions of the
//! address, the content type and the base path:
//!
//! ```text
//! a/b.md        → a/b.json        /a/b
//! a/index.md    → a/index.json    /a/
//! a/toc.yml     → a/toc.json      /a/toc.json
//! img/x.png     → img/x.png       /img/x.png
//! (dep) _t/a.md → _t/a.json       /_t/a
//! ```

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::core::url::join_site_url;
use crate::core::{ContentType, Origin, PathAddress};

/// Schema name of landing pages, which may link to paths that are not files.
pub const LANDING_DATA: &str = "LandingData";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub address: PathAddress,
    pub content_type: ContentType,
    /// Schema name of a schema document (`### YamlMime:<Name>`).
    pub mime: Option<Arc<str>>,
    /// Output path relative to the site root.
    pub site_path: Arc<str>,
    /// Absolute site URL, or the redirect target for redirections.
    pub site_url: Arc<str>,
}

impl Document {
    /// Create a content document, deriving site path and URL.
    pub fn new(address: PathAddress, mime: Option<Arc<str>>, base_path: &str) -> Self {
        let content_type = ContentType::from_path(&address.path);
        let site_path = site_path(&address, content_type);
        let site_url = site_url(&site_path, content_type, base_path);
        Self {
            address,
            content_type,
            mime,
            site_path: Arc::from(site_path),
            site_url: Arc::from(site_url),
        }
    }

    /// Create the stand-in for a redirected path.
    pub fn redirection(address: PathAddress, target_url: &str) -> Self {
        let site_path = site_path(&address, ContentType::Markdown);
        Self {
            address,
            content_type: ContentType::Redirection,
            mime: None,
            site_path: Arc::from(site_path),
            site_url: Arc::from(target_url),
        }
    }

    #[inline]
    pub fn is_master_content(&self) -> bool {
        self.content_type.is_master_content()
    }

    #[inline]
    pub fn is_resource(&self) -> bool {
        self.content_type == ContentType::Resource
    }

    pub fn is_landing_page(&self) -> bool {
        self.mime.as_deref() == Some(LANDING_DATA)
    }

    /// Dependency name when this document comes from a dependency docset.
    pub fn dependency_name(&self) -> Option<&str> {
        self.address.origin.dependency_name()
    }
}

impl Hash for Document {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.address.hash(state);
    }
}

/// Docset-relative path with the dependency mount prefix restored.
fn mounted_path(address: &PathAddress) -> String {
    match &address.origin {
        Origin::Dependency(_) => address.manifest_key(),
        Origin::Current | Origin::Fallback => address.path.to_string(),
    }
}

fn site_path(address: &PathAddress, content_type: ContentType) -> String {
    let path = mounted_path(address);
    match content_type {
        ContentType::Markdown
        | ContentType::SchemaDocument
        | ContentType::TableOfContents
        | ContentType::Redirection => {
            let stem = match path.rfind('.') {
                Some(dot) if dot > path.rfind('/').map_or(0, |slash| slash + 1) => &path[..dot],
                _ => path.as_str(),
            };
            format!("{stem}.json")
        }
        ContentType::Resource | ContentType::Unknown => path,
    }
}

fn site_url(site_path: &str, content_type: ContentType, base_path: &str) -> String {
    match content_type {
        ContentType::Markdown | ContentType::SchemaDocument | ContentType::Redirection => {
            let stem = site_path.strip_suffix(".json").unwrap_or(site_path);
            let (dir, name) = match stem.rfind('/') {
                Some(idx) => (&stem[..=idx], &stem[idx + 1..]),
                None => ("", stem),
            };
            if name.eq_ignore_ascii_case("index") {
                join_site_url(base_path, dir)
            } else {
                join_site_url(base_path, stem)
            }
        }
        ContentType::TableOfContents | ContentType::Resource | ContentType::Unknown => {
            join_site_url(base_path, site_path)
        }
    }
}

/// Read the schema name from the first line of a schema document.
///
/// ```text
/// ### YamlMime:LandingData
/// ```
pub fn read_mime(head: &str) -> Option<Arc<str>> {
    let first = head.lines().next()?.trim();
    let rest = first.strip_prefix('#')?.trim_start_matches('#').trim_start();
    let name = rest.strip_prefix("YamlMime:")?.trim();
    (!name.is_empty()).then(|| Arc::from(name))
}
