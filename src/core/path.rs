//! Origin-tagged file addresses.
//!
//! - [`RelPath`]: normalized, docset-root-relative path (no I/O)
//! - [`Origin`]: which docset a file belongs to
//! - [`PathAddress`]: `(origin, path)` identity of a file in the build universe
//!
//! # Invariants
//!
//! - `RelPath` uses forward slashes, has no leading `/` and no `.`/`..` segments
//! - Two addresses with the same path but different origins are different files
//! - The optional commit annotation never takes part in identity

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use thiserror::Error;

// ============================================================================
// RelPath
// ============================================================================

/// Path normalization failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("path '{0}' escapes the docset root")]
    EscapesRoot(String),
}

/// Normalized relative path inside a docset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelPath(Arc<str>);

impl RelPath {
    /// Normalize a raw path string.
    ///
    /// Converts backslashes, strips leading `/`, collapses `./` and resolves
    /// `../`. Climbing above the root is an error, never a clamped path.
    pub fn normalize(raw: &str) -> Result<Self, PathError> {
        let unified = raw.replace('\\', "/");
        let mut segments: Vec<&str> = Vec::new();

        for part in unified.split('/') {
            match part {
                "" | "." => {}
                ".." => {
                    if segments.pop().is_none() {
                        return Err(PathError::EscapesRoot(raw.to_string()));
                    }
                }
                _ => segments.push(part),
            }
        }

        Ok(Self(Arc::from(segments.join("/"))))
    }

    /// Resolve `relative` against the directory `base_dir`.
    ///
    /// ```ignore
    /// combine("a/b", "../c.md") -> "a/c.md"
    /// combine("a", "./img/x.png") -> "a/img/x.png"
    /// ```
    pub fn combine(base_dir: &str, relative: &str) -> Result<Self, PathError> {
        let relative = relative.replace('\\', "/");
        if base_dir.is_empty() || relative.starts_with('/') {
            return Self::normalize(&relative);
        }
        Self::normalize(&format!("{base_dir}/{relative}"))
            .map_err(|_| PathError::EscapesRoot(relative.clone()))
    }

    /// The empty (root) path.
    pub fn root() -> Self {
        Self(Arc::from(""))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Directory part (`a/b/c.md` -> `a/b`, `c.md` -> ``).
    pub fn dir(&self) -> &str {
        self.0.rfind('/').map_or("", |idx| &self.0[..idx])
    }

    /// Last segment (`a/b/c.md` -> `c.md`).
    pub fn file_name(&self) -> &str {
        self.0.rfind('/').map_or(&self.0, |idx| &self.0[idx + 1..])
    }

    /// Lowercased extension without the dot.
    pub fn extension(&self) -> Option<String> {
        let name = self.file_name();
        name.rfind('.')
            .filter(|&idx| idx > 0)
            .map(|idx| name[idx + 1..].to_ascii_lowercase())
    }

    /// Path without its extension (`a/b.md` -> `a/b`).
    pub fn without_extension(&self) -> &str {
        let name_start = self.0.len() - self.file_name().len();
        match self.file_name().rfind('.') {
            Some(idx) if idx > 0 => &self.0[..name_start + idx],
            _ => &self.0,
        }
    }

    /// Strip a directory prefix (`_themes/a.md` - `_themes` -> `a.md`).
    ///
    /// Matching is by whole segments and ignores ASCII case.
    pub fn strip_dir_prefix(&self, prefix: &str) -> Option<Self> {
        let prefix = prefix.trim_matches('/');
        if prefix.is_empty() {
            return Some(self.clone());
        }
        let head = self.0.get(..prefix.len())?;
        if !head.eq_ignore_ascii_case(prefix) {
            return None;
        }
        match &self.0[prefix.len()..] {
            "" => Some(Self::root()),
            rest if rest.starts_with('/') => Some(Self(Arc::from(&rest[1..]))),
            _ => None,
        }
    }

    /// Lowercased form used for case-insensitive lookups.
    pub fn to_lower(&self) -> String {
        self.0.to_lowercase()
    }
}

impl fmt::Display for RelPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RelPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// Origin
// ============================================================================

/// Which docset a file comes from.
///
/// Variant order defines manifest order: current, fallback, dependencies.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Origin {
    Current,
    Fallback,
    Dependency(Arc<str>),
}

impl Origin {
    pub fn dependency(name: &str) -> Self {
        Self::Dependency(Arc::from(name))
    }

    pub fn dependency_name(&self) -> Option<&str> {
        match self {
            Self::Dependency(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Current => f.write_str("current"),
            Self::Fallback => f.write_str("fallback"),
            Self::Dependency(name) => write!(f, "dependency:{name}"),
        }
    }
}

// ============================================================================
// PathAddress
// ============================================================================

/// A file somewhere in the multi-docset universe.
#[derive(Debug, Clone)]
pub struct PathAddress {
    pub path: RelPath,
    pub origin: Origin,
    /// Set when the content comes from git history rather than the worktree.
    pub commit: Option<Arc<str>>,
}

impl PathAddress {
    pub fn new(path: RelPath, origin: Origin) -> Self {
        Self {
            path,
            origin,
            commit: None,
        }
    }

    pub fn current(path: &str) -> Result<Self, PathError> {
        Ok(Self::new(RelPath::normalize(path)?, Origin::Current))
    }

    pub fn with_commit(mut self, commit: impl Into<Arc<str>>) -> Self {
        self.commit = Some(commit.into());
        self
    }

    /// Key used in the dependency manifest.
    ///
    /// Fallback files share the logical path of the file they stand in for;
    /// dependency files get their mount prefix back.
    pub fn manifest_key(&self) -> String {
        match &self.origin {
            Origin::Current | Origin::Fallback => self.path.to_string(),
            Origin::Dependency(name) if self.path.is_empty() => name.to_string(),
            Origin::Dependency(name) => format!("{name}/{}", self.path),
        }
    }
}

impl PartialEq for PathAddress {
    fn eq(&self, other: &Self) -> bool {
        self.origin == other.origin && self.path == other.path
    }
}

impl Eq for PathAddress {}

impl Hash for PathAddress {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.origin.hash(state);
        self.path.hash(state);
    }
}

impl Ord for PathAddress {
    fn cmp(&self, other: &Self) -> Ordering {
        self.origin
            .cmp(&other.origin)
            .then_with(|| self.path.cmp(&other.path))
    }
}

impl PartialOrd for PathAddress {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for PathAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.origin {
            Origin::Current => write!(f, "{}", self.path)?,
            origin => write!(f, "{} ({origin})", self.path)?,
        }
        if let Some(commit) = &self.commit {
            write!(f, "@{commit}")?;
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHashSet;

    fn rel(s: &str) -> RelPath {
        RelPath::normalize(s).unwrap()
    }

    #[test]
    fn test_normalize() {
        assert_eq!(rel("a/./b/../c.md").as_str(), "a/c.md");
        assert_eq!(rel("/a/b.md").as_str(), "a/b.md");
        assert_eq!(rel("a\\b\\c.md").as_str(), "a/b/c.md");
        assert_eq!(rel("./").as_str(), "");
        assert_eq!(rel("a//b").as_str(), "a/b");
    }

    #[test]
    fn test_normalize_rejects_escape() {
        assert!(matches!(
            RelPath::normalize("../a.md"),
            Err(PathError::EscapesRoot(_))
        ));
        assert!(RelPath::normalize("a/../../b.md").is_err());
    }

    #[test]
    fn test_combine() {
        assert_eq!(RelPath::combine("a/b", "../c.md").unwrap().as_str(), "a/c.md");
        assert_eq!(
            RelPath::combine("a", "./img/x.png").unwrap().as_str(),
            "a/img/x.png"
        );
        assert_eq!(RelPath::combine("", "b.md").unwrap().as_str(), "b.md");
        assert!(RelPath::combine("a", "../../x.md").is_err());
    }

    #[test]
    fn test_parts() {
        let path = rel("docs/guide/Intro.MD");
        assert_eq!(path.dir(), "docs/guide");
        assert_eq!(path.file_name(), "Intro.MD");
        assert_eq!(path.extension().as_deref(), Some("md"));
        assert_eq!(path.without_extension(), "docs/guide/Intro");

        let dotfile = rel(".gitignore");
        assert_eq!(dotfile.extension(), None);
        assert_eq!(rel("a.md").dir(), "");
    }

    #[test]
    fn test_strip_dir_prefix() {
        let path = rel("_themes/x/a.md");
        assert_eq!(path.strip_dir_prefix("_themes").unwrap().as_str(), "x/a.md");
        assert_eq!(path.strip_dir_prefix("_Themes/").unwrap().as_str(), "x/a.md");
        assert!(path.strip_dir_prefix("_the").is_none());
        assert!(path.strip_dir_prefix("other").is_none());
    }

    #[test]
    fn test_address_identity_includes_origin() {
        let current = PathAddress::new(rel("a.md"), Origin::Current);
        let fallback = PathAddress::new(rel("a.md"), Origin::Fallback);
        assert_ne!(current, fallback);

        let mut set = FxHashSet::default();
        set.insert(current.clone());
        set.insert(fallback);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_address_identity_ignores_commit() {
        let plain = PathAddress::new(rel("a.md"), Origin::Fallback);
        let historical = plain.clone().with_commit("abc123");
        assert_eq!(plain, historical);
        assert_eq!(historical.to_string(), "a.md (fallback)@abc123");
    }

    #[test]
    fn test_address_ordering() {
        let mut addrs = vec![
            PathAddress::new(rel("a.md"), Origin::dependency("dep")),
            PathAddress::new(rel("b.md"), Origin::Current),
            PathAddress::new(rel("a.md"), Origin::Fallback),
            PathAddress::new(rel("a.md"), Origin::Current),
        ];
        addrs.sort();
        let keys: Vec<_> = addrs.iter().map(|a| a.to_string()).collect();
        assert_eq!(
            keys,
            ["a.md", "b.md", "a.md (fallback)", "a.md (dependency:dep)"]
        );
    }

    #[test]
    fn test_manifest_key() {
        let dep = PathAddress::new(rel("x/a.md"), Origin::dependency("_themes"));
        assert_eq!(dep.manifest_key(), "_themes/x/a.md");
        let fallback = PathAddress::new(rel("x/a.md"), Origin::Fallback);
        assert_eq!(fallback.manifest_key(), "x/a.md");
    }
}
