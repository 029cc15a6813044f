//! Build scope: which files exist and which of them take part in the build.
//!
//! - [`FileIndex`]: every file on disk under a docset root, with a
//!   case-insensitive view for correcting link casing
//! - [`ScopeGlob`]: compiled `[files]` include/exclude rules
//! - [`BuildScope`]: in-scope files of the current docset (and with the
//!   fallback docset), computed once per build
//!
//! Everything here is read-only after construction.

use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use jwalk::WalkDir;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::config::{ConfigError, FilesConfig};
use crate::core::{Origin, PathAddress, RelPath};
use crate::diagnostic::{Code, Diagnostic, Diagnostics, SourceInfo};
use crate::docset::{Document, RedirectionTable};
use crate::{debug, log};

// ============================================================================
// FileIndex
// ============================================================================

/// All files of one docset, keyed by normalized relative path.
#[derive(Debug, Default)]
pub struct FileIndex {
    root: PathBuf,
    files: FxHashSet<RelPath>,
    by_lower: FxHashMap<String, RelPath>,
    /// Pairs of paths equal except for casing.
    duplicates: Vec<(RelPath, RelPath)>,
}

impl FileIndex {
    /// Enumerate every file under `root` (parallel walk).
    ///
    /// Hidden entries (`.git`, dotfiles) are skipped by the walker.
    pub fn scan(root: &Path) -> Self {
        let paths: Vec<String> = WalkDir::new(root)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .filter_map(|e| {
                let path = e.path();
                let rel = path.strip_prefix(root).ok()?;
                rel.to_str().map(str::to_string)
            })
            .collect();

        let index = Self::from_paths(root, paths.iter().map(String::as_str));
        debug!("scope"; "indexed {} files under {}", index.len(), root.display());
        index
    }

    /// Build an index from known relative paths.
    pub fn from_paths<'a>(root: &Path, paths: impl IntoIterator<Item = &'a str>) -> Self {
        let mut sorted: Vec<RelPath> = paths
            .into_iter()
            .filter_map(|p| RelPath::normalize(p).ok())
            .filter(|p| !p.is_empty())
            .collect();
        sorted.sort();
        sorted.dedup();

        let mut by_lower: FxHashMap<String, RelPath> = FxHashMap::default();
        let mut duplicates = Vec::new();
        for path in &sorted {
            if let Some(existing) = by_lower.get(&path.to_lower()) {
                duplicates.push((existing.clone(), path.clone()));
            } else {
                by_lower.insert(path.to_lower(), path.clone());
            }
        }

        Self {
            root: root.to_path_buf(),
            files: sorted.into_iter().collect(),
            by_lower,
            duplicates,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Exact (case-sensitive) membership.
    pub fn contains(&self, path: &RelPath) -> bool {
        self.files.contains(path)
    }

    /// The on-disk spelling of `path`, matching case-insensitively.
    ///
    /// Exact matches win over case-insensitive ones.
    pub fn correct_case(&self, path: &RelPath) -> Option<RelPath> {
        if self.files.contains(path) {
            return Some(path.clone());
        }
        self.by_lower.get(&path.to_lower()).cloned()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RelPath> {
        self.files.iter()
    }

    pub fn duplicates(&self) -> &[(RelPath, RelPath)] {
        &self.duplicates
    }
}

// ============================================================================
// ScopeGlob
// ============================================================================

/// Compiled include/exclude predicate. Pure function of a relative path.
#[derive(Debug)]
pub struct ScopeGlob {
    include: GlobSet,
    exclude: GlobSet,
}

impl ScopeGlob {
    pub fn new(files: &FilesConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            include: build_set(&files.include)?,
            exclude: build_set(&files.exclude)?,
        })
    }

    pub fn is_match(&self, path: &RelPath) -> bool {
        let path = path.as_str();
        self.include.is_match(path) && !self.exclude.is_match(path)
    }
}

fn build_set(patterns: &[String]) -> Result<GlobSet, ConfigError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = GlobBuilder::new(pattern)
            .literal_separator(true)
            .case_insensitive(true)
            .build()
            .map_err(|source| ConfigError::Glob {
                pattern: pattern.clone(),
                source,
            })?;
        builder.add(glob);
    }
    builder.build().map_err(|source| ConfigError::Glob {
        pattern: patterns.join(", "),
        source,
    })
}

// ============================================================================
// BuildScope
// ============================================================================

/// In-scope files of the build.
#[derive(Debug)]
pub struct BuildScope {
    glob: ScopeGlob,
    /// In-scope files of the current docset, sorted.
    files: Vec<PathAddress>,
    /// `files` plus in-scope fallback files not shadowed locally, sorted.
    files_with_fallback: Vec<PathAddress>,
    /// Lowercased paths of redirection sources.
    redirected: FxHashSet<String>,
}

impl BuildScope {
    /// Classify every file of the current (and fallback) docset.
    ///
    /// Redirection sources are always in scope. Paths that differ only by
    /// case are reported as `duplicate-casing` warnings.
    pub fn create(
        files: &FilesConfig,
        entry: &FileIndex,
        fallback: Option<&FileIndex>,
        redirections: &RedirectionTable,
        diagnostics: &Diagnostics,
    ) -> Result<Self, ConfigError> {
        let glob = ScopeGlob::new(files)?;

        let mut current: Vec<PathAddress> = entry
            .iter()
            .filter(|path| glob.is_match(path))
            .map(|path| PathAddress::new(path.clone(), Origin::Current))
            .collect();
        let matched: FxHashSet<String> = current.iter().map(|a| a.path.to_lower()).collect();
        current.extend(
            redirections
                .entries()
                .filter(|redirect| !matched.contains(&redirect.source.to_lower()))
                .map(|redirect| PathAddress::new(redirect.source.clone(), Origin::Current)),
        );
        current.sort();
        current.dedup();

        for (first, second) in entry.duplicates() {
            if glob.is_match(first) || glob.is_match(second) {
                diagnostics.push(
                    Diagnostic::warning(
                        Code::DuplicateCasing,
                        format!("Files '{first}' and '{second}' differ only by casing"),
                    )
                    .with_source(SourceInfo::new(PathAddress::new(
                        second.clone(),
                        Origin::Current,
                    ))),
                );
            }
        }

        let mut with_fallback = current.clone();
        if let Some(fallback) = fallback {
            let local: FxHashSet<String> = current.iter().map(|a| a.path.to_lower()).collect();
            with_fallback.extend(
                fallback
                    .iter()
                    .filter(|path| glob.is_match(path) && !local.contains(&path.to_lower()))
                    .map(|path| PathAddress::new(path.clone(), Origin::Fallback)),
            );
            with_fallback.sort();
        }

        log!(
            "scope";
            "{} files in scope ({} with fallback)",
            current.len(),
            with_fallback.len()
        );

        Ok(Self {
            glob,
            files: current,
            files_with_fallback: with_fallback,
            redirected: redirections.entries().map(|e| e.source.to_lower()).collect(),
        })
    }

    pub fn files(&self) -> &[PathAddress] {
        &self.files
    }

    pub fn files_with_fallback(&self) -> &[PathAddress] {
        &self.files_with_fallback
    }

    /// Whether a resolved document exists but is excluded from this build.
    ///
    /// Dependency docsets are closed universes with their own scope, so only
    /// current and fallback documents can be out of scope.
    pub fn out_of_scope(&self, doc: &Document) -> bool {
        match doc.address.origin {
            Origin::Dependency(_) => false,
            Origin::Current | Origin::Fallback => {
                !self.glob.is_match(&doc.address.path)
                    && !self.redirected.contains(&doc.address.path.to_lower())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::fs;
    use tempfile::TempDir;

    fn rel(s: &str) -> RelPath {
        RelPath::normalize(s).unwrap()
    }

    fn files(include: &[&str], exclude: &[&str]) -> FilesConfig {
        FilesConfig {
            include: include.iter().map(|s| s.to_string()).collect(),
            exclude: exclude.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn no_redirections() -> RedirectionTable {
        RedirectionTable::create(&BTreeMap::new(), "/").unwrap()
    }

    #[test]
    fn test_scan_skips_hidden() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("a/.git")).unwrap();
        fs::write(dir.path().join("a/b.md"), "").unwrap();
        fs::write(dir.path().join("a/.git/HEAD"), "").unwrap();
        fs::write(dir.path().join("index.md"), "").unwrap();

        let index = FileIndex::scan(dir.path());
        assert_eq!(index.len(), 2);
        assert!(index.contains(&rel("a/b.md")));
        assert!(index.contains(&rel("index.md")));
    }

    #[test]
    fn test_correct_case() {
        let index = FileIndex::from_paths(Path::new("."), ["docs/Foo.md", "img/a.png"]);
        assert_eq!(index.correct_case(&rel("docs/foo.MD")), Some(rel("docs/Foo.md")));
        assert_eq!(index.correct_case(&rel("img/a.png")), Some(rel("img/a.png")));
        assert_eq!(index.correct_case(&rel("img/b.png")), None);
    }

    #[test]
    fn test_glob() {
        let glob = ScopeGlob::new(&files(&["docs/**", "*.md"], &["docs/drafts/**"])).unwrap();
        assert!(glob.is_match(&rel("docs/a/b.md")));
        assert!(glob.is_match(&rel("README.md")));
        assert!(!glob.is_match(&rel("other/x.md")));
        assert!(!glob.is_match(&rel("docs/drafts/x.md")));
        assert!(glob.is_match(&rel("DOCS/A.md")));
    }

    #[test]
    fn test_invalid_glob() {
        let result = ScopeGlob::new(&files(&["a/[b"], &[]));
        assert!(matches!(result, Err(ConfigError::Glob { .. })));
    }

    #[test]
    fn test_create_scope() {
        let entry = FileIndex::from_paths(Path::new("."), ["a.md", "drafts/b.md", "img/x.png"]);
        let fallback = FileIndex::from_paths(Path::new("."), ["a.md", "c.md"]);
        let diagnostics = Diagnostics::new();

        let scope = BuildScope::create(
            &files(&["**"], &["drafts/**"]),
            &entry,
            Some(&fallback),
            &no_redirections(),
            &diagnostics,
        )
        .unwrap();

        let paths: Vec<_> = scope.files().iter().map(|a| a.path.as_str()).collect();
        assert_eq!(paths, ["a.md", "img/x.png"]);

        let with_fallback: Vec<_> = scope
            .files_with_fallback()
            .iter()
            .map(|a| a.to_string())
            .collect();
        assert_eq!(with_fallback, ["a.md", "img/x.png", "c.md (fallback)"]);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_redirection_sources_in_scope() {
        let entry = FileIndex::from_paths(Path::new("."), ["a.md"]);
        let mut map = BTreeMap::new();
        map.insert("archive/old.md".to_string(), "/new".to_string());
        let redirections = RedirectionTable::create(&map, "/").unwrap();

        let scope = BuildScope::create(
            &files(&["**"], &["archive/**"]),
            &entry,
            None,
            &redirections,
            &Diagnostics::new(),
        )
        .unwrap();

        assert!(scope.files().iter().any(|a| a.path.as_str() == "archive/old.md"));
        let redirect = Document::redirection(PathAddress::current("archive/old.md").unwrap(), "/new");
        assert!(!scope.out_of_scope(&redirect));
    }

    #[test]
    fn test_out_of_scope() {
        let entry = FileIndex::from_paths(Path::new("."), ["a.md", "drafts/b.md"]);
        let scope = BuildScope::create(
            &files(&["**"], &["drafts/**"]),
            &entry,
            None,
            &no_redirections(),
            &Diagnostics::new(),
        )
        .unwrap();

        let excluded = Document::new(PathAddress::current("drafts/b.md").unwrap(), None, "/");
        let included = Document::new(PathAddress::current("a.md").unwrap(), None, "/");
        let dependency = Document::new(
            PathAddress::new(rel("drafts/b.md"), Origin::dependency("dep")),
            None,
            "/",
        );
        assert!(scope.out_of_scope(&excluded));
        assert!(!scope.out_of_scope(&included));
        assert!(!scope.out_of_scope(&dependency));
    }

    #[test]
    fn test_duplicate_casing_warning() {
        let entry = FileIndex::from_paths(Path::new("."), ["a.md", "A.md"]);
        let diagnostics = Diagnostics::new();
        BuildScope::create(
            &FilesConfig::default(),
            &entry,
            None,
            &no_redirections(),
            &diagnostics,
        )
        .unwrap();
        assert!(diagnostics.has(Code::DuplicateCasing));
        assert_eq!(diagnostics.warning_count(), 1);
    }
}
