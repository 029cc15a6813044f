//! Repository location for current, fallback and dependency docsets.
//!
//! # Caches
//!
//! | Cache          | Key             | Synchronization                   |
//! |----------------|-----------------|-----------------------------------|
//! | repositories   | directory       | `DashMap` (per shard)             |
//! | dependencies   | dependency name | `DashMap` of per-name `OnceLock`  |
//! | fallback       | (one per build) | `OnceLock`                        |
//!
//! A restore holds only its own `OnceLock`, so a slow restore of one
//! dependency never blocks lookups of another.

mod fetch;
mod git;

pub use fetch::{DependencyFetcher, LocalFetcher, RestoreError, RestoreRequest};
pub use git::{GitProvider, GixProvider};

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;

use crate::config::{DependencyConfig, DocsetConfig};
use crate::core::{Origin, PathAddress};
use crate::docset::FileIndex;
use crate::error::BuildError;
use crate::log;

/// Name used when the fallback docset has to be restored.
const FALLBACK_NAME: &str = "_fallback";

/// A git repository enclosing a docset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    /// Worktree root.
    pub root: PathBuf,
    pub remote: Option<String>,
    pub branch: Option<String>,
    /// `HEAD` commit, `None` for an unborn branch.
    pub commit: Option<String>,
}

/// A docset mounted next to the current one (fallback or dependency).
#[derive(Debug)]
pub struct MountedDocset {
    pub origin: Origin,
    pub root: PathBuf,
    pub index: FileIndex,
}

type Slot<T> = Arc<OnceLock<Result<T, RestoreError>>>;

pub struct RepositoryLocator {
    config: Arc<DocsetConfig>,
    git: Arc<dyn GitProvider>,
    fetcher: Arc<dyn DependencyFetcher>,
    by_dir: DashMap<PathBuf, Option<Arc<Repository>>>,
    dependencies: DashMap<String, Slot<Arc<MountedDocset>>>,
    fallback: OnceLock<Result<Option<Arc<MountedDocset>>, RestoreError>>,
}

impl RepositoryLocator {
    pub fn new(
        config: Arc<DocsetConfig>,
        git: Arc<dyn GitProvider>,
        fetcher: Arc<dyn DependencyFetcher>,
    ) -> Self {
        Self {
            config,
            git,
            fetcher,
            by_dir: DashMap::new(),
            dependencies: DashMap::new(),
            fallback: OnceLock::new(),
        }
    }

    pub fn git(&self) -> &dyn GitProvider {
        self.git.as_ref()
    }

    // ------------------------------------------------------------------------
    // Repositories
    // ------------------------------------------------------------------------

    /// Enclosing repository of `dir`, walking up to the first `.git`.
    ///
    /// `None` is a legal state: the docset is simply not git-tracked.
    pub fn repository_at(&self, dir: &Path) -> Option<Arc<Repository>> {
        if let Some(hit) = self.by_dir.get(dir).map(|entry| entry.clone()) {
            return hit;
        }

        let found = if dir.join(".git").exists() {
            self.git.describe(dir).map(Arc::new)
        } else {
            dir.parent().and_then(|parent| self.repository_at(parent))
        };
        self.by_dir.insert(dir.to_path_buf(), found.clone());
        found
    }

    /// Repository owning the docset of `origin`.
    pub fn repository(&self, origin: &Origin) -> Result<Option<Arc<Repository>>, BuildError> {
        Ok(self
            .root_of(origin)?
            .and_then(|root| self.repository_at(&canonical(&root))))
    }

    /// Repository of `address` and the address's path relative to its root.
    pub fn locate(
        &self,
        address: &PathAddress,
    ) -> Result<Option<(Arc<Repository>, String)>, BuildError> {
        let Some(root) = self.root_of(&address.origin)? else {
            return Ok(None);
        };
        let root = canonical(&root);
        let Some(repo) = self.repository_at(&root) else {
            return Ok(None);
        };

        let full = root.join(address.path.as_str());
        let Ok(relative) = full.strip_prefix(&repo.root) else {
            return Ok(None);
        };
        let path_in_repo = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        Ok(Some((repo, path_in_repo)))
    }

    /// Docset root directory for `origin`.
    ///
    /// `None` only for a fallback origin in a build without fallback.
    pub fn root_of(&self, origin: &Origin) -> Result<Option<PathBuf>, BuildError> {
        match origin {
            Origin::Current => Ok(Some(self.config.root().to_path_buf())),
            Origin::Fallback => Ok(self.fallback()?.map(|f| f.root.clone())),
            Origin::Dependency(name) => Ok(Some(self.dependency(name)?.root.clone())),
        }
    }

    // ------------------------------------------------------------------------
    // Dependencies
    // ------------------------------------------------------------------------

    /// Mounted dependency docset, restored on first use.
    pub fn dependency(&self, name: &str) -> Result<Arc<MountedDocset>, BuildError> {
        let dep = self
            .config
            .dependency(name)
            .ok_or_else(|| BuildError::UnknownDependency(name.to_string()))?;

        // Clone the slot out so the map shard is unlocked during restore
        let slot = Arc::clone(&self.dependencies.entry(name.to_string()).or_default());
        slot.get_or_init(|| self.mount_dependency(dep))
            .clone()
            .map_err(|source| BuildError::DependencyRestore {
                name: name.to_string(),
                source,
            })
    }

    fn mount_dependency(&self, dep: &DependencyConfig) -> Result<Arc<MountedDocset>, RestoreError> {
        let root = match &dep.path {
            Some(path) => self.config.root_join(path),
            None => self.fetcher.restore(RestoreRequest {
                name: dep.prefix(),
                url: dep.url.as_deref(),
                branch: dep.branch.as_deref(),
            })?,
        };
        if !root.is_dir() {
            return Err(RestoreError::NotADirectory(root));
        }

        let index = FileIndex::scan(&root);
        log!("repo"; "mounted `{}` ({} files)", dep.prefix(), index.len());
        Ok(Arc::new(MountedDocset {
            origin: Origin::dependency(dep.prefix()),
            root,
            index,
        }))
    }

    // ------------------------------------------------------------------------
    // Fallback
    // ------------------------------------------------------------------------

    /// Fallback docset of a localized build, resolved at most once.
    pub fn fallback(&self) -> Result<Option<Arc<MountedDocset>>, BuildError> {
        self.fallback
            .get_or_init(|| self.mount_fallback())
            .clone()
            .map_err(BuildError::FallbackRestore)
    }

    fn mount_fallback(&self) -> Result<Option<Arc<MountedDocset>>, RestoreError> {
        let localization = &self.config.localization;
        if !localization.is_localized() {
            return Ok(None);
        }

        let root = if let Some(path) = &localization.fallback {
            self.config.root_join(path)
        } else if let Some(url) = &localization.fallback_url {
            self.fetcher.restore(RestoreRequest {
                name: FALLBACK_NAME,
                url: Some(url),
                branch: localization.fallback_branch.as_deref(),
            })?
        } else {
            return Ok(None);
        };
        if !root.is_dir() {
            return Err(RestoreError::NotADirectory(root));
        }

        let index = FileIndex::scan(&root);
        log!("fallback"; "using {} ({} files)", root.display(), index.len());
        Ok(Some(Arc::new(MountedDocset {
            origin: Origin::Fallback,
            root,
            index,
        })))
    }
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use parking_lot::Mutex;
    use rustc_hash::FxHashMap;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// In-memory history: `(commit, path) -> content`, commits newest first.
    #[derive(Default)]
    pub struct MockGit {
        pub commits: Vec<String>,
        pub files: FxHashMap<(String, String), String>,
        pub describes: Mutex<usize>,
    }

    impl MockGit {
        pub fn with_history(history: &[(&str, &[(&str, &str)])]) -> Self {
            let mut mock = Self::default();
            for (commit, files) in history {
                mock.commits.push(commit.to_string());
                for (path, content) in *files {
                    mock.files
                        .insert((commit.to_string(), path.to_string()), content.to_string());
                }
            }
            mock
        }
    }

    impl GitProvider for MockGit {
        fn describe(&self, root: &Path) -> Option<Repository> {
            *self.describes.lock() += 1;
            Some(Repository {
                root: root.to_path_buf(),
                remote: None,
                branch: Some("main".to_string()),
                commit: self.commits.first().cloned(),
            })
        }

        fn commit_history(
            &self,
            _repo: &Repository,
            _path_in_repo: &str,
        ) -> Result<Arc<Vec<String>>, BuildError> {
            Ok(Arc::new(self.commits.clone()))
        }

        fn content_at_commit(
            &self,
            _repo: &Repository,
            path_in_repo: &str,
            commit: &str,
        ) -> Result<Option<String>, BuildError> {
            Ok(self
                .files
                .get(&(commit.to_string(), path_in_repo.to_string()))
                .cloned())
        }
    }

    struct CountingFetcher {
        dir: PathBuf,
        calls: AtomicUsize,
    }

    impl DependencyFetcher for CountingFetcher {
        fn restore(&self, request: RestoreRequest<'_>) -> Result<PathBuf, RestoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.dir.join(request.name))
        }
    }

    fn locator(config: DocsetConfig, git: Arc<dyn GitProvider>) -> RepositoryLocator {
        let fetcher = Arc::new(LocalFetcher::new(config.cache_dir()));
        RepositoryLocator::new(Arc::new(config), git, fetcher)
    }

    #[test]
    fn test_repository_cached_by_directory() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join(".git")).unwrap();
        fs::create_dir_all(dir.path().join("docs/a")).unwrap();

        let git = Arc::new(MockGit::default());
        let config = DocsetConfig::from_str("", &dir.path().join("docs")).unwrap();
        let locator = locator(config, git.clone());

        let nested = dir.path().join("docs/a");
        let repo = locator.repository_at(&nested).unwrap();
        assert_eq!(repo.root, dir.path());
        locator.repository_at(&nested).unwrap();
        locator.repository_at(&dir.path().join("docs")).unwrap();
        assert_eq!(*git.describes.lock(), 1);
    }

    #[test]
    fn test_no_repository_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        let config = DocsetConfig::from_str("", dir.path()).unwrap();
        let locator = locator(config, Arc::new(GixProvider::new()));
        // The temp dir may live inside some repository; only check no error
        assert!(locator.repository(&Origin::Current).is_ok());
    }

    #[test]
    fn test_locate() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join(".git")).unwrap();
        fs::create_dir_all(dir.path().join("docs")).unwrap();
        let config = DocsetConfig::from_str("", &dir.path().join("docs")).unwrap();
        let locator = locator(config, Arc::new(MockGit::default()));

        let (repo, path) = locator
            .locate(&PathAddress::current("a/b.md").unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(repo.root, dir.path().canonicalize().unwrap());
        assert_eq!(path, "docs/a/b.md");
    }

    #[test]
    fn test_unknown_dependency_is_fatal() {
        let config = DocsetConfig::from_str("", Path::new(".")).unwrap();
        let locator = locator(config, Arc::new(MockGit::default()));
        assert!(matches!(
            locator.dependency("nope"),
            Err(BuildError::UnknownDependency(name)) if name == "nope"
        ));
    }

    #[test]
    fn test_dependency_from_path() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("dep/x")).unwrap();
        fs::write(dir.path().join("dep/x/a.md"), "").unwrap();
        let config = DocsetConfig::from_str(
            "[[dependencies]]\nname = \"_themes\"\npath = \"dep\"",
            dir.path(),
        )
        .unwrap();
        let locator = locator(config, Arc::new(MockGit::default()));

        let dep = locator.dependency("_themes").unwrap();
        assert_eq!(dep.origin, Origin::dependency("_themes"));
        assert_eq!(dep.index.len(), 1);
    }

    #[test]
    fn test_dependency_restored_once() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("cache/dep")).unwrap();
        let config = DocsetConfig::from_str(
            "[[dependencies]]\nname = \"dep\"\nurl = \"https://example.com/dep\"",
            dir.path(),
        )
        .unwrap();
        let fetcher = Arc::new(CountingFetcher {
            dir: dir.path().join("cache"),
            calls: AtomicUsize::new(0),
        });
        let locator =
            RepositoryLocator::new(Arc::new(config), Arc::new(MockGit::default()), fetcher.clone());

        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| locator.dependency("dep").unwrap());
            }
        });
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_dependency_restore_failure() {
        let dir = TempDir::new().unwrap();
        let config = DocsetConfig::from_str(
            "[[dependencies]]\nname = \"dep\"\nurl = \"https://example.com/dep\"",
            dir.path(),
        )
        .unwrap();
        let locator = locator(config, Arc::new(MockGit::default()));
        assert!(matches!(
            locator.dependency("dep"),
            Err(BuildError::DependencyRestore {
                source: RestoreError::NotRestored { .. },
                ..
            })
        ));
    }

    #[test]
    fn test_missing_fallback_directory() {
        let dir = TempDir::new().unwrap();
        let config = DocsetConfig::from_str(
            "[localization]\nlocale = \"de-de\"\nfallback = \"en\"",
            dir.path(),
        )
        .unwrap();
        let locator = locator(config, Arc::new(MockGit::default()));
        let err = locator.fallback().unwrap_err();
        assert!(matches!(
            &err,
            BuildError::FallbackRestore(RestoreError::NotADirectory(path)) if path.ends_with("en")
        ));
        // The failed mount is remembered
        assert!(locator.fallback().is_err());
    }

    #[test]
    fn test_fallback_only_when_localized() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("en")).unwrap();
        fs::write(dir.path().join("en/a.md"), "").unwrap();

        let config = DocsetConfig::from_str(
            "[localization]\nlocale = \"en-us\"\nfallback = \"en\"",
            dir.path(),
        )
        .unwrap();
        assert!(locator(config, Arc::new(MockGit::default())).fallback().unwrap().is_none());

        let config = DocsetConfig::from_str(
            "[localization]\nlocale = \"de-de\"\nfallback = \"en\"",
            dir.path(),
        )
        .unwrap();
        let locator = locator(config, Arc::new(MockGit::default()));
        let fallback = locator.fallback().unwrap().unwrap();
        assert_eq!(fallback.origin, Origin::Fallback);
        assert_eq!(fallback.index.len(), 1);
        assert_eq!(
            locator.root_of(&Origin::Fallback).unwrap(),
            Some(dir.path().join("en"))
        );
    }
}
