//! Git history access.
//!
//! Only used as a fallback data source: when a resource or include was
//! deleted from the fallback docset, its last known version is read from
//! history.
//!
//! [`GixProvider`] opens repositories with `gix` and keeps one
//! `ThreadSafeRepository` per root, plus the commit list of `HEAD`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use gix::ThreadSafeRepository;

use super::Repository;
use crate::debug;
use crate::error::BuildError;

/// Read access to repository metadata and history.
pub trait GitProvider: Send + Sync {
    /// Describe the repository whose worktree root is `root`.
    ///
    /// `None` when `root` is not a readable git repository.
    fn describe(&self, root: &Path) -> Option<Repository>;

    /// Commits to consider for `path_in_repo`, newest first. Empty when
    /// `HEAD` is unborn.
    fn commit_history(
        &self,
        repo: &Repository,
        path_in_repo: &str,
    ) -> Result<Arc<Vec<String>>, BuildError>;

    /// File content at `commit`, `None` when the file does not exist there.
    fn content_at_commit(
        &self,
        repo: &Repository,
        path_in_repo: &str,
        commit: &str,
    ) -> Result<Option<String>, BuildError>;
}

// ============================================================================
// gix implementation
// ============================================================================

#[derive(Default)]
pub struct GixProvider {
    repos: DashMap<PathBuf, ThreadSafeRepository>,
    history: DashMap<PathBuf, Arc<Vec<String>>>,
}

impl GixProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn open(&self, root: &Path) -> Result<gix::Repository, BuildError> {
        if let Some(repo) = self.repos.get(root) {
            return Ok(repo.to_thread_local());
        }
        let repo = gix::open(root).map_err(|err| git_error(root, err))?;
        let local = repo.clone();
        self.repos.insert(root.to_path_buf(), repo.into_sync());
        Ok(local)
    }
}

fn git_error(path: &Path, err: impl std::fmt::Display) -> BuildError {
    BuildError::Git {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}

impl GitProvider for GixProvider {
    fn describe(&self, root: &Path) -> Option<Repository> {
        let repo = self.open(root).ok()?;

        let commit = repo.head_id().ok().map(|id| id.to_string());
        let branch = repo
            .head_name()
            .ok()
            .flatten()
            .map(|name| name.shorten().to_string());
        let remote = repo
            .find_remote("origin")
            .ok()
            .and_then(|remote| {
                remote
                    .url(gix::remote::Direction::Fetch)
                    .map(|url| url.to_bstring().to_string())
            });

        Some(Repository {
            root: root.to_path_buf(),
            remote,
            branch,
            commit,
        })
    }

    fn commit_history(
        &self,
        repo: &Repository,
        _path_in_repo: &str,
    ) -> Result<Arc<Vec<String>>, BuildError> {
        if let Some(history) = self.history.get(&repo.root) {
            return Ok(Arc::clone(&history));
        }

        let local = self.open(&repo.root)?;
        let head = local.head().map_err(|err| git_error(&repo.root, err))?;
        let Some(tip) = head.id() else {
            debug!("fallback"; "unborn HEAD in {}", repo.root.display());
            let empty = Arc::new(Vec::new());
            self.history.insert(repo.root.clone(), Arc::clone(&empty));
            return Ok(empty);
        };
        let walk = tip
            .ancestors()
            .all()
            .map_err(|err| git_error(&repo.root, err))?;

        let mut commits = Vec::new();
        for info in walk {
            let info = info.map_err(|err| git_error(&repo.root, err))?;
            commits.push(info.id.to_string());
        }
        debug!("fallback"; "{} commits in {}", commits.len(), repo.root.display());

        let commits = Arc::new(commits);
        self.history
            .insert(repo.root.clone(), Arc::clone(&commits));
        Ok(commits)
    }

    fn content_at_commit(
        &self,
        repo: &Repository,
        path_in_repo: &str,
        commit: &str,
    ) -> Result<Option<String>, BuildError> {
        let local = self.open(&repo.root)?;
        let id = gix::ObjectId::from_hex(commit.as_bytes())
            .map_err(|err| git_error(&repo.root, err))?;
        let tree = local
            .find_commit(id)
            .map_err(|err| git_error(&repo.root, err))?
            .tree()
            .map_err(|err| git_error(&repo.root, err))?;

        let Some(entry) = tree
            .lookup_entry_by_path(path_in_repo)
            .map_err(|err| git_error(&repo.root, err))?
        else {
            return Ok(None);
        };
        if !entry.mode().is_blob() {
            return Ok(None);
        }

        let object = entry.object().map_err(|err| git_error(&repo.root, err))?;
        Ok(Some(String::from_utf8_lossy(&object.data).into_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_describe_non_repository() {
        let dir = TempDir::new().unwrap();
        assert!(GixProvider::new().describe(dir.path()).is_none());
    }

    #[test]
    fn test_describe_fresh_repository() {
        let dir = TempDir::new().unwrap();
        gix::init(dir.path()).unwrap();

        let repo = GixProvider::new().describe(dir.path()).unwrap();
        assert_eq!(repo.root, dir.path());
        // Unborn HEAD has no commit yet
        assert!(repo.commit.is_none());
    }

    #[test]
    fn test_history_of_unborn_head_is_empty() {
        let dir = TempDir::new().unwrap();
        gix::init(dir.path()).unwrap();
        let provider = GixProvider::new();
        let repo = provider.describe(dir.path()).unwrap();
        assert!(provider.commit_history(&repo, "a.md").unwrap().is_empty());
    }

    #[test]
    fn test_history_of_missing_repository_is_error() {
        let dir = TempDir::new().unwrap();
        let repo = Repository {
            root: dir.path().join("gone"),
            remote: None,
            branch: None,
            commit: None,
        };
        let err = GixProvider::new().commit_history(&repo, "a.md").unwrap_err();
        assert!(matches!(err, BuildError::Git { .. }));
    }
}
