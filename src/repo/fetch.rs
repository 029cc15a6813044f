//! Dependency restore.
//!
//! Materializing a dependency docset may need disk or network work, so it
//! sits behind [`DependencyFetcher`]. [`LocalFetcher`] expects restored
//! checkouts to already be in the cache directory.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// What to restore: a dependency docset or the fallback docset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestoreRequest<'a> {
    pub name: &'a str,
    pub url: Option<&'a str>,
    pub branch: Option<&'a str>,
}

/// Why a docset could not be restored or mounted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RestoreError {
    #[error("`{name}` is not restored; clone {url}{} into {}", branch_hint(.branch), .dir.display())]
    NotRestored {
        name: String,
        url: String,
        branch: Option<String>,
        dir: PathBuf,
    },

    #[error("`{name}` has neither `path` nor `url` and {} does not exist", .dir.display())]
    NoSource { name: String, dir: PathBuf },

    #[error("{} is not a directory", .0.display())]
    NotADirectory(PathBuf),
}

fn branch_hint(branch: &Option<String>) -> String {
    branch
        .as_ref()
        .map(|b| format!(" (branch {b})"))
        .unwrap_or_default()
}

pub trait DependencyFetcher: Send + Sync {
    /// Directory holding the restored docset.
    fn restore(&self, request: RestoreRequest<'_>) -> Result<PathBuf, RestoreError>;
}

/// Resolves restores from `<cache_dir>/<name>`.
#[derive(Debug, Clone)]
pub struct LocalFetcher {
    cache_dir: PathBuf,
}

impl LocalFetcher {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }
}

impl DependencyFetcher for LocalFetcher {
    fn restore(&self, request: RestoreRequest<'_>) -> Result<PathBuf, RestoreError> {
        let dir = self.cache_dir.join(request.name);
        if dir.is_dir() {
            return Ok(dir);
        }
        let name = request.name.to_string();
        Err(match request.url {
            Some(url) => RestoreError::NotRestored {
                name,
                url: url.to_string(),
                branch: request.branch.map(str::to_string),
                dir,
            },
            None => RestoreError::NoSource { name, dir },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn request(name: &str) -> RestoreRequest<'_> {
        RestoreRequest {
            name,
            url: Some("https://example.com/dep"),
            branch: Some("main"),
        }
    }

    #[test]
    fn test_restore_from_cache() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("dep")).unwrap();

        let fetcher = LocalFetcher::new(dir.path());
        assert_eq!(fetcher.restore(request("dep")).unwrap(), dir.path().join("dep"));
    }

    #[test]
    fn test_restore_missing() {
        let dir = TempDir::new().unwrap();
        let err = LocalFetcher::new(dir.path()).restore(request("dep")).unwrap_err();
        assert!(matches!(&err, RestoreError::NotRestored { name, .. } if name == "dep"));
        let message = err.to_string();
        assert!(message.contains("https://example.com/dep"));
        assert!(message.contains("branch main"));
    }

    #[test]
    fn test_restore_without_url() {
        let dir = TempDir::new().unwrap();
        let request = RestoreRequest {
            name: "dep",
            url: None,
            branch: None,
        };
        let err = LocalFetcher::new(dir.path()).restore(request).unwrap_err();
        assert_eq!(
            err,
            RestoreError::NoSource {
                name: "dep".to_string(),
                dir: dir.path().join("dep"),
            }
        );
    }
}
