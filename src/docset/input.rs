//! Reading document content from the worktree or from git history.

use std::fs;
use std::io;
use std::path::PathBuf;

use super::Docset;
use crate::core::PathAddress;
use crate::error::BuildError;

impl Docset {
    /// Physical location of a worktree file, `None` for a fallback origin in
    /// a build without fallback.
    pub fn physical_path(&self, address: &PathAddress) -> Result<Option<PathBuf>, BuildError> {
        Ok(self
            .locator()
            .root_of(&address.origin)?
            .map(|root| root.join(address.path.as_str())))
    }

    /// Full text of a document.
    ///
    /// Addresses carrying a commit are read from git history.
    pub fn read_text(&self, address: &PathAddress) -> Result<String, BuildError> {
        if let Some(commit) = &address.commit {
            return self.read_historical(address, commit);
        }

        let path = self
            .physical_path(address)?
            .ok_or_else(|| not_found(PathBuf::from(address.path.as_str())))?;
        fs::read_to_string(&path).map_err(|err| BuildError::Io(path, err))
    }

    fn read_historical(&self, address: &PathAddress, commit: &str) -> Result<String, BuildError> {
        let missing = || not_found(PathBuf::from(format!("{}@{commit}", address.path)));

        let (repo, path_in_repo) = self.locator().locate(address)?.ok_or_else(missing)?;
        self.locator()
            .git()
            .content_at_commit(&repo, &path_in_repo, commit)?
            .ok_or_else(missing)
    }
}

fn not_found(path: PathBuf) -> BuildError {
    BuildError::Io(path, io::Error::from(io::ErrorKind::NotFound))
}
