//! Path resolution across docsets.
//!
//! Turns a reference string written in some file into a concrete
//! [`Document`]. Sources are tried in a fixed order and the first match
//! wins:
//!
//! ```text
//! 1. resolve_alias rewrite (longest prefix, applied once)
//! 2. otherwise relative to the referencing file's directory;
//!    a file from dependency X resolves inside X only, and stops there
//! 3. redirection table
//! 4. dependency mount prefixes, in configuration order (no fall-through)
//! 5. current docset
//! 6. fallback docset
//! 7. fallback git history (resources and includes only)
//! ```
//!
//! Case correction happens once, against whichever index answers.
//! Read-only over indices built before resolution starts.

use std::sync::Arc;

use crate::core::{Origin, PathAddress, PathError, RelPath};
use crate::docset::{Docset, Document};
use crate::error::BuildError;
use crate::repo::MountedDocset;
use crate::{debug, log};

/// Outcome of a path lookup. Never an error for a missing file.
#[derive(Debug, Clone, PartialEq)]
pub enum FileLookup {
    Found(Document),
    NotFound,
    /// The reference climbs above the docset root.
    InvalidPath(PathError),
}

impl FileLookup {
    pub fn document(self) -> Option<Document> {
        match self {
            Self::Found(doc) => Some(doc),
            Self::NotFound | Self::InvalidPath(_) => None,
        }
    }
}

pub struct FileResolver {
    docset: Arc<Docset>,
    /// Longest prefix first.
    aliases: Vec<(String, String)>,
}

impl FileResolver {
    pub fn new(docset: Arc<Docset>) -> Self {
        let aliases = docset.config().aliases();
        Self { docset, aliases }
    }

    pub fn docset(&self) -> &Docset {
        &self.docset
    }

    /// Resolve `relative_path` (decoded, without query or fragment) as
    /// written in `referencing`.
    ///
    /// `Err` only for fatal dependency misconfiguration.
    pub fn try_resolve_relative_path(
        &self,
        referencing: &PathAddress,
        relative_path: &str,
        lookup_fallback_history: bool,
    ) -> Result<FileLookup, BuildError> {
        let combined = match self.apply_alias(relative_path) {
            Some(rewritten) => RelPath::normalize(&rewritten),
            None => RelPath::combine(referencing.path.dir(), relative_path),
        };
        let path = match combined {
            Ok(path) if path.is_empty() => return Ok(FileLookup::NotFound),
            Ok(path) => path,
            Err(err) => return Ok(FileLookup::InvalidPath(err)),
        };

        // A dependency docset is a closed universe
        if let Origin::Dependency(name) = &referencing.origin {
            return self.lookup_dependency(name, &path);
        }

        if let Some(entry) = self.docset.redirections().try_get(&path) {
            return Ok(FileLookup::Found(self.docset.redirect_document(entry)));
        }

        for dep in &self.docset.config().dependencies {
            if let Some(rest) = path.strip_dir_prefix(dep.prefix()) {
                return self.lookup_dependency(dep.prefix(), &rest);
            }
        }

        if let Some(actual) = self.docset.entry_index().correct_case(&path) {
            return Ok(self.found(actual, Origin::Current));
        }

        if let Some(fallback) = self.docset.fallback()? {
            if let Some(actual) = fallback.index.correct_case(&path) {
                return Ok(self.found(actual, Origin::Fallback));
            }
            if lookup_fallback_history
                && let Some(doc) = self.lookup_fallback_history(&fallback, &path)?
            {
                return Ok(FileLookup::Found(doc));
            }
        }

        Ok(FileLookup::NotFound)
    }

    fn found(&self, path: RelPath, origin: Origin) -> FileLookup {
        FileLookup::Found(self.docset.document(PathAddress::new(path, origin)))
    }

    /// Rewrite the first (longest) matching alias prefix.
    fn apply_alias(&self, relative_path: &str) -> Option<String> {
        let unified = relative_path.replace('\\', "/");
        self.aliases.iter().find_map(|(from, to)| {
            unified
                .strip_prefix(from.as_str())
                .map(|rest| format!("{to}{rest}"))
        })
    }

    fn lookup_dependency(&self, name: &str, path: &RelPath) -> Result<FileLookup, BuildError> {
        let dep = self.docset.dependency(name)?;
        Ok(match dep.index.correct_case(path) {
            Some(actual) => self.found(actual, dep.origin.clone()),
            None => FileLookup::NotFound,
        })
    }

    /// Newest commit of the fallback repository that still has `path`.
    ///
    /// Unreadable history counts as not found.
    fn lookup_fallback_history(
        &self,
        fallback: &MountedDocset,
        path: &RelPath,
    ) -> Result<Option<Document>, BuildError> {
        match self.search_fallback_history(fallback, path) {
            Err(BuildError::Git { path: repo, message }) => {
                log!("fallback"; "history of {} unreadable: {}", repo.display(), message);
                Ok(None)
            }
            other => other,
        }
    }

    fn search_fallback_history(
        &self,
        fallback: &MountedDocset,
        path: &RelPath,
    ) -> Result<Option<Document>, BuildError> {
        let address = PathAddress::new(path.clone(), Origin::Fallback);
        let Some((repo, path_in_repo)) = self.docset.locator().locate(&address)? else {
            return Ok(None);
        };

        let git = self.docset.locator().git();
        let history = git.commit_history(&repo, &path_in_repo)?;
        for commit in history.iter() {
            if git.content_at_commit(&repo, &path_in_repo, commit)?.is_some() {
                debug!(
                    "fallback";
                    "{} restored from {} at {}",
                    path,
                    fallback.root.display(),
                    commit
                );
                return Ok(Some(self.docset.document(address.with_commit(commit.as_str()))));
            }
        }
        Ok(None)
    }
}

// ============================================================================
// Tests
// ============================================================================
