//! The docset being built.
//!
//! [`Docset`] owns everything that is computed once per build and read
//! concurrently afterwards:
//!
//! - the current docset's [`FileIndex`] and [`BuildScope`]
//! - the [`RedirectionTable`]
//! - the [`RepositoryLocator`] (fallback and dependency docsets)
//! - a cache of [`Document`]s keyed by address

mod document;
mod input;
mod redirect;
mod scope;

pub use document::{Document, LANDING_DATA, read_mime};
pub use redirect::{RedirectionEntry, RedirectionTable};
pub use scope::{BuildScope, FileIndex, ScopeGlob};

use std::sync::Arc;

use dashmap::DashMap;

use crate::config::DocsetConfig;
use crate::core::{ContentType, Origin, PathAddress};
use crate::diagnostic::Diagnostics;
use crate::error::BuildError;
use crate::repo::{MountedDocset, RepositoryLocator};

/// Document cache key: identity plus the history commit, if any.
type DocumentKey = (PathAddress, Option<Arc<str>>);

pub struct Docset {
    config: Arc<DocsetConfig>,
    locator: Arc<RepositoryLocator>,
    entry: FileIndex,
    scope: BuildScope,
    redirections: RedirectionTable,
    documents: DashMap<DocumentKey, Document>,
    /// Redirection stand-ins, kept apart from the files they replace.
    redirects: DashMap<PathAddress, Document>,
}

impl Docset {
    /// Index the docset, load redirections and compute the build scope.
    pub fn create(
        config: Arc<DocsetConfig>,
        locator: Arc<RepositoryLocator>,
        diagnostics: &Diagnostics,
    ) -> Result<Self, BuildError> {
        let entry = FileIndex::scan(config.root());
        let fallback = locator.fallback()?;
        let redirections = RedirectionTable::create(&config.redirections, &config.base_path)?;
        let scope = BuildScope::create(
            &config.files,
            &entry,
            fallback.as_deref().map(|f| &f.index),
            &redirections,
            diagnostics,
        )?;

        Ok(Self {
            config,
            locator,
            entry,
            scope,
            redirections,
            documents: DashMap::new(),
            redirects: DashMap::new(),
        })
    }

    pub fn config(&self) -> &DocsetConfig {
        &self.config
    }

    pub fn locator(&self) -> &RepositoryLocator {
        &self.locator
    }

    pub fn entry_index(&self) -> &FileIndex {
        &self.entry
    }

    pub fn scope(&self) -> &BuildScope {
        &self.scope
    }

    pub fn redirections(&self) -> &RedirectionTable {
        &self.redirections
    }

    pub fn fallback(&self) -> Result<Option<Arc<MountedDocset>>, BuildError> {
        self.locator.fallback()
    }

    pub fn dependency(&self, name: &str) -> Result<Arc<MountedDocset>, BuildError> {
        self.locator.dependency(name)
    }

    /// The document at `address`, created on first request.
    ///
    /// A current, non-historical path listed in the redirection table always
    /// yields its redirection stand-in, even when the file is still on disk.
    /// Schema documents get their schema name from the first line; a file
    /// that cannot be read simply has none.
    pub fn document(&self, address: PathAddress) -> Document {
        if address.origin == Origin::Current
            && address.commit.is_none()
            && let Some(entry) = self.redirections.try_get(&address.path)
        {
            return self.redirect_document(entry);
        }

        let key = (address.clone(), address.commit.clone());
        if let Some(doc) = self.documents.get(&key) {
            return doc.clone();
        }

        let mime = match ContentType::from_path(&address.path) {
            ContentType::SchemaDocument => {
                self.read_text(&address).ok().and_then(|text| read_mime(&text))
            }
            _ => None,
        };
        let doc = Document::new(address, mime, &self.config.base_path);
        self.documents.entry(key).or_insert(doc).clone()
    }

    /// The stand-in document for a redirected path.
    pub fn redirect_document(&self, entry: &RedirectionEntry) -> Document {
        let address = PathAddress::new(entry.source.clone(), Origin::Current);
        self.redirects
            .entry(address.clone())
            .or_insert_with(|| Document::redirection(address, &entry.target))
            .clone()
    }

    /// Number of documents created so far.
    pub fn document_count(&self) -> usize {
        self.documents.len() + self.redirects.len()
    }
}
