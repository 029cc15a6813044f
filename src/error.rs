//! Fatal build errors.
//!
//! Anything here aborts the whole build. Per-link problems are never errors
//! in this sense; they become [`crate::diagnostic::Diagnostic`] values.

use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;
use crate::repo::RestoreError;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A redirection source that is not master content.
    #[error("redirection source `{path}` must be markdown or a schema document")]
    InvalidRedirection { path: String },

    #[error("invalid redirection source `{path}`")]
    InvalidRedirectionPath {
        path: String,
        #[source]
        source: crate::core::PathError,
    },

    /// A dependency name no `[[dependencies]]` entry declares.
    #[error("unknown dependency `{0}`")]
    UnknownDependency(String),

    #[error("failed to restore dependency `{name}`: {source}")]
    DependencyRestore {
        name: String,
        #[source]
        source: RestoreError,
    },

    #[error("failed to restore fallback docset: {0}")]
    FallbackRestore(#[source] RestoreError),

    #[error("IO error at `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("git error in `{path}`: {message}")]
    Git { path: PathBuf, message: String },
}

pub type Result<T, E = BuildError> = std::result::Result<T, E>;
