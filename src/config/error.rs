//! Configuration error types.

use std::path::PathBuf;

use thiserror::Error;

/// Configuration-related errors. All of them abort the build.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error when reading `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("config file parsing error")]
    Toml(#[from] toml::de::Error),

    #[error("invalid glob `{pattern}` in [files]")]
    Glob {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("config validation error: {0}")]
    Validation(String),
}
