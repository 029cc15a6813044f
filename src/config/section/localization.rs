//! `[localization]` section configuration.
//!
//! A build is localized when `locale` is set and differs from
//! `default_locale`. Localized builds fall back to the source-locale docset
//! for content missing locally.
//!
//! # Example
//!
//! ```toml
//! [localization]
//! locale = "de-de"
//! default_locale = "en-us"
//! fallback = "../docs-en"                   # Local checkout of the source docset
//! fallback_url = "https://example.com/docs" # Or restore it
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalizationConfig {
    pub locale: Option<String>,
    pub default_locale: String,
    pub fallback: Option<PathBuf>,
    pub fallback_url: Option<String>,
    pub fallback_branch: Option<String>,
}

impl Default for LocalizationConfig {
    fn default() -> Self {
        Self {
            locale: None,
            default_locale: "en-us".to_string(),
            fallback: None,
            fallback_url: None,
            fallback_branch: None,
        }
    }
}

impl LocalizationConfig {
    pub fn is_localized(&self) -> bool {
        self.locale
            .as_deref()
            .is_some_and(|locale| !locale.eq_ignore_ascii_case(&self.default_locale))
    }
}

#[cfg(test)]
mod tests {
    use crate::config::test_parse_config;

    #[test]
    fn test_is_localized() {
        let config = test_parse_config("[localization]\nlocale = \"de-de\"");
        assert!(config.localization.is_localized());

        let config = test_parse_config("[localization]\nlocale = \"EN-US\"");
        assert!(!config.localization.is_localized());

        let config = test_parse_config("");
        assert!(!config.localization.is_localized());
    }
}
