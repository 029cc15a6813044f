//! Configuration utility functions.

use std::path::{Path, PathBuf};

/// Extract path component from a URL string
///
/// Returns `None` if the URL is invalid
///
/// # Examples
/// ```ignore
/// extract_url_path("https://learn.example.com/docs/") -> Some("docs")
/// extract_url_path("https://learn.example.com")       -> Some("")
/// extract_url_path("invalid")                         -> None
/// ```
pub fn extract_url_path(url_str: &str) -> Option<String> {
    let parsed = url::Url::parse(url_str).ok()?;
    Some(parsed.path().trim_matches('/').to_string())
}

/// Normalize a base path to `/` or `/segment/.../segment`.
pub fn normalize_base_path(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{trimmed}")
    }
}

/// Find config file by searching upward from `start`
///
/// ```text
/// /home/user/docs/articles/guide/  ← start
/// /home/user/docs/docset.toml      ← found!
/// ```
pub fn find_config_file(start: &Path, config_name: &Path) -> Option<PathBuf> {
    if config_name.is_absolute() {
        return config_name.exists().then(|| config_name.to_path_buf());
    }

    let mut current = start;
    loop {
        let candidate = current.join(config_name);
        if candidate.is_file() {
            return Some(candidate);
        }
        current = current.parent()?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_extract_url_path() {
        assert_eq!(
            extract_url_path("https://learn.example.com/docs/"),
            Some("docs".to_string())
        );
        assert_eq!(
            extract_url_path("https://learn.example.com/a/b?x=1"),
            Some("a/b".to_string())
        );
        assert_eq!(extract_url_path("https://example.com"), Some(String::new()));
        assert_eq!(extract_url_path("invalid-url"), None);
    }

    #[test]
    fn test_normalize_base_path() {
        assert_eq!(normalize_base_path(""), "/");
        assert_eq!(normalize_base_path("/"), "/");
        assert_eq!(normalize_base_path("docs/"), "/docs");
        assert_eq!(normalize_base_path("/a/b/"), "/a/b");
    }

    #[test]
    fn test_find_config_file_walks_up() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("articles/guide");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(dir.path().join("docset.toml"), "").unwrap();

        let found = find_config_file(&nested, Path::new("docset.toml")).unwrap();
        assert_eq!(found, dir.path().join("docset.toml"));
    }

    #[test]
    fn test_find_config_file_missing() {
        let dir = TempDir::new().unwrap();
        assert!(find_config_file(dir.path(), Path::new("nope-docset.toml")).is_none());
    }
}
