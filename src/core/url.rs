//! Site URL helpers.
//!
//! - Internal representation: always decoded (human-readable)
//! - Query and fragment keep their leading `?` / `#` when split off
//!
//! All site URLs are absolute (`/a/b`); relative URLs are only produced at
//! render time via [`relative_url`].

use std::sync::OnceLock;

use percent_encoding::percent_decode_str;

/// Split an href into `(path, query, fragment)`.
///
/// ```ignore
/// split_url("a.md?tabs=x#intro") -> ("a.md", "?tabs=x", "#intro")
/// split_url("#intro")            -> ("", "", "#intro")
/// ```
pub fn split_url(href: &str) -> (&str, &str, &str) {
    let (rest, fragment) = match href.find('#') {
        Some(idx) => (&href[..idx], &href[idx..]),
        None => (href, ""),
    };
    match rest.find('?') {
        Some(idx) => (&rest[..idx], &rest[idx..], fragment),
        None => (rest, "", fragment),
    }
}

/// Percent-decode a path, keeping the input when it is not valid UTF-8.
pub fn decode(path: &str) -> String {
    percent_decode_str(path)
        .decode_utf8()
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| path.to_string())
}

/// Join a base path (`/`, `/docs`, `/docs/`) and a site-relative path.
pub fn join_site_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}

/// Resolve `href` against the absolute site URL `base`.
///
/// Absolute paths and external URLs come back unchanged.
pub fn resolve_url(base: &str, href: &str) -> String {
    static ROOT: OnceLock<Option<url::Url>> = OnceLock::new();

    if href.starts_with('/') || crate::core::LinkKind::is_external(href) {
        return href.to_string();
    }
    let Some(root) = ROOT.get_or_init(|| url::Url::parse("http://x").ok()) else {
        return href.to_string();
    };

    let Ok(base_url) = root.join(base) else {
        return href.to_string();
    };
    match base_url.join(href) {
        Ok(joined) => {
            let mut out = decode(joined.path());
            if let Some(query) = joined.query() {
                out.push('?');
                out.push_str(query);
            }
            if let Some(fragment) = joined.fragment() {
                out.push('#');
                out.push_str(fragment);
            }
            out
        }
        Err(_) => href.to_string(),
    }
}

/// Compute a URL relative to the page at `from`.
///
/// Both inputs are absolute site URLs. Query and fragment of `to` are kept.
///
/// ```ignore
/// relative_url("/a/b", "/a/c")   -> "c"
/// relative_url("/a/b", "/x/y")   -> "../x/y"
/// relative_url("/a/", "/a/")     -> "./"
/// relative_url("/a/b/", "/a/")   -> "../"
/// ```
pub fn relative_url(from: &str, to: &str) -> String {
    if !to.starts_with('/') || !from.starts_with('/') {
        return to.to_string();
    }

    let (to_path, query, fragment) = split_url(to);

    // Directory segments of the page making the link
    let from_dir = &from[..from.rfind('/').unwrap_or(0)];
    let from_segments: Vec<&str> = from_dir.split('/').filter(|s| !s.is_empty()).collect();

    let to_segments: Vec<&str> = to_path.split('/').skip(1).collect();
    let (to_dirs, to_file) = to_segments.split_at(to_segments.len().saturating_sub(1));
    let to_file = to_file.first().copied().unwrap_or("");

    let common = from_segments
        .iter()
        .zip(to_dirs.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<&str> = Vec::new();
    for _ in common..from_segments.len() {
        parts.push("..");
    }
    parts.extend(&to_dirs[common..]);

    let mut out = parts.join("/");
    if !out.is_empty() {
        out.push('/');
    }
    out.push_str(to_file);
    if out.is_empty() {
        out.push_str("./");
    }
    out.push_str(query);
    out.push_str(fragment);
    out
}
