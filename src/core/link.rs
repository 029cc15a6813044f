//! Link classification utilities.

/// Syntactic classification of an href
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind<'a> {
    /// Empty href, behaves like `#`.
    Empty,
    /// Symbolic cross reference (`xref:System.String`). Value is the uid part.
    Xref(&'a str),
    /// Local Windows path (`C:\docs\a.md`, `\\server\share`). Never published.
    WindowsAbsolute(&'a str),
    /// External link with URL scheme (https://, mailto:, tel:, etc.)
    External(&'a str),
    /// Site-root-relative path (/about, /docs/a).
    SiteRoot(&'a str),
    /// File-relative path, possibly only a query or fragment (./a.md, ../b.png, #x).
    FileRelative(&'a str),
}

impl<'a> LinkKind<'a> {
    /// Parse an href into its syntactic kind.
    pub fn parse(href: &'a str) -> Self {
        let href = href.trim();
        if href.is_empty() {
            Self::Empty
        } else if let Some(uid) = strip_prefix_ignore_case(href, "xref:") {
            Self::Xref(uid)
        } else if Self::is_windows_absolute(href) {
            Self::WindowsAbsolute(href)
        } else if Self::is_external(href) {
            Self::External(href)
        } else if href.starts_with('/') && !href.starts_with("//") {
            Self::SiteRoot(href)
        } else if href.starts_with("//") {
            // Protocol-relative URL
            Self::External(href)
        } else {
            Self::FileRelative(href)
        }
    }

    /// Check for drive-letter paths (`C:\`, `c:/`) and UNC paths (`\\host`).
    pub fn is_windows_absolute(href: &str) -> bool {
        let bytes = href.as_bytes();
        let drive = bytes.len() >= 3
            && bytes[0].is_ascii_alphabetic()
            && bytes[1] == b':'
            && (bytes[2] == b'\\' || bytes[2] == b'/');
        drive || href.starts_with("\\\\")
    }

    /// Check if an href has a URL scheme (http:, mailto:, etc.)
    ///
    /// A valid scheme has at least 2 characters before the colon so that
    /// drive letters are never mistaken for schemes.
    pub fn is_external(href: &str) -> bool {
        href.find(':').is_some_and(|pos| {
            pos > 1
                && href[..pos].starts_with(|c: char| c.is_ascii_alphabetic())
                && href[..pos]
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        })
    }
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &s[prefix.len()..])
}
