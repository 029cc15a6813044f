//! Bookmark (in-page anchor) validation.
//!
//! References are recorded while links resolve and checked in a separate
//! pass once every page is rendered.

use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashSet;

use crate::core::PathAddress;
use crate::core::url::decode;
use crate::diagnostic::{Code, Diagnostic, Diagnostics, SourceInfo};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookmarkReference {
    pub referencing: PathAddress,
    pub target: PathAddress,
    /// With the leading `#`.
    pub fragment: String,
    pub is_self_bookmark: bool,
    pub source: SourceInfo,
}

#[derive(Debug, Default)]
pub struct BookmarkValidator {
    references: Mutex<Vec<BookmarkReference>>,
}

impl BookmarkValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_bookmark_reference(&self, reference: BookmarkReference) {
        self.references.lock().push(reference);
    }

    pub fn len(&self) -> usize {
        self.references.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.references.lock().is_empty()
    }

    /// Check every recorded fragment against the rendered ids of its target.
    ///
    /// `ids_of` returns `None` for targets that produced no HTML; those are
    /// skipped. Returns the number of missing bookmarks.
    pub fn validate<F>(&self, ids_of: F, diagnostics: &Diagnostics) -> usize
    where
        F: Fn(&PathAddress) -> Option<Arc<FxHashSet<String>>>,
    {
        let references = std::mem::take(&mut *self.references.lock());
        let mut checked = FxHashSet::default();
        let mut missing = 0;

        for reference in references {
            let id = decode(reference.fragment.trim_start_matches('#'));
            if id.is_empty() {
                continue;
            }
            if !checked.insert((reference.target.clone(), id.clone(), reference.source.clone())) {
                continue;
            }
            let Some(ids) = ids_of(&reference.target) else {
                continue;
            };
            if ids.contains(&id) {
                continue;
            }

            missing += 1;
            let message = if reference.is_self_bookmark {
                format!("Cannot find bookmark '#{id}' in this file")
            } else {
                format!("Cannot find bookmark '#{id}' in '{}'", reference.target)
            };
            diagnostics.push(
                Diagnostic::warning(Code::BookmarkNotFound, message).with_source(reference.source),
            );
        }
        missing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHashMap;

    fn address(path: &str) -> PathAddress {
        PathAddress::current(path).unwrap()
    }

    fn reference(from: &str, to: &str, fragment: &str) -> BookmarkReference {
        BookmarkReference {
            referencing: address(from),
            target: address(to),
            fragment: fragment.to_string(),
            is_self_bookmark: from == to,
            source: SourceInfo::new(address(from)).with_line(1),
        }
    }

    fn ids(pairs: &[(&str, &[&str])]) -> FxHashMap<PathAddress, Arc<FxHashSet<String>>> {
        pairs
            .iter()
            .map(|(path, ids)| {
                (address(path), Arc::new(ids.iter().map(|s| s.to_string()).collect()))
            })
            .collect()
    }

    #[test]
    fn test_validate() {
        let validator = BookmarkValidator::new();
        validator.add_bookmark_reference(reference("a.md", "b.md", "#intro"));
        validator.add_bookmark_reference(reference("a.md", "b.md", "#missing"));
        validator.add_bookmark_reference(reference("a.md", "a.md", "#self"));
        validator.add_bookmark_reference(reference("a.md", "a.md", "#"));
        validator.add_bookmark_reference(reference("a.md", "img.png", "#x"));

        let rendered = ids(&[("a.md", &["self"]), ("b.md", &["intro"])]);
        let diagnostics = Diagnostics::new();
        let missing = validator.validate(|a| rendered.get(a).cloned(), &diagnostics);

        assert_eq!(missing, 1);
        let items = diagnostics.sorted();
        assert_eq!(items[0].code, Code::BookmarkNotFound);
        assert!(items[0].message.contains("#missing"));
        assert!(validator.is_empty());
    }

    #[test]
    fn test_fragment_is_decoded() {
        let validator = BookmarkValidator::new();
        validator.add_bookmark_reference(reference("a.md", "b.md", "#caf%C3%A9"));
        let rendered = ids(&[("b.md", &["café"])]);
        let diagnostics = Diagnostics::new();
        assert_eq!(validator.validate(|a| rendered.get(a).cloned(), &diagnostics), 0);
    }

    #[test]
    fn test_duplicate_references_reported_once() {
        let validator = BookmarkValidator::new();
        validator.add_bookmark_reference(reference("a.md", "b.md", "#x"));
        validator.add_bookmark_reference(reference("a.md", "b.md", "#x"));
        let rendered = ids(&[("b.md", &[])]);
        let diagnostics = Diagnostics::new();
        assert_eq!(validator.validate(|a| rendered.get(a).cloned(), &diagnostics), 1);
        assert_eq!(diagnostics.len(), 1);
    }
}
