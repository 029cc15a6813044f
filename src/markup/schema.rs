//! Reference extraction from schema documents and YAML/JSON tables of contents.
//!
//! There is no schema engine here. The document is parsed (`serde_yaml`, or
//! `serde_json` when it starts with `{` or `[`) and the string values of
//! well-known keys, at any depth, are treated as references:
//!
//! ```yaml
//! href: ../a.md        # link
//! src: media/x.png     # link
//! uid: some.uid        # declaration, ignored
//! xref: System.String  # uid reference
//! ```
//!
//! Line numbers are recovered afterwards by scanning the source for each key
//! in document order.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

/// A reference found in a structured document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructuredRef {
    Link(String),
    Xref(String),
}

#[derive(Debug, Error)]
pub enum StructuredError {
    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

const LINK_KEYS: [&str; 4] = ["href", "src", "url", "topicHref"];
const XREF_KEYS: [&str; 2] = ["xref", "topicUid"];

/// A reference key as written in the source, optionally quoted.
static KEY_IN_SOURCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)(?:^|[\s{,\[\-])["']?(href|src|url|topicHref|xref|topicUid)["']?\s*:"#)
        .unwrap()
});

/// References with their 1-based line numbers, in document order.
pub fn structured_refs(text: &str) -> Result<Vec<(StructuredRef, usize)>, StructuredError> {
    let mut found = Vec::new();
    if text.trim_start().starts_with(['{', '[']) {
        let value: serde_json::Value = serde_json::from_str(text)?;
        walk_json(&value, &mut found);
    } else {
        for document in serde_yaml::Deserializer::from_str(text) {
            let value = serde_yaml::Value::deserialize(document)?;
            walk_yaml(&value, &mut found);
        }
    }

    let mut lines = LineCursor::new(text);
    Ok(found
        .into_iter()
        .filter_map(|(key, value)| {
            let line = lines.next_key(key);
            let value = value.filter(|value| !value.is_empty())?;
            let reference = if XREF_KEYS.contains(&key) {
                StructuredRef::Xref(value)
            } else {
                StructuredRef::Link(value)
            };
            Some((reference, line))
        })
        .collect())
}

/// Canonical reference key for `key`, if it is one.
fn reference_key(key: &str) -> Option<&'static str> {
    LINK_KEYS.iter().chain(&XREF_KEYS).copied().find(|known| *known == key)
}

/// Every reference key in document order, with its value when it is a string.
type Found = Vec<(&'static str, Option<String>)>;

fn walk_yaml(value: &serde_yaml::Value, found: &mut Found) {
    use serde_yaml::Value;

    match value {
        Value::Mapping(mapping) => {
            for (key, value) in mapping {
                if let Some(key) = key.as_str().and_then(reference_key) {
                    found.push((key, value.as_str().map(str::to_string)));
                }
                walk_yaml(value, found);
            }
        }
        Value::Sequence(items) => items.iter().for_each(|item| walk_yaml(item, found)),
        Value::Tagged(tagged) => walk_yaml(&tagged.value, found),
        _ => {}
    }
}

fn walk_json(value: &serde_json::Value, found: &mut Found) {
    use serde_json::Value;

    match value {
        Value::Object(object) => {
            for (key, value) in object {
                if let Some(key) = reference_key(key) {
                    found.push((key, value.as_str().map(str::to_string)));
                }
                walk_json(value, found);
            }
        }
        Value::Array(items) => items.iter().for_each(|item| walk_json(item, found)),
        _ => {}
    }
}

/// Forward-only search for keys in the source text.
struct LineCursor<'a> {
    text: &'a str,
    offset: usize,
    line: usize,
}

impl<'a> LineCursor<'a> {
    fn new(text: &'a str) -> Self {
        Self { text, offset: 0, line: 1 }
    }

    /// Line of the next occurrence of `key`; the current line when the
    /// source has no further match.
    fn next_key(&mut self, key: &str) -> usize {
        let rest = &self.text[self.offset..];
        let Some(found) = KEY_IN_SOURCE
            .captures_iter(rest)
            .filter_map(|caps| caps.get(1))
            .find(|name| name.as_str() == key)
        else {
            return self.line;
        };
        self.line += rest[..found.start()].matches('\n').count();
        self.offset += found.end();
        self.line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn refs(text: &str) -> Vec<(StructuredRef, usize)> {
        structured_refs(text).unwrap()
    }

    fn link(href: &str) -> StructuredRef {
        StructuredRef::Link(href.to_string())
    }

    #[test]
    fn test_yaml_refs() {
        let text = "### YamlMime:Landing\nuid: page\nlinks:\n  - href: ../a.md\n    text: A\n  - src: 'img/x.png'\n  - xref: System.String\n";
        assert_eq!(
            refs(text),
            [
                (link("../a.md"), 4),
                (link("img/x.png"), 6),
                (StructuredRef::Xref("System.String".into()), 7),
            ]
        );
    }

    #[test]
    fn test_toc_refs() {
        let text = "- name: Intro\n  href: intro.md\n- name: API\n  topicUid: api.root\n";
        assert_eq!(
            refs(text),
            [(link("intro.md"), 2), (StructuredRef::Xref("api.root".into()), 4)]
        );
    }

    #[test]
    fn test_json_refs() {
        let text = "{\n  \"items\": [{ \"href\": \"a.md\" }, { \"href\": \"b\\/c.md\", \"xref\": \"u\" }]\n}";
        assert_eq!(
            refs(text),
            [
                (link("a.md"), 2),
                (link("b/c.md"), 2),
                (StructuredRef::Xref("u".into()), 2),
            ]
        );
    }

    #[test]
    fn test_yaml_trailing_comment_is_not_part_of_value() {
        assert_eq!(refs("href: a.md # see A\n"), [(link("a.md"), 1)]);
    }

    #[test]
    fn test_yaml_flow_mapping() {
        let text = "items:\n  - { name: A, href: a.md }\n  - {name: B, href: 'b.md'}\n";
        assert_eq!(refs(text), [(link("a.md"), 2), (link("b.md"), 3)]);
    }

    #[test]
    fn test_json_escapes_are_decoded() {
        assert_eq!(refs("{\"href\":\"a\\u002Emd\"}"), [(link("a.md"), 1)]);
    }

    #[test]
    fn test_nested_and_non_string_values() {
        // The numeric href still advances the line search
        let text = "href: 5\nitems:\n  - nested:\n      href: deep.md\n  - href: ''\n";
        assert_eq!(refs(text), [(link("deep.md"), 4)]);
    }

    #[test]
    fn test_invalid_documents() {
        assert!(matches!(structured_refs("a: [unclosed"), Err(StructuredError::Yaml(_))));
        assert!(matches!(structured_refs("{\"href\": "), Err(StructuredError::Json(_))));
    }
}
