//! Dependency tracking for incremental builds.
//!
//! Two layers:
//! - [`DependencyMapBuilder`]: lock-free accumulation while files resolve in parallel
//! - [`DependencyMap`]: frozen, sorted graph with forward and reverse lookups
//!
//! # Invariants
//! - Edges are a set: `(from, to, kind)` is recorded at most once
//! - Insertion order never affects the built map or the manifest
//! - A missing target (`to == None`) records nothing

use std::collections::{BTreeMap, BTreeSet};
use std::hash::{Hash, Hasher};
use std::path::Path;

use dashmap::DashSet;
use serde::Serialize;

use crate::core::{ContentType, PathAddress};
use crate::docset::Document;
use crate::error::BuildError;

// =============================================================================
// Edge types
// =============================================================================

/// Why `from` depends on `to`. Each kind triggers a different rebuild rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum DependencyType {
    /// Plain link: revalidate when the target appears, moves or disappears.
    File,
    /// Link with a fragment: also revalidate when the target's ids change.
    Bookmark,
    /// Cross reference by uid.
    Uid,
    /// Content inclusion: rebuild when the target's content changes.
    Include,
    Metadata,
    /// Structural parent to child.
    Hierarchy,
    Achievement,
}

impl DependencyType {
    pub const fn name(self) -> &'static str {
        match self {
            Self::File => "File",
            Self::Bookmark => "Bookmark",
            Self::Uid => "Uid",
            Self::Include => "Include",
            Self::Metadata => "Metadata",
            Self::Hierarchy => "Hierarchy",
            Self::Achievement => "Achievement",
        }
    }
}

/// One edge of the graph.
#[derive(Debug, Clone)]
pub struct DependencyItem {
    pub from: PathAddress,
    pub to: PathAddress,
    pub from_content_type: ContentType,
    pub kind: DependencyType,
}

impl DependencyItem {
    fn key(&self) -> (&PathAddress, &PathAddress, DependencyType) {
        (&self.from, &self.to, self.kind)
    }
}

impl PartialEq for DependencyItem {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for DependencyItem {}

impl Hash for DependencyItem {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl Ord for DependencyItem {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.key().cmp(&other.key())
    }
}

impl PartialOrd for DependencyItem {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Concurrent edge accumulator shared by all resolvers of a build.
#[derive(Debug, Default)]
pub struct DependencyMapBuilder {
    items: DashSet<DependencyItem>,
}

impl DependencyMapBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an edge. `to == None` is a link left unresolved on purpose.
    pub fn add_dependency_item(&self, from: &Document, to: Option<&Document>, kind: DependencyType) {
        let Some(to) = to else {
            return;
        };
        self.items.insert(DependencyItem {
            from: from.address.clone(),
            to: to.address.clone(),
            from_content_type: from.content_type,
            kind,
        });
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Freeze the accumulated edges.
    pub fn build(&self) -> DependencyMap {
        let mut forward: BTreeMap<PathAddress, BTreeSet<DependencyItem>> = BTreeMap::new();
        let mut reverse: BTreeMap<PathAddress, BTreeSet<PathAddress>> = BTreeMap::new();

        for item in self.items.iter() {
            reverse
                .entry(item.to.clone())
                .or_default()
                .insert(item.from.clone());
            forward.entry(item.from.clone()).or_default().insert(item.clone());
        }

        DependencyMap { forward, reverse }
    }
}

// =============================================================================
// Frozen map
// =============================================================================

/// Immutable dependency graph of one build.
#[derive(Debug, Default)]
pub struct DependencyMap {
    forward: BTreeMap<PathAddress, BTreeSet<DependencyItem>>,
    reverse: BTreeMap<PathAddress, BTreeSet<PathAddress>>,
}

/// `{ "dependencies": { "<source>": [ { "source": "<target>", "type": "<Type>" } ] } }`
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct DependencyManifest {
    pub dependencies: BTreeMap<String, Vec<ManifestEdge>>,
}

#[derive(Debug, Serialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct ManifestEdge {
    pub source: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
}

impl DependencyMap {
    /// Outgoing edges of `from`, sorted by target then type.
    pub fn dependencies_of(&self, from: &PathAddress) -> impl Iterator<Item = &DependencyItem> {
        self.forward.get(from).into_iter().flatten()
    }

    /// Files with an edge into `to`.
    pub fn dependents_of(&self, to: &PathAddress) -> impl Iterator<Item = &PathAddress> {
        self.reverse.get(to).into_iter().flatten()
    }

    /// All edges, sorted by source, target, type.
    pub fn items(&self) -> impl Iterator<Item = &DependencyItem> {
        self.forward.values().flatten()
    }

    pub fn len(&self) -> usize {
        self.forward.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    /// Manifest projection keyed by manifest path.
    ///
    /// A current file and its fallback copy share one key, so entries are
    /// merged per key, then sorted by target path and type name and deduplicated.
    pub fn to_manifest_model(&self) -> DependencyManifest {
        let mut dependencies: BTreeMap<String, Vec<ManifestEdge>> = BTreeMap::new();
        for item in self.items() {
            dependencies
                .entry(item.from.manifest_key())
                .or_default()
                .push(ManifestEdge {
                    source: item.to.manifest_key(),
                    kind: item.kind.name(),
                });
        }
        for edges in dependencies.values_mut() {
            edges.sort();
            edges.dedup();
        }
        DependencyManifest { dependencies }
    }

    pub fn to_manifest_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.to_manifest_model())
    }

    /// Write the manifest, creating parent directories.
    pub fn write_manifest(&self, path: &Path) -> Result<(), BuildError> {
        let io_err = |err| BuildError::Io(path.to_path_buf(), err);
        let json = self
            .to_manifest_json()
            .map_err(|err| io_err(std::io::Error::other(err)))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        std::fs::write(path, json).map_err(io_err)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Origin, RelPath};

    fn doc(path: &str) -> Document {
        Document::new(PathAddress::current(path).unwrap(), None, "/")
    }

    fn doc_in(path: &str, origin: Origin) -> Document {
        Document::new(PathAddress::new(RelPath::normalize(path).unwrap(), origin), None, "/")
    }

    /// P4
    #[test]
    fn test_idempotent_edges() {
        let builder = DependencyMapBuilder::new();
        let (a, b) = (doc("a.md"), doc("b.md"));

        builder.add_dependency_item(&a, Some(&b), DependencyType::File);
        builder.add_dependency_item(&a, Some(&b), DependencyType::File);
        builder.add_dependency_item(&a, None, DependencyType::File);

        let map = builder.build();
        assert_eq!(map.len(), 1);
        let edge = map.dependencies_of(&a.address).next().unwrap();
        assert_eq!(edge.to, b.address);
        assert_eq!(edge.kind, DependencyType::File);
    }

    #[test]
    fn test_kind_is_part_of_identity() {
        let builder = DependencyMapBuilder::new();
        let (a, b) = (doc("a.md"), doc("b.md"));
        builder.add_dependency_item(&a, Some(&b), DependencyType::File);
        builder.add_dependency_item(&a, Some(&b), DependencyType::Bookmark);
        assert_eq!(builder.build().len(), 2);
    }

    #[test]
    fn test_reverse_lookup() {
        let builder = DependencyMapBuilder::new();
        let (a, b, c) = (doc("a.md"), doc("b.md"), doc("inc/c.md"));
        builder.add_dependency_item(&a, Some(&c), DependencyType::Include);
        builder.add_dependency_item(&b, Some(&c), DependencyType::Include);

        let map = builder.build();
        let dependents: Vec<_> = map.dependents_of(&c.address).map(|a| a.to_string()).collect();
        assert_eq!(dependents, ["a.md", "b.md"]);
        assert_eq!(map.dependents_of(&a.address).count(), 0);
    }

    /// P5
    #[test]
    fn test_manifest_determinism() {
        let edges = [
            ("a.md", "b.md", DependencyType::File),
            ("a.md", "img/x.png", DependencyType::File),
            ("b.md", "a.md", DependencyType::Bookmark),
            ("a.md", "b.md", DependencyType::Uid),
            ("inc/x.md", "b.md", DependencyType::File),
            ("b.md", "inc/x.md", DependencyType::Include),
        ];

        let forward = DependencyMapBuilder::new();
        for (from, to, kind) in edges {
            forward.add_dependency_item(&doc(from), Some(&doc(to)), kind);
        }

        let backward = DependencyMapBuilder::new();
        std::thread::scope(|scope| {
            for (from, to, kind) in edges.into_iter().rev() {
                let backward = &backward;
                scope.spawn(move || backward.add_dependency_item(&doc(from), Some(&doc(to)), kind));
            }
        });

        let first = forward.build().to_manifest_json().unwrap();
        let second = backward.build().to_manifest_json().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_manifest_shape() {
        let builder = DependencyMapBuilder::new();
        let a = doc("a.md");
        builder.add_dependency_item(&a, Some(&doc("b.md")), DependencyType::Uid);
        builder.add_dependency_item(&a, Some(&doc("b.md")), DependencyType::File);
        builder.add_dependency_item(&a, Some(&doc_in("x/t.md", Origin::dependency("_themes"))), DependencyType::Include);

        let json: serde_json::Value =
            serde_json::from_str(&builder.build().to_manifest_json().unwrap()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "dependencies": {
                    "a.md": [
                        { "source": "_themes/x/t.md", "type": "Include" },
                        { "source": "b.md", "type": "File" },
                        { "source": "b.md", "type": "Uid" },
                    ]
                }
            })
        );
    }

    #[test]
    fn test_manifest_merges_fallback_key() {
        let builder = DependencyMapBuilder::new();
        let b = doc("b.md");
        builder.add_dependency_item(&doc("a.md"), Some(&b), DependencyType::File);
        builder.add_dependency_item(&doc_in("a.md", Origin::Fallback), Some(&b), DependencyType::File);

        let manifest = builder.build().to_manifest_model();
        assert_eq!(manifest.dependencies["a.md"].len(), 1);
    }

    #[test]
    fn test_write_manifest() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("out/dependency-map.json");
        let builder = DependencyMapBuilder::new();
        builder.add_dependency_item(&doc("a.md"), Some(&doc("b.md")), DependencyType::File);

        builder.build().write_manifest(&path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("\"dependencies\""));
    }
}
