//! Reference resolution: paths, links, includes, xrefs and bookmarks.
//!
//! ```text
//! LinkResolver ──► FileResolver ──► Docset (scope, redirections, locator)
//!      │
//!      ├──► XrefResolver
//!      ├──► WorkQueue / DependencyMapBuilder
//!      └──► BookmarkValidator
//! ```

mod bookmark;
mod context;
pub(crate) mod file;
mod link;
mod xref;

pub use bookmark::{BookmarkReference, BookmarkValidator};
pub use context::RenderContext;
pub use file::{FileLookup, FileResolver};
pub use link::{LinkResolver, LinkSource, LinkType, ResolvedLink};
pub use xref::{XrefMap, XrefResolver, XrefSpec};
