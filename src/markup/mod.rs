//! Markup rendering collaborator.
//!
//! The renderer turns source text into HTML. It never resolves anything
//! itself: every href, xref and include it finds goes back to the core
//! through a [`LinkSink`].

mod markdown;
mod schema;

pub use markdown::MarkdownRenderer;
pub use schema::{StructuredError, StructuredRef, structured_refs};

use rustc_hash::FxHashSet;

use crate::error::BuildError;
use crate::resolve::ResolvedLink;

/// Rendered HTML and the element ids it defines.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderOutput {
    pub html: String,
    pub ids: FxHashSet<String>,
}

/// Resolution callbacks for one file being rendered.
pub trait LinkSink {
    /// Resolve a link or image destination.
    fn link(&self, href: &str, line: Option<usize>) -> Result<ResolvedLink, BuildError>;

    /// Resolve a bare uid (`<xref:uid>`).
    fn xref(&self, uid: &str, line: Option<usize>) -> Result<ResolvedLink, BuildError>;

    /// Render an included file. `None` when the include was reported broken.
    fn include(&self, path: &str, line: Option<usize>) -> Result<Option<RenderOutput>, BuildError>;
}

pub trait MarkupRenderer: Send + Sync {
    fn render(&self, text: &str, links: &dyn LinkSink) -> Result<RenderOutput, BuildError>;
}
