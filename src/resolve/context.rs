//! Rendering context passed explicitly through every resolution.
//!
//! Content inclusion changes which file is being read without changing
//! which page is being rendered. The context carries:
//!
//! - `root`: the page being rendered (links are made relative to it)
//! - the inclusion stack, for cycle detection
//! - the diagnostics sink of the build

use crate::core::PathAddress;
use crate::diagnostic::Diagnostics;
use crate::docset::Document;

#[derive(Debug, Clone)]
pub struct RenderContext<'a> {
    root: Document,
    /// Files entered through inclusion, outermost first. Excludes `root`.
    includes: Vec<PathAddress>,
    diagnostics: &'a Diagnostics,
}

impl<'a> RenderContext<'a> {
    pub fn new(root: Document, diagnostics: &'a Diagnostics) -> Self {
        Self {
            root,
            includes: Vec::new(),
            diagnostics,
        }
    }

    /// The page being rendered.
    pub fn root(&self) -> &Document {
        &self.root
    }

    pub fn diagnostics(&self) -> &'a Diagnostics {
        self.diagnostics
    }

    /// Whether `address` is already being rendered up the inclusion chain.
    pub fn is_active(&self, address: &PathAddress) -> bool {
        self.root.address == *address || self.includes.contains(address)
    }

    /// Context for rendering an included file.
    pub fn enter(&self, included: &Document) -> Self {
        let mut includes = self.includes.clone();
        includes.push(included.address.clone());
        Self {
            root: self.root.clone(),
            includes,
            diagnostics: self.diagnostics,
        }
    }
}
