//! Doclink - link, xref and dependency resolution for documentation docsets.
//!
//! A build resolves every reference in a docset (file links, includes,
//! cross-references, bookmarks) across the current docset, an optional
//! localization fallback and mounted dependency docsets, then writes:
//!
//! - a dependency map manifest (which file depends on which, and how)
//! - a diagnostics report
//!
//! ```text
//! config ──► repo (locator) ──► docset (index, scope, redirections)
//!                                  │
//!             build ──► resolve ───┤──► dependency map
//!               │          ▲       └──► bookmarks
//!               └► markup ─┘
//! ```

pub mod build;
pub mod cli;
pub mod config;
pub mod core;
pub mod dependency;
pub mod diagnostic;
pub mod docset;
pub mod error;
pub mod logger;
pub mod markup;
pub mod queue;
pub mod repo;
pub mod resolve;

pub use build::{BuildOutput, Builder};
pub use diagnostic::{Diagnostic, Diagnostics};
pub use error::BuildError;
