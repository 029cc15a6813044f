//! Core types - pure abstractions shared across the codebase.

mod category;
mod link;
mod path;
pub mod url;

pub use category::ContentType;
pub use link::LinkKind;
pub use path::{Origin, PathAddress, PathError, RelPath};
