//! Configuration section definitions.
//!
//! | Module         | TOML Section          | Purpose                         |
//! |----------------|-----------------------|---------------------------------|
//! | `files`        | `[files]`             | Include/exclude globs           |
//! | `dependency`   | `[[dependencies]]`    | Mounted dependency docsets      |
//! | `localization` | `[localization]`      | Locale and fallback docset      |
//! | `output`       | `[output]`, `[xref]`  | Artifacts, external xref maps   |

mod dependency;
mod files;
mod localization;
mod output;

pub use dependency::DependencyConfig;
pub use files::FilesConfig;
pub use localization::LocalizationConfig;
pub use output::{OutputConfig, XrefConfig};
