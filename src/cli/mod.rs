//! Command-line interface module.

mod args;
pub mod build;

pub use args::{BuildArgs, Cli, Commands};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::log;

/// Install the Ctrl+C handler.
///
/// The first Ctrl+C sets `cancel`, so the build stops after the current wave
/// and still writes what it has. A second one exits immediately.
pub fn setup_shutdown_handler(cancel: Arc<AtomicBool>) -> anyhow::Result<()> {
    ctrlc::set_handler(move || {
        if cancel.swap(true, Ordering::SeqCst) {
            std::process::exit(130);
        }
        log!("build"; "cancelling after the current wave...");
    })
    .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {}", e))
}
