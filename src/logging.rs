//! Logging initialization
//!
//! Provides a single initialization point for the `tracing` subscriber.

use std::sync::Once;
use tracing_subscriber::EnvFilter;

/// How chatty the command-line run should be
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Warnings only (retries, out-of-range adjustments, odd borrows)
    Quiet,
    /// Every computation and request
    Debug,
}

impl Verbosity {
    fn default_directive(self) -> &'static str {
        match self {
            Verbosity::Quiet => "agecalc=warn",
            Verbosity::Debug => "agecalc=debug",
        }
    }
}

static INIT_ONCE: Once = Once::new();

/// Initialize logging to stderr. `RUST_LOG` overrides `verbosity`.
///
/// Only the first call has any effect.
pub fn init(verbosity: Verbosity) {
    INIT_ONCE.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(verbosity.default_directive()));
        // Another subscriber may already be installed (e.g. by a test harness)
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
    });
}
