//! Logging setup
//!
//! Script `print` output and bridge diagnostics all go through `tracing`; the
//! host entry point installs the subscriber once.

use tracing::Level;

/// Install the fmt subscriber at `level` ("error" through "trace").
///
/// Unknown levels fall back to `info`. A second call (e.g. a host that
/// re-enters init) keeps the first subscriber.
pub fn init_logging(level: &str) {
    let max_level = level.parse::<Level>().unwrap_or(Level::INFO);
    if tracing_subscriber::fmt()
        .with_max_level(max_level)
        .with_target(true)
        .try_init()
        .is_err()
    {
        tracing::debug!("Logging already initialized");
    }
}
