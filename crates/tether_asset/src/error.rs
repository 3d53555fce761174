use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failures that stop synchronization outright.
///
/// Per-entry copy problems are not errors: they are logged, counted in
/// [`crate::MirrorStats`] and skipped.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("can't find package '{}'", path.display())]
    PackageMissing {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to mount package '{}'", path.display())]
    PackageOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
