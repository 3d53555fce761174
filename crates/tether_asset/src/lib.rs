//! Tether Asset Synchronization
//!
//! Mirrors the program subtree of a read-only package (an APK, or a plain
//! directory during development) into a writable directory, and only when the
//! package has changed since the last mirror.
//!
//! ## Layout
//!
//! - `package` - the read-only source capability and its stream type
//! - `archive` / `directory` - concrete package readers
//! - `token` - the persisted change token
//! - `sync` - change detection and the recursive mirror

pub mod archive;
pub mod directory;
pub mod error;
pub mod package;
pub mod sync;
pub mod token;

pub use error::AssetError;
pub use package::{mount, EntryKind, PackageSource, PackageStream};
pub use sync::{mirror, AssetSynchronizer, MirrorStats, SyncOutcome};
pub use token::PackageChangeToken;

/// Default copy chunk size in bytes
pub const DEFAULT_CHUNK_SIZE: usize = 8 * 1024;
