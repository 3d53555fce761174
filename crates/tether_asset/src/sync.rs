//! Change detection and the recursive package mirror
//!
//! Packages are immutable bundles. Copying the program subtree out once per
//! package change lets scripts run against ordinary files, which can also be
//! overwritten in place during development, without paying for a full copy on
//! every launch.

use crate::package::{self, is_plain_name, join, normalize, EntryKind, PackageSource};
use crate::{AssetError, PackageChangeToken, DEFAULT_CHUNK_SIZE};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Counters for one mirror pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MirrorStats {
    pub files_copied: usize,
    pub directories: usize,
    pub bytes_copied: u64,
    /// Files or subtrees that could not be read or written
    pub skipped: usize,
}

impl MirrorStats {
    pub fn is_clean(&self) -> bool {
        self.skipped == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The token matched; the existing mirror was left alone
    UpToDate(PackageChangeToken),
    Mirrored {
        token: PackageChangeToken,
        stats: MirrorStats,
    },
}

impl SyncOutcome {
    pub fn files_copied(&self) -> usize {
        match self {
            SyncOutcome::UpToDate(_) => 0,
            SyncOutcome::Mirrored { stats, .. } => stats.files_copied,
        }
    }
}

/// Mirrors a package's program subtree into a writable directory
#[derive(Debug, Clone)]
pub struct AssetSynchronizer {
    package: PathBuf,
    program_root: String,
    mirror_dir: PathBuf,
    token_path: PathBuf,
    chunk_size: usize,
}

impl AssetSynchronizer {
    pub fn new(
        package: impl Into<PathBuf>,
        mirror_dir: impl Into<PathBuf>,
        token_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            package: package.into(),
            program_root: "assets".to_string(),
            mirror_dir: mirror_dir.into(),
            token_path: token_path.into(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Package subtree to mirror; `""` mirrors the whole package.
    pub fn with_program_root(mut self, root: impl Into<String>) -> Self {
        self.program_root = normalize(&root.into()).to_string();
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn mirror_dir(&self) -> &Path {
        &self.mirror_dir
    }

    /// Bring the mirror up to date with the package.
    ///
    /// Only a missing or unmountable package is an error; copy problems are
    /// logged and reflected in the returned [`MirrorStats`].
    pub fn synchronize(&self) -> Result<SyncOutcome, AssetError> {
        let current = PackageChangeToken::of_package(&self.package).map_err(|source| {
            AssetError::PackageMissing {
                path: self.package.clone(),
                source,
            }
        })?;

        let previous = match PackageChangeToken::load(&self.token_path) {
            Ok(previous) => previous,
            Err(err) => {
                tracing::warn!(
                    path = %self.token_path.display(),
                    error = %err,
                    "Could not read change token, treating package as changed"
                );
                None
            }
        };

        // Equality, not ordering: an older package is still a different one
        if previous == Some(current) {
            tracing::debug!(package = %self.package.display(), "Package unchanged, skipping mirror");
            return Ok(SyncOutcome::UpToDate(current));
        }

        tracing::info!(
            package = %self.package.display(),
            ?previous,
            ?current,
            "Package changed, unpacking"
        );

        if let Err(err) = PackageChangeToken::invalidate(&self.token_path) {
            tracing::warn!(path = %self.token_path.display(), error = %err, "Could not remove stale change token");
        }

        let mut source = package::mount(&self.package)?;
        self.clear_mirror();
        let stats = mirror(
            source.as_mut(),
            &self.program_root,
            &self.mirror_dir,
            self.chunk_size,
        );

        tracing::info!(
            files = stats.files_copied,
            directories = stats.directories,
            bytes = stats.bytes_copied,
            skipped = stats.skipped,
            "Mirrored package into {}",
            self.mirror_dir.display()
        );

        if !stats.is_clean() {
            tracing::warn!(
                skipped = stats.skipped,
                "Mirror incomplete, skipped entries stay missing until the package changes"
            );
        }
        if let Err(err) = current.store(&self.token_path) {
            tracing::warn!(path = %self.token_path.display(), error = %err, "Could not persist change token");
        }

        Ok(SyncOutcome::Mirrored {
            token: current,
            stats,
        })
    }

    /// Drop the previous mirror so files removed from the package disappear too.
    fn clear_mirror(&self) {
        match fs::remove_dir_all(&self.mirror_dir) {
            Err(err) if err.kind() != io::ErrorKind::NotFound => {
                tracing::warn!(
                    path = %self.mirror_dir.display(),
                    error = %err,
                    "Could not clear previous mirror, overwriting in place"
                );
            }
            _ => {}
        }
    }
}

/// Recursively copy the package directory `from` into `to`.
pub fn mirror(
    source: &mut dyn PackageSource,
    from: &str,
    to: &Path,
    chunk_size: usize,
) -> MirrorStats {
    let mut stats = MirrorStats::default();
    let mut buf = vec![0u8; chunk_size.max(1)];
    mirror_dir(source, normalize(from), to, &mut buf, &mut stats);
    stats
}

fn mirror_dir(
    source: &mut dyn PackageSource,
    from: &str,
    to: &Path,
    buf: &mut [u8],
    stats: &mut MirrorStats,
) {
    let names = match source.list_dir(from) {
        Ok(names) => names,
        Err(err) => {
            tracing::error!(dir = from, error = %err, "Could not read package directory");
            stats.skipped += 1;
            return;
        }
    };

    if let Err(err) = fs::create_dir_all(to) {
        tracing::error!(dir = %to.display(), error = %err, "Could not create mirror directory");
        stats.skipped += 1;
        return;
    }
    stats.directories += 1;

    for name in names {
        if !is_plain_name(&name) {
            tracing::error!(dir = from, name = %name, "Refusing package entry outside its directory");
            stats.skipped += 1;
            continue;
        }
        let from_path = join(from, &name);
        let to_path = to.join(&name);

        match source.entry_kind(&from_path) {
            Ok(EntryKind::Directory) => {
                tracing::debug!("DIR:  [{}] INTO: [{}]", from_path, to_path.display());
                mirror_dir(source, &from_path, &to_path, buf, stats);
            }
            Ok(EntryKind::File) => {
                tracing::debug!("FILE: [{}] INTO: [{}]", from_path, to_path.display());
                match copy_file(source, &from_path, &to_path, buf) {
                    Some(bytes) => {
                        stats.files_copied += 1;
                        stats.bytes_copied += bytes;
                    }
                    None => stats.skipped += 1,
                }
            }
            Err(err) => {
                tracing::error!(entry = %from_path, error = %err, "Could not stat package entry");
                stats.skipped += 1;
            }
        }
    }
}

/// Stream one file out of the package. Returns bytes copied, or `None` if the
/// file was skipped.
fn copy_file(
    source: &mut dyn PackageSource,
    from: &str,
    to: &Path,
    buf: &mut [u8],
) -> Option<u64> {
    let mut stream = match source.open_read(from) {
        Ok(stream) => stream,
        Err(err) => {
            tracing::error!(entry = from, error = %err, "Could not open to read");
            return None;
        }
    };

    let mut out = match File::create(to) {
        Ok(out) => out,
        Err(err) => {
            tracing::error!(path = %to.display(), error = %err, "Could not open to write");
            return None;
        }
    };

    let mut copied = 0u64;
    loop {
        match stream.read_chunk(buf) {
            Ok(read) if read > 0 => {
                if let Err(err) = out.write_all(&buf[..read]) {
                    tracing::error!(path = %to.display(), error = %err, "Write failed");
                    return None;
                }
                copied += read as u64;
            }
            Ok(_) => {}
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => {
                tracing::error!(entry = from, error = %err, "Read failed");
                return None;
            }
        }

        if stream.is_eof() {
            break;
        }
    }

    Some(copied)
}
