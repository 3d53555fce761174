//! Package change token
//!
//! The package's own modification time, recorded after a clean mirror. On
//! disk it is two native-endian `i64`s: whole seconds, then nanoseconds.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct PackageChangeToken {
    pub seconds: i64,
    pub nanos: i64,
}

impl PackageChangeToken {
    /// Size of the persisted record
    pub const ENCODED_LEN: usize = 16;

    pub fn new(seconds: i64, nanos: i64) -> Self {
        Self { seconds, nanos }
    }

    /// Split a timestamp the way `timespec` does: nanoseconds are always in
    /// `0..1_000_000_000`, even before the epoch.
    pub fn from_system_time(time: SystemTime) -> Self {
        match time.duration_since(UNIX_EPOCH) {
            Ok(after) => Self::new(after.as_secs() as i64, i64::from(after.subsec_nanos())),
            Err(err) => {
                let before = err.duration();
                let seconds = -(before.as_secs() as i64);
                match before.subsec_nanos() {
                    0 => Self::new(seconds, 0),
                    nanos => Self::new(seconds - 1, 1_000_000_000 - i64::from(nanos)),
                }
            }
        }
    }

    /// Token for the package entry at `path` (the package file itself, not
    /// anything inside it).
    pub fn of_package(path: &Path) -> io::Result<Self> {
        let modified = fs::metadata(path)?.modified()?;
        Ok(Self::from_system_time(modified))
    }

    pub fn to_bytes(&self) -> [u8; Self::ENCODED_LEN] {
        let mut bytes = [0u8; Self::ENCODED_LEN];
        bytes[..8].copy_from_slice(&self.seconds.to_ne_bytes());
        bytes[8..].copy_from_slice(&self.nanos.to_ne_bytes());
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != Self::ENCODED_LEN {
            return None;
        }
        let seconds = i64::from_ne_bytes(bytes[..8].try_into().ok()?);
        let nanos = i64::from_ne_bytes(bytes[8..].try_into().ok()?);
        Some(Self::new(seconds, nanos))
    }

    /// Read the persisted token. Absent or malformed means "never synced".
    pub fn load(path: &Path) -> io::Result<Option<Self>> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err),
        };

        let token = Self::from_bytes(&bytes);
        if token.is_none() {
            tracing::warn!(
                path = %path.display(),
                len = bytes.len(),
                "Ignoring malformed change token"
            );
        }
        Ok(token)
    }

    /// Persist the token: write a sibling temp file, then rename over the old
    /// one, so a reader sees either the old record or the new one.
    pub fn store(&self, path: &Path) -> io::Result<()> {
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = Path::new(&tmp);

        let mut file = File::create(tmp)?;
        file.write_all(&self.to_bytes())?;
        file.sync_all()?;
        drop(file);

        fs::rename(tmp, path)
    }

    /// Remove a persisted token so an interrupted mirror is never mistaken
    /// for a complete one.
    pub fn invalidate(path: &Path) -> io::Result<()> {
        match fs::remove_file(path) {
            Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn store_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lastprogram.dat");

        assert_eq!(PackageChangeToken::load(&path).unwrap(), None);

        let token = PackageChangeToken::new(100, 5000);
        token.store(&path).unwrap();
        assert_eq!(fs::metadata(&path).unwrap().len(), 16);
        assert_eq!(PackageChangeToken::load(&path).unwrap(), Some(token));

        PackageChangeToken::new(7, 0).store(&path).unwrap();
        assert_eq!(
            PackageChangeToken::load(&path).unwrap(),
            Some(PackageChangeToken::new(7, 0))
        );
        assert!(!dir.path().join("lastprogram.dat.tmp").exists());
    }

    #[test]
    fn malformed_record_reads_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lastprogram.dat");
        fs::write(&path, b"short").unwrap();
        assert_eq!(PackageChangeToken::load(&path).unwrap(), None);
    }

    #[test]
    fn invalidate_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lastprogram.dat");
        PackageChangeToken::new(1, 2).store(&path).unwrap();

        PackageChangeToken::invalidate(&path).unwrap();
        assert!(!path.exists());
        PackageChangeToken::invalidate(&path).unwrap();
    }

    #[test]
    fn splits_system_time() {
        let after = UNIX_EPOCH + Duration::new(100, 5000);
        assert_eq!(
            PackageChangeToken::from_system_time(after),
            PackageChangeToken::new(100, 5000)
        );

        let before = UNIX_EPOCH - Duration::new(1, 250_000_000);
        assert_eq!(
            PackageChangeToken::from_system_time(before),
            PackageChangeToken::new(-2, 750_000_000)
        );
    }

    #[test]
    fn reads_package_mtime() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.apk");
        let file = File::create(&path).unwrap();
        file.set_modified(UNIX_EPOCH + Duration::new(100, 0)).unwrap();
        drop(file);

        assert_eq!(
            PackageChangeToken::of_package(&path).unwrap(),
            PackageChangeToken::new(100, 0)
        );
    }
}
