//! Read-only package capability
//!
//! Paths inside a package are `/`-separated and relative to the package root;
//! the empty string names the root itself.

use crate::archive::ZipPackage;
use crate::directory::DirPackage;
use crate::AssetError;
use std::io::{self, Read};
use std::path::Path;

/// Kind of a package entry
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// A mounted, read-only package
pub trait PackageSource {
    /// Names (not paths) of the direct children of `dir`.
    fn list_dir(&self, dir: &str) -> io::Result<Vec<String>>;

    fn entry_kind(&self, path: &str) -> io::Result<EntryKind>;

    /// Open a file entry for streamed reading.
    fn open_read(&mut self, path: &str) -> io::Result<PackageStream<'_>>;
}

/// Streamed read of one package file.
///
/// End-of-stream is explicit: a short chunk does not mean the entry is
/// exhausted, only [`PackageStream::is_eof`] does.
pub struct PackageStream<'a> {
    reader: Box<dyn Read + 'a>,
    remaining: u64,
}

impl<'a> PackageStream<'a> {
    pub fn new(reader: impl Read + 'a, len: u64) -> Self {
        Self {
            reader: Box::new(reader),
            remaining: len,
        }
    }

    /// Read the next chunk into `buf`, returning how many bytes were filled.
    pub fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.remaining == 0 || buf.is_empty() {
            return Ok(0);
        }

        let want = usize::try_from(self.remaining)
            .unwrap_or(usize::MAX)
            .min(buf.len());
        let read = self.reader.read(&mut buf[..want])?;
        if read == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("entry ended with {} bytes still expected", self.remaining),
            ));
        }

        self.remaining -= read as u64;
        Ok(read)
    }

    pub fn is_eof(&self) -> bool {
        self.remaining == 0
    }
}

/// Mount the package at `path`: a directory is read in place, anything else
/// is opened as a zip archive.
pub fn mount(path: &Path) -> Result<Box<dyn PackageSource>, AssetError> {
    let metadata = std::fs::metadata(path).map_err(|source| AssetError::PackageMissing {
        path: path.to_path_buf(),
        source,
    })?;

    if metadata.is_dir() {
        return Ok(Box::new(DirPackage::new(path)));
    }

    let package = ZipPackage::open(path).map_err(|source| AssetError::PackageOpen {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Box::new(package))
}

/// Join a child name onto a package directory path.
pub(crate) fn join(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{dir}/{name}")
    }
}

/// A single path component that stays where it is joined: not empty, not
/// `.` or `..`, no separators.
pub(crate) fn is_plain_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}

/// Strip leading and trailing separators so `/assets/` and `assets` agree.
pub(crate) fn normalize(path: &str) -> &str {
    path.trim_matches('/')
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Reader that hands out at most `step` bytes per call
    struct Trickle<'a> {
        data: &'a [u8],
        step: usize,
    }

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.step.min(buf.len()).min(self.data.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    #[test]
    fn short_reads_are_not_end_of_stream() {
        let data = b"0123456789";
        let mut stream = PackageStream::new(Trickle { data, step: 3 }, data.len() as u64);
        let mut buf = [0u8; 8];
        let mut out = Vec::new();

        let n = stream.read_chunk(&mut buf).unwrap();
        assert_eq!(n, 3);
        assert!(!stream.is_eof());
        out.extend_from_slice(&buf[..n]);

        while !stream.is_eof() {
            let n = stream.read_chunk(&mut buf).unwrap();
            out.extend_from_slice(&buf[..n]);
        }
        assert_eq!(out, data);
    }

    #[test]
    fn truncated_entry_is_an_error() {
        let mut stream = PackageStream::new(&b"abc"[..], 10);
        let mut buf = [0u8; 16];
        assert_eq!(stream.read_chunk(&mut buf).unwrap(), 3);
        let err = stream.read_chunk(&mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn empty_entry_is_immediately_eof() {
        let stream = PackageStream::new(io::empty(), 0);
        assert!(stream.is_eof());
    }

    #[test]
    fn paths_join_and_normalize() {
        assert_eq!(join("", "main.js"), "main.js");
        assert_eq!(join("assets/lib", "x.js"), "assets/lib/x.js");
        assert_eq!(normalize("/assets/"), "assets");
        assert_eq!(normalize("/"), "");
    }

    #[test]
    fn plain_names_cannot_climb() {
        assert!(is_plain_name("main.js"));
        assert!(is_plain_name("..hidden"));
        assert!(!is_plain_name(""));
        assert!(!is_plain_name("."));
        assert!(!is_plain_name(".."));
        assert!(!is_plain_name("lib/util.js"));
        assert!(!is_plain_name("..\\escaped.txt"));
    }

    #[test]
    fn mount_missing_package_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = mount(&dir.path().join("nope.apk")).err().unwrap();
        assert!(matches!(err, AssetError::PackageMissing { .. }));
    }
}
