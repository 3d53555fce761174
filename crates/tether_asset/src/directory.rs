//! Plain directories used as packages (desktop development)

use crate::package::{normalize, EntryKind, PackageSource, PackageStream};
use std::fs::{self, File};
use std::io;
use std::path::PathBuf;

pub struct DirPackage {
    root: PathBuf,
}

impl DirPackage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let path = normalize(path);
        if path.is_empty() {
            self.root.clone()
        } else {
            self.root.join(path)
        }
    }
}

impl PackageSource for DirPackage {
    fn list_dir(&self, dir: &str) -> io::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(self.resolve(dir))? {
            let entry = entry?;
            match entry.file_name().into_string() {
                Ok(name) => names.push(name),
                Err(raw) => tracing::warn!(name = ?raw, "Skipping non UTF-8 package entry"),
            }
        }
        Ok(names)
    }

    fn entry_kind(&self, path: &str) -> io::Result<EntryKind> {
        let resolved = self.resolve(path);
        let mut metadata = fs::symlink_metadata(&resolved)?;
        if metadata.file_type().is_symlink() {
            metadata = fs::metadata(&resolved)?;
            // A linked directory may point back up the tree
            if metadata.is_dir() {
                return Err(io::Error::new(
                    io::ErrorKind::Unsupported,
                    format!("'{path}' is a symlinked directory"),
                ));
            }
        }
        Ok(if metadata.is_dir() {
            EntryKind::Directory
        } else {
            EntryKind::File
        })
    }

    fn open_read(&mut self, path: &str) -> io::Result<PackageStream<'_>> {
        let file = File::open(self.resolve(path))?;
        let len = file.metadata()?.len();
        Ok(PackageStream::new(file, len))
    }
}
