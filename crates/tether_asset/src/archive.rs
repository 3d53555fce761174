//! Zip archive packages
//!
//! Zip entries are a flat list of names, and directories may or may not have
//! entries of their own, so the directory structure is indexed once at mount.

use crate::package::{is_plain_name, join, normalize, EntryKind, PackageSource, PackageStream};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;
use zip::ZipArchive;

pub struct ZipPackage {
    archive: ZipArchive<BufReader<File>>,
    /// Normalized path -> kind, including implied parent directories
    entries: BTreeMap<String, EntryKind>,
}

impl ZipPackage {
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = File::open(path)?;
        let mut archive = ZipArchive::new(BufReader::new(file)).map_err(io::Error::from)?;

        let mut names = Vec::with_capacity(archive.len());
        for index in 0..archive.len() {
            let entry = archive.by_index_raw(index).map_err(io::Error::from)?;
            let raw = entry.name().to_string();
            // Every component must be plain, even where `..` would stay inside
            let enclosed = entry.enclosed_name().is_some()
                && normalize(&raw).split('/').all(is_plain_name);
            if enclosed {
                names.push(raw);
            } else {
                tracing::warn!(entry = %raw, "Ignoring zip entry with an unsafe path");
            }
        }

        let mut entries = BTreeMap::new();
        for raw in &names {
            let kind = if raw.ends_with('/') {
                EntryKind::Directory
            } else {
                EntryKind::File
            };
            let name = normalize(raw);

            let mut parent = name;
            while let Some((dir, _)) = parent.rsplit_once('/') {
                entries.insert(dir.to_string(), EntryKind::Directory);
                parent = dir;
            }
            entries.insert(name.to_string(), kind);
        }

        tracing::debug!(
            package = %path.display(),
            entries = entries.len(),
            "Mounted zip package"
        );
        Ok(Self { archive, entries })
    }
}

impl PackageSource for ZipPackage {
    fn list_dir(&self, dir: &str) -> io::Result<Vec<String>> {
        let dir = normalize(dir);
        if !dir.is_empty() && self.entries.get(dir) != Some(&EntryKind::Directory) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no directory '{dir}' in package"),
            ));
        }

        let prefix = join(dir, "");
        let children = self
            .entries
            .keys()
            .filter_map(|path| path.strip_prefix(prefix.as_str()))
            .filter(|rest| !rest.is_empty() && !rest.contains('/'))
            .map(str::to_string)
            .collect();
        Ok(children)
    }

    fn entry_kind(&self, path: &str) -> io::Result<EntryKind> {
        self.entries.get(normalize(path)).copied().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("no entry '{path}' in package"))
        })
    }

    fn open_read(&mut self, path: &str) -> io::Result<PackageStream<'_>> {
        let file = self
            .archive
            .by_name(normalize(path))
            .map_err(io::Error::from)?;
        let len = file.size();
        Ok(PackageStream::new(file, len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn build_zip(path: &Path, files: &[(&str, &[u8])]) {
        let mut zip = ZipWriter::new(File::create(path).unwrap());
        let options = SimpleFileOptions::default();
        zip.add_directory("assets/empty/", options).unwrap();
        for (name, data) in files {
            zip.start_file(*name, options).unwrap();
            zip.write_all(data).unwrap();
        }
        zip.finish().unwrap();
    }

    fn read_all(package: &mut ZipPackage, path: &str) -> Vec<u8> {
        let mut stream = package.open_read(path).unwrap();
        let mut buf = [0u8; 4];
        let mut out = Vec::new();
        while !stream.is_eof() {
            let n = stream.read_chunk(&mut buf).unwrap();
            out.extend_from_slice(&buf[..n]);
        }
        out
    }

    #[test]
    fn indexes_implied_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.apk");
        build_zip(
            &path,
            &[
                ("assets/main.js", b"print('hi')"),
                ("assets/lib/util.js", b"// util"),
                ("classes.dex", b"dex"),
            ],
        );

        let package = ZipPackage::open(&path).unwrap();
        let mut root = package.list_dir("").unwrap();
        root.sort();
        assert_eq!(root, vec!["assets", "classes.dex"]);

        let mut assets = package.list_dir("/assets").unwrap();
        assets.sort();
        assert_eq!(assets, vec!["empty", "lib", "main.js"]);

        assert_eq!(package.entry_kind("assets/lib").unwrap(), EntryKind::Directory);
        assert_eq!(package.entry_kind("assets/empty").unwrap(), EntryKind::Directory);
        assert_eq!(package.entry_kind("assets/main.js").unwrap(), EntryKind::File);
        assert!(package.list_dir("assets/missing").is_err());
        assert!(package.list_dir("classes.dex").is_err());
    }

    #[test]
    fn streams_file_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.apk");
        let payload: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
        build_zip(&path, &[("assets/blob.bin", &payload)]);

        let mut package = ZipPackage::open(&path).unwrap();
        assert_eq!(read_all(&mut package, "assets/blob.bin"), payload);
        assert!(package.open_read("assets/nope.bin").is_err());
    }

    #[test]
    fn skips_entries_that_climb_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.apk");
        build_zip(
            &path,
            &[
                ("assets/main.js", b"main"),
                ("assets/../escaped.txt", b"outside"),
                ("assets/./dot.js", b"dot"),
                ("../../etc/passwd", b"root"),
            ],
        );

        let package = ZipPackage::open(&path).unwrap();
        let mut root = package.list_dir("").unwrap();
        root.sort();
        assert_eq!(root, vec!["assets"]);

        let mut assets = package.list_dir("assets").unwrap();
        assets.sort();
        assert_eq!(assets, vec!["empty", "main.js"]);
        assert!(package.entry_kind("assets/..").is_err());
    }

    #[test]
    fn rejects_non_zip_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.apk");
        std::fs::write(&path, b"definitely not a zip").unwrap();
        assert!(ZipPackage::open(&path).is_err());
    }
}
