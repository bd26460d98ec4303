//! Filesystem boundary.
//!
//! Repositories reach the disk only through [`FileStore`], which keeps the
//! coherence protocol testable against in-memory doubles and leaves the door
//! open for non-disk content stores.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::time::SystemTime;

use bytes::Bytes;

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub path: PathBuf,
    pub is_dir: bool,
}

/// Backing store for repository content.
///
/// All operations are bounded; there is nothing long-running to cancel.
pub trait FileStore: Send + Sync {
    fn exists(&self, path: &Path) -> bool;
    /// Modification time of the file at `path`.
    fn modified(&self, path: &Path) -> io::Result<SystemTime>;
    /// Read the file at `path` in full.
    fn read(&self, path: &Path) -> io::Result<Bytes>;
    /// Write `data` to `path`, creating parent directories as needed.
    fn write(&self, path: &Path, data: &[u8]) -> io::Result<()>;
    fn make_dir(&self, path: &Path) -> io::Result<()>;
    /// Remove an empty directory; fails if missing or non-empty.
    fn remove_dir(&self, path: &Path) -> io::Result<()>;
    /// List the immediate children of a directory, sorted by path.
    fn list_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>>;
}

/// [`FileStore`] over the real filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiskStore;

impl FileStore for DiskStore {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn modified(&self, path: &Path) -> io::Result<SystemTime> {
        std::fs::metadata(path)?.modified()
    }

    fn read(&self, path: &Path) -> io::Result<Bytes> {
        Ok(Bytes::from(std::fs::read(path)?))
    }

    fn write(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, data)
    }

    fn make_dir(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }

    fn remove_dir(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_dir(path)
    }

    fn list_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(path)? {
            let entry = entry?;
            entries.push(DirEntry {
                is_dir: entry.file_type()?.is_dir(),
                path: entry.path(),
            });
        }
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }
}

#[derive(Debug, Clone)]
struct MemoryFile {
    data: Bytes,
    modified: SystemTime,
}

/// In-memory [`FileStore`].
///
/// Files carry explicit modification times, settable independently of their
/// contents, which is what staleness tests need.
#[derive(Default)]
pub struct MemoryStore {
    files: RwLock<BTreeMap<PathBuf, MemoryFile>>,
    dirs: RwLock<BTreeMap<PathBuf, ()>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a file with an explicit modification time.
    pub fn put_file(&self, path: impl Into<PathBuf>, data: impl Into<Bytes>, modified: SystemTime) {
        let path = path.into();
        for ancestor in path.ancestors().skip(1) {
            if !ancestor.as_os_str().is_empty() {
                self.dirs.write().unwrap().insert(ancestor.to_path_buf(), ());
            }
        }
        self.files.write().unwrap().insert(
            path,
            MemoryFile {
                data: data.into(),
                modified,
            },
        );
    }

    /// Bump a file's modification time without touching its contents.
    pub fn touch(&self, path: &Path, modified: SystemTime) {
        if let Some(file) = self.files.write().unwrap().get_mut(path) {
            file.modified = modified;
        }
    }

    pub fn remove_file(&self, path: &Path) {
        self.files.write().unwrap().remove(path);
    }
}

impl FileStore for MemoryStore {
    fn exists(&self, path: &Path) -> bool {
        self.files.read().unwrap().contains_key(path)
            || self.dirs.read().unwrap().contains_key(path)
    }

    fn modified(&self, path: &Path) -> io::Result<SystemTime> {
        self.files
            .read()
            .unwrap()
            .get(path)
            .map(|file| file.modified)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such file"))
    }

    fn read(&self, path: &Path) -> io::Result<Bytes> {
        self.files
            .read()
            .unwrap()
            .get(path)
            .map(|file| file.data.clone())
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such file"))
    }

    fn write(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        self.put_file(path.to_path_buf(), Bytes::copy_from_slice(data), SystemTime::now());
        Ok(())
    }

    fn make_dir(&self, path: &Path) -> io::Result<()> {
        for ancestor in path.ancestors() {
            if !ancestor.as_os_str().is_empty() {
                self.dirs.write().unwrap().insert(ancestor.to_path_buf(), ());
            }
        }
        Ok(())
    }

    fn remove_dir(&self, path: &Path) -> io::Result<()> {
        if !self.dirs.read().unwrap().contains_key(path) {
            return Err(io::Error::new(io::ErrorKind::NotFound, "no such directory"));
        }
        let has_children = {
            let files = self.files.read().unwrap();
            let dirs = self.dirs.read().unwrap();
            files.keys().any(|p| p.parent() == Some(path))
                || dirs.keys().any(|p| p.parent() == Some(path))
        };
        if has_children {
            return Err(io::Error::new(
                io::ErrorKind::DirectoryNotEmpty,
                "directory not empty",
            ));
        }
        self.dirs.write().unwrap().remove(path);
        Ok(())
    }

    fn list_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        if !self.dirs.read().unwrap().contains_key(path) {
            return Err(io::Error::new(io::ErrorKind::NotFound, "no such directory"));
        }
        let mut entries: Vec<DirEntry> = self
            .files
            .read()
            .unwrap()
            .keys()
            .filter(|p| p.parent() == Some(path))
            .map(|p| DirEntry {
                path: p.clone(),
                is_dir: false,
            })
            .chain(
                self.dirs
                    .read()
                    .unwrap()
                    .keys()
                    .filter(|p| p.parent() == Some(path))
                    .map(|p| DirEntry {
                        path: p.clone(),
                        is_dir: true,
                    }),
            )
            .collect();
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }
}
