//! The `data/` and `images/` attachment directories.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use log::warn;
use rayon::prelude::*;

use crate::cache::{LazySlot, LoadStats};
use crate::error::{Error, StoreError};

const PNG_SIGNATURE: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreKind {
    /// Arbitrary files, nested to any depth
    Data,
    /// PNG files directly inside the directory
    Images,
}

/// Files listed up front and read on first access.
///
/// Keys are paths relative to the store's directory, `/`-separated.
#[derive(Debug)]
pub struct FileStore {
    kind: StoreKind,
    root: PathBuf,
    entries: IndexMap<String, LazySlot<Vec<u8>>>,
    stats: Arc<LoadStats>,
}

pub type DataStore = FileStore;
pub type ImageStore = FileStore;

impl FileStore {
    /// A store with no files, for packages without the directory or when
    /// the store is skipped.
    pub(crate) fn empty(kind: StoreKind, root: PathBuf, stats: Arc<LoadStats>) -> FileStore {
        FileStore {
            kind,
            root,
            entries: IndexMap::new(),
            stats,
        }
    }

    pub(crate) fn open(kind: StoreKind, root: PathBuf, stats: Arc<LoadStats>) -> Result<FileStore, Error> {
        let mut store = FileStore::empty(kind, root, stats);
        if !store.root.is_dir() {
            return Ok(store);
        }
        let mut paths = Vec::new();
        list_files(&store.root, "", kind == StoreKind::Data, &mut paths)?;
        paths.sort();
        store.entries = paths.into_iter().map(|p| (p, LazySlot::new())).collect();
        Ok(store)
    }

    pub fn kind(&self) -> StoreKind {
        self.kind
    }

    /// Every file in the store, without reading any of them.
    pub fn list_paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_loaded(&self, path: &str) -> bool {
        self.entries.get(path).is_some_and(LazySlot::is_loaded)
    }

    /// The contents of a file, read on first access.
    pub fn get(&self, path: &str) -> Result<Arc<Vec<u8>>, Error> {
        let slot = self
            .entries
            .get(path)
            .ok_or_else(|| Error::DataNotFound(path.to_string()))?;
        self.load(path, slot)
    }

    pub(crate) fn preload(&self, parallel: bool) -> Result<(), Error> {
        if parallel {
            self.entries
                .par_iter()
                .try_for_each(|(path, slot)| self.load(path, slot).map(|_| ()))
        } else {
            self.entries
                .iter()
                .try_for_each(|(path, slot)| self.load(path, slot).map(|_| ()))
        }
    }

    fn load(&self, rel: &str, slot: &LazySlot<Vec<u8>>) -> Result<Arc<Vec<u8>>, Error> {
        slot.get_or_try_init(|| {
            let path = self.root.join(rel);
            let bytes = fs::read(&path).map_err(|e| Error::io(&path, e))?;
            match self.kind {
                StoreKind::Data => self.stats.data_read(),
                StoreKind::Images => {
                    self.stats.image_read();
                    if !bytes.starts_with(PNG_SIGNATURE) {
                        return Err(Error::Store {
                            path,
                            source: StoreError::InvalidImage,
                        });
                    }
                }
            }
            Ok(bytes)
        })
    }
}

fn list_files(dir: &Path, prefix: &str, recurse: bool, out: &mut Vec<String>) -> Result<(), Error> {
    let entries = fs::read_dir(dir).map_err(|e| Error::io(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| Error::io(dir, e))?;
        let path = entry.path();
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            warn!("skipping {:?}, the name is not UTF-8", path);
            continue;
        };
        let rel = if prefix.is_empty() {
            name
        } else {
            format!("{prefix}/{name}")
        };
        let file_type = entry.file_type().map_err(|e| Error::io(&path, e))?;
        if file_type.is_dir() {
            if recurse {
                list_files(&path, &rel, recurse, out)?;
            }
        } else if file_type.is_symlink() && path.is_dir() {
            warn!("skipping {:?}, directory links are not followed", path);
        } else {
            out.push(rel);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;

    const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

    fn write(dir: &TempDir, rel: &str, content: &[u8]) {
        let path = dir.path().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn open(dir: &TempDir, kind: StoreKind) -> FileStore {
        FileStore::open(kind, dir.path().to_path_buf(), Arc::default()).unwrap()
    }

    #[test]
    fn data_is_listed_recursively() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir, "org.example.tool/settings.json", b"{}");
        write(&dir, "org.example.tool/nested/deep.bin", b"\x00\x01");
        write(&dir, "readme.txt", b"hello");
        let store = open(&dir, StoreKind::Data);
        assert_eq!(
            store.list_paths().collect::<Vec<_>>(),
            vec![
                "org.example.tool/nested/deep.bin",
                "org.example.tool/settings.json",
                "readme.txt"
            ]
        );
        assert_eq!(store.stats.data_files_read(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn directory_links_are_not_followed() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir, "org.example.tool/settings.json", b"{}");
        write(&dir, "target.txt", b"hi");
        std::os::unix::fs::symlink(dir.path(), dir.path().join("org.example.tool/loop")).unwrap();
        std::os::unix::fs::symlink(dir.path().join("target.txt"), dir.path().join("link.txt"))
            .unwrap();
        let store = open(&dir, StoreKind::Data);
        assert_eq!(
            store.list_paths().collect::<Vec<_>>(),
            vec!["link.txt", "org.example.tool/settings.json", "target.txt"]
        );
        assert_eq!(store.get("link.txt").unwrap().as_slice(), b"hi");
    }

    #[test]
    fn get_reads_once() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir, "readme.txt", b"hello");
        let store = open(&dir, StoreKind::Data);
        assert!(!store.is_loaded("readme.txt"));
        assert_eq!(store.get("readme.txt").unwrap().as_slice(), b"hello");
        assert_eq!(store.get("readme.txt").unwrap().as_slice(), b"hello");
        assert!(store.is_loaded("readme.txt"));
        assert_eq!(store.stats.data_files_read(), 1);
        assert!(matches!(store.get("missing"), Err(Error::DataNotFound(_))));
    }

    #[test]
    fn images_are_flat_and_checked() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir, "a.png", PNG);
        write(&dir, "b.png", b"GIF89a");
        write(&dir, "sub/c.png", PNG);
        let store = open(&dir, StoreKind::Images);
        assert_eq!(store.list_paths().collect::<Vec<_>>(), vec!["a.png", "b.png"]);
        assert!(store.get("a.png").is_ok());
        assert!(matches!(
            store.get("b.png"),
            Err(Error::Store {
                source: StoreError::InvalidImage,
                ..
            })
        ));
        assert!(store.preload(true).is_err());
    }

    #[test]
    fn missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(StoreKind::Data, dir.path().join("data"), Arc::default()).unwrap();
        assert!(store.is_empty());
        assert!(store.preload(false).is_ok());
    }
}
