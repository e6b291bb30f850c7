//! Dropped files: handles, the flat file map and drop sources
//!
//! A drop delivers a handful of top-level [`DropEntry`] values. The
//! [`collector`] walks them through a [`DropSource`] into a [`FileMap`] keyed
//! by normalized full path.

pub mod collector;
pub mod fs;
pub mod mock;

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Error type for drop source operations
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Entry not found: {0}")]
    NotFound(String),

    #[error("Entry is unreadable: {0}")]
    Unreadable(String),

    #[error("Traversal was abandoned before completion")]
    Abandoned,
}

/// Kind of a dropped file-system entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    File,
    Directory,
}

/// A file-system entry as delivered by a drop or a directory listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropEntry {
    /// Normalized full path inside the drop, e.g. `models/scene.gltf`
    pub path: String,
    /// Whether the entry is a file or a directory
    pub kind: EntryKind,
    /// Where the source finds the entry (a disk path for [`fs::FsDropSource`])
    pub origin: PathBuf,
}

impl DropEntry {
    pub fn file(path: &str) -> Self {
        Self::new(path, EntryKind::File)
    }

    pub fn directory(path: &str) -> Self {
        Self::new(path, EntryKind::Directory)
    }

    fn new(path: &str, kind: EntryKind) -> Self {
        let path = normalize_path(path);
        Self {
            origin: PathBuf::from(&path),
            path,
            kind,
        }
    }

    /// Replace the source-specific location of this entry
    pub fn with_origin(mut self, origin: impl Into<PathBuf>) -> Self {
        self.origin = origin.into();
        self
    }

    /// Build the entry for a child of this directory
    pub fn child(&self, name: &str, kind: EntryKind, origin: impl Into<PathBuf>) -> Self {
        Self {
            path: join_path(&self.path, name),
            kind,
            origin: origin.into(),
        }
    }

    /// Last path component
    pub fn name(&self) -> &str {
        file_name(&self.path)
    }

    pub fn is_directory(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

/// Where a file handle's bytes live
#[derive(Clone)]
pub enum FileContents {
    Memory(Arc<[u8]>),
    Disk(PathBuf),
}

/// Opaque reference to a dropped file's bytes
#[derive(Clone)]
pub struct FileHandle {
    path: String,
    len: u64,
    contents: FileContents,
}

impl fmt::Debug for FileHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let location = match &self.contents {
            FileContents::Memory(_) => "memory".to_string(),
            FileContents::Disk(path) => path.display().to_string(),
        };
        f.debug_struct("FileHandle")
            .field("path", &self.path)
            .field("len", &self.len)
            .field("location", &location)
            .finish()
    }
}

impl FileHandle {
    /// Create a handle for bytes already in memory
    pub fn in_memory(path: &str, bytes: impl Into<Arc<[u8]>>) -> Self {
        let bytes = bytes.into();
        Self {
            path: normalize_path(path),
            len: bytes.len() as u64,
            contents: FileContents::Memory(bytes),
        }
    }

    /// Create a handle for a file on disk
    pub fn on_disk(path: &str, location: impl Into<PathBuf>, len: u64) -> Self {
        Self {
            path: normalize_path(path),
            len,
            contents: FileContents::Disk(location.into()),
        }
    }

    /// Normalized full path of the file inside the drop
    pub fn path(&self) -> &str {
        &self.path
    }

    /// File name without directories
    pub fn name(&self) -> &str {
        file_name(&self.path)
    }

    /// Lowercased extension, if any
    pub fn extension(&self) -> Option<String> {
        extension_of(&self.path)
    }

    /// Size in bytes as reported when the handle was created
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn contents(&self) -> &FileContents {
        &self.contents
    }

    /// True when both handles refer to the same underlying bytes
    pub fn same_file(&self, other: &FileHandle) -> bool {
        self.path == other.path
            && match (&self.contents, &other.contents) {
                (FileContents::Memory(a), FileContents::Memory(b)) => Arc::ptr_eq(a, b),
                (FileContents::Disk(a), FileContents::Disk(b)) => a == b,
                _ => false,
            }
    }

    /// Read the file's bytes
    pub async fn read(&self) -> Result<Arc<[u8]>, SourceError> {
        match &self.contents {
            FileContents::Memory(bytes) => Ok(Arc::clone(bytes)),
            FileContents::Disk(location) => {
                #[cfg(feature = "runtime-tokio")]
                {
                    if tokio::runtime::Handle::try_current().is_ok() {
                        let bytes = tokio::fs::read(location).await?;
                        return Ok(Arc::from(bytes));
                    }
                }
                let bytes = std::fs::read(location)?;
                Ok(Arc::from(bytes))
            }
        }
    }
}

/// Flat mapping from normalized full path to file handle
///
/// Built once per drop by the collector; read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct FileMap {
    files: BTreeMap<String, FileHandle>,
}

impl FileMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, handle: FileHandle) -> Option<FileHandle> {
        self.files.insert(handle.path.clone(), handle)
    }

    pub fn get(&self, path: &str) -> Option<&FileHandle> {
        self.files.get(&normalize_path(path))
    }

    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Paths in lexicographic order
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FileHandle)> {
        self.files.iter().map(|(path, handle)| (path.as_str(), handle))
    }

    /// Find the file whose path ends with `suffix` on a component boundary
    ///
    /// `tex.png` matches `a/b/tex.png` but not `a/btex.png`. When several
    /// files match, the shortest path wins, then the lexicographically first.
    pub fn find_by_suffix(&self, suffix: &str) -> Option<&FileHandle> {
        let needle = normalize_path(suffix);
        if needle.is_empty() {
            return None;
        }
        if let Some(exact) = self.files.get(&needle) {
            return Some(exact);
        }
        self.files
            .iter()
            .filter(|(path, _)| {
                path.len() > needle.len()
                    && path.ends_with(needle.as_str())
                    && path[..path.len() - needle.len()].ends_with('/')
            })
            .min_by_key(|(path, _)| path.len())
            .map(|(_, handle)| handle)
    }
}

impl FromIterator<FileHandle> for FileMap {
    fn from_iter<I: IntoIterator<Item = FileHandle>>(iter: I) -> Self {
        let mut map = FileMap::new();
        for handle in iter {
            map.insert(handle);
        }
        map
    }
}

/// Source of drop entries: lists directories and hands out file handles
///
/// Uses async-trait for dyn compatibility; the collector holds an
/// `Arc<dyn DropSource>`.
#[async_trait]
pub trait DropSource: Send + Sync + fmt::Debug {
    /// List the direct children of a directory entry
    async fn read_dir(&self, dir: &DropEntry) -> Result<Vec<DropEntry>, SourceError>;

    /// Resolve a file entry to a readable handle
    async fn open_file(&self, file: &DropEntry) -> Result<FileHandle, SourceError>;

    /// Get the name of this source (for debugging)
    fn source_name(&self) -> &'static str;
}

/// Normalize a drop path or URI path: `/` separators, no empty, `.` or
/// leading `..` components
pub fn normalize_path(raw: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for part in raw.split(['/', '\\']) {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}

/// Join a child name onto a normalized directory path
pub fn join_path(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        normalize_path(name)
    } else {
        normalize_path(&format!("{dir}/{name}"))
    }
}

/// Directory part of a normalized path (empty for top-level paths)
pub fn parent_dir(path: &str) -> &str {
    path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Lowercased extension of the last path component
pub fn extension_of(path: &str) -> Option<String> {
    let name = file_name(path);
    name.rsplit_once('.')
        .filter(|(stem, ext)| !stem.is_empty() && !ext.is_empty())
        .map(|(_, ext)| ext.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/a/b/tex.png"), "a/b/tex.png");
        assert_eq!(normalize_path("./a//b\\c.bin"), "a/b/c.bin");
        assert_eq!(normalize_path("a/../b.png"), "b.png");
        assert_eq!(normalize_path("../../tex.png"), "tex.png");
        assert_eq!(normalize_path(""), "");
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("a/Scene.GLTF").as_deref(), Some("gltf"));
        assert_eq!(extension_of("a/.hidden"), None);
        assert_eq!(extension_of("noext"), None);
    }

    #[test]
    fn test_parent_dir() {
        assert_eq!(parent_dir("a/b/scene.gltf"), "a/b");
        assert_eq!(parent_dir("scene.gltf"), "");
    }

    #[test]
    fn test_suffix_lookup_matches_nested_file() {
        let handle = FileHandle::in_memory("a/b/tex.png", vec![1u8, 2, 3]);
        let map: FileMap = [handle.clone()].into_iter().collect();

        let found = map.find_by_suffix("tex.png").expect("suffix match");
        assert!(found.same_file(&handle));
    }

    #[test]
    fn test_suffix_lookup_respects_component_boundary() {
        let map: FileMap = [FileHandle::in_memory("a/atex.png", vec![0u8])]
            .into_iter()
            .collect();
        assert!(map.find_by_suffix("tex.png").is_none());
    }

    #[test]
    fn test_suffix_lookup_prefers_shortest_path() {
        let map: FileMap = [
            FileHandle::in_memory("deep/er/tex.png", vec![0u8]),
            FileHandle::in_memory("b/tex.png", vec![1u8]),
            FileHandle::in_memory("a/tex.png", vec![2u8]),
        ]
        .into_iter()
        .collect();

        assert_eq!(map.find_by_suffix("tex.png").unwrap().path(), "a/tex.png");
        assert!(map.find_by_suffix("").is_none());
    }

    #[test]
    fn test_drop_entry_child_paths() {
        let dir = DropEntry::directory("/models/");
        let child = dir.child("scene.gltf", EntryKind::File, "/tmp/x/scene.gltf");

        assert_eq!(dir.path, "models");
        assert_eq!(child.path, "models/scene.gltf");
        assert_eq!(child.name(), "scene.gltf");
        assert_eq!(child.origin, PathBuf::from("/tmp/x/scene.gltf"));
    }

    #[test]
    fn test_memory_handle_read() {
        let handle = FileHandle::in_memory("x.bin", vec![9u8, 8, 7]);
        let bytes = futures::executor::block_on(handle.read()).unwrap();

        assert_eq!(&*bytes, &[9, 8, 7]);
        assert_eq!(handle.len(), 3);
        assert_eq!(handle.extension().as_deref(), Some("bin"));
    }
}
