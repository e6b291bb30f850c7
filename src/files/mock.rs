//! In-memory drop source for testing
//!
//! Holds a tree of directories and files in memory, with optional unreadable
//! entries, and counts the requests made against it.

use super::{
    normalize_path, parent_dir, DropEntry, DropSource, EntryKind, FileHandle, SourceError,
};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone)]
enum MockNode {
    Directory,
    File(Arc<[u8]>),
    Unreadable(EntryKind),
}

impl MockNode {
    fn kind(&self) -> EntryKind {
        match self {
            MockNode::Directory => EntryKind::Directory,
            MockNode::File(_) => EntryKind::File,
            MockNode::Unreadable(kind) => *kind,
        }
    }
}

/// Mock drop source holding its tree in memory
#[derive(Debug, Clone, Default)]
pub struct MockDropSource {
    nodes: BTreeMap<String, MockNode>,
    requests: Arc<AtomicUsize>,
}

impl MockDropSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file, creating its parent directories
    pub fn with_file(mut self, path: &str, bytes: impl Into<Arc<[u8]>>) -> Self {
        let path = normalize_path(path);
        self.add_parents(&path);
        self.nodes.insert(path, MockNode::File(bytes.into()));
        self
    }

    /// Add a (possibly empty) directory, creating its parents
    pub fn with_dir(mut self, path: &str) -> Self {
        let path = normalize_path(path);
        self.add_parents(&path);
        self.nodes.insert(path, MockNode::Directory);
        self
    }

    /// Add an entry that is listed but fails when read
    pub fn with_unreadable(mut self, path: &str, kind: EntryKind) -> Self {
        let path = normalize_path(path);
        self.add_parents(&path);
        self.nodes.insert(path, MockNode::Unreadable(kind));
        self
    }

    fn add_parents(&mut self, path: &str) {
        let mut dir = parent_dir(path);
        while !dir.is_empty() {
            self.nodes
                .entry(dir.to_string())
                .or_insert(MockNode::Directory);
            dir = parent_dir(dir);
        }
    }

    /// Entries at the top of the tree, as a drop would deliver them
    pub fn top_level_entries(&self) -> Vec<DropEntry> {
        self.children_of("")
    }

    /// Number of directories in the tree
    pub fn directory_count(&self) -> usize {
        self.nodes
            .values()
            .filter(|node| matches!(node, MockNode::Directory))
            .count()
    }

    /// Number of readable files in the tree
    pub fn file_count(&self) -> usize {
        self.nodes
            .values()
            .filter(|node| matches!(node, MockNode::File(_)))
            .count()
    }

    /// Listing and open requests served so far
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    fn children_of(&self, dir: &str) -> Vec<DropEntry> {
        self.nodes
            .iter()
            .filter(|(path, _)| parent_dir(path) == dir)
            .map(|(path, node)| DropEntry {
                path: path.clone(),
                kind: node.kind(),
                origin: path.into(),
            })
            .collect()
    }
}

#[async_trait]
impl DropSource for MockDropSource {
    async fn read_dir(&self, dir: &DropEntry) -> Result<Vec<DropEntry>, SourceError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        match self.nodes.get(&dir.path) {
            Some(MockNode::Directory) => Ok(self.children_of(&dir.path)),
            Some(_) => Err(SourceError::Unreadable(dir.path.clone())),
            None => Err(SourceError::NotFound(dir.path.clone())),
        }
    }

    async fn open_file(&self, file: &DropEntry) -> Result<FileHandle, SourceError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        match self.nodes.get(&file.path) {
            Some(MockNode::File(bytes)) => {
                Ok(FileHandle::in_memory(&file.path, Arc::clone(bytes)))
            }
            Some(_) => Err(SourceError::Unreadable(file.path.clone())),
            None => Err(SourceError::NotFound(file.path.clone())),
        }
    }

    fn source_name(&self) -> &'static str {
        "Mock"
    }
}
