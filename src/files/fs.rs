//! File-system drop source
//!
//! Maps OS paths, as delivered by a window's drop event, onto drop entries.

use super::{DropEntry, DropSource, EntryKind, FileHandle, SourceError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Drop source backed by the local file system
#[derive(Debug, Clone, Copy, Default)]
pub struct FsDropSource;

impl FsDropSource {
    pub fn new() -> Self {
        Self
    }

    /// Build top-level drop entries from dropped OS paths
    ///
    /// Each entry is named after the last component of its path. Paths whose
    /// metadata cannot be read are skipped.
    pub fn entries_for<I, P>(&self, paths: I) -> Vec<DropEntry>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        paths
            .into_iter()
            .filter_map(|path| {
                let path = path.as_ref();
                match top_level_entry(path) {
                    Ok(entry) => Some(entry),
                    Err(err) => {
                        log::warn!("Skipping dropped path {}: {err}", path.display());
                        None
                    }
                }
            })
            .collect()
    }
}

fn top_level_entry(path: &Path) -> Result<DropEntry, SourceError> {
    let metadata = std::fs::metadata(path)?;
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| SourceError::NotFound(path.display().to_string()))?;
    let entry = if metadata.is_dir() {
        DropEntry::directory(&name)
    } else {
        DropEntry::file(&name)
    };
    Ok(entry.with_origin(path))
}

/// One directory listing item with its own (unfollowed) file type
struct Listed {
    name: String,
    location: PathBuf,
    file_type: std::fs::FileType,
}

async fn list_dir(dir: &DropEntry) -> Result<Vec<Listed>, SourceError> {
    #[cfg(feature = "runtime-tokio")]
    {
        if tokio::runtime::Handle::try_current().is_ok() {
            let mut listed = Vec::new();
            let mut items = tokio::fs::read_dir(&dir.origin).await?;
            loop {
                let item = match items.next_entry().await {
                    Ok(Some(item)) => item,
                    Ok(None) => break,
                    Err(err) => {
                        log::warn!("Listing of {} stopped early: {err}", dir.path);
                        break;
                    }
                };
                match item.file_type().await {
                    Ok(file_type) => listed.push(Listed {
                        name: item.file_name().to_string_lossy().into_owned(),
                        location: item.path(),
                        file_type,
                    }),
                    Err(err) => log::warn!("Skipping {}: {err}", item.path().display()),
                }
            }
            return Ok(listed);
        }
    }

    let mut listed = Vec::new();
    for item in std::fs::read_dir(&dir.origin)? {
        let item = match item {
            Ok(item) => item,
            Err(err) => {
                log::warn!("Skipping unreadable entry in {}: {err}", dir.path);
                continue;
            }
        };
        match item.file_type() {
            Ok(file_type) => listed.push(Listed {
                name: item.file_name().to_string_lossy().into_owned(),
                location: item.path(),
                file_type,
            }),
            Err(err) => log::warn!("Skipping {}: {err}", item.path().display()),
        }
    }
    Ok(listed)
}

/// Metadata of `path`, following symlinks
async fn metadata(path: &Path) -> std::io::Result<std::fs::Metadata> {
    #[cfg(feature = "runtime-tokio")]
    {
        if tokio::runtime::Handle::try_current().is_ok() {
            return tokio::fs::metadata(path).await;
        }
    }
    std::fs::metadata(path)
}

#[async_trait]
impl DropSource for FsDropSource {
    /// List a directory
    ///
    /// Symlinks to files are kept. Symlinks to directories are not walked, so
    /// a link back to an ancestor cannot make the traversal loop.
    async fn read_dir(&self, dir: &DropEntry) -> Result<Vec<DropEntry>, SourceError> {
        let mut children = Vec::new();
        for item in list_dir(dir).await? {
            let kind = if item.file_type.is_dir() {
                EntryKind::Directory
            } else if item.file_type.is_symlink() {
                match metadata(&item.location).await {
                    Ok(target) if target.is_dir() => {
                        log::debug!(
                            "Not following linked directory {}",
                            item.location.display()
                        );
                        continue;
                    }
                    Ok(_) => EntryKind::File,
                    Err(err) => {
                        log::warn!(
                            "Skipping dangling link {}: {err}",
                            item.location.display()
                        );
                        continue;
                    }
                }
            } else {
                EntryKind::File
            };
            children.push(dir.child(&item.name, kind, item.location));
        }
        Ok(children)
    }

    async fn open_file(&self, file: &DropEntry) -> Result<FileHandle, SourceError> {
        let target = metadata(&file.origin).await?;
        if target.is_dir() {
            return Err(SourceError::Unreadable(file.path.clone()));
        }
        Ok(FileHandle::on_disk(&file.path, &file.origin, target.len()))
    }

    fn source_name(&self) -> &'static str {
        "FileSystem"
    }
}
