//! Resolution of URIs referenced by a scene file against the dropped files

use crate::files::{join_path, FileHandle, FileMap};
use crate::metrics::LoadMetricsHandle;
use crate::texture::ResourceLocator;
use async_trait::async_trait;
use percent_encoding::percent_decode_str;
use std::fmt::Debug;
use std::sync::Arc;

/// Callback a decoder uses to fetch externally referenced files
///
/// A reference that cannot be resolved yields `None`; the decoder records it
/// as missing and carries on. Calls may run concurrently.
#[async_trait]
pub trait UriResolver: Send + Sync + Debug {
    /// Bytes of a referenced binary buffer
    async fn resolve_buffer(&self, uri: &str) -> Option<Arc<[u8]>>;

    /// Transient locator for a referenced image
    async fn resolve_image(&self, uri: &str) -> Option<ResourceLocator>;
}

/// Resolves references against the [`FileMap`] of one drop
///
/// A URI is looked up relative to the scene file's directory first, then by
/// suffix anywhere in the drop.
#[derive(Debug, Clone)]
pub struct FileMapResolver {
    files: Arc<FileMap>,
    base_dir: String,
    metrics: LoadMetricsHandle,
}

impl FileMapResolver {
    pub fn new(files: Arc<FileMap>, base_dir: &str) -> Self {
        Self {
            files,
            base_dir: base_dir.to_string(),
            metrics: LoadMetricsHandle::new(),
        }
    }

    pub fn with_metrics(mut self, metrics: LoadMetricsHandle) -> Self {
        self.metrics = metrics;
        self
    }

    /// Find the dropped file a URI refers to
    pub fn lookup(&self, uri: &str) -> Option<&FileHandle> {
        let decoded = percent_decode_str(uri).decode_utf8_lossy();
        let relative = join_path(&self.base_dir, &decoded);
        let found = self
            .files
            .get(&relative)
            .or_else(|| self.files.find_by_suffix(&decoded));

        self.metrics.record_resolution(found.is_some());
        match found {
            Some(handle) => log::debug!("Resolved {uri} to {}", handle.path()),
            None => log::warn!("No dropped file matches {uri}"),
        }
        found
    }

    async fn read(&self, uri: &str) -> Option<(&FileHandle, Arc<[u8]>)> {
        let handle = self.lookup(uri)?;
        match handle.read().await {
            Ok(bytes) => Some((handle, bytes)),
            Err(err) => {
                log::warn!("Failed to read {}: {err}", handle.path());
                None
            }
        }
    }
}

#[async_trait]
impl UriResolver for FileMapResolver {
    async fn resolve_buffer(&self, uri: &str) -> Option<Arc<[u8]>> {
        self.read(uri).await.map(|(_, bytes)| bytes)
    }

    async fn resolve_image(&self, uri: &str) -> Option<ResourceLocator> {
        self.read(uri)
            .await
            .map(|(handle, bytes)| ResourceLocator::from_bytes(handle.path(), bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    fn files(entries: &[(&str, &str)]) -> Arc<FileMap> {
        Arc::new(
            entries
                .iter()
                .map(|(path, text)| FileHandle::in_memory(path, text.as_bytes().to_vec()))
                .collect(),
        )
    }

    #[test]
    fn test_suffix_match_returns_nested_file() {
        let files = files(&[("a/b/tex.png", "H1")]);
        let resolver = FileMapResolver::new(Arc::clone(&files), "");

        let handle = resolver.lookup("tex.png").unwrap();
        assert!(handle.same_file(files.get("a/b/tex.png").unwrap()));
    }

    #[test]
    fn test_relative_lookup_wins_over_suffix() {
        let files = files(&[
            ("tex.png", "top"),
            ("models/robot/tex.png", "robot"),
        ]);
        let resolver = FileMapResolver::new(files, "models/robot");

        let bytes = block_on(resolver.resolve_buffer("tex.png")).unwrap();
        assert_eq!(&*bytes, b"robot");
    }

    #[test]
    fn test_parent_relative_and_percent_encoded_uris() {
        let files = files(&[("scenes/textures/my tex.png", "x")]);
        let resolver = FileMapResolver::new(files, "scenes/robot");

        assert!(resolver.lookup("../textures/my%20tex.png").is_some());
        assert!(resolver.lookup(".\\textures\\my%20tex.png").is_some());
    }

    #[test]
    fn test_missing_reference() {
        let metrics = LoadMetricsHandle::new();
        let resolver =
            FileMapResolver::new(files(&[("a/scene.bin", "")]), "a").with_metrics(metrics.clone());

        assert!(block_on(resolver.resolve_buffer("other.bin")).is_none());
        assert!(block_on(resolver.resolve_buffer("scene.bin")).is_some());
        assert_eq!(metrics.resolver_misses(), 1);
        assert_eq!(metrics.resolver_hits(), 1);
    }

    #[test]
    fn test_resolve_image_gives_locator() {
        let resolver = FileMapResolver::new(files(&[("img/albedo.jpg", "jpeg?")]), "");

        let locator = block_on(resolver.resolve_image("albedo.jpg")).unwrap();
        assert_eq!(locator.source_path(), "img/albedo.jpg");
        assert_eq!(locator.mime_type(), "image/jpeg");
        assert_eq!(&**locator.bytes(), b"jpeg?");
    }
}
