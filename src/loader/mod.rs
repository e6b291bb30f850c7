//! Scene loading: decoder trait, reference resolution and the orchestrator
//!
//! [`SceneLoader`] picks the scene files out of a drop's [`FileMap`] and
//! hands each one to a [`SceneDecoder`]: binary containers straight from
//! their bytes, JSON documents together with a [`FileMapResolver`] for the
//! files they reference.

pub mod gltf;
pub mod resolver;

pub use self::gltf::GltfDecoder;
pub use resolver::{FileMapResolver, UriResolver};

use crate::config::{SceneFormat, ViewerConfig};
use crate::files::{parent_dir, FileHandle, FileMap, SourceError};
use crate::metrics::LoadMetricsHandle;
use crate::model::DecodedScene;
use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

/// Error type for scene decoding
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("GLTF error: {0}")]
    Gltf(#[from] ::gltf::Error),

    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error(transparent)]
    Custom(#[from] anyhow::Error),
}

/// Format decoder producing a [`DecodedScene`]
///
/// Uses async-trait so the loader can hold an `Arc<dyn SceneDecoder>`.
#[async_trait]
pub trait SceneDecoder: Send + Sync + Debug {
    /// Decode a self-contained binary scene
    async fn decode_binary(
        &self,
        name: &str,
        bytes: Arc<[u8]>,
    ) -> Result<DecodedScene, DecodeError>;

    /// Decode a parsed JSON scene, fetching referenced files through `resolver`
    async fn decode_json(
        &self,
        name: &str,
        root: ::gltf::json::Root,
        resolver: &dyn UriResolver,
    ) -> Result<DecodedScene, DecodeError>;

    /// Get the name of this decoder (for debugging)
    fn decoder_name(&self) -> &'static str;
}

/// Result of decoding one scene file
#[derive(Debug)]
pub struct LoadOutcome {
    pub path: String,
    pub format: SceneFormat,
    pub result: Result<DecodedScene, DecodeError>,
}

impl LoadOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Decodes every scene file of a drop
#[derive(Debug, Clone)]
pub struct SceneLoader {
    decoder: Arc<dyn SceneDecoder>,
    config: ViewerConfig,
    metrics: LoadMetricsHandle,
}

impl SceneLoader {
    pub fn new(decoder: Arc<dyn SceneDecoder>, config: ViewerConfig) -> Self {
        Self {
            decoder,
            config,
            metrics: LoadMetricsHandle::new(),
        }
    }

    pub fn with_metrics(mut self, metrics: LoadMetricsHandle) -> Self {
        self.metrics = metrics;
        self
    }

    /// Scene files of the drop with their formats, in path order
    pub fn scene_files<'a>(&self, files: &'a FileMap) -> Vec<(&'a FileHandle, SceneFormat)> {
        files
            .iter()
            .filter_map(|(path, handle)| {
                self.config
                    .scene_format(path)
                    .map(|format| (handle, format))
            })
            .collect()
    }

    /// Decode every scene file in the drop
    ///
    /// Files are decoded concurrently; outcomes come back in path order, one
    /// per scene file. A failure in one file does not affect the others.
    pub async fn load_all(&self, files: Arc<FileMap>) -> Vec<LoadOutcome> {
        let scenes = self.scene_files(&files);
        if scenes.is_empty() {
            log::warn!("Drop of {} files contains no scene file", files.len());
        }

        futures::future::join_all(scenes.into_iter().map(|(handle, format)| {
            let files = Arc::clone(&files);
            async move {
                let result = self.load_one(handle, format, files).await;
                if let Err(err) = &result {
                    log::error!("Failed to load {}: {err}", handle.path());
                }
                LoadOutcome {
                    path: handle.path().to_string(),
                    format,
                    result,
                }
            }
        }))
        .await
    }

    /// Decode a single scene file
    pub async fn load_one(
        &self,
        handle: &FileHandle,
        format: SceneFormat,
        files: Arc<FileMap>,
    ) -> Result<DecodedScene, DecodeError> {
        let path = handle.path();
        let bytes = handle.read().await?;
        let start = Instant::now();

        let decoded = match format {
            SceneFormat::Binary => self.decoder.decode_binary(path, bytes).await?,
            SceneFormat::Text => {
                let root: ::gltf::json::Root = serde_json::from_slice(&bytes)?;
                let resolver = FileMapResolver::new(files, parent_dir(path))
                    .with_metrics(self.metrics.clone());
                self.decoder.decode_json(path, root, &resolver).await?
            }
        };

        let elapsed = start.elapsed();
        log::debug!(
            "{} decoded {path} in {elapsed:?}",
            self.decoder.decoder_name()
        );
        self.metrics.record_decode_time(path.to_string(), elapsed);
        Ok(decoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SceneModel;
    use futures::executor::block_on;
    use parking_lot::Mutex;

    /// Decoder that records what it was asked to decode
    #[derive(Debug, Default)]
    struct RecordingDecoder {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl SceneDecoder for RecordingDecoder {
        async fn decode_binary(
            &self,
            name: &str,
            bytes: Arc<[u8]>,
        ) -> Result<DecodedScene, DecodeError> {
            self.seen.lock().push(format!("bin:{name}"));
            if bytes.is_empty() {
                return Err(DecodeError::InvalidData("empty".to_string()));
            }
            Ok(DecodedScene {
                model: SceneModel {
                    name: name.to_string(),
                    ..Default::default()
                },
                ..Default::default()
            })
        }

        async fn decode_json(
            &self,
            name: &str,
            _root: ::gltf::json::Root,
            resolver: &dyn UriResolver,
        ) -> Result<DecodedScene, DecodeError> {
            let found = resolver.resolve_buffer("scene.bin").await.is_some();
            self.seen.lock().push(format!("json:{name}:{found}"));
            Ok(DecodedScene::default())
        }

        fn decoder_name(&self) -> &'static str {
            "Recording"
        }
    }

    const MINIMAL_ROOT: &str = r#"{"asset":{"version":"2.0"}}"#;

    fn drop_files() -> Arc<FileMap> {
        Arc::new(
            [
                FileHandle::in_memory("b/model.GLB", b"glb".to_vec()),
                FileHandle::in_memory("a/scene.gltf", MINIMAL_ROOT.as_bytes().to_vec()),
                FileHandle::in_memory("a/scene.bin", vec![0u8; 8]),
                FileHandle::in_memory("c/empty.glb", Vec::<u8>::new()),
                FileHandle::in_memory("readme.txt", b"hi".to_vec()),
            ]
            .into_iter()
            .collect(),
        )
    }

    #[test]
    fn test_scene_files_in_path_order() {
        let decoder = Arc::new(RecordingDecoder::default());
        let loader = SceneLoader::new(decoder, ViewerConfig::default());
        let files = drop_files();

        let scenes: Vec<_> = loader
            .scene_files(&files)
            .into_iter()
            .map(|(handle, format)| (handle.path().to_string(), format))
            .collect();

        assert_eq!(
            scenes,
            vec![
                ("a/scene.gltf".to_string(), SceneFormat::Text),
                ("b/model.GLB".to_string(), SceneFormat::Binary),
                ("c/empty.glb".to_string(), SceneFormat::Binary),
            ]
        );
    }

    #[test]
    fn test_load_all_reports_each_file() {
        let decoder = Arc::new(RecordingDecoder::default());
        let metrics = LoadMetricsHandle::new();
        let loader = SceneLoader::new(decoder.clone(), ViewerConfig::default())
            .with_metrics(metrics.clone());

        let outcomes = block_on(loader.load_all(drop_files()));

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].is_ok());
        assert!(outcomes[1].is_ok());
        assert!(matches!(
            outcomes[2].result,
            Err(DecodeError::InvalidData(_))
        ));
        assert!(decoder
            .seen
            .lock()
            .contains(&"json:a/scene.gltf:true".to_string()));
        assert!(metrics.decode_time("b/model.GLB").is_some());
        assert!(metrics.decode_time("c/empty.glb").is_none());
    }

    #[test]
    fn test_invalid_json_is_reported() {
        let loader = SceneLoader::new(Arc::new(GltfDecoder::new()), ViewerConfig::default());
        let files: Arc<FileMap> = Arc::new(
            [FileHandle::in_memory("broken.gltf", b"{ nope".to_vec())]
                .into_iter()
                .collect(),
        );

        let outcomes = block_on(loader.load_all(files));

        assert!(matches!(outcomes[0].result, Err(DecodeError::Json(_))));
    }
}
