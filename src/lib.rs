//! drop_viewer - Drop-driven glTF scene viewer core
//!
//! # Features
//! - Fan-in collection of nested drops into a flat file map
//! - Decoding of `.glb` containers and `.gltf` documents with their
//!   referenced buffers and images resolved from the same drop
//! - Strictly ordered scene teardown through a backend trait
//! - Animation clips rebound onto the displayed entity hierarchy
//! - Async runtime abstraction (Tokio, custom event loops, mocks)
//!
//! # Quick Start
//!
//! ```ignore
//! use drop_viewer::{DropEvent, FsDropSource, GltfDecoder, MockBackend, TokioSpawner, Viewer};
//!
//! let source = FsDropSource::new();
//! let entries = source.entries_for(dropped_paths);
//! let backend = MockBackend::new();
//! let mut viewer = Viewer::new(
//!     ViewerConfig::default(),
//!     TokioSpawner::new(),
//!     Arc::new(source),
//!     Arc::new(GltfDecoder::new()),
//!     backend.clone(),
//!     backend.camera(),
//! );
//! let report = viewer.load_drop(DropEvent::new(entries)).await?;
//! ```
//!
//! # Feature Flags
//!
//! - `runtime-tokio` (default): Tokio spawner and async file reads

// Core modules
pub mod backend;
pub mod files;
pub mod loader;
pub mod runtime;
pub mod scene;
pub mod viewer;

// Support modules
pub mod animation;
pub mod async_loading;
pub mod config;
pub mod generation;
pub mod metrics;
pub mod model;
pub mod texture;

// Error types
mod error;
pub use error::{Result, ViewerError};

// Re-export file collection types
pub use files::collector::{FileTreeCollector, TraversalSnapshot, TraversalStats};
pub use files::fs::FsDropSource;
pub use files::mock::MockDropSource;
pub use files::{DropEntry, DropSource, EntryKind, FileHandle, FileMap, SourceError};

// Re-export loader types
pub use loader::{
    DecodeError, FileMapResolver, GltfDecoder, LoadOutcome, SceneDecoder, SceneLoader,
    UriResolver,
};

// Re-export backend types
pub use backend::{
    BackendError, BackendResult, CameraRig, EntityId, MockBackend, MockCamera, SceneBackend,
};

// Re-export runtime types
pub use runtime::mock::{MockSpawnBehavior, MockSpawner};
#[cfg(feature = "runtime-tokio")]
pub use runtime::tokio_impl::TokioSpawner;
pub use runtime::AsyncSpawner;

// Re-export scene and viewer types
pub use animation::{AnimationAggregator, AnimationClip, AnimationError};
pub use async_loading::{DropHandle, DropState};
pub use config::{SceneFormat, ViewerConfig};
pub use generation::Generation;
pub use metrics::{LoadMetrics, LoadMetricsHandle};
pub use model::{DecodedScene, SceneModel, SceneNode, Transform};
pub use scene::{LoadMode, Scene, SceneController, SceneState};
pub use texture::{ResourceLocator, TextureData, TextureSource};
pub use viewer::{DropEvent, DropReport, DropResult, DropTask, Viewer};

// Version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
