//! Error types for drop_viewer

use thiserror::Error;

/// Main error type for viewer operations
#[derive(Error, Debug)]
pub enum ViewerError {
    #[error("Source error: {0}")]
    Source(#[from] crate::files::SourceError),

    #[error("Decode error: {0}")]
    Decode(#[from] crate::loader::DecodeError),

    #[error("Backend error: {0}")]
    Backend(#[from] crate::backend::BackendError),

    #[error("Animation error: {0}")]
    Animation(#[from] crate::animation::AnimationError),

    #[error("Drop {0} was superseded by a newer drop")]
    Superseded(crate::generation::Generation),

    #[error("No scene file in drop")]
    NoSceneFile,
}

/// Result type alias for viewer operations
pub type Result<T> = std::result::Result<T, ViewerError>;
