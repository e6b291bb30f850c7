//! Collaborator traits for the rendering engine and the camera
//!
//! The scene controller never talks to a renderer directly. It goes through
//! [`SceneBackend`] for textures, model assets, entities and clip playback,
//! and through [`CameraRig`] for the camera's follow target.

pub mod mock;

use crate::animation::AnimationClip;
use crate::model::SceneModel;
use crate::texture::TextureSource;
use std::fmt::{self, Debug};
use std::sync::Arc;
use thiserror::Error;

/// Error type for backend operations
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Texture creation failed: {0}")]
    TextureCreationFailed(String),

    #[error("Model registration failed: {0}")]
    ModelRegistrationFailed(String),

    #[error("Entity creation failed: {0}")]
    EntityCreationFailed(String),

    #[error("Device lost")]
    DeviceLost,
}

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Identifier of an entity in the backend's scene graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entity#{}", self.0)
    }
}

/// Scene-graph and resource collaborator
///
/// Texture and asset handles are moved into their release calls, so the
/// controller cannot hand the same handle back twice.
///
/// # Example
/// ```ignore
/// let mut backend = MockBackend::new();
/// let asset = backend.register_model(Arc::new(model))?;
/// let entity = backend.create_entity("gltf", &asset)?;
/// backend.destroy_entity(entity);
/// backend.unregister_model(asset);
/// ```
pub trait SceneBackend: Debug {
    /// Texture resource type for this backend
    type Texture: Debug;

    /// Registered model asset type for this backend
    type Asset: Debug;

    /// Create a texture from a decoded image source
    fn create_texture(&mut self, source: &TextureSource) -> BackendResult<Self::Texture>;

    /// Release a texture resource
    fn release_texture(&mut self, texture: Self::Texture);

    /// Register an already-decoded model as a resident asset
    fn register_model(&mut self, model: Arc<SceneModel>) -> BackendResult<Self::Asset>;

    /// Remove a model asset from the registry and free it
    fn unregister_model(&mut self, asset: Self::Asset);

    /// Create an entity, attached to the scene root, rendering `asset`
    ///
    /// The entity's subtree mirrors the model's node hierarchy.
    fn create_entity(&mut self, name: &str, asset: &Self::Asset) -> BackendResult<EntityId>;

    /// Destroy an entity and its whole subtree
    fn destroy_entity(&mut self, entity: EntityId);

    /// Find the entity at a label path below `root`
    fn find_entity(&self, root: EntityId, path: &str) -> Option<EntityId>;

    /// Start playing a bound clip on `entity`
    fn play_clip(&mut self, entity: EntityId, clip: &AnimationClip);

    /// Stop any clip playing on `entity`
    fn stop_clip(&mut self, entity: EntityId);

    /// Get the name of this backend (for debugging)
    fn backend_name(&self) -> &'static str;
}

/// Camera collaborator with a follow/focus target
pub trait CameraRig: Debug {
    fn focus(&self) -> Option<EntityId>;

    fn set_focus(&mut self, target: Option<EntityId>);
}

pub use mock::{MockBackend, MockCall, MockCamera, MockFailure};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_id_display() {
        assert_eq!(EntityId(3).to_string(), "entity#3");
    }

    #[test]
    fn test_backend_error_messages() {
        let err = BackendError::TextureCreationFailed("tex.png".to_string());
        assert_eq!(err.to_string(), "Texture creation failed: tex.png");
    }
}
