//! Mock backend and camera for testing
//!
//! Records every collaborator call in order and tracks live resources, so
//! tests can check release counts and teardown ordering without a renderer.
//! Clones share state: keep a clone as a probe after handing one to the
//! controller.

use super::{BackendError, BackendResult, CameraRig, EntityId, SceneBackend};
use crate::animation::AnimationClip;
use crate::model::SceneModel;
use crate::texture::TextureSource;
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// A recorded collaborator call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    CreateTexture(u64),
    ReleaseTexture(u64),
    RegisterModel(u64),
    UnregisterModel(u64),
    CreateEntity(EntityId),
    DestroyEntity(EntityId),
    PlayClip(EntityId, String),
    StopClip(EntityId),
    SetFocus(Option<EntityId>),
}

/// Failure to inject into the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockFailure {
    /// Fail creating the texture with this label
    Texture(String),
    ModelRegistration,
    EntityCreation,
}

/// Mock texture resource
#[derive(Debug)]
pub struct MockTexture {
    pub id: u64,
    pub label: String,
    pub mime: String,
    pub len: usize,
}

/// Mock registered model asset
#[derive(Debug)]
pub struct MockAsset {
    pub id: u64,
    pub model: Arc<SceneModel>,
}

#[derive(Debug)]
struct MockEntity {
    name: String,
    children: Vec<EntityId>,
}

#[derive(Debug, Default)]
struct MockState {
    next_id: u64,
    calls: Vec<MockCall>,
    live_textures: BTreeSet<u64>,
    live_assets: BTreeSet<u64>,
    release_counts: HashMap<u64, usize>,
    entities: HashMap<EntityId, MockEntity>,
    playing: HashMap<EntityId, String>,
    focus: Option<EntityId>,
    failures: Vec<MockFailure>,
}

impl MockState {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn spawn_entity(&mut self, name: String) -> EntityId {
        let id = EntityId(self.next_id());
        self.entities.insert(
            id,
            MockEntity {
                name,
                children: Vec::new(),
            },
        );
        id
    }

    fn spawn_node(
        &mut self,
        model: &SceneModel,
        node: usize,
        parent: EntityId,
        visited: &mut BTreeSet<usize>,
    ) {
        if node >= model.nodes.len() || !visited.insert(node) {
            return;
        }
        let entity = self.spawn_entity(model.nodes[node].label(node));
        if let Some(parent) = self.entities.get_mut(&parent) {
            parent.children.push(entity);
        }
        for &child in &model.nodes[node].children {
            self.spawn_node(model, child, entity, visited);
        }
    }

    fn remove_subtree(&mut self, entity: EntityId) {
        if let Some(removed) = self.entities.remove(&entity) {
            self.playing.remove(&entity);
            for child in removed.children {
                self.remove_subtree(child);
            }
        }
    }

    fn record_release(&mut self, id: u64) {
        *self.release_counts.entry(id).or_insert(0) += 1;
    }
}

/// Mock scene backend
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Camera sharing this backend's call log
    pub fn camera(&self) -> MockCamera {
        MockCamera {
            state: Arc::clone(&self.state),
        }
    }

    /// Make subsequent matching operations fail
    pub fn fail_on(&self, failure: MockFailure) {
        self.state.lock().failures.push(failure);
    }

    pub fn clear_failures(&self) {
        self.state.lock().failures.clear();
    }

    /// Every call recorded so far, in order
    pub fn calls(&self) -> Vec<MockCall> {
        self.state.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    /// Index of the first occurrence of `call` in the log
    pub fn position(&self, call: &MockCall) -> Option<usize> {
        self.state.lock().calls.iter().position(|c| c == call)
    }

    /// How many times the resource with `id` was released
    pub fn release_count(&self, id: u64) -> usize {
        self.state
            .lock()
            .release_counts
            .get(&id)
            .copied()
            .unwrap_or(0)
    }

    pub fn live_texture_count(&self) -> usize {
        self.state.lock().live_textures.len()
    }

    pub fn live_asset_count(&self) -> usize {
        self.state.lock().live_assets.len()
    }

    pub fn live_entity_count(&self) -> usize {
        self.state.lock().entities.len()
    }

    /// Clip playing on `entity`, if any
    pub fn playing_on(&self, entity: EntityId) -> Option<String> {
        self.state.lock().playing.get(&entity).cloned()
    }

    pub fn entity_name(&self, entity: EntityId) -> Option<String> {
        self.state
            .lock()
            .entities
            .get(&entity)
            .map(|e| e.name.clone())
    }
}

impl SceneBackend for MockBackend {
    type Texture = MockTexture;
    type Asset = MockAsset;

    fn create_texture(&mut self, source: &TextureSource) -> BackendResult<Self::Texture> {
        let label = source.label();
        let mut state = self.state.lock();
        if state.failures.contains(&MockFailure::Texture(label.clone())) {
            return Err(BackendError::TextureCreationFailed(label));
        }
        let id = state.next_id();
        state.live_textures.insert(id);
        state.calls.push(MockCall::CreateTexture(id));
        Ok(MockTexture {
            id,
            label,
            mime: source.mime_type().to_string(),
            len: source.bytes().len(),
        })
    }

    fn release_texture(&mut self, texture: Self::Texture) {
        let mut state = self.state.lock();
        state.live_textures.remove(&texture.id);
        state.record_release(texture.id);
        state.calls.push(MockCall::ReleaseTexture(texture.id));
    }

    fn register_model(&mut self, model: Arc<SceneModel>) -> BackendResult<Self::Asset> {
        let mut state = self.state.lock();
        if state.failures.contains(&MockFailure::ModelRegistration) {
            return Err(BackendError::ModelRegistrationFailed(model.name.clone()));
        }
        let id = state.next_id();
        state.live_assets.insert(id);
        state.calls.push(MockCall::RegisterModel(id));
        Ok(MockAsset { id, model })
    }

    fn unregister_model(&mut self, asset: Self::Asset) {
        let mut state = self.state.lock();
        state.live_assets.remove(&asset.id);
        state.record_release(asset.id);
        state.calls.push(MockCall::UnregisterModel(asset.id));
    }

    fn create_entity(&mut self, name: &str, asset: &Self::Asset) -> BackendResult<EntityId> {
        let mut state = self.state.lock();
        if state.failures.contains(&MockFailure::EntityCreation) {
            return Err(BackendError::EntityCreationFailed(name.to_string()));
        }
        let root = state.spawn_entity(name.to_string());
        let mut visited = BTreeSet::new();
        for &node in &asset.model.roots {
            state.spawn_node(&asset.model, node, root, &mut visited);
        }
        state.calls.push(MockCall::CreateEntity(root));
        Ok(root)
    }

    fn destroy_entity(&mut self, entity: EntityId) {
        let mut state = self.state.lock();
        state.remove_subtree(entity);
        state.calls.push(MockCall::DestroyEntity(entity));
    }

    fn find_entity(&self, root: EntityId, path: &str) -> Option<EntityId> {
        let state = self.state.lock();
        let mut current = root;
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            let entity = state.entities.get(&current)?;
            current = entity
                .children
                .iter()
                .copied()
                .find(|child| {
                    state
                        .entities
                        .get(child)
                        .is_some_and(|e| e.name == segment)
                })?;
        }
        Some(current)
    }

    fn play_clip(&mut self, entity: EntityId, clip: &AnimationClip) {
        let mut state = self.state.lock();
        state.playing.insert(entity, clip.name.clone());
        state
            .calls
            .push(MockCall::PlayClip(entity, clip.name.clone()));
    }

    fn stop_clip(&mut self, entity: EntityId) {
        let mut state = self.state.lock();
        state.playing.remove(&entity);
        state.calls.push(MockCall::StopClip(entity));
    }

    fn backend_name(&self) -> &'static str {
        "Mock"
    }
}

/// Mock camera whose focus changes land in the backend's call log
#[derive(Debug, Clone)]
pub struct MockCamera {
    state: Arc<Mutex<MockState>>,
}

impl Default for MockCamera {
    fn default() -> Self {
        MockBackend::new().camera()
    }
}

impl CameraRig for MockCamera {
    fn focus(&self) -> Option<EntityId> {
        self.state.lock().focus
    }

    fn set_focus(&mut self, target: Option<EntityId>) {
        let mut state = self.state.lock();
        state.focus = target;
        state.calls.push(MockCall::SetFocus(target));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{SceneNode, Transform};
    use crate::texture::TextureData;

    fn two_level_model() -> Arc<SceneModel> {
        let node = |name: &str, children: Vec<usize>| SceneNode {
            name: Some(name.to_string()),
            transform: Transform::default(),
            mesh: None,
            children,
        };
        Arc::new(SceneModel {
            name: "scene.gltf".to_string(),
            nodes: vec![node("Root", vec![1]), node("Arm", vec![])],
            roots: vec![0],
            ..Default::default()
        })
    }

    fn texture_source(name: &str) -> TextureSource {
        TextureSource {
            index: 0,
            name: Some(name.to_string()),
            data: TextureData::Embedded {
                mime: "image/png".to_string(),
                bytes: Arc::from(vec![0u8; 4]),
            },
        }
    }

    #[test]
    fn test_entity_hierarchy_mirrors_model() {
        let mut backend = MockBackend::new();
        let asset = backend.register_model(two_level_model()).unwrap();
        let root = backend.create_entity("gltf", &asset).unwrap();

        assert_eq!(backend.live_entity_count(), 3);
        let arm = backend.find_entity(root, "Root/Arm").unwrap();
        assert_eq!(backend.entity_name(arm).as_deref(), Some("Arm"));
        assert_eq!(backend.find_entity(root, ""), Some(root));
        assert!(backend.find_entity(root, "Root/Leg").is_none());

        backend.destroy_entity(root);
        assert_eq!(backend.live_entity_count(), 0);
    }

    #[test]
    fn test_release_counts() {
        let mut backend = MockBackend::new();
        let texture = backend.create_texture(&texture_source("albedo")).unwrap();
        let id = texture.id;

        assert_eq!(backend.live_texture_count(), 1);
        backend.release_texture(texture);

        assert_eq!(backend.live_texture_count(), 0);
        assert_eq!(backend.release_count(id), 1);
    }

    #[test]
    fn test_injected_failures() {
        let mut backend = MockBackend::new();
        backend.fail_on(MockFailure::Texture("bad".to_string()));
        backend.fail_on(MockFailure::ModelRegistration);

        assert!(backend.create_texture(&texture_source("bad")).is_err());
        assert!(backend.create_texture(&texture_source("good")).is_ok());
        assert!(backend.register_model(two_level_model()).is_err());

        backend.clear_failures();
        assert!(backend.register_model(two_level_model()).is_ok());
    }

    #[test]
    fn test_camera_shares_call_log() {
        let backend = MockBackend::new();
        let mut camera = backend.camera();

        camera.set_focus(Some(EntityId(4)));

        assert_eq!(camera.focus(), Some(EntityId(4)));
        assert_eq!(backend.calls(), vec![MockCall::SetFocus(Some(EntityId(4)))]);
    }
}
