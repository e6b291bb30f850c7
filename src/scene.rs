//! Lifecycle of the displayed scene
//!
//! [`SceneController`] owns at most one [`Scene`] and swaps it out on every
//! successful load. Teardown always runs in this order:
//!
//! 1. release every texture;
//! 2. stop animation playback;
//! 3. clear the camera's follow target if it points at the scene entity;
//! 4. destroy the entity subtree;
//! 5. unregister the model asset.
//!
//! The model must outlive the entity that renders it, and nothing may still
//! point at the entity when it goes away.

use crate::animation::{AnimationAggregator, AnimationClip, AnimationError};
use crate::backend::{BackendError, CameraRig, EntityId, SceneBackend};
use crate::model::DecodedScene;
use std::sync::Arc;

/// How a decoded scene is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadMode {
    /// Replace the displayed scene
    #[default]
    Replace,
    /// Keep model and textures, only attach the decoded clips
    AnimationsOnly,
}

impl LoadMode {
    /// Mode selected by the drop's modifier key
    pub fn from_modifier(animations_only: bool) -> Self {
        if animations_only {
            LoadMode::AnimationsOnly
        } else {
            LoadMode::Replace
        }
    }
}

/// Resources of the displayed scene
#[derive(Debug)]
pub struct Scene<B: SceneBackend> {
    model: B::Asset,
    textures: Vec<B::Texture>,
    animation_clips: Vec<Arc<AnimationClip>>,
    root_entity: EntityId,
    animations: Option<AnimationAggregator>,
}

impl<B: SceneBackend> Scene<B> {
    pub fn model(&self) -> &B::Asset {
        &self.model
    }

    pub fn textures(&self) -> &[B::Texture] {
        &self.textures
    }

    /// Clips supplied by the most recent load
    pub fn animation_clips(&self) -> &[Arc<AnimationClip>] {
        &self.animation_clips
    }

    pub fn root_entity(&self) -> EntityId {
        self.root_entity
    }

    pub fn animations(&self) -> Option<&AnimationAggregator> {
        self.animations.as_ref()
    }
}

/// Whether a scene is displayed
#[derive(Debug)]
pub enum SceneState<B: SceneBackend> {
    Empty,
    Loaded(Scene<B>),
}

impl<B: SceneBackend> Default for SceneState<B> {
    fn default() -> Self {
        SceneState::Empty
    }
}

/// Owns the displayed scene and its resources
///
/// Calls must be made sequentially from one owner; the controller has no
/// internal locking.
#[derive(Debug)]
pub struct SceneController<B: SceneBackend, C: CameraRig> {
    backend: B,
    camera: C,
    entity_name: String,
    autoplay: bool,
    state: SceneState<B>,
}

impl<B: SceneBackend, C: CameraRig> SceneController<B, C> {
    pub fn new(backend: B, camera: C) -> Self {
        Self {
            backend,
            camera,
            entity_name: "gltf".to_string(),
            autoplay: true,
            state: SceneState::Empty,
        }
    }

    /// Name given to the entity created for each scene
    pub fn with_entity_name(mut self, name: impl Into<String>) -> Self {
        self.entity_name = name.into();
        self
    }

    /// Whether the first attached clip starts playing
    pub fn with_autoplay(mut self, autoplay: bool) -> Self {
        self.autoplay = autoplay;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn camera(&self) -> &C {
        &self.camera
    }

    pub fn state(&self) -> &SceneState<B> {
        &self.state
    }

    pub fn scene(&self) -> Option<&Scene<B>> {
        match &self.state {
            SceneState::Loaded(scene) => Some(scene),
            SceneState::Empty => None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self.state, SceneState::Loaded(_))
    }

    /// Tear down the displayed scene; a no-op when nothing is displayed
    pub fn destroy(&mut self) {
        let SceneState::Loaded(mut scene) = std::mem::take(&mut self.state) else {
            return;
        };
        log::debug!(
            "Destroying scene {} ({} textures)",
            scene.root_entity,
            scene.textures.len()
        );

        for texture in scene.textures.drain(..) {
            self.backend.release_texture(texture);
        }

        if let Some(animations) = scene.animations.as_mut() {
            if animations.stop_clip().is_some() {
                self.backend.stop_clip(scene.root_entity);
            }
        }

        if self.camera.focus() == Some(scene.root_entity) {
            self.camera.set_focus(None);
        }

        self.backend.destroy_entity(scene.root_entity);
        self.backend.unregister_model(scene.model);
    }

    /// Display a decoded scene
    ///
    /// In [`LoadMode::Replace`] the current scene is destroyed first. In
    /// [`LoadMode::AnimationsOnly`] the displayed entity, model and textures
    /// are kept and only the clips are attached; with nothing displayed this
    /// falls back to a full load.
    pub fn initialize(
        &mut self,
        decoded: DecodedScene,
        mode: LoadMode,
    ) -> Result<(), BackendError> {
        let DecodedScene {
            model,
            textures,
            animation_clips,
        } = decoded;

        if mode == LoadMode::AnimationsOnly {
            if let SceneState::Loaded(scene) = &mut self.state {
                log::debug!(
                    "Attaching {} clips to {}",
                    animation_clips.len(),
                    scene.root_entity
                );
                attach_clips(&mut self.backend, scene, animation_clips, self.autoplay);
                self.camera.set_focus(Some(scene.root_entity));
                return Ok(());
            }
            log::warn!("No scene is displayed; loading {} in full", model.name);
        }

        self.destroy();

        let model_name = model.name.clone();
        let asset = self.backend.register_model(Arc::new(model))?;
        let root_entity = match self.backend.create_entity(&self.entity_name, &asset) {
            Ok(entity) => entity,
            Err(err) => {
                self.backend.unregister_model(asset);
                return Err(err);
            }
        };

        let mut created = Vec::with_capacity(textures.len());
        for source in &textures {
            match self.backend.create_texture(source) {
                Ok(texture) => created.push(texture),
                Err(err) => log::warn!("Skipping texture {}: {err}", source.label()),
            }
        }

        let mut scene = Scene {
            model: asset,
            textures: created,
            animation_clips: Vec::new(),
            root_entity,
            animations: None,
        };
        attach_clips(&mut self.backend, &mut scene, animation_clips, self.autoplay);

        log::debug!(
            "Loaded {model_name} as {root_entity} with {} textures",
            scene.textures.len()
        );
        self.camera.set_focus(Some(root_entity));
        self.state = SceneState::Loaded(scene);
        Ok(())
    }

    /// Switch playback to another attached clip
    pub fn play_clip(&mut self, name: &str) -> Result<(), AnimationError> {
        let SceneState::Loaded(scene) = &mut self.state else {
            return Err(AnimationError::NoClips);
        };
        let animations = scene.animations.as_mut().ok_or(AnimationError::NoClips)?;
        let was_playing = animations.playing().is_some();
        let clip = animations.play_clip(name)?;
        if was_playing {
            self.backend.stop_clip(scene.root_entity);
        }
        self.backend.play_clip(scene.root_entity, &clip);
        Ok(())
    }

    /// Halt playback on the displayed scene
    pub fn stop_clip(&mut self) {
        if let SceneState::Loaded(scene) = &mut self.state {
            if let Some(animations) = scene.animations.as_mut() {
                if animations.stop_clip().is_some() {
                    self.backend.stop_clip(scene.root_entity);
                }
            }
        }
    }
}

/// Bind `clips` to the scene's hierarchy, register them and play the first
fn attach_clips<B: SceneBackend>(
    backend: &mut B,
    scene: &mut Scene<B>,
    clips: Vec<AnimationClip>,
    autoplay: bool,
) {
    if clips.is_empty() {
        return;
    }
    let root = scene.root_entity;
    let animations = scene
        .animations
        .get_or_insert_with(AnimationAggregator::new);

    let mut attached = Vec::with_capacity(clips.len());
    for mut clip in clips {
        let bound = clip.bind(|path| backend.find_entity(root, path));
        log::debug!(
            "Clip {} bound {bound}/{} channels",
            clip.name,
            clip.channels.len()
        );
        let clip = Arc::new(clip);
        animations.add_clip(Arc::clone(&clip));
        attached.push(clip);
    }

    let first = attached[0].name.clone();
    scene.animation_clips = attached;
    if !autoplay {
        return;
    }

    if animations.playing().is_some() {
        backend.stop_clip(root);
    }
    match animations.play_clip(&first) {
        Ok(clip) => backend.play_clip(root, &clip),
        Err(err) => log::warn!("Could not start clip {first}: {err}"),
    }
}
