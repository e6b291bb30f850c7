//! Animation clips and the per-scene clip aggregator

use crate::backend::EntityId;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Error type for animation playback
#[derive(Error, Debug, PartialEq, Eq)]
pub enum AnimationError {
    #[error("Unknown animation clip: {0}")]
    UnknownClip(String),

    #[error("No clips are attached to the scene")]
    NoClips,
}

/// Animated property of a channel target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelProperty {
    Translation,
    Rotation,
    Scale,
    MorphWeights,
}

/// One animated property of one node
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationChannel {
    /// Target in the clip's own naming scheme: the label path from the root
    pub target_path: String,
    pub property: ChannelProperty,
    pub keyframes: usize,
    /// Entity the channel drives once the clip is bound to a hierarchy
    pub bound: Option<EntityId>,
}

/// A named animation clip
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationClip {
    pub name: String,
    /// Length in seconds
    pub duration: f32,
    pub channels: Vec<AnimationChannel>,
}

impl AnimationClip {
    pub fn new(name: impl Into<String>, duration: f32) -> Self {
        Self {
            name: name.into(),
            duration,
            channels: Vec::new(),
        }
    }

    pub fn with_channel(mut self, target_path: &str, property: ChannelProperty) -> Self {
        self.channels.push(AnimationChannel {
            target_path: target_path.to_string(),
            property,
            keyframes: 0,
            bound: None,
        });
        self
    }

    /// Rebind every channel from its target path onto an entity hierarchy
    ///
    /// `find` maps a target path to the entity carrying it. Returns how many
    /// channels found a target; the others stay unbound.
    pub fn bind<F>(&mut self, mut find: F) -> usize
    where
        F: FnMut(&str) -> Option<EntityId>,
    {
        let mut bound = 0;
        for channel in &mut self.channels {
            channel.bound = find(&channel.target_path);
            if channel.bound.is_some() {
                bound += 1;
            } else {
                log::warn!(
                    "Clip {} targets {} which is not in the hierarchy",
                    self.name,
                    channel.target_path
                );
            }
        }
        bound
    }

    pub fn is_bound(&self) -> bool {
        self.channels.iter().all(|channel| channel.bound.is_some())
    }
}

/// Named clips attached to the displayed scene, with at most one playing
#[derive(Debug, Default)]
pub struct AnimationAggregator {
    clips: HashMap<String, Arc<AnimationClip>>,
    order: Vec<String>,
    playing: Option<String>,
}

impl AnimationAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a clip under its name, replacing a clip of the same name
    pub fn add_clip(&mut self, clip: Arc<AnimationClip>) -> Option<Arc<AnimationClip>> {
        let name = clip.name.clone();
        let previous = self.clips.insert(name.clone(), clip);
        if previous.is_none() {
            self.order.push(name);
        }
        previous
    }

    pub fn clip(&self, name: &str) -> Option<&Arc<AnimationClip>> {
        self.clips.get(name)
    }

    /// Clip names in the order they were first added
    pub fn clip_names(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    /// Name of the clip currently playing
    pub fn playing(&self) -> Option<&str> {
        self.playing.as_deref()
    }

    /// Stop the current clip (if any) and start `name`
    ///
    /// An unknown name leaves the current playback untouched.
    pub fn play_clip(&mut self, name: &str) -> Result<Arc<AnimationClip>, AnimationError> {
        let clip = self
            .clips
            .get(name)
            .cloned()
            .ok_or_else(|| AnimationError::UnknownClip(name.to_string()))?;
        self.stop_clip();
        self.playing = Some(name.to_string());
        Ok(clip)
    }

    /// Halt playback, returning the clip that was playing
    pub fn stop_clip(&mut self) -> Option<String> {
        self.playing.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_play_switches_clips() {
        let mut animations = AnimationAggregator::new();
        animations.add_clip(Arc::new(AnimationClip::new("Walk", 1.0)));
        animations.add_clip(Arc::new(AnimationClip::new("Run", 0.5)));

        animations.play_clip("Walk").unwrap();
        assert_eq!(animations.playing(), Some("Walk"));

        let clip = animations.play_clip("Run").unwrap();
        assert_eq!(clip.name, "Run");
        assert_eq!(animations.playing(), Some("Run"));
    }

    #[test]
    fn test_unknown_clip_keeps_playback() {
        let mut animations = AnimationAggregator::new();
        animations.add_clip(Arc::new(AnimationClip::new("Idle", 2.0)));
        animations.play_clip("Idle").unwrap();

        let err = animations.play_clip("Jump").unwrap_err();
        assert_eq!(err, AnimationError::UnknownClip("Jump".to_string()));
        assert_eq!(animations.playing(), Some("Idle"));
    }

    #[test]
    fn test_stop_clip() {
        let mut animations = AnimationAggregator::new();
        animations.add_clip(Arc::new(AnimationClip::new("Idle", 2.0)));
        animations.play_clip("Idle").unwrap();

        assert_eq!(animations.stop_clip().as_deref(), Some("Idle"));
        assert_eq!(animations.playing(), None);
        assert_eq!(animations.stop_clip(), None);
    }

    #[test]
    fn test_add_clip_replaces_same_name() {
        let mut animations = AnimationAggregator::new();
        assert!(animations
            .add_clip(Arc::new(AnimationClip::new("Walk", 1.0)))
            .is_none());
        let previous = animations.add_clip(Arc::new(AnimationClip::new("Walk", 3.0)));

        assert_eq!(previous.map(|clip| clip.duration), Some(1.0));
        assert_eq!(animations.len(), 1);
        assert_eq!(animations.clip_names(), ["Walk".to_string()]);
        assert_eq!(animations.clip("Walk").unwrap().duration, 3.0);
    }

    #[test]
    fn test_bind_resolves_targets() {
        let mut clip = AnimationClip::new("Wave", 1.0)
            .with_channel("Root/Arm", ChannelProperty::Rotation)
            .with_channel("Root/Missing", ChannelProperty::Translation);

        let bound = clip.bind(|path| (path == "Root/Arm").then_some(EntityId(7)));

        assert_eq!(bound, 1);
        assert_eq!(clip.channels[0].bound, Some(EntityId(7)));
        assert!(!clip.is_bound());
    }
}
