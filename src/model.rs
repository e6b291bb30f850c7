//! Decoded scene data handed from a decoder to the scene controller

use crate::animation::AnimationClip;
use crate::texture::TextureSource;
use glam::{Quat, Vec3};
use std::sync::Arc;

/// Spatial transform (translation, rotation, scale)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    /// Build from glTF's decomposed (translation, rotation xyzw, scale) form
    pub fn from_decomposed(translation: [f32; 3], rotation: [f32; 4], scale: [f32; 3]) -> Self {
        Self {
            translation: Vec3::from(translation),
            rotation: Quat::from_array(rotation),
            scale: Vec3::from(scale),
        }
    }
}

/// A node in the decoded scene hierarchy
#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    /// Optional name of the node
    pub name: Option<String>,
    /// Local transform of the node
    pub transform: Transform,
    /// Mesh attached to this node
    pub mesh: Option<usize>,
    /// Indices of child nodes
    pub children: Vec<usize>,
}

impl SceneNode {
    /// Name used for this node in entity hierarchies and clip targets
    pub fn label(&self, index: usize) -> String {
        match &self.name {
            Some(name) if !name.is_empty() => name.clone(),
            _ => format!("node{index}"),
        }
    }
}

/// A decoded, in-memory model ready to be registered as a resident asset
#[derive(Debug, Clone, Default)]
pub struct SceneModel {
    /// Name of the scene file this model came from
    pub name: String,
    /// List of nodes in the scene graph
    pub nodes: Vec<SceneNode>,
    /// Root nodes of the displayed scene
    pub roots: Vec<usize>,
    pub mesh_count: usize,
    pub material_count: usize,
    /// Buffer contents by buffer index; `None` when the buffer was not found
    pub buffers: Vec<Option<Arc<[u8]>>>,
    /// External references that could not be resolved
    pub missing_references: Vec<String>,
}

impl SceneModel {
    /// Slash-joined label path of a node from its scene root
    ///
    /// This is the naming scheme animation clips use for their targets and
    /// the path entity hierarchies are searched with.
    pub fn node_path(&self, index: usize) -> Option<String> {
        self.node_paths().into_iter().nth(index)
    }

    /// Label paths of every node, indexed like `nodes`
    ///
    /// Nodes unreachable from the roots are addressed by their own label.
    pub fn node_paths(&self) -> Vec<String> {
        let mut paths: Vec<Option<String>> = vec![None; self.nodes.len()];
        let mut stack: Vec<(usize, String)> = self
            .roots
            .iter()
            .filter(|&&root| root < self.nodes.len())
            .map(|&root| (root, self.nodes[root].label(root)))
            .collect();

        while let Some((index, path)) = stack.pop() {
            if paths[index].is_some() {
                continue;
            }
            for &child in &self.nodes[index].children {
                if child < self.nodes.len() {
                    stack.push((child, format!("{path}/{}", self.nodes[child].label(child))));
                }
            }
            paths[index] = Some(path);
        }

        paths
            .into_iter()
            .enumerate()
            .map(|(index, path)| path.unwrap_or_else(|| self.nodes[index].label(index)))
            .collect()
    }

    /// True when every external reference was resolved
    pub fn is_complete(&self) -> bool {
        self.missing_references.is_empty()
    }
}

/// Everything a decoder produces for one scene file
#[derive(Debug, Clone, Default)]
pub struct DecodedScene {
    pub model: SceneModel,
    pub textures: Vec<TextureSource>,
    pub animation_clips: Vec<AnimationClip>,
}
