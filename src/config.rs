//! Viewer configuration

use crate::files::extension_of;

/// Format of a scene description file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SceneFormat {
    /// Self-contained binary container (`.glb`)
    Binary,
    /// JSON with external references (`.gltf`)
    Text,
}

/// Viewer configuration
#[derive(Debug, Clone)]
pub struct ViewerConfig {
    /// Key that clears the displayed scene, matched case-insensitively
    pub clear_key: char,
    /// Extensions of self-contained binary scenes, lowercase, without dot
    pub binary_extensions: Vec<String>,
    /// Extensions of JSON scenes with external references
    pub text_extensions: Vec<String>,
    /// Name given to the entity created for each scene
    pub entity_name: String,
    /// Whether the first decoded clip starts playing on load
    pub autoplay_first_clip: bool,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            clear_key: 'd',
            binary_extensions: vec!["glb".to_string()],
            text_extensions: vec!["gltf".to_string()],
            entity_name: "gltf".to_string(),
            autoplay_first_clip: true,
        }
    }
}

impl ViewerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_clear_key(mut self, key: char) -> Self {
        self.clear_key = key;
        self
    }

    pub fn with_binary_extension(mut self, extension: &str) -> Self {
        self.binary_extensions
            .push(extension.trim_start_matches('.').to_ascii_lowercase());
        self
    }

    pub fn with_text_extension(mut self, extension: &str) -> Self {
        self.text_extensions
            .push(extension.trim_start_matches('.').to_ascii_lowercase());
        self
    }

    pub fn with_entity_name(mut self, name: impl Into<String>) -> Self {
        self.entity_name = name.into();
        self
    }

    pub fn with_autoplay(mut self, autoplay: bool) -> Self {
        self.autoplay_first_clip = autoplay;
        self
    }

    /// Scene format of `path`, judged by its extension
    pub fn scene_format(&self, path: &str) -> Option<SceneFormat> {
        let extension = extension_of(path)?;
        if self.binary_extensions.iter().any(|e| *e == extension) {
            Some(SceneFormat::Binary)
        } else if self.text_extensions.iter().any(|e| *e == extension) {
            Some(SceneFormat::Text)
        } else {
            None
        }
    }

    /// Whether `key` is the clear key
    pub fn is_clear_key(&self, key: char) -> bool {
        key.to_lowercase().eq(self.clear_key.to_lowercase())
    }
}
