//! GLTF/GLB scene decoding
//!
//! Turns a parsed glTF document into a [`DecodedScene`]: the node hierarchy
//! of the displayed scene, every image as a [`TextureSource`] and every
//! animation as an [`AnimationClip`] targeting label paths. Mesh data stays
//! in the buffers; the backend reads it from the registered model.

use super::{DecodeError, SceneDecoder, UriResolver};
use crate::animation::{AnimationChannel, AnimationClip, ChannelProperty};
use crate::model::{DecodedScene, SceneModel, SceneNode, Transform};
use crate::texture::{sniff_mime, TextureData, TextureSource};
use async_trait::async_trait;
use base64::Engine;
use gltf::{Document, Gltf};
use percent_encoding::percent_decode_str;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Decoder for `.glb` containers and `.gltf` documents
#[derive(Debug, Default, Clone, Copy)]
pub struct GltfDecoder;

impl GltfDecoder {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SceneDecoder for GltfDecoder {
    async fn decode_binary(
        &self,
        name: &str,
        bytes: Arc<[u8]>,
    ) -> Result<DecodedScene, DecodeError> {
        let gltf = Gltf::from_slice(&bytes)?;
        let Gltf { document, blob } = gltf;
        log::debug!(
            "Parsed {name} with {} meshes and {} materials",
            document.meshes().len(),
            document.materials().len()
        );
        decode_document(name, document, blob.map(Arc::from), None).await
    }

    async fn decode_json(
        &self,
        name: &str,
        root: gltf::json::Root,
        resolver: &dyn UriResolver,
    ) -> Result<DecodedScene, DecodeError> {
        let document = Document::from_json(root)?;
        log::debug!(
            "Parsed {name} with {} buffers and {} images",
            document.buffers().len(),
            document.images().len()
        );
        decode_document(name, document, None, Some(resolver)).await
    }

    fn decoder_name(&self) -> &'static str {
        "glTF"
    }
}

/// Where one buffer's bytes come from
enum BufferRef {
    Blob,
    Uri(String),
}

/// Where one image's bytes come from
enum ImageRef {
    View {
        buffer: usize,
        offset: usize,
        length: usize,
        mime: String,
    },
    Uri {
        uri: String,
        mime: Option<String>,
    },
}

async fn decode_document(
    name: &str,
    document: Document,
    blob: Option<Arc<[u8]>>,
    resolver: Option<&dyn UriResolver>,
) -> Result<DecodedScene, DecodeError> {
    let mut missing = Vec::new();

    let buffer_refs: Vec<(BufferRef, usize)> = document
        .buffers()
        .map(|buffer| {
            let source = match buffer.source() {
                gltf::buffer::Source::Bin => BufferRef::Blob,
                gltf::buffer::Source::Uri(uri) => BufferRef::Uri(uri.to_string()),
            };
            (source, buffer.length())
        })
        .collect();
    let image_refs: Vec<(Option<String>, ImageRef)> = document
        .images()
        .map(|image| {
            let source = match image.source() {
                gltf::image::Source::View { view, mime_type } => ImageRef::View {
                    buffer: view.buffer().index(),
                    offset: view.offset(),
                    length: view.length(),
                    mime: mime_type.to_string(),
                },
                gltf::image::Source::Uri { uri, mime_type } => ImageRef::Uri {
                    uri: uri.to_string(),
                    mime: mime_type.map(str::to_string),
                },
            };
            (image.name().map(str::to_string), source)
        })
        .collect();

    let buffers = futures::future::join_all(
        buffer_refs
            .iter()
            .map(|(source, _)| load_buffer(source, blob.as_ref(), resolver)),
    )
    .await;
    for (index, ((source, declared), data)) in buffer_refs.iter().zip(&buffers).enumerate() {
        let label = match source {
            BufferRef::Blob => format!("buffer{index} (binary chunk)"),
            BufferRef::Uri(uri) => uri.clone(),
        };
        match data {
            None => missing.push(label),
            // Short data is kept for whatever views still fit
            Some(data) if data.len() < *declared => {
                log::warn!(
                    "{name}: {label} has {} of {declared} declared bytes",
                    data.len()
                );
                missing.push(format!("{label} (truncated)"));
            }
            Some(_) => {}
        }
    }

    let images = futures::future::join_all(
        image_refs
            .iter()
            .map(|(_, source)| load_image(source, &buffers, resolver)),
    )
    .await;
    let mut textures = Vec::with_capacity(images.len());
    for (index, ((image_name, source), data)) in image_refs.into_iter().zip(images).enumerate() {
        match data {
            Some(data) => textures.push(TextureSource {
                index,
                name: image_name,
                data,
            }),
            None => missing.push(match source {
                ImageRef::View { .. } => format!("image{index} (buffer view)"),
                ImageRef::Uri { uri, .. } => uri,
            }),
        }
    }

    if !missing.is_empty() {
        log::warn!("{name}: {} unresolved references", missing.len());
    }

    let model = SceneModel {
        name: name.to_string(),
        nodes: document.nodes().map(|node| read_node(&node)).collect(),
        roots: scene_roots(&document),
        mesh_count: document.meshes().len(),
        material_count: document.materials().len(),
        buffers,
        missing_references: missing,
    };
    let animation_clips = read_clips(&document, &model);

    log::debug!(
        "Decoded {name}: {} nodes, {} textures, {} clips",
        model.nodes.len(),
        textures.len(),
        animation_clips.len()
    );
    Ok(DecodedScene {
        model,
        textures,
        animation_clips,
    })
}

async fn load_buffer(
    source: &BufferRef,
    blob: Option<&Arc<[u8]>>,
    resolver: Option<&dyn UriResolver>,
) -> Option<Arc<[u8]>> {
    match source {
        BufferRef::Blob => blob.cloned(),
        BufferRef::Uri(uri) => {
            if let Some(data) = parse_data_uri(uri) {
                return data.map(|(_, bytes)| Arc::from(bytes));
            }
            resolver?.resolve_buffer(uri).await
        }
    }
}

async fn load_image(
    source: &ImageRef,
    buffers: &[Option<Arc<[u8]>>],
    resolver: Option<&dyn UriResolver>,
) -> Option<TextureData> {
    match source {
        ImageRef::View {
            buffer,
            offset,
            length,
            mime,
        } => {
            let data = buffers.get(*buffer)?.as_ref()?;
            let end = offset.checked_add(*length)?;
            if end > data.len() {
                log::error!("Image view out of bounds: {end} > {}", data.len());
                return None;
            }
            Some(TextureData::Embedded {
                mime: mime.clone(),
                bytes: Arc::from(&data[*offset..end]),
            })
        }
        ImageRef::Uri { uri, mime } => {
            if let Some(data) = parse_data_uri(uri) {
                let (data_mime, bytes) = data?;
                let mime = mime
                    .clone()
                    .or(data_mime)
                    .unwrap_or_else(|| sniff_mime(&bytes, uri).to_string());
                return Some(TextureData::Embedded {
                    mime,
                    bytes: Arc::from(bytes),
                });
            }
            resolver?
                .resolve_image(uri)
                .await
                .map(TextureData::Locator)
        }
    }
}

/// Decode a `data:` URI
///
/// Returns `None` for any other URI, `Some(None)` for a malformed data URI.
fn parse_data_uri(uri: &str) -> Option<Option<(Option<String>, Vec<u8>)>> {
    let rest = uri.strip_prefix("data:")?;
    let Some((header, payload)) = rest.split_once(',') else {
        log::warn!("Malformed data URI");
        return Some(None);
    };

    let (mime, base64) = match header.strip_suffix(";base64") {
        Some(mime) => (mime, true),
        None => (header, false),
    };
    let mime = mime
        .split(';')
        .next()
        .filter(|m| !m.is_empty())
        .map(str::to_string);

    let bytes = if base64 {
        match base64::engine::general_purpose::STANDARD.decode(payload) {
            Ok(bytes) => bytes,
            Err(err) => {
                log::warn!("Invalid base64 in data URI: {err}");
                return Some(None);
            }
        }
    } else {
        percent_decode_str(payload).collect()
    };
    Some(Some((mime, bytes)))
}

fn read_node(node: &gltf::Node) -> SceneNode {
    let (translation, rotation, scale) = node.transform().decomposed();
    SceneNode {
        name: node.name().map(str::to_string),
        transform: Transform::from_decomposed(translation, rotation, scale),
        mesh: node.mesh().map(|mesh| mesh.index()),
        children: node.children().map(|child| child.index()).collect(),
    }
}

/// Root nodes of the default scene, else of the first scene, else every
/// node that is nobody's child
fn scene_roots(document: &Document) -> Vec<usize> {
    if let Some(scene) = document.default_scene().or_else(|| document.scenes().next()) {
        return scene.nodes().map(|node| node.index()).collect();
    }
    let children: BTreeSet<usize> = document
        .nodes()
        .flat_map(|node| node.children().map(|child| child.index()).collect::<Vec<_>>())
        .collect();
    (0..document.nodes().len())
        .filter(|index| !children.contains(index))
        .collect()
}

fn read_clips(document: &Document, model: &SceneModel) -> Vec<AnimationClip> {
    let paths = model.node_paths();
    document
        .animations()
        .map(|animation| {
            let name = animation
                .name()
                .map(str::to_string)
                .unwrap_or_else(|| format!("animation{}", animation.index()));
            let mut duration = 0.0f32;
            let mut channels = Vec::new();

            for channel in animation.channels() {
                let target = channel.target();
                let input = channel.sampler().input();
                let reader = channel.reader(|buffer| {
                    model
                        .buffers
                        .get(buffer.index())
                        .and_then(|data| data.as_deref())
                });
                let end = reader
                    .read_inputs()
                    .and_then(|times| times.reduce(f32::max))
                    .or_else(|| {
                        input
                            .max()
                            .and_then(|max| max.get(0).and_then(|v| v.as_f64()))
                            .map(|max| max as f32)
                    })
                    .unwrap_or(0.0);
                duration = duration.max(end);

                channels.push(AnimationChannel {
                    target_path: paths
                        .get(target.node().index())
                        .cloned()
                        .unwrap_or_default(),
                    property: match target.property() {
                        gltf::animation::Property::Translation => ChannelProperty::Translation,
                        gltf::animation::Property::Rotation => ChannelProperty::Rotation,
                        gltf::animation::Property::Scale => ChannelProperty::Scale,
                        gltf::animation::Property::MorphTargetWeights => {
                            ChannelProperty::MorphWeights
                        }
                    },
                    keyframes: input.count(),
                    bound: None,
                });
            }

            AnimationClip {
                name,
                duration,
                channels,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    const MINIMAL_GLTF: &str = r#"{
        "asset": { "version": "2.0" },
        "scenes": [{ "nodes": [0] }],
        "scene": 0,
        "nodes": [
            { "name": "Root", "children": [1], "translation": [1.0, 0.0, 0.0] },
            { "name": "Arm" }
        ]
    }"#;

    #[test]
    fn test_decode_binary_rejects_garbage() {
        let bytes: Arc<[u8]> = Arc::from(vec![0u8; 4]);
        let result = block_on(GltfDecoder::new().decode_binary("bad.glb", bytes));
        assert!(matches!(result, Err(DecodeError::Gltf(_))));
    }

    #[test]
    fn test_decode_hierarchy_without_buffers() {
        let bytes: Arc<[u8]> = Arc::from(MINIMAL_GLTF.as_bytes());
        let decoded = block_on(GltfDecoder::new().decode_binary("min.gltf", bytes)).unwrap();

        assert_eq!(decoded.model.roots, vec![0]);
        assert_eq!(decoded.model.nodes[0].children, vec![1]);
        assert_eq!(decoded.model.nodes[0].transform.translation.x, 1.0);
        assert_eq!(decoded.model.node_paths(), vec!["Root", "Root/Arm"]);
        assert!(decoded.model.is_complete());
        assert!(decoded.textures.is_empty());
    }

    #[test]
    fn test_parse_data_uri() {
        let (mime, bytes) = parse_data_uri("data:application/octet-stream;base64,AAEC")
            .unwrap()
            .unwrap();
        assert_eq!(mime.as_deref(), Some("application/octet-stream"));
        assert_eq!(bytes, vec![0, 1, 2]);

        let (mime, bytes) = parse_data_uri("data:,a%20b").unwrap().unwrap();
        assert_eq!(mime, None);
        assert_eq!(bytes, b"a b".to_vec());

        assert!(parse_data_uri("scene.bin").is_none());
        assert!(parse_data_uri("data:;base64,!!!").unwrap().is_none());
    }

    #[test]
    fn test_roots_without_scene() {
        let json = r#"{
            "asset": { "version": "2.0" },
            "nodes": [{ "children": [1] }, {}, {}]
        }"#;
        let root: gltf::json::Root = serde_json::from_str(json).unwrap();
        let document = Document::from_json(root).unwrap();

        assert_eq!(scene_roots(&document), vec![0, 2]);
    }

    fn buffer_only(uri: &str, byte_length: usize) -> Document {
        let json = format!(
            r#"{{
                "asset": {{ "version": "2.0" }},
                "buffers": [{{ "uri": "{uri}", "byteLength": {byte_length} }}]
            }}"#
        );
        let root: gltf::json::Root = serde_json::from_str(&json).unwrap();
        Document::from_json(root).unwrap()
    }

    #[test]
    fn test_short_buffer_is_reported_missing() {
        let uri = "data:application/octet-stream;base64,AAECAw==";

        let decoded = block_on(decode_document("short.gltf", buffer_only(uri, 40), None, None))
            .unwrap();
        assert!(!decoded.model.is_complete());
        assert_eq!(decoded.model.missing_references.len(), 1);
        assert!(decoded.model.missing_references[0].ends_with("(truncated)"));
        assert_eq!(decoded.model.buffers[0].as_deref(), Some(&[0u8, 1, 2, 3][..]));

        let decoded = block_on(decode_document("exact.gltf", buffer_only(uri, 4), None, None))
            .unwrap();
        assert!(decoded.model.is_complete());
    }
}
