//! glTF fixtures shared by the integration tests
#![allow(dead_code)]

use serde_json::{json, Value};

/// Keyframe times of every fixture clip
pub const CLIP_TIMES: [f32; 2] = [0.0, 1.5];

/// Keyframe data: two times followed by two identity rotations
pub fn animation_bytes() -> Vec<u8> {
    let mut bytes = Vec::new();
    for time in CLIP_TIMES {
        bytes.extend_from_slice(&time.to_le_bytes());
    }
    for _ in 0..2 {
        for component in [0.0f32, 0.0, 0.0, 1.0] {
            bytes.extend_from_slice(&component.to_le_bytes());
        }
    }
    bytes
}

/// A 1x1 red PNG
pub fn png_bytes() -> Vec<u8> {
    let mut img = image::RgbaImage::new(1, 1);
    img.put_pixel(0, 0, image::Rgba([255, 0, 0, 255]));

    let mut png_data = Vec::new();
    img.write_to(
        &mut std::io::Cursor::new(&mut png_data),
        image::ImageFormat::Png,
    )
    .expect("Failed to encode test image");
    png_data
}

/// Document with a Root/Hips hierarchy and one clip rotating Hips
///
/// `buffer` is the buffer object; `images` the image list.
fn document(clip: &str, buffer: Value, extra_views: Vec<Value>, images: Vec<Value>) -> Value {
    let mut views = vec![
        json!({ "buffer": 0, "byteOffset": 0, "byteLength": 8 }),
        json!({ "buffer": 0, "byteOffset": 8, "byteLength": 32 }),
    ];
    views.extend(extra_views);

    let mut root = json!({
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [{ "nodes": [0] }],
        "nodes": [
            { "name": "Root", "children": [1] },
            { "name": "Hips", "translation": [0.0, 1.0, 0.0] }
        ],
        "buffers": [buffer],
        "bufferViews": views,
        "accessors": [
            {
                "bufferView": 0,
                "componentType": 5126,
                "count": 2,
                "type": "SCALAR",
                "min": [CLIP_TIMES[0]],
                "max": [CLIP_TIMES[1]]
            },
            { "bufferView": 1, "componentType": 5126, "count": 2, "type": "VEC4" }
        ],
        "animations": [{
            "name": clip,
            "samplers": [{ "input": 0, "output": 1, "interpolation": "LINEAR" }],
            "channels": [{ "sampler": 0, "target": { "node": 1, "path": "rotation" } }]
        }]
    });
    if !images.is_empty() {
        root["images"] = Value::Array(images);
        root["textures"] = json!([{ "source": 0 }]);
    }
    root
}

/// `.gltf` text referencing `scene.bin` and `tex.png`
pub fn gltf_with_references(clip: &str) -> Vec<u8> {
    let root = document(
        clip,
        json!({ "uri": "scene.bin", "byteLength": 40 }),
        Vec::new(),
        vec![json!({ "name": "albedo", "uri": "tex.png" })],
    );
    serde_json::to_vec(&root).expect("serialize fixture")
}

/// `.gltf` text without images, for animation-only drops
pub fn gltf_clip_only(clip: &str) -> Vec<u8> {
    let root = document(
        clip,
        json!({ "uri": "scene.bin", "byteLength": 40 }),
        Vec::new(),
        Vec::new(),
    );
    serde_json::to_vec(&root).expect("serialize fixture")
}

/// Self-contained `.glb` with the keyframes and the PNG in its binary chunk
pub fn glb_scene(clip: &str) -> Vec<u8> {
    let png = png_bytes();
    let mut bin = animation_bytes();
    let image_offset = bin.len();
    bin.extend_from_slice(&png);
    while bin.len() % 4 != 0 {
        bin.push(0);
    }

    let root = document(
        clip,
        json!({ "byteLength": bin.len() }),
        vec![json!({ "buffer": 0, "byteOffset": image_offset, "byteLength": png.len() })],
        vec![json!({ "name": "albedo", "bufferView": 2, "mimeType": "image/png" })],
    );
    let mut json = serde_json::to_vec(&root).expect("serialize fixture");
    while json.len() % 4 != 0 {
        json.push(b' ');
    }

    let total = 12 + 8 + json.len() + 8 + bin.len();
    let mut glb = Vec::with_capacity(total);
    glb.extend_from_slice(b"glTF");
    glb.extend_from_slice(&2u32.to_le_bytes());
    glb.extend_from_slice(&(total as u32).to_le_bytes());
    glb.extend_from_slice(&(json.len() as u32).to_le_bytes());
    glb.extend_from_slice(b"JSON");
    glb.extend_from_slice(&json);
    glb.extend_from_slice(&(bin.len() as u32).to_le_bytes());
    glb.extend_from_slice(b"BIN\0");
    glb.extend_from_slice(&bin);
    glb
}
