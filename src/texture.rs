//! Texture sources produced by decoding and transient image locators

use crate::files::extension_of;
use image::ImageFormat;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Transient locator for an image referenced by a scene file
///
/// Stands in for the bytes of a dropped image until a backend turns them into
/// a texture; every locator gets a fresh `blob:` URL.
#[derive(Clone)]
pub struct ResourceLocator {
    id: Uuid,
    source_path: String,
    mime: String,
    bytes: Arc<[u8]>,
}

impl ResourceLocator {
    /// Create a locator for the raw bytes of `source_path`
    pub fn from_bytes(source_path: &str, bytes: Arc<[u8]>) -> Self {
        Self {
            id: Uuid::new_v4(),
            source_path: source_path.to_string(),
            mime: sniff_mime(&bytes, source_path).to_string(),
            bytes,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// `blob:` URL identifying this locator
    pub fn url(&self) -> String {
        format!("blob:{}", self.id)
    }

    /// Path of the dropped file the bytes came from
    pub fn source_path(&self) -> &str {
        &self.source_path
    }

    pub fn mime_type(&self) -> &str {
        &self.mime
    }

    pub fn bytes(&self) -> &Arc<[u8]> {
        &self.bytes
    }
}

impl fmt::Debug for ResourceLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceLocator")
            .field("url", &self.url())
            .field("source_path", &self.source_path)
            .field("mime", &self.mime)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Where a decoded texture's pixels come from
#[derive(Debug, Clone)]
pub enum TextureData {
    /// Image bytes embedded in the scene file (buffer view or data URI)
    Embedded { mime: String, bytes: Arc<[u8]> },
    /// Image resolved from a sibling dropped file
    Locator(ResourceLocator),
}

/// A texture image the backend has to create before the scene is shown
#[derive(Debug, Clone)]
pub struct TextureSource {
    /// Image index in the scene file
    pub index: usize,
    pub name: Option<String>,
    pub data: TextureData,
}

impl TextureSource {
    pub fn bytes(&self) -> &Arc<[u8]> {
        match &self.data {
            TextureData::Embedded { bytes, .. } => bytes,
            TextureData::Locator(locator) => locator.bytes(),
        }
    }

    pub fn mime_type(&self) -> &str {
        match &self.data {
            TextureData::Embedded { mime, .. } => mime,
            TextureData::Locator(locator) => locator.mime_type(),
        }
    }

    /// Display label: the image name, else its index
    pub fn label(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("image{}", self.index))
    }
}

/// Guess an image MIME type from its bytes, falling back to the file extension
pub fn sniff_mime(bytes: &[u8], path_hint: &str) -> &'static str {
    match image::guess_format(bytes) {
        Ok(ImageFormat::Png) => "image/png",
        Ok(ImageFormat::Jpeg) => "image/jpeg",
        Ok(ImageFormat::WebP) => "image/webp",
        Ok(ImageFormat::Gif) => "image/gif",
        Ok(ImageFormat::Bmp) => "image/bmp",
        _ => match extension_of(path_hint).as_deref() {
            Some("png") => "image/png",
            Some("jpg") | Some("jpeg") => "image/jpeg",
            Some("webp") => "image/webp",
            Some("ktx2") => "image/ktx2",
            _ => "application/octet-stream",
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_bytes() -> Vec<u8> {
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

    #[test]
    fn test_sniff_mime_from_bytes() {
        assert_eq!(sniff_mime(&png_bytes(), "texture.jpg"), "image/png");
    }

    #[test]
    fn test_sniff_mime_falls_back_to_extension() {
        assert_eq!(sniff_mime(b"not an image", "a/b/albedo.JPG"), "image/jpeg");
        assert_eq!(sniff_mime(b"???", "blob"), "application/octet-stream");
    }

    #[test]
    fn test_locators_are_unique() {
        let bytes: Arc<[u8]> = Arc::from(png_bytes());
        let a = ResourceLocator::from_bytes("tex.png", Arc::clone(&bytes));
        let b = ResourceLocator::from_bytes("tex.png", bytes);

        assert_ne!(a.url(), b.url());
        assert!(a.url().starts_with("blob:"));
        assert_eq!(a.mime_type(), "image/png");
        assert_eq!(a.source_path(), "tex.png");
    }
}
