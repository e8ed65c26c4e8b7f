use anyhow::{Context, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Supported image extensions.
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

/// Default longest edge, in pixels, of the image sent to AI services.
pub const DEFAULT_MAX_DIMENSION: u32 = 1024;

/// The image payload sent to AI services: base64 bytes plus their MIME type.
///
/// Images loaded through [`ImageData::from_path`] or [`ImageData::from_bytes`]
/// are downsized and re-encoded as JPEG so every provider receives a small,
/// uniformly encoded payload.
///
/// # Example
///
/// ```rust,no_run
/// use ai_image_queries::image_data::{ImageData, DEFAULT_MAX_DIMENSION};
///
/// let image = ImageData::from_path("photo.png".as_ref(), DEFAULT_MAX_DIMENSION).unwrap();
/// assert_eq!(image.mime_type(), "image/jpeg");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    base64: String,
    mime_type: String,
}

impl ImageData {
    /// Wrap an already-encoded payload as-is.
    pub fn new(base64: String, mime_type: String) -> Self {
        Self { base64, mime_type }
    }

    /// Read, downsize and encode an image file.
    pub fn from_path(path: &Path, max_dimension: u32) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read image {}", path.display()))?;
        Self::from_bytes(&bytes, max_dimension)
            .with_context(|| format!("Failed to prepare image {}", path.display()))
    }

    /// Decode in-memory image bytes, downsize so the longest edge is at most
    /// `max_dimension`, and re-encode as JPEG.
    pub fn from_bytes(bytes: &[u8], max_dimension: u32) -> Result<Self> {
        let img = image::load_from_memory(bytes).context("Failed to decode image")?;

        let img = if img.width().max(img.height()) > max_dimension {
            log::debug!(
                "Resizing {}x{} image to fit {max_dimension}px",
                img.width(),
                img.height()
            );
            img.thumbnail(max_dimension, max_dimension)
        } else {
            img
        };

        // JPEG has no alpha channel
        let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
        let mut encoded = Vec::new();
        rgb.write_to(&mut Cursor::new(&mut encoded), ImageFormat::Jpeg)
            .context("Failed to encode image as JPEG")?;

        Ok(Self {
            base64: STANDARD.encode(&encoded),
            mime_type: ImageFormat::Jpeg.to_mime_type().to_string(),
        })
    }

    pub fn base64(&self) -> &str {
        &self.base64
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// The payload as a `data:` URL.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.base64)
    }
}

/// Collect supported image files from the given paths.
///
/// Accepts a mix of file paths and directory paths. Directories are walked
/// recursively (following symlinks). Only files with supported image
/// extensions are included.
pub fn collect_images(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut images = Vec::new();

    for path in paths {
        if path.is_file() {
            if is_supported_image(path) {
                images.push(path.clone());
            } else {
                log::warn!("Skipping unsupported file: {}", path.display());
            }
        } else if path.is_dir() {
            for entry in WalkDir::new(path)
                .follow_links(true)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let p = entry.path();
                if p.is_file() && is_supported_image(p) {
                    images.push(p.to_path_buf());
                }
            }
        } else {
            log::warn!("Path does not exist: {}", path.display());
        }
    }

    images
}

/// Check if a file has a supported image extension.
fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgba8(RgbaImage::new(width, height));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png).unwrap();
        bytes
    }

    fn decoded_size(data: &ImageData) -> (u32, u32) {
        let bytes = STANDARD.decode(data.base64()).unwrap();
        let img = image::load_from_memory(&bytes).unwrap();
        (img.width(), img.height())
    }

    #[test]
    fn from_bytes_downsizes_and_reencodes() {
        let data = ImageData::from_bytes(&png_bytes(200, 100), 50).unwrap();
        assert_eq!(data.mime_type(), "image/jpeg");
        assert_eq!(decoded_size(&data), (50, 25));
    }

    #[test]
    fn from_bytes_keeps_small_images() {
        let data = ImageData::from_bytes(&png_bytes(40, 30), 50).unwrap();
        assert_eq!(decoded_size(&data), (40, 30));
    }

    #[test]
    fn from_bytes_rejects_garbage() {
        assert!(ImageData::from_bytes(b"not an image", 50).is_err());
    }

    #[test]
    fn from_path_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.png");
        std::fs::write(&path, png_bytes(10, 10)).unwrap();

        let data = ImageData::from_path(&path, DEFAULT_MAX_DIMENSION).unwrap();
        assert!(data.data_url().starts_with("data:image/jpeg;base64,"));
    }

    #[test]
    fn data_url_carries_payload_mime_type() {
        let data = ImageData::new("iVBORw0K".into(), "image/png".into());
        assert_eq!(data.data_url(), "data:image/png;base64,iVBORw0K");
    }

    #[test]
    fn from_path_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ImageData::from_path(&dir.path().join("nope.jpg"), 64).is_err());
    }

    #[test]
    fn collect_images_filters_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.jpg"), b"").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub").join("b.PNG"), b"").unwrap();

        let images = collect_images(&[dir.path().to_path_buf()]);
        assert_eq!(images.len(), 2);
        assert!(images.iter().all(|p| is_supported_image(p)));
    }

    #[test]
    fn collect_images_skips_unsupported_and_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let txt = dir.path().join("notes.txt");
        std::fs::write(&txt, b"").unwrap();

        let images = collect_images(&[txt, dir.path().join("missing.jpg")]);
        assert!(images.is_empty());
    }
}
