//! Image assets handled by a session.
//!
//! An [`ImageAsset`] is an opaque, cheaply clonable handle to encoded image
//! bytes: the user's upload, the segmentation service's response, or a
//! background picture. Pixels are only materialised on demand through
//! [`ImageAsset::decode`]; the header can be probed without a full decode.
//!
//! # Example
//!
//! ```ignore
//! use backdrop_core::asset::ImageAsset;
//!
//! let photo = ImageAsset::from_path("portrait.jpg")?;
//! let (width, height) = photo.dimensions()?;
//! let pixels = photo.decode()?;
//! ```

use crate::error::{AppError, Result};
use image::{ImageFormat, ImageReader, RgbaImage};
use std::fmt;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ASSET_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier of an [`ImageAsset`].
///
/// Clones of an asset share its id, so it can key caches (e.g. GPU textures)
/// that must be released once the asset is superseded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetId(u64);

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "asset#{}", self.0)
    }
}

/// Handle to encoded image bytes.
#[derive(Clone)]
pub struct ImageAsset {
    id: AssetId,
    name: Arc<str>,
    bytes: Arc<[u8]>,
}

impl ImageAsset {
    /// Wraps encoded bytes under the given file name.
    pub fn from_bytes(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        let name: String = name.into();
        Self {
            id: AssetId(NEXT_ASSET_ID.fetch_add(1, Ordering::Relaxed)),
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Reads a file from disk. The file name becomes the asset name.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Io`] if the file cannot be read.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        Ok(Self::from_bytes(name, bytes))
    }

    /// Reads a file and checks that its header is a supported image.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Io`] if the file cannot be read and
    /// [`AppError::Decode`] if it is not an image.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let asset = Self::from_path(path)?;
        asset.dimensions()?;
        Ok(asset)
    }

    pub fn id(&self) -> AssetId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Format guessed from the leading magic bytes.
    pub fn format(&self) -> Option<ImageFormat> {
        image::guess_format(&self.bytes).ok()
    }

    /// MIME type for transmission, `application/octet-stream` when unknown.
    pub fn mime_type(&self) -> &'static str {
        self.format()
            .map(|f| f.to_mime_type())
            .unwrap_or("application/octet-stream")
    }

    /// Reads the pixel dimensions from the image header.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Decode`] if the bytes are not a supported image.
    pub fn dimensions(&self) -> Result<(u32, u32)> {
        self.reader()?
            .into_dimensions()
            .map_err(|e| AppError::decode(format!("{}: {}", self.name, e)))
    }

    /// Fully decodes the image to 8-bit RGBA.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Decode`] if the bytes are not a supported image.
    pub fn decode(&self) -> Result<RgbaImage> {
        let image = self
            .reader()?
            .decode()
            .map_err(|e| AppError::decode(format!("{}: {}", self.name, e)))?;
        Ok(image.into_rgba8())
    }

    fn reader(&self) -> Result<ImageReader<Cursor<&[u8]>>> {
        ImageReader::new(Cursor::new(&self.bytes[..]))
            .with_guessed_format()
            .map_err(|e| AppError::decode(format!("{}: {}", self.name, e)))
    }
}

impl fmt::Debug for ImageAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageAsset")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl PartialEq for ImageAsset {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ImageAsset {}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{ImageEncoder, Rgba, codecs::png::PngEncoder};

    /// Encodes an RGBA buffer as PNG and wraps it in an asset.
    pub(crate) fn png_asset(name: &str, image: &RgbaImage) -> ImageAsset {
        let mut bytes = Vec::new();
        PngEncoder::new(&mut bytes)
            .write_image(
                image.as_raw(),
                image.width(),
                image.height(),
                image::ExtendedColorType::Rgba8,
            )
            .unwrap();
        ImageAsset::from_bytes(name, bytes)
    }

    #[test]
    fn probes_dimensions_and_mime() {
        let asset = png_asset("a.png", &RgbaImage::from_pixel(7, 3, Rgba([1, 2, 3, 255])));
        assert_eq!(asset.dimensions().unwrap(), (7, 3));
        assert_eq!(asset.mime_type(), "image/png");
        assert_eq!(asset.decode().unwrap().get_pixel(6, 2), &Rgba([1, 2, 3, 255]));
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let asset = ImageAsset::from_bytes("notes.txt", b"definitely not pixels".to_vec());
        assert!(matches!(asset.dimensions(), Err(AppError::Decode(_))));
        assert!(matches!(asset.decode(), Err(AppError::Decode(_))));
        assert_eq!(asset.mime_type(), "application/octet-stream");
    }

    #[test]
    fn clones_share_identity() {
        let a = ImageAsset::from_bytes("x", vec![0u8; 4]);
        let b = ImageAsset::from_bytes("x", vec![0u8; 4]);
        assert_eq!(a.clone(), a);
        assert_ne!(a, b);
    }
}
