//! Composition engine: background layer + cut-out foreground → flat PNG.
//!
//! The output always has the foreground's native dimensions. The background
//! is painted first (nothing, a solid fill, or an image stretched to the
//! output bounds) and the foreground is blended on top with source-over
//! alpha compositing at its native resolution, origin-aligned.
//!
//! Blending is done in integer arithmetic, so identical inputs always give
//! byte-identical rasters and, through the fixed PNG settings, identical
//! files.

use crate::asset::ImageAsset;
use crate::background::{BackgroundSpec, Rgb};
use crate::error::{AppError, Result};
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::imageops::{self, FilterType};
use image::{ImageEncoder, Rgba, RgbaImage};

/// File name offered for the exported composite.
pub const EXPORT_FILE_NAME: &str = "final-image.png";

/// A background whose pixels (if any) are already decoded.
#[derive(Debug, Clone)]
pub enum DecodedBackground {
    Transparent,
    Solid(Rgb),
    Image(RgbaImage),
}

/// The encoded result of an export.
#[derive(Debug, Clone)]
pub struct Export {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl Export {
    pub fn file_name(&self) -> &'static str {
        EXPORT_FILE_NAME
    }
}

/// Paints `background` then `foreground` into a new raster sized like `foreground`.
pub fn compose(foreground: &RgbaImage, background: &DecodedBackground) -> RgbaImage {
    let (width, height) = foreground.dimensions();

    let mut canvas = match background {
        DecodedBackground::Transparent => RgbaImage::new(width, height),
        DecodedBackground::Solid(c) => RgbaImage::from_pixel(width, height, Rgba([c.r, c.g, c.b, 255])),
        DecodedBackground::Image(bg) if bg.dimensions() == (width, height) => bg.clone(),
        DecodedBackground::Image(bg) => imageops::resize(bg, width, height, FilterType::Triangle),
    };

    for (dst, src) in canvas.pixels_mut().zip(foreground.pixels()) {
        *dst = source_over(*dst, *src);
    }

    canvas
}

/// Blends `src` over `dst` (straight, non-premultiplied alpha).
fn source_over(dst: Rgba<u8>, src: Rgba<u8>) -> Rgba<u8> {
    let sa = u32::from(src[3]);
    let da = u32::from(dst[3]);

    if sa == 255 || da == 0 {
        return src;
    }
    if sa == 0 {
        return dst;
    }

    // Both weights are scaled by 255 so everything stays integral.
    let src_w = sa * 255;
    let dst_w = da * (255 - sa);
    let total = src_w + dst_w;

    let mut out = [0u8; 4];
    for i in 0..3 {
        let num = u32::from(src[i]) * src_w + u32::from(dst[i]) * dst_w;
        out[i] = ((num + total / 2) / total) as u8;
    }
    out[3] = ((total + 127) / 255) as u8;
    Rgba(out)
}

/// Decodes the foreground and any background image, then composes.
///
/// Both decodes run concurrently on the blocking pool; drawing starts only
/// once both have finished.
pub async fn compose_assets(foreground: &ImageAsset, background: &BackgroundSpec) -> Result<RgbaImage> {
    let fg = decode_blocking(foreground.clone());

    let (fg, bg) = match background {
        BackgroundSpec::Transparent => (fg.await?, DecodedBackground::Transparent),
        BackgroundSpec::SolidColor(c) => (fg.await?, DecodedBackground::Solid(*c)),
        BackgroundSpec::Image(asset) => {
            let bg = decode_blocking(asset.clone());
            let (fg, bg) = futures::try_join!(fg, bg)?;
            (fg, DecodedBackground::Image(bg))
        }
    };

    Ok(compose(&fg, &bg))
}

pub(crate) async fn decode_blocking(asset: ImageAsset) -> Result<RgbaImage> {
    tokio::task::spawn_blocking(move || asset.decode())
        .await
        .map_err(|e| AppError::Unknown(format!("Decode task failed: {}", e)))?
}

/// Encodes a raster as PNG with fixed settings.
///
/// # Errors
///
/// Returns [`AppError::Encode`] if the encoder rejects the buffer.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    PngEncoder::new_with_quality(&mut bytes, CompressionType::Default, PngFilter::Adaptive)
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            image::ExtendedColorType::Rgba8,
        )
        .map_err(|e| AppError::encode(format!("PNG encoding failed: {}", e)))?;
    Ok(bytes)
}

/// Composes and encodes the final PNG for `foreground` over `background`.
pub async fn export(foreground: &ImageAsset, background: &BackgroundSpec) -> Result<Export> {
    let composite = compose_assets(foreground, background).await?;
    let (width, height) = composite.dimensions();
    let bytes = encode_png(&composite)?;
    tracing::info!(width, height, bytes = bytes.len(), "composite exported");
    Ok(Export { bytes, width, height })
}
