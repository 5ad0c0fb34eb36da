//! GPU textures for session assets.
//!
//! Textures are keyed by [`AssetId`] and evicted as soon as the session no
//! longer references the asset, so repeated uploads don't accumulate.
//! Decoding happens on worker threads; [`TextureCache::poll`] uploads the
//! finished pixels on the UI thread.

use crate::asset::{AssetId, ImageAsset};
use crate::error::{AppError, Result};
use eframe::egui;
use image::RgbaImage;
use image::imageops::{self, FilterType};
use std::collections::{HashMap, HashSet};
use std::sync::mpsc::{Receiver, Sender, channel};
use std::thread;

/// Longest texture side uploaded for on-screen display.
pub const MAX_TEXTURE_SIDE: u32 = 4096;

struct Decoded {
    id: AssetId,
    result: Result<RgbaImage>,
}

pub struct TextureCache {
    textures: HashMap<AssetId, egui::TextureHandle>,
    /// Decodes in flight, with the texture name to upload under.
    pending: HashMap<AssetId, String>,
    failed: HashSet<AssetId>,
    errors: Vec<AppError>,
    tx: Sender<Decoded>,
    rx: Receiver<Decoded>,
}

impl Default for TextureCache {
    fn default() -> Self {
        let (tx, rx) = channel();
        Self {
            textures: HashMap::new(),
            pending: HashMap::new(),
            failed: HashSet::new(),
            errors: Vec::new(),
            tx,
            rx,
        }
    }
}

impl TextureCache {
    /// Returns the texture for `asset` if it has been uploaded.
    ///
    /// The first request starts decoding on a worker thread and returns
    /// `None`; the texture becomes available after a later [`TextureCache::poll`].
    /// A decode failure is recorded once (see [`TextureCache::take_errors`])
    /// and the asset is not retried.
    pub fn texture(&mut self, ctx: &egui::Context, asset: &ImageAsset) -> Option<egui::TextureHandle> {
        if let Some(texture) = self.textures.get(&asset.id()) {
            return Some(texture.clone());
        }
        if !self.failed.contains(&asset.id()) && !self.pending.contains_key(&asset.id()) {
            self.start_decode(ctx, asset);
        }
        None
    }

    /// Whether `asset` is still being decoded.
    pub fn is_pending(&self, asset: &ImageAsset) -> bool {
        self.pending.contains_key(&asset.id())
    }

    fn start_decode(&mut self, ctx: &egui::Context, asset: &ImageAsset) {
        self.pending
            .insert(asset.id(), format!("{}:{}", asset.id(), asset.name()));

        let asset = asset.clone();
        let tx = self.tx.clone();
        let ctx = ctx.clone();
        thread::spawn(move || {
            let result = asset.decode().map(fit_texture);
            let _ = tx.send(Decoded {
                id: asset.id(),
                result,
            });
            ctx.request_repaint();
        });
    }

    /// Uploads every decode finished since the last call.
    ///
    /// Results for assets evicted in the meantime are dropped.
    pub fn poll(&mut self, ctx: &egui::Context) {
        while let Ok(decoded) = self.rx.try_recv() {
            let Some(name) = self.pending.remove(&decoded.id) else {
                continue;
            };

            match decoded.result {
                Ok(rgba) => {
                    let size = [rgba.width() as usize, rgba.height() as usize];
                    let color_image = egui::ColorImage::from_rgba_unmultiplied(size, rgba.as_raw());
                    let texture = ctx.load_texture(name, color_image, egui::TextureOptions::LINEAR);
                    tracing::debug!(asset = %decoded.id, w = size[0], h = size[1], "texture uploaded");
                    self.textures.insert(decoded.id, texture);
                }
                Err(e) => {
                    tracing::warn!(asset = %decoded.id, error = %e, "failed to decode image for display");
                    self.failed.insert(decoded.id);
                    self.errors.push(e);
                }
            }
        }
    }

    /// Drops textures of assets not in `live`.
    pub fn retain<'a>(&mut self, live: impl IntoIterator<Item = &'a ImageAsset>) {
        let live: HashSet<AssetId> = live.into_iter().map(ImageAsset::id).collect();
        let before = self.textures.len();
        self.textures.retain(|id, _| live.contains(id));
        self.pending.retain(|id, _| live.contains(id));
        self.failed.retain(|id| live.contains(id));
        if self.textures.len() != before {
            tracing::debug!(evicted = before - self.textures.len(), "released textures");
        }
    }

    /// Decode failures recorded since the last call.
    pub fn take_errors(&mut self) -> Vec<AppError> {
        std::mem::take(&mut self.errors)
    }
}

/// Downscales so the longest side is at most [`MAX_TEXTURE_SIDE`].
fn fit_texture(rgba: RgbaImage) -> RgbaImage {
    let (w, h) = rgba.dimensions();
    if w.max(h) <= MAX_TEXTURE_SIDE {
        return rgba;
    }
    let scale = MAX_TEXTURE_SIDE as f32 / w.max(h) as f32;
    let nw = ((w as f32 * scale).round() as u32).max(1);
    let nh = ((h as f32 * scale).round() as u32).max(1);
    imageops::resize(&rgba, nw, nh, FilterType::Triangle)
}
