//! Desktop user interface for backdrop.
//!
//! This module provides the background editor window: upload, live
//! composite preview, before/after comparison and export.
//!
//! # Architecture
//!
//! The UI is split into focused submodules:
//! - [`state`]: View selection and export event definitions
//! - [`textures`]: Decoded asset textures and their release
//! - [`rendering`]: Drawing utilities for the preview and comparison layers
//! - [`comparison`]: Pointer/touch handling for the comparison slider
//! - [`app`]: Main application logic
//!
//! # Usage
//!
//! ```ignore
//! use backdrop_core::{ui, Config, HttpSegmentationClient};
//! use std::sync::Arc;
//!
//! let config = Config::load()?;
//! let service = Arc::new(HttpSegmentationClient::new(&config)?);
//! ui::run_app(&config, service, None)?;
//! ```

mod app;
mod comparison;
mod rendering;
mod state;
mod textures;

// Public API exports
pub use app::{BackdropApp, IMAGE_EXTENSIONS};
pub use comparison::{TouchTracker, process_input_events};
pub use rendering::{draw_checkerboard, fit_size, paint_comparison, paint_preview};
pub use state::View;
pub use textures::TextureCache;

use crate::asset::ImageAsset;
use crate::config::Config;
use crate::error::Result;
use crate::service::SegmentationService;
use std::sync::Arc;

/// Opens the editor window and blocks until it is closed.
///
/// # Arguments
/// * `config` - Application configuration (window size)
/// * `service` - Segmentation service used for every upload
/// * `initial` - Image to submit as soon as the window opens
///
/// # Errors
///
/// Returns [`crate::AppError::Ui`] if the window cannot be created.
pub fn run_app(
    config: &Config,
    service: Arc<dyn SegmentationService>,
    initial: Option<ImageAsset>,
) -> Result<()> {
    app::run(config.window_size, service, initial)
}
