//! Backdrop Core Library
//!
//! This library provides the core functionality for backdrop, a client that
//! sends a photo to a background segmentation service and lets the user put
//! the cut-out on a new background.
//!
//! # Overview
//!
//! The library handles:
//!
//! - **Processing**: The upload → segmentation → ready/failed state machine in [`pipeline`],
//!   talking to the service through [`service`]
//! - **Composition**: Flattening the cut-out over a colour or image in [`compose`]
//! - **Comparison**: Before/after slider state in [`compare`]
//! - **User Interface**: The editor window in [`ui`]
//!
//! # Quick Start
//!
//! The simplest way to use the library is through the [`Backdrop`] facade:
//!
//! ```ignore
//! use backdrop_core::Backdrop;
//!
//! // Initialize with environment configuration
//! let app = Backdrop::new()?;
//!
//! // Launch the editor
//! app.run_interactive(None)?;
//! ```
//!
//! # Module Structure
//!
//! - [`asset`]: Image handles
//! - [`background`]: Replacement background selection and palette
//! - [`compare`]: Comparison slider state and layout
//! - [`compose`]: Layer composition and PNG export
//! - [`config`]: Configuration loading and management
//! - [`error`]: Error types and result aliases
//! - [`pipeline`]: Processing state machine and worker
//! - [`service`]: Segmentation service client
//! - [`session`]: Session state with per-entity mutation entry points
//! - [`ui`]: User interface components

pub mod asset;
pub mod background;
pub mod compare;
pub mod compose;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod service;
pub mod session;
pub mod ui;

// Re-export primary types for convenience
pub use asset::ImageAsset;
pub use background::{BackgroundSpec, Rgb};
pub use compose::{EXPORT_FILE_NAME, Export};
pub use config::Config;
pub use error::{AppError, Result};
pub use pipeline::{PipelineEvent, PipelineEventKind, PipelineState};
pub use service::{HttpSegmentationClient, SegmentationService};
pub use session::Session;

use std::sync::Arc;

/// Main entry point for the backdrop application.
///
/// This struct provides a facade over the configuration, the segmentation
/// service and the UI. It's the recommended way to use the library for
/// most use cases.
pub struct Backdrop {
    config: Config,
    service: Arc<dyn SegmentationService>,
}

impl Backdrop {
    /// Creates a new instance with environment configuration.
    ///
    /// Loads configuration from environment variables (including `.env` files)
    /// and builds the HTTP segmentation client.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new() -> Result<Self> {
        Self::with_config(Config::load()?)
    }

    /// Creates an instance with custom configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_config(config: Config) -> Result<Self> {
        let service = Arc::new(HttpSegmentationClient::new(&config)?);
        Ok(Self { config, service })
    }

    /// Creates an instance backed by an arbitrary segmentation service.
    ///
    /// Useful for tests and for embedding a local model.
    pub fn with_service(config: Config, service: Arc<dyn SegmentationService>) -> Self {
        Self { config, service }
    }

    /// Launches the editor window and blocks until it is closed.
    ///
    /// # Arguments
    /// * `initial` - Image to submit as soon as the window opens
    pub fn run_interactive(&self, initial: Option<ImageAsset>) -> Result<()> {
        ui::run_app(&self.config, Arc::clone(&self.service), initial)
    }

    /// Runs one image through the pipeline and composes it without any UI.
    ///
    /// # Errors
    ///
    /// Returns the submission's error if processing fails, or a decode/encode
    /// error from composition.
    pub async fn process(&self, raw: ImageAsset, background: BackgroundSpec) -> Result<Export> {
        let mut session = Session::new();
        let ticket = session.upload(raw.clone());

        let mut outcome = None;
        pipeline::drive(self.service.as_ref(), ticket, raw, |event| match event.kind {
            PipelineEventKind::Completed(result) => outcome = Some(result),
            kind => {
                session.apply(PipelineEvent { ticket: event.ticket, kind });
            }
        })
        .await;

        let processed = outcome
            .ok_or_else(|| AppError::Unknown("submission produced no result".into()))??;
        session.apply(PipelineEvent {
            ticket,
            kind: PipelineEventKind::Completed(Ok(processed)),
        });
        session.select_background(background);
        session.export().await
    }

    /// Returns a reference to the current configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns a mutable reference to the configuration.
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }
}

/// Initializes the library by loading environment variables.
///
/// Call this once at application startup before using any other functions.
pub fn init() {
    let _ = dotenvy::dotenv();
}
