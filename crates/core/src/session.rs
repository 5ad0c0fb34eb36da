//! Session state shared by the UI and the headless driver.
//!
//! A [`Session`] owns everything the user can change: the original upload,
//! the pipeline (and through it the processed image), the chosen background
//! and the comparison slider. Each entity has its own mutation entry points;
//! nothing else writes to them.

use crate::asset::ImageAsset;
use crate::background::{BackgroundSpec, Rgb};
use crate::compare::SliderState;
use crate::compose::{self, Export};
use crate::error::{AppError, Result};
use crate::pipeline::{Pipeline, PipelineEvent, PipelineEventKind, PipelineState, Ticket};

/// A user-visible message that stays up until dismissed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
}

#[derive(Debug, Default)]
pub struct Session {
    original: Option<ImageAsset>,
    pipeline: Pipeline,
    background: BackgroundSpec,
    slider: SliderState,
    notice: Option<Notice>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn original(&self) -> Option<&ImageAsset> {
        self.original.as_ref()
    }

    pub fn processed(&self) -> Option<&ImageAsset> {
        self.pipeline.processed()
    }

    pub fn pipeline_state(&self) -> &PipelineState {
        self.pipeline.state()
    }

    pub fn is_loading(&self) -> bool {
        self.pipeline.is_busy()
    }

    pub fn background(&self) -> &BackgroundSpec {
        &self.background
    }

    pub fn slider(&self) -> &SliderState {
        &self.slider
    }

    pub fn slider_mut(&mut self) -> &mut SliderState {
        &mut self.slider
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    /// Shows `message` until dismissed, replacing any current notice.
    pub fn notify(&mut self, message: impl Into<String>) {
        self.notice = Some(Notice {
            message: message.into(),
        });
    }

    /// Replaces the original image and starts a new submission.
    ///
    /// The caller runs the returned ticket against the segmentation service
    /// and feeds the resulting events back through [`Session::apply`].
    pub fn upload(&mut self, raw: ImageAsset) -> Ticket {
        self.original = Some(raw);
        self.notice = None;
        self.pipeline.begin()
    }

    /// Applies a pipeline event. Failures raise a notice.
    ///
    /// Returns `false` for events that belong to a superseded submission.
    pub fn apply(&mut self, event: PipelineEvent) -> bool {
        let completes = matches!(event.kind, PipelineEventKind::Completed(_));
        let applied = self.pipeline.apply(event);

        if applied && completes {
            if let PipelineState::Failed(reason) = self.pipeline.state() {
                let reason = reason.clone();
                self.notify(reason);
            }
        }
        applied
    }

    pub fn select_transparent(&mut self) {
        self.background = BackgroundSpec::Transparent;
    }

    /// Selects a solid colour, clearing any background image.
    pub fn select_color(&mut self, color: Rgb) {
        self.background = BackgroundSpec::SolidColor(color);
    }

    /// Selects a background image, clearing any solid colour.
    pub fn select_background_image(&mut self, image: ImageAsset) {
        self.background = BackgroundSpec::Image(image);
    }

    pub fn select_background(&mut self, spec: BackgroundSpec) {
        self.background = spec;
    }

    /// Clears both images, the background and the slider.
    ///
    /// Any in-flight submission is left running but its result is ignored.
    pub fn start_over(&mut self) {
        self.original = None;
        self.pipeline.reset();
        self.background = BackgroundSpec::Transparent;
        self.slider = SliderState::default();
        self.notice = None;
    }

    /// Assets currently referenced by the session.
    pub fn live_assets(&self) -> impl Iterator<Item = &ImageAsset> {
        self.original
            .iter()
            .chain(self.pipeline.processed())
            .chain(self.background.image())
    }

    /// Builds the export for the current processed image and background.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotReady`] unless the pipeline is `Ready`.
    pub async fn export(&self) -> Result<Export> {
        let processed = self.pipeline.processed().ok_or(AppError::NotReady)?;
        compose::export(processed, &self.background).await
    }

    /// Snapshot of what an export needs, for running it off the UI thread.
    pub fn export_inputs(&self) -> Result<(ImageAsset, BackgroundSpec)> {
        let processed = self.pipeline.processed().ok_or(AppError::NotReady)?;
        Ok((processed.clone(), self.background.clone()))
    }
}
