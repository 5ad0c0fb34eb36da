//! Main background editor application.
//!
//! This module contains the `BackdropApp` struct which implements the
//! `eframe::App` trait: upload, live preview, before/after comparison and
//! export of the composited image.

use super::comparison::{TouchTracker, process_input_events};
use super::rendering::{fit_size, paint_comparison, paint_preview};
use super::state::{ExportEvent, ExportTarget, View};
use super::textures::TextureCache;
use crate::asset::ImageAsset;
use crate::background::{BackgroundSpec, PALETTE};
use crate::compose::{self, EXPORT_FILE_NAME};
use crate::error::{AppError, Result};
use crate::pipeline::{PipelineRunner, PipelineState};
use crate::service::SegmentationService;
use crate::session::Session;
use eframe::egui;
use std::borrow::Cow;
use std::path::Path;
use std::sync::Arc;
use std::sync::mpsc::{Receiver, Sender, channel};
use std::thread;

/// File extensions offered by the open dialogs.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp"];

const TOOLBAR_WIDTH: f32 = 240.0;
const SWATCH_SIZE: f32 = 32.0;

/// The background editor application.
pub struct BackdropApp {
    ctx: egui::Context,
    session: Session,
    runner: PipelineRunner,

    // Display state
    textures: TextureCache,
    touches: TouchTracker,
    view: View,

    // Export state
    exporting: bool,
    status: Option<String>,
    export_tx: Sender<ExportEvent>,
    export_rx: Receiver<ExportEvent>,
}

impl BackdropApp {
    /// Creates the application.
    ///
    /// # Arguments
    /// * `cc` - eframe creation context
    /// * `service` - Segmentation service used for every upload
    /// * `initial` - Image to submit right away, if any
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        service: Arc<dyn SegmentationService>,
        initial: Option<ImageAsset>,
    ) -> Self {
        let ctx = cc.egui_ctx.clone();
        let repaint = ctx.clone();
        let runner = PipelineRunner::new(service).with_notifier(Arc::new(move || repaint.request_repaint()));
        let (export_tx, export_rx) = channel();

        let mut app = Self {
            ctx,
            session: Session::new(),
            runner,
            textures: TextureCache::default(),
            touches: TouchTracker::default(),
            view: View::default(),
            exporting: false,
            status: None,
            export_tx,
            export_rx,
        };

        if let Some(raw) = initial {
            app.submit(raw);
        }
        app
    }

    /// Starts processing `raw`, superseding any submission in flight.
    fn submit(&mut self, raw: ImageAsset) {
        self.status = None;
        let ticket = self.session.upload(raw.clone());
        self.runner.submit(ticket, raw);
    }

    fn pick_upload(&mut self) {
        let Some(path) = rfd::FileDialog::new()
            .set_title("Choose a photo")
            .add_filter("Images", IMAGE_EXTENSIONS)
            .pick_file()
        else {
            return;
        };

        match open_image(&path) {
            Ok(raw) => self.submit(raw),
            Err(e) => self.session.notify(e.user_message()),
        }
    }

    fn pick_background(&mut self) {
        let Some(path) = rfd::FileDialog::new()
            .set_title("Choose a background")
            .add_filter("Images", IMAGE_EXTENSIONS)
            .pick_file()
        else {
            return;
        };

        match open_image(&path) {
            Ok(image) => self.session.select_background_image(image),
            Err(e) => self.session.notify(e.user_message()),
        }
    }

    fn pick_download(&mut self) {
        let Some(path) = rfd::FileDialog::new()
            .set_title("Save result")
            .set_file_name(EXPORT_FILE_NAME)
            .add_filter("PNG image", &["png"])
            .save_file()
        else {
            return;
        };
        self.start_export(ExportTarget::File(path));
    }

    /// Composes and delivers the result on a background thread.
    fn start_export(&mut self, target: ExportTarget) {
        let (foreground, background) = match self.session.export_inputs() {
            Ok(inputs) => inputs,
            Err(e) => {
                self.session.notify(e.user_message());
                return;
            }
        };

        self.exporting = true;
        self.status = None;
        let tx = self.export_tx.clone();
        let ctx = self.ctx.clone();

        thread::spawn(move || {
            let event = match run_export(&foreground, &background, target) {
                Ok(event) => event,
                Err(e) => {
                    tracing::warn!(error = %e, "export failed");
                    ExportEvent::Failed(e.user_message().to_string())
                }
            };
            let _ = tx.send(event);
            ctx.request_repaint();
        });
    }

    /// Applies pipeline events queued by the worker threads.
    fn process_pipeline_events(&mut self) {
        for event in self.runner.drain() {
            self.session.apply(event);
        }
    }

    /// Processes export completions from the background thread.
    fn process_export_events(&mut self) {
        while let Ok(event) = self.export_rx.try_recv() {
            self.exporting = false;
            match event {
                ExportEvent::Saved(path) => {
                    tracing::info!(path = %path.display(), "result saved");
                    self.status = Some(format!("Saved {}", path.display()));
                }
                ExportEvent::Copied => {
                    self.status = Some("Copied to clipboard".to_string());
                }
                ExportEvent::Failed(message) => self.session.notify(message),
            }
        }
    }

    /// Renders the initial upload affordance.
    fn render_upload_prompt(&mut self, ui: &mut egui::Ui) {
        ui.vertical_centered(|ui| {
            ui.add_space(ui.available_height() * 0.25);
            let button = egui::Button::new(egui::RichText::new("Click to Upload Image").size(20.0))
                .min_size(egui::vec2(420.0, 200.0))
                .corner_radius(16.0);
            if ui.add(button).clicked() {
                self.pick_upload();
            }

            if let PipelineState::Failed(reason) = self.session.pipeline_state() {
                ui.add_space(12.0);
                ui.label(egui::RichText::new(reason).color(egui::Color32::LIGHT_RED));
            }
        });
    }

    /// Renders the in-flight state.
    fn render_loading(&mut self, ui: &mut egui::Ui) {
        ui.vertical_centered(|ui| {
            ui.add_space(ui.available_height() * 0.3);
            ui.spinner();
            ui.label(
                egui::RichText::new("Processing... please wait...")
                    .color(egui::Color32::from_rgb(96, 165, 250)),
            );
        });
    }

    /// Renders the background controls and actions.
    fn render_toolbar(&mut self, ui: &mut egui::Ui) {
        ui.add_space(8.0);
        ui.strong("Background Color");
        ui.horizontal_wrapped(|ui| {
            for swatch in PALETTE.iter() {
                let selected = swatch.is_selected(self.session.background());
                let fill = match swatch.color {
                    Some(c) => egui::Color32::from_rgb(c.r, c.g, c.b),
                    None => egui::Color32::GRAY,
                };
                let stroke_color = if selected {
                    egui::Color32::WHITE
                } else {
                    egui::Color32::TRANSPARENT
                };
                let button = egui::Button::new("")
                    .fill(fill)
                    .stroke(egui::Stroke::new(2.0, stroke_color))
                    .corner_radius(SWATCH_SIZE / 2.0)
                    .min_size(egui::vec2(SWATCH_SIZE, SWATCH_SIZE));
                if ui.add(button).on_hover_text(swatch.label).clicked() {
                    match swatch.color {
                        Some(color) => self.session.select_color(color),
                        None => self.session.select_transparent(),
                    }
                }
            }
        });

        ui.add_space(16.0);
        ui.strong("Background Image");
        let upload = egui::Button::new("Upload Background").min_size(egui::vec2(ui.available_width(), 28.0));
        if ui.add(upload).clicked() {
            self.pick_background();
        }
        if let BackgroundSpec::Image(image) = self.session.background() {
            ui.label(egui::RichText::new(image.name()).small().weak());
        }

        ui.add_space(16.0);
        ui.separator();

        let full = egui::vec2(ui.available_width(), 32.0);
        if ui.add(egui::Button::new("Start Over").min_size(full)).clicked() {
            self.session.start_over();
            self.status = None;
        }

        let download = egui::Button::new(egui::RichText::new("Download Result").strong())
            .fill(egui::Color32::from_rgb(37, 99, 235))
            .min_size(full);
        if ui.add_enabled(!self.exporting, download).clicked() {
            self.pick_download();
        }

        if ui
            .add_enabled(!self.exporting, egui::Button::new("Copy Result").min_size(full))
            .clicked()
        {
            self.start_export(ExportTarget::Clipboard);
        }

        if self.exporting {
            ui.horizontal(|ui| {
                ui.spinner();
                ui.label("Exporting...");
            });
        } else if let Some(status) = &self.status {
            ui.label(egui::RichText::new(status).small().weak());
        }
    }

    /// Renders the preview / compare area for a processed image.
    fn render_workspace(&mut self, ui: &mut egui::Ui) {
        let ctx = ui.ctx().clone();

        ui.horizontal(|ui| {
            ui.selectable_value(&mut self.view, View::Preview, "Preview");
            ui.selectable_value(&mut self.view, View::Compare, "Compare");
        });
        ui.separator();

        let Some(processed) = self.session.processed().cloned() else {
            return;
        };
        let Some(foreground) = self.textures.texture(&ctx, &processed) else {
            if self.textures.is_pending(&processed) {
                ui.vertical_centered(|ui| {
                    ui.add_space(ui.available_height() * 0.3);
                    ui.spinner();
                });
            }
            return;
        };
        let size = fit_size(foreground.size(), ui.available_size());

        ui.vertical_centered(|ui| match self.view {
            View::Preview => {
                let background_texture = self
                    .session
                    .background()
                    .image()
                    .cloned()
                    .and_then(|image| self.textures.texture(&ctx, &image));
                let (rect, _) = ui.allocate_exact_size(size, egui::Sense::hover());
                paint_preview(
                    ui.painter(),
                    rect,
                    self.session.background(),
                    background_texture.as_ref(),
                    &foreground,
                );
            }
            View::Compare => {
                let before = self
                    .session
                    .original()
                    .cloned()
                    .and_then(|original| self.textures.texture(&ctx, &original));
                let (rect, response) = ui.allocate_exact_size(size, egui::Sense::click_and_drag());

                let events = ctx.input(|i| i.events.clone());
                if process_input_events(&events, rect, self.session.slider_mut(), &mut self.touches) {
                    ctx.request_repaint();
                }
                if response.hovered() || self.session.slider().is_dragging() {
                    ctx.set_cursor_icon(egui::CursorIcon::ResizeHorizontal);
                }

                let layout = self.session.slider().layout();
                paint_comparison(ui.painter(), rect, &layout, before.as_ref(), &foreground);
            }
        });
    }

    /// Renders the blocking failure notice, if any.
    fn render_notice(&mut self, ctx: &egui::Context) {
        let Some(notice) = self.session.notice().cloned() else {
            return;
        };

        let mut dismissed = false;
        let response = egui::Modal::new(egui::Id::new("notice")).show(ctx, |ui| {
            ui.set_width(320.0);
            ui.heading("Something went wrong");
            ui.add_space(4.0);
            ui.label(notice.message.as_str());
            ui.add_space(8.0);
            if ui.button("OK").clicked() {
                dismissed = true;
            }
        });

        if dismissed || response.should_close() {
            self.session.dismiss_notice();
        }
    }
}

impl eframe::App for BackdropApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Enforce dark mode
        ctx.set_visuals(egui::Visuals::dark());

        self.process_pipeline_events();
        self.process_export_events();
        self.textures.poll(ctx);

        // Release textures of superseded uploads
        self.textures.retain(self.session.live_assets());

        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            ui.add_space(6.0);
            ui.heading("Magic Background Remover");
            ui.add_space(6.0);
        });

        if self.session.processed().is_some() {
            egui::SidePanel::left("toolbar")
                .resizable(false)
                .exact_width(TOOLBAR_WIDTH)
                .show(ctx, |ui| self.render_toolbar(ui));
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            if self.session.is_loading() {
                self.render_loading(ui);
            } else if self.session.processed().is_some() {
                self.render_workspace(ui);
            } else {
                self.render_upload_prompt(ui);
            }
        });

        for error in self.textures.take_errors() {
            self.session.notify(error.user_message());
        }

        self.render_notice(ctx);
    }
}

fn open_image(path: &Path) -> Result<ImageAsset> {
    ImageAsset::open(path).inspect_err(|e| {
        tracing::warn!(path = %path.display(), error = %e, "rejected image file");
    })
}

fn run_export(foreground: &ImageAsset, background: &BackgroundSpec, target: ExportTarget) -> Result<ExportEvent> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    match target {
        ExportTarget::File(path) => {
            let export = runtime.block_on(compose::export(foreground, background))?;
            std::fs::write(&path, &export.bytes)?;
            Ok(ExportEvent::Saved(path))
        }
        ExportTarget::Clipboard => {
            let composite = runtime.block_on(compose::compose_assets(foreground, background))?;
            let (width, height) = composite.dimensions();
            let mut clipboard =
                arboard::Clipboard::new().map_err(|e| AppError::ui(format!("Clipboard unavailable: {}", e)))?;
            clipboard
                .set_image(arboard::ImageData {
                    width: width as usize,
                    height: height as usize,
                    bytes: Cow::Owned(composite.into_raw()),
                })
                .map_err(|e| AppError::ui(format!("Failed to copy image: {}", e)))?;
            Ok(ExportEvent::Copied)
        }
    }
}

/// Launches the editor window and blocks until it is closed.
///
/// # Arguments
/// * `window_size` - Initial inner size of the window
/// * `service` - Segmentation service used for uploads
/// * `initial` - Image to submit as soon as the window opens
pub fn run(
    window_size: [f32; 2],
    service: Arc<dyn SegmentationService>,
    initial: Option<ImageAsset>,
) -> Result<()> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Magic Background Remover")
            .with_inner_size(window_size)
            .with_min_inner_size([640.0, 480.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Magic Background Remover",
        options,
        Box::new(move |cc| Ok(Box::new(BackdropApp::new(cc, service, initial)) as Box<dyn eframe::App>)),
    )
    .map_err(|e| AppError::ui(format!("Failed to run UI: {}", e)))
}
