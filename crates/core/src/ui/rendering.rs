//! UI rendering helpers for the preview and comparison views.
//!
//! Everything here paints with an [`egui::Painter`] into a rectangle the
//! caller has already allocated; no state is kept between frames.

use crate::background::BackgroundSpec;
use crate::compare::ComparisonLayout;
use eframe::egui;

/// Side length of one checkerboard cell, in points.
pub const CHECKER_CELL: f32 = 12.0;

const FULL_UV: egui::Rect = egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0));
const BEFORE_FILL: egui::Color32 = egui::Color32::from_rgb(15, 23, 42);
const RESULT_LABEL_FILL: egui::Color32 = egui::Color32::from_rgba_premultiplied(19, 48, 118, 128);
const HANDLE_WIDTH: f32 = 4.0;
const HANDLE_KNOB_RADIUS: f32 = 16.0;

/// Largest size with the image's aspect ratio that fits in `available`.
///
/// Images are never enlarged beyond their native size.
pub fn fit_size(image_size: [usize; 2], available: egui::Vec2) -> egui::Vec2 {
    let [w, h] = image_size;
    if w == 0 || h == 0 || available.x <= 0.0 || available.y <= 0.0 {
        return egui::Vec2::ZERO;
    }
    let (w, h) = (w as f32, h as f32);
    let scale = (available.x / w).min(available.y / h).min(1.0);
    egui::vec2(w * scale, h * scale)
}

/// Draws a neutral checkerboard, used to visualise transparency on screen.
pub fn draw_checkerboard(painter: &egui::Painter, rect: egui::Rect, cell: f32) {
    painter.rect_filled(rect, 0.0, egui::Color32::WHITE);
    let cols = (rect.width() / cell).ceil() as i32;
    let rows = (rect.height() / cell).ceil() as i32;
    for row in 0..rows {
        for col in 0..cols {
            if (row + col) % 2 == 1 {
                let cell_rect = egui::Rect::from_min_size(
                    egui::pos2(rect.min.x + col as f32 * cell, rect.min.y + row as f32 * cell),
                    egui::vec2(cell, cell),
                )
                .intersect(rect);
                painter.rect_filled(cell_rect, 0.0, egui::Color32::from_gray(204));
            }
        }
    }
}

/// Paints the background layer of the live preview.
///
/// `background_texture` is the decoded background image, when `background` is
/// an image and its texture is ready. Until then the checkerboard shows.
pub fn paint_background_layer(
    painter: &egui::Painter,
    rect: egui::Rect,
    background: &BackgroundSpec,
    background_texture: Option<&egui::TextureHandle>,
) {
    match (background, background_texture) {
        (BackgroundSpec::SolidColor(c), _) => {
            painter.rect_filled(rect, 0.0, egui::Color32::from_rgb(c.r, c.g, c.b));
        }
        (BackgroundSpec::Image(_), Some(texture)) => {
            // Stretched over the whole output, same as the export.
            painter.image(texture.id(), rect, FULL_UV, egui::Color32::WHITE);
        }
        (BackgroundSpec::Transparent, _) | (BackgroundSpec::Image(_), None) => {
            draw_checkerboard(painter, rect, CHECKER_CELL);
        }
    }
}

/// Live preview: background layer with the foreground on top.
pub fn paint_preview(
    painter: &egui::Painter,
    rect: egui::Rect,
    background: &BackgroundSpec,
    background_texture: Option<&egui::TextureHandle>,
    foreground: &egui::TextureHandle,
) {
    paint_background_layer(painter, rect, background, background_texture);
    painter.image(foreground.id(), rect, FULL_UV, egui::Color32::WHITE);
}

/// Rectangle of the "before" clip box for `layout` inside `rect`.
pub fn before_clip_rect(rect: egui::Rect, layout: &ComparisonLayout) -> egui::Rect {
    egui::Rect::from_min_size(
        rect.min,
        egui::vec2(rect.width() * layout.clip_width_percent / 100.0, rect.height()),
    )
}

/// Rectangle the original image is drawn into, inside the clip box.
///
/// Its width is the clip box width scaled by `before_scale_percent`, i.e.
/// the full widget width, left-aligned. `None` when nothing is visible.
pub fn before_image_rect(rect: egui::Rect, layout: &ComparisonLayout) -> Option<egui::Rect> {
    let scale = layout.before_scale_percent?;
    let clip = before_clip_rect(rect, layout);
    Some(egui::Rect::from_min_size(
        clip.min,
        egui::vec2(clip.width() * scale / 100.0, rect.height()),
    ))
}

/// Horizontal position of the drag handle.
pub fn handle_x(rect: egui::Rect, layout: &ComparisonLayout) -> f32 {
    rect.left() + rect.width() * layout.handle_left_percent / 100.0
}

/// Paints the comparison widget: result underneath, clipped original on
/// top, and the handle on the boundary.
///
/// Without a `before` texture (still decoding, or undecodable) the clip box
/// stays empty but the result and handle are drawn as usual.
pub fn paint_comparison(
    painter: &egui::Painter,
    rect: egui::Rect,
    layout: &ComparisonLayout,
    before: Option<&egui::TextureHandle>,
    after: &egui::TextureHandle,
) {
    // After layer always spans the whole widget.
    draw_checkerboard(painter, rect, CHECKER_CELL);
    painter.image(after.id(), rect, FULL_UV, egui::Color32::WHITE);

    draw_label(
        painter,
        egui::pos2(rect.right() - 16.0, rect.top() + 16.0),
        egui::Align2::RIGHT_TOP,
        "Removed Background",
        RESULT_LABEL_FILL,
    );

    if let Some(image_rect) = before_image_rect(rect, layout) {
        let clip = before_clip_rect(rect, layout);
        let clipped = painter.with_clip_rect(clip.intersect(painter.clip_rect()));
        clipped.rect_filled(clip, 0.0, BEFORE_FILL);
        if let Some(before) = before {
            clipped.image(before.id(), image_rect, FULL_UV, egui::Color32::WHITE);
        }
        draw_label(
            &clipped,
            egui::pos2(rect.left() + 16.0, rect.top() + 16.0),
            egui::Align2::LEFT_TOP,
            "Original",
            egui::Color32::from_black_alpha(128),
        );
    }

    draw_handle(painter, rect, handle_x(rect, layout));
}

fn draw_handle(painter: &egui::Painter, rect: egui::Rect, x: f32) {
    let shadow = egui::Color32::from_black_alpha(90);
    painter.line_segment(
        [egui::pos2(x, rect.top()), egui::pos2(x, rect.bottom())],
        egui::Stroke::new(HANDLE_WIDTH + 2.0, shadow),
    );
    painter.line_segment(
        [egui::pos2(x, rect.top()), egui::pos2(x, rect.bottom())],
        egui::Stroke::new(HANDLE_WIDTH, egui::Color32::WHITE),
    );

    let knob = egui::pos2(x, rect.center().y);
    painter.circle_filled(knob, HANDLE_KNOB_RADIUS + 1.0, shadow);
    painter.circle_filled(knob, HANDLE_KNOB_RADIUS, egui::Color32::WHITE);
    painter.text(
        knob,
        egui::Align2::CENTER_CENTER,
        "↔",
        egui::FontId::proportional(16.0),
        egui::Color32::from_rgb(30, 41, 59),
    );
}

fn draw_label(painter: &egui::Painter, pos: egui::Pos2, anchor: egui::Align2, text: &str, fill: egui::Color32) {
    let galley = painter.layout_no_wrap(
        text.to_string(),
        egui::FontId::proportional(11.0),
        egui::Color32::WHITE,
    );
    let padding = egui::vec2(8.0, 4.0);
    let frame = anchor.anchor_size(pos, galley.size() + padding * 2.0);
    painter.rect_filled(frame, 4.0, fill);
    painter.galley(frame.min + padding, galley, egui::Color32::WHITE);
}
