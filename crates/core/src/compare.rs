//! Before/after comparison slider state.
//!
//! The widget is a tiny state machine over [`SliderState`]: a press inside
//! the widget starts dragging, release or leaving the bounds stops it, and
//! every move while dragging maps the pointer's x coordinate to a position
//! in `[0, 100]` (percent from the left edge). All updates are plain
//! arithmetic so they can run on every pointer event.
//!
//! [`ComparisonLayout`] turns a position into the numbers the renderer needs:
//! how wide the "before" clip box is, where the handle goes, and how much the
//! original image must be scaled inside the clip box so that it still spans
//! the full widget.

/// Initial boundary position, in percent.
pub const DEFAULT_POSITION: f32 = 50.0;

/// Horizontal extent of the widget in the same coordinate space as pointer events.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HorizontalBounds {
    pub left: f32,
    pub width: f32,
}

impl HorizontalBounds {
    pub fn new(left: f32, width: f32) -> Self {
        Self { left, width }
    }

    /// Percentage of the width at which `x` lies, clamped to `[0, 100]`.
    ///
    /// `None` for an empty or non-finite extent, where no position is defined.
    pub fn percent_of(&self, x: f32) -> Option<f32> {
        if !(self.width.is_finite() && self.width > 0.0) || !x.is_finite() {
            return None;
        }
        Some(((x - self.left) / self.width * 100.0).clamp(0.0, 100.0))
    }
}

/// Where a move event's coordinates come from.
///
/// Mouse and touch share one resolution path; a touch move uses its first
/// active touch point.
#[derive(Debug, Clone, Copy)]
pub enum PointerSource<'a> {
    Mouse { x: f32 },
    Touch { points: &'a [f32] },
}

impl PointerSource<'_> {
    pub fn x(&self) -> Option<f32> {
        match self {
            Self::Mouse { x } => Some(*x),
            Self::Touch { points } => points.first().copied(),
        }
    }
}

/// Input delivered to the slider.
#[derive(Debug, Clone, Copy)]
pub enum SliderInput<'a> {
    /// Pointer down or touch start inside the widget.
    Press,
    /// Pointer up or touch end.
    Release,
    /// The pointer left the widget.
    Leave,
    Move(PointerSource<'a>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SliderState {
    position: f32,
    dragging: bool,
}

impl Default for SliderState {
    fn default() -> Self {
        Self {
            position: DEFAULT_POSITION,
            dragging: false,
        }
    }
}

impl SliderState {
    pub fn position(&self) -> f32 {
        self.position
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// Feeds one input event. Returns `true` if the position changed.
    pub fn handle(&mut self, input: SliderInput<'_>, bounds: HorizontalBounds) -> bool {
        match input {
            SliderInput::Press => {
                self.dragging = true;
                false
            }
            SliderInput::Release | SliderInput::Leave => {
                self.dragging = false;
                false
            }
            SliderInput::Move(source) => {
                if !self.dragging {
                    return false;
                }
                let Some(next) = source.x().and_then(|x| bounds.percent_of(x)) else {
                    return false;
                };
                let changed = next != self.position;
                self.position = next;
                changed
            }
        }
    }

    /// Sets the position directly, clamped to `[0, 100]`. NaN is ignored.
    pub fn set_position(&mut self, position: f32) {
        if !position.is_nan() {
            self.position = position.clamp(0.0, 100.0);
        }
    }

    pub fn layout(&self) -> ComparisonLayout {
        ComparisonLayout::from_position(self.position)
    }
}

/// Render geometry for one slider position, all in percent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComparisonLayout {
    /// Width of the "before" clip box relative to the widget.
    pub clip_width_percent: f32,
    /// Handle offset from the left edge relative to the widget.
    pub handle_left_percent: f32,
    /// Width of the original image relative to the clip box (`100 / p × 100`).
    ///
    /// `None` when the clip box is too narrow for a finite scale (including
    /// zero width); the before pane is then not drawn at all.
    pub before_scale_percent: Option<f32>,
}

impl ComparisonLayout {
    pub fn from_position(position: f32) -> Self {
        let p = if position.is_nan() { 0.0 } else { position.clamp(0.0, 100.0) };
        Self {
            clip_width_percent: p,
            handle_left_percent: p,
            before_scale_percent: Some(10_000.0 / p).filter(|scale| scale.is_finite()),
        }
    }

    /// Whether the "before" pane has anything to show.
    pub fn shows_before(&self) -> bool {
        self.before_scale_percent.is_some()
    }
}
