//! Pointer and touch handling for the comparison widget.
//!
//! Translates raw egui input events into [`SliderInput`]s so the widget
//! behaves like a native split view: press inside to grab, release or leave
//! to let go, and the boundary follows the pointer 1:1 in between.

use crate::compare::{HorizontalBounds, PointerSource, SliderInput, SliderState};
use eframe::egui;

/// Active touch points in the order they started.
#[derive(Debug, Default)]
pub struct TouchTracker {
    ids: Vec<egui::TouchId>,
    xs: Vec<f32>,
}

impl TouchTracker {
    fn start(&mut self, id: egui::TouchId, x: f32) {
        if !self.ids.contains(&id) {
            self.ids.push(id);
            self.xs.push(x);
        }
    }

    fn update(&mut self, id: egui::TouchId, x: f32) -> bool {
        match self.ids.iter().position(|t| *t == id) {
            Some(i) => {
                self.xs[i] = x;
                true
            }
            None => false,
        }
    }

    fn end(&mut self, id: egui::TouchId) {
        if let Some(i) = self.ids.iter().position(|t| *t == id) {
            self.ids.remove(i);
            self.xs.remove(i);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    fn points(&self) -> &[f32] {
        &self.xs
    }
}

/// Feeds this frame's input events to `slider`.
///
/// Returns `true` if the boundary moved.
pub fn process_input_events(
    events: &[egui::Event],
    rect: egui::Rect,
    slider: &mut SliderState,
    touches: &mut TouchTracker,
) -> bool {
    let bounds = HorizontalBounds::new(rect.left(), rect.width());
    let mut moved = false;

    for event in events {
        match event {
            egui::Event::PointerButton {
                pos,
                button: egui::PointerButton::Primary,
                pressed: true,
                ..
            } if rect.contains(*pos) => {
                slider.handle(SliderInput::Press, bounds);
            }
            egui::Event::PointerButton {
                button: egui::PointerButton::Primary,
                pressed: false,
                ..
            } => {
                slider.handle(SliderInput::Release, bounds);
            }
            // Touch input is handled through the touch path below.
            egui::Event::PointerMoved(_) if !touches.is_empty() => {}
            egui::Event::PointerMoved(pos) if !rect.contains(*pos) => {
                slider.handle(SliderInput::Leave, bounds);
            }
            egui::Event::PointerMoved(pos) => {
                moved |= slider.handle(SliderInput::Move(PointerSource::Mouse { x: pos.x }), bounds);
            }
            egui::Event::PointerGone if touches.is_empty() => {
                slider.handle(SliderInput::Leave, bounds);
            }
            egui::Event::Touch { id, phase, pos, .. } => match phase {
                egui::TouchPhase::Start if rect.contains(*pos) => {
                    touches.start(*id, pos.x);
                    slider.handle(SliderInput::Press, bounds);
                }
                egui::TouchPhase::Start => {}
                egui::TouchPhase::Move => {
                    if touches.update(*id, pos.x) {
                        let source = PointerSource::Touch {
                            points: touches.points(),
                        };
                        moved |= slider.handle(SliderInput::Move(source), bounds);
                    }
                }
                egui::TouchPhase::End | egui::TouchPhase::Cancel => {
                    touches.end(*id);
                    if touches.is_empty() {
                        slider.handle(SliderInput::Release, bounds);
                    }
                }
            },
            _ => {}
        }
    }

    moved
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect() -> egui::Rect {
        egui::Rect::from_min_size(egui::pos2(100.0, 0.0), egui::vec2(200.0, 100.0))
    }

    fn button(x: f32, pressed: bool) -> egui::Event {
        egui::Event::PointerButton {
            pos: egui::pos2(x, 50.0),
            button: egui::PointerButton::Primary,
            pressed,
            modifiers: egui::Modifiers::NONE,
        }
    }

    fn moved(x: f32) -> egui::Event {
        egui::Event::PointerMoved(egui::pos2(x, 50.0))
    }

    fn touch(id: u64, phase: egui::TouchPhase, x: f32) -> egui::Event {
        egui::Event::Touch {
            device_id: egui::TouchDeviceId(0),
            id: egui::TouchId(id),
            phase,
            pos: egui::pos2(x, 50.0),
            force: None,
        }
    }

    #[test]
    fn press_drag_release() {
        let mut slider = SliderState::default();
        let mut touches = TouchTracker::default();

        let events = [button(150.0, true), moved(250.0), button(250.0, false), moved(120.0)];
        assert!(process_input_events(&events, rect(), &mut slider, &mut touches));
        assert_eq!(slider.position(), 75.0);
        assert!(!slider.is_dragging());
    }

    #[test]
    fn press_outside_does_not_grab() {
        let mut slider = SliderState::default();
        let mut touches = TouchTracker::default();

        let events = [button(50.0, true), moved(150.0)];
        assert!(!process_input_events(&events, rect(), &mut slider, &mut touches));
        assert_eq!(slider.position(), 50.0);
    }

    #[test]
    fn leaving_bounds_releases() {
        let mut slider = SliderState::default();
        let mut touches = TouchTracker::default();

        let events = [button(150.0, true), moved(500.0), moved(120.0)];
        assert!(!process_input_events(&events, rect(), &mut slider, &mut touches));
        assert!(!slider.is_dragging());
        assert_eq!(slider.position(), 50.0);
    }

    #[test]
    fn touch_follows_first_active_point() {
        let mut slider = SliderState::default();
        let mut touches = TouchTracker::default();

        let events = [
            touch(1, egui::TouchPhase::Start, 150.0),
            touch(2, egui::TouchPhase::Start, 280.0),
            touch(2, egui::TouchPhase::Move, 290.0),
            touch(1, egui::TouchPhase::Move, 140.0),
        ];
        process_input_events(&events, rect(), &mut slider, &mut touches);
        assert_eq!(slider.position(), 20.0);

        let end = [touch(1, egui::TouchPhase::End, 140.0), touch(2, egui::TouchPhase::End, 290.0)];
        process_input_events(&end, rect(), &mut slider, &mut touches);
        assert!(!slider.is_dragging());
        assert!(touches.is_empty());
    }
}
