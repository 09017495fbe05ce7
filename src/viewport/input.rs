//! Pointer and wheel handling for a viewport's drawing surface.
//!
//! Coordinates are in surface pixels. Wheel deltas follow the DOM convention:
//! positive `delta_y` scrolls down, which moves the camera away.

use glam::Vec2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down { x: f32, y: f32 },
    Move { x: f32, y: f32 },
    Up,
    Leave,
}

/// One frame of host pointer state for a surface, in surface-local
/// coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PointerSample {
    pub pos: Option<Vec2>,
    pub inside: bool,
    pub drag_started: bool,
    pub dragged: bool,
    pub drag_stopped: bool,
}

impl PointerSample {
    /// Maps the host's gesture flags to at most one event. Leaving the surface
    /// ends a drag even while the host still reports the button held; later
    /// moves are ignored until the next press.
    pub fn to_event(self, dragging: bool) -> Option<PointerEvent> {
        match self.pos {
            Some(p) if self.drag_started && self.inside => Some(PointerEvent::Down { x: p.x, y: p.y }),
            _ if self.drag_stopped => Some(PointerEvent::Up),
            _ if dragging && !self.inside => Some(PointerEvent::Leave),
            Some(p) if dragging && self.dragged => Some(PointerEvent::Move { x: p.x, y: p.y }),
            _ => None,
        }
    }
}

/// Mesh rotation increment produced by a drag step (radians).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationDelta {
    pub yaw: f32,
    pub pitch: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelOutcome {
    /// Multiplier for the camera distance.
    pub zoom_factor: f32,
    /// The host must suppress its default scroll for this event.
    pub prevent_default: bool,
}

#[derive(Debug, Clone)]
pub struct InputController {
    dragging: bool,
    last: Vec2,
    rotate_sensitivity: f32,
    zoom_sensitivity: f32,
}

impl InputController {
    pub fn new(rotate_sensitivity: f32, zoom_sensitivity: f32) -> Self {
        Self {
            dragging: false,
            last: Vec2::ZERO,
            rotate_sensitivity,
            zoom_sensitivity,
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    pub fn pointer(&mut self, event: PointerEvent) -> Option<RotationDelta> {
        match event {
            PointerEvent::Down { x, y } => {
                self.dragging = true;
                self.last = Vec2::new(x, y);
                None
            }
            PointerEvent::Move { x, y } if self.dragging => {
                let pos = Vec2::new(x, y);
                let delta = pos - self.last;
                self.last = pos;
                Some(RotationDelta {
                    yaw: delta.x * self.rotate_sensitivity,
                    pitch: delta.y * self.rotate_sensitivity,
                })
            }
            PointerEvent::Move { .. } => None,
            // Ends the drag even mid-gesture so it cannot stick.
            PointerEvent::Up | PointerEvent::Leave => {
                self.dragging = false;
                None
            }
        }
    }

    pub fn wheel(&mut self, delta_y: f32) -> WheelOutcome {
        WheelOutcome {
            zoom_factor: 1.0 + delta_y.signum() * delta_y.abs() * self.zoom_sensitivity,
            prevent_default: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn move_without_press_does_nothing() {
        let mut input = InputController::new(0.01, 0.0005);
        assert_eq!(input.pointer(PointerEvent::Move { x: 10.0, y: 10.0 }), None);
    }

    #[test]
    fn drag_converts_deltas() {
        let mut input = InputController::new(0.01, 0.0005);
        input.pointer(PointerEvent::Down { x: 100.0, y: 100.0 });
        let d = input.pointer(PointerEvent::Move { x: 110.0, y: 95.0 }).unwrap();
        assert_relative_eq!(d.yaw, 0.1, epsilon = 1e-6);
        assert_relative_eq!(d.pitch, -0.05, epsilon = 1e-6);
        let d = input.pointer(PointerEvent::Move { x: 110.0, y: 105.0 }).unwrap();
        assert_relative_eq!(d.yaw, 0.0, epsilon = 1e-6);
        assert_relative_eq!(d.pitch, 0.1, epsilon = 1e-6);
    }

    #[test]
    fn leave_ends_drag() {
        let mut input = InputController::new(0.01, 0.0005);
        input.pointer(PointerEvent::Down { x: 0.0, y: 0.0 });
        input.pointer(PointerEvent::Leave);
        assert!(!input.is_dragging());
        assert_eq!(input.pointer(PointerEvent::Move { x: 5.0, y: 5.0 }), None);
    }

    #[test]
    fn wheel_direction() {
        let mut input = InputController::new(0.01, 0.0005);
        let out = input.wheel(100.0);
        assert_relative_eq!(out.zoom_factor, 1.05, epsilon = 1e-6);
        assert!(out.prevent_default);
        assert_relative_eq!(input.wheel(-100.0).zoom_factor, 0.95, epsilon = 1e-6);
        assert_relative_eq!(input.wheel(0.0).zoom_factor, 1.0, epsilon = 1e-6);
    }
}
