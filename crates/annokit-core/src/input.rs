//! Semantic pointer events and the input state the engine tracks.

use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Mouse button identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// Modifier keys state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    /// Modifier that switches path drafts into vertex insert/delete mode.
    pub fn edit_vertices(&self) -> bool {
        self.alt
    }
}

/// Pointer events, already normalized to viewport coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PointerEvent {
    Down { position: Point, button: MouseButton },
    Up { position: Point, button: MouseButton },
    Move { position: Point },
    /// Positive `delta` zooms in.
    Wheel { position: Point, delta: f64 },
}

impl PointerEvent {
    pub fn position(&self) -> Point {
        match self {
            PointerEvent::Down { position, .. }
            | PointerEvent::Up { position, .. }
            | PointerEvent::Move { position }
            | PointerEvent::Wheel { position, .. } => *position,
        }
    }
}

/// Pointer and modifier state carried between events.
#[derive(Debug, Clone, Default)]
pub struct InputState {
    /// Last pointer position in viewport coordinates.
    pub cursor: Point,
    last_cursor: Point,
    held: HashSet<MouseButton>,
    pub modifiers: Modifiers,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, event: &PointerEvent) {
        self.last_cursor = self.cursor;
        self.cursor = event.position();
        match event {
            PointerEvent::Down { button, .. } => {
                self.held.insert(*button);
            }
            PointerEvent::Up { button, .. } => {
                self.held.remove(button);
            }
            PointerEvent::Move { .. } | PointerEvent::Wheel { .. } => {}
        }
    }

    pub fn is_held(&self, button: MouseButton) -> bool {
        self.held.contains(&button)
    }

    /// Pointer travel since the previous event.
    pub fn motion(&self) -> Vec2 {
        self.cursor - self.last_cursor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_right_drag_motion() {
        let mut input = InputState::new();
        input.record(&PointerEvent::Down {
            position: Point::new(10.0, 10.0),
            button: MouseButton::Right,
        });
        input.record(&PointerEvent::Move {
            position: Point::new(25.0, 5.0),
        });
        assert!(input.is_held(MouseButton::Right));
        assert!(!input.is_held(MouseButton::Left));
        assert_eq!(input.motion(), Vec2::new(15.0, -5.0));

        input.record(&PointerEvent::Up {
            position: Point::new(25.0, 5.0),
            button: MouseButton::Right,
        });
        assert!(!input.is_held(MouseButton::Right));
        assert_eq!(input.motion(), Vec2::ZERO);
    }

    #[test]
    fn test_pointer_event_json() {
        let event: PointerEvent = serde_json::from_str(
            r#"{ "type": "down", "position": { "x": 1.0, "y": 2.0 }, "button": "left" }"#,
        )
        .unwrap();
        assert_eq!(
            event,
            PointerEvent::Down {
                position: Point::new(1.0, 2.0),
                button: MouseButton::Left
            }
        );
    }
}
