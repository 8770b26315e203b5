//! Draggable control points and control edges.
//!
//! A handle never moves itself: it turns a cumulative pointer delta into a
//! proposed logical position and leaves it to the owning draft to decide
//! what actually changes.

mod set;

pub use set::{EditableHandleSet, HandleEvent, HandleLayer};

use kurbo::{Point, Vec2};

use crate::axis::Axis;

/// Shape id used for a handle's visual.
pub fn handle_shape_id(name: &impl std::fmt::Display) -> String {
    format!("handle:{name}")
}

/// A draggable point.
#[derive(Debug, Clone)]
pub struct ControlPoint<H> {
    pub handle: H,
    pub layer: HandleLayer,
    /// Refuses drags while set.
    pub disabled: bool,
    anchor: Option<Point>,
    hovered: bool,
}

impl<H: Copy> ControlPoint<H> {
    pub fn new(handle: H, layer: HandleLayer) -> Self {
        Self {
            handle,
            layer,
            disabled: false,
            anchor: None,
            hovered: false,
        }
    }

    /// Record the pre-drag viewport position.
    pub fn begin(&mut self, viewport: Point) {
        self.anchor = Some(viewport);
    }

    pub fn end(&mut self) {
        self.anchor = None;
    }

    pub fn is_dragging(&self) -> bool {
        self.anchor.is_some()
    }

    pub fn is_hovered(&self) -> bool {
        self.hovered
    }

    pub fn set_hovered(&mut self, hovered: bool) {
        self.hovered = hovered;
    }

    /// `anchor + delta` in logical space, clamped to the image unless
    /// `allow_out_of_image`. `None` when disabled or not dragging.
    pub fn drag(&self, delta: Vec2, axis: &Axis, allow_out_of_image: bool) -> Option<Point> {
        if self.disabled {
            return None;
        }
        let mut target = self.anchor? + delta;
        if !allow_out_of_image {
            target = axis.clamp_to_safe_zone(target);
        }
        Some(axis.to_logical(target))
    }
}

/// A draggable segment whose endpoints move together.
#[derive(Debug, Clone)]
pub struct ControlEdge<H> {
    pub handle: H,
    pub layer: HandleLayer,
    pub disabled: bool,
    anchor: Option<[Point; 2]>,
    hovered: bool,
}

impl<H: Copy> ControlEdge<H> {
    pub fn new(handle: H, layer: HandleLayer) -> Self {
        Self {
            handle,
            layer,
            disabled: false,
            anchor: None,
            hovered: false,
        }
    }

    /// Record the pre-drag viewport endpoints.
    pub fn begin(&mut self, viewport: [Point; 2]) {
        self.anchor = Some(viewport);
    }

    pub fn end(&mut self) {
        self.anchor = None;
    }

    pub fn is_dragging(&self) -> bool {
        self.anchor.is_some()
    }

    pub fn is_hovered(&self) -> bool {
        self.hovered
    }

    pub fn set_hovered(&mut self, hovered: bool) {
        self.hovered = hovered;
    }

    /// Both endpoints moved by `delta`, in logical space. When clamped, the
    /// delta is shortened so neither endpoint leaves the image.
    pub fn drag(&self, delta: Vec2, axis: &Axis, allow_out_of_image: bool) -> Option<[Point; 2]> {
        if self.disabled {
            return None;
        }
        let [a, b] = self.anchor?;
        let delta = if allow_out_of_image {
            delta
        } else {
            let bounds = axis.image_bounds();
            let clamp_axis = |d: f64, lo: f64, hi: f64| {
                if lo > hi { 0.0 } else { d.clamp(lo, hi) }
            };
            Vec2::new(
                clamp_axis(delta.x, bounds.min_x - a.x.min(b.x), bounds.max_x - a.x.max(b.x)),
                clamp_axis(delta.y, bounds.min_y - a.y.min(b.y), bounds.max_y - a.y.max(b.y)),
            )
        };
        Some([axis.to_logical(a + delta), axis.to_logical(b + delta)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Size;

    fn axis() -> Axis {
        Axis::fit(Size::new(100.0, 100.0), Size::new(100.0, 100.0))
    }

    #[test]
    fn test_point_drag_is_anchor_plus_delta() {
        let mut cp = ControlPoint::new(0u8, HandleLayer::Handles);
        assert!(cp.drag(Vec2::new(1.0, 1.0), &axis(), false).is_none());
        cp.begin(Point::new(10.0, 10.0));
        assert_eq!(cp.drag(Vec2::new(5.0, -3.0), &axis(), false), Some(Point::new(15.0, 7.0)));
    }

    #[test]
    fn test_point_drag_clamps_unless_allowed() {
        let mut cp = ControlPoint::new(0u8, HandleLayer::Handles);
        cp.begin(Point::new(90.0, 10.0));
        assert_eq!(cp.drag(Vec2::new(50.0, 0.0), &axis(), false), Some(Point::new(100.0, 10.0)));
        assert_eq!(cp.drag(Vec2::new(50.0, 0.0), &axis(), true), Some(Point::new(140.0, 10.0)));
    }

    #[test]
    fn test_disabled_point_is_noop() {
        let mut cp = ControlPoint::new(0u8, HandleLayer::Handles);
        cp.disabled = true;
        cp.begin(Point::new(10.0, 10.0));
        assert!(cp.drag(Vec2::new(5.0, 5.0), &axis(), false).is_none());
    }

    #[test]
    fn test_edge_drag_keeps_length_when_clamped() {
        let mut edge = ControlEdge::new(0u8, HandleLayer::Handles);
        edge.begin([Point::new(80.0, 10.0), Point::new(90.0, 20.0)]);
        let [a, b] = edge.drag(Vec2::new(30.0, 5.0), &axis(), false).unwrap();
        assert_eq!(a, Point::new(90.0, 15.0));
        assert_eq!(b, Point::new(100.0, 25.0));
    }
}
