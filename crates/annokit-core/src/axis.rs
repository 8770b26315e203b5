//! Coordinate transforms between source-image, logical and viewport space.

use crate::bbox::BBox;
use crate::config::{DEFAULT_MAX_SCALE, DEFAULT_MIN_SCALE};
use kurbo::{Affine, Point, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Pan/zoom state plus the fixed fit of the source image into logical space.
///
/// Logical points are `source * initial_scale + initial_offset`; viewport
/// points are `logical * scale + offset`. The initial pair never changes
/// after construction, so persisted coordinates are independent of the view.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Axis {
    /// Current translation (pan)
    pub offset: Vec2,
    /// Current zoom scale
    pub scale: f64,
    pub min_scale: f64,
    pub max_scale: f64,
    /// Fit translation of the source image
    pub initial_offset: Vec2,
    /// Fit scale of the source image
    pub initial_scale: f64,
    /// Source image size in pixels
    pub image_size: Size,
}

impl Default for Axis {
    fn default() -> Self {
        Self {
            offset: Vec2::ZERO,
            scale: 1.0,
            min_scale: DEFAULT_MIN_SCALE,
            max_scale: DEFAULT_MAX_SCALE,
            initial_offset: Vec2::ZERO,
            initial_scale: 1.0,
            image_size: Size::ZERO,
        }
    }
}

impl Axis {
    /// Fit `image_size` into `viewport` (centered, aspect preserved).
    pub fn fit(image_size: Size, viewport: Size) -> Self {
        let mut axis = Self {
            image_size,
            ..Self::default()
        };
        if image_size.width <= 0.0 || image_size.height <= 0.0 {
            return axis;
        }
        let scale = (viewport.width / image_size.width).min(viewport.height / image_size.height);
        let scale = if scale.is_finite() && scale > 0.0 { scale } else { 1.0 };
        axis.initial_scale = scale;
        axis.initial_offset = Vec2::new(
            (viewport.width - image_size.width * scale) / 2.0,
            (viewport.height - image_size.height * scale) / 2.0,
        );
        axis
    }

    /// Replace the zoom bounds, clamping the current scale into them.
    pub fn with_scale_bounds(mut self, min_scale: f64, max_scale: f64) -> Self {
        self.min_scale = min_scale;
        self.max_scale = max_scale;
        self.scale = self.scale.clamp(min_scale, max_scale);
        self
    }

    /// Logical -> viewport transform.
    pub fn transform(&self) -> Affine {
        Affine::translate(self.offset) * Affine::scale(self.scale)
    }

    /// Viewport -> logical transform.
    pub fn inverse_transform(&self) -> Affine {
        Affine::scale(1.0 / self.scale) * Affine::translate(-self.offset)
    }

    /// Source -> logical transform.
    pub fn source_transform(&self) -> Affine {
        Affine::translate(self.initial_offset) * Affine::scale(self.initial_scale)
    }

    pub fn to_viewport(&self, logical: Point) -> Point {
        self.transform() * logical
    }

    pub fn to_logical(&self, viewport: Point) -> Point {
        self.inverse_transform() * viewport
    }

    pub fn to_logical_from_source(&self, source: Point) -> Point {
        self.source_transform() * source
    }

    pub fn to_source_from_logical(&self, logical: Point) -> Point {
        Affine::scale(1.0 / self.initial_scale) * Affine::translate(-self.initial_offset) * logical
    }

    /// Viewport delta -> logical delta.
    pub fn to_logical_delta(&self, delta: Vec2) -> Vec2 {
        delta / self.scale
    }

    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.offset += Vec2::new(dx, dy);
    }

    /// Zoom about `viewport_point`, keeping that point fixed on screen.
    ///
    /// Returns `false` and leaves the state untouched when the resulting
    /// scale would fall outside `[min_scale, max_scale]`.
    pub fn zoom_at(&mut self, viewport_point: Point, factor: f64) -> bool {
        if !factor.is_finite() || factor <= 0.0 {
            return false;
        }
        let new_scale = self.scale * factor;
        if new_scale < self.min_scale || new_scale > self.max_scale {
            log::debug!("zoom factor {factor} rejected at scale {}", self.scale);
            return false;
        }

        let logical = self.to_logical(viewport_point);
        self.scale = new_scale;
        let moved = self.to_viewport(logical);
        self.offset += viewport_point - moved;
        true
    }

    /// The image's current viewport bounding box.
    pub fn image_bounds(&self) -> BBox {
        let origin = self.to_viewport(self.to_logical_from_source(Point::ZERO));
        let corner = self.to_viewport(
            self.to_logical_from_source(Point::new(self.image_size.width, self.image_size.height)),
        );
        BBox::new(origin.x, origin.y, corner.x, corner.y)
    }

    /// Clamp a viewport point into the image bounds.
    pub fn clamp_to_safe_zone(&self, point: Point) -> Point {
        self.image_bounds().clamp_point(point)
    }

    pub fn is_within_safe_zone(&self, points: &[Point]) -> bool {
        let bounds = self.image_bounds();
        points.iter().all(|p| bounds.contains(*p))
    }

    /// Back to the fitted view.
    pub fn reset(&mut self) {
        self.offset = Vec2::ZERO;
        self.scale = 1.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn assert_close(a: Point, b: Point) {
        assert!((a.x - b.x).abs() < EPS, "{a:?} != {b:?}");
        assert!((a.y - b.y).abs() < EPS, "{a:?} != {b:?}");
    }

    #[test]
    fn test_fit_centers_image() {
        let axis = Axis::fit(Size::new(200.0, 100.0), Size::new(400.0, 400.0));
        assert!((axis.initial_scale - 2.0).abs() < EPS);
        assert!((axis.initial_offset.y - 100.0).abs() < EPS);
        let bounds = axis.image_bounds();
        assert_eq!(bounds, BBox::new(0.0, 100.0, 400.0, 300.0));
    }

    #[test]
    fn test_viewport_round_trip() {
        let mut axis = Axis::fit(Size::new(640.0, 480.0), Size::new(800.0, 600.0));
        axis.pan(37.5, -12.25);
        assert!(axis.zoom_at(Point::new(100.0, 80.0), 2.5));
        for p in [Point::new(0.0, 0.0), Point::new(-13.7, 999.1), Point::new(321.0, 0.5)] {
            assert_close(axis.to_logical(axis.to_viewport(p)), p);
        }
    }

    #[test]
    fn test_source_round_trip() {
        let axis = Axis::fit(Size::new(1920.0, 1080.0), Size::new(800.0, 600.0));
        let p = Point::new(1234.5, 77.0);
        assert_close(axis.to_source_from_logical(axis.to_logical_from_source(p)), p);
    }

    #[test]
    fn test_zoom_keeps_anchor_fixed() {
        let mut axis = Axis::default();
        axis.pan(10.0, 20.0);
        let anchor = Point::new(150.0, 90.0);
        let logical = axis.to_logical(anchor);
        assert!(axis.zoom_at(anchor, 1.1));
        assert_close(axis.to_viewport(logical), anchor);
    }

    #[test]
    fn test_zoom_out_of_bounds_rejected() {
        let mut axis = Axis::default();
        let before = axis.clone();
        assert!(!axis.zoom_at(Point::new(10.0, 10.0), 25.0));
        assert!(!axis.zoom_at(Point::new(10.0, 10.0), 0.05));
        assert_eq!(axis.offset, before.offset);
        assert!((axis.scale - before.scale).abs() < EPS);
    }

    #[test]
    fn test_clamp_to_safe_zone() {
        let axis = Axis::fit(Size::new(100.0, 100.0), Size::new(100.0, 100.0));
        assert_close(axis.clamp_to_safe_zone(Point::new(-5.0, 150.0)), Point::new(0.0, 100.0));
        assert!(axis.is_within_safe_zone(&[Point::new(1.0, 1.0), Point::new(99.0, 50.0)]));
        assert!(!axis.is_within_safe_zone(&[Point::new(101.0, 1.0)]));
    }
}
