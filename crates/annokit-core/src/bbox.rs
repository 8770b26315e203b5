//! Axis-aligned bounding boxes.

use kurbo::{Point, Rect};
use rstar::AABB;
use serde::{Deserialize, Serialize};

/// Axis-aligned box with `min_x <= max_x` and `min_y <= max_y`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BBox {
    /// Build a box from two corners in any order.
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self {
            min_x: x0.min(x1),
            min_y: y0.min(y1),
            max_x: x0.max(x1),
            max_y: y0.max(y1),
        }
    }

    /// Tightest box around a point set. `None` for an empty set.
    pub fn from_points(points: &[Point]) -> Option<Self> {
        let first = points.first()?;
        let mut bbox = Self::new(first.x, first.y, first.x, first.y);
        for p in &points[1..] {
            bbox.min_x = bbox.min_x.min(p.x);
            bbox.min_y = bbox.min_y.min(p.y);
            bbox.max_x = bbox.max_x.max(p.x);
            bbox.max_y = bbox.max_y.max(p.y);
        }
        Some(bbox)
    }

    /// The square `[point - threshold, point + threshold]`.
    pub fn around(point: Point, threshold: f64) -> Self {
        Self::new(
            point.x - threshold,
            point.y - threshold,
            point.x + threshold,
            point.y + threshold,
        )
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    pub fn union(&self, other: &BBox) -> BBox {
        BBox {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    /// Closed-interval overlap test; touching boxes intersect.
    pub fn intersects(&self, other: &BBox) -> bool {
        self.min_x <= other.max_x
            && other.min_x <= self.max_x
            && self.min_y <= other.max_y
            && other.min_y <= self.max_y
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.min_x && point.x <= self.max_x && point.y >= self.min_y && point.y <= self.max_y
    }

    /// Grow the box by `amount` on every side.
    pub fn inflate(&self, amount: f64) -> BBox {
        BBox::new(
            self.min_x - amount,
            self.min_y - amount,
            self.max_x + amount,
            self.max_y + amount,
        )
    }

    pub fn clamp_point(&self, point: Point) -> Point {
        Point::new(
            point.x.clamp(self.min_x, self.max_x),
            point.y.clamp(self.min_y, self.max_y),
        )
    }

    pub fn to_aabb(&self) -> AABB<[f64; 2]> {
        AABB::from_corners([self.min_x, self.min_y], [self.max_x, self.max_y])
    }

    pub fn to_rect(&self) -> Rect {
        Rect::new(self.min_x, self.min_y, self.max_x, self.max_y)
    }
}

impl From<Rect> for BBox {
    fn from(rect: Rect) -> Self {
        BBox::new(rect.x0, rect.y0, rect.x1, rect.y1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_normalizes_corners() {
        let bbox = BBox::new(10.0, 20.0, 0.0, 5.0);
        assert_eq!(bbox, BBox { min_x: 0.0, min_y: 5.0, max_x: 10.0, max_y: 20.0 });
    }

    #[test]
    fn test_from_points() {
        let bbox = BBox::from_points(&[
            Point::new(3.0, -1.0),
            Point::new(-2.0, 4.0),
            Point::new(1.0, 1.0),
        ])
        .unwrap();
        assert_eq!(bbox, BBox::new(-2.0, -1.0, 3.0, 4.0));
        assert!(BBox::from_points(&[]).is_none());
    }

    #[test]
    fn test_intersects_touching_edges() {
        let a = BBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BBox::new(10.0, 0.0, 20.0, 10.0);
        let c = BBox::new(10.1, 0.0, 20.0, 10.0);
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
    }

    #[test]
    fn test_union_and_center() {
        let a = BBox::new(0.0, 0.0, 2.0, 2.0);
        let b = BBox::new(4.0, -2.0, 6.0, 1.0);
        let u = a.union(&b);
        assert_eq!(u, BBox::new(0.0, -2.0, 6.0, 2.0));
        assert_eq!(u.center(), Point::new(3.0, 0.0));
    }

    #[test]
    fn test_clamp_point() {
        let bbox = BBox::new(0.0, 0.0, 100.0, 50.0);
        assert_eq!(bbox.clamp_point(Point::new(120.0, -5.0)), Point::new(100.0, 0.0));
    }
}
