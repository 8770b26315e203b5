//! Geometric primitives and the groups that compose them.

mod group;
mod style;

pub use group::{Group, GroupRole, GroupStore, OUTLINE, WidgetState};
pub(crate) use group::polygon_or_line;
pub use style::{SerializableColor, ShapeStyle};

use kurbo::{CubicBez, ParamCurveExtrema, ParamCurveNearest, Point};

use crate::axis::Axis;
use crate::bbox::BBox;
use crate::error::{EngineError, EngineResult};
use crate::geometry::{point_in_polygon, point_to_polyline_dist};
use crate::session::SessionContext;
use crate::spatial::{IndexEntry, IndexKey};

/// Accuracy for bezier nearest-point queries, in viewport pixels.
const CURVE_ACCURACY: f64 = 1e-3;

/// Geometry family of a shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShapeKind {
    /// A single dot drawn with `radius` viewport pixels.
    Point { radius: f64 },
    /// Open polyline.
    Line,
    /// Closed polygon, hit-tested with the even-odd rule.
    Polygon,
    /// One cubic segment: start, c1, c2, end.
    Bezier,
}

impl ShapeKind {
    fn name(&self) -> &'static str {
        match self {
            ShapeKind::Point { .. } => "point",
            ShapeKind::Line => "line",
            ShapeKind::Polygon => "polygon",
            ShapeKind::Bezier => "bezier",
        }
    }

    fn check_count(&self, count: usize) -> Result<(), &'static str> {
        let ok = match self {
            ShapeKind::Point { .. } => count == 1,
            ShapeKind::Line => count >= 2,
            ShapeKind::Polygon => count >= 3,
            ShapeKind::Bezier => count == 4,
        };
        if ok {
            return Ok(());
        }
        Err(match self {
            ShapeKind::Point { .. } => "exactly 1",
            ShapeKind::Line => "at least 2",
            ShapeKind::Polygon => "at least 3",
            ShapeKind::Bezier => "exactly 4",
        })
    }
}

/// A single primitive. Logical points are the source of truth; viewport
/// points and the bbox are derived from them and the current [`Axis`].
#[derive(Debug, Clone)]
pub struct Shape {
    id: String,
    kind: ShapeKind,
    logical: Vec<Point>,
    viewport: Vec<Point>,
    bbox: BBox,
    style: ShapeStyle,
    registration: Option<(String, GroupRole)>,
}

fn check_points(context: &str, points: &[Point]) -> EngineResult<()> {
    match points.iter().find(|p| !p.x.is_finite() || !p.y.is_finite()) {
        Some(p) => Err(EngineError::InvalidCoordinate {
            context: context.to_string(),
            x: p.x,
            y: p.y,
        }),
        None => Ok(()),
    }
}

impl Shape {
    pub fn new(
        id: impl Into<String>,
        kind: ShapeKind,
        points: Vec<Point>,
        style: ShapeStyle,
        axis: &Axis,
    ) -> EngineResult<Self> {
        let id = id.into();
        check_points(&id, &points)?;
        kind.check_count(points.len())
            .map_err(|expected| EngineError::PointCount {
                shape: format!("{} {}", kind.name(), id),
                expected: expected.to_string(),
                actual: points.len(),
            })?;
        let mut shape = Self {
            id,
            kind,
            logical: points,
            viewport: Vec::new(),
            bbox: BBox::default(),
            style,
            registration: None,
        };
        shape.recompute(axis);
        Ok(shape)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> ShapeKind {
        self.kind
    }

    pub fn logical(&self) -> &[Point] {
        &self.logical
    }

    pub fn viewport(&self) -> &[Point] {
        &self.viewport
    }

    pub fn bbox(&self) -> BBox {
        self.bbox
    }

    pub fn style(&self) -> &ShapeStyle {
        &self.style
    }

    pub fn is_registered(&self) -> bool {
        self.registration.is_some()
    }

    /// Replace every logical point, then recompute viewport points, bbox and
    /// the index entry.
    pub fn set_logical_coordinates(
        &mut self,
        points: Vec<Point>,
        ctx: &mut SessionContext,
    ) -> EngineResult<()> {
        check_points(&self.id, &points)?;
        self.kind
            .check_count(points.len())
            .map_err(|expected| EngineError::PointCount {
                shape: format!("{} {}", self.kind.name(), self.id),
                expected: expected.to_string(),
                actual: points.len(),
            })?;
        self.logical = points;
        self.recompute_and_reindex(ctx);
        Ok(())
    }

    /// Scoped mutation of the logical points; recomputes once afterwards.
    pub fn with_mutation<F>(&mut self, ctx: &mut SessionContext, f: F) -> EngineResult<()>
    where
        F: FnOnce(&mut Vec<Point>),
    {
        let mut points = self.logical.clone();
        f(&mut points);
        self.set_logical_coordinates(points, ctx)
    }

    pub fn set_point(&mut self, index: usize, point: Point, ctx: &mut SessionContext) -> EngineResult<()> {
        self.update_point(index, ctx, |p| *p = point)
    }

    pub fn set_x(&mut self, index: usize, x: f64, ctx: &mut SessionContext) -> EngineResult<()> {
        self.update_point(index, ctx, |p| p.x = x)
    }

    pub fn set_y(&mut self, index: usize, y: f64, ctx: &mut SessionContext) -> EngineResult<()> {
        self.update_point(index, ctx, |p| p.y = y)
    }

    fn update_point<F>(&mut self, index: usize, ctx: &mut SessionContext, f: F) -> EngineResult<()>
    where
        F: FnOnce(&mut Point),
    {
        if index >= self.logical.len() {
            return Err(EngineError::PointIndex {
                shape: self.id.clone(),
                index,
                len: self.logical.len(),
            });
        }
        self.with_mutation(ctx, |points| f(&mut points[index]))
    }

    pub fn set_style(&mut self, style: ShapeStyle, ctx: &mut SessionContext) {
        self.style = style;
        self.recompute_and_reindex(ctx);
    }

    /// Re-derive viewport points after the axis changed.
    pub fn sync_viewport(&mut self, ctx: &mut SessionContext) {
        self.recompute_and_reindex(ctx);
    }

    /// Register this shape in the index under `group`.
    pub fn attach(&mut self, group: &str, role: GroupRole, ctx: &mut SessionContext) {
        self.registration = Some((group.to_string(), role));
        self.reindex(ctx);
    }

    /// Remove this shape's index entry.
    pub fn detach(&mut self, ctx: &mut SessionContext) -> EngineResult<()> {
        if let Some((group, _)) = self.registration.take() {
            ctx.index.remove(&IndexKey::shape(group, self.id.clone()))?;
        }
        Ok(())
    }

    fn recompute(&mut self, axis: &Axis) {
        self.viewport = self.logical.iter().map(|p| axis.to_viewport(*p)).collect();
        self.bbox = self.compute_bbox();
    }

    fn recompute_and_reindex(&mut self, ctx: &mut SessionContext) {
        self.recompute(&ctx.axis);
        self.reindex(ctx);
        ctx.request_update();
    }

    fn reindex(&self, ctx: &mut SessionContext) {
        if let Some((group, role)) = &self.registration {
            ctx.index.insert(IndexEntry {
                bbox: self.bbox,
                key: IndexKey::shape(group.clone(), self.id.clone()),
                role: *role,
            });
        }
    }

    fn compute_bbox(&self) -> BBox {
        let half_stroke = self.style.stroke_width / 2.0;
        match self.kind {
            ShapeKind::Point { radius } => {
                BBox::around(self.viewport[0], radius + half_stroke)
            }
            ShapeKind::Bezier => BBox::from(self.cubic().bounding_box()).inflate(half_stroke),
            _ => BBox::from_points(&self.viewport)
                .unwrap_or_default()
                .inflate(half_stroke),
        }
    }

    /// The cubic segment of a bezier shape, in viewport space.
    pub fn cubic(&self) -> CubicBez {
        let p = &self.viewport;
        match self.kind {
            ShapeKind::Bezier => CubicBez::new(p[0], p[1], p[2], p[3]),
            _ => CubicBez::new(p[0], p[0], p[p.len() - 1], p[p.len() - 1]),
        }
    }

    /// Viewport-space edges; polygons are closed.
    pub fn edges(&self) -> Vec<(Point, Point)> {
        let pts = &self.viewport;
        let mut edges: Vec<(Point, Point)> = pts.windows(2).map(|w| (w[0], w[1])).collect();
        if self.kind == ShapeKind::Polygon && pts.len() > 2 {
            edges.push((pts[pts.len() - 1], pts[0]));
        }
        edges
    }

    /// Hit test against a viewport point with extra `tolerance` pixels.
    pub fn is_under_cursor(&self, point: Point, tolerance: f64) -> bool {
        let half_stroke = self.style.stroke_width / 2.0;
        match self.kind {
            ShapeKind::Point { radius } => {
                point.distance(self.viewport[0]) <= radius + half_stroke + tolerance
            }
            ShapeKind::Line => {
                point_to_polyline_dist(point, &self.viewport) <= half_stroke + tolerance
            }
            ShapeKind::Polygon => {
                point_in_polygon(point, &self.viewport)
                    || self
                        .edges()
                        .iter()
                        .any(|(a, b)| point_to_polyline_dist(point, &[*a, *b]) <= half_stroke + tolerance)
            }
            ShapeKind::Bezier => {
                let nearest = self.cubic().nearest(point, CURVE_ACCURACY);
                nearest.distance_sq.sqrt() <= half_stroke + tolerance
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> SessionContext {
        SessionContext::default()
    }

    fn style(width: f64) -> ShapeStyle {
        ShapeStyle {
            stroke_width: width,
            ..ShapeStyle::default()
        }
    }

    #[test]
    fn test_new_rejects_bad_coordinates() {
        let axis = Axis::default();
        let result = Shape::new(
            "p",
            ShapeKind::Line,
            vec![Point::new(0.0, 0.0), Point::new(f64::NAN, 1.0)],
            ShapeStyle::default(),
            &axis,
        );
        assert!(matches!(result, Err(EngineError::InvalidCoordinate { .. })));
    }

    #[test]
    fn test_new_rejects_wrong_point_count() {
        let axis = Axis::default();
        let result = Shape::new("b", ShapeKind::Bezier, vec![Point::ZERO], ShapeStyle::default(), &axis);
        assert!(matches!(result, Err(EngineError::PointCount { actual: 1, .. })));
    }

    #[test]
    fn test_bbox_tracks_axis_and_stroke() {
        let mut ctx = ctx();
        ctx.axis.scale = 2.0;
        let shape = Shape::new(
            "l",
            ShapeKind::Line,
            vec![Point::new(0.0, 0.0), Point::new(10.0, 5.0)],
            style(2.0),
            &ctx.axis,
        )
        .unwrap();
        assert_eq!(shape.bbox(), BBox::new(-1.0, -1.0, 21.0, 11.0));
        assert_eq!(shape.viewport()[1], Point::new(20.0, 10.0));
    }

    #[test]
    fn test_setters_reindex_registered_shape() {
        let mut ctx = ctx();
        let mut shape = Shape::new(
            "pt",
            ShapeKind::Point { radius: 2.0 },
            vec![Point::new(5.0, 5.0)],
            style(0.0),
            &ctx.axis,
        )
        .unwrap();
        shape.attach("g", GroupRole::Annotation, &mut ctx);
        shape.set_x(0, 50.0, &mut ctx).unwrap();
        shape.set_y(0, 60.0, &mut ctx).unwrap();

        let entry = ctx.index.get(&IndexKey::shape("g", "pt")).unwrap();
        assert_eq!(entry.bbox, BBox::new(48.0, 58.0, 52.0, 62.0));
        assert!(ctx.index.query_window(Point::new(5.0, 5.0), 1.0).is_empty());
        assert!(ctx.ticker.needs_update());

        shape.detach(&mut ctx).unwrap();
        assert!(ctx.index.is_empty());
    }

    #[test]
    fn test_point_setters_reject_out_of_range_index() {
        let mut ctx = ctx();
        let mut shape = Shape::new(
            "l",
            ShapeKind::Line,
            vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0)],
            style(0.0),
            &ctx.axis,
        )
        .unwrap();
        let result = shape.set_point(2, Point::new(5.0, 5.0), &mut ctx);
        assert!(matches!(result, Err(EngineError::PointIndex { index: 2, len: 2, .. })));
        assert!(shape.set_y(7, 1.0, &mut ctx).is_err());
        assert_eq!(shape.logical(), &[Point::new(0.0, 0.0), Point::new(10.0, 0.0)]);
    }

    #[test]
    fn test_polygon_hit_is_even_odd_plus_edges() {
        let axis = Axis::default();
        let shape = Shape::new(
            "poly",
            ShapeKind::Polygon,
            vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0), Point::new(10.0, 10.0), Point::new(0.0, 10.0)],
            style(2.0),
            &axis,
        )
        .unwrap();
        assert!(shape.is_under_cursor(Point::new(5.0, 5.0), 0.0));
        assert!(shape.is_under_cursor(Point::new(11.5, 5.0), 1.0));
        assert!(!shape.is_under_cursor(Point::new(14.0, 5.0), 1.0));
    }

    #[test]
    fn test_bezier_hit_and_bbox() {
        let axis = Axis::default();
        let shape = Shape::new(
            "b",
            ShapeKind::Bezier,
            vec![Point::new(0.0, 0.0), Point::new(0.0, 10.0), Point::new(10.0, 10.0), Point::new(10.0, 0.0)],
            style(0.0),
            &axis,
        )
        .unwrap();
        // The curve peaks at y = 7.5 at t = 0.5.
        assert!((shape.bbox().max_y - 7.5).abs() < 1e-6);
        assert!(shape.is_under_cursor(Point::new(5.0, 7.5), 0.5));
        assert!(!shape.is_under_cursor(Point::new(5.0, 0.0), 0.5));
    }
}
