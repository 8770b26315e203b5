//! Pure geometry helpers: distances, containment, hulls and polygon booleans.

use cavalier_contours::polyline::{BooleanOp, PlineSource, PlineSourceMut, PlineVertex, Polyline};
use kurbo::{CubicBez, ParamCurve, Point, Vec2};

/// Areas below this are treated as empty.
pub const AREA_EPSILON: f64 = 1e-6;

/// Tension used for Catmull-Rom tangents.
pub const CATMULL_ROM_TENSION: f64 = 0.5;

/// Closest point to `point` on the segment `a -> b`.
///
/// Returns `a` when the projection parameter is below 0, `b` when it is
/// above 1, and the perpendicular foot otherwise.
pub fn nearest_point_on_segment(point: Point, a: Point, b: Point) -> Point {
    let seg = b - a;
    let len_sq = seg.hypot2();
    if len_sq < f64::EPSILON {
        return a;
    }
    let t = (point - a).dot(seg) / len_sq;
    if t < 0.0 {
        a
    } else if t > 1.0 {
        b
    } else {
        a + seg * t
    }
}

/// Distance from a point to a line segment (a -> b).
pub fn point_to_segment_dist(point: Point, a: Point, b: Point) -> f64 {
    point.distance(nearest_point_on_segment(point, a, b))
}

/// Minimum distance from a point to a polyline (sequence of connected segments).
pub fn point_to_polyline_dist(point: Point, points: &[Point]) -> f64 {
    match points.len() {
        0 => f64::INFINITY,
        1 => point.distance(points[0]),
        _ => points
            .windows(2)
            .map(|w| point_to_segment_dist(point, w[0], w[1]))
            .fold(f64::INFINITY, f64::min),
    }
}

/// Even-odd point-in-polygon test. The polygon is implicitly closed.
pub fn point_in_polygon(point: Point, polygon: &[Point]) -> bool {
    if polygon.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let pi = polygon[i];
        let pj = polygon[j];
        if (pi.y > point.y) != (pj.y > point.y) {
            let x_cross = (pj.x - pi.x) * (point.y - pi.y) / (pj.y - pi.y) + pi.x;
            if point.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Shoelace area; positive for counter-clockwise winding in a y-up frame.
pub fn polygon_signed_area(polygon: &[Point]) -> f64 {
    if polygon.len() < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..polygon.len() {
        let a = polygon[i];
        let b = polygon[(i + 1) % polygon.len()];
        sum += a.x * b.y - b.x * a.y;
    }
    sum / 2.0
}

pub fn polygon_area(polygon: &[Point]) -> f64 {
    polygon_signed_area(polygon).abs()
}

/// Convex hull (monotone chain). Collinear points are dropped.
pub fn convex_hull(points: &[Point]) -> Vec<Point> {
    let mut pts: Vec<Point> = points.to_vec();
    pts.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    pts.dedup();
    if pts.len() < 3 {
        return pts;
    }

    fn cross(o: Point, a: Point, b: Point) -> f64 {
        (a - o).cross(b - o)
    }

    let mut lower: Vec<Point> = Vec::with_capacity(pts.len());
    for &p in &pts {
        while lower.len() >= 2 && cross(lower[lower.len() - 2], lower[lower.len() - 1], p) <= 0.0 {
            lower.pop();
        }
        lower.push(p);
    }
    let mut upper: Vec<Point> = Vec::with_capacity(pts.len());
    for &p in pts.iter().rev() {
        while upper.len() >= 2 && cross(upper[upper.len() - 2], upper[upper.len() - 1], p) <= 0.0 {
            upper.pop();
        }
        upper.push(p);
    }
    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}

pub fn midpoint(a: Point, b: Point) -> Point {
    a.midpoint(b)
}

/// Catmull-Rom control points for the segments of a path through `points`.
///
/// The result holds two entries per segment: `[c1, c2]` of segment 0, then
/// segment 1, and so on. Closed paths get one extra segment back to the start.
pub fn catmull_rom_controls(points: &[Point], closed: bool) -> Vec<Point> {
    let n = points.len();
    if n < 2 {
        return Vec::new();
    }
    let segments = if closed { n } else { n - 1 };
    let at = |i: isize| -> Point {
        if closed {
            points[i.rem_euclid(n as isize) as usize]
        } else {
            points[i.clamp(0, n as isize - 1) as usize]
        }
    };
    let mut controls = Vec::with_capacity(segments * 2);
    for s in 0..segments as isize {
        let p0 = at(s - 1);
        let p1 = at(s);
        let p2 = at(s + 1);
        let p3 = at(s + 2);
        let t1 = (p2 - p0) * CATMULL_ROM_TENSION;
        let t2 = (p3 - p1) * CATMULL_ROM_TENSION;
        controls.push(p1 + t1 / 3.0);
        controls.push(p2 - t2 / 3.0);
    }
    controls
}

/// Sample a cubic into `steps` straight pieces, excluding the start point.
pub fn flatten_cubic(curve: &CubicBez, steps: usize) -> Vec<Point> {
    let steps = steps.max(1);
    (1..=steps)
        .map(|i| curve.eval(i as f64 / steps as f64))
        .collect()
}

/// Translate every point by `delta`.
pub fn translate_points(points: &[Point], delta: Vec2) -> Vec<Point> {
    points.iter().map(|p| *p + delta).collect()
}

fn to_polyline(polygon: &[Point]) -> Polyline<f64> {
    let mut pline = Polyline::new();
    for p in polygon {
        pline.add_vertex(PlineVertex::new(p.x, p.y, 0.0));
    }
    pline.set_is_closed(true);
    if pline.area() < 0.0 {
        pline.invert_direction_mut();
    }
    pline
}

fn from_polyline(pline: &Polyline<f64>) -> Vec<Point> {
    let mut points: Vec<Point> = Vec::with_capacity(pline.vertex_data.len());
    for v in &pline.vertex_data {
        let p = Point::new(v.x, v.y);
        if points.last().is_some_and(|last| last.distance(p) < 1e-9) {
            continue;
        }
        points.push(p);
    }
    if points.len() > 1 && points[0].distance(points[points.len() - 1]) < 1e-9 {
        points.pop();
    }
    points
}

/// Subtract every polygon in `cutters` from `subject`.
///
/// Returns the outer boundaries of the surviving pieces. Holes produced by a
/// cutter lying strictly inside the subject are not representable as a plain
/// vertex list and are dropped. An empty result means nothing survived.
pub fn polygon_difference(subject: &[Point], cutters: &[Vec<Point>]) -> Vec<Vec<Point>> {
    if subject.len() < 3 {
        return Vec::new();
    }
    let mut pieces = vec![to_polyline(subject)];
    for cutter in cutters.iter().filter(|c| c.len() >= 3) {
        let cutter = to_polyline(cutter);
        let mut next = Vec::with_capacity(pieces.len());
        for piece in &pieces {
            let result = piece.boolean(&cutter, BooleanOp::Not);
            for rp in result.pos_plines {
                if rp.pline.area().abs() > AREA_EPSILON {
                    next.push(rp.pline);
                }
            }
        }
        pieces = next;
        if pieces.is_empty() {
            break;
        }
    }
    pieces
        .iter()
        .map(from_polyline)
        .filter(|p| p.len() >= 3)
        .collect()
}
