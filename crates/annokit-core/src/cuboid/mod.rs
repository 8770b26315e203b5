//! Cuboid topology, pure plane helpers and the perspective solver.

pub mod relations;

use std::fmt;

use kurbo::Point;

use crate::annotation::{CuboidData, CuboidDirection, CuboidPlane};
use crate::geometry::convex_hull;
use relations::{Affect, Field, HSide, Part, SKELETON_CONNECTORS, SKELETON_EDGES, VSide};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Plane {
    Front,
    Back,
}

/// Corner of a plane; also names the connector joining the two planes there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Corner {
    Tl,
    Tr,
    Br,
    Bl,
}

impl Corner {
    pub const ALL: [Corner; 4] = [Corner::Tl, Corner::Tr, Corner::Br, Corner::Bl];

    pub fn as_str(&self) -> &'static str {
        match self {
            Corner::Tl => "tl",
            Corner::Tr => "tr",
            Corner::Br => "br",
            Corner::Bl => "bl",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CuboidVertex {
    FrontTl,
    FrontTr,
    FrontBr,
    FrontBl,
    BackTl,
    BackTr,
    BackBr,
    BackBl,
}

impl CuboidVertex {
    pub const ALL: [CuboidVertex; 8] = [
        CuboidVertex::FrontTl,
        CuboidVertex::FrontTr,
        CuboidVertex::FrontBr,
        CuboidVertex::FrontBl,
        CuboidVertex::BackTl,
        CuboidVertex::BackTr,
        CuboidVertex::BackBr,
        CuboidVertex::BackBl,
    ];

    /// Position in [`CuboidSkeleton::vertices`].
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn plane(self) -> Plane {
        if self.index() < 4 { Plane::Front } else { Plane::Back }
    }

    pub fn corner(self) -> Corner {
        Corner::ALL[self.index() % 4]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CuboidEdge {
    FrontTop,
    FrontRight,
    FrontBottom,
    FrontLeft,
    BackTop,
    BackRight,
    BackBottom,
    BackLeft,
}

impl CuboidEdge {
    pub const ALL: [CuboidEdge; 8] = [
        CuboidEdge::FrontTop,
        CuboidEdge::FrontRight,
        CuboidEdge::FrontBottom,
        CuboidEdge::FrontLeft,
        CuboidEdge::BackTop,
        CuboidEdge::BackRight,
        CuboidEdge::BackBottom,
        CuboidEdge::BackLeft,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Back-bottom is drawn but never dragged.
    pub fn is_draggable(self) -> bool {
        self != CuboidEdge::BackBottom
    }

    fn name(self) -> &'static str {
        match self {
            CuboidEdge::FrontTop => "front-top",
            CuboidEdge::FrontRight => "front-right",
            CuboidEdge::FrontBottom => "front-bottom",
            CuboidEdge::FrontLeft => "front-left",
            CuboidEdge::BackTop => "back-top",
            CuboidEdge::BackRight => "back-right",
            CuboidEdge::BackBottom => "back-bottom",
            CuboidEdge::BackLeft => "back-left",
        }
    }
}

/// Identity of a cuboid handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CuboidHandle {
    Vertex(CuboidVertex),
    Edge(CuboidEdge),
}

impl CuboidHandle {
    /// Every handle with drag semantics: eight vertices and seven edges.
    pub fn draggable() -> impl Iterator<Item = CuboidHandle> {
        CuboidVertex::ALL
            .into_iter()
            .map(CuboidHandle::Vertex)
            .chain(
                CuboidEdge::ALL
                    .into_iter()
                    .filter(|e| e.is_draggable())
                    .map(CuboidHandle::Edge),
            )
    }
}

impl fmt::Display for CuboidHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CuboidHandle::Vertex(v) => {
                let plane = match v.plane() {
                    Plane::Front => "front",
                    Plane::Back => "back",
                };
                write!(f, "{plane}-{}", v.corner().as_str())
            }
            CuboidHandle::Edge(e) => write!(f, "edge-{}", e.name()),
        }
    }
}

/// Width, height and center of a plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneInfo {
    pub width: f64,
    pub height: f64,
    pub center: Point,
}

/// `width = tr.x - tl.x`, `height = br.y - tr.y`, center at mid(tl, br).
pub fn plane_basic_info(tl: Point, tr: Point, br: Point) -> PlaneInfo {
    PlaneInfo {
        width: tr.x - tl.x,
        height: br.y - tr.y,
        center: tl.midpoint(br),
    }
}

fn plane_info(plane: &CuboidPlane) -> PlaneInfo {
    plane_basic_info(plane.tl, plane.tr, plane.br)
}

/// The back center lies strictly inside the front's extent on both axes.
pub fn is_nested(front: &CuboidPlane, back: &CuboidPlane) -> bool {
    let center = plane_info(back).center;
    let xs = front.points().map(|p| p.x);
    let ys = front.points().map(|p| p.y);
    let (min_x, max_x) = (xs.iter().copied().fold(f64::INFINITY, f64::min), xs.iter().copied().fold(f64::NEG_INFINITY, f64::max));
    let (min_y, max_y) = (ys.iter().copied().fold(f64::INFINITY, f64::min), ys.iter().copied().fold(f64::NEG_INFINITY, f64::max));
    center.x > min_x && center.x < max_x && center.y > min_y && center.y < max_y
}

/// Hover outline: the front quad when nested, else the hull of all eight
/// vertices.
pub fn hover_outline(front: &CuboidPlane, back: &CuboidPlane) -> Vec<Point> {
    if is_nested(front, back) {
        return front.points().to_vec();
    }
    let all: Vec<Point> = front.points().into_iter().chain(back.points()).collect();
    convex_hull(&all)
}

/// The four vertices of the face `direction` selects, in drawing order.
pub fn face_vertices(front: &CuboidPlane, back: &CuboidPlane, direction: CuboidDirection) -> [Point; 4] {
    let (f, b) = (front, back);
    match direction {
        CuboidDirection::Front => [f.tl, f.tr, f.br, f.bl],
        CuboidDirection::Back => [b.tl, b.tr, b.br, b.bl],
        CuboidDirection::Left => [b.tl, f.tl, f.bl, b.bl],
        CuboidDirection::Right => [f.tr, b.tr, b.br, f.br],
        CuboidDirection::Top => [b.tl, b.tr, f.tr, f.tl],
        CuboidDirection::Bottom => [f.bl, f.br, b.br, b.bl],
    }
}

/// Swap left/right and top/bottom of a plane dragged inside out.
/// Returns the fixed plane and whether anything changed.
pub fn normalize_plane(plane: &CuboidPlane) -> (CuboidPlane, bool) {
    let mut p = *plane;
    let mut changed = false;
    if p.tl.x > p.tr.x {
        std::mem::swap(&mut p.tl, &mut p.tr);
        std::mem::swap(&mut p.bl, &mut p.br);
        changed = true;
    }
    if p.tl.y > p.bl.y {
        std::mem::swap(&mut p.tl, &mut p.bl);
        std::mem::swap(&mut p.tr, &mut p.br);
        changed = true;
    }
    (p, changed)
}

/// Normalise both planes; `true` when the record needs a rebuild.
pub fn normalize(data: &mut CuboidData) -> bool {
    let (front, front_changed) = normalize_plane(&data.front);
    let (back, back_changed) = normalize_plane(&data.back);
    data.front = front;
    data.back = back;
    front_changed || back_changed
}

/// Working geometry of a cuboid draft: eight vertices plus the endpoints
/// of every edge and connector.
#[derive(Debug, Clone, PartialEq)]
pub struct CuboidSkeleton {
    pub vertices: [Point; 8],
    pub edges: [[Point; 2]; 8],
    pub connectors: [[Point; 2]; 4],
}

fn write_field(target: &mut Point, value: Point, field: Field) {
    match field {
        Field::X => target.x = value.x,
        Field::Y => target.y = value.y,
        Field::XY => *target = value,
    }
}

impl CuboidSkeleton {
    pub fn from_planes(front: &CuboidPlane, back: &CuboidPlane) -> Self {
        let [ftl, ftr, fbr, fbl] = front.points();
        let [btl, btr, bbr, bbl] = back.points();
        let mut skeleton = Self {
            vertices: [ftl, ftr, fbr, fbl, btl, btr, bbr, bbl],
            edges: [[Point::ZERO; 2]; 8],
            connectors: [[Point::ZERO; 2]; 4],
        };
        skeleton.reset_from_vertices();
        skeleton
    }

    pub fn vertex(&self, vertex: CuboidVertex) -> Point {
        self.vertices[vertex.index()]
    }

    pub fn edge(&self, edge: CuboidEdge) -> [Point; 2] {
        self.edges[edge.index()]
    }

    pub fn connector(&self, corner: Corner) -> [Point; 2] {
        self.connectors[corner as usize]
    }

    pub fn front(&self) -> CuboidPlane {
        CuboidPlane::from_points([self.vertices[0], self.vertices[1], self.vertices[2], self.vertices[3]])
    }

    pub fn back(&self) -> CuboidPlane {
        CuboidPlane::from_points([self.vertices[4], self.vertices[5], self.vertices[6], self.vertices[7]])
    }

    fn plane_height(&self, plane: Plane) -> f64 {
        match plane {
            Plane::Front => self.vertex(CuboidVertex::FrontBl).y - self.vertex(CuboidVertex::FrontTl).y,
            Plane::Back => self.vertex(CuboidVertex::BackBl).y - self.vertex(CuboidVertex::BackTl).y,
        }
    }

    fn plane_width(&self, plane: Plane) -> f64 {
        match plane {
            Plane::Front => self.vertex(CuboidVertex::FrontTr).x - self.vertex(CuboidVertex::FrontTl).x,
            Plane::Back => self.vertex(CuboidVertex::BackTr).x - self.vertex(CuboidVertex::BackTl).x,
        }
    }

    pub fn front_height(&self) -> f64 {
        self.plane_height(Plane::Front)
    }

    pub fn back_height(&self) -> f64 {
        self.plane_height(Plane::Back)
    }

    /// Write `value` into every point the handle's relation table names.
    pub fn apply_relations(&mut self, handle: CuboidHandle, value: Point) {
        for Affect { target, index, field } in relations::relations_for(handle) {
            let point = match target {
                Part::Vertex(v) => &mut self.vertices[v.index()],
                Part::Edge(e) => &mut self.edges[e.index()][*index],
                Part::Connector(c) => &mut self.connectors[*c as usize][*index],
            };
            write_field(point, value, *field);
        }
    }

    /// Re-derive every edge and connector from the vertices.
    pub fn reset_from_vertices(&mut self) {
        for (edge, [a, b]) in SKELETON_EDGES {
            self.edges[edge.index()] = [self.vertex(a), self.vertex(b)];
        }
        for (corner, [a, b]) in SKELETON_CONNECTORS {
            self.connectors[corner as usize] = [self.vertex(a), self.vertex(b)];
        }
    }

    /// Move `handle` to `value` and restore perspective against the
    /// pre-drag geometry.
    ///
    /// A front drag that makes the front taller than the pre-drag back
    /// pushes the back edge on the same side until both heights match, then
    /// re-derives the back width on the handle's side from the front aspect.
    /// A back drag that makes the back shorter than the pre-drag front pushes
    /// the front the same way. Otherwise the other plane is left alone.
    pub fn drag(&mut self, handle: CuboidHandle, value: Point, pre_drag: &CuboidSkeleton) {
        self.apply_relations(handle, value);

        if let Some((plane, Some(vside), hside)) = relations::perspective_for(handle) {
            match plane {
                Plane::Front => {
                    let front_h = self.front_height();
                    let pre_back_h = pre_drag.back_height();
                    if pre_back_h > 0.0 && front_h / pre_back_h > 1.0 {
                        self.push_plane(Plane::Back, vside, hside, front_h);
                    }
                }
                Plane::Back => {
                    let back_h = self.back_height();
                    let pre_front_h = pre_drag.front_height();
                    if pre_front_h > 0.0 && back_h / pre_front_h < 1.0 {
                        self.push_plane(Plane::Front, vside, hside, back_h);
                    }
                }
            }
        }
        self.reset_from_vertices();
    }

    /// Give `plane` the height `height` by moving its `vside` edge, then
    /// set its width on `hside` to `height * other_width / other_height`.
    fn push_plane(&mut self, plane: Plane, vside: VSide, hside: HSide, height: f64) {
        let (tl, tr, bl) = match plane {
            Plane::Front => (CuboidVertex::FrontTl, CuboidVertex::FrontTr, CuboidVertex::FrontBl),
            Plane::Back => (CuboidVertex::BackTl, CuboidVertex::BackTr, CuboidVertex::BackBl),
        };
        match vside {
            VSide::Top => {
                let y = self.vertex(bl).y - height;
                let x = self.vertex(tl).x;
                self.apply_relations(CuboidHandle::Vertex(tl), Point::new(x, y));
            }
            VSide::Bottom => {
                let y = self.vertex(tl).y + height;
                let x = self.vertex(bl).x;
                self.apply_relations(CuboidHandle::Vertex(bl), Point::new(x, y));
            }
        }

        let other = match plane {
            Plane::Front => Plane::Back,
            Plane::Back => Plane::Front,
        };
        let other_h = self.plane_height(other);
        if other_h.abs() < f64::EPSILON {
            return;
        }
        let distance = self.plane_height(plane) * (self.plane_width(other) / other_h);
        match hside {
            HSide::Right => {
                let x = self.vertex(tl).x + distance;
                let y = self.vertex(tr).y;
                self.apply_relations(CuboidHandle::Vertex(tr), Point::new(x, y));
            }
            HSide::Left => {
                let x = self.vertex(tr).x - distance;
                let y = self.vertex(tl).y;
                self.apply_relations(CuboidHandle::Vertex(tl), Point::new(x, y));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn plane(x0: f64, y0: f64, x1: f64, y1: f64) -> CuboidPlane {
        CuboidPlane::from_points([
            Point::new(x0, y0),
            Point::new(x1, y0),
            Point::new(x1, y1),
            Point::new(x0, y1),
        ])
    }

    fn skeleton() -> CuboidSkeleton {
        CuboidSkeleton::from_planes(&plane(0.0, 0.0, 100.0, 100.0), &plane(30.0, -20.0, 120.0, 110.0))
    }

    #[test]
    fn test_plane_basic_info() {
        let info = plane_basic_info(Point::new(0.0, 0.0), Point::new(10.0, 0.0), Point::new(10.0, 5.0));
        assert!((info.width - 10.0).abs() < EPS);
        assert!((info.height - 5.0).abs() < EPS);
        assert_eq!(info.center, Point::new(5.0, 2.5));
    }

    #[test]
    fn test_nested_outline_is_front_quad() {
        let front = plane(0.0, 0.0, 100.0, 100.0);
        let back = plane(20.0, 20.0, 60.0, 60.0);
        assert!(is_nested(&front, &back));
        assert_eq!(hover_outline(&front, &back), front.points().to_vec());
    }

    #[test]
    fn test_offset_outline_is_hull() {
        let front = plane(0.0, 0.0, 100.0, 100.0);
        let back = plane(150.0, -20.0, 250.0, 80.0);
        assert!(!is_nested(&front, &back));
        let outline = hover_outline(&front, &back);
        assert_eq!(outline.len(), 6);
        assert!(outline.contains(&Point::new(250.0, -20.0)));
    }

    #[test]
    fn test_face_vertices_pick_four_of_eight() {
        let front = plane(0.0, 0.0, 10.0, 10.0);
        let back = plane(5.0, -5.0, 15.0, 5.0);
        let left = face_vertices(&front, &back, CuboidDirection::Left);
        assert_eq!(left, [back.tl, front.tl, front.bl, back.bl]);
        let top = face_vertices(&front, &back, CuboidDirection::Top);
        assert_eq!(top, [back.tl, back.tr, front.tr, front.tl]);
    }

    #[test]
    fn test_normalize_swaps_inverted_plane() {
        let inverted = CuboidPlane::from_points([
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
        ]);
        let (fixed, changed) = normalize_plane(&inverted);
        assert!(changed);
        assert_eq!(fixed, plane(0.0, 0.0, 10.0, 10.0));
        let (same, changed) = normalize_plane(&fixed);
        assert!(!changed);
        assert_eq!(same, fixed);
    }

    #[test]
    fn test_front_drag_within_back_height_keeps_back() {
        let pre = skeleton();
        let mut sk = pre.clone();
        sk.drag(CuboidHandle::Vertex(CuboidVertex::FrontTl), Point::new(0.0, -10.0), &pre);
        assert_eq!(sk.back(), pre.back());
        assert_eq!(sk.vertex(CuboidVertex::FrontTr), Point::new(100.0, -10.0));
        assert_eq!(sk.vertex(CuboidVertex::FrontBl), Point::new(0.0, 100.0));
    }

    #[test]
    fn test_front_drag_taller_than_back_pushes_back() {
        let pre = skeleton();
        let mut sk = pre.clone();
        sk.drag(CuboidHandle::Vertex(CuboidVertex::FrontTl), Point::new(0.0, -50.0), &pre);
        let back = sk.back();
        assert!((back.tl.y - -40.0).abs() < EPS);
        assert!((back.tr.y - -40.0).abs() < EPS);
        assert!((sk.back_height() - sk.front_height()).abs() < EPS);
        assert!((back.tl.x - 20.0).abs() < EPS);
        assert!((back.bl.x - 20.0).abs() < EPS);
        // Edges and connectors follow the vertices.
        assert_eq!(sk.edge(CuboidEdge::BackLeft), [back.tl, back.bl]);
        assert_eq!(sk.connector(Corner::Tl), [sk.vertex(CuboidVertex::FrontTl), back.tl]);
    }

    #[test]
    fn test_back_drag_shorter_than_front_pushes_front() {
        let pre = skeleton();
        let mut sk = pre.clone();
        // Back bottom up to y = 60: back height 80 < front height 100.
        sk.drag(CuboidHandle::Vertex(CuboidVertex::BackBr), Point::new(120.0, 60.0), &pre);
        assert!((sk.front_height() - 80.0).abs() < EPS);
        assert!(sk.back_height() >= sk.front_height() - EPS);
        assert!((sk.vertex(CuboidVertex::FrontBl).y - 80.0).abs() < EPS);
    }

    #[test]
    fn test_edge_drag_moves_only_perpendicular() {
        let pre = skeleton();
        let mut sk = pre.clone();
        sk.drag(CuboidHandle::Edge(CuboidEdge::FrontLeft), Point::new(-15.0, 999.0), &pre);
        assert_eq!(sk.vertex(CuboidVertex::FrontTl), Point::new(-15.0, 0.0));
        assert_eq!(sk.vertex(CuboidVertex::FrontBl), Point::new(-15.0, 100.0));
        assert_eq!(sk.back(), pre.back());
    }

    #[test]
    fn test_handle_names() {
        assert_eq!(CuboidHandle::Vertex(CuboidVertex::BackBr).to_string(), "back-br");
        assert_eq!(CuboidHandle::Edge(CuboidEdge::FrontTop).to_string(), "edge-front-top");
        assert_eq!(CuboidHandle::draggable().count(), 15);
    }
}
