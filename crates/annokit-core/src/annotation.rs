//! Persisted annotation records.
//!
//! Records cross the engine boundary in source-image space. Inside the
//! engine the same types carry logical coordinates; [`AnnotationData::map_points`]
//! converts between the two.

use std::str::FromStr;

use kurbo::Point;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Annotation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Tool {
    Point,
    Line,
    Polygon,
    Rect,
    Cuboid,
    Relation,
}

/// Fields shared by every record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationMeta {
    pub id: String,
    #[serde(default)]
    pub order: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<serde_json::Value>,
}

impl AnnotationMeta {
    pub fn new(id: impl Into<String>, order: i64) -> Self {
        Self {
            id: id.into(),
            order,
            label: None,
            attributes: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointData {
    #[serde(flatten)]
    pub meta: AnnotationMeta,
    pub x: f64,
    pub y: f64,
}

/// Straight segments or cubic spline segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PathType {
    #[default]
    Line,
    Spline,
}

/// A path vertex with a stable id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathVertex {
    pub id: String,
    pub x: f64,
    pub y: f64,
}

impl PathVertex {
    pub fn new(id: impl Into<String>, point: Point) -> Self {
        Self {
            id: id.into(),
            x: point.x,
            y: point.y,
        }
    }

    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// Shared record of lines and polygons.
///
/// For splines `control_points` holds two entries per segment: `c1` then
/// `c2` of segment 0, then segment 1, and so on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathData {
    #[serde(flatten)]
    pub meta: AnnotationMeta,
    #[serde(rename = "type", default)]
    pub path_type: PathType,
    pub points: Vec<PathVertex>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_points: Option<Vec<Point>>,
}

impl PathData {
    pub fn vertices(&self) -> Vec<Point> {
        self.points.iter().map(PathVertex::point).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RectData {
    #[serde(flatten)]
    pub meta: AnnotationMeta,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl RectData {
    /// Corners in `[tl, tr, br, bl]` order.
    pub fn corners(&self) -> [Point; 4] {
        [
            Point::new(self.x, self.y),
            Point::new(self.x + self.width, self.y),
            Point::new(self.x + self.width, self.y + self.height),
            Point::new(self.x, self.y + self.height),
        ]
    }
}

/// One face of a cuboid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CuboidPlane {
    pub tl: Point,
    pub tr: Point,
    pub br: Point,
    pub bl: Point,
}

impl CuboidPlane {
    pub fn from_points(points: [Point; 4]) -> Self {
        let [tl, tr, br, bl] = points;
        Self { tl, tr, br, bl }
    }

    /// Vertices in `[tl, tr, br, bl]` order.
    pub fn points(&self) -> [Point; 4] {
        [self.tl, self.tr, self.br, self.bl]
    }

    pub fn map(&self, f: impl Fn(Point) -> Point) -> Self {
        Self::from_points(self.points().map(f))
    }
}

/// Which cuboid face the viewer treats as the true front.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CuboidDirection {
    #[default]
    Front,
    Back,
    Left,
    Right,
    Top,
    Bottom,
}

impl CuboidDirection {
    pub const ALL: [CuboidDirection; 6] = [
        CuboidDirection::Front,
        CuboidDirection::Back,
        CuboidDirection::Left,
        CuboidDirection::Right,
        CuboidDirection::Top,
        CuboidDirection::Bottom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CuboidDirection::Front => "front",
            CuboidDirection::Back => "back",
            CuboidDirection::Left => "left",
            CuboidDirection::Right => "right",
            CuboidDirection::Top => "top",
            CuboidDirection::Bottom => "bottom",
        }
    }
}

impl FromStr for CuboidDirection {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CuboidDirection::ALL
            .into_iter()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| EngineError::InvalidDirection(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CuboidData {
    #[serde(flatten)]
    pub meta: AnnotationMeta,
    #[serde(default)]
    pub direction: CuboidDirection,
    pub front: CuboidPlane,
    pub back: CuboidPlane,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationData {
    #[serde(flatten)]
    pub meta: AnnotationMeta,
    pub source_id: String,
    pub target_id: String,
}

/// Any persisted annotation, tagged by `tool`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tool", rename_all = "camelCase")]
pub enum AnnotationData {
    Point(PointData),
    Line(PathData),
    Polygon(PathData),
    Rect(RectData),
    Cuboid(CuboidData),
    Relation(RelationData),
}

impl AnnotationData {
    pub fn meta(&self) -> &AnnotationMeta {
        match self {
            AnnotationData::Point(d) => &d.meta,
            AnnotationData::Line(d) | AnnotationData::Polygon(d) => &d.meta,
            AnnotationData::Rect(d) => &d.meta,
            AnnotationData::Cuboid(d) => &d.meta,
            AnnotationData::Relation(d) => &d.meta,
        }
    }

    pub fn meta_mut(&mut self) -> &mut AnnotationMeta {
        match self {
            AnnotationData::Point(d) => &mut d.meta,
            AnnotationData::Line(d) | AnnotationData::Polygon(d) => &mut d.meta,
            AnnotationData::Rect(d) => &mut d.meta,
            AnnotationData::Cuboid(d) => &mut d.meta,
            AnnotationData::Relation(d) => &mut d.meta,
        }
    }

    pub fn id(&self) -> &str {
        &self.meta().id
    }

    pub fn order(&self) -> i64 {
        self.meta().order
    }

    pub fn tool(&self) -> Tool {
        match self {
            AnnotationData::Point(_) => Tool::Point,
            AnnotationData::Line(_) => Tool::Line,
            AnnotationData::Polygon(_) => Tool::Polygon,
            AnnotationData::Rect(_) => Tool::Rect,
            AnnotationData::Cuboid(_) => Tool::Cuboid,
            AnnotationData::Relation(_) => Tool::Relation,
        }
    }

    /// Apply a point transform to every coordinate of the record.
    ///
    /// Rects map both corners so scale changes carry into width/height.
    pub fn map_points(&self, f: impl Fn(Point) -> Point) -> Self {
        match self {
            AnnotationData::Point(d) => {
                let p = f(Point::new(d.x, d.y));
                AnnotationData::Point(PointData {
                    meta: d.meta.clone(),
                    x: p.x,
                    y: p.y,
                })
            }
            AnnotationData::Line(d) => AnnotationData::Line(map_path(d, &f)),
            AnnotationData::Polygon(d) => AnnotationData::Polygon(map_path(d, &f)),
            AnnotationData::Rect(d) => {
                let a = f(Point::new(d.x, d.y));
                let b = f(Point::new(d.x + d.width, d.y + d.height));
                AnnotationData::Rect(RectData {
                    meta: d.meta.clone(),
                    x: a.x,
                    y: a.y,
                    width: b.x - a.x,
                    height: b.y - a.y,
                })
            }
            AnnotationData::Cuboid(d) => AnnotationData::Cuboid(CuboidData {
                meta: d.meta.clone(),
                direction: d.direction,
                front: d.front.map(&f),
                back: d.back.map(&f),
            }),
            AnnotationData::Relation(d) => AnnotationData::Relation(d.clone()),
        }
    }

    /// Every coordinate carried by the record.
    pub fn coordinates(&self) -> Vec<Point> {
        match self {
            AnnotationData::Point(d) => vec![Point::new(d.x, d.y)],
            AnnotationData::Line(d) | AnnotationData::Polygon(d) => {
                let mut pts = d.vertices();
                pts.extend(d.control_points.iter().flatten().copied());
                pts
            }
            AnnotationData::Rect(d) => vec![Point::new(d.x, d.y), Point::new(d.width, d.height)],
            AnnotationData::Cuboid(d) => d.front.points().into_iter().chain(d.back.points()).collect(),
            AnnotationData::Relation(_) => Vec::new(),
        }
    }

    /// Reject non-finite coordinates.
    pub fn validate(&self) -> EngineResult<()> {
        match self.coordinates().into_iter().find(|p| !p.x.is_finite() || !p.y.is_finite()) {
            Some(p) => Err(EngineError::InvalidCoordinate {
                context: format!("annotation {}", self.id()),
                x: p.x,
                y: p.y,
            }),
            None => Ok(()),
        }
    }
}

fn map_path(d: &PathData, f: &impl Fn(Point) -> Point) -> PathData {
    PathData {
        meta: d.meta.clone(),
        path_type: d.path_type,
        points: d
            .points
            .iter()
            .map(|v| PathVertex::new(v.id.clone(), f(v.point())))
            .collect(),
        control_points: d
            .control_points
            .as_ref()
            .map(|cps| cps.iter().map(|p| f(*p)).collect()),
    }
}
