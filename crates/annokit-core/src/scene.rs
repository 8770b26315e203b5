//! Visual shapes for annotation records, shared by static groups and drafts.
//!
//! Every builder takes logical coordinates.

use kurbo::{CubicBez, Point};

use crate::annotation::{AnnotationData, CuboidDirection, CuboidPlane, PathData, PathType, Tool};
use crate::axis::Axis;
use crate::cuboid::{Corner, face_vertices, hover_outline};
use crate::error::EngineResult;
use crate::geometry::{catmull_rom_controls, flatten_cubic};
use crate::session::SessionContext;
use crate::shapes::{Group, GroupRole, GroupStore, OUTLINE, Shape, ShapeKind, ShapeStyle, polygon_or_line};

/// Radius of a point annotation, in viewport pixels.
pub const POINT_RADIUS: f64 = 5.0;
/// Pieces per spline segment in flattened outlines.
pub const SPLINE_STEPS: usize = 16;
/// Alpha of derived fills.
pub const FILL_ALPHA: u8 = 48;

pub fn segment_count(vertices: usize, closed: bool) -> usize {
    match (vertices, closed) {
        (0 | 1, _) => 0,
        (n, true) => n,
        (n, false) => n - 1,
    }
}

/// Spline controls of a path, falling back to Catmull-Rom tangents when the
/// record carries none or the wrong number.
pub fn spline_controls(vertices: &[Point], stored: Option<&[Point]>, closed: bool) -> Vec<Point> {
    let expected = segment_count(vertices.len(), closed) * 2;
    match stored {
        Some(cps) if cps.len() == expected => cps.to_vec(),
        _ => catmull_rom_controls(vertices, closed),
    }
}

/// Cubic of spline segment `s`.
pub fn segment_cubic(vertices: &[Point], controls: &[Point], s: usize) -> CubicBez {
    let n = vertices.len();
    CubicBez::new(vertices[s], controls[2 * s], controls[2 * s + 1], vertices[(s + 1) % n])
}

/// Points of the outline: the vertices, or the flattened spline.
pub fn path_outline(vertices: &[Point], controls: Option<&[Point]>, closed: bool) -> Vec<Point> {
    let Some(controls) = controls else {
        return vertices.to_vec();
    };
    let segments = segment_count(vertices.len(), closed);
    let mut out = Vec::with_capacity(segments * SPLINE_STEPS + 1);
    if let Some(first) = vertices.first() {
        out.push(*first);
    }
    for s in 0..segments {
        out.extend(flatten_cubic(&segment_cubic(vertices, controls, s), SPLINE_STEPS));
    }
    if closed && segments > 0 {
        // The last flattened sample repeats the first vertex.
        out.pop();
    }
    out
}

pub fn curve_shape_id(segment: usize) -> String {
    format!("curve:{segment}")
}

/// Outline plus, for splines, one bezier shape per segment.
pub fn path_shapes(
    vertices: &[Point],
    controls: Option<&[Point]>,
    closed: bool,
    style: &ShapeStyle,
    axis: &Axis,
) -> EngineResult<Vec<Shape>> {
    let outline_style = if closed {
        style.clone().with_derived_fill(FILL_ALPHA)
    } else {
        style.clone()
    };
    let mut shapes = vec![Shape::new(
        OUTLINE,
        polygon_or_line(closed),
        path_outline(vertices, controls, closed),
        outline_style,
        axis,
    )?];
    if let Some(controls) = controls {
        for s in 0..segment_count(vertices.len(), closed) {
            let c = segment_cubic(vertices, controls, s);
            shapes.push(Shape::new(
                curve_shape_id(s),
                ShapeKind::Bezier,
                vec![c.p0, c.p1, c.p2, c.p3],
                style.clone(),
                axis,
            )?);
        }
    }
    Ok(shapes)
}

pub fn path_data_shapes(data: &PathData, closed: bool, style: &ShapeStyle, axis: &Axis) -> EngineResult<Vec<Shape>> {
    let vertices = data.vertices();
    let controls = match data.path_type {
        PathType::Spline => Some(spline_controls(&vertices, data.control_points.as_deref(), closed)),
        PathType::Line => None,
    };
    path_shapes(&vertices, controls.as_deref(), closed, style, axis)
}

pub fn rect_shapes(corners: [Point; 4], style: &ShapeStyle, axis: &Axis) -> EngineResult<Vec<Shape>> {
    Ok(vec![Shape::new(
        OUTLINE,
        ShapeKind::Polygon,
        corners.to_vec(),
        style.clone().with_derived_fill(FILL_ALPHA),
        axis,
    )?])
}

pub fn point_shapes(point: Point, style: &ShapeStyle, axis: &Axis) -> EngineResult<Vec<Shape>> {
    let mut style = style.clone();
    if style.fill_color.is_none() {
        style.fill_color = Some(style.stroke_color);
    }
    Ok(vec![Shape::new(
        OUTLINE,
        ShapeKind::Point { radius: POINT_RADIUS },
        vec![point],
        style,
        axis,
    )?])
}

pub fn connector_shape_id(corner: Corner) -> String {
    format!("connector:{}", corner.as_str())
}

/// Hover outline, both planes, the four connectors and the true-front face.
pub fn cuboid_shapes(
    front: &CuboidPlane,
    back: &CuboidPlane,
    direction: CuboidDirection,
    style: &ShapeStyle,
    axis: &Axis,
) -> EngineResult<Vec<Shape>> {
    let hidden = ShapeStyle {
        stroke_width: 0.0,
        fill_color: None,
        ..style.clone()
    };
    let mut shapes = vec![
        Shape::new(OUTLINE, ShapeKind::Polygon, hover_outline(front, back), hidden, axis)?,
        Shape::new("back", ShapeKind::Polygon, back.points().to_vec(), style.clone(), axis)?,
        Shape::new("front", ShapeKind::Polygon, front.points().to_vec(), style.clone(), axis)?,
    ];
    let fronts = front.points();
    let backs = back.points();
    for (i, corner) in Corner::ALL.into_iter().enumerate() {
        shapes.push(Shape::new(
            connector_shape_id(corner),
            ShapeKind::Line,
            vec![fronts[i], backs[i]],
            style.clone(),
            axis,
        )?);
    }
    shapes.push(Shape::new(
        "face",
        ShapeKind::Polygon,
        face_vertices(front, back, direction).to_vec(),
        style.clone().with_derived_fill(FILL_ALPHA * 2),
        axis,
    )?);
    Ok(shapes)
}

pub fn relation_shapes(source: Point, target: Point, style: &ShapeStyle, axis: &Axis) -> EngineResult<Vec<Shape>> {
    Ok(vec![Shape::new(
        OUTLINE,
        ShapeKind::Line,
        vec![source, target],
        style.clone(),
        axis,
    )?])
}

/// Logical center of a group's bbox.
pub fn group_center(group: &Group, axis: &Axis) -> Option<Point> {
    group.bbox().map(|b| axis.to_logical(b.center()))
}

/// Shapes for any record. Relations need both endpoint groups; `None`
/// when one is missing.
pub fn shapes_for(
    data: &AnnotationData,
    style: &ShapeStyle,
    axis: &Axis,
    groups: &GroupStore,
) -> EngineResult<Option<Vec<Shape>>> {
    let shapes = match data {
        AnnotationData::Point(d) => point_shapes(Point::new(d.x, d.y), style, axis)?,
        AnnotationData::Line(d) => path_data_shapes(d, false, style, axis)?,
        AnnotationData::Polygon(d) => path_data_shapes(d, true, style, axis)?,
        AnnotationData::Rect(d) => rect_shapes(d.corners(), style, axis)?,
        AnnotationData::Cuboid(d) => cuboid_shapes(&d.front, &d.back, d.direction, style, axis)?,
        AnnotationData::Relation(d) => {
            let source = groups.get(&d.source_id).and_then(|g| group_center(g, axis));
            let target = groups.get(&d.target_id).and_then(|g| group_center(g, axis));
            match (source, target) {
                (Some(s), Some(t)) => relation_shapes(s, t, style, axis)?,
                _ => return Ok(None),
            }
        }
    };
    Ok(Some(shapes))
}

/// Build the static group of a record. Logs and returns `None` when a
/// relation endpoint is missing.
pub fn build_group(
    data: &AnnotationData,
    style: &ShapeStyle,
    ctx: &mut SessionContext,
    groups: &GroupStore,
) -> EngineResult<Option<Group>> {
    let Some(shapes) = shapes_for(data, style, &ctx.axis, groups)? else {
        log::warn!("Relation {} has a missing endpoint; not drawn", data.id());
        return Ok(None);
    };
    let mut group = new_annotation_group(data);
    group.insert(0, shapes, ctx)?;
    group.refresh(ctx);
    Ok(Some(group))
}

pub fn new_annotation_group(data: &AnnotationData) -> Group {
    let role = match data.tool() {
        Tool::Relation => GroupRole::Relation,
        _ => GroupRole::Annotation,
    };
    Group::new(data.id(), data.order(), role).with_tool(data.tool())
}

/// Swap a group's members for `shapes`. Same ids in the same order update
/// in place; anything else replaces the whole list.
pub fn replace_shapes(group: &mut Group, shapes: Vec<Shape>, ctx: &mut SessionContext) -> EngineResult<()> {
    let same_layout = group.len() == shapes.len()
        && group
            .shapes()
            .iter()
            .zip(&shapes)
            .all(|(old, new)| old.id() == new.id() && old.kind() == new.kind());
    if same_layout {
        for shape in shapes {
            if group.shape(shape.id()).map(|s| s.style()) != Some(shape.style()) {
                group.set_shape_style(shape.id(), shape.style().clone(), ctx)?;
            }
            group.set_shape_points(shape.id(), shape.logical().to_vec(), ctx)?;
        }
        return Ok(());
    }
    let ids: Vec<String> = group.shapes().iter().map(|s| s.id().to_string()).collect();
    for id in ids {
        group.remove(&id, ctx)?;
    }
    group.insert(0, shapes, ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{AnnotationMeta, PathVertex, RectData};

    #[test]
    fn test_closed_spline_outline_has_no_duplicate_end() {
        let vertices = vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0), Point::new(5.0, 8.0)];
        let controls = spline_controls(&vertices, None, true);
        let outline = path_outline(&vertices, Some(&controls), true);
        assert_eq!(outline.len(), 3 * SPLINE_STEPS);
        assert_eq!(outline[0], vertices[0]);
    }

    #[test]
    fn test_wrong_control_count_falls_back() {
        let vertices = vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0)];
        let stored = vec![Point::new(1.0, 1.0)];
        assert_eq!(spline_controls(&vertices, Some(&stored), false).len(), 2);
    }

    #[test]
    fn test_build_group_registers_in_index() {
        let mut ctx = SessionContext::default();
        let groups = GroupStore::new();
        let data = AnnotationData::Rect(RectData {
            meta: AnnotationMeta::new("r1", 3),
            x: 10.0,
            y: 10.0,
            width: 20.0,
            height: 10.0,
        });
        let group = build_group(&data, &ShapeStyle::default(), &mut ctx, &groups)
            .unwrap()
            .unwrap();
        assert_eq!(group.order, 3);
        assert_eq!(group.tool, Some(Tool::Rect));
        assert!(group.bbox().is_some());
        assert_eq!(ctx.index.query_window(Point::new(15.0, 15.0), 1.0).len(), 2);
    }

    #[test]
    fn test_relation_without_endpoints_is_skipped() {
        let mut ctx = SessionContext::default();
        let groups = GroupStore::new();
        let data = AnnotationData::Relation(crate::annotation::RelationData {
            meta: AnnotationMeta::new("rel", 0),
            source_id: "a".into(),
            target_id: "b".into(),
        });
        assert!(build_group(&data, &ShapeStyle::default(), &mut ctx, &groups).unwrap().is_none());
        assert!(ctx.index.is_empty());
    }

    #[test]
    fn test_spline_path_gets_curve_shapes() {
        let data = PathData {
            meta: AnnotationMeta::new("l", 0),
            path_type: PathType::Spline,
            points: vec![
                PathVertex::new("a", Point::new(0.0, 0.0)),
                PathVertex::new("b", Point::new(10.0, 10.0)),
                PathVertex::new("c", Point::new(20.0, 0.0)),
            ],
            control_points: None,
        };
        let shapes = path_data_shapes(&data, false, &ShapeStyle::default(), &Axis::default()).unwrap();
        assert_eq!(shapes.len(), 3);
        assert_eq!(shapes[1].kind(), ShapeKind::Bezier);
    }
}
