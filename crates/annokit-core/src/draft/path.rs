//! Line and polygon editing, straight or spline.
//!
//! Vertices snap onto neighbouring annotations of the same kind while
//! dragged. With the vertex-edit modifier held, pressing a vertex deletes
//! it and pressing a segment inserts a vertex there and starts dragging it.

use std::fmt;

use kurbo::{ParamCurve, ParamCurveNearest, Point};
use uuid::Uuid;

use super::{DraftCore, DraftEnv, DraftResponse, DraftState, DraftTrait, commit};
use crate::annotation::{AnnotationData, PathData, PathType, PathVertex};
use crate::error::{EngineResult, ValidationError};
use crate::geometry::nearest_point_on_segment;
use crate::handles::{EditableHandleSet, HandleEvent, HandleLayer};
use crate::scene;
use crate::session::SessionContext;
use crate::shapes::{Group, GroupRole, Shape, ShapeKind, ShapeStyle};
use crate::spatial::{clear_snap_preview, nearest_point_on_line_segments, nearest_point_on_polygon_edges};

const PREVIEW_POINT: &str = "point";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TangentSide {
    /// `c2` of the segment ending at the vertex.
    In,
    /// `c1` of the segment starting at the vertex.
    Out,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathHandle {
    Vertex(usize),
    /// Straight segment from vertex `i` to the next one.
    Segment(usize),
    Tangent(usize, TangentSide),
    /// Visual link between a vertex's two tangents.
    Slope(usize),
}

impl fmt::Display for PathHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathHandle::Vertex(i) => write!(f, "vertex-{i}"),
            PathHandle::Segment(i) => write!(f, "segment-{i}"),
            PathHandle::Tangent(i, TangentSide::In) => write!(f, "tangent-{i}-in"),
            PathHandle::Tangent(i, TangentSide::Out) => write!(f, "tangent-{i}-out"),
            PathHandle::Slope(i) => write!(f, "slope-{i}"),
        }
    }
}

/// A segment under the cursor: index, logical point on it and the curve
/// parameter of that point.
type SegmentHit = (usize, Point, f64);

#[derive(Debug)]
pub struct PathDraft {
    core: DraftCore,
    closed: bool,
    path_type: PathType,
    vertices: Vec<PathVertex>,
    /// Two per segment for splines, empty otherwise.
    controls: Vec<Point>,
    handles: EditableHandleSet<PathHandle>,
    insert_preview: Group,
    disabled: bool,
}

impl PathDraft {
    pub(crate) fn new(
        core: DraftCore,
        data: &PathData,
        closed: bool,
        disabled: bool,
        ctx: &mut SessionContext,
    ) -> EngineResult<Self> {
        let handles = EditableHandleSet::new(&core.id, core.group.order, disabled);
        let mut insert_preview = Group::new(format!("{}:insert-preview", core.id), core.group.order, GroupRole::Preview);
        insert_preview.always_on_top = true;
        let mut draft = Self {
            core,
            closed,
            path_type: data.path_type,
            vertices: Vec::new(),
            controls: Vec::new(),
            handles,
            insert_preview,
            disabled,
        };
        draft.load(data);
        draft.redraw(ctx)?;
        draft.build_handles(ctx)?;
        Ok(draft)
    }

    pub fn vertices(&self) -> &[PathVertex] {
        &self.vertices
    }

    pub fn controls(&self) -> &[Point] {
        &self.controls
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn load(&mut self, data: &PathData) {
        self.path_type = data.path_type;
        self.vertices = data.points.clone();
        self.controls = match data.path_type {
            PathType::Spline => scene::spline_controls(&data.vertices(), data.control_points.as_deref(), self.closed),
            PathType::Line => Vec::new(),
        };
    }

    fn is_spline(&self) -> bool {
        self.path_type == PathType::Spline
    }

    fn points(&self) -> Vec<Point> {
        self.vertices.iter().map(PathVertex::point).collect()
    }

    fn segments(&self) -> usize {
        scene::segment_count(self.vertices.len(), self.closed)
    }

    fn next(&self, i: usize) -> usize {
        (i + 1) % self.vertices.len()
    }

    fn tangent_index(&self, i: usize, side: TangentSide) -> Option<usize> {
        if !self.is_spline() {
            return None;
        }
        let segments = self.segments();
        match side {
            TangentSide::Out => (i < segments).then_some(2 * i),
            TangentSide::In if i > 0 => Some(2 * (i - 1) + 1),
            TangentSide::In => (self.closed && segments > 0).then_some(2 * segments - 1),
        }
    }

    fn slope_points(&self, i: usize) -> [Point; 2] {
        let v = self.vertices[i].point();
        let end = |side| self.tangent_index(i, side).map_or(v, |k| self.controls[k]);
        [end(TangentSide::In), end(TangentSide::Out)]
    }

    /// Recreate every handle; indices shift after inserts and deletes.
    fn build_handles(&mut self, ctx: &mut SessionContext) -> EngineResult<()> {
        let armed = self.handles.is_armed();
        self.handles.destroy(ctx)?;
        self.handles = EditableHandleSet::new(&self.core.id, self.core.group.order, self.disabled);
        let points = self.points();
        if self.is_spline() {
            for i in 0..points.len() {
                let at = self.slope_points(i);
                self.handles.add_edge(PathHandle::Slope(i), HandleLayer::Tangents, at, false, ctx)?;
            }
            for i in 0..points.len() {
                for side in [TangentSide::In, TangentSide::Out] {
                    if let Some(k) = self.tangent_index(i, side) {
                        self.handles
                            .add_point(PathHandle::Tangent(i, side), HandleLayer::Tangents, self.controls[k], ctx)?;
                    }
                }
            }
        } else {
            for s in 0..self.segments() {
                let at = [points[s], points[self.next(s)]];
                self.handles.add_edge(PathHandle::Segment(s), HandleLayer::Handles, at, true, ctx)?;
            }
        }
        for (i, at) in points.iter().enumerate() {
            self.handles.add_point(PathHandle::Vertex(i), HandleLayer::Handles, *at, ctx)?;
        }
        if armed {
            self.handles.arm();
        }
        Ok(())
    }

    fn sync_handles(&mut self, ctx: &mut SessionContext) -> EngineResult<()> {
        let points = self.points();
        for (i, at) in points.iter().enumerate() {
            self.handles.set_point(PathHandle::Vertex(i), *at, ctx)?;
        }
        if self.is_spline() {
            for i in 0..points.len() {
                let at = self.slope_points(i);
                self.handles.set_edge(PathHandle::Slope(i), at, ctx)?;
                for side in [TangentSide::In, TangentSide::Out] {
                    if let Some(k) = self.tangent_index(i, side) {
                        self.handles.set_point(PathHandle::Tangent(i, side), self.controls[k], ctx)?;
                    }
                }
            }
        } else {
            for s in 0..self.segments() {
                let at = [points[s], points[self.next(s)]];
                self.handles.set_edge(PathHandle::Segment(s), at, ctx)?;
            }
        }
        Ok(())
    }

    /// Move a vertex; its tangents follow without mirroring.
    fn move_vertex(&mut self, i: usize, to: Point) {
        let delta = to - self.vertices[i].point();
        self.vertices[i].x = to.x;
        self.vertices[i].y = to.y;
        for side in [TangentSide::In, TangentSide::Out] {
            if let Some(k) = self.tangent_index(i, side) {
                self.controls[k] += delta;
            }
        }
    }

    /// Move one tangent and mirror the other through the vertex.
    fn move_tangent(&mut self, i: usize, side: TangentSide, to: Point) {
        let v = self.vertices[i].point();
        let opposite = match side {
            TangentSide::In => TangentSide::Out,
            TangentSide::Out => TangentSide::In,
        };
        if let Some(k) = self.tangent_index(i, side) {
            self.controls[k] = to;
        }
        if let Some(k) = self.tangent_index(i, opposite) {
            self.controls[k] = v + (v - to);
        }
    }

    fn snap(&self, to: Point, env: &mut DraftEnv) -> EngineResult<Point> {
        if !env.ctx.config.edge_snapping {
            return Ok(to);
        }
        let viewport = env.ctx.axis.to_viewport(to);
        let threshold = env.ctx.config.snap_threshold;
        let exclude = [self.core.id.as_str()];
        let snapped = if self.closed {
            nearest_point_on_polygon_edges(env.ctx, env.groups, viewport, threshold, &exclude)?
        } else {
            nearest_point_on_line_segments(env.ctx, env.groups, viewport, threshold, &exclude)?
        };
        Ok(snapped.map_or(to, |p| env.ctx.axis.to_logical(p)))
    }

    /// Closest segment within the hit tolerance of a viewport point.
    fn segment_at(&self, point: Point, ctx: &SessionContext) -> Option<SegmentHit> {
        let tolerance = ctx.config.hit_tolerance + self.core.style.stroke_width / 2.0;
        let points = self.points();
        let mut best: Option<(f64, SegmentHit)> = None;
        for s in 0..self.segments() {
            let (distance, hit) = if self.is_spline() {
                let curve = scene::segment_cubic(&points, &self.controls, s);
                let nearest = (ctx.axis.transform() * curve).nearest(point, 1e-3);
                (nearest.distance_sq.sqrt(), (s, curve.eval(nearest.t), nearest.t))
            } else {
                let a = ctx.axis.to_viewport(points[s]);
                let b = ctx.axis.to_viewport(points[self.next(s)]);
                let projected = nearest_point_on_segment(point, a, b);
                (point.distance(projected), (s, ctx.axis.to_logical(projected), 0.0))
            };
            if distance <= tolerance && best.is_none_or(|(d, _)| distance < d) {
                best = Some((distance, hit));
            }
        }
        best.map(|(_, hit)| hit)
    }

    fn show_insert_preview(&mut self, at: Point, ctx: &mut SessionContext) -> EngineResult<()> {
        if self.insert_preview.contains(PREVIEW_POINT) {
            self.insert_preview.set_shape_points(PREVIEW_POINT, vec![at], ctx)?;
        } else {
            let shape = Shape::new(
                PREVIEW_POINT,
                ShapeKind::Point {
                    radius: ctx.config.handle_radius,
                },
                vec![at],
                ShapeStyle::preview(),
                &ctx.axis,
            )?;
            self.insert_preview.add(shape, ctx)?;
        }
        self.insert_preview.refresh(ctx);
        Ok(())
    }

    fn hide_insert_preview(&mut self, ctx: &mut SessionContext) -> EngineResult<()> {
        if self.insert_preview.contains(PREVIEW_POINT) {
            self.insert_preview.remove(PREVIEW_POINT, ctx)?;
            self.insert_preview.refresh(ctx);
        }
        Ok(())
    }

    fn can_edit_vertices(&self, env: &DraftEnv) -> bool {
        env.modifiers.edit_vertices() && self.handles.is_armed() && !self.disabled
    }

    /// Split segment `s` at `t`, inserting a vertex with a fresh id.
    fn insert_vertex(&mut self, s: usize, at: Point, t: f64, ctx: &mut SessionContext) -> EngineResult<usize> {
        let mut at = at;
        if self.is_spline() {
            let curve = scene::segment_cubic(&self.points(), &self.controls, s);
            let left = curve.subsegment(0.0..t);
            let right = curve.subsegment(t..1.0);
            at = left.p3;
            self.controls
                .splice(2 * s..2 * s + 2, [left.p1, left.p2, right.p1, right.p2]);
        }
        let index = s + 1;
        self.vertices
            .insert(index, PathVertex::new(Uuid::new_v4().to_string(), at));
        log::debug!("{}: inserted vertex {index}", self.core.id);
        self.redraw(ctx)?;
        self.build_handles(ctx)?;
        Ok(index)
    }

    fn delete_vertex(&mut self, i: usize, env: &mut DraftEnv) -> EngineResult<DraftResponse> {
        let minimum = if self.closed {
            env.ctx.config.closing_point_amount
        } else {
            env.ctx.config.min_line_points
        };
        let actual = self.vertices.len();
        if actual <= minimum {
            env.ctx.report_validation(ValidationError::TooFewPoints {
                annotation_id: self.core.id.clone(),
                minimum,
                actual,
            });
            return Ok(DraftResponse::Handled);
        }
        if self.is_spline() {
            self.merge_controls_around(i);
        }
        self.vertices.remove(i);
        log::debug!("{}: deleted vertex {i}", self.core.id);
        self.redraw(env.ctx)?;
        self.build_handles(env.ctx)?;
        commit(self, env)
    }

    /// Join the two segments meeting at vertex `i` into one that keeps the
    /// outer controls.
    fn merge_controls_around(&mut self, i: usize) {
        let n = self.vertices.len();
        let mut pairs: Vec<(Point, Point)> = self.controls.chunks_exact(2).map(|c| (c[0], c[1])).collect();
        if self.closed {
            let prev = (i + n - 1) % n;
            pairs[prev].1 = pairs[i].1;
            pairs.remove(i);
        } else if i == 0 {
            pairs.remove(0);
        } else if i == n - 1 {
            pairs.remove(n - 2);
        } else {
            pairs[i - 1].1 = pairs[i].1;
            pairs.remove(i);
        }
        self.controls = pairs.into_iter().flat_map(|(a, b)| [a, b]).collect();
    }
}

impl DraftTrait for PathDraft {
    fn core(&self) -> &DraftCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut DraftCore {
        &mut self.core
    }

    fn overlays(&self) -> Vec<&Group> {
        vec![self.handles.group(), self.handles.tangent_group(), &self.insert_preview]
    }

    fn arm(&mut self) {
        self.handles.arm();
    }

    fn pointer_down(&mut self, point: Point, env: &mut DraftEnv) -> EngineResult<DraftResponse> {
        if self.can_edit_vertices(env) {
            self.hide_insert_preview(env.ctx)?;
            let tolerance = env.ctx.config.hit_tolerance;
            if let Some(PathHandle::Vertex(i)) = self.handles.handle_at(point, tolerance) {
                return self.delete_vertex(i, env);
            }
            if let Some((s, at, t)) = self.segment_at(point, env.ctx) {
                let index = self.insert_vertex(s, at, t, env.ctx)?;
                self.handles.begin_drag(PathHandle::Vertex(index), point, env.ctx)?;
                self.core.state = DraftState::Dragging;
                return Ok(DraftResponse::Changed);
            }
        }
        match self.handles.pointer_down(point, env.ctx)? {
            Some(_) => {
                self.core.state = DraftState::Dragging;
                Ok(DraftResponse::Handled)
            }
            None => Ok(DraftResponse::Ignored),
        }
    }

    fn pointer_move(&mut self, point: Point, env: &mut DraftEnv) -> EngineResult<DraftResponse> {
        if !self.handles.is_dragging() {
            self.handles.pointer_move(point, env.ctx)?;
            let over_vertex = matches!(self.handles.hovered(), Some(PathHandle::Vertex(_)));
            if self.can_edit_vertices(env) && !over_vertex {
                if let Some((_, at, _)) = self.segment_at(point, env.ctx) {
                    self.show_insert_preview(at, env.ctx)?;
                    return Ok(DraftResponse::Handled);
                }
            }
            self.hide_insert_preview(env.ctx)?;
            return Ok(DraftResponse::Ignored);
        }
        let Some(HandleEvent::Move { handle, positions, .. }) = self.handles.pointer_move(point, env.ctx)? else {
            return Ok(DraftResponse::Ignored);
        };
        match handle {
            PathHandle::Vertex(i) => {
                let to = self.snap(positions[0], env)?;
                self.move_vertex(i, to);
            }
            PathHandle::Segment(s) => {
                let next = self.next(s);
                self.move_vertex(s, positions[0]);
                self.move_vertex(next, positions[1]);
            }
            PathHandle::Tangent(i, side) => self.move_tangent(i, side, positions[0]),
            PathHandle::Slope(_) => return Ok(DraftResponse::Ignored),
        }
        self.redraw(env.ctx)?;
        self.sync_handles(env.ctx)?;
        Ok(DraftResponse::Changed)
    }

    fn pointer_up(&mut self, _point: Point, env: &mut DraftEnv) -> EngineResult<DraftResponse> {
        if self.handles.pointer_up(env.ctx)?.is_none() {
            return Ok(DraftResponse::Ignored);
        }
        clear_snap_preview(env.ctx)?;
        commit(self, env)
    }

    fn cancel_drag(&mut self, ctx: &mut SessionContext) -> EngineResult<()> {
        self.handles.cancel();
        self.hide_insert_preview(ctx)?;
        clear_snap_preview(ctx)
    }

    fn sync_coord_to_data(&self) -> AnnotationData {
        let data = PathData {
            meta: self.core.committed.meta().clone(),
            path_type: self.path_type,
            points: self.vertices.clone(),
            control_points: self.is_spline().then(|| self.controls.clone()),
        };
        if self.closed {
            AnnotationData::Polygon(data)
        } else {
            AnnotationData::Line(data)
        }
    }

    fn check_commit(
        &self,
        data: AnnotationData,
        ctx: &mut SessionContext,
    ) -> EngineResult<Option<(AnnotationData, bool)>> {
        let closing = ctx.config.closing_point_amount;
        if self.closed && self.vertices.len() < closing {
            ctx.report_validation(ValidationError::PolygonNotClosable {
                annotation_id: self.core.id.clone(),
                closing_point_amount: closing,
                actual: self.vertices.len(),
            });
            return Ok(None);
        }
        Ok(Some((data, false)))
    }

    fn rebuild(&mut self, data: &AnnotationData, env: &mut DraftEnv) -> EngineResult<()> {
        let path = match (data, self.closed) {
            (AnnotationData::Polygon(p), true) | (AnnotationData::Line(p), false) => p,
            _ => return Err(self.core.mismatch(data)),
        };
        self.load(path);
        self.hide_insert_preview(env.ctx)?;
        self.redraw(env.ctx)?;
        self.build_handles(env.ctx)
    }

    fn redraw(&mut self, ctx: &mut SessionContext) -> EngineResult<()> {
        let controls = self.is_spline().then_some(self.controls.as_slice());
        let shapes = scene::path_shapes(&self.points(), controls, self.closed, &self.core.style, &ctx.axis)?;
        self.core.set_visuals(shapes, ctx)
    }

    fn sync_overlays(&mut self, ctx: &mut SessionContext) {
        self.handles.sync_viewport(ctx);
        self.insert_preview.sync_viewport(ctx);
    }

    fn refresh_overlays(&mut self, ctx: &mut SessionContext) {
        self.handles.refresh(ctx);
        self.insert_preview.refresh(ctx);
    }

    fn destroy_overlays(&mut self, ctx: &mut SessionContext) -> EngineResult<()> {
        self.handles.destroy(ctx)?;
        self.insert_preview.destroy(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{ctx, drag};
    use super::super::Draft;
    use super::*;
    use crate::annotation::AnnotationMeta;
    use crate::input::Modifiers;
    use crate::shapes::GroupStore;

    fn path(id: &str, path_type: PathType, points: &[(f64, f64)]) -> PathData {
        PathData {
            meta: AnnotationMeta::new(id, 0),
            path_type,
            points: points
                .iter()
                .enumerate()
                .map(|(i, (x, y))| PathVertex::new(format!("{id}-{i}"), Point::new(*x, *y)))
                .collect(),
            control_points: None,
        }
    }

    fn square(id: &str, x0: f64, y0: f64, x1: f64, y1: f64) -> AnnotationData {
        AnnotationData::Polygon(path(id, PathType::Line, &[(x0, y0), (x1, y0), (x1, y1), (x0, y1)]))
    }

    fn env<'a>(ctx: &'a mut SessionContext, groups: &'a GroupStore, alt: bool) -> DraftEnv<'a> {
        DraftEnv {
            ctx,
            groups,
            modifiers: Modifiers {
                alt,
                ..Modifiers::default()
            },
            relations: &[],
        }
    }

    fn settled(data: &AnnotationData, env: &mut DraftEnv) -> Draft {
        let mut draft = Draft::new(data, ShapeStyle::default(), env).unwrap().unwrap();
        draft.settle(env.ctx);
        draft
    }

    fn committed_points(draft: &Draft) -> Vec<Point> {
        match draft.committed() {
            AnnotationData::Polygon(p) | AnnotationData::Line(p) => p.vertices(),
            other => panic!("unexpected record {other:?}"),
        }
    }

    #[test]
    fn test_vertex_drag_snaps_to_neighbour_polygon() {
        let mut ctx = ctx();
        let mut groups = GroupStore::new();
        let neighbour = square("n1", 100.0, 20.0, 150.0, 80.0);
        let group = scene::build_group(&neighbour, &ShapeStyle::default(), &mut ctx, &groups)
            .unwrap()
            .unwrap();
        groups.insert(group);

        let mut env = env(&mut ctx, &groups, false);
        let mut draft = settled(&square("p1", 20.0, 20.0, 80.0, 80.0), &mut env);
        let response = drag(&mut draft, &mut env, Point::new(80.0, 20.0), Point::new(97.0, 30.0));
        assert_eq!(response, DraftResponse::Committed);
        assert_eq!(committed_points(&draft)[1], Point::new(100.0, 30.0));
        assert!(env.ctx.snap_preview.is_none());
    }

    #[test]
    fn test_snapping_can_be_disabled() {
        let mut ctx = ctx();
        ctx.config.edge_snapping = false;
        let mut groups = GroupStore::new();
        let neighbour = square("n1", 100.0, 20.0, 150.0, 80.0);
        let group = scene::build_group(&neighbour, &ShapeStyle::default(), &mut ctx, &groups)
            .unwrap()
            .unwrap();
        groups.insert(group);

        let mut env = env(&mut ctx, &groups, false);
        let mut draft = settled(&square("p1", 20.0, 20.0, 80.0, 80.0), &mut env);
        drag(&mut draft, &mut env, Point::new(80.0, 20.0), Point::new(97.0, 30.0));
        assert_eq!(committed_points(&draft)[1], Point::new(97.0, 30.0));
    }

    #[test]
    fn test_delete_refused_at_closing_size() {
        let mut ctx = ctx();
        let groups = GroupStore::new();
        let mut env = env(&mut ctx, &groups, true);
        let triangle = AnnotationData::Polygon(path("t1", PathType::Line, &[(10.0, 10.0), (60.0, 10.0), (30.0, 50.0)]));
        let mut draft = settled(&triangle, &mut env);

        let response = draft.pointer_down(Point::new(10.0, 10.0), &mut env).unwrap();
        assert_eq!(response, DraftResponse::Handled);
        assert_eq!(committed_points(&draft).len(), 3);
        assert_eq!(
            env.ctx.validation.errors(),
            &[ValidationError::TooFewPoints {
                annotation_id: "t1".into(),
                minimum: 3,
                actual: 3,
            }]
        );
    }

    #[test]
    fn test_delete_vertex_commits() {
        let mut ctx = ctx();
        let groups = GroupStore::new();
        let mut env = env(&mut ctx, &groups, true);
        let mut draft = settled(&square("p1", 20.0, 20.0, 80.0, 80.0), &mut env);
        let response = draft.pointer_down(Point::new(80.0, 80.0), &mut env).unwrap();
        assert_eq!(response, DraftResponse::Committed);
        assert_eq!(
            committed_points(&draft),
            vec![Point::new(20.0, 20.0), Point::new(80.0, 20.0), Point::new(20.0, 80.0)]
        );
    }

    #[test]
    fn test_insert_on_segment_then_drag() {
        let mut ctx = ctx();
        let groups = GroupStore::new();
        let mut env = env(&mut ctx, &groups, true);
        let mut draft = settled(&square("p1", 20.0, 20.0, 80.0, 80.0), &mut env);

        assert_eq!(draft.pointer_move(Point::new(50.0, 21.0), &mut env).unwrap(), DraftResponse::Handled);
        assert_eq!(draft.pointer_down(Point::new(50.0, 21.0), &mut env).unwrap(), DraftResponse::Changed);
        env.modifiers.alt = false;
        draft.pointer_move(Point::new(50.0, 6.0), &mut env).unwrap();
        assert_eq!(draft.pointer_up(Point::new(50.0, 6.0), &mut env).unwrap(), DraftResponse::Committed);

        let AnnotationData::Polygon(data) = draft.committed() else {
            panic!("expected polygon");
        };
        assert_eq!(data.points.len(), 5);
        assert_eq!(data.points[1].point(), Point::new(50.0, 5.0));
        assert!(!data.points[1].id.is_empty());
        assert_eq!(data.points[2].id, "p1-1");
    }

    #[test]
    fn test_tangent_drag_mirrors_opposite() {
        let mut ctx = ctx();
        let groups = GroupStore::new();
        let mut env = env(&mut ctx, &groups, false);
        let line = AnnotationData::Line(path("s1", PathType::Spline, &[(20.0, 100.0), (80.0, 60.0), (140.0, 100.0)]));
        let mut draft = settled(&line, &mut env);
        let Draft::Path(inner) = &draft else {
            panic!("expected path draft");
        };
        let out = inner.controls()[2];

        drag(&mut draft, &mut env, out, out + kurbo::Vec2::new(0.0, 10.0));
        let Draft::Path(inner) = &draft else {
            panic!("expected path draft");
        };
        let vertex = Point::new(80.0, 60.0);
        let moved = inner.controls()[2];
        let mirrored = inner.controls()[1];
        assert!((moved - (out + kurbo::Vec2::new(0.0, 10.0))).hypot() < 1e-9);
        assert!((mirrored - (vertex + (vertex - moved))).hypot() < 1e-9);
    }

    #[test]
    fn test_delete_inner_spline_vertex_merges_segments() {
        let mut ctx = ctx();
        let groups = GroupStore::new();
        let mut env = env(&mut ctx, &groups, true);
        let line = AnnotationData::Line(path(
            "s1",
            PathType::Spline,
            &[(20.0, 100.0), (60.0, 40.0), (100.0, 100.0), (140.0, 40.0)],
        ));
        let mut draft = settled(&line, &mut env);
        let Draft::Path(inner) = &draft else {
            panic!("expected path draft");
        };
        let before = inner.controls().to_vec();

        assert_eq!(draft.pointer_down(Point::new(60.0, 40.0), &mut env).unwrap(), DraftResponse::Committed);
        let AnnotationData::Line(data) = draft.committed() else {
            panic!("expected line");
        };
        let controls = data.control_points.clone().unwrap();
        assert_eq!(data.points.len(), 3);
        assert_eq!(controls, vec![before[0], before[3], before[4], before[5]]);
    }
}
