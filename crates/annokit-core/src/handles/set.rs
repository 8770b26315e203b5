//! The handle set each draft owns.

use std::fmt::{Debug, Display};

use kurbo::{Point, Vec2};

use super::{ControlEdge, ControlPoint, handle_shape_id};
use crate::error::{EngineError, EngineResult};
use crate::session::SessionContext;
use crate::shapes::{Group, GroupRole, Shape, ShapeKind, ShapeStyle};

/// Which group a handle's visual lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleLayer {
    /// Vertex and edge handles.
    Handles,
    /// Spline tangent controls, hit-tested before everything else.
    Tangents,
}

/// What a pointer event did to the set.
#[derive(Debug, Clone, PartialEq)]
pub enum HandleEvent<H> {
    Down {
        handle: H,
    },
    /// Proposed logical positions for the active handle (one point, or the
    /// two endpoints of an edge) and the logical drag delta.
    Move {
        handle: H,
        positions: Vec<Point>,
        delta: Vec2,
    },
    Up {
        handle: H,
    },
}

impl<H: Copy> HandleEvent<H> {
    pub fn handle(&self) -> H {
        match self {
            HandleEvent::Down { handle } | HandleEvent::Move { handle, .. } | HandleEvent::Up { handle } => {
                *handle
            }
        }
    }
}

/// Points and edges of one draft, with drag tracking. Every pointer method
/// returns the resulting [`HandleEvent`] so the owning draft can fan the
/// movement out to its dependent shapes.
pub struct EditableHandleSet<H> {
    owner: String,
    group: Group,
    tangents: Group,
    points: Vec<ControlPoint<H>>,
    edges: Vec<ControlEdge<H>>,
    active: Option<H>,
    press_origin: Option<Point>,
    hovered: Option<H>,
    disabled: bool,
    armed: bool,
}

impl<H> Debug for EditableHandleSet<H>
where
    H: Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditableHandleSet")
            .field("owner", &self.owner)
            .field("points", &self.points.len())
            .field("edges", &self.edges.len())
            .field("active", &self.active)
            .field("hovered", &self.hovered)
            .field("disabled", &self.disabled)
            .field("armed", &self.armed)
            .finish()
    }
}

impl<H> EditableHandleSet<H>
where
    H: Copy + Eq + Debug + Display,
{
    /// New, unarmed set. Handles ignore the pointer until [`Self::arm`].
    pub fn new(owner: &str, order: i64, disabled: bool) -> Self {
        let mut group = Group::new(format!("{owner}:handles"), order, GroupRole::Handles);
        group.always_on_top = true;
        let mut tangents = Group::new(format!("{owner}:tangents"), order, GroupRole::TangentControl);
        tangents.always_on_top = true;
        Self {
            owner: owner.to_string(),
            group,
            tangents,
            points: Vec::new(),
            edges: Vec::new(),
            active: None,
            press_origin: None,
            hovered: None,
            disabled,
            armed: false,
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Start reacting to the pointer.
    pub fn arm(&mut self) {
        self.armed = true;
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn active(&self) -> Option<H> {
        self.active
    }

    pub fn is_dragging(&self) -> bool {
        self.active.is_some()
    }

    pub fn hovered(&self) -> Option<H> {
        self.hovered
    }

    pub fn group(&self) -> &Group {
        &self.group
    }

    pub fn tangent_group(&self) -> &Group {
        &self.tangents
    }

    fn layer_mut(&mut self, layer: HandleLayer) -> &mut Group {
        match layer {
            HandleLayer::Handles => &mut self.group,
            HandleLayer::Tangents => &mut self.tangents,
        }
    }

    fn layer(&self, layer: HandleLayer) -> &Group {
        match layer {
            HandleLayer::Handles => &self.group,
            HandleLayer::Tangents => &self.tangents,
        }
    }

    pub fn has(&self, handle: H) -> bool {
        self.points.iter().any(|p| p.handle == handle) || self.edges.iter().any(|e| e.handle == handle)
    }

    pub fn add_point(&mut self, handle: H, layer: HandleLayer, at: Point, ctx: &mut SessionContext) -> EngineResult<()> {
        let shape = Shape::new(
            handle_shape_id(&handle),
            ShapeKind::Point {
                radius: ctx.config.handle_radius,
            },
            vec![at],
            ShapeStyle::handle(),
            &ctx.axis,
        )?;
        self.layer_mut(layer).add(shape, ctx)?;
        let mut cp = ControlPoint::new(handle, layer);
        cp.disabled = self.disabled;
        self.points.push(cp);
        Ok(())
    }

    /// Add an edge handle; `draggable = false` makes it a visual-only edge.
    pub fn add_edge(
        &mut self,
        handle: H,
        layer: HandleLayer,
        at: [Point; 2],
        draggable: bool,
        ctx: &mut SessionContext,
    ) -> EngineResult<()> {
        let shape = Shape::new(
            handle_shape_id(&handle),
            ShapeKind::Line,
            at.to_vec(),
            ShapeStyle::handle(),
            &ctx.axis,
        )?;
        // Edges render below the points added after them but must not
        // cover points already present.
        let index = self.edges.iter().filter(|e| e.layer == layer).count();
        self.layer_mut(layer).insert(index, vec![shape], ctx)?;
        let mut edge = ControlEdge::new(handle, layer);
        edge.disabled = self.disabled || !draggable;
        self.edges.push(edge);
        Ok(())
    }

    pub fn remove(&mut self, handle: H, ctx: &mut SessionContext) -> EngineResult<()> {
        let id = handle_shape_id(&handle);
        if let Some(i) = self.points.iter().position(|p| p.handle == handle) {
            let cp = self.points.remove(i);
            self.layer_mut(cp.layer).remove(&id, ctx)?;
        } else if let Some(i) = self.edges.iter().position(|e| e.handle == handle) {
            let edge = self.edges.remove(i);
            self.layer_mut(edge.layer).remove(&id, ctx)?;
        } else {
            return Err(EngineError::ShapeNotFound {
                group: self.group.id.clone(),
                shape: id,
            });
        }
        if self.hovered == Some(handle) {
            self.hovered = None;
        }
        if self.active == Some(handle) {
            self.active = None;
            self.press_origin = None;
        }
        Ok(())
    }

    fn layer_of(&self, handle: H) -> Option<HandleLayer> {
        self.points
            .iter()
            .find(|p| p.handle == handle)
            .map(|p| p.layer)
            .or_else(|| self.edges.iter().find(|e| e.handle == handle).map(|e| e.layer))
    }

    /// Move a point handle's visual.
    pub fn set_point(&mut self, handle: H, at: Point, ctx: &mut SessionContext) -> EngineResult<()> {
        self.set_shape(handle, vec![at], ctx)
    }

    /// Move an edge handle's visual.
    pub fn set_edge(&mut self, handle: H, at: [Point; 2], ctx: &mut SessionContext) -> EngineResult<()> {
        self.set_shape(handle, at.to_vec(), ctx)
    }

    fn set_shape(&mut self, handle: H, points: Vec<Point>, ctx: &mut SessionContext) -> EngineResult<()> {
        let layer = self.layer_of(handle).ok_or_else(|| EngineError::ShapeNotFound {
            group: self.group.id.clone(),
            shape: handle_shape_id(&handle),
        })?;
        self.layer_mut(layer)
            .set_shape_points(&handle_shape_id(&handle), points, ctx)
    }

    /// Logical points of a handle's visual.
    pub fn position(&self, handle: H) -> Option<&[Point]> {
        let layer = self.layer_of(handle)?;
        self.layer(layer)
            .shape(&handle_shape_id(&handle))
            .map(|s| s.logical())
    }

    fn viewport_of(&self, handle: H) -> Option<&[Point]> {
        let layer = self.layer_of(handle)?;
        self.layer(layer)
            .shape(&handle_shape_id(&handle))
            .map(|s| s.viewport())
    }

    /// Topmost handle under the cursor: tangents, then points, then edges;
    /// later-added first within each.
    pub fn handle_at(&self, point: Point, tolerance: f64) -> Option<H> {
        if !self.armed {
            return None;
        }
        for layer in [HandleLayer::Tangents, HandleLayer::Handles] {
            let group = self.layer(layer);
            let hit = self
                .points
                .iter()
                .rev()
                .filter(|p| p.layer == layer)
                .map(|p| p.handle)
                .chain(
                    self.edges
                        .iter()
                        .rev()
                        .filter(|e| e.layer == layer && !e.disabled)
                        .map(|e| e.handle),
                )
                .find(|h| {
                    group
                        .shape(&handle_shape_id(h))
                        .is_some_and(|s| s.is_under_cursor(point, tolerance))
                });
            if hit.is_some() {
                return hit;
            }
        }
        None
    }

    fn set_hover(&mut self, handle: Option<H>, ctx: &mut SessionContext) -> EngineResult<()> {
        if self.hovered == handle {
            return Ok(());
        }
        let previous = self.hovered;
        self.hovered = handle;
        for (h, hovered) in [(previous, false), (handle, true)] {
            let Some(h) = h else { continue };
            let style = if hovered {
                ShapeStyle::handle_hovered()
            } else {
                ShapeStyle::handle()
            };
            if let Some(cp) = self.points.iter_mut().find(|p| p.handle == h) {
                cp.set_hovered(hovered);
            }
            if let Some(edge) = self.edges.iter_mut().find(|e| e.handle == h) {
                edge.set_hovered(hovered);
            }
            if let Some(layer) = self.layer_of(h) {
                self.layer_mut(layer).set_shape_style(&handle_shape_id(&h), style, ctx)?;
            }
        }
        Ok(())
    }

    /// Press: start dragging the handle under the cursor.
    pub fn pointer_down(&mut self, point: Point, ctx: &mut SessionContext) -> EngineResult<Option<HandleEvent<H>>> {
        if !self.armed || self.disabled {
            return Ok(None);
        }
        let tolerance = ctx.config.hit_tolerance;
        match self.handle_at(point, tolerance) {
            Some(handle) => self.begin_drag(handle, point, ctx).map(Some),
            None => Ok(None),
        }
    }

    /// Start dragging `handle` as if it had been pressed at `point`.
    pub fn begin_drag(&mut self, handle: H, point: Point, ctx: &mut SessionContext) -> EngineResult<HandleEvent<H>> {
        let viewport: Vec<Point> = self
            .viewport_of(handle)
            .map(|v| v.to_vec())
            .ok_or_else(|| EngineError::ShapeNotFound {
                group: self.group.id.clone(),
                shape: handle_shape_id(&handle),
            })?;
        if let Some(cp) = self.points.iter_mut().find(|p| p.handle == handle) {
            cp.begin(viewport[0]);
        } else if let Some(edge) = self.edges.iter_mut().find(|e| e.handle == handle) {
            edge.begin([viewport[0], viewport[viewport.len() - 1]]);
        }
        self.active = Some(handle);
        self.press_origin = Some(point);
        self.set_hover(Some(handle), ctx)?;
        log::debug!("{}: drag start on {handle}", self.owner);
        Ok(HandleEvent::Down { handle })
    }

    /// Move: propose new positions for the active handle, or track hover.
    pub fn pointer_move(&mut self, point: Point, ctx: &mut SessionContext) -> EngineResult<Option<HandleEvent<H>>> {
        let (Some(handle), Some(origin)) = (self.active, self.press_origin) else {
            if self.armed {
                let hovered = self.handle_at(point, ctx.config.hit_tolerance);
                self.set_hover(hovered, ctx)?;
            }
            return Ok(None);
        };
        let delta = point - origin;
        let allow = ctx.config.allow_out_of_image;
        let positions = if let Some(cp) = self.points.iter().find(|p| p.handle == handle) {
            cp.drag(delta, &ctx.axis, allow).map(|p| vec![p])
        } else {
            self.edges
                .iter()
                .find(|e| e.handle == handle)
                .and_then(|e| e.drag(delta, &ctx.axis, allow))
                .map(|pair| pair.to_vec())
        };
        let Some(positions) = positions else {
            return Ok(None);
        };
        Ok(Some(HandleEvent::Move {
            handle,
            positions,
            delta: ctx.axis.to_logical_delta(delta),
        }))
    }

    /// Release: end the drag.
    pub fn pointer_up(&mut self, ctx: &mut SessionContext) -> EngineResult<Option<HandleEvent<H>>> {
        let Some(handle) = self.active.take() else {
            return Ok(None);
        };
        self.finish(handle);
        self.set_hover(None, ctx)?;
        log::debug!("{}: drag end on {handle}", self.owner);
        Ok(Some(HandleEvent::Up { handle }))
    }

    /// Drop the drag without emitting `Up`.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.active.take() {
            self.finish(handle);
        }
    }

    fn finish(&mut self, handle: H) {
        self.press_origin = None;
        if let Some(cp) = self.points.iter_mut().find(|p| p.handle == handle) {
            cp.end();
        }
        if let Some(edge) = self.edges.iter_mut().find(|e| e.handle == handle) {
            edge.end();
        }
    }

    pub fn refresh(&mut self, ctx: &mut SessionContext) {
        self.group.refresh(ctx);
        self.tangents.refresh(ctx);
    }

    pub fn sync_viewport(&mut self, ctx: &mut SessionContext) {
        self.group.sync_viewport(ctx);
        self.tangents.sync_viewport(ctx);
    }

    /// Remove every handle visual.
    pub fn destroy(&mut self, ctx: &mut SessionContext) -> EngineResult<()> {
        self.cancel();
        self.group.destroy(ctx)?;
        self.tangents.destroy(ctx)?;
        self.points.clear();
        self.edges.clear();
        self.hovered = None;
        self.armed = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum H {
        A,
        B,
        Edge,
    }

    impl std::fmt::Display for H {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{self:?}")
        }
    }

    fn ctx() -> SessionContext {
        let mut ctx = SessionContext::default();
        ctx.config.allow_out_of_image = true;
        ctx
    }

    fn set(ctx: &mut SessionContext) -> EditableHandleSet<H> {
        let mut set = EditableHandleSet::new("a1", 0, false);
        set.add_edge(H::Edge, HandleLayer::Handles, [Point::new(0.0, 0.0), Point::new(100.0, 0.0)], true, ctx)
            .unwrap();
        set.add_point(H::A, HandleLayer::Handles, Point::new(0.0, 0.0), ctx).unwrap();
        set.add_point(H::B, HandleLayer::Handles, Point::new(100.0, 0.0), ctx).unwrap();
        set
    }

    #[test]
    fn test_unarmed_set_ignores_pointer() {
        let mut ctx = ctx();
        let mut set = set(&mut ctx);
        assert!(set.pointer_down(Point::new(0.0, 0.0), &mut ctx).unwrap().is_none());
        set.arm();
        assert!(set.pointer_down(Point::new(0.0, 0.0), &mut ctx).unwrap().is_some());
    }

    #[test]
    fn test_points_win_over_edges() {
        let mut ctx = ctx();
        let mut set = set(&mut ctx);
        set.arm();
        assert_eq!(set.handle_at(Point::new(1.0, 1.0), 2.0), Some(H::A));
        assert_eq!(set.handle_at(Point::new(50.0, 1.0), 2.0), Some(H::Edge));
        assert_eq!(set.handle_at(Point::new(50.0, 30.0), 2.0), None);
    }

    #[test]
    fn test_point_drag_reports_events() {
        let mut ctx = ctx();
        let mut set = set(&mut ctx);
        set.arm();
        assert_eq!(
            set.pointer_down(Point::new(100.0, 0.0), &mut ctx).unwrap(),
            Some(HandleEvent::Down { handle: H::B })
        );
        assert!(set.is_dragging());
        let event = set.pointer_move(Point::new(110.0, 20.0), &mut ctx).unwrap().unwrap();
        assert_eq!(
            event,
            HandleEvent::Move {
                handle: H::B,
                positions: vec![Point::new(110.0, 20.0)],
                delta: Vec2::new(10.0, 20.0),
            }
        );
        assert_eq!(set.pointer_up(&mut ctx).unwrap(), Some(HandleEvent::Up { handle: H::B }));
        assert!(!set.is_dragging());
    }

    #[test]
    fn test_edge_drag_moves_both_endpoints() {
        let mut ctx = ctx();
        let mut set = set(&mut ctx);
        set.arm();
        set.pointer_down(Point::new(50.0, 0.0), &mut ctx).unwrap();
        let event = set.pointer_move(Point::new(50.0, 15.0), &mut ctx).unwrap().unwrap();
        let HandleEvent::Move { positions, .. } = event else {
            panic!("expected move");
        };
        assert_eq!(positions, vec![Point::new(0.0, 15.0), Point::new(100.0, 15.0)]);
    }

    #[test]
    fn test_disabled_set_refuses_drag() {
        let mut ctx = ctx();
        let mut set: EditableHandleSet<H> = EditableHandleSet::new("ro", 0, true);
        set.add_point(H::A, HandleLayer::Handles, Point::new(0.0, 0.0), &mut ctx).unwrap();
        set.arm();
        assert!(set.pointer_down(Point::new(0.0, 0.0), &mut ctx).unwrap().is_none());
    }

    #[test]
    fn test_hover_restyles_handle() {
        let mut ctx = ctx();
        let mut set = set(&mut ctx);
        set.arm();
        set.pointer_move(Point::new(0.0, 0.0), &mut ctx).unwrap();
        assert_eq!(set.hovered(), Some(H::A));
        let shape = set.group().shape("handle:A").unwrap();
        assert_eq!(shape.style(), &ShapeStyle::handle_hovered());
        set.pointer_move(Point::new(50.0, 50.0), &mut ctx).unwrap();
        assert_eq!(set.hovered(), None);
    }
}
