//! Axis-aligned rectangle editing.

use std::fmt;

use kurbo::Point;

use super::{DraftCore, DraftEnv, DraftResponse, DraftState, DraftTrait, commit};
use crate::annotation::{AnnotationData, RectData};
use crate::cuboid::Corner;
use crate::error::EngineResult;
use crate::handles::{EditableHandleSet, HandleEvent, HandleLayer};
use crate::scene;
use crate::session::SessionContext;
use crate::shapes::Group;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Top,
    Right,
    Bottom,
    Left,
}

impl Side {
    pub const ALL: [Side; 4] = [Side::Top, Side::Right, Side::Bottom, Side::Left];

    /// Corner indices of the side's endpoints, in `[tl, tr, br, bl]` order.
    fn corners(self) -> [usize; 2] {
        match self {
            Side::Top => [0, 1],
            Side::Right => [1, 2],
            Side::Bottom => [3, 2],
            Side::Left => [0, 3],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RectHandle {
    Corner(Corner),
    Side(Side),
}

impl fmt::Display for RectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RectHandle::Corner(c) => write!(f, "corner-{}", c.as_str()),
            RectHandle::Side(s) => write!(f, "side-{}", format!("{s:?}").to_lowercase()),
        }
    }
}

/// Corners sharing an edge with `corner`: the horizontal neighbour (same
/// y) and the vertical one (same x).
fn neighbours(corner: Corner) -> (usize, usize) {
    match corner {
        Corner::Tl => (1, 3),
        Corner::Tr => (0, 2),
        Corner::Br => (3, 1),
        Corner::Bl => (2, 0),
    }
}

#[derive(Debug)]
pub struct RectDraft {
    core: DraftCore,
    /// `[tl, tr, br, bl]`, logical. May be flipped mid-drag.
    corners: [Point; 4],
    handles: EditableHandleSet<RectHandle>,
}

impl RectDraft {
    pub(crate) fn new(
        core: DraftCore,
        data: &RectData,
        disabled: bool,
        ctx: &mut SessionContext,
    ) -> EngineResult<Self> {
        let handles = EditableHandleSet::new(&core.id, core.group.order, disabled);
        let mut draft = Self {
            core,
            corners: data.corners(),
            handles,
        };
        draft.redraw(ctx)?;
        for side in Side::ALL {
            let at = draft.side_points(side);
            draft
                .handles
                .add_edge(RectHandle::Side(side), HandleLayer::Handles, at, true, ctx)?;
        }
        for (i, corner) in Corner::ALL.into_iter().enumerate() {
            draft
                .handles
                .add_point(RectHandle::Corner(corner), HandleLayer::Handles, draft.corners[i], ctx)?;
        }
        Ok(draft)
    }

    pub fn corners(&self) -> [Point; 4] {
        self.corners
    }

    fn side_points(&self, side: Side) -> [Point; 2] {
        let [a, b] = side.corners();
        [self.corners[a], self.corners[b]]
    }

    fn move_corner(&mut self, corner: Corner, to: Point) {
        let (horizontal, vertical) = neighbours(corner);
        self.corners[corner as usize] = to;
        self.corners[horizontal].y = to.y;
        self.corners[vertical].x = to.x;
    }

    /// Sides only move perpendicular to themselves.
    fn move_side(&mut self, side: Side, to: Point) {
        let [a, b] = side.corners();
        match side {
            Side::Top | Side::Bottom => {
                self.corners[a].y = to.y;
                self.corners[b].y = to.y;
            }
            Side::Left | Side::Right => {
                self.corners[a].x = to.x;
                self.corners[b].x = to.x;
            }
        }
    }

    fn sync_handles(&mut self, ctx: &mut SessionContext) -> EngineResult<()> {
        for (i, corner) in Corner::ALL.into_iter().enumerate() {
            self.handles.set_point(RectHandle::Corner(corner), self.corners[i], ctx)?;
        }
        for side in Side::ALL {
            let at = self.side_points(side);
            self.handles.set_edge(RectHandle::Side(side), at, ctx)?;
        }
        Ok(())
    }
}

impl DraftTrait for RectDraft {
    fn core(&self) -> &DraftCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut DraftCore {
        &mut self.core
    }

    fn overlays(&self) -> Vec<&Group> {
        vec![self.handles.group()]
    }

    fn arm(&mut self) {
        self.handles.arm();
    }

    fn pointer_down(&mut self, point: Point, env: &mut DraftEnv) -> EngineResult<DraftResponse> {
        match self.handles.pointer_down(point, env.ctx)? {
            Some(_) => {
                self.core.state = DraftState::Dragging;
                Ok(DraftResponse::Handled)
            }
            None => Ok(DraftResponse::Ignored),
        }
    }

    fn pointer_move(&mut self, point: Point, env: &mut DraftEnv) -> EngineResult<DraftResponse> {
        let Some(HandleEvent::Move { handle, positions, .. }) = self.handles.pointer_move(point, env.ctx)? else {
            return Ok(DraftResponse::Ignored);
        };
        match handle {
            RectHandle::Corner(corner) => self.move_corner(corner, positions[0]),
            RectHandle::Side(side) => self.move_side(side, positions[0]),
        }
        self.redraw(env.ctx)?;
        self.sync_handles(env.ctx)?;
        Ok(DraftResponse::Changed)
    }

    fn pointer_up(&mut self, _point: Point, env: &mut DraftEnv) -> EngineResult<DraftResponse> {
        if self.handles.pointer_up(env.ctx)?.is_none() {
            return Ok(DraftResponse::Ignored);
        }
        commit(self, env)
    }

    fn cancel_drag(&mut self, _ctx: &mut SessionContext) -> EngineResult<()> {
        self.handles.cancel();
        Ok(())
    }

    fn sync_coord_to_data(&self) -> AnnotationData {
        let [tl, tr, _, bl] = self.corners;
        AnnotationData::Rect(RectData {
            meta: self.core.committed.meta().clone(),
            x: tl.x.min(tr.x),
            y: tl.y.min(bl.y),
            width: (tr.x - tl.x).abs(),
            height: (bl.y - tl.y).abs(),
        })
    }

    /// A drag that crossed the opposite side leaves the corners flipped;
    /// rebuild so every handle sits on its named corner again.
    fn check_commit(
        &self,
        data: AnnotationData,
        _ctx: &mut SessionContext,
    ) -> EngineResult<Option<(AnnotationData, bool)>> {
        let [tl, tr, _, bl] = self.corners;
        Ok(Some((data, tl.x > tr.x || tl.y > bl.y)))
    }

    fn rebuild(&mut self, data: &AnnotationData, env: &mut DraftEnv) -> EngineResult<()> {
        let AnnotationData::Rect(rect) = data else {
            return Err(self.core.mismatch(data));
        };
        self.corners = rect.corners();
        self.redraw(env.ctx)?;
        self.sync_handles(env.ctx)
    }

    fn redraw(&mut self, ctx: &mut SessionContext) -> EngineResult<()> {
        let shapes = scene::rect_shapes(self.corners, &self.core.style, &ctx.axis)?;
        self.core.set_visuals(shapes, ctx)
    }

    fn sync_overlays(&mut self, ctx: &mut SessionContext) {
        self.handles.sync_viewport(ctx);
    }

    fn refresh_overlays(&mut self, ctx: &mut SessionContext) {
        self.handles.refresh(ctx);
    }

    fn destroy_overlays(&mut self, ctx: &mut SessionContext) -> EngineResult<()> {
        self.handles.destroy(ctx)
    }
}
