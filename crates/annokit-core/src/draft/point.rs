//! Single-point editing.

use std::fmt;

use kurbo::Point;

use super::{DraftCore, DraftEnv, DraftResponse, DraftState, DraftTrait, commit};
use crate::annotation::{AnnotationData, PointData};
use crate::error::EngineResult;
use crate::handles::{EditableHandleSet, HandleEvent, HandleLayer};
use crate::scene;
use crate::session::SessionContext;
use crate::shapes::Group;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PointHandle;

impl fmt::Display for PointHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("anchor")
    }
}

#[derive(Debug)]
pub struct PointDraft {
    core: DraftCore,
    at: Point,
    handles: EditableHandleSet<PointHandle>,
}

impl PointDraft {
    pub(crate) fn new(
        core: DraftCore,
        data: &PointData,
        disabled: bool,
        ctx: &mut SessionContext,
    ) -> EngineResult<Self> {
        let handles = EditableHandleSet::new(&core.id, core.group.order, disabled);
        let mut draft = Self {
            core,
            at: Point::new(data.x, data.y),
            handles,
        };
        draft.redraw(ctx)?;
        draft.handles.add_point(PointHandle, HandleLayer::Handles, draft.at, ctx)?;
        Ok(draft)
    }
}

impl DraftTrait for PointDraft {
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
        let Some(HandleEvent::Move { positions, .. }) = self.handles.pointer_move(point, env.ctx)? else {
            return Ok(DraftResponse::Ignored);
        };
        self.at = positions[0];
        self.redraw(env.ctx)?;
        self.handles.set_point(PointHandle, self.at, env.ctx)?;
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
        AnnotationData::Point(PointData {
            meta: self.core.committed.meta().clone(),
            x: self.at.x,
            y: self.at.y,
        })
    }

    fn rebuild(&mut self, data: &AnnotationData, env: &mut DraftEnv) -> EngineResult<()> {
        let AnnotationData::Point(p) = data else {
            return Err(self.core.mismatch(data));
        };
        self.at = Point::new(p.x, p.y);
        self.redraw(env.ctx)?;
        self.handles.set_point(PointHandle, self.at, env.ctx)
    }

    fn redraw(&mut self, ctx: &mut SessionContext) -> EngineResult<()> {
        let shapes = scene::point_shapes(self.at, &self.core.style, &ctx.axis)?;
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

#[cfg(test)]
mod tests {
    use super::super::test_support::{ctx, drag};
    use super::super::Draft;
    use super::*;
    use crate::annotation::AnnotationMeta;
    use crate::input::Modifiers;
    use crate::shapes::{GroupStore, ShapeStyle};

    #[test]
    fn test_point_follows_drag() {
        let mut ctx = ctx();
        let groups = GroupStore::new();
        let mut env = DraftEnv {
            ctx: &mut ctx,
            groups: &groups,
            modifiers: Modifiers::default(),
            relations: &[],
        };
        let data = AnnotationData::Point(PointData {
            meta: AnnotationMeta::new("p1", 0),
            x: 10.0,
            y: 10.0,
        });
        let mut draft = Draft::new(&data, ShapeStyle::default(), &mut env).unwrap().unwrap();
        draft.settle(env.ctx);
        assert_eq!(
            drag(&mut draft, &mut env, Point::new(11.0, 9.0), Point::new(31.0, 49.0)),
            DraftResponse::Committed
        );
        let AnnotationData::Point(p) = draft.committed() else {
            panic!("expected point");
        };
        assert_eq!((p.x, p.y), (30.0, 50.0));
    }
}
