//! Cuboid editing on top of [`CuboidSkeleton`].

use kurbo::Point;

use super::{DraftCore, DraftEnv, DraftResponse, DraftState, DraftTrait, commit};
use crate::annotation::{AnnotationData, CuboidData, CuboidDirection};
use crate::cuboid::{self, CuboidEdge, CuboidHandle, CuboidSkeleton, CuboidVertex};
use crate::error::EngineResult;
use crate::handles::{EditableHandleSet, HandleEvent, HandleLayer};
use crate::scene;
use crate::session::SessionContext;
use crate::shapes::Group;

#[derive(Debug)]
pub struct CuboidDraft {
    core: DraftCore,
    skeleton: CuboidSkeleton,
    /// Snapshot taken on press; perspective is restored against it.
    pre_drag: Option<CuboidSkeleton>,
    direction: CuboidDirection,
    handles: EditableHandleSet<CuboidHandle>,
}

impl CuboidDraft {
    pub(crate) fn new(
        core: DraftCore,
        data: &CuboidData,
        disabled: bool,
        ctx: &mut SessionContext,
    ) -> EngineResult<Self> {
        let handles = EditableHandleSet::new(&core.id, core.group.order, disabled);
        let mut draft = Self {
            core,
            skeleton: CuboidSkeleton::from_planes(&data.front, &data.back),
            pre_drag: None,
            direction: data.direction,
            handles,
        };
        draft.redraw(ctx)?;
        // The back-bottom edge is drawn but never dragged.
        for edge in CuboidEdge::ALL {
            let at = draft.skeleton.edge(edge);
            draft
                .handles
                .add_edge(CuboidHandle::Edge(edge), HandleLayer::Handles, at, edge.is_draggable(), ctx)?;
        }
        for vertex in CuboidVertex::ALL {
            let at = draft.skeleton.vertex(vertex);
            draft
                .handles
                .add_point(CuboidHandle::Vertex(vertex), HandleLayer::Handles, at, ctx)?;
        }
        Ok(draft)
    }

    pub fn skeleton(&self) -> &CuboidSkeleton {
        &self.skeleton
    }

    pub fn direction(&self) -> CuboidDirection {
        self.direction
    }

    pub(crate) fn set_direction(&mut self, direction: CuboidDirection, ctx: &mut SessionContext) -> EngineResult<()> {
        self.direction = direction;
        self.redraw(ctx)
    }

    fn sync_handles(&mut self, ctx: &mut SessionContext) -> EngineResult<()> {
        for vertex in CuboidVertex::ALL {
            self.handles
                .set_point(CuboidHandle::Vertex(vertex), self.skeleton.vertex(vertex), ctx)?;
        }
        for edge in CuboidEdge::ALL {
            self.handles
                .set_edge(CuboidHandle::Edge(edge), self.skeleton.edge(edge), ctx)?;
        }
        Ok(())
    }
}

impl DraftTrait for CuboidDraft {
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
                self.pre_drag = Some(self.skeleton.clone());
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
        let Some(pre_drag) = self.pre_drag.as_ref() else {
            return Ok(DraftResponse::Ignored);
        };
        self.skeleton.drag(handle, positions[0], pre_drag);
        self.redraw(env.ctx)?;
        self.sync_handles(env.ctx)?;
        Ok(DraftResponse::Changed)
    }

    fn pointer_up(&mut self, _point: Point, env: &mut DraftEnv) -> EngineResult<DraftResponse> {
        if self.handles.pointer_up(env.ctx)?.is_none() {
            return Ok(DraftResponse::Ignored);
        }
        self.pre_drag = None;
        commit(self, env)
    }

    fn cancel_drag(&mut self, _ctx: &mut SessionContext) -> EngineResult<()> {
        self.handles.cancel();
        self.pre_drag = None;
        Ok(())
    }

    fn sync_coord_to_data(&self) -> AnnotationData {
        AnnotationData::Cuboid(CuboidData {
            meta: self.core.committed.meta().clone(),
            direction: self.direction,
            front: self.skeleton.front(),
            back: self.skeleton.back(),
        })
    }

    /// Planes whose corners crossed over are reordered, which moves handles.
    fn check_commit(
        &self,
        data: AnnotationData,
        _ctx: &mut SessionContext,
    ) -> EngineResult<Option<(AnnotationData, bool)>> {
        let AnnotationData::Cuboid(mut cuboid) = data else {
            return Ok(Some((data, false)));
        };
        let changed = cuboid::normalize(&mut cuboid);
        Ok(Some((AnnotationData::Cuboid(cuboid), changed)))
    }

    fn rebuild(&mut self, data: &AnnotationData, env: &mut DraftEnv) -> EngineResult<()> {
        let AnnotationData::Cuboid(cuboid) = data else {
            return Err(self.core.mismatch(data));
        };
        self.skeleton = CuboidSkeleton::from_planes(&cuboid.front, &cuboid.back);
        self.direction = cuboid.direction;
        self.redraw(env.ctx)?;
        self.sync_handles(env.ctx)
    }

    fn redraw(&mut self, ctx: &mut SessionContext) -> EngineResult<()> {
        let shapes = scene::cuboid_shapes(
            &self.skeleton.front(),
            &self.skeleton.back(),
            self.direction,
            &self.core.style,
            &ctx.axis,
        )?;
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
    use crate::annotation::{AnnotationMeta, CuboidPlane};
    use crate::input::Modifiers;
    use crate::shapes::{GroupStore, ShapeStyle};

    fn plane(x0: f64, y0: f64, x1: f64, y1: f64) -> CuboidPlane {
        CuboidPlane::from_points([
            Point::new(x0, y0),
            Point::new(x1, y0),
            Point::new(x1, y1),
            Point::new(x0, y1),
        ])
    }

    fn record() -> AnnotationData {
        AnnotationData::Cuboid(CuboidData {
            meta: AnnotationMeta::new("c1", 0),
            direction: CuboidDirection::Front,
            front: plane(20.0, 40.0, 100.0, 120.0),
            back: plane(50.0, 20.0, 130.0, 140.0),
        })
    }

    fn env<'a>(ctx: &'a mut SessionContext, groups: &'a GroupStore) -> DraftEnv<'a> {
        DraftEnv {
            ctx,
            groups,
            modifiers: Modifiers::default(),
            relations: &[],
        }
    }

    #[test]
    fn test_back_bottom_edge_is_not_draggable() {
        let mut ctx = ctx();
        let groups = GroupStore::new();
        let mut env = env(&mut ctx, &groups);
        let mut draft = Draft::new(&record(), ShapeStyle::default(), &mut env).unwrap().unwrap();
        draft.settle(env.ctx);
        // Midpoint of the back-bottom edge, far from every other handle.
        let response = draft.pointer_down(Point::new(90.0, 140.0), &mut env).unwrap();
        assert_eq!(response, DraftResponse::Ignored);
    }

    #[test]
    fn test_front_drag_within_back_height_keeps_back() {
        let mut ctx = ctx();
        let groups = GroupStore::new();
        let mut env = env(&mut ctx, &groups);
        let mut draft = Draft::new(&record(), ShapeStyle::default(), &mut env).unwrap().unwrap();
        draft.settle(env.ctx);

        drag(&mut draft, &mut env, Point::new(20.0, 40.0), Point::new(20.0, 30.0));
        let AnnotationData::Cuboid(data) = draft.committed() else {
            panic!("expected cuboid");
        };
        assert_eq!(data.front.tl, Point::new(20.0, 30.0));
        assert_eq!(data.front.tr.y, 30.0);
        assert_eq!(data.back, plane(50.0, 20.0, 130.0, 140.0));
    }

    #[test]
    fn test_direction_change_commits() {
        let mut ctx = ctx();
        let groups = GroupStore::new();
        let mut env = env(&mut ctx, &groups);
        let mut draft = Draft::new(&record(), ShapeStyle::default(), &mut env).unwrap().unwrap();
        draft.settle(env.ctx);

        let response = draft.set_cuboid_direction(CuboidDirection::Left, &mut env).unwrap();
        assert_eq!(response, DraftResponse::Committed);
        let AnnotationData::Cuboid(data) = draft.committed() else {
            panic!("expected cuboid");
        };
        assert_eq!(data.direction, CuboidDirection::Left);
        let face = draft.group().shape("face").unwrap();
        assert_eq!(face.logical()[0], Point::new(50.0, 20.0));
    }
}
