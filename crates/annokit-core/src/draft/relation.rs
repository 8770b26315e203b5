//! Relation editing: drag an endpoint onto another annotation to rebind it.

use std::fmt;

use kurbo::Point;

use super::{DraftCore, DraftEnv, DraftResponse, DraftState, DraftTrait, commit};
use crate::annotation::{AnnotationData, RelationData};
use crate::error::EngineResult;
use crate::handles::{EditableHandleSet, HandleEvent, HandleLayer};
use crate::scene;
use crate::session::SessionContext;
use crate::shapes::{Group, GroupRole, GroupStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Source,
    Target,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Source => f.write_str("source"),
            Endpoint::Target => f.write_str("target"),
        }
    }
}

#[derive(Debug)]
pub struct RelationDraft {
    core: DraftCore,
    source_id: String,
    target_id: String,
    /// Logical line endpoints, source first.
    ends: [Point; 2],
    /// Annotation under the dragged endpoint.
    candidate: Option<String>,
    handles: EditableHandleSet<Endpoint>,
}

/// Logical centers of both endpoint groups, `None` when either is missing.
fn centers(data: &RelationData, groups: &GroupStore, ctx: &SessionContext) -> Option<[Point; 2]> {
    let source = groups.get(&data.source_id).and_then(|g| scene::group_center(g, &ctx.axis))?;
    let target = groups.get(&data.target_id).and_then(|g| scene::group_center(g, &ctx.axis))?;
    Some([source, target])
}

impl RelationDraft {
    pub(crate) fn new(
        core: DraftCore,
        data: &RelationData,
        disabled: bool,
        env: &mut DraftEnv,
    ) -> EngineResult<Option<Self>> {
        let Some(ends) = centers(data, env.groups, env.ctx) else {
            log::warn!(
                "Relation {} references a missing annotation ({} -> {})",
                data.meta.id,
                data.source_id,
                data.target_id
            );
            return Ok(None);
        };
        let handles = EditableHandleSet::new(&core.id, core.group.order, disabled);
        let mut draft = Self {
            core,
            source_id: data.source_id.clone(),
            target_id: data.target_id.clone(),
            ends,
            candidate: None,
            handles,
        };
        draft.redraw(env.ctx)?;
        draft
            .handles
            .add_point(Endpoint::Source, HandleLayer::Handles, ends[0], env.ctx)?;
        draft
            .handles
            .add_point(Endpoint::Target, HandleLayer::Handles, ends[1], env.ctx)?;
        Ok(Some(draft))
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    pub fn target_id(&self) -> &str {
        &self.target_id
    }

    pub fn candidate(&self) -> Option<&str> {
        self.candidate.as_deref()
    }

    fn data(&self) -> RelationData {
        RelationData {
            meta: self.core.committed.meta().clone(),
            source_id: self.source_id.clone(),
            target_id: self.target_id.clone(),
        }
    }

    /// Topmost annotation under a viewport point that `handle` may rebind
    /// to: not this relation, not the fixed endpoint, and not a pair some
    /// other relation already links.
    fn candidate_at(&self, point: Point, handle: Endpoint, env: &DraftEnv) -> Option<String> {
        let tolerance = env.ctx.config.hit_tolerance;
        let fixed = match handle {
            Endpoint::Source => &self.target_id,
            Endpoint::Target => &self.source_id,
        };
        let linked = |id: &str| {
            env.relations.iter().any(|(source, target)| match handle {
                Endpoint::Source => source == id && target == fixed,
                Endpoint::Target => source == fixed && target == id,
            })
        };
        env.ctx
            .index
            .query_window(point, tolerance)
            .into_iter()
            .filter(|e| e.key.is_group() && e.role == GroupRole::Annotation)
            .filter(|e| e.key.group != self.core.id && e.key.group != *fixed)
            .filter_map(|e| env.groups.get(&e.key.group))
            .filter(|g| g.is_under_cursor(point, tolerance))
            .max_by_key(|g| g.order)
            .filter(|g| !linked(g.id.as_str()))
            .map(|g| g.id.clone())
    }

    fn sync_handles(&mut self, ctx: &mut SessionContext) -> EngineResult<()> {
        self.handles.set_point(Endpoint::Source, self.ends[0], ctx)?;
        self.handles.set_point(Endpoint::Target, self.ends[1], ctx)
    }

    /// Re-derive the line after an endpoint annotation moved.
    pub(crate) fn refresh_endpoints(&mut self, env: &mut DraftEnv) -> EngineResult<()> {
        if self.handles.is_dragging() {
            return Ok(());
        }
        let data = self.data();
        match centers(&data, env.groups, env.ctx) {
            Some(ends) => {
                self.ends = ends;
                self.redraw(env.ctx)?;
                self.sync_handles(env.ctx)
            }
            None => {
                log::warn!("Relation {} lost an endpoint", self.core.id);
                Ok(())
            }
        }
    }
}

impl DraftTrait for RelationDraft {
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
                self.candidate = None;
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
        let slot = match handle {
            Endpoint::Source => 0,
            Endpoint::Target => 1,
        };
        self.ends[slot] = positions[0];
        let viewport = env.ctx.axis.to_viewport(positions[0]);
        self.candidate = self.candidate_at(viewport, handle, env);
        self.redraw(env.ctx)?;
        self.handles.set_point(handle, positions[0], env.ctx)?;
        Ok(DraftResponse::Changed)
    }

    /// Rebind to the candidate, or snap back to the previous endpoint.
    fn pointer_up(&mut self, _point: Point, env: &mut DraftEnv) -> EngineResult<DraftResponse> {
        let Some(HandleEvent::Up { handle }) = self.handles.pointer_up(env.ctx)? else {
            return Ok(DraftResponse::Ignored);
        };
        if let Some(candidate) = self.candidate.take() {
            log::debug!("{}: {handle} rebound to {candidate}", self.core.id);
            match handle {
                Endpoint::Source => self.source_id = candidate,
                Endpoint::Target => self.target_id = candidate,
            }
        }
        match centers(&self.data(), env.groups, env.ctx) {
            Some(ends) => self.ends = ends,
            None => {
                log::warn!("Relation {} endpoint vanished during drag", self.core.id);
                let committed = self.core.committed.clone();
                self.rebuild(&committed, env)?;
                self.core.state = DraftState::Idle;
                return Ok(DraftResponse::Handled);
            }
        }
        commit(self, env)
    }

    fn cancel_drag(&mut self, _ctx: &mut SessionContext) -> EngineResult<()> {
        self.handles.cancel();
        self.candidate = None;
        Ok(())
    }

    fn sync_coord_to_data(&self) -> AnnotationData {
        AnnotationData::Relation(self.data())
    }

    /// The line is always re-derived from the endpoint ids.
    fn check_commit(
        &self,
        data: AnnotationData,
        _ctx: &mut SessionContext,
    ) -> EngineResult<Option<(AnnotationData, bool)>> {
        Ok(Some((data, true)))
    }

    fn rebuild(&mut self, data: &AnnotationData, env: &mut DraftEnv) -> EngineResult<()> {
        let AnnotationData::Relation(relation) = data else {
            return Err(self.core.mismatch(data));
        };
        self.source_id = relation.source_id.clone();
        self.target_id = relation.target_id.clone();
        self.candidate = None;
        if let Some(ends) = centers(relation, env.groups, env.ctx) {
            self.ends = ends;
        } else {
            log::warn!("Relation {} references a missing annotation", relation.meta.id);
        }
        self.redraw(env.ctx)?;
        self.sync_handles(env.ctx)
    }

    fn redraw(&mut self, ctx: &mut SessionContext) -> EngineResult<()> {
        let shapes = scene::relation_shapes(self.ends[0], self.ends[1], &self.core.style, &ctx.axis)?;
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
    use crate::annotation::{AnnotationMeta, PointData};
    use crate::input::Modifiers;
    use crate::shapes::ShapeStyle;

    fn point(id: &str, x: f64, y: f64) -> AnnotationData {
        AnnotationData::Point(PointData {
            meta: AnnotationMeta::new(id, 0),
            x,
            y,
        })
    }

    fn relation() -> AnnotationData {
        AnnotationData::Relation(RelationData {
            meta: AnnotationMeta::new("rel", 5),
            source_id: "a".into(),
            target_id: "b".into(),
        })
    }

    fn scene_with(ctx: &mut SessionContext, points: &[AnnotationData]) -> GroupStore {
        let mut groups = GroupStore::new();
        for data in points {
            let group = scene::build_group(data, &ShapeStyle::default(), ctx, &groups)
                .unwrap()
                .unwrap();
            groups.insert(group);
        }
        groups
    }

    #[test]
    fn test_missing_endpoint_yields_no_draft() {
        let mut ctx = ctx();
        let groups = scene_with(&mut ctx, &[point("a", 10.0, 10.0)]);
        let mut env = DraftEnv {
            ctx: &mut ctx,
            groups: &groups,
            modifiers: Modifiers::default(),
            relations: &[],
        };
        assert!(Draft::new(&relation(), ShapeStyle::default(), &mut env).unwrap().is_none());
    }

    #[test]
    fn test_endpoint_rebinds_to_candidate() {
        let mut ctx = ctx();
        let groups = scene_with(
            &mut ctx,
            &[point("a", 10.0, 10.0), point("b", 100.0, 10.0), point("c", 100.0, 100.0)],
        );
        let mut env = DraftEnv {
            ctx: &mut ctx,
            groups: &groups,
            modifiers: Modifiers::default(),
            relations: &[],
        };
        let mut draft = Draft::new(&relation(), ShapeStyle::default(), &mut env).unwrap().unwrap();
        draft.settle(env.ctx);

        let response = drag(&mut draft, &mut env, Point::new(100.0, 10.0), Point::new(100.0, 100.0));
        assert_eq!(response, DraftResponse::Committed);
        let AnnotationData::Relation(data) = draft.committed() else {
            panic!("expected relation");
        };
        assert_eq!(data.target_id, "c");
        let line = draft.group().shape(crate::shapes::OUTLINE).unwrap();
        assert_eq!(line.logical()[1], Point::new(100.0, 100.0));
    }

    #[test]
    fn test_rebind_onto_linked_pair_snaps_back() {
        let mut ctx = ctx();
        let groups = scene_with(
            &mut ctx,
            &[point("a", 10.0, 10.0), point("b", 100.0, 10.0), point("c", 100.0, 100.0)],
        );
        let others = vec![("a".to_string(), "c".to_string())];
        let mut env = DraftEnv {
            ctx: &mut ctx,
            groups: &groups,
            modifiers: Modifiers::default(),
            relations: &others,
        };
        let mut draft = Draft::new(&relation(), ShapeStyle::default(), &mut env).unwrap().unwrap();
        draft.settle(env.ctx);

        drag(&mut draft, &mut env, Point::new(100.0, 10.0), Point::new(100.0, 100.0));
        assert_eq!(draft.committed(), &relation());
        let line = draft.group().shape(crate::shapes::OUTLINE).unwrap();
        assert_eq!(line.logical()[1], Point::new(100.0, 10.0));
    }

    #[test]
    fn test_release_over_nothing_snaps_back() {
        let mut ctx = ctx();
        let groups = scene_with(&mut ctx, &[point("a", 10.0, 10.0), point("b", 100.0, 10.0)]);
        let mut env = DraftEnv {
            ctx: &mut ctx,
            groups: &groups,
            modifiers: Modifiers::default(),
            relations: &[],
        };
        let mut draft = Draft::new(&relation(), ShapeStyle::default(), &mut env).unwrap().unwrap();
        draft.settle(env.ctx);

        drag(&mut draft, &mut env, Point::new(100.0, 10.0), Point::new(150.0, 150.0));
        assert_eq!(draft.committed(), &relation());
        let line = draft.group().shape(crate::shapes::OUTLINE).unwrap();
        assert_eq!(line.logical()[1], Point::new(100.0, 10.0));
    }

    #[test]
    fn test_fixed_endpoint_is_not_a_candidate() {
        let mut ctx = ctx();
        let groups = scene_with(&mut ctx, &[point("a", 10.0, 10.0), point("b", 100.0, 10.0)]);
        let mut env = DraftEnv {
            ctx: &mut ctx,
            groups: &groups,
            modifiers: Modifiers::default(),
            relations: &[],
        };
        let mut draft = Draft::new(&relation(), ShapeStyle::default(), &mut env).unwrap().unwrap();
        draft.settle(env.ctx);

        draft.pointer_down(Point::new(100.0, 10.0), &mut env).unwrap();
        draft.pointer_move(Point::new(10.0, 10.0), &mut env).unwrap();
        let Draft::Relation(inner) = &draft else {
            panic!("expected relation draft");
        };
        assert_eq!(inner.candidate(), None);
    }
}
