//! Editing state machines, one per annotation kind.
//!
//! A draft wraps the selected annotation: it owns the annotation's visual
//! group and a handle set, turns handle events into geometry changes and
//! writes the result back into a record on commit.
//!
//! Lifecycle: `Assembling` until the first flush arms the handles, then
//! `Idle`. A press on a handle enters `Dragging`; the release runs
//! `Committing`, optionally `Rebuilding` when the committed record changed
//! shape, and returns to `Idle`. Deselecting archives the draft.

mod cuboid;
mod path;
mod point;
mod rect;
mod relation;

pub use cuboid::CuboidDraft;
pub use path::{PathDraft, PathHandle, TangentSide};
pub use point::{PointDraft, PointHandle};
pub use rect::{RectDraft, RectHandle, Side};
pub use relation::{Endpoint, RelationDraft};

use kurbo::Point;

use crate::annotation::{AnnotationData, CuboidDirection, Tool};
use crate::error::{EngineError, EngineResult};
use crate::input::Modifiers;
use crate::scene;
use crate::session::SessionContext;
use crate::shapes::{Group, GroupStore, Shape, ShapeStyle, WidgetState};

/// Where a draft is in its edit cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DraftState {
    /// Visuals exist; handles are not armed yet.
    #[default]
    Assembling,
    Idle,
    Dragging,
    Committing,
    Rebuilding,
    /// Destroyed; only the committed record remains.
    Archived,
}

/// What a pointer event did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftResponse {
    /// Not for this draft.
    Ignored,
    /// Consumed without changing geometry.
    Handled,
    /// Live geometry changed.
    Changed,
    /// A new record was committed.
    Committed,
}

impl DraftResponse {
    pub fn is_consumed(&self) -> bool {
        !matches!(self, DraftResponse::Ignored)
    }
}

/// Everything a draft may touch while handling an event.
pub struct DraftEnv<'a> {
    pub ctx: &'a mut SessionContext,
    pub groups: &'a GroupStore,
    pub modifiers: Modifiers,
    /// `(source, target)` of the other relations in the session.
    pub relations: &'a [(String, String)],
}

/// State shared by every draft kind.
#[derive(Debug)]
pub struct DraftCore {
    pub id: String,
    pub state: DraftState,
    pub group: Group,
    pub style: ShapeStyle,
    /// Last committed record, logical coordinates.
    pub committed: AnnotationData,
}

impl DraftCore {
    fn new(data: &AnnotationData, style: ShapeStyle) -> Self {
        let mut group = scene::new_annotation_group(data);
        group.state = WidgetState::Selected;
        Self {
            id: data.id().to_string(),
            state: DraftState::Assembling,
            group,
            style,
            committed: data.clone(),
        }
    }

    /// Replace the visual group's members.
    fn set_visuals(&mut self, shapes: Vec<Shape>, ctx: &mut SessionContext) -> EngineResult<()> {
        scene::replace_shapes(&mut self.group, shapes, ctx)
    }

    fn mismatch(&self, data: &AnnotationData) -> EngineError {
        EngineError::ToolMismatch {
            id: self.id.clone(),
            expected: self.committed.tool(),
            actual: data.tool(),
        }
    }
}

/// Behavior each draft kind provides. Lifecycle bookkeeping shared by all
/// kinds lives in [`Draft`].
pub(crate) trait DraftTrait {
    fn core(&self) -> &DraftCore;
    fn core_mut(&mut self) -> &mut DraftCore;

    /// Handle and preview groups drawn above the annotation.
    fn overlays(&self) -> Vec<&Group>;

    fn arm(&mut self);

    fn pointer_down(&mut self, point: Point, env: &mut DraftEnv) -> EngineResult<DraftResponse>;
    fn pointer_move(&mut self, point: Point, env: &mut DraftEnv) -> EngineResult<DraftResponse>;
    fn pointer_up(&mut self, point: Point, env: &mut DraftEnv) -> EngineResult<DraftResponse>;

    /// Drop any drag in progress without committing.
    fn cancel_drag(&mut self, ctx: &mut SessionContext) -> EngineResult<()>;

    /// Record of the current working geometry.
    fn sync_coord_to_data(&self) -> AnnotationData;

    /// Final say on a commit: `None` refuses it, `Some((data, true))`
    /// requires a rebuild from `data`.
    fn check_commit(
        &self,
        data: AnnotationData,
        _ctx: &mut SessionContext,
    ) -> EngineResult<Option<(AnnotationData, bool)>> {
        Ok(Some((data, false)))
    }

    /// Reset working geometry, visuals and handles from a record.
    fn rebuild(&mut self, data: &AnnotationData, env: &mut DraftEnv) -> EngineResult<()>;

    /// Redraw visuals from the working geometry.
    fn redraw(&mut self, ctx: &mut SessionContext) -> EngineResult<()>;

    fn sync_overlays(&mut self, ctx: &mut SessionContext);
    fn refresh_overlays(&mut self, ctx: &mut SessionContext);
    fn destroy_overlays(&mut self, ctx: &mut SessionContext) -> EngineResult<()>;
}

/// Committing → (Rebuilding) → Idle.
fn commit(draft: &mut dyn DraftTrait, env: &mut DraftEnv) -> EngineResult<DraftResponse> {
    draft.core_mut().state = DraftState::Committing;
    let data = draft.sync_coord_to_data();
    match draft.check_commit(data, env.ctx)? {
        Some((data, rebuild)) => {
            if rebuild {
                draft.core_mut().state = DraftState::Rebuilding;
                draft.rebuild(&data, env)?;
            }
            let core = draft.core_mut();
            log::debug!("Committed {}", core.id);
            core.committed = data;
            core.state = DraftState::Idle;
            Ok(DraftResponse::Committed)
        }
        None => {
            let committed = draft.core().committed.clone();
            draft.core_mut().state = DraftState::Rebuilding;
            draft.rebuild(&committed, env)?;
            draft.core_mut().state = DraftState::Idle;
            Ok(DraftResponse::Handled)
        }
    }
}

/// The active draft.
#[derive(Debug)]
pub enum Draft {
    Point(PointDraft),
    Path(PathDraft),
    Rect(RectDraft),
    Cuboid(CuboidDraft),
    Relation(RelationDraft),
}

impl Draft {
    /// Assemble a draft for a logical record. Relations whose endpoints
    /// are missing yield `None`.
    pub fn new(data: &AnnotationData, style: ShapeStyle, env: &mut DraftEnv) -> EngineResult<Option<Self>> {
        let disabled = env.ctx.config.read_only;
        let core = DraftCore::new(data, style);
        let draft = match data {
            AnnotationData::Point(d) => Draft::Point(PointDraft::new(core, d, disabled, env.ctx)?),
            AnnotationData::Line(d) => Draft::Path(PathDraft::new(core, d, false, disabled, env.ctx)?),
            AnnotationData::Polygon(d) => Draft::Path(PathDraft::new(core, d, true, disabled, env.ctx)?),
            AnnotationData::Rect(d) => Draft::Rect(RectDraft::new(core, d, disabled, env.ctx)?),
            AnnotationData::Cuboid(d) => Draft::Cuboid(CuboidDraft::new(core, d, disabled, env.ctx)?),
            AnnotationData::Relation(d) => match RelationDraft::new(core, d, disabled, env)? {
                Some(draft) => Draft::Relation(draft),
                None => return Ok(None),
            },
        };
        log::debug!("Assembled {:?} draft {}", data.tool(), data.id());
        Ok(Some(draft))
    }

    fn inner(&self) -> &dyn DraftTrait {
        match self {
            Draft::Point(d) => d,
            Draft::Path(d) => d,
            Draft::Rect(d) => d,
            Draft::Cuboid(d) => d,
            Draft::Relation(d) => d,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn DraftTrait {
        match self {
            Draft::Point(d) => d,
            Draft::Path(d) => d,
            Draft::Rect(d) => d,
            Draft::Cuboid(d) => d,
            Draft::Relation(d) => d,
        }
    }

    pub fn id(&self) -> &str {
        &self.inner().core().id
    }

    pub fn tool(&self) -> Tool {
        self.inner().core().committed.tool()
    }

    pub fn state(&self) -> DraftState {
        self.inner().core().state
    }

    /// Last committed record, logical coordinates.
    pub fn committed(&self) -> &AnnotationData {
        &self.inner().core().committed
    }

    /// Record of the live geometry, logical coordinates.
    pub fn current(&self) -> AnnotationData {
        self.inner().sync_coord_to_data()
    }

    pub fn group(&self) -> &Group {
        &self.inner().core().group
    }

    pub fn overlays(&self) -> Vec<&Group> {
        self.inner().overlays()
    }

    pub fn style(&self) -> &ShapeStyle {
        &self.inner().core().style
    }

    /// Runs at the flush after assembly: arms the handles and refreshes
    /// every group the draft owns.
    pub fn settle(&mut self, ctx: &mut SessionContext) {
        let draft = self.inner_mut();
        if draft.core().state == DraftState::Assembling {
            draft.arm();
            draft.core_mut().state = DraftState::Idle;
        }
        draft.core_mut().group.refresh(ctx);
        draft.refresh_overlays(ctx);
    }

    pub fn pointer_down(&mut self, point: Point, env: &mut DraftEnv) -> EngineResult<DraftResponse> {
        if self.state() != DraftState::Idle {
            return Ok(DraftResponse::Ignored);
        }
        self.inner_mut().pointer_down(point, env)
    }

    pub fn pointer_move(&mut self, point: Point, env: &mut DraftEnv) -> EngineResult<DraftResponse> {
        match self.state() {
            DraftState::Idle | DraftState::Dragging => self.inner_mut().pointer_move(point, env),
            _ => Ok(DraftResponse::Ignored),
        }
    }

    pub fn pointer_up(&mut self, point: Point, env: &mut DraftEnv) -> EngineResult<DraftResponse> {
        if self.state() != DraftState::Dragging {
            return Ok(DraftResponse::Ignored);
        }
        self.inner_mut().pointer_up(point, env)
    }

    /// Abort any drag and restore the last committed record.
    pub fn escape(&mut self, env: &mut DraftEnv) -> EngineResult<()> {
        let draft = self.inner_mut();
        if matches!(draft.core().state, DraftState::Archived | DraftState::Assembling) {
            return Ok(());
        }
        draft.cancel_drag(env.ctx)?;
        let committed = draft.core().committed.clone();
        draft.core_mut().state = DraftState::Rebuilding;
        draft.rebuild(&committed, env)?;
        draft.core_mut().state = DraftState::Idle;
        Ok(())
    }

    /// Replace the geometry with `data` and commit it.
    pub fn replace(&mut self, data: &AnnotationData, env: &mut DraftEnv) -> EngineResult<DraftResponse> {
        let draft = self.inner_mut();
        if data.tool() != draft.core().committed.tool() {
            return Err(draft.core().mismatch(data));
        }
        draft.cancel_drag(env.ctx)?;
        draft.core_mut().state = DraftState::Rebuilding;
        draft.rebuild(data, env)?;
        commit(draft, env)
    }

    /// Change the true-front face of a cuboid draft.
    pub fn set_cuboid_direction(
        &mut self,
        direction: CuboidDirection,
        env: &mut DraftEnv,
    ) -> EngineResult<DraftResponse> {
        match self {
            Draft::Cuboid(d) if d.core().state == DraftState::Idle => {
                d.set_direction(direction, env.ctx)?;
                commit(d, env)
            }
            _ => Ok(DraftResponse::Ignored),
        }
    }

    pub fn set_style(&mut self, style: ShapeStyle, ctx: &mut SessionContext) -> EngineResult<()> {
        let draft = self.inner_mut();
        draft.core_mut().style = style;
        draft.redraw(ctx)
    }

    pub fn sync_viewport(&mut self, ctx: &mut SessionContext) {
        let draft = self.inner_mut();
        draft.core_mut().group.sync_viewport(ctx);
        draft.sync_overlays(ctx);
    }

    /// Re-derive visuals that depend on other groups.
    pub fn refresh_links(&mut self, env: &mut DraftEnv) -> EngineResult<()> {
        if let Draft::Relation(d) = self {
            d.refresh_endpoints(env)?;
        }
        Ok(())
    }

    /// Tear down every visual and return the committed record.
    pub fn archive(&mut self, ctx: &mut SessionContext) -> EngineResult<AnnotationData> {
        let draft = self.inner_mut();
        draft.cancel_drag(ctx)?;
        draft.destroy_overlays(ctx)?;
        let core = draft.core_mut();
        core.group.destroy(ctx)?;
        core.state = DraftState::Archived;
        log::debug!("Archived draft {}", core.id);
        Ok(core.committed.clone())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use kurbo::{Point, Size};

    use super::*;
    use crate::axis::Axis;
    use crate::config::EngineConfig;
    use crate::session::NoopListener;

    pub fn ctx() -> SessionContext {
        let axis = Axis::fit(Size::new(200.0, 200.0), Size::new(200.0, 200.0));
        SessionContext::new(EngineConfig::default(), axis, Box::new(NoopListener))
    }

    /// Press at `from`, move to `to`, release.
    pub fn drag(draft: &mut Draft, env: &mut DraftEnv, from: Point, to: Point) -> DraftResponse {
        assert!(draft.pointer_down(from, env).unwrap().is_consumed());
        draft.pointer_move(to, env).unwrap();
        draft.pointer_up(to, env).unwrap()
    }
}
