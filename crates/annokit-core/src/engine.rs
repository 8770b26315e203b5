//! The annotation session: records, static groups, the active draft and
//! pointer routing.

use std::collections::HashMap;
use std::time::Instant;

use kurbo::{Point, Size};
use uuid::Uuid;

use crate::annotation::{AnnotationData, AnnotationMeta, CuboidDirection, PathData, PathType, PathVertex, Tool};
use crate::axis::Axis;
use crate::bbox::BBox;
use crate::config::EngineConfig;
use crate::draft::{Draft, DraftEnv, DraftResponse};
use crate::error::{EngineError, EngineResult, ValidationError};
use crate::geometry::{AREA_EPSILON, polygon_area, polygon_difference};
use crate::input::{InputState, Modifiers, MouseButton, PointerEvent};
use crate::scene;
use crate::session::{EngineListener, SessionContext};
use crate::shapes::{Group, GroupRole, GroupStore, Shape, ShapeStyle, WidgetState};
use crate::spatial::{clear_snap_preview, nearest_point_on_line_segments, nearest_point_on_polygon_edges};

/// Zoom step of one wheel notch.
pub const WHEEL_ZOOM_FACTOR: f64 = 1.1;

/// Result of [`Annotator::cut_selected_polygon`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CutOutcome {
    /// The selected polygon was replaced by the first remaining piece.
    pub changed: bool,
    /// Ids of polygons created for the other pieces.
    pub created: Vec<String>,
}

/// One editing session over one image.
///
/// Records cross this boundary in source-image coordinates. Geometry changes
/// reach the host through the [`EngineListener`]; pointer events go through
/// [`Annotator::handle_pointer`].
pub struct Annotator {
    ctx: SessionContext,
    groups: GroupStore,
    /// Committed records, source coordinates.
    records: HashMap<String, AnnotationData>,
    styles: HashMap<String, ShapeStyle>,
    default_style: ShapeStyle,
    draft: Option<Draft>,
    input: InputState,
    hovered: Option<String>,
}

impl std::fmt::Debug for Annotator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Annotator")
            .field("ctx", &self.ctx)
            .field("records", &self.records.len())
            .field("selected", &self.selected())
            .field("hovered", &self.hovered)
            .finish_non_exhaustive()
    }
}

impl Annotator {
    pub fn new(
        config: EngineConfig,
        image_size: Size,
        viewport_size: Size,
        listener: Box<dyn EngineListener>,
    ) -> EngineResult<Self> {
        config.validate()?;
        let axis = Axis::fit(image_size, viewport_size);
        log::info!(
            "Annotator over {}x{} image in {}x{} viewport",
            image_size.width,
            image_size.height,
            viewport_size.width,
            viewport_size.height
        );
        Ok(Self {
            ctx: SessionContext::new(config, axis, listener),
            groups: GroupStore::new(),
            records: HashMap::new(),
            styles: HashMap::new(),
            default_style: ShapeStyle::default(),
            draft: None,
            input: InputState::new(),
            hovered: None,
        })
    }

    pub fn axis(&self) -> &Axis {
        &self.ctx.axis
    }

    pub fn config(&self) -> &EngineConfig {
        &self.ctx.config
    }

    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    pub fn groups(&self) -> &GroupStore {
        &self.groups
    }

    pub fn draft(&self) -> Option<&Draft> {
        self.draft.as_ref()
    }

    pub fn selected(&self) -> Option<&str> {
        self.draft.as_ref().map(|d| d.id())
    }

    pub fn hovered(&self) -> Option<&str> {
        self.hovered.as_deref()
    }

    pub fn set_listener(&mut self, listener: Box<dyn EngineListener>) {
        self.ctx.set_listener(listener);
    }

    pub fn set_default_style(&mut self, style: ShapeStyle) {
        self.default_style = style;
    }

    fn style_of(&self, id: &str) -> ShapeStyle {
        self.styles.get(id).cloned().unwrap_or_else(|| self.default_style.clone())
    }

    fn to_logical(&self, data: &AnnotationData) -> AnnotationData {
        let axis = &self.ctx.axis;
        data.map_points(|p| axis.to_logical_from_source(p))
    }

    fn to_source(&self, data: &AnnotationData) -> AnnotationData {
        let axis = &self.ctx.axis;
        data.map_points(|p| axis.to_source_from_logical(p))
    }

    // --- records ---

    /// Replace every annotation. Relations load last so their endpoints
    /// exist.
    pub fn load(&mut self, records: Vec<AnnotationData>) -> EngineResult<()> {
        self.clear()?;
        let (relations, others): (Vec<_>, Vec<_>) = records.into_iter().partition(|r| r.tool() == Tool::Relation);
        let mut loaded = 0;
        for data in others.into_iter().chain(relations) {
            if self.insert_record(data)? {
                loaded += 1;
            }
        }
        log::info!("Loaded {loaded} annotations");
        Ok(())
    }

    /// Drop every annotation and visual.
    pub fn clear(&mut self) -> EngineResult<()> {
        if let Some(mut draft) = self.draft.take() {
            draft.archive(&mut self.ctx)?;
        }
        for id in self.groups.ids() {
            if let Some(mut group) = self.groups.remove(&id) {
                group.destroy(&mut self.ctx)?;
            }
        }
        clear_snap_preview(&mut self.ctx)?;
        self.records.clear();
        self.hovered = None;
        Ok(())
    }

    /// Add one annotation. Returns `false` when it was refused.
    pub fn add_annotation(&mut self, data: AnnotationData) -> EngineResult<bool> {
        self.insert_record(data)
    }

    fn insert_record(&mut self, data: AnnotationData) -> EngineResult<bool> {
        data.validate()?;
        if self.records.contains_key(data.id()) {
            return Err(EngineError::DuplicateAnnotation(data.id().to_string()));
        }
        if let AnnotationData::Polygon(p) = &data {
            let closing = self.ctx.config.closing_point_amount;
            if p.points.len() < closing {
                self.ctx.report_validation(ValidationError::PolygonNotClosable {
                    annotation_id: data.id().to_string(),
                    closing_point_amount: closing,
                    actual: p.points.len(),
                });
                return Ok(false);
            }
        }
        if let AnnotationData::Relation(r) = &data {
            if !self.records.contains_key(&r.source_id) || !self.records.contains_key(&r.target_id) {
                log::warn!("Relation {} references a missing annotation; skipped", r.meta.id);
                return Ok(false);
            }
        }
        let id = data.id().to_string();
        let logical = self.to_logical(&data);
        if !self.install_static(&id, &logical)? {
            return Ok(false);
        }
        self.records.insert(id, data);
        Ok(true)
    }

    /// Remove an annotation and every relation pointing at it.
    pub fn remove_annotation(&mut self, id: &str) -> EngineResult<AnnotationData> {
        if self.selected() == Some(id) {
            self.deselect_without_restore()?;
        }
        let data = self
            .records
            .remove(id)
            .ok_or_else(|| EngineError::AnnotationNotFound(id.to_string()))?;
        if let Some(mut group) = self.groups.remove(id) {
            group.destroy(&mut self.ctx)?;
        }
        if self.hovered.as_deref() == Some(id) {
            self.hovered = None;
        }
        self.styles.remove(id);
        self.ctx.listener().on_remove(id);
        log::debug!("Removed annotation {id}");

        let dependents: Vec<String> = self
            .records
            .values()
            .filter_map(|r| match r {
                AnnotationData::Relation(rel) if rel.source_id == id || rel.target_id == id => {
                    Some(rel.meta.id.clone())
                }
                _ => None,
            })
            .collect();
        for dependent in dependents {
            log::warn!("Relation {dependent} lost endpoint {id}; dropped");
            self.remove_annotation(&dependent)?;
        }
        Ok(data)
    }

    pub fn annotation(&self, id: &str) -> Option<&AnnotationData> {
        self.records.get(id)
    }

    /// Every committed record, back to front.
    pub fn annotations(&self) -> Vec<&AnnotationData> {
        let mut all: Vec<&AnnotationData> = self.records.values().collect();
        all.sort_by(|a, b| a.order().cmp(&b.order()).then_with(|| a.id().cmp(b.id())));
        all
    }

    // --- selection ---

    /// Make `id` the active draft. Handles arm at the next [`Self::flush`].
    /// Returns `false` when no draft could be assembled.
    pub fn select(&mut self, id: &str) -> EngineResult<bool> {
        if self.selected() == Some(id) {
            return Ok(true);
        }
        let record = self
            .records
            .get(id)
            .cloned()
            .ok_or_else(|| EngineError::AnnotationNotFound(id.to_string()))?;
        self.deselect()?;

        let logical = self.to_logical(&record);
        let style = self.style_of(id);
        let had_static = match self.groups.remove(id) {
            Some(mut group) => {
                group.destroy(&mut self.ctx)?;
                true
            }
            None => false,
        };
        let relations = self.relation_pairs(id);
        let mut env = DraftEnv {
            ctx: &mut self.ctx,
            groups: &self.groups,
            modifiers: self.input.modifiers,
            relations: &relations,
        };
        match Draft::new(&logical, style, &mut env)? {
            Some(draft) => {
                self.draft = Some(draft);
                self.ctx.listener().on_select(id);
                log::debug!("Selected {id}");
                Ok(true)
            }
            None => {
                if had_static {
                    self.install_static(id, &logical)?;
                }
                Ok(false)
            }
        }
    }

    /// Archive the active draft back into a static group.
    pub fn deselect(&mut self) -> EngineResult<Option<String>> {
        let Some(mut draft) = self.draft.take() else {
            return Ok(None);
        };
        let id = draft.id().to_string();
        let committed = draft.archive(&mut self.ctx)?;
        let source = self.to_source(&committed);
        self.records.insert(id.clone(), source);
        self.install_static(&id, &committed)?;
        self.ctx.listener().on_unselect(&id);
        self.refresh_relations_of(&id)?;
        log::debug!("Deselected {id}");
        Ok(Some(id))
    }

    fn deselect_without_restore(&mut self) -> EngineResult<()> {
        if let Some(mut draft) = self.draft.take() {
            let id = draft.id().to_string();
            draft.archive(&mut self.ctx)?;
            self.ctx.listener().on_unselect(&id);
        }
        Ok(())
    }

    // --- input ---

    pub fn set_modifiers(&mut self, modifiers: Modifiers) {
        self.input.modifiers = modifiers;
    }

    pub fn modifiers(&self) -> Modifiers {
        self.input.modifiers
    }

    /// Route one pointer event. Each event starts after a flush, like a
    /// fresh task after pending microtasks.
    pub fn handle_pointer(&mut self, event: PointerEvent) -> EngineResult<()> {
        self.flush();
        self.input.record(&event);
        match event {
            PointerEvent::Down {
                position,
                button: MouseButton::Left,
            } => self.left_down(position),
            PointerEvent::Down { .. } => Ok(()),
            PointerEvent::Move { position } => {
                if self.input.is_held(MouseButton::Right) {
                    let delta = self.input.motion();
                    self.pan(delta.x, delta.y);
                    return Ok(());
                }
                let response = self.with_draft(|draft, env| draft.pointer_move(position, env))?;
                self.apply_response(response)?;
                self.update_hover(position);
                Ok(())
            }
            PointerEvent::Up {
                position,
                button: MouseButton::Left,
            } => {
                let response = self.with_draft(|draft, env| draft.pointer_up(position, env))?;
                self.apply_response(response)
            }
            PointerEvent::Up { .. } => Ok(()),
            PointerEvent::Wheel { position, delta } => {
                let factor = if delta > 0.0 {
                    WHEEL_ZOOM_FACTOR
                } else {
                    1.0 / WHEEL_ZOOM_FACTOR
                };
                self.zoom_at(position, factor);
                Ok(())
            }
        }
    }

    /// Handles first; otherwise a click selects the topmost annotation or
    /// deselects on empty space.
    fn left_down(&mut self, position: Point) -> EngineResult<()> {
        let response = self.with_draft(|draft, env| draft.pointer_down(position, env))?;
        if response.is_some_and(|r| r.is_consumed()) {
            return self.apply_response(response);
        }
        match self.topmost_at(position) {
            Some(id) if self.selected() == Some(id.as_str()) => Ok(()),
            Some(id) => self.select(&id).map(|_| ()),
            None => self.deselect().map(|_| ()),
        }
    }

    fn with_draft<R>(
        &mut self,
        f: impl FnOnce(&mut Draft, &mut DraftEnv) -> EngineResult<R>,
    ) -> EngineResult<Option<R>> {
        let Some(id) = self.draft.as_ref().map(|d| d.id().to_string()) else {
            return Ok(None);
        };
        let relations = self.relation_pairs(&id);
        let Some(draft) = self.draft.as_mut() else {
            return Ok(None);
        };
        let mut env = DraftEnv {
            ctx: &mut self.ctx,
            groups: &self.groups,
            modifiers: self.input.modifiers,
            relations: &relations,
        };
        f(draft, &mut env).map(Some)
    }

    /// Endpoint pairs of every stored relation except `except`.
    fn relation_pairs(&self, except: &str) -> Vec<(String, String)> {
        self.records
            .values()
            .filter_map(|record| match record {
                AnnotationData::Relation(r) if r.meta.id != except => {
                    Some((r.source_id.clone(), r.target_id.clone()))
                }
                _ => None,
            })
            .collect()
    }

    /// Forward draft output to the host.
    fn apply_response(&mut self, response: Option<DraftResponse>) -> EngineResult<()> {
        let Some(draft) = self.draft.as_ref() else {
            return Ok(());
        };
        match response {
            Some(DraftResponse::Changed) => {
                let id = draft.id().to_string();
                if self.ctx.config.live_sync {
                    let data = self.to_source(&draft.current());
                    self.ctx.listener().on_change(&data, false);
                }
                if let Some(draft) = self.draft.as_mut() {
                    draft.settle(&mut self.ctx);
                }
                self.refresh_relations_of(&id)?;
            }
            Some(DraftResponse::Committed) => {
                let id = draft.id().to_string();
                let data = self.to_source(draft.committed());
                self.records.insert(id.clone(), data.clone());
                self.ctx.listener().on_change(&data, true);
                if let Some(draft) = self.draft.as_mut() {
                    draft.settle(&mut self.ctx);
                }
                self.refresh_relations_of(&id)?;
            }
            _ => {}
        }
        Ok(())
    }

    fn update_hover(&mut self, position: Point) {
        let hovered = self.topmost_at(position);
        if hovered == self.hovered {
            return;
        }
        for (id, state) in [(&self.hovered, WidgetState::Normal), (&hovered, WidgetState::Hovered)] {
            if let Some(group) = id.as_deref().and_then(|id| self.groups.get_mut(id)) {
                group.state = state;
            }
        }
        self.ctx.listener().on_hover_change(hovered.as_deref());
        self.hovered = hovered;
        self.ctx.request_update();
    }

    /// Abort any drag and restore the selected annotation's last committed
    /// record.
    pub fn escape(&mut self) -> EngineResult<()> {
        if self.with_draft(|draft, env| draft.escape(env))?.is_none() {
            return Ok(());
        }
        let Some(draft) = self.draft.as_mut() else {
            return Ok(());
        };
        draft.settle(&mut self.ctx);
        let id = draft.id().to_string();
        let restored = draft.committed().clone();
        if self.ctx.config.live_sync {
            let data = self.to_source(&restored);
            self.ctx.listener().on_change(&data, false);
        }
        self.refresh_relations_of(&id)
    }

    // --- view ---

    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.ctx.axis.pan(dx, dy);
        self.sync_viewport();
    }

    /// Zoom about a viewport point. `false` when the scale bounds refuse it.
    pub fn zoom_at(&mut self, point: Point, factor: f64) -> bool {
        if !self.ctx.axis.zoom_at(point, factor) {
            return false;
        }
        self.sync_viewport();
        true
    }

    /// Return to the fitted view.
    pub fn reset_view(&mut self) {
        self.ctx.axis.reset();
        self.sync_viewport();
    }

    fn sync_viewport(&mut self) {
        for group in self.groups.iter_mut() {
            group.sync_viewport(&mut self.ctx);
        }
        if let Some(draft) = self.draft.as_mut() {
            draft.sync_viewport(&mut self.ctx);
        }
        if let Some(mut preview) = self.ctx.snap_preview.take() {
            preview.sync_viewport(&mut self.ctx);
            self.ctx.snap_preview = Some(preview);
        }
        self.ctx.request_update();
    }

    // --- queries ---

    /// Annotation id whose visuals are topmost under a viewport point.
    ///
    /// Tangent controls win outright; otherwise always-on-top groups beat
    /// the rest and higher `order` beats lower.
    pub fn topmost_at(&self, point: Point) -> Option<String> {
        let tolerance = self.ctx.config.hit_tolerance;
        let mut ids: Vec<&str> = self
            .ctx
            .index
            .query_window(point, tolerance)
            .into_iter()
            .filter(|e| e.role != GroupRole::Preview)
            .map(|e| e.key.group.as_str())
            .collect();
        ids.sort_unstable();
        ids.dedup();

        let mut best: Option<(&Group, &str)> = None;
        for id in ids {
            let Some((group, owner)) = self.resolve_group(id) else {
                continue;
            };
            if !group.is_under_cursor(point, tolerance) {
                continue;
            }
            if group.role == GroupRole::TangentControl {
                return Some(owner.to_string());
            }
            let wins = best.is_none_or(|(b, _)| (group.always_on_top, group.order) > (b.always_on_top, b.order));
            if wins {
                best = Some((group, owner));
            }
        }
        best.map(|(_, owner)| owner.to_string())
    }

    /// A group by index id, with the annotation it belongs to.
    fn resolve_group(&self, id: &str) -> Option<(&Group, &str)> {
        if let Some(group) = self.groups.get(id) {
            return Some((group, group.id.as_str()));
        }
        let draft = self.draft.as_ref()?;
        if draft.group().id == id {
            return Some((draft.group(), draft.id()));
        }
        draft
            .overlays()
            .into_iter()
            .find(|g| g.id == id)
            .map(|g| (g, draft.id()))
    }

    /// Snap a viewport point onto the nearest edge of a polygon or line
    /// annotation within the configured threshold.
    pub fn snap_point(&mut self, point: Point, tool: Tool) -> EngineResult<Option<Point>> {
        let threshold = self.ctx.config.snap_threshold;
        let selected = self.selected().map(str::to_string);
        let exclude: Vec<&str> = selected.as_deref().into_iter().collect();
        match tool {
            Tool::Polygon => nearest_point_on_polygon_edges(&mut self.ctx, &self.groups, point, threshold, &exclude),
            Tool::Line => nearest_point_on_line_segments(&mut self.ctx, &self.groups, point, threshold, &exclude),
            _ => Ok(None),
        }
    }

    // --- editing commands ---

    /// Subtract every overlapping polygon from the selected polygon.
    ///
    /// The first remaining piece replaces the selected polygon under its
    /// id; further pieces become new polygons that copy its label and
    /// attributes. Nothing changes when no polygon overlaps or when nothing
    /// would survive.
    pub fn cut_selected_polygon(&mut self) -> EngineResult<CutOutcome> {
        let Some(draft) = self.draft.as_ref() else {
            return Ok(CutOutcome::default());
        };
        let AnnotationData::Polygon(subject) = draft.committed().clone() else {
            return Ok(CutOutcome::default());
        };
        let outline = logical_outline(&subject, true);
        let Some(subject_bbox) = BBox::from_points(&outline) else {
            return Ok(CutOutcome::default());
        };

        let cutters: Vec<Vec<Point>> = self
            .records
            .values()
            .filter(|r| r.id() != subject.meta.id)
            .filter_map(|r| match self.to_logical(r) {
                AnnotationData::Polygon(p) => Some(logical_outline(&p, true)),
                _ => None,
            })
            .filter(|p| BBox::from_points(p).is_some_and(|b| b.intersects(&subject_bbox)))
            .collect();
        if cutters.is_empty() {
            return Ok(CutOutcome::default());
        }

        let pieces = polygon_difference(&outline, &cutters);
        if pieces.is_empty() {
            log::debug!("Cut of {} would remove it entirely; ignored", subject.meta.id);
            return Ok(CutOutcome::default());
        }
        let untouched = pieces.len() == 1 && (polygon_area(&pieces[0]) - polygon_area(&outline)).abs() <= AREA_EPSILON;
        if untouched {
            return Ok(CutOutcome::default());
        }

        let mut pieces = pieces.into_iter();
        let Some(first) = pieces.next() else {
            return Ok(CutOutcome::default());
        };
        let replacement = AnnotationData::Polygon(piece_record(subject.meta.clone(), &first));
        let response = self.with_draft(|draft, env| draft.replace(&replacement, env))?;
        let committed = response == Some(DraftResponse::Committed);
        self.apply_response(response)?;
        if !committed {
            log::debug!("Cut of {} refused; subject kept", subject.meta.id);
            return Ok(CutOutcome::default());
        }

        let mut order = self.records.values().map(AnnotationData::order).max().unwrap_or(0);
        let mut created = Vec::new();
        for piece in pieces {
            order += 1;
            let meta = AnnotationMeta {
                id: Uuid::new_v4().to_string(),
                order,
                label: subject.meta.label.clone(),
                attributes: subject.meta.attributes.clone(),
            };
            let data = self.to_source(&AnnotationData::Polygon(piece_record(meta, &piece)));
            if self.insert_record(data.clone())? {
                self.ctx.listener().on_create(&data);
                created.push(data.id().to_string());
            }
        }
        log::info!("Cut {} into {} pieces", subject.meta.id, created.len() + 1);
        Ok(CutOutcome {
            changed: true,
            created,
        })
    }

    /// Set the true-front face of the selected cuboid.
    pub fn set_cuboid_direction(&mut self, direction: CuboidDirection) -> EngineResult<bool> {
        let response = self.with_draft(|draft, env| draft.set_cuboid_direction(direction, env))?;
        let committed = response == Some(DraftResponse::Committed);
        self.apply_response(response)?;
        Ok(committed)
    }

    pub fn set_style(&mut self, id: &str, style: ShapeStyle) -> EngineResult<()> {
        if !self.records.contains_key(id) {
            return Err(EngineError::AnnotationNotFound(id.to_string()));
        }
        self.styles.insert(id.to_string(), style.clone());
        if let Some(draft) = self.draft.as_mut().filter(|d| d.id() == id) {
            return draft.set_style(style, &mut self.ctx);
        }
        self.rebuild_static(id)
    }

    // --- frame loop ---

    /// Run deferred work: arm freshly assembled drafts and refresh dirty
    /// group bboxes.
    pub fn flush(&mut self) {
        if let Some(draft) = self.draft.as_mut() {
            draft.settle(&mut self.ctx);
        }
        self.groups.refresh_dirty(&mut self.ctx);
    }

    /// Flush, then report whether a frame is due at `now`.
    pub fn tick(&mut self, now: Instant) -> bool {
        self.flush();
        self.ctx.ticker.tick(now)
    }

    pub fn take_validation_errors(&mut self) -> Vec<ValidationError> {
        self.ctx.validation.drain()
    }

    // --- relations ---

    fn endpoint_center(&self, id: &str) -> Option<Point> {
        let group = match self.draft.as_ref() {
            Some(draft) if draft.id() == id => Some(draft.group()),
            _ => self.groups.get(id),
        };
        group.and_then(|g| scene::group_center(g, &self.ctx.axis))
    }

    /// Redraw the relations attached to `id`.
    fn refresh_relations_of(&mut self, id: &str) -> EngineResult<()> {
        let related: Vec<String> = self
            .records
            .values()
            .filter_map(|r| match r {
                AnnotationData::Relation(rel) if rel.source_id == id || rel.target_id == id => {
                    Some(rel.meta.id.clone())
                }
                _ => None,
            })
            .collect();
        for relation in related {
            if self.selected() == Some(relation.as_str()) {
                self.with_draft(|draft, env| draft.refresh_links(env))?;
            } else {
                self.rebuild_static(&relation)?;
            }
        }
        Ok(())
    }

    /// Rebuild a static group's shapes from its record.
    fn rebuild_static(&mut self, id: &str) -> EngineResult<()> {
        let Some(record) = self.records.get(id) else {
            return Ok(());
        };
        let logical = self.to_logical(record);
        self.install_static(id, &logical)?;
        Ok(())
    }

    /// Shapes of a static group. Relations resolve their endpoints against
    /// the draft as well as the static groups.
    fn static_shapes(&self, logical: &AnnotationData) -> EngineResult<Option<Vec<Shape>>> {
        let style = self.style_of(logical.id());
        match logical {
            AnnotationData::Relation(rel) => {
                match (self.endpoint_center(&rel.source_id), self.endpoint_center(&rel.target_id)) {
                    (Some(s), Some(t)) => scene::relation_shapes(s, t, &style, &self.ctx.axis).map(Some),
                    _ => Ok(None),
                }
            }
            _ => scene::shapes_for(logical, &style, &self.ctx.axis, &self.groups),
        }
    }

    /// Create or update the static group of `id`. `false` when a relation
    /// endpoint could not be found.
    fn install_static(&mut self, id: &str, logical: &AnnotationData) -> EngineResult<bool> {
        let Some(shapes) = self.static_shapes(logical)? else {
            log::warn!("Relation {id} has a missing endpoint; not drawn");
            return Ok(false);
        };
        match self.groups.get_mut(id) {
            Some(group) => {
                scene::replace_shapes(group, shapes, &mut self.ctx)?;
                group.refresh(&mut self.ctx);
            }
            None => {
                let mut group = scene::new_annotation_group(logical);
                group.insert(0, shapes, &mut self.ctx)?;
                group.refresh(&mut self.ctx);
                self.groups.insert(group);
            }
        }
        Ok(true)
    }
}

/// Outline of a path record, flattening splines.
fn logical_outline(data: &PathData, closed: bool) -> Vec<Point> {
    let vertices = data.vertices();
    match data.path_type {
        PathType::Line => vertices,
        PathType::Spline => {
            let controls = scene::spline_controls(&vertices, data.control_points.as_deref(), closed);
            scene::path_outline(&vertices, Some(&controls), closed)
        }
    }
}

fn piece_record(meta: AnnotationMeta, piece: &[Point]) -> PathData {
    PathData {
        meta,
        path_type: PathType::Line,
        points: piece
            .iter()
            .map(|p| PathVertex::new(Uuid::new_v4().to_string(), *p))
            .collect(),
        control_points: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{PointData, RectData, RelationData};
    use crate::session::NoopListener;

    fn annotator() -> Annotator {
        Annotator::new(
            EngineConfig::default(),
            Size::new(200.0, 200.0),
            Size::new(200.0, 200.0),
            Box::new(NoopListener),
        )
        .unwrap()
    }

    fn rect(id: &str, order: i64, x: f64, y: f64, w: f64, h: f64) -> AnnotationData {
        AnnotationData::Rect(RectData {
            meta: AnnotationMeta::new(id, order),
            x,
            y,
            width: w,
            height: h,
        })
    }

    fn point(id: &str, x: f64, y: f64) -> AnnotationData {
        AnnotationData::Point(PointData {
            meta: AnnotationMeta::new(id, 0),
            x,
            y,
        })
    }

    #[test]
    fn test_duplicate_id_is_an_error() {
        let mut a = annotator();
        a.add_annotation(rect("r", 0, 0.0, 0.0, 10.0, 10.0)).unwrap();
        let err = a.add_annotation(rect("r", 0, 0.0, 0.0, 10.0, 10.0)).unwrap_err();
        assert!(matches!(err, EngineError::DuplicateAnnotation(_)));
    }

    #[test]
    fn test_topmost_prefers_higher_order() {
        let mut a = annotator();
        a.add_annotation(rect("low", 1, 10.0, 10.0, 50.0, 50.0)).unwrap();
        a.add_annotation(rect("high", 2, 30.0, 30.0, 50.0, 50.0)).unwrap();
        assert_eq!(a.topmost_at(Point::new(40.0, 40.0)).as_deref(), Some("high"));
        assert_eq!(a.topmost_at(Point::new(15.0, 15.0)).as_deref(), Some("low"));
        assert_eq!(a.topmost_at(Point::new(150.0, 150.0)), None);
    }

    #[test]
    fn test_handles_arm_after_flush() {
        let mut a = annotator();
        a.add_annotation(rect("r", 0, 10.0, 10.0, 50.0, 50.0)).unwrap();
        a.select("r").unwrap();
        assert_eq!(a.draft().unwrap().state(), crate::draft::DraftState::Assembling);
        a.flush();
        assert_eq!(a.draft().unwrap().state(), crate::draft::DraftState::Idle);
    }

    #[test]
    fn test_click_selects_and_empty_click_deselects() {
        let mut a = annotator();
        a.add_annotation(rect("r", 0, 10.0, 10.0, 50.0, 50.0)).unwrap();
        a.handle_pointer(PointerEvent::Down {
            position: Point::new(30.0, 30.0),
            button: MouseButton::Left,
        })
        .unwrap();
        assert_eq!(a.selected(), Some("r"));
        a.handle_pointer(PointerEvent::Down {
            position: Point::new(150.0, 150.0),
            button: MouseButton::Left,
        })
        .unwrap();
        assert_eq!(a.selected(), None);
        assert!(a.groups().contains("r"));
    }

    #[test]
    fn test_remove_cascades_to_relations() {
        let mut a = annotator();
        a.add_annotation(point("a", 10.0, 10.0)).unwrap();
        a.add_annotation(point("b", 50.0, 50.0)).unwrap();
        let rel = AnnotationData::Relation(RelationData {
            meta: AnnotationMeta::new("rel", 0),
            source_id: "a".into(),
            target_id: "b".into(),
        });
        assert!(a.add_annotation(rel).unwrap());
        a.remove_annotation("a").unwrap();
        assert!(a.annotation("rel").is_none());
        assert_eq!(a.annotations().len(), 1);
    }

    #[test]
    fn test_relation_without_endpoints_is_refused() {
        let mut a = annotator();
        let rel = AnnotationData::Relation(RelationData {
            meta: AnnotationMeta::new("rel", 0),
            source_id: "a".into(),
            target_id: "b".into(),
        });
        assert!(!a.add_annotation(rel).unwrap());
        assert!(a.annotations().is_empty());
    }

    #[test]
    fn test_reset_view_restores_viewport_geometry() {
        let mut a = annotator();
        a.add_annotation(rect("r", 0, 10.0, 10.0, 50.0, 50.0)).unwrap();
        a.pan(30.0, -12.0);
        assert!(a.zoom_at(Point::ZERO, 0.5));
        assert_eq!(a.topmost_at(Point::new(15.0, 15.0)), None);
        a.reset_view();
        assert_eq!(a.topmost_at(Point::new(15.0, 15.0)).as_deref(), Some("r"));
    }

    #[test]
    fn test_wheel_zoom_keeps_anchor() {
        let mut a = annotator();
        let anchor = Point::new(50.0, 50.0);
        let logical = a.axis().to_logical(anchor);
        a.handle_pointer(PointerEvent::Wheel {
            position: anchor,
            delta: 1.0,
        })
        .unwrap();
        assert!((a.axis().scale - WHEEL_ZOOM_FACTOR).abs() < 1e-12);
        assert!((a.axis().to_viewport(logical) - anchor).hypot() < 1e-9);
    }
}
