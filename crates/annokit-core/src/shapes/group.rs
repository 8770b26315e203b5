//! Ordered composites of shapes, one per annotation or draft visual.

use std::collections::HashMap;

use kurbo::Point;

use super::{Shape, ShapeKind, ShapeStyle};
use crate::annotation::Tool;
use crate::bbox::BBox;
use crate::error::{EngineError, EngineResult};
use crate::session::SessionContext;
use crate::spatial::{IndexEntry, IndexKey};

/// Shape id of the primary outline of an annotation group.
pub const OUTLINE: &str = "outline";

/// What a group is for; drives hit-test routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupRole {
    /// Static or drafted annotation visuals.
    Annotation,
    /// A relation line between two annotations.
    Relation,
    /// Draggable handles of a draft.
    Handles,
    /// Spline tangent controls; win hit-testing outright.
    TangentControl,
    /// Snap and insert previews. Never hit-tested.
    Preview,
}

/// The UI state of a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WidgetState {
    /// Normal display state - no interaction.
    #[default]
    Normal,
    /// Mouse is hovering over the group.
    Hovered,
    /// Group belongs to the active draft.
    Selected,
}

impl WidgetState {
    pub fn is_selected(&self) -> bool {
        matches!(self, Self::Selected)
    }
}

/// An ordered list of shapes; insertion order is render order.
///
/// The group bbox and its index entry are refreshed lazily: mutations only
/// mark the group dirty and the owner calls [`Group::refresh`] once the
/// batch is complete.
#[derive(Debug, Clone)]
pub struct Group {
    pub id: String,
    /// Front-to-back tie-break; higher wins.
    pub order: i64,
    pub role: GroupRole,
    pub always_on_top: bool,
    /// Annotation kind, for snapping and routing.
    pub tool: Option<Tool>,
    pub state: WidgetState,
    shapes: Vec<Shape>,
    bbox: Option<BBox>,
    dirty: bool,
}

impl Group {
    pub fn new(id: impl Into<String>, order: i64, role: GroupRole) -> Self {
        Self {
            id: id.into(),
            order,
            role,
            always_on_top: false,
            tool: None,
            state: WidgetState::Normal,
            shapes: Vec::new(),
            bbox: None,
            dirty: true,
        }
    }

    pub fn with_tool(mut self, tool: Tool) -> Self {
        self.tool = Some(tool);
        self
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Last refreshed bbox; `None` before the first refresh or when empty.
    pub fn bbox(&self) -> Option<BBox> {
        self.bbox
    }

    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    pub fn shape(&self, id: &str) -> Option<&Shape> {
        self.shapes.iter().find(|s| s.id() == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.shape(id).is_some()
    }

    fn position(&self, id: &str) -> EngineResult<usize> {
        self.shapes
            .iter()
            .position(|s| s.id() == id)
            .ok_or_else(|| EngineError::ShapeNotFound {
                group: self.id.clone(),
                shape: id.to_string(),
            })
    }

    pub fn add(&mut self, shape: Shape, ctx: &mut SessionContext) -> EngineResult<()> {
        let at = self.shapes.len();
        self.insert(at, vec![shape], ctx)
    }

    /// Insert shapes at `index` (clamped to the end). Every id must be new.
    pub fn insert(&mut self, index: usize, shapes: Vec<Shape>, ctx: &mut SessionContext) -> EngineResult<()> {
        for (i, shape) in shapes.iter().enumerate() {
            let clash = self.contains(shape.id()) || shapes[..i].iter().any(|s| s.id() == shape.id());
            if clash {
                return Err(EngineError::DuplicateShapeId {
                    group: self.id.clone(),
                    shape: shape.id().to_string(),
                });
            }
        }
        let index = index.min(self.shapes.len());
        for (offset, mut shape) in shapes.into_iter().enumerate() {
            shape.attach(&self.id, self.role, ctx);
            self.shapes.insert(index + offset, shape);
        }
        self.dirty = true;
        Ok(())
    }

    pub fn remove(&mut self, id: &str, ctx: &mut SessionContext) -> EngineResult<Shape> {
        let at = self.position(id)?;
        let mut shape = self.shapes.remove(at);
        shape.detach(ctx)?;
        self.dirty = true;
        Ok(shape)
    }

    /// Replace the logical points of one member.
    pub fn set_shape_points(&mut self, id: &str, points: Vec<Point>, ctx: &mut SessionContext) -> EngineResult<()> {
        let at = self.position(id)?;
        self.shapes[at].set_logical_coordinates(points, ctx)?;
        self.dirty = true;
        Ok(())
    }

    /// Restyle one member.
    pub fn set_shape_style(&mut self, id: &str, style: ShapeStyle, ctx: &mut SessionContext) -> EngineResult<()> {
        let at = self.position(id)?;
        self.shapes[at].set_style(style, ctx);
        self.dirty = true;
        Ok(())
    }

    /// Visit members in render order; stop when `f` returns false.
    pub fn each<'a, F>(&'a self, mut f: F)
    where
        F: FnMut(&'a Shape) -> bool,
    {
        for shape in &self.shapes {
            if !f(shape) {
                break;
            }
        }
    }

    /// Visit members topmost first; stop when `f` returns false.
    pub fn reverse_each<'a, F>(&'a self, mut f: F)
    where
        F: FnMut(&'a Shape) -> bool,
    {
        for shape in self.shapes.iter().rev() {
            if !f(shape) {
                break;
            }
        }
    }

    /// Apply a style to every member.
    pub fn update_style(&mut self, style: &ShapeStyle, ctx: &mut SessionContext) {
        for shape in &mut self.shapes {
            shape.set_style(style.clone(), ctx);
        }
        self.dirty = true;
    }

    /// Recompute the bbox union and reinsert the group's index entry.
    /// No-op while the group is clean.
    pub fn refresh(&mut self, ctx: &mut SessionContext) {
        if !self.dirty {
            return;
        }
        self.dirty = false;
        let union = self
            .shapes
            .iter()
            .map(|s| s.bbox())
            .reduce(|acc, b| acc.union(&b));
        let key = IndexKey::group(self.id.clone());
        match union {
            Some(bbox) => {
                self.bbox = Some(bbox);
                ctx.index.insert(IndexEntry {
                    bbox,
                    key,
                    role: self.role,
                });
            }
            None => {
                self.bbox = None;
                if ctx.index.contains(&key) {
                    let _ = ctx.index.remove(&key);
                }
            }
        }
    }

    /// Re-derive every member after a pan/zoom and refresh eagerly.
    pub fn sync_viewport(&mut self, ctx: &mut SessionContext) {
        for shape in &mut self.shapes {
            shape.sync_viewport(ctx);
        }
        self.dirty = true;
        self.refresh(ctx);
    }

    /// Id of the topmost member under the cursor, if any.
    pub fn shape_under_cursor(&self, point: Point, tolerance: f64) -> Option<&str> {
        let mut hit = None;
        self.reverse_each(|shape| {
            if shape.is_under_cursor(point, tolerance) {
                hit = Some(shape.id());
                return false;
            }
            true
        });
        hit
    }

    pub fn is_under_cursor(&self, point: Point, tolerance: f64) -> bool {
        self.shape_under_cursor(point, tolerance).is_some()
    }

    /// Viewport edges of the outline shape.
    pub fn outline_edges(&self) -> Vec<(Point, Point)> {
        self.shape(OUTLINE).map(|s| s.edges()).unwrap_or_default()
    }

    /// Drop every member and the group's own index entry.
    pub fn destroy(&mut self, ctx: &mut SessionContext) -> EngineResult<()> {
        for mut shape in self.shapes.drain(..) {
            shape.detach(ctx)?;
        }
        let key = IndexKey::group(self.id.clone());
        if ctx.index.contains(&key) {
            ctx.index.remove(&key)?;
        }
        self.bbox = None;
        self.dirty = false;
        ctx.request_update();
        Ok(())
    }
}

/// Static groups keyed by id.
#[derive(Debug, Default)]
pub struct GroupStore {
    groups: HashMap<String, Group>,
}

impl GroupStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<&Group> {
        self.groups.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Group> {
        self.groups.get_mut(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.groups.contains_key(id)
    }

    /// Insert a group, returning the one it replaced.
    pub fn insert(&mut self, group: Group) -> Option<Group> {
        self.groups.insert(group.id.clone(), group)
    }

    pub fn remove(&mut self, id: &str) -> Option<Group> {
        self.groups.remove(id)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Group> {
        self.groups.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Group> {
        self.groups.values_mut()
    }

    pub fn ids(&self) -> Vec<String> {
        self.groups.keys().cloned().collect()
    }

    /// Refresh every dirty group.
    pub fn refresh_dirty(&mut self, ctx: &mut SessionContext) {
        for group in self.groups.values_mut().filter(|g| g.is_dirty()) {
            group.refresh(ctx);
        }
    }
}

/// Shape helpers for building group members.
pub(crate) fn polygon_or_line(closed: bool) -> ShapeKind {
    if closed { ShapeKind::Polygon } else { ShapeKind::Line }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::axis::Axis;

    fn line(id: &str, a: (f64, f64), b: (f64, f64), axis: &Axis) -> Shape {
        Shape::new(
            id,
            ShapeKind::Line,
            vec![Point::new(a.0, a.1), Point::new(b.0, b.1)],
            ShapeStyle {
                stroke_width: 0.0,
                ..ShapeStyle::default()
            },
            axis,
        )
        .unwrap()
    }

    #[test]
    fn test_duplicate_shape_id_rejected() {
        let mut ctx = SessionContext::default();
        let mut group = Group::new("g", 0, GroupRole::Annotation);
        group.add(line("a", (0.0, 0.0), (1.0, 1.0), &ctx.axis), &mut ctx).unwrap();
        let axis = ctx.axis.clone();
        let result = group.add(line("a", (5.0, 5.0), (6.0, 6.0), &axis), &mut ctx);
        assert!(matches!(result, Err(EngineError::DuplicateShapeId { .. })));
        assert_eq!(group.len(), 1);
    }

    #[test]
    fn test_bbox_is_union_after_refresh() {
        let mut ctx = SessionContext::default();
        let axis = ctx.axis.clone();
        let mut group = Group::new("g", 0, GroupRole::Annotation);
        group
            .insert(
                0,
                vec![
                    line("a", (0.0, 0.0), (10.0, 5.0), &axis),
                    line("b", (-3.0, 2.0), (4.0, 20.0), &axis),
                ],
                &mut ctx,
            )
            .unwrap();
        assert!(group.bbox().is_none());
        group.refresh(&mut ctx);
        let expected = group.shapes()[0].bbox().union(&group.shapes()[1].bbox());
        assert_eq!(group.bbox(), Some(expected));
        assert_eq!(ctx.index.get(&IndexKey::group("g")).unwrap().bbox, expected);

        group.set_shape_points("b", vec![Point::new(0.0, 0.0), Point::new(1.0, 1.0)], &mut ctx).unwrap();
        assert!(group.is_dirty());
        group.refresh(&mut ctx);
        assert_eq!(group.bbox(), Some(BBox::new(0.0, 0.0, 10.0, 5.0)));
    }

    #[test]
    fn test_reverse_each_stops_early() {
        let mut ctx = SessionContext::default();
        let axis = ctx.axis.clone();
        let mut group = Group::new("g", 0, GroupRole::Annotation);
        for id in ["a", "b", "c"] {
            group.add(line(id, (0.0, 0.0), (1.0, 1.0), &axis), &mut ctx).unwrap();
        }
        let mut seen = Vec::new();
        group.reverse_each(|shape| {
            seen.push(shape.id().to_string());
            shape.id() != "b"
        });
        assert_eq!(seen, vec!["c", "b"]);
        assert_eq!(group.shape_under_cursor(Point::new(0.5, 0.5), 1.0), Some("c"));
    }

    #[test]
    fn test_remove_and_destroy_clear_index() {
        let mut ctx = SessionContext::default();
        let axis = ctx.axis.clone();
        let mut group = Group::new("g", 0, GroupRole::Annotation);
        group.add(line("a", (0.0, 0.0), (1.0, 1.0), &axis), &mut ctx).unwrap();
        group.add(line("b", (2.0, 2.0), (3.0, 3.0), &axis), &mut ctx).unwrap();
        group.refresh(&mut ctx);
        assert_eq!(ctx.index.len(), 3);

        group.remove("a", &mut ctx).unwrap();
        assert!(matches!(group.remove("a", &mut ctx), Err(EngineError::ShapeNotFound { .. })));
        group.destroy(&mut ctx).unwrap();
        assert!(ctx.index.is_empty());
    }

    #[test]
    fn test_update_style_broadcasts() {
        let mut ctx = SessionContext::default();
        let axis = ctx.axis.clone();
        let mut group = Group::new("g", 0, GroupRole::Annotation);
        group.add(line("a", (0.0, 0.0), (1.0, 1.0), &axis), &mut ctx).unwrap();
        group.add(line("b", (2.0, 2.0), (3.0, 3.0), &axis), &mut ctx).unwrap();
        let style = ShapeStyle {
            stroke_width: 6.0,
            ..ShapeStyle::default()
        };
        group.update_style(&style, &mut ctx);
        group.each(|s| {
            assert!((s.style().stroke_width - 6.0).abs() < f64::EPSILON);
            true
        });
    }
}
