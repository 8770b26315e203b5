//! R-tree spatial index for hit-testing and edge snapping.

use std::collections::HashMap;

use kurbo::Point;
use rstar::{AABB, RTree, RTreeObject};

use crate::annotation::Tool;
use crate::bbox::BBox;
use crate::error::{EngineError, EngineResult};
use crate::geometry::{nearest_point_on_segment, point_to_segment_dist};
use crate::session::SessionContext;
use crate::shapes::{Group, GroupRole, GroupStore, Shape, ShapeKind, ShapeStyle};

/// Id of the lazily created snap preview group.
pub const SNAP_PREVIEW_ID: &str = "snap-preview";

/// Identity of one index entry: a whole group, or one shape inside it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IndexKey {
    pub group: String,
    pub shape: Option<String>,
}

impl IndexKey {
    pub fn group(group: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            shape: None,
        }
    }

    pub fn shape(group: impl Into<String>, shape: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            shape: Some(shape.into()),
        }
    }

    pub fn is_group(&self) -> bool {
        self.shape.is_none()
    }
}

impl std::fmt::Display for IndexKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.shape {
            Some(shape) => write!(f, "{}/{}", self.group, shape),
            None => write!(f, "{}", self.group),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    pub bbox: BBox,
    pub key: IndexKey,
    pub role: GroupRole,
}

impl RTreeObject for IndexEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.bbox.to_aabb()
    }
}

/// Bounding-box index over every registered shape and group.
///
/// Entries are never mutated in place: a bbox change removes the stale
/// entry and inserts a fresh one.
#[derive(Debug, Default)]
pub struct SpatialIndex {
    tree: RTree<IndexEntry>,
    entries: HashMap<IndexKey, IndexEntry>,
}

impl SpatialIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry, replacing any entry with the same key.
    pub fn insert(&mut self, entry: IndexEntry) {
        if let Some(stale) = self.entries.remove(&entry.key) {
            self.tree.remove(&stale);
        }
        self.tree.insert(entry.clone());
        self.entries.insert(entry.key.clone(), entry);
    }

    pub fn remove(&mut self, key: &IndexKey) -> EngineResult<IndexEntry> {
        let entry = self
            .entries
            .remove(key)
            .ok_or_else(|| EngineError::MissingIndexEntry(key.to_string()))?;
        self.tree.remove(&entry);
        Ok(entry)
    }

    pub fn get(&self, key: &IndexKey) -> Option<&IndexEntry> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &IndexKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &IndexEntry> {
        self.tree.iter()
    }

    /// Every entry whose bbox intersects the box.
    pub fn query_box(&self, window: &BBox) -> Vec<&IndexEntry> {
        self.tree
            .locate_in_envelope_intersecting(&window.to_aabb())
            .collect()
    }

    /// Every entry whose bbox intersects `[point - threshold, point + threshold]`.
    pub fn query_window(&self, point: Point, threshold: f64) -> Vec<&IndexEntry> {
        self.query_box(&BBox::around(point, threshold))
    }
}

/// Snap `point` (viewport) onto the nearest polygon edge within `threshold`.
pub fn nearest_point_on_polygon_edges(
    ctx: &mut SessionContext,
    groups: &GroupStore,
    point: Point,
    threshold: f64,
    exclude: &[&str],
) -> EngineResult<Option<Point>> {
    nearest_point_on_edges(ctx, groups, point, threshold, exclude, Tool::Polygon)
}

/// Snap `point` (viewport) onto the nearest line segment within `threshold`.
pub fn nearest_point_on_line_segments(
    ctx: &mut SessionContext,
    groups: &GroupStore,
    point: Point,
    threshold: f64,
    exclude: &[&str],
) -> EngineResult<Option<Point>> {
    nearest_point_on_edges(ctx, groups, point, threshold, exclude, Tool::Line)
}

/// Scans candidate groups in index order and returns the first projected
/// point found under the threshold. Not globally minimal across
/// overlapping candidates.
fn nearest_point_on_edges(
    ctx: &mut SessionContext,
    groups: &GroupStore,
    point: Point,
    threshold: f64,
    exclude: &[&str],
    tool: Tool,
) -> EngineResult<Option<Point>> {
    let candidates: Vec<String> = ctx
        .index
        .query_window(point, threshold)
        .into_iter()
        .filter(|entry| entry.key.is_group() && entry.role == GroupRole::Annotation)
        .map(|entry| entry.key.group.clone())
        .filter(|id| !exclude.contains(&id.as_str()))
        .collect();

    let mut found = None;
    'scan: for id in candidates {
        let Some(group) = groups.get(&id) else {
            continue;
        };
        if group.tool != Some(tool) {
            continue;
        }
        for (a, b) in group.outline_edges() {
            if point_to_segment_dist(point, a, b) < threshold {
                found = Some(nearest_point_on_segment(point, a, b));
                break 'scan;
            }
        }
    }

    match found {
        Some(snapped) => {
            show_snap_preview(ctx, snapped)?;
            Ok(Some(snapped))
        }
        None => {
            clear_snap_preview(ctx)?;
            Ok(None)
        }
    }
}

fn show_snap_preview(ctx: &mut SessionContext, viewport_point: Point) -> EngineResult<()> {
    let logical = ctx.axis.to_logical(viewport_point);
    match ctx.snap_preview.take() {
        Some(mut preview) => {
            preview.set_shape_points("point", vec![logical], ctx)?;
            preview.refresh(ctx);
            ctx.snap_preview = Some(preview);
        }
        None => {
            let radius = ctx.config.handle_radius;
            let mut preview = Group::new(SNAP_PREVIEW_ID, i64::MAX, GroupRole::Preview);
            preview.always_on_top = true;
            let shape = Shape::new(
                "point",
                ShapeKind::Point { radius },
                vec![logical],
                ShapeStyle::preview(),
                &ctx.axis,
            )?;
            preview.add(shape, ctx)?;
            preview.refresh(ctx);
            ctx.snap_preview = Some(preview);
        }
    }
    Ok(())
}

/// Destroy the snap preview, if one exists.
pub fn clear_snap_preview(ctx: &mut SessionContext) -> EngineResult<()> {
    if let Some(mut preview) = ctx.snap_preview.take() {
        preview.destroy(ctx)?;
    }
    Ok(())
}
