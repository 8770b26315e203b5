//! Per-session context shared by shapes, groups and drafts.

use crate::annotation::AnnotationData;
use crate::axis::Axis;
use crate::config::EngineConfig;
use crate::error::{ValidationError, ValidationLog};
use crate::shapes::Group;
use crate::spatial::SpatialIndex;
use crate::ticker::FrameTicker;

/// Typed dispatcher for hover/select routing and geometry output.
///
/// Every method has a no-op default, so hosts implement only what they need.
pub trait EngineListener {
    /// The topmost annotation under the cursor changed.
    fn on_hover_change(&mut self, _hovered: Option<&str>) {}

    /// An annotation was selected and its draft assembled.
    fn on_select(&mut self, _id: &str) {}

    /// The selected annotation was archived.
    fn on_unselect(&mut self, _id: &str) {}

    /// Geometry changed. `committed` is false for live drag updates.
    /// Coordinates are in source-image space.
    fn on_change(&mut self, _data: &AnnotationData, _committed: bool) {}

    /// An annotation was created by the engine (e.g. a cut piece).
    fn on_create(&mut self, _data: &AnnotationData) {}

    /// An annotation was removed.
    fn on_remove(&mut self, _id: &str) {}

    /// An edit was refused.
    fn on_validation_error(&mut self, _error: &ValidationError) {}
}

/// Listener that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopListener;

impl EngineListener for NoopListener {}

/// State owned once per annotation session and passed to every component
/// that reads the transform, touches the index or reports to the host.
pub struct SessionContext {
    pub axis: Axis,
    pub index: SpatialIndex,
    pub config: EngineConfig,
    pub ticker: FrameTicker,
    pub validation: ValidationLog,
    /// Snap target marker, created on demand.
    pub snap_preview: Option<Group>,
    listener: Box<dyn EngineListener>,
}

impl SessionContext {
    pub fn new(config: EngineConfig, axis: Axis, listener: Box<dyn EngineListener>) -> Self {
        let axis = axis.with_scale_bounds(config.min_scale, config.max_scale);
        let ticker = FrameTicker::new(config.frame_interval());
        Self {
            axis,
            index: SpatialIndex::new(),
            config,
            ticker,
            validation: ValidationLog::new(),
            snap_preview: None,
            listener,
        }
    }

    pub fn request_update(&mut self) {
        self.ticker.request_update();
    }

    /// Record a refused edit and forward it to the listener.
    pub fn report_validation(&mut self, error: ValidationError) {
        log::warn!("Edit refused: {error}");
        self.listener.on_validation_error(&error);
        self.validation.push(error);
    }

    pub fn listener(&mut self) -> &mut dyn EngineListener {
        self.listener.as_mut()
    }

    pub fn set_listener(&mut self, listener: Box<dyn EngineListener>) {
        self.listener = listener;
    }
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("axis", &self.axis)
            .field("index_len", &self.index.len())
            .field("config", &self.config)
            .field("ticker", &self.ticker)
            .field("validation", &self.validation)
            .finish_non_exhaustive()
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new(EngineConfig::default(), Axis::default(), Box::new(NoopListener))
    }
}
