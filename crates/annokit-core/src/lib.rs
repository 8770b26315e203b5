//! Annokit Core Library
//!
//! Interactive geometric annotation over raster images: shapes and groups
//! with a spatial index, editable handles, per-kind draft state machines
//! and polygon cutting. Rendering is left to the host, which reads shape
//! geometry in viewport coordinates.

pub mod annotation;
pub mod axis;
pub mod bbox;
pub mod config;
pub mod cuboid;
pub mod draft;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod handles;
pub mod input;
pub mod scene;
pub mod session;
pub mod shapes;
pub mod spatial;
pub mod ticker;

pub use annotation::{
    AnnotationData, AnnotationMeta, CuboidData, CuboidDirection, CuboidPlane, PathData, PathType, PathVertex,
    PointData, RectData, RelationData, Tool,
};
pub use axis::Axis;
pub use bbox::BBox;
pub use config::EngineConfig;
pub use draft::{Draft, DraftResponse, DraftState};
pub use engine::{Annotator, CutOutcome};
pub use error::{EngineError, EngineResult, ValidationError};
pub use input::{InputState, Modifiers, MouseButton, PointerEvent};
pub use session::{EngineListener, NoopListener, SessionContext};
pub use shapes::{Group, GroupRole, GroupStore, Shape, ShapeKind, ShapeStyle, WidgetState};
pub use spatial::SpatialIndex;
