//! Engine errors and the validation-error channel.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::annotation::Tool;

/// Programmer errors. These are never recovered silently; callers get them
/// back through `?` and are expected to treat them as bugs.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid coordinate in {context}: ({x}, {y})")]
    InvalidCoordinate { context: String, x: f64, y: f64 },
    #[error("Shape {shape} needs {expected} points, got {actual}")]
    PointCount {
        shape: String,
        expected: String,
        actual: usize,
    },
    #[error("Point {index} out of range for shape {shape} with {len} points")]
    PointIndex { shape: String, index: usize, len: usize },
    #[error("Duplicate shape id {shape} in group {group}")]
    DuplicateShapeId { group: String, shape: String },
    #[error("Shape {shape} not found in group {group}")]
    ShapeNotFound { group: String, shape: String },
    #[error("Unknown cuboid direction: {0}")]
    InvalidDirection(String),
    #[error("No spatial index entry for {0}")]
    MissingIndexEntry(String),
    #[error("Annotation not found: {0}")]
    AnnotationNotFound(String),
    #[error("Duplicate annotation id: {0}")]
    DuplicateAnnotation(String),
    #[error("Annotation {id} is a {actual:?}, expected {expected:?}")]
    ToolMismatch {
        id: String,
        expected: Tool,
        actual: Tool,
    },
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Expected user situations that refuse an operation without failing the
/// editing session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ValidationError {
    /// Removing a vertex would leave fewer points than allowed.
    #[serde(rename_all = "camelCase")]
    TooFewPoints {
        annotation_id: String,
        minimum: usize,
        actual: usize,
    },
    /// A polygon committed with fewer vertices than the closing size.
    #[serde(rename_all = "camelCase")]
    PolygonNotClosable {
        annotation_id: String,
        closing_point_amount: usize,
        actual: usize,
    },
}

impl ValidationError {
    /// Id of the annotation the failure is about.
    pub fn annotation_id(&self) -> &str {
        match self {
            ValidationError::TooFewPoints { annotation_id, .. }
            | ValidationError::PolygonNotClosable { annotation_id, .. } => annotation_id,
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::TooFewPoints {
                annotation_id,
                minimum,
                actual,
            } => write!(
                f,
                "annotation {annotation_id} needs at least {minimum} points (has {actual})"
            ),
            ValidationError::PolygonNotClosable {
                annotation_id,
                closing_point_amount,
                actual,
            } => write!(
                f,
                "polygon {annotation_id} needs {closing_point_amount} points to close (has {actual})"
            ),
        }
    }
}

/// Accumulates validation failures until the caller drains them.
#[derive(Debug, Clone, Default)]
pub struct ValidationLog {
    errors: Vec<ValidationError>,
}

impl ValidationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    /// Take every pending error, leaving the log empty.
    pub fn drain(&mut self) -> Vec<ValidationError> {
        std::mem::take(&mut self.errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_log_drain() {
        let mut log = ValidationLog::new();
        log.push(ValidationError::TooFewPoints {
            annotation_id: "a".into(),
            minimum: 3,
            actual: 3,
        });
        assert!(!log.is_empty());
        let drained = log.drain();
        assert_eq!(drained.len(), 1);
        assert!(log.is_empty());
        assert_eq!(drained[0].annotation_id(), "a");
    }

    #[test]
    fn test_validation_error_serializes_with_kind() {
        let err = ValidationError::TooFewPoints {
            annotation_id: "p1".into(),
            minimum: 3,
            actual: 3,
        };
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "tooFewPoints");
        assert_eq!(json["annotationId"], "p1");
    }
}
