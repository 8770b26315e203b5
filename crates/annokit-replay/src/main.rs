//! Annokit session replay
//!
//! Reads a JSON session script, drives an [`Annotator`] through it and
//! prints the resulting annotations as JSON.
//!
//! ```json
//! {
//!   "imageSize": { "width": 800, "height": 600 },
//!   "viewportSize": { "width": 800, "height": 600 },
//!   "config": { "snapThreshold": 8 },
//!   "annotations": [ { "tool": "rect", "id": "r1", "x": 10, "y": 10, "width": 50, "height": 40 } ],
//!   "steps": [
//!     { "op": "select", "id": "r1" },
//!     { "op": "pointer", "event": { "type": "down", "position": { "x": 10, "y": 10 }, "button": "left" } },
//!     { "op": "pointer", "event": { "type": "move", "position": { "x": 5, "y": 5 } } },
//!     { "op": "pointer", "event": { "type": "up", "position": { "x": 5, "y": 5 }, "button": "left" } }
//!   ]
//! }
//! ```
//!
//! Usage: `annokit-replay [script.json]`. Reads stdin when no path is given.

use std::io::Read;

use annokit_core::{
    AnnotationData, Annotator, CuboidDirection, EngineConfig, EngineError, EngineListener, Modifiers, PointerEvent,
    ShapeStyle, ValidationError,
};
use kurbo::{Point, Size};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
enum ReplayError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Script error: {0}")]
    Script(#[from] serde_json::Error),
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Script {
    image_size: Size,
    viewport_size: Size,
    #[serde(default)]
    config: EngineConfig,
    #[serde(default)]
    annotations: Vec<AnnotationData>,
    #[serde(default)]
    steps: Vec<Step>,
}

/// One scripted command. Pointer positions are viewport coordinates.
#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
enum Step {
    Select { id: String },
    Deselect,
    Pointer { event: PointerEvent },
    Modifiers(Modifiers),
    Escape,
    Cut,
    Pan { dx: f64, dy: f64 },
    Zoom { x: f64, y: f64, factor: f64 },
    ResetView,
    Direction { direction: CuboidDirection },
    Style { id: String, style: ShapeStyle },
    Add { annotation: AnnotationData },
    Remove { id: String },
    Flush,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Report {
    annotations: Vec<AnnotationData>,
    validation_errors: Vec<ValidationError>,
}

/// Logs what a host would receive.
struct LogListener;

impl EngineListener for LogListener {
    fn on_hover_change(&mut self, hovered: Option<&str>) {
        log::debug!("hover: {hovered:?}");
    }

    fn on_select(&mut self, id: &str) {
        log::info!("select {id}");
    }

    fn on_unselect(&mut self, id: &str) {
        log::info!("unselect {id}");
    }

    fn on_change(&mut self, data: &AnnotationData, committed: bool) {
        if committed {
            log::info!("commit {}", data.id());
        } else {
            log::debug!("live change {}", data.id());
        }
    }

    fn on_create(&mut self, data: &AnnotationData) {
        log::info!("create {}", data.id());
    }

    fn on_remove(&mut self, id: &str) {
        log::info!("remove {id}");
    }
}

fn main() {
    env_logger::init();
    if let Err(e) = run() {
        log::error!("{e}");
        eprintln!("annokit-replay: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), ReplayError> {
    let source = match std::env::args().nth(1) {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    let script: Script = serde_json::from_str(&source)?;
    let report = replay(script)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn replay(script: Script) -> Result<Report, ReplayError> {
    let mut annotator = Annotator::new(
        script.config,
        script.image_size,
        script.viewport_size,
        Box::new(LogListener),
    )?;
    annotator.load(script.annotations)?;
    log::info!("Replaying {} steps", script.steps.len());

    for step in script.steps {
        annotator.flush();
        match step {
            Step::Select { id } => {
                annotator.select(&id)?;
            }
            Step::Deselect => {
                annotator.deselect()?;
            }
            Step::Pointer { event } => annotator.handle_pointer(event)?,
            Step::Modifiers(modifiers) => annotator.set_modifiers(modifiers),
            Step::Escape => annotator.escape()?,
            Step::Cut => {
                let outcome = annotator.cut_selected_polygon()?;
                log::info!("cut: changed={} created={:?}", outcome.changed, outcome.created);
            }
            Step::Pan { dx, dy } => annotator.pan(dx, dy),
            Step::Zoom { x, y, factor } => {
                if !annotator.zoom_at(Point::new(x, y), factor) {
                    log::warn!("Zoom by {factor} refused at scale {}", annotator.axis().scale);
                }
            }
            Step::ResetView => annotator.reset_view(),
            Step::Direction { direction } => {
                annotator.set_cuboid_direction(direction)?;
            }
            Step::Style { id, style } => annotator.set_style(&id, style)?,
            Step::Add { annotation } => {
                annotator.add_annotation(annotation)?;
            }
            Step::Remove { id } => {
                annotator.remove_annotation(&id)?;
            }
            Step::Flush => {}
        }
    }
    annotator.deselect()?;

    Ok(Report {
        annotations: annotator.annotations().into_iter().cloned().collect(),
        validation_errors: annotator.take_validation_errors(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replay_corner_drag() {
        let script: Script = serde_json::from_str(
            r#"{
                "imageSize": { "width": 200, "height": 200 },
                "viewportSize": { "width": 200, "height": 200 },
                "annotations": [
                    { "tool": "rect", "id": "r1", "order": 0, "x": 10, "y": 10, "width": 50, "height": 40 }
                ],
                "steps": [
                    { "op": "select", "id": "r1" },
                    { "op": "pointer", "event": { "type": "down", "position": { "x": 10, "y": 10 }, "button": "left" } },
                    { "op": "pointer", "event": { "type": "move", "position": { "x": 0, "y": 0 } } },
                    { "op": "pointer", "event": { "type": "up", "position": { "x": 0, "y": 0 }, "button": "left" } }
                ]
            }"#,
        )
        .unwrap();
        let report = replay(script).unwrap();
        let AnnotationData::Rect(r) = &report.annotations[0] else {
            panic!("expected rect");
        };
        assert_eq!((r.x, r.y, r.width, r.height), (0.0, 0.0, 60.0, 50.0));
        assert!(report.validation_errors.is_empty());
    }

    #[test]
    fn test_unknown_direction_fails_to_parse() {
        let result: Result<Step, _> = serde_json::from_str(r#"{ "op": "direction", "direction": "diagonal" }"#);
        assert!(result.is_err());
    }
}
