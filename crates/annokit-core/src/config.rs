//! Engine configuration.

use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default lower bound for the zoom scale.
pub const DEFAULT_MIN_SCALE: f64 = 0.1;
/// Default upper bound for the zoom scale.
pub const DEFAULT_MAX_SCALE: f64 = 20.0;

/// Tunables for one annotation session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Minimum allowed zoom scale.
    pub min_scale: f64,
    /// Maximum allowed zoom scale.
    pub max_scale: f64,
    /// Extra pick distance around shapes, in viewport pixels.
    pub hit_tolerance: f64,
    /// Radius of vertex handles, in viewport pixels.
    pub handle_radius: f64,
    /// Max distance for edge snapping, in viewport pixels.
    pub snap_threshold: f64,
    /// Snap dragged polygon/line vertices onto neighbouring edges.
    pub edge_snapping: bool,
    /// Let handles leave the image instead of stopping at its edge.
    pub allow_out_of_image: bool,
    /// Minimum vertex count of a polygon.
    pub closing_point_amount: usize,
    /// Minimum vertex count of a line.
    pub min_line_points: usize,
    /// Render frames per second for the frame ticker.
    pub frame_rate: u32,
    /// Drafts are shown with handles but refuse edits.
    pub read_only: bool,
    /// Push geometry to the listener on every drag move, not only on commit.
    pub live_sync: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_scale: DEFAULT_MIN_SCALE,
            max_scale: DEFAULT_MAX_SCALE,
            hit_tolerance: 4.0,
            handle_radius: 4.0,
            snap_threshold: 8.0,
            edge_snapping: true,
            allow_out_of_image: false,
            closing_point_amount: 3,
            min_line_points: 2,
            frame_rate: 60,
            read_only: false,
            live_sync: true,
        }
    }
}

impl EngineConfig {
    /// Parse a config from JSON. Missing keys fall back to defaults.
    pub fn from_json_str(json: &str) -> EngineResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine cannot work with.
    pub fn validate(&self) -> EngineResult<()> {
        if !(self.min_scale > 0.0) || !self.min_scale.is_finite() {
            return Err(EngineError::InvalidConfig(format!(
                "minScale must be positive, got {}",
                self.min_scale
            )));
        }
        if !self.max_scale.is_finite() || self.min_scale > self.max_scale {
            return Err(EngineError::InvalidConfig(format!(
                "minScale {} exceeds maxScale {}",
                self.min_scale, self.max_scale
            )));
        }
        if self.frame_rate == 0 {
            return Err(EngineError::InvalidConfig("frameRate must be non-zero".into()));
        }
        if self.closing_point_amount < 3 {
            return Err(EngineError::InvalidConfig(format!(
                "closingPointAmount must be at least 3, got {}",
                self.closing_point_amount
            )));
        }
        if self.min_line_points < 2 {
            return Err(EngineError::InvalidConfig(format!(
                "minLinePoints must be at least 2, got {}",
                self.min_line_points
            )));
        }
        if self.hit_tolerance < 0.0 || self.snap_threshold < 0.0 || self.handle_radius <= 0.0 {
            return Err(EngineError::InvalidConfig(
                "tolerances must be non-negative and handleRadius positive".into(),
            ));
        }
        Ok(())
    }

    /// Interval between two render passes.
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.frame_rate.max(1) as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert!((config.min_scale - 0.1).abs() < f64::EPSILON);
        assert!((config.max_scale - 20.0).abs() < f64::EPSILON);
        assert_eq!(config.closing_point_amount, 3);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = EngineConfig::from_json_str(r#"{ "maxScale": 8, "allowOutOfImage": true }"#)
            .unwrap();
        assert!((config.max_scale - 8.0).abs() < f64::EPSILON);
        assert!(config.allow_out_of_image);
        assert_eq!(config.frame_rate, 60);
    }

    #[test]
    fn test_inverted_scale_bounds_rejected() {
        let result = EngineConfig::from_json_str(r#"{ "minScale": 5, "maxScale": 2 }"#);
        assert!(matches!(result, Err(EngineError::InvalidConfig(_))));
    }

    #[test]
    fn test_frame_interval() {
        let config = EngineConfig::default();
        let interval = config.frame_interval();
        assert!((interval.as_secs_f64() - 1.0 / 60.0).abs() < 1e-9);
    }
}
