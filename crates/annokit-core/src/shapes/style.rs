//! Style records for shapes and handles.

use peniko::Color;
use serde::{Deserialize, Serialize};

/// Serializable color representation (RGBA8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializableColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl SerializableColor {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn black() -> Self {
        Self::new(0, 0, 0, 255)
    }

    /// Same color with its alpha replaced.
    pub fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    fn scaled_alpha(self, opacity: f64) -> Self {
        self.with_alpha((self.a as f64 * opacity.clamp(0.0, 1.0)) as u8)
    }
}

impl From<Color> for SerializableColor {
    fn from(color: Color) -> Self {
        let rgba = color.to_rgba8();
        Self::new(rgba.r, rgba.g, rgba.b, rgba.a)
    }
}

impl From<SerializableColor> for Color {
    fn from(color: SerializableColor) -> Self {
        Color::from_rgba8(color.r, color.g, color.b, color.a)
    }
}

/// Per-annotation style record supplied by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeStyle {
    pub stroke_color: SerializableColor,
    /// Stroke width in viewport pixels; also widens the hit area.
    pub stroke_width: f64,
    #[serde(default)]
    pub fill_color: Option<SerializableColor>,
    /// Overall opacity (0.0 = fully transparent, 1.0 = fully opaque).
    #[serde(default = "default_opacity")]
    pub opacity: f64,
}

fn default_opacity() -> f64 {
    1.0
}

impl ShapeStyle {
    /// Stroke paint for the host renderer, opacity applied.
    pub fn stroke_paint(&self) -> Color {
        self.stroke_color.scaled_alpha(self.opacity).into()
    }

    /// Fill paint for the host renderer, opacity applied.
    pub fn fill_paint(&self) -> Option<Color> {
        self.fill_color.map(|c| c.scaled_alpha(self.opacity).into())
    }

    /// Translucent fill derived from the stroke, used for closed annotations.
    pub fn with_derived_fill(mut self, alpha: u8) -> Self {
        self.fill_color = Some(self.stroke_color.with_alpha(alpha));
        self
    }

    /// Style for a handle in its resting state.
    pub fn handle() -> Self {
        Self {
            stroke_color: SerializableColor::new(33, 150, 243, 255),
            stroke_width: 1.0,
            fill_color: Some(SerializableColor::new(255, 255, 255, 255)),
            opacity: 1.0,
        }
    }

    /// Style for a hovered or dragged handle.
    pub fn handle_hovered() -> Self {
        Self {
            fill_color: Some(SerializableColor::new(33, 150, 243, 255)),
            ..Self::handle()
        }
    }

    /// Style for the snap and insert previews.
    pub fn preview() -> Self {
        Self {
            stroke_color: SerializableColor::new(255, 152, 0, 255),
            stroke_width: 1.0,
            fill_color: Some(SerializableColor::new(255, 152, 0, 160)),
            opacity: 1.0,
        }
    }
}

impl Default for ShapeStyle {
    fn default() -> Self {
        Self {
            stroke_color: SerializableColor::black(),
            stroke_width: 2.0,
            fill_color: None,
            opacity: 1.0,
        }
    }
}
