//! Rectangle element.

use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};

use super::DEFAULT_STROKE;

/// A rectangle with optional fill and rounded corners.
///
/// While the user drags, `width` and `height` follow the pointer and may be
/// negative. [`Rectangle::normalized`] flips them back before the rectangle
/// is recorded in history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rectangle {
    /// Top-left corner X.
    pub x: f64,
    /// Top-left corner Y.
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default = "super::default_stroke")]
    pub stroke: String,
    #[serde(default = "super::default_stroke_width")]
    pub stroke_width: f64,
    /// Fill color (None = no fill).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<String>,
    #[serde(default)]
    pub is_dashed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corner_radius: Option<f64>,
}

impl Rectangle {
    /// Create a new rectangle.
    pub fn new(position: Point, width: f64, height: f64) -> Self {
        Self {
            x: position.x,
            y: position.y,
            width,
            height,
            stroke: DEFAULT_STROKE.to_string(),
            stroke_width: super::default_stroke_width(),
            fill: None,
            is_dashed: false,
            corner_radius: None,
        }
    }

    /// Create a rectangle spanning the drag from `start` to `current`.
    /// The result is not normalized.
    pub fn from_drag(start: Point, current: Point) -> Self {
        Self::new(start, current.x - start.x, current.y - start.y)
    }

    pub fn with_fill(mut self, fill: impl Into<String>) -> Self {
        self.fill = Some(fill.into());
        self
    }

    pub fn with_corner_radius(mut self, radius: f64) -> Self {
        self.corner_radius = Some(radius);
        self
    }

    /// The rectangle as a kurbo Rect (may have negative extent).
    pub fn as_rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.x + self.width, self.y + self.height)
    }

    /// True once width and height are non-negative.
    pub fn is_normalized(&self) -> bool {
        self.width >= 0.0 && self.height >= 0.0
    }

    /// Return a copy whose origin is the top-left corner and whose size is non-negative.
    pub fn normalized(&self) -> Self {
        let rect = self.as_rect().abs();
        Self {
            x: rect.x0,
            y: rect.y0,
            width: rect.width(),
            height: rect.height(),
            corner_radius: self.corner_radius.map(f64::abs),
            ..self.clone()
        }
    }
}
