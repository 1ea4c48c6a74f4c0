//! Circle element.

use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};

use super::DEFAULT_STROKE;

/// A circle given by its center and radius.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Circle {
    /// Center X.
    pub x: f64,
    /// Center Y.
    pub y: f64,
    /// Radius; may be negative mid-drag.
    pub radius: f64,
    #[serde(default = "super::default_stroke")]
    pub stroke: String,
    #[serde(default = "super::default_stroke_width")]
    pub stroke_width: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<String>,
    #[serde(default)]
    pub is_dashed: bool,
}

impl Circle {
    pub fn new(center: Point, radius: f64) -> Self {
        Self {
            x: center.x,
            y: center.y,
            radius,
            stroke: DEFAULT_STROKE.to_string(),
            stroke_width: super::default_stroke_width(),
            fill: None,
            is_dashed: false,
        }
    }

    /// Circle centered at `center` reaching out to `edge`.
    pub fn from_drag(center: Point, edge: Point) -> Self {
        Self::new(center, center.distance(edge))
    }

    pub fn with_fill(mut self, fill: impl Into<String>) -> Self {
        self.fill = Some(fill.into());
        self
    }

    pub fn center(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn bounds(&self) -> Rect {
        let r = self.radius.abs();
        Rect::new(self.x - r, self.y - r, self.x + r, self.y + r)
    }

    pub fn is_normalized(&self) -> bool {
        self.radius >= 0.0
    }

    /// Copy with a non-negative radius.
    pub fn normalized(&self) -> Self {
        Self {
            radius: self.radius.abs(),
            ..self.clone()
        }
    }
}
