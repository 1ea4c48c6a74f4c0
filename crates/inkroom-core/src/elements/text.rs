//! Text element.

use kurbo::Point;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default font size in canvas units.
pub const DEFAULT_FONT_SIZE: f64 = 20.0;

/// A text label placed on the canvas.
///
/// The `id` is assigned once and stays stable while the text is edited, so the
/// editor and the eraser can find the element after the collection has been
/// replaced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextElement {
    pub id: String,
    pub x: f64,
    pub y: f64,
    /// Content; empty while the user is still typing.
    #[serde(default)]
    pub text: String,
    #[serde(default = "default_font_size")]
    pub font_size: f64,
    #[serde(default = "super::default_stroke")]
    pub fill: String,
}

fn default_font_size() -> f64 {
    DEFAULT_FONT_SIZE
}

impl TextElement {
    /// Create a text element with a fresh identifier.
    pub fn new(position: Point, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            x: position.x,
            y: position.y,
            text: text.into(),
            font_size: DEFAULT_FONT_SIZE,
            fill: super::default_stroke(),
        }
    }

    pub fn with_font_size(mut self, size: f64) -> Self {
        self.font_size = size;
        self
    }

    pub fn with_fill(mut self, fill: impl Into<String>) -> Self {
        self.fill = fill.into();
        self
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}
