//! Drawable element types and the consolidated document state.

mod circle;
mod image;
mod line;
mod rectangle;
mod text;

pub use circle::Circle;
pub use image::Image;
pub use line::DrawLine;
pub use rectangle::Rectangle;
pub use text::{DEFAULT_FONT_SIZE, TextElement};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stroke color used when none is given.
pub const DEFAULT_STROKE: &str = "#000000";

pub(crate) fn default_stroke() -> String {
    DEFAULT_STROKE.to_string()
}

pub(crate) fn default_stroke_width() -> f64 {
    2.0
}

/// The five element collections of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Lines,
    Texts,
    Rectangles,
    Circles,
    Images,
}

impl ElementKind {
    /// All kinds, in storage order.
    pub const ALL: [ElementKind; 5] = [
        ElementKind::Lines,
        ElementKind::Texts,
        ElementKind::Rectangles,
        ElementKind::Circles,
        ElementKind::Images,
    ];

    /// Local cache key holding this collection.
    pub fn cache_key(&self) -> &'static str {
        match self {
            ElementKind::Lines => "lines",
            ElementKind::Texts => "texts",
            ElementKind::Rectangles => "rectangles",
            ElementKind::Circles => "circles",
            ElementKind::Images => "images",
        }
    }

    /// Field name of this collection in serialized state.
    pub fn field_name(&self) -> &'static str {
        match self {
            ElementKind::Lines => "lines",
            ElementKind::Texts => "textElements",
            ElementKind::Rectangles => "rectangles",
            ElementKind::Circles => "circles",
            ElementKind::Images => "images",
        }
    }

    /// Whether this collection is carried over the room channel.
    pub fn is_synced(&self) -> bool {
        !matches!(self, ElementKind::Images)
    }
}

/// Element validation errors.
#[derive(Debug, Error, PartialEq)]
pub enum ElementError {
    #[error("line {index} has {len} coordinates; expected a non-empty even count")]
    MalformedLine { index: usize, len: usize },
}

/// Snapshot of every element collection.
///
/// This is the unit stored in undo history, sent to peers and written to
/// disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsolidatedState {
    #[serde(default)]
    pub lines: Vec<DrawLine>,
    #[serde(default)]
    pub text_elements: Vec<TextElement>,
    #[serde(default)]
    pub rectangles: Vec<Rectangle>,
    #[serde(default)]
    pub circles: Vec<Circle>,
    #[serde(default)]
    pub images: Vec<Image>,
}

impl ConsolidatedState {
    /// The empty document.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
            && self.text_elements.is_empty()
            && self.rectangles.is_empty()
            && self.circles.is_empty()
            && self.images.is_empty()
    }

    /// Total number of elements across all collections.
    pub fn len(&self) -> usize {
        self.lines.len()
            + self.text_elements.len()
            + self.rectangles.len()
            + self.circles.len()
            + self.images.len()
    }

    /// Copy with the image collection emptied, as sent over the wire.
    pub fn without_images(&self) -> Self {
        Self {
            images: Vec::new(),
            ..self.clone()
        }
    }

    /// Flip any negative rectangle and circle extents.
    pub fn normalize(&mut self) {
        for rect in &mut self.rectangles {
            *rect = rect.normalized();
        }
        for circle in &mut self.circles {
            *circle = circle.normalized();
        }
    }

    /// Check structural invariants of every element.
    pub fn validate(&self) -> Result<(), ElementError> {
        for (index, line) in self.lines.iter().enumerate() {
            if !line.is_well_formed() {
                return Err(ElementError::MalformedLine {
                    index,
                    len: line.points.len(),
                });
            }
        }
        Ok(())
    }

    /// Find a text element by its identifier.
    pub fn text_element(&self, id: &str) -> Option<&TextElement> {
        self.text_elements.iter().find(|t| t.id == id)
    }
}
