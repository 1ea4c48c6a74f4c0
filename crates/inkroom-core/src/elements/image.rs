//! Embedded raster images.
//!
//! Images carry their pixels inline as a `data:` URI. They take part in undo
//! history, the local cache and file export, but never travel over the room
//! channel.

use base64::{Engine, engine::general_purpose::STANDARD};
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};

/// An image placed on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Source reference, normally `data:<mime>;base64,<payload>`.
    pub src: String,
}

impl Image {
    /// Create an image from raw bytes of the given MIME type.
    pub fn from_bytes(position: Point, width: f64, height: f64, mime: &str, data: &[u8]) -> Self {
        Self {
            x: position.x,
            y: position.y,
            width,
            height,
            src: format!("data:{};base64,{}", mime, STANDARD.encode(data)),
        }
    }

    /// MIME type declared by a `data:` URI source.
    pub fn media_type(&self) -> Option<&str> {
        let rest = self.src.strip_prefix("data:")?;
        let header = rest.split_once(',')?.0;
        let mime = header.split(';').next()?;
        (!mime.is_empty()).then_some(mime)
    }

    /// Decode the payload of a base64 `data:` URI.
    /// Returns None for other source kinds or undecodable payloads.
    pub fn decode_data(&self) -> Option<Vec<u8>> {
        let rest = self.src.strip_prefix("data:")?;
        let (header, payload) = rest.split_once(',')?;
        if !header.ends_with(";base64") {
            return None;
        }
        STANDARD.decode(payload).ok()
    }

    pub fn as_rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.x + self.width, self.y + self.height)
    }

    /// Approximate decoded payload size in bytes.
    pub fn data_size(&self) -> usize {
        self.src.len() * 3 / 4
    }
}
