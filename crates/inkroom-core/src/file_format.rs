//! The `.str` drawing file ("Save to Disk").
//!
//! ```json
//! {
//!   "version": "1.0",
//!   "timestamp": "2024-05-01T12:00:00.000Z",
//!   "elements": { "lines": [], "textElements": [], "rectangles": [], "circles": [], "images": [] }
//! }
//! ```

use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::elements::{ConsolidatedState, ElementError};

/// Format version written by this crate.
pub const FILE_VERSION: &str = "1.0";

/// Conventional file extension.
pub const FILE_EXTENSION: &str = "str";

/// Errors reading a drawing file. Nothing is applied when one is returned.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("File has no 'elements' section")]
    MissingElements,
    #[error("Invalid element: {0}")]
    InvalidElement(#[from] ElementError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A saved drawing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawingFile {
    #[serde(default = "default_version")]
    pub version: String,
    /// ISO-8601 time the file was written.
    #[serde(default)]
    pub timestamp: String,
    pub elements: ConsolidatedState,
}

fn default_version() -> String {
    FILE_VERSION.to_string()
}

impl DrawingFile {
    /// Wrap `state` with the current version and time.
    pub fn from_state(state: &ConsolidatedState) -> Self {
        Self::from_state_at(state, Utc::now())
    }

    pub fn from_state_at(state: &ConsolidatedState, at: DateTime<Utc>) -> Self {
        Self {
            version: FILE_VERSION.to_string(),
            timestamp: at.to_rfc3339_opts(SecondsFormat::Millis, true),
            elements: state.clone(),
        }
    }

    /// Parsed timestamp, if it is valid RFC 3339.
    pub fn saved_at(&self) -> Option<DateTime<FixedOffset>> {
        DateTime::parse_from_rfc3339(&self.timestamp).ok()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parse and validate a drawing file.
    ///
    /// Only `elements` is required; missing collections inside it are empty.
    pub fn from_json(json: &str) -> Result<Self, ImportError> {
        let value: Value = serde_json::from_str(json)?;
        if value.get("elements").is_none_or(Value::is_null) {
            return Err(ImportError::MissingElements);
        }
        let file: DrawingFile = serde_json::from_value(value)?;
        file.elements.validate()?;
        Ok(file)
    }

    pub fn write_to(&self, path: &Path) -> Result<(), ImportError> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn read_from(path: &Path) -> Result<Self, ImportError> {
        Self::from_json(&fs::read_to_string(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::{Circle, DrawLine};
    use chrono::TimeZone;
    use kurbo::Point;
    use tempfile::tempdir;

    #[test]
    fn test_export_layout() {
        let mut state = ConsolidatedState::new();
        state.circles.push(Circle::new(Point::new(1.0, 2.0), 3.0));
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();

        let file = DrawingFile::from_state_at(&state, at);
        let json: Value = serde_json::from_str(&file.to_json().unwrap()).unwrap();

        assert_eq!(json["version"], "1.0");
        assert_eq!(json["timestamp"], "2024-05-01T12:00:00.000Z");
        assert_eq!(json["elements"]["circles"][0]["radius"], 3.0);
        assert!(json["elements"]["textElements"].is_array());
        assert!(file.saved_at().is_some());
    }

    #[test]
    fn test_missing_elements_rejected() {
        let result = DrawingFile::from_json(r#"{"version":"1.0","timestamp":"x"}"#);
        assert!(matches!(result, Err(ImportError::MissingElements)));

        let result = DrawingFile::from_json(r#"{"elements":null}"#);
        assert!(matches!(result, Err(ImportError::MissingElements)));
    }

    #[test]
    fn test_unparseable_rejected() {
        assert!(matches!(DrawingFile::from_json("{not json"), Err(ImportError::Json(_))));
    }

    #[test]
    fn test_malformed_line_rejected() {
        let json = r#"{"elements":{"lines":[{"points":[1,2,3]}]}}"#;
        assert!(matches!(
            DrawingFile::from_json(json),
            Err(ImportError::InvalidElement(_))
        ));
    }

    #[test]
    fn test_minimal_file_accepted() {
        let file = DrawingFile::from_json(r#"{"elements":{"lines":[{"points":[0,0,5,5]}]}}"#).unwrap();
        assert_eq!(file.version, FILE_VERSION);
        assert_eq!(file.elements.lines.len(), 1);
        assert!(file.saved_at().is_none());
    }

    #[test]
    fn test_write_and_read() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(format!("drawing.{}", FILE_EXTENSION));
        let mut state = ConsolidatedState::new();
        state.lines.push(DrawLine::segment(Point::ZERO, Point::new(2.0, 2.0)));

        DrawingFile::from_state(&state).write_to(&path).unwrap();
        let loaded = DrawingFile::read_from(&path).unwrap();
        assert_eq!(loaded.elements, state);
    }
}
