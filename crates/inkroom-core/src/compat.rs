//! Shape-based classification of untagged element collections.
//!
//! Older import paths hand the store a bare array of elements without saying
//! which collection it belongs to. This shim guesses the kind from the first
//! element's fields, in this order:
//!
//! 1. `points` → lines
//! 2. `src` → images
//! 3. `width` → rectangles
//! 4. `radius` → circles
//! 5. anything else → text
//!
//! Any future element with a `width` and no `src` will be read as a
//! rectangle. New code should build a [`HistoryUpdate`] variant directly.

use serde_json::Value;
use thiserror::Error;

use crate::elements::ElementKind;
use crate::store::HistoryUpdate;

/// Errors from [`classify_collection`].
#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("expected an array of elements")]
    NotAnArray,
    #[error("cannot infer the element kind of an empty collection")]
    Empty,
    #[error("elements do not match inferred kind {kind:?}: {source}")]
    Mismatch {
        kind: ElementKind,
        #[source]
        source: serde_json::Error,
    },
}

/// Infer the element kind of a bare collection from its first element.
pub fn infer_kind(value: &Value) -> Result<ElementKind, ClassifyError> {
    let items = value.as_array().ok_or(ClassifyError::NotAnArray)?;
    let first = items.first().ok_or(ClassifyError::Empty)?;
    let has = |field: &str| first.get(field).is_some();

    let kind = if has("points") {
        ElementKind::Lines
    } else if has("src") {
        ElementKind::Images
    } else if has("width") {
        ElementKind::Rectangles
    } else if has("radius") {
        ElementKind::Circles
    } else {
        ElementKind::Texts
    };
    Ok(kind)
}

/// Turn a bare JSON collection into a tagged history update.
pub fn classify_collection(value: Value) -> Result<HistoryUpdate, ClassifyError> {
    let kind = infer_kind(&value)?;
    let mismatch = |source| ClassifyError::Mismatch { kind, source };

    let update = match kind {
        ElementKind::Lines => HistoryUpdate::Lines(serde_json::from_value(value).map_err(mismatch)?),
        ElementKind::Texts => HistoryUpdate::Texts(serde_json::from_value(value).map_err(mismatch)?),
        ElementKind::Rectangles => {
            HistoryUpdate::Rectangles(serde_json::from_value(value).map_err(mismatch)?)
        }
        ElementKind::Circles => {
            HistoryUpdate::Circles(serde_json::from_value(value).map_err(mismatch)?)
        }
        ElementKind::Images => HistoryUpdate::Images(serde_json::from_value(value).map_err(mismatch)?),
    };
    Ok(update)
}
