//! Best-effort local cache of the element collections.
//!
//! The cache is never authoritative. Each collection is stored under its own
//! key as a JSON object wrapping that single collection, e.g.
//! `{"lines": [...]}` under `lines`. Writes are not transactional across keys.

#[cfg(not(target_arch = "wasm32"))]
mod file;
mod memory;

#[cfg(not(target_arch = "wasm32"))]
pub use file::FileCache;
pub use memory::MemoryCache;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::elements::ElementKind;

/// Cache errors.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Entry not found: {0}")]
    NotFound(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Cache error: {0}")]
    Other(String),
}

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// String key-value store used as the local cache.
pub trait LocalCache {
    /// Read a value. Missing keys are `Ok(None)`.
    fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// Write a value, replacing any previous one.
    fn set(&self, key: &str, value: &str) -> CacheResult<()>;

    /// Remove a value. Removing a missing key succeeds.
    fn remove(&self, key: &str) -> CacheResult<()>;
}

/// Serialize one collection into its cache entry.
pub fn encode_collection<T: Serialize>(kind: ElementKind, items: &[T]) -> CacheResult<String> {
    let items = serde_json::to_value(items).map_err(|e| CacheError::Serialization(e.to_string()))?;
    let mut wrapper = Map::new();
    wrapper.insert(kind.field_name().to_string(), items);
    serde_json::to_string(&Value::Object(wrapper))
        .map_err(|e| CacheError::Serialization(e.to_string()))
}

/// Parse one collection back out of its cache entry.
pub fn decode_collection<T: DeserializeOwned>(kind: ElementKind, entry: &str) -> CacheResult<Vec<T>> {
    let mut wrapper: Map<String, Value> =
        serde_json::from_str(entry).map_err(|e| CacheError::Serialization(e.to_string()))?;
    let items = wrapper
        .remove(kind.field_name())
        .ok_or_else(|| CacheError::Serialization(format!("missing '{}' field", kind.field_name())))?;
    serde_json::from_value(items).map_err(|e| CacheError::Serialization(e.to_string()))
}

/// Write one collection, logging instead of failing.
pub(crate) fn persist_collection<T: Serialize>(cache: &dyn LocalCache, kind: ElementKind, items: &[T]) {
    let result = encode_collection(kind, items).and_then(|entry| cache.set(kind.cache_key(), &entry));
    if let Err(e) = result {
        log::warn!("Failed to cache {}: {}", kind.cache_key(), e);
    }
}

/// Read one collection, treating any failure as "nothing cached".
pub(crate) fn restore_collection<T: DeserializeOwned>(cache: &dyn LocalCache, kind: ElementKind) -> Option<Vec<T>> {
    match cache.get(kind.cache_key()) {
        Ok(Some(entry)) => match decode_collection(kind, &entry) {
            Ok(items) => Some(items),
            Err(e) => {
                log::warn!("Ignoring unreadable cache entry {}: {}", kind.cache_key(), e);
                None
            }
        },
        Ok(None) => None,
        Err(e) => {
            log::warn!("Failed to read cache entry {}: {}", kind.cache_key(), e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::{DrawLine, TextElement};
    use kurbo::Point;

    #[test]
    fn test_entry_wraps_collection() {
        let lines = vec![DrawLine::segment(Point::ZERO, Point::new(3.0, 4.0))];
        let entry = encode_collection(ElementKind::Lines, &lines).unwrap();
        let value: Value = serde_json::from_str(&entry).unwrap();
        assert!(value["lines"].is_array());

        let decoded: Vec<DrawLine> = decode_collection(ElementKind::Lines, &entry).unwrap();
        assert_eq!(decoded, lines);
    }

    #[test]
    fn test_texts_key_and_field() {
        let texts = vec![TextElement::new(Point::ZERO, "hello")];
        let entry = encode_collection(ElementKind::Texts, &texts).unwrap();
        assert!(entry.contains("textElements"));
        assert_eq!(ElementKind::Texts.cache_key(), "texts");
    }

    #[test]
    fn test_decode_wrong_wrapper() {
        let result: CacheResult<Vec<DrawLine>> = decode_collection(ElementKind::Lines, r#"{"circles":[]}"#);
        assert!(matches!(result, Err(CacheError::Serialization(_))));
    }
}
