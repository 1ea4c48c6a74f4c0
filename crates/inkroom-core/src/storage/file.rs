//! File-backed cache for native platforms.

use super::{CacheError, CacheResult, LocalCache};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Stores each cache entry as `<key>.json` in a directory.
pub struct FileCache {
    base_path: PathBuf,
}

impl FileCache {
    /// Create a file cache rooted at `base_path`, creating the directory if needed.
    pub fn new(base_path: PathBuf) -> CacheResult<Self> {
        if !base_path.exists() {
            fs::create_dir_all(&base_path).map_err(|e| {
                CacheError::Io(format!("Failed to create cache directory: {}", e))
            })?;
        }
        Ok(Self { base_path })
    }

    /// Create a file cache in the default location.
    ///
    /// On Unix: `~/.local/share/inkroom/cache/`
    /// On Windows: `%LOCALAPPDATA%\inkroom\cache\`
    pub fn default_location() -> CacheResult<Self> {
        let base = dirs::data_local_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| CacheError::Io("Could not determine home directory".to_string()))?;
        Self::new(base.join("inkroom").join("cache"))
    }

    /// File path for a key, with unsafe characters replaced.
    fn entry_path(&self, key: &str) -> PathBuf {
        let safe_key: String = key
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.base_path.join(format!("{}.json", safe_key))
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }
}

impl LocalCache for FileCache {
    fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let path = self.entry_path(key);
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CacheError::Io(format!("Failed to read {}: {}", path.display(), e))),
        }
    }

    fn set(&self, key: &str, value: &str) -> CacheResult<()> {
        let path = self.entry_path(key);
        fs::write(&path, value)
            .map_err(|e| CacheError::Io(format!("Failed to write {}: {}", path.display(), e)))
    }

    fn remove(&self, key: &str) -> CacheResult<()> {
        let path = self.entry_path(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CacheError::Io(format!("Failed to delete {}: {}", path.display(), e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_file_cache_set_get() {
        let dir = tempdir().unwrap();
        let cache = FileCache::new(dir.path().to_path_buf()).unwrap();

        cache.set("lines", r#"{"lines":[]}"#).unwrap();
        assert_eq!(cache.get("lines").unwrap().as_deref(), Some(r#"{"lines":[]}"#));
        assert!(dir.path().join("lines.json").exists());
    }

    #[test]
    fn test_file_cache_missing() {
        let dir = tempdir().unwrap();
        let cache = FileCache::new(dir.path().to_path_buf()).unwrap();
        assert_eq!(cache.get("nonexistent").unwrap(), None);
        cache.remove("nonexistent").unwrap();
    }

    #[test]
    fn test_file_cache_creates_directory() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let cache = FileCache::new(nested.clone()).unwrap();
        assert_eq!(cache.base_path(), nested.as_path());
        assert!(nested.is_dir());
    }

    #[test]
    fn test_file_cache_sanitizes_key() {
        let dir = tempdir().unwrap();
        let cache = FileCache::new(dir.path().to_path_buf()).unwrap();

        cache.set("../escape:me", "x").unwrap();
        assert_eq!(cache.get("../escape:me").unwrap().as_deref(), Some("x"));
        assert!(dir.path().join("___escape_me.json").exists());
    }
}
