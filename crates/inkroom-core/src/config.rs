//! Runtime configuration for sync and room links.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default origin used when building share links.
pub const DEFAULT_ORIGIN: &str = "http://localhost:3000";

/// Default debounce window in milliseconds.
pub const DEFAULT_DEBOUNCE_MS: u64 = 100;

/// Sync settings.
///
/// Fields missing from a deserialized config take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Debounce window for outbound publishes.
    pub debounce_ms: u64,
    /// Origin that share links are built on.
    pub origin: String,
    /// Relay WebSocket URL, if collaborating over the network.
    pub relay_url: Option<String>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            origin: DEFAULT_ORIGIN.to_string(),
            relay_url: None,
        }
    }
}

impl SyncConfig {
    /// Defaults overlaid with `INKROOM_DEBOUNCE_MS`, `INKROOM_ORIGIN` and
    /// `INKROOM_RELAY_URL` from the environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`SyncConfig::from_env`] with an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(raw) = lookup("INKROOM_DEBOUNCE_MS") {
            match raw.trim().parse() {
                Ok(ms) => config.debounce_ms = ms,
                Err(e) => log::warn!("Ignoring INKROOM_DEBOUNCE_MS={:?}: {}", raw, e),
            }
        }
        if let Some(origin) = lookup("INKROOM_ORIGIN").filter(|o| !o.is_empty()) {
            config.origin = origin;
        }
        if let Some(url) = lookup("INKROOM_RELAY_URL").filter(|u| !u.is_empty()) {
            config.relay_url = Some(url);
        }
        config
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}
