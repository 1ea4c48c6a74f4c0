//! JSON frames exchanged with the relay server.
//!
//! ```json
//! { "type": "subscribe", "topic": "a1b2c3d4" }
//! { "type": "publish", "topic": "a1b2c3d4", "event": "new-drawing", "payload": { ... } }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Frames sent to the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    /// Start receiving a topic.
    Subscribe { topic: String },
    /// Stop receiving a topic.
    Unsubscribe { topic: String },
    /// Broadcast a payload to the other subscribers of a topic.
    Publish {
        topic: String,
        event: String,
        payload: Value,
    },
}

/// Frames received from the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    /// Subscription confirmed.
    Subscribed { topic: String, peer_count: usize },
    /// A payload published by another peer.
    Event {
        topic: String,
        event: String,
        from: String,
        payload: Value,
    },
    /// Error message
    Error { message: String },
}
