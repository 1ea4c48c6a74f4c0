//! Pub/sub channel abstraction used for room sync.
//!
//! A [`Channel`] delivers JSON payloads tagged with a topic and an event name.
//! Delivery is at-least-once at best: messages may be dropped, duplicated or
//! reordered, and nothing here compensates for that.

mod memory;
mod protocol;
#[cfg(not(target_arch = "wasm32"))]
mod ws;

pub use memory::{MemoryBus, MemoryChannel};
pub use protocol::{ClientFrame, ServerFrame};
#[cfg(not(target_arch = "wasm32"))]
pub use ws::WsChannel;

use serde_json::Value;
use std::cell::RefCell;
use std::rc::Rc;
use thiserror::Error;

/// Event name carrying full drawing snapshots.
pub const DRAWING_EVENT: &str = "new-drawing";

/// A message received on a subscribed topic.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelMessage {
    pub topic: String,
    pub event: String,
    pub payload: Value,
}

/// Transport errors.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("not connected")]
    NotConnected,
    #[error("channel closed")]
    Closed,
    #[error("send failed: {0}")]
    Send(String),
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Connection state of a network-backed channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

/// A pub/sub endpoint.
///
/// Inbound messages are collected by the implementation and drained with
/// [`Channel::poll`], so handlers run on the caller's event loop.
pub trait Channel {
    /// Start receiving messages published to `topic`.
    fn subscribe(&mut self, topic: &str) -> Result<(), ChannelError>;

    /// Stop receiving messages for `topic`.
    fn unsubscribe(&mut self, topic: &str) -> Result<(), ChannelError>;

    /// Publish a payload. Peers subscribed to `topic` receive it; the sender does not.
    fn publish(&mut self, topic: &str, event: &str, payload: Value) -> Result<(), ChannelError>;

    /// Drain messages received since the last poll (non-blocking).
    fn poll(&mut self) -> Vec<ChannelMessage>;
}

/// Shared endpoint, so the dispatcher and the listener can use one connection.
impl<C: Channel + ?Sized> Channel for Rc<RefCell<C>> {
    fn subscribe(&mut self, topic: &str) -> Result<(), ChannelError> {
        self.borrow_mut().subscribe(topic)
    }

    fn unsubscribe(&mut self, topic: &str) -> Result<(), ChannelError> {
        self.borrow_mut().unsubscribe(topic)
    }

    fn publish(&mut self, topic: &str, event: &str, payload: Value) -> Result<(), ChannelError> {
        self.borrow_mut().publish(topic, event, payload)
    }

    fn poll(&mut self) -> Vec<ChannelMessage> {
        self.borrow_mut().poll()
    }
}
