//! Debounced, fire-and-forget publishing of document snapshots.

use serde::{Deserialize, Serialize};
use std::rc::Rc;
use std::time::Duration;

use crate::channel::{Channel, DRAWING_EVENT};
use crate::clock::{Clock, Debouncer};
use crate::elements::ConsolidatedState;
use crate::history::History;

/// Default debounce window.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(100);

/// Payload of a `new-drawing` event.
///
/// Every message is a full replacement of the sender's state, never a delta.
/// Images are always empty on the wire, in `images` and in every history
/// entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawingUpdate {
    #[serde(flatten)]
    pub state: ConsolidatedState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history: Option<Vec<ConsolidatedState>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_step: Option<usize>,
    #[serde(default)]
    pub is_history_update: bool,
}

impl DrawingUpdate {
    /// Build the outbound message for `state` positioned at `history`'s cursor.
    pub fn new(state: &ConsolidatedState, history: &History) -> Self {
        Self {
            state: state.without_images(),
            history: Some(
                history
                    .entries()
                    .iter()
                    .map(ConsolidatedState::without_images)
                    .collect(),
            ),
            current_step: Some(history.current_step()),
            is_history_update: true,
        }
    }

    /// The sender's timeline, if the message carries a usable one.
    pub fn timeline(&self) -> Option<(&[ConsolidatedState], usize)> {
        match (&self.history, self.current_step) {
            (Some(history), Some(step)) => Some((history.as_slice(), step)),
            _ => None,
        }
    }
}

/// Counters for observability and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Sync requests received (before coalescing).
    pub requested: u64,
    /// Messages handed to the channel successfully.
    pub published: u64,
    /// Messages the channel refused.
    pub failed: u64,
}

/// Coalesces bursts of local edits into one publish per debounce window.
///
/// Only the most recent request inside a window is sent. Without an attached
/// room the dispatcher ignores requests entirely.
pub struct SyncDispatcher {
    topic: Option<String>,
    channel: Option<Box<dyn Channel>>,
    debouncer: Debouncer<DrawingUpdate>,
    clock: Rc<dyn Clock>,
    stats: DispatchStats,
}

impl SyncDispatcher {
    pub fn new(delay: Duration, clock: Rc<dyn Clock>) -> Self {
        Self {
            topic: None,
            channel: None,
            debouncer: Debouncer::new(delay),
            clock,
            stats: DispatchStats::default(),
        }
    }

    /// Start publishing to `topic` over `channel`.
    pub fn attach(&mut self, topic: impl Into<String>, channel: Box<dyn Channel>) {
        self.topic = Some(topic.into());
        self.channel = Some(channel);
    }

    /// Stop publishing. A pending message is discarded.
    pub fn detach(&mut self) {
        if self.debouncer.cancel().is_some() {
            log::debug!("Dropping pending sync on detach");
        }
        self.topic = None;
        self.channel = None;
    }

    pub fn topic(&self) -> Option<&str> {
        self.topic.as_deref()
    }

    pub fn is_attached(&self) -> bool {
        self.topic.is_some() && self.channel.is_some()
    }

    pub fn is_pending(&self) -> bool {
        self.debouncer.is_pending()
    }

    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    /// Queue `update` as the latest state, replacing any queued one.
    pub fn request(&mut self, update: DrawingUpdate) {
        if !self.is_attached() {
            return;
        }
        self.stats.requested += 1;
        self.debouncer.schedule(update, self.clock.now());
    }

    /// Publish the queued update if its window has closed.
    /// Returns true if a message was handed to the channel.
    pub fn flush_due(&mut self) -> bool {
        match self.debouncer.take_due(self.clock.now()) {
            Some(update) => self.publish(update),
            None => false,
        }
    }

    /// Publish the queued update immediately, ignoring the window.
    pub fn flush_now(&mut self) -> bool {
        match self.debouncer.cancel() {
            Some(update) => self.publish(update),
            None => false,
        }
    }

    fn publish(&mut self, update: DrawingUpdate) -> bool {
        let (Some(topic), Some(channel)) = (self.topic.as_deref(), self.channel.as_mut()) else {
            return false;
        };

        let payload = match serde_json::to_value(&update) {
            Ok(payload) => payload,
            Err(e) => {
                log::error!("Failed to encode drawing update: {}", e);
                self.stats.failed += 1;
                return false;
            }
        };

        match channel.publish(topic, DRAWING_EVENT, payload) {
            Ok(()) => {
                log::debug!(
                    "Published drawing to {} (step {:?})",
                    topic,
                    update.current_step
                );
                self.stats.published += 1;
                true
            }
            Err(e) => {
                log::error!("Failed to publish drawing to {}: {}", topic, e);
                self.stats.failed += 1;
                false
            }
        }
    }
}
