//! In-process pub/sub bus.
//!
//! Every [`MemoryChannel`] created from the same [`MemoryBus`] sees the
//! others' publishes on topics it subscribed to. Used for local multi-view
//! setups and for tests that need several clients without a network.

use super::{Channel, ChannelError, ChannelMessage};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;

/// How many accepted messages [`MemoryBus::published`] keeps.
pub const PUBLISHED_LOG_LIMIT: usize = 256;

#[derive(Default)]
struct Endpoint {
    topics: HashSet<String>,
    inbox: VecDeque<ChannelMessage>,
}

#[derive(Default)]
struct BusState {
    next_id: usize,
    endpoints: HashMap<usize, Endpoint>,
    offline: bool,
    published: VecDeque<ChannelMessage>,
    published_total: usize,
}

/// Shared in-memory bus. Clones refer to the same bus.
#[derive(Clone, Default)]
pub struct MemoryBus {
    state: Rc<RefCell<BusState>>,
}

impl MemoryBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new endpoint attached to this bus.
    pub fn endpoint(&self) -> MemoryChannel {
        let mut state = self.state.borrow_mut();
        let id = state.next_id;
        state.next_id += 1;
        state.endpoints.insert(id, Endpoint::default());
        MemoryChannel {
            id,
            state: Rc::clone(&self.state),
        }
    }

    /// While offline every publish fails with [`ChannelError::Closed`].
    pub fn set_offline(&self, offline: bool) {
        self.state.borrow_mut().offline = offline;
    }

    /// The most recent accepted messages, oldest first. At most
    /// [`PUBLISHED_LOG_LIMIT`] are kept.
    pub fn published(&self) -> Vec<ChannelMessage> {
        self.state.borrow().published.iter().cloned().collect()
    }

    /// Messages accepted since the bus was created, including ones no
    /// longer kept in the log.
    pub fn published_count(&self) -> usize {
        self.state.borrow().published_total
    }
}

/// One endpoint of a [`MemoryBus`].
pub struct MemoryChannel {
    id: usize,
    state: Rc<RefCell<BusState>>,
}

impl Channel for MemoryChannel {
    fn subscribe(&mut self, topic: &str) -> Result<(), ChannelError> {
        let mut state = self.state.borrow_mut();
        let endpoint = state.endpoints.get_mut(&self.id).ok_or(ChannelError::Closed)?;
        endpoint.topics.insert(topic.to_string());
        Ok(())
    }

    fn unsubscribe(&mut self, topic: &str) -> Result<(), ChannelError> {
        let mut state = self.state.borrow_mut();
        if let Some(endpoint) = state.endpoints.get_mut(&self.id) {
            endpoint.topics.remove(topic);
        }
        Ok(())
    }

    fn publish(&mut self, topic: &str, event: &str, payload: Value) -> Result<(), ChannelError> {
        let mut state = self.state.borrow_mut();
        if state.offline {
            return Err(ChannelError::Closed);
        }

        let message = ChannelMessage {
            topic: topic.to_string(),
            event: event.to_string(),
            payload,
        };
        for (id, endpoint) in state.endpoints.iter_mut() {
            if *id != self.id && endpoint.topics.contains(topic) {
                endpoint.inbox.push_back(message.clone());
            }
        }
        if state.published.len() == PUBLISHED_LOG_LIMIT {
            state.published.pop_front();
        }
        state.published.push_back(message);
        state.published_total += 1;
        Ok(())
    }

    fn poll(&mut self) -> Vec<ChannelMessage> {
        let mut state = self.state.borrow_mut();
        match state.endpoints.get_mut(&self.id) {
            Some(endpoint) => endpoint.inbox.drain(..).collect(),
            None => Vec::new(),
        }
    }
}

impl Drop for MemoryChannel {
    fn drop(&mut self) {
        self.state.borrow_mut().endpoints.remove(&self.id);
    }
}
