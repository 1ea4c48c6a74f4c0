//! Collaboration management for real-time multi-user drawing.
//!
//! Ties a [`RoomSession`] to a channel: the store's dispatcher publishes over
//! it and a [`RemoteListener`] applies what arrives.

use std::cell::RefCell;
use std::rc::Rc;

use crate::channel::{Channel, ChannelError};
use crate::listener::{ListenerStats, RemoteListener};
use crate::room::RoomSession;
use crate::store::DocumentStore;

#[cfg(not(target_arch = "wasm32"))]
use crate::channel::WsChannel;
#[cfg(not(target_arch = "wasm32"))]
use crate::config::SyncConfig;

/// Context object owning one client's participation in a room.
pub struct CollaborationManager<C: Channel + 'static> {
    /// The room being synced.
    room: RoomSession,
    /// Endpoint shared between the dispatcher and the listener.
    channel: Rc<RefCell<C>>,
    /// Applies inbound snapshots.
    listener: RemoteListener,
    /// Whether `start` has run without a matching `stop`.
    active: bool,
}

impl<C: Channel + 'static> CollaborationManager<C> {
    /// Create a manager for `room` over `channel`. Nothing is sent until
    /// [`CollaborationManager::start`].
    pub fn new(room: RoomSession, channel: C) -> Self {
        let listener = RemoteListener::new(room.topic());
        Self {
            room,
            channel: Rc::new(RefCell::new(channel)),
            listener,
            active: false,
        }
    }

    pub fn room(&self) -> &RoomSession {
        &self.room
    }

    pub fn room_mut(&mut self) -> &mut RoomSession {
        &mut self.room
    }

    /// The shared channel endpoint.
    pub fn channel(&self) -> &Rc<RefCell<C>> {
        &self.channel
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn listener_stats(&self) -> ListenerStats {
        self.listener.stats()
    }

    /// Subscribe to the room and route the store's publishes to it.
    pub fn start(&mut self, store: &mut DocumentStore) -> Result<(), ChannelError> {
        if self.active {
            return Ok(());
        }

        self.listener.subscribe(&mut *self.channel.borrow_mut())?;
        store
            .dispatcher_mut()
            .attach(self.room.topic(), Box::new(Rc::clone(&self.channel)));
        self.active = true;
        log::info!("Joined room {}", self.room.room_id());
        Ok(())
    }

    /// Run one turn of the sync loop: publish a due snapshot, then apply
    /// everything received. Returns the number of remote snapshots applied.
    pub fn pump(&mut self, store: &mut DocumentStore) -> usize {
        if !self.active {
            return 0;
        }

        store.flush_sync();

        let messages = self.channel.borrow_mut().poll();
        messages
            .into_iter()
            .map(|message| self.listener.handle(store, message))
            .filter(|applied| *applied)
            .count()
    }

    /// Leave the room. A snapshot still waiting in the debounce window is
    /// sent first.
    pub fn stop(&mut self, store: &mut DocumentStore) {
        if !self.active {
            return;
        }

        store.dispatcher_mut().flush_now();
        store.dispatcher_mut().detach();
        self.listener.teardown(&mut *self.channel.borrow_mut());
        self.active = false;
        log::info!("Left room {}", self.room.room_id());
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl CollaborationManager<WsChannel> {
    /// Connect to the relay named in `config` for `room`.
    pub fn connect(config: &SyncConfig, room: RoomSession) -> Result<Self, ChannelError> {
        let url = config
            .relay_url
            .as_deref()
            .ok_or_else(|| ChannelError::InvalidUrl("no relay URL configured".to_string()))?;
        let mut channel = WsChannel::new();
        channel.connect(url)?;
        Ok(Self::new(room, channel))
    }
}
