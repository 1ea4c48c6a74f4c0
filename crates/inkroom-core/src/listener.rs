//! Applies drawing snapshots received from the room.

use crate::channel::{Channel, ChannelError, ChannelMessage, DRAWING_EVENT};
use crate::dispatcher::DrawingUpdate;
use crate::elements::ElementError;
use crate::store::{DocumentStore, Origin};

/// Counters for observability and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListenerStats {
    /// Snapshots applied to the store.
    pub applied: u64,
    /// Messages for another topic or event, or received while unsubscribed.
    pub ignored: u64,
    /// Drawing events whose payload could not be decoded or failed validation.
    pub malformed: u64,
}

/// Subscribes to one room topic and applies inbound snapshots to a store.
///
/// Each `new-drawing` message is a total replacement of the sender's state.
/// Nothing is acknowledged, ordered or deduplicated: the last message
/// applied wins.
pub struct RemoteListener {
    topic: String,
    subscribed: bool,
    stats: ListenerStats,
}

impl RemoteListener {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            subscribed: false,
            stats: ListenerStats::default(),
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscribed
    }

    pub fn stats(&self) -> ListenerStats {
        self.stats
    }

    /// Subscribe `channel` to this listener's topic.
    pub fn subscribe(&mut self, channel: &mut dyn Channel) -> Result<(), ChannelError> {
        channel.subscribe(&self.topic)?;
        log::debug!("Listening on room {}", self.topic);
        self.subscribed = true;
        Ok(())
    }

    /// Stop applying deliveries. Unsubscribe failures are logged.
    pub fn teardown(&mut self, channel: &mut dyn Channel) {
        if !self.subscribed {
            return;
        }
        if let Err(e) = channel.unsubscribe(&self.topic) {
            log::error!("Failed to unsubscribe from {}: {}", self.topic, e);
        }
        self.subscribed = false;
    }

    /// Handle one inbound message. Returns true if it was applied.
    pub fn handle(&mut self, store: &mut DocumentStore, message: ChannelMessage) -> bool {
        if !self.subscribed || message.topic != self.topic || message.event != DRAWING_EVENT {
            self.stats.ignored += 1;
            return false;
        }

        let update = match serde_json::from_value::<DrawingUpdate>(message.payload) {
            Ok(update) => update,
            Err(e) => {
                log::warn!("Ignoring malformed drawing from {}: {}", self.topic, e);
                self.stats.malformed += 1;
                return false;
            }
        };

        match apply_remote_snapshot(store, update) {
            Ok(()) => {
                self.stats.applied += 1;
                true
            }
            Err(e) => {
                log::warn!("Rejecting invalid drawing from {}: {}", self.topic, e);
                self.stats.malformed += 1;
                false
            }
        }
    }

    /// Drain `channel` and apply everything addressed to this listener.
    /// Returns the number of snapshots applied.
    pub fn drain(&mut self, store: &mut DocumentStore, channel: &mut dyn Channel) -> usize {
        channel
            .poll()
            .into_iter()
            .map(|message| self.handle(store, message))
            .filter(|applied| *applied)
            .count()
    }
}

/// Replace the store's synced collections with a peer's snapshot.
///
/// Runs with the remote-update guard raised, so nothing is published back.
/// Local images are kept whatever the snapshot carries. When the snapshot
/// includes a timeline, the store adopts it so local undo and redo follow the
/// sender's history.
///
/// The snapshot and every timeline entry are validated before anything is
/// touched; an invalid snapshot leaves the store unchanged. Negative
/// rectangle and circle extents are normalized on the way in.
pub fn apply_remote_snapshot(
    store: &mut DocumentStore,
    update: DrawingUpdate,
) -> Result<(), ElementError> {
    let DrawingUpdate {
        mut state,
        mut history,
        current_step,
        is_history_update,
    } = update;

    state.validate()?;
    for entry in history.iter().flatten() {
        entry.validate()?;
    }
    state.normalize();
    for entry in history.iter_mut().flatten() {
        entry.normalize();
    }

    let guard = store.guard().clone();
    let _scope = guard.enter();

    if !state.images.is_empty() {
        log::debug!("Discarding {} images from remote snapshot", state.images.len());
    }

    store.set_lines(state.lines, Origin::Remote);
    store.set_text_elements(state.text_elements, Origin::Remote);
    store.set_rectangles(state.rectangles, Origin::Remote);
    store.set_circles(state.circles, Origin::Remote);

    if let (Some(history), Some(step)) = (history, current_step) {
        store.adopt_history(history, step);
    } else if is_history_update {
        log::warn!("Remote snapshot flagged as history update but carries no timeline");
    }

    log::debug!("Applied remote snapshot at step {}", store.current_step());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{MemoryBus, MemoryChannel};
    use crate::elements::{ConsolidatedState, DrawLine, Image, Rectangle};
    use crate::history::History;
    use crate::store::HistoryUpdate;
    use kurbo::Point;
    use serde_json::json;

    fn attached_store(bus: &MemoryBus) -> DocumentStore {
        let mut store = DocumentStore::in_memory();
        store.dispatcher_mut().attach("room", Box::new(bus.endpoint()));
        store
    }

    fn subscribed(topic: &str, channel: &mut MemoryChannel) -> RemoteListener {
        let mut listener = RemoteListener::new(topic);
        listener.subscribe(channel).unwrap();
        listener
    }

    fn snapshot_with_line() -> DrawingUpdate {
        let mut state = ConsolidatedState::new();
        state.lines.push(DrawLine::segment(Point::ZERO, Point::new(4.0, 4.0)));
        let mut history = History::new();
        history.push(state.clone());
        DrawingUpdate::new(&state, &history)
    }

    fn message(topic: &str, event: &str, update: &DrawingUpdate) -> ChannelMessage {
        ChannelMessage {
            topic: topic.to_string(),
            event: event.to_string(),
            payload: serde_json::to_value(update).unwrap(),
        }
    }

    #[test]
    fn test_apply_does_not_publish() {
        let bus = MemoryBus::new();
        let mut store = attached_store(&bus);

        apply_remote_snapshot(&mut store, snapshot_with_line()).unwrap();

        assert_eq!(store.lines().len(), 1);
        assert_eq!(store.dispatcher().stats().requested, 0);
        assert!(!store.dispatcher().is_pending());
        assert!(!store.is_remote_update());
    }

    #[test]
    fn test_apply_keeps_local_images() {
        let mut store = DocumentStore::in_memory();
        let image = Image::from_bytes(Point::ZERO, 8.0, 8.0, "image/png", &[1, 2, 3]);
        store.set_images(vec![image.clone()]);

        apply_remote_snapshot(&mut store, snapshot_with_line()).unwrap();
        assert_eq!(store.images(), &[image.clone()]);

        store.undo();
        assert_eq!(store.images(), &[image]);
    }

    #[test]
    fn test_apply_adopts_timeline() {
        let mut store = DocumentStore::in_memory();
        apply_remote_snapshot(&mut store, snapshot_with_line()).unwrap();
        assert_eq!(store.current_step(), 1);
        assert!(store.undo());
        assert!(store.lines().is_empty());
    }

    #[test]
    fn test_apply_without_timeline_keeps_history() {
        let mut store = DocumentStore::in_memory();
        store.add_to_history(HistoryUpdate::Rectangles(vec![Rectangle::new(Point::ZERO, 1.0, 1.0)]));
        let mut update = snapshot_with_line();
        update.history = None;
        update.current_step = None;

        apply_remote_snapshot(&mut store, update).unwrap();
        assert_eq!(store.lines().len(), 1);
        assert_eq!(store.history().len(), 2);
        assert_eq!(store.rectangles().len(), 0);
    }

    #[test]
    fn test_apply_restores_outer_guard() {
        let mut store = DocumentStore::in_memory();
        store.set_is_remote_update(true);
        apply_remote_snapshot(&mut store, snapshot_with_line()).unwrap();
        assert!(store.is_remote_update());
    }

    #[test]
    fn test_handle_filters_topic_and_event() {
        let bus = MemoryBus::new();
        let mut channel = bus.endpoint();
        let mut listener = subscribed("room", &mut channel);
        let mut store = DocumentStore::in_memory();
        let update = snapshot_with_line();

        assert!(!listener.handle(&mut store, message("other", DRAWING_EVENT, &update)));
        assert!(!listener.handle(&mut store, message("room", "cursor", &update)));
        assert!(store.lines().is_empty());

        assert!(listener.handle(&mut store, message("room", DRAWING_EVENT, &update)));
        assert_eq!(store.lines().len(), 1);
        assert_eq!(listener.stats().applied, 1);
        assert_eq!(listener.stats().ignored, 2);
    }

    #[test]
    fn test_handle_malformed_payload() {
        let mut store = DocumentStore::in_memory();
        let bus = MemoryBus::new();
        let mut channel = bus.endpoint();
        let mut listener = subscribed("room", &mut channel);
        let bad = ChannelMessage {
            topic: "room".to_string(),
            event: DRAWING_EVENT.to_string(),
            payload: json!({ "lines": "nope" }),
        };
        assert!(!listener.handle(&mut store, bad));
        assert_eq!(listener.stats().malformed, 1);
        assert!(store.state().is_empty());
    }

    #[test]
    fn test_rejects_odd_coordinate_line() {
        let bus = MemoryBus::new();
        let mut channel = bus.endpoint();
        let mut listener = subscribed("room", &mut channel);
        let mut store = attached_store(&bus);
        let mut update = snapshot_with_line();
        update.state.lines[0].points.pop();

        assert!(!listener.handle(&mut store, message("room", DRAWING_EVENT, &update)));
        assert_eq!(listener.stats().malformed, 1);
        assert_eq!(listener.stats().applied, 0);
        assert!(store.state().is_empty());
        assert_eq!(store.history().len(), 1);
        assert_eq!(store.dispatcher().stats().requested, 0);
    }

    #[test]
    fn test_rejects_invalid_timeline_entry() {
        let mut store = DocumentStore::in_memory();
        let mut update = snapshot_with_line();
        if let Some(entries) = update.history.as_mut() {
            entries[1].lines[0].points.clear();
        }

        assert_eq!(
            apply_remote_snapshot(&mut store, update),
            Err(ElementError::MalformedLine { index: 0, len: 0 })
        );
        assert!(store.lines().is_empty());
        assert_eq!(store.history().len(), 1);
    }

    #[test]
    fn test_normalizes_negative_extents() {
        let mut store = DocumentStore::in_memory();
        let mut state = ConsolidatedState::new();
        state.rectangles.push(Rectangle::new(Point::new(10.0, 10.0), -5.0, -4.0));
        let mut history = History::new();
        history.push(state.clone());
        let update = DrawingUpdate::new(&state, &history);

        apply_remote_snapshot(&mut store, update).unwrap();

        let expected = Rectangle::new(Point::new(5.0, 6.0), 5.0, 4.0);
        assert_eq!(store.rectangles(), &[expected.clone()]);
        assert_eq!(store.history().entries()[1].rectangles, vec![expected]);
    }

    #[test]
    fn test_teardown_stops_applying() {
        let bus = MemoryBus::new();
        let mut sender = bus.endpoint();
        let mut channel = bus.endpoint();
        let mut listener = subscribed("room", &mut channel);
        let mut store = DocumentStore::in_memory();

        listener.teardown(&mut channel);
        assert!(!listener.is_subscribed());

        let payload = serde_json::to_value(snapshot_with_line()).unwrap();
        sender.publish("room", DRAWING_EVENT, payload).unwrap();
        assert_eq!(listener.drain(&mut store, &mut channel), 0);
        assert!(store.lines().is_empty());
    }

    #[test]
    fn test_drain_applies_in_order() {
        let bus = MemoryBus::new();
        let mut sender = bus.endpoint();
        let mut channel = bus.endpoint();
        let mut listener = subscribed("room", &mut channel);
        let mut store = DocumentStore::in_memory();

        let first = snapshot_with_line();
        let mut second = first.clone();
        second.state.lines.clear();
        sender
            .publish("room", DRAWING_EVENT, serde_json::to_value(&first).unwrap())
            .unwrap();
        sender
            .publish("room", DRAWING_EVENT, serde_json::to_value(&second).unwrap())
            .unwrap();

        assert_eq!(listener.drain(&mut store, &mut channel), 2);
        assert!(store.lines().is_empty());
    }
}
