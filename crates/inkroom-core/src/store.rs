//! The document store: live element collections plus undo history.
//!
//! Every mutation of the drawing goes through [`DocumentStore`]. Local
//! mutations are mirrored to the local cache and, unless the remote-update
//! guard is raised, queued for publishing to the room.

use serde_json::Value;
use std::rc::Rc;

use crate::clock::{Clock, SystemClock};
use crate::compat::{ClassifyError, classify_collection};
use crate::config::SyncConfig;
use crate::dispatcher::{DrawingUpdate, SyncDispatcher};
use crate::elements::{
    Circle, ConsolidatedState, DrawLine, ElementKind, Image, Rectangle, TextElement,
};
use crate::file_format::{DrawingFile, ImportError};
use crate::guard::RemoteGuard;
use crate::history::History;
use crate::storage::{LocalCache, MemoryCache, persist_collection, restore_collection};

/// Where a mutation came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// A change made on this client; published to the room.
    Local,
    /// State received from a peer; never re-published.
    Remote,
}

/// A new history entry, tagged with the collection it replaces.
#[derive(Debug, Clone, PartialEq)]
pub enum HistoryUpdate {
    Lines(Vec<DrawLine>),
    Texts(Vec<TextElement>),
    Rectangles(Vec<Rectangle>),
    Circles(Vec<Circle>),
    Images(Vec<Image>),
    /// A full snapshot, used verbatim (file import).
    Consolidated(ConsolidatedState),
}

impl HistoryUpdate {
    /// The collection replaced, or None for a full snapshot.
    pub fn kind(&self) -> Option<ElementKind> {
        match self {
            HistoryUpdate::Lines(_) => Some(ElementKind::Lines),
            HistoryUpdate::Texts(_) => Some(ElementKind::Texts),
            HistoryUpdate::Rectangles(_) => Some(ElementKind::Rectangles),
            HistoryUpdate::Circles(_) => Some(ElementKind::Circles),
            HistoryUpdate::Images(_) => Some(ElementKind::Images),
            HistoryUpdate::Consolidated(_) => None,
        }
    }

    /// Apply this update on top of `base`, producing the next snapshot.
    fn apply_to(self, base: &ConsolidatedState) -> ConsolidatedState {
        let mut next = base.clone();
        match self {
            HistoryUpdate::Lines(lines) => next.lines = lines,
            HistoryUpdate::Texts(texts) => next.text_elements = texts,
            HistoryUpdate::Rectangles(rects) => next.rectangles = rects,
            HistoryUpdate::Circles(circles) => next.circles = circles,
            HistoryUpdate::Images(images) => next.images = images,
            HistoryUpdate::Consolidated(state) => next = state,
        }
        next
    }
}

/// Single source of truth for the drawing on this client.
///
/// Constructed once per session and passed to whatever needs it.
pub struct DocumentStore {
    state: ConsolidatedState,
    history: History,
    guard: RemoteGuard,
    cache: Box<dyn LocalCache>,
    dispatcher: SyncDispatcher,
}

impl DocumentStore {
    /// Create an empty store.
    pub fn new(cache: Box<dyn LocalCache>, dispatcher: SyncDispatcher) -> Self {
        Self {
            state: ConsolidatedState::new(),
            history: History::new(),
            guard: RemoteGuard::new(),
            cache,
            dispatcher,
        }
    }

    /// Create an empty store using the configured debounce window.
    pub fn with_config(config: &SyncConfig, cache: Box<dyn LocalCache>, clock: Rc<dyn Clock>) -> Self {
        Self::new(cache, SyncDispatcher::new(config.debounce(), clock))
    }

    /// Store with an in-memory cache and the system clock.
    pub fn in_memory() -> Self {
        Self::with_config(
            &SyncConfig::default(),
            Box::new(MemoryCache::new()),
            Rc::new(SystemClock::new()),
        )
    }

    // --- Reads ---

    /// Current state of all collections.
    pub fn state(&self) -> &ConsolidatedState {
        &self.state
    }

    pub fn lines(&self) -> &[DrawLine] {
        &self.state.lines
    }

    pub fn text_elements(&self) -> &[TextElement] {
        &self.state.text_elements
    }

    pub fn rectangles(&self) -> &[Rectangle] {
        &self.state.rectangles
    }

    pub fn circles(&self) -> &[Circle] {
        &self.state.circles
    }

    pub fn images(&self) -> &[Image] {
        &self.state.images
    }

    /// Look up a text element by id.
    pub fn text_element(&self, id: &str) -> Option<&TextElement> {
        self.state.text_element(id)
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn current_step(&self) -> usize {
        self.history.current_step()
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    // --- Guard ---

    /// The remote-update guard shared with the room listener.
    pub fn guard(&self) -> &RemoteGuard {
        &self.guard
    }

    pub fn set_is_remote_update(&self, active: bool) {
        self.guard.set(active);
    }

    pub fn is_remote_update(&self) -> bool {
        self.guard.is_active()
    }

    // --- Sync plumbing ---

    pub fn dispatcher(&self) -> &SyncDispatcher {
        &self.dispatcher
    }

    pub fn dispatcher_mut(&mut self) -> &mut SyncDispatcher {
        &mut self.dispatcher
    }

    /// Publish a queued snapshot whose debounce window has closed.
    /// Call this from the host's event loop.
    pub fn flush_sync(&mut self) -> bool {
        self.dispatcher.flush_due()
    }

    // --- Collection setters ---

    pub fn set_lines(&mut self, lines: Vec<DrawLine>, origin: Origin) {
        self.state.lines = lines;
        self.after_set(ElementKind::Lines, origin);
    }

    pub fn set_text_elements(&mut self, texts: Vec<TextElement>, origin: Origin) {
        self.state.text_elements = texts;
        self.after_set(ElementKind::Texts, origin);
    }

    pub fn set_rectangles(&mut self, rectangles: Vec<Rectangle>, origin: Origin) {
        self.state.rectangles = rectangles;
        self.after_set(ElementKind::Rectangles, origin);
    }

    pub fn set_circles(&mut self, circles: Vec<Circle>, origin: Origin) {
        self.state.circles = circles;
        self.after_set(ElementKind::Circles, origin);
    }

    /// Replace the images. Images never trigger a publish.
    pub fn set_images(&mut self, images: Vec<Image>) {
        self.state.images = images;
        self.persist(ElementKind::Images);
    }

    // --- History ---

    /// Record a new undo step.
    ///
    /// A single-collection update is layered over the current state; a
    /// consolidated snapshot replaces it outright. Any redo entries are
    /// discarded, rectangle and circle extents are normalized, and the live
    /// collections are updated to match.
    pub fn add_to_history(&mut self, update: HistoryUpdate) {
        let changed = update.kind();
        let mut next = update.apply_to(&self.state);
        next.normalize();

        self.history.push(next.clone());
        self.state = next;

        match changed {
            Some(kind) => self.persist(kind),
            None => self.persist_all(),
        }
        self.request_sync(Origin::Local);
    }

    /// Record a new undo step from an untagged collection.
    ///
    /// Compatibility path for callers that cannot say which collection they
    /// hold; see [`crate::compat`] for the inference rules.
    pub fn add_untyped_to_history(&mut self, collection: Value) -> Result<(), ClassifyError> {
        let update = classify_collection(collection)?;
        self.add_to_history(update);
        Ok(())
    }

    /// Step back one entry. Returns false when already at the start.
    pub fn undo(&mut self) -> bool {
        let Some(snapshot) = self.history.undo() else {
            return false;
        };
        self.state = snapshot.clone();
        self.after_navigation();
        true
    }

    /// Step forward one entry. Returns false when already at the end.
    pub fn redo(&mut self) -> bool {
        let Some(snapshot) = self.history.redo() else {
            return false;
        };
        self.state = snapshot.clone();
        self.after_navigation();
        true
    }

    /// Reset everything to the empty document.
    pub fn clear(&mut self, origin: Origin) {
        self.state = ConsolidatedState::new();
        self.history.reset();
        for kind in ElementKind::ALL {
            if let Err(e) = self.cache.remove(kind.cache_key()) {
                log::warn!("Failed to clear cached {}: {}", kind.cache_key(), e);
            }
        }
        self.request_sync(origin);
    }

    /// Take over a peer's timeline.
    ///
    /// Wire snapshots carry no images, so every adopted entry keeps this
    /// client's current images. Returns false, leaving local history alone,
    /// when the cursor is out of range. Never publishes.
    pub fn adopt_history(&mut self, entries: Vec<ConsolidatedState>, current_step: usize) -> bool {
        let entries = entries
            .into_iter()
            .map(|mut entry| {
                entry.images = self.state.images.clone();
                entry
            })
            .collect();
        match History::from_parts(entries, current_step) {
            Some(history) => {
                self.history = history;
                true
            }
            None => {
                log::warn!("Ignoring invalid remote history at cursor {}", current_step);
                false
            }
        }
    }

    // --- Files and cache ---

    /// Snapshot the current drawing as a file.
    pub fn export_file(&self) -> DrawingFile {
        DrawingFile::from_state(&self.state)
    }

    /// Load a drawing file as a single undo step.
    ///
    /// The file is parsed and validated first; on error the store is left
    /// untouched.
    pub fn import_file(&mut self, json: &str) -> Result<(), ImportError> {
        let file = DrawingFile::from_json(json).inspect_err(|e| {
            log::warn!("Rejected drawing import: {}", e);
        })?;
        let elements = file.elements;

        self.set_lines(elements.lines.clone(), Origin::Local);
        self.set_text_elements(elements.text_elements.clone(), Origin::Local);
        self.set_rectangles(elements.rectangles.clone(), Origin::Local);
        self.set_circles(elements.circles.clone(), Origin::Local);
        self.set_images(elements.images.clone());
        self.add_to_history(HistoryUpdate::Consolidated(elements));
        Ok(())
    }

    /// Rebuild the live collections from the local cache.
    ///
    /// Keys that are missing or unreadable leave their collection as is.
    /// History is not touched.
    pub fn restore_from_cache(&mut self) {
        let cache = self.cache.as_ref();
        if let Some(lines) = restore_collection(cache, ElementKind::Lines) {
            self.state.lines = lines;
        }
        if let Some(texts) = restore_collection(cache, ElementKind::Texts) {
            self.state.text_elements = texts;
        }
        if let Some(rects) = restore_collection(cache, ElementKind::Rectangles) {
            self.state.rectangles = rects;
        }
        if let Some(circles) = restore_collection(cache, ElementKind::Circles) {
            self.state.circles = circles;
        }
        if let Some(images) = restore_collection(cache, ElementKind::Images) {
            self.state.images = images;
        }
    }

    // --- Internals ---

    fn after_set(&mut self, kind: ElementKind, origin: Origin) {
        self.persist(kind);
        self.request_sync(origin);
    }

    fn after_navigation(&mut self) {
        self.persist_all();
        self.request_sync(Origin::Local);
    }

    fn persist(&self, kind: ElementKind) {
        let cache = self.cache.as_ref();
        match kind {
            ElementKind::Lines => persist_collection(cache, kind, &self.state.lines),
            ElementKind::Texts => persist_collection(cache, kind, &self.state.text_elements),
            ElementKind::Rectangles => persist_collection(cache, kind, &self.state.rectangles),
            ElementKind::Circles => persist_collection(cache, kind, &self.state.circles),
            ElementKind::Images => persist_collection(cache, kind, &self.state.images),
        }
    }

    fn persist_all(&self) {
        for kind in ElementKind::ALL {
            self.persist(kind);
        }
    }

    /// Queue the full state for publishing, unless the change came from a
    /// peer or a remote snapshot is being applied.
    fn request_sync(&mut self, origin: Origin) {
        if origin == Origin::Remote || self.guard.is_active() {
            return;
        }
        self.dispatcher
            .request(DrawingUpdate::new(&self.state, &self.history));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{Channel, MemoryBus, MemoryChannel};
    use crate::clock::ManualClock;
    use crate::dispatcher::DEFAULT_DEBOUNCE;
    use crate::storage::{CacheError, CacheResult};
    use kurbo::Point;
    use std::time::Duration;

    struct Harness {
        store: DocumentStore,
        clock: ManualClock,
        bus: MemoryBus,
        peer: MemoryChannel,
        cache: Rc<MemoryCache>,
    }

    impl Harness {
        fn new() -> Self {
            let clock = ManualClock::new();
            let bus = MemoryBus::new();
            let cache = Rc::new(MemoryCache::new());
            let mut store = DocumentStore::new(
                Box::new(Rc::clone(&cache)),
                SyncDispatcher::new(DEFAULT_DEBOUNCE, Rc::new(clock.clone())),
            );
            store.dispatcher_mut().attach("room", Box::new(bus.endpoint()));
            let mut peer = bus.endpoint();
            peer.subscribe("room").unwrap();
            Self {
                store,
                clock,
                bus,
                peer,
                cache,
            }
        }

        /// Let the debounce window close and flush.
        fn settle(&mut self) {
            self.clock.advance(DEFAULT_DEBOUNCE);
            self.store.flush_sync();
        }

        fn received(&mut self) -> Vec<DrawingUpdate> {
            self.peer
                .poll()
                .into_iter()
                .map(|m| serde_json::from_value(m.payload).unwrap())
                .collect()
        }
    }

    struct FailingCache;

    impl LocalCache for FailingCache {
        fn get(&self, _key: &str) -> CacheResult<Option<String>> {
            Err(CacheError::Io("quota exceeded".to_string()))
        }

        fn set(&self, _key: &str, _value: &str) -> CacheResult<()> {
            Err(CacheError::Io("quota exceeded".to_string()))
        }

        fn remove(&self, _key: &str) -> CacheResult<()> {
            Err(CacheError::Io("quota exceeded".to_string()))
        }
    }

    fn line(x: f64) -> DrawLine {
        DrawLine::segment(Point::new(x, 0.0), Point::new(x, 10.0))
    }

    fn rect() -> Rectangle {
        Rectangle::new(Point::new(5.0, 5.0), 20.0, 10.0)
    }

    #[test]
    fn test_new_store_is_empty() {
        let store = DocumentStore::in_memory();
        assert!(store.state().is_empty());
        assert_eq!(store.history().len(), 1);
        assert_eq!(store.current_step(), 0);
        assert!(!store.can_undo());
        assert!(!store.can_redo());
    }

    #[test]
    fn test_history_length_tracks_pushes() {
        let mut store = DocumentStore::in_memory();
        for i in 0..5 {
            store.add_to_history(HistoryUpdate::Lines(vec![line(i as f64)]));
            assert_eq!(store.history().len(), store.current_step() + 1);
            assert_eq!(store.current_step(), i + 1);
        }
    }

    #[test]
    fn test_push_after_undo_drops_future() {
        let mut store = DocumentStore::in_memory();
        store.add_to_history(HistoryUpdate::Lines(vec![line(1.0)]));
        store.add_to_history(HistoryUpdate::Lines(vec![line(1.0), line(2.0)]));
        store.add_to_history(HistoryUpdate::Lines(vec![line(1.0), line(2.0), line(3.0)]));
        assert!(store.undo());
        assert!(store.undo());
        assert_eq!(store.current_step(), 1);

        store.add_to_history(HistoryUpdate::Rectangles(vec![rect()]));
        assert_eq!(store.history().len(), 3);
        assert_eq!(store.current_step(), 2);
        assert!(!store.can_redo());
        assert_eq!(store.lines(), &[line(1.0)]);
    }

    #[test]
    fn test_undo_is_left_inverse() {
        let mut store = DocumentStore::in_memory();
        store.add_to_history(HistoryUpdate::Lines(vec![line(1.0)]));
        let before = store.state().clone();

        store.add_to_history(HistoryUpdate::Circles(vec![Circle::new(Point::ZERO, 4.0)]));
        assert!(store.undo());
        assert_eq!(store.state(), &before);
    }

    #[test]
    fn test_undo_then_redo_restores() {
        let mut store = DocumentStore::in_memory();
        store.add_to_history(HistoryUpdate::Lines(vec![line(1.0)]));
        store.add_to_history(HistoryUpdate::Lines(vec![line(1.0), line(2.0)]));
        let b = store.state().clone();

        assert!(store.undo());
        assert!(store.redo());
        assert_eq!(store.state(), &b);
    }

    #[test]
    fn test_can_undo_redo_bounds() {
        let mut store = DocumentStore::in_memory();
        assert!(!store.undo());
        assert!(!store.redo());

        store.add_to_history(HistoryUpdate::Lines(vec![line(1.0)]));
        assert!(store.can_undo());
        assert!(!store.can_redo());

        store.undo();
        assert!(!store.can_undo());
        assert!(store.can_redo());
        assert_eq!(store.current_step(), 0);
    }

    #[test]
    fn test_line_then_rectangle_scenario() {
        let mut store = DocumentStore::in_memory();
        store.add_to_history(HistoryUpdate::Lines(vec![line(1.0)]));
        store.add_to_history(HistoryUpdate::Rectangles(vec![rect()]));

        assert!(store.undo());
        assert_eq!(store.lines(), &[line(1.0)]);
        assert!(store.rectangles().is_empty());

        assert!(store.redo());
        assert_eq!(store.rectangles(), &[rect()]);
    }

    #[test]
    fn test_history_entries_are_normalized() {
        let mut store = DocumentStore::in_memory();
        let dragged = Rectangle::from_drag(Point::new(50.0, 50.0), Point::new(10.0, 20.0));
        store.set_rectangles(vec![dragged.clone()], Origin::Local);
        assert_eq!(store.rectangles(), &[dragged.clone()]);

        store.add_to_history(HistoryUpdate::Rectangles(vec![dragged]));
        let recorded = &store.history().current().rectangles[0];
        assert!(recorded.is_normalized());
        assert!((recorded.x - 10.0).abs() < f64::EPSILON);
        assert_eq!(&store.rectangles()[0], recorded);
    }

    #[test]
    fn test_burst_of_edits_publishes_once() {
        let mut h = Harness::new();
        for i in 1..=4 {
            let lines: Vec<_> = (0..i).map(|n| line(n as f64)).collect();
            h.store.set_lines(lines, Origin::Local);
            h.clock.advance(Duration::from_millis(20));
            h.store.flush_sync();
        }
        assert_eq!(h.bus.published_count(), 0);

        h.settle();
        let received = h.received();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].state.lines.len(), 4);
        assert!(received[0].is_history_update);
    }

    #[test]
    fn test_remote_origin_does_not_publish() {
        let mut h = Harness::new();
        h.store.set_lines(vec![line(1.0)], Origin::Remote);
        h.store.set_circles(vec![Circle::new(Point::ZERO, 1.0)], Origin::Remote);
        h.store.clear(Origin::Remote);
        h.settle();
        assert_eq!(h.bus.published_count(), 0);
        assert_eq!(h.store.dispatcher().stats().requested, 0);
    }

    #[test]
    fn test_guard_blocks_every_mutation() {
        let mut h = Harness::new();
        let guard = h.store.guard().clone();
        {
            let _scope = guard.enter();
            h.store.set_lines(vec![line(1.0)], Origin::Local);
            h.store.set_text_elements(vec![TextElement::new(Point::ZERO, "x")], Origin::Local);
            h.store.add_to_history(HistoryUpdate::Lines(vec![line(2.0)]));
            h.store.undo();
            h.store.redo();
            h.store.clear(Origin::Local);
        }
        h.settle();
        assert_eq!(h.store.dispatcher().stats().requested, 0);
        assert_eq!(h.bus.published_count(), 0);
    }

    #[test]
    fn test_set_is_remote_update_flag() {
        let mut h = Harness::new();
        h.store.set_is_remote_update(true);
        assert!(h.store.is_remote_update());
        h.store.set_lines(vec![line(1.0)], Origin::Local);
        h.store.set_is_remote_update(false);
        h.settle();
        assert_eq!(h.bus.published_count(), 0);
    }

    #[test]
    fn test_images_never_publish() {
        let mut h = Harness::new();
        h.store
            .set_images(vec![Image::from_bytes(Point::ZERO, 1.0, 1.0, "image/png", &[0])]);
        h.settle();
        assert_eq!(h.bus.published_count(), 0);
        assert!(h.cache.get("images").unwrap().is_some());
    }

    #[test]
    fn test_undo_publishes_cursor() {
        let mut h = Harness::new();
        h.store.add_to_history(HistoryUpdate::Lines(vec![line(1.0)]));
        h.store.add_to_history(HistoryUpdate::Lines(vec![line(1.0), line(2.0)]));
        h.settle();
        h.received();

        h.store.undo();
        h.settle();
        let received = h.received();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].current_step, Some(1));
        assert_eq!(received[0].history.as_ref().map(Vec::len), Some(3));
        assert_eq!(received[0].state.lines, vec![line(1.0)]);
    }

    #[test]
    fn test_clear_resets_and_publishes_once() {
        let mut h = Harness::new();
        h.store.add_to_history(HistoryUpdate::Lines(vec![line(1.0)]));
        h.store
            .set_images(vec![Image::from_bytes(Point::ZERO, 1.0, 1.0, "image/png", &[0])]);
        h.settle();
        h.received();

        h.store.clear(Origin::Local);
        assert!(h.store.state().is_empty());
        assert_eq!(h.store.history().entries(), &[ConsolidatedState::new()]);
        assert_eq!(h.store.current_step(), 0);
        assert!(h.cache.is_empty());

        h.settle();
        let received = h.received();
        assert_eq!(received.len(), 1);
        assert!(received[0].state.is_empty());
        assert_eq!(received[0].current_step, Some(0));
    }

    #[test]
    fn test_setters_cache_only_their_collection() {
        let h = &mut Harness::new();
        h.store.set_lines(vec![line(1.0)], Origin::Local);
        assert!(h.cache.get("lines").unwrap().is_some());
        assert!(h.cache.get("rectangles").unwrap().is_none());
        assert_eq!(h.cache.len(), 1);
    }

    #[test]
    fn test_cache_failure_is_not_fatal() {
        let mut store = DocumentStore::new(
            Box::new(FailingCache),
            SyncDispatcher::new(DEFAULT_DEBOUNCE, Rc::new(ManualClock::new())),
        );
        store.set_lines(vec![line(1.0)], Origin::Local);
        store.add_to_history(HistoryUpdate::Lines(vec![line(2.0)]));
        store.clear(Origin::Local);
        store.restore_from_cache();
        assert!(store.state().is_empty());
        assert_eq!(store.history().len(), 1);
    }

    #[test]
    fn test_restore_from_cache() {
        let cache = Rc::new(MemoryCache::new());
        let mut store = DocumentStore::new(
            Box::new(Rc::clone(&cache)),
            SyncDispatcher::new(DEFAULT_DEBOUNCE, Rc::new(ManualClock::new())),
        );
        store.add_to_history(HistoryUpdate::Lines(vec![line(1.0)]));
        store.add_to_history(HistoryUpdate::Rectangles(vec![rect()]));

        let mut reopened = DocumentStore::new(
            Box::new(cache),
            SyncDispatcher::new(DEFAULT_DEBOUNCE, Rc::new(ManualClock::new())),
        );
        reopened.restore_from_cache();
        assert_eq!(reopened.lines(), &[line(1.0)]);
        assert_eq!(reopened.rectangles(), &[rect()]);
        assert_eq!(reopened.current_step(), 0);
    }

    #[test]
    fn test_import_is_one_undo_step() {
        let mut h = Harness::new();
        h.store.add_to_history(HistoryUpdate::Circles(vec![Circle::new(Point::ZERO, 2.0)]));
        let steps_before = h.store.history().len();

        let json = r##"{
            "version": "1.0",
            "timestamp": "2024-01-01T00:00:00.000Z",
            "elements": {
                "lines": [{ "points": [0, 0, 10, 10], "stroke": "#000000", "strokeWidth": 2 }],
                "textElements": [], "rectangles": [], "circles": [], "images": []
            }
        }"##;
        h.store.import_file(json).unwrap();

        assert_eq!(h.store.lines().len(), 1);
        assert!(h.store.circles().is_empty());
        assert_eq!(h.store.history().len(), steps_before + 1);

        assert!(h.store.undo());
        assert_eq!(h.store.circles().len(), 1);
        assert!(h.store.lines().is_empty());

        h.settle();
        assert_eq!(h.received().len(), 1);
    }

    #[test]
    fn test_failed_import_changes_nothing() {
        let mut h = Harness::new();
        h.store.add_to_history(HistoryUpdate::Lines(vec![line(1.0)]));
        h.settle();
        h.received();
        let before = h.store.state().clone();

        assert!(matches!(
            h.store.import_file(r#"{"version":"1.0"}"#),
            Err(ImportError::MissingElements)
        ));
        assert!(h.store.import_file("not json").is_err());

        assert_eq!(h.store.state(), &before);
        assert_eq!(h.store.history().len(), 2);
        h.settle();
        assert!(h.received().is_empty());
    }

    #[test]
    fn test_export_file() {
        let mut store = DocumentStore::in_memory();
        store.add_to_history(HistoryUpdate::Lines(vec![line(3.0)]));
        let file = store.export_file();
        assert_eq!(file.version, "1.0");
        assert_eq!(file.elements, *store.state());
    }

    #[test]
    fn test_untyped_history_update() {
        let mut store = DocumentStore::in_memory();
        store
            .add_untyped_to_history(serde_json::json!([{ "x": 0, "y": 0, "radius": 3 }]))
            .unwrap();
        assert_eq!(store.circles().len(), 1);
        assert!(store.add_untyped_to_history(serde_json::json!([])).is_err());
        assert_eq!(store.history().len(), 2);
    }

    #[test]
    fn test_adopt_history_keeps_local_images() {
        let mut store = DocumentStore::in_memory();
        let image = Image::from_bytes(Point::ZERO, 1.0, 1.0, "image/png", &[9]);
        store.set_images(vec![image.clone()]);

        let mut remote = ConsolidatedState::new();
        remote.lines.push(line(7.0));
        assert!(store.adopt_history(vec![ConsolidatedState::new(), remote], 1));
        assert_eq!(store.current_step(), 1);

        store.undo();
        assert_eq!(store.images(), &[image]);
        assert!(store.lines().is_empty());
    }

    #[test]
    fn test_adopt_history_rejects_bad_cursor() {
        let mut store = DocumentStore::in_memory();
        store.add_to_history(HistoryUpdate::Lines(vec![line(1.0)]));
        assert!(!store.adopt_history(vec![ConsolidatedState::new()], 4));
        assert!(!store.adopt_history(Vec::new(), 0));
        assert_eq!(store.history().len(), 2);
    }

    #[test]
    fn test_text_lookup() {
        let mut store = DocumentStore::in_memory();
        let text = TextElement::new(Point::new(1.0, 1.0), "label");
        let id = text.id.clone();
        store.set_text_elements(vec![text], Origin::Local);
        assert_eq!(store.text_element(&id).map(|t| t.text.as_str()), Some("label"));
        assert!(store.text_element("missing").is_none());
    }
}
