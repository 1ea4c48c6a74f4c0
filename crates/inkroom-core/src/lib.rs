//! InkRoom Core Library
//!
//! Document model, undo history and room sync for the InkRoom shared canvas.

pub mod channel;
pub mod clock;
pub mod collaboration;
pub mod compat;
pub mod config;
pub mod dispatcher;
pub mod elements;
pub mod file_format;
pub mod guard;
pub mod history;
pub mod listener;
pub mod room;
pub mod storage;
pub mod store;

pub use channel::{Channel, ChannelError, ChannelMessage, ConnectionState, DRAWING_EVENT, MemoryBus};
pub use clock::{Clock, Debouncer, ManualClock, SystemClock};
pub use collaboration::CollaborationManager;
pub use config::SyncConfig;
pub use dispatcher::{DrawingUpdate, SyncDispatcher};
pub use elements::{Circle, ConsolidatedState, DrawLine, ElementKind, Image, Rectangle, TextElement};
pub use file_format::{DrawingFile, ImportError};
pub use guard::{GuardScope, RemoteGuard};
pub use history::History;
pub use listener::{RemoteListener, apply_remote_snapshot};
pub use room::RoomSession;
#[cfg(not(target_arch = "wasm32"))]
pub use storage::FileCache;
pub use storage::{CacheError, LocalCache, MemoryCache};
pub use store::{DocumentStore, HistoryUpdate, Origin};
