//! Collaboration room identity and share links.

use thiserror::Error;
use url::Url;
use uuid::Uuid;

/// Length of generated room ids.
pub const ROOM_ID_LEN: usize = 8;

/// Path segment preceding the room id in share links.
const ROOM_PATH: &str = "room";

#[derive(Debug, Error)]
pub enum RoomError {
    #[error("Invalid share URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("Share URL has no room id: {0}")]
    MissingRoom(String),
    #[error("Invalid room id: {0:?}")]
    InvalidId(String),
}

/// One collaborative session's room.
///
/// The id doubles as the pub/sub topic. It is generated once per session and
/// never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomSession {
    room_id: String,
    origin: String,
    syncing: bool,
}

impl RoomSession {
    /// Open a new room with a fresh random id.
    pub fn create(origin: &str) -> Self {
        let id = Uuid::new_v4().simple().to_string();
        Self {
            room_id: id[..ROOM_ID_LEN].to_string(),
            origin: normalize_origin(origin),
            syncing: false,
        }
    }

    /// Join an existing room by id.
    pub fn join(origin: &str, room_id: &str) -> Result<Self, RoomError> {
        if !is_valid_id(room_id) {
            return Err(RoomError::InvalidId(room_id.to_string()));
        }
        Ok(Self {
            room_id: room_id.to_string(),
            origin: normalize_origin(origin),
            syncing: false,
        })
    }

    /// Join the room named by a share link such as
    /// `https://draw.example.com/room/1a2b3c4d`.
    pub fn from_share_url(share_url: &str) -> Result<Self, RoomError> {
        let url = Url::parse(share_url)?;
        let segments: Vec<&str> = url.path_segments().map(Iterator::collect).unwrap_or_default();
        let room_id = segments
            .iter()
            .position(|segment| *segment == ROOM_PATH)
            .and_then(|i| segments.get(i + 1))
            .filter(|id| !id.is_empty())
            .ok_or_else(|| RoomError::MissingRoom(share_url.to_string()))?;

        Self::join(&url.origin().ascii_serialization(), room_id)
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    /// Pub/sub topic for this room.
    pub fn topic(&self) -> &str {
        &self.room_id
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Link that lets others join this room.
    pub fn share_url(&self) -> String {
        format!("{}/{}/{}", self.origin, ROOM_PATH, self.room_id)
    }

    /// UI-only flag; has no effect on sync.
    pub fn is_syncing(&self) -> bool {
        self.syncing
    }

    pub fn set_syncing(&mut self, syncing: bool) {
        self.syncing = syncing;
    }
}

fn normalize_origin(origin: &str) -> String {
    origin.trim_end_matches('/').to_string()
}

fn is_valid_id(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
