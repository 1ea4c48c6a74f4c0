//! InkRoom WebSocket Relay Server
//!
//! A topic relay: every frame published to a room is forwarded to the other
//! subscribers of that room. The relay never inspects drawing payloads beyond
//! remembering the last `new-drawing` per room for late joiners.
//!
//! ## Protocol
//!
//! ```json
//! { "type": "subscribe", "topic": "a1b2c3d4" }
//! { "type": "unsubscribe", "topic": "a1b2c3d4" }
//! { "type": "publish", "topic": "a1b2c3d4", "event": "new-drawing", "payload": { ... } }
//! ```

use axum::{
    Router,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
    routing::get,
};
use clap::Parser;
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use inkroom_core::channel::{ClientFrame, DRAWING_EVENT, ServerFrame};
use serde_json::Value;
use std::{
    collections::{HashMap, HashSet},
    net::{IpAddr, SocketAddr},
    sync::Arc,
};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Per-room broadcast buffer.
const CHANNEL_CAPACITY: usize = 256;
/// Per-connection outbound queue.
const OUTBOUND_CAPACITY: usize = 64;

#[derive(Parser, Debug)]
#[command(name = "inkroom-server")]
#[command(about = "WebSocket relay for InkRoom collaboration rooms")]
struct Args {
    /// Address to bind
    #[arg(long, default_value = "0.0.0.0", env = "INKROOM_HOST")]
    host: IpAddr,

    /// Port to listen on
    #[arg(short, long, default_value_t = 3030, env = "INKROOM_PORT")]
    port: u16,
}

/// A frame on a room's broadcast channel, tagged with the publishing peer.
type RoomEvent = (String, ServerFrame);

/// Room state
struct Room {
    /// Broadcast channel for this room
    tx: broadcast::Sender<RoomEvent>,
    /// Subscribed peer IDs
    peers: HashSet<String>,
    /// Last drawing published (for new subscribers)
    last_drawing: Option<ServerFrame>,
}

impl Room {
    fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            tx,
            peers: HashSet::new(),
            last_drawing: None,
        }
    }
}

/// What a new subscriber gets back.
struct Subscription {
    rx: broadcast::Receiver<RoomEvent>,
    peer_count: usize,
    last_drawing: Option<ServerFrame>,
}

/// Shared application state
#[derive(Default)]
struct AppState {
    /// Active rooms, keyed by topic
    rooms: DashMap<String, Room>,
}

impl AppState {
    fn new() -> Self {
        Self::default()
    }

    /// Add a peer to a room, creating the room if needed.
    fn subscribe(&self, topic: &str, peer_id: &str) -> Subscription {
        let mut room = self.rooms.entry(topic.to_string()).or_insert_with(Room::new);
        room.peers.insert(peer_id.to_string());
        Subscription {
            rx: room.tx.subscribe(),
            peer_count: room.peers.len(),
            last_drawing: room.last_drawing.clone(),
        }
    }

    /// Remove a peer from a room, dropping the room once empty.
    ///
    /// The emptiness check and the removal share one shard lock.
    fn unsubscribe(&self, topic: &str, peer_id: &str) {
        if let Some(mut room) = self.rooms.get_mut(topic) {
            room.peers.remove(peer_id);
        }
        if self
            .rooms
            .remove_if(topic, |_, room| room.peers.is_empty())
            .is_some()
        {
            debug!("Room {} closed", topic);
        }
    }

    /// Forward a payload to a room. Returns false if the room does not exist.
    fn publish(&self, topic: &str, from: &str, event: String, payload: Value) -> bool {
        let Some(mut room) = self.rooms.get_mut(topic) else {
            return false;
        };

        let is_drawing = event == DRAWING_EVENT;
        let frame = ServerFrame::Event {
            topic: topic.to_string(),
            event,
            from: from.to_string(),
            payload,
        };
        if is_drawing {
            room.last_drawing = Some(frame.clone());
        }
        // Err only means nobody else is subscribed.
        let _ = room.tx.send((from.to_string(), frame));
        true
    }

    fn room_count(&self) -> usize {
        self.rooms.len()
    }

    fn peer_count(&self, topic: &str) -> usize {
        self.rooms.get(topic).map(|room| room.peers.len()).unwrap_or(0)
    }
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "inkroom_server=info,tower_http=info".into()),
        )
        .init();

    let app = router(Arc::new(AppState::new()));

    let addr = SocketAddr::new(args.host, args.port);
    info!("InkRoom relay server listening on {}", addr);
    info!("WebSocket endpoint: ws://{}/ws", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await
}

fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Index page
async fn index() -> &'static str {
    "InkRoom Relay Server - Connect via WebSocket at /ws"
}

/// Health check
async fn health() -> &'static str {
    "ok"
}

/// WebSocket upgrade handler
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle a WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let peer_id = Uuid::new_v4().to_string();
    info!("New connection: {}", peer_id);

    let (mut sender, mut receiver) = socket.split();
    let (out_tx, mut out_rx) = mpsc::channel::<ServerFrame>(OUTBOUND_CAPACITY);

    let writer = tokio::spawn(async move {
        while let Some(frame) = out_rx.recv().await {
            let json = match serde_json::to_string(&frame) {
                Ok(json) => json,
                Err(e) => {
                    warn!("Failed to encode frame: {}", e);
                    continue;
                }
            };
            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    let mut subscriptions: HashMap<String, JoinHandle<()>> = HashMap::new();

    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientFrame>(&text) {
                Ok(frame) => {
                    if !handle_frame(&state, &peer_id, frame, &out_tx, &mut subscriptions).await {
                        break;
                    }
                }
                Err(e) => {
                    warn!("Invalid message from {}: {}", peer_id, e);
                    let error = ServerFrame::Error {
                        message: format!("Invalid message: {}", e),
                    };
                    if out_tx.send(error).await.is_err() {
                        break;
                    }
                }
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => {} // Ignore binary and ping/pong
            Err(e) => {
                warn!("WebSocket error for {}: {}", peer_id, e);
                break;
            }
        }
    }

    // Cleanup on disconnect
    for (topic, task) in subscriptions.drain() {
        task.abort();
        state.unsubscribe(&topic, &peer_id);
    }
    writer.abort();
    info!("Connection closed: {}", peer_id);
}

/// Apply one client frame. Returns false once the connection's writer is gone.
async fn handle_frame(
    state: &AppState,
    peer_id: &str,
    frame: ClientFrame,
    out_tx: &mpsc::Sender<ServerFrame>,
    subscriptions: &mut HashMap<String, JoinHandle<()>>,
) -> bool {
    match frame {
        ClientFrame::Subscribe { topic } => {
            if subscriptions.contains_key(&topic) {
                let peer_count = state.peer_count(&topic);
                return out_tx.send(ServerFrame::Subscribed { topic, peer_count }).await.is_ok();
            }

            let subscription = state.subscribe(&topic, peer_id);
            info!("Peer {} joined room {} ({} peers)", peer_id, topic, subscription.peer_count);

            let confirmed = ServerFrame::Subscribed {
                topic: topic.clone(),
                peer_count: subscription.peer_count,
            };
            if out_tx.send(confirmed).await.is_err() {
                state.unsubscribe(&topic, peer_id);
                return false;
            }
            if let Some(drawing) = subscription.last_drawing {
                if out_tx.send(drawing).await.is_err() {
                    state.unsubscribe(&topic, peer_id);
                    return false;
                }
            }

            let task = forward(subscription.rx, peer_id.to_string(), out_tx.clone());
            subscriptions.insert(topic, task);
            true
        }
        ClientFrame::Unsubscribe { topic } => {
            if let Some(task) = subscriptions.remove(&topic) {
                task.abort();
                state.unsubscribe(&topic, peer_id);
                info!("Peer {} left room {}", peer_id, topic);
            }
            true
        }
        ClientFrame::Publish { topic, event, payload } => {
            if !state.publish(&topic, peer_id, event, payload) {
                debug!("Dropping publish from {} to empty room {}", peer_id, topic);
            }
            true
        }
    }
}

/// Pump a room's broadcast into one connection's outbound queue, skipping the
/// peer's own frames.
fn forward(
    mut rx: broadcast::Receiver<RoomEvent>,
    peer_id: String,
    out_tx: mpsc::Sender<ServerFrame>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok((from, frame)) => {
                    // Don't echo back to sender
                    if from == peer_id {
                        continue;
                    }
                    if out_tx.send(frame).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Peer {} lagged, skipped {} frames", peer_id, skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}
