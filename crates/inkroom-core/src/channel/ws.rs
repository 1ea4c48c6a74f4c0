//! WebSocket channel speaking the relay protocol (native platforms).
//!
//! The socket lives on a background thread. Outgoing frames go through a
//! command queue and incoming frames are buffered until [`Channel::poll`].

use super::protocol::{ClientFrame, ServerFrame};
use super::{Channel, ChannelError, ChannelMessage, ConnectionState};
use serde_json::Value;
use std::sync::mpsc::{Receiver, Sender, TryRecvError, channel};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tungstenite::{Message, connect};
use url::Url;

/// Commands sent to the socket thread.
enum WsCommand {
    Send(String),
    Close,
}

/// Events reported by the socket thread.
enum WsEvent {
    Connected,
    Disconnected,
    Frame(ServerFrame),
    Error(String),
}

/// Relay client over a WebSocket.
pub struct WsChannel {
    state: ConnectionState,
    cmd_tx: Option<Sender<WsCommand>>,
    event_rx: Option<Receiver<WsEvent>>,
    _thread: Option<JoinHandle<()>>,
}

impl WsChannel {
    /// Create a disconnected channel.
    pub fn new() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            cmd_tx: None,
            event_rx: None,
            _thread: None,
        }
    }

    /// Connect to a relay at a `ws://` or `wss://` URL.
    ///
    /// Frames sent before the handshake completes are queued and flushed once
    /// it does.
    pub fn connect(&mut self, url: &str) -> Result<(), ChannelError> {
        if self.cmd_tx.is_some() {
            return Err(ChannelError::Send("already connected".to_string()));
        }

        let parsed = Url::parse(url).map_err(|e| ChannelError::InvalidUrl(e.to_string()))?;
        if parsed.scheme() != "ws" && parsed.scheme() != "wss" {
            return Err(ChannelError::InvalidUrl(format!(
                "unsupported scheme: {}",
                parsed.scheme()
            )));
        }

        self.state = ConnectionState::Connecting;

        let (cmd_tx, cmd_rx) = channel::<WsCommand>();
        let (event_tx, event_rx) = channel::<WsEvent>();
        let url = url.to_string();

        let handle = thread::spawn(move || run_socket(url, cmd_rx, event_tx));

        self.cmd_tx = Some(cmd_tx);
        self.event_rx = Some(event_rx);
        self._thread = Some(handle);
        Ok(())
    }

    /// Close the socket. Pending inbound frames are discarded.
    pub fn disconnect(&mut self) {
        if let Some(tx) = self.cmd_tx.take() {
            let _ = tx.send(WsCommand::Close);
        }
        self.event_rx = None;
        self._thread = None;
        self.state = ConnectionState::Disconnected;
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    fn send_frame(&self, frame: &ClientFrame) -> Result<(), ChannelError> {
        let tx = self.cmd_tx.as_ref().ok_or(ChannelError::NotConnected)?;
        let json = serde_json::to_string(frame)?;
        tx.send(WsCommand::Send(json))
            .map_err(|e| ChannelError::Send(e.to_string()))
    }
}

impl Default for WsChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for WsChannel {
    fn drop(&mut self) {
        self.disconnect();
    }
}

impl Channel for WsChannel {
    fn subscribe(&mut self, topic: &str) -> Result<(), ChannelError> {
        self.send_frame(&ClientFrame::Subscribe {
            topic: topic.to_string(),
        })
    }

    fn unsubscribe(&mut self, topic: &str) -> Result<(), ChannelError> {
        self.send_frame(&ClientFrame::Unsubscribe {
            topic: topic.to_string(),
        })
    }

    fn publish(&mut self, topic: &str, event: &str, payload: Value) -> Result<(), ChannelError> {
        self.send_frame(&ClientFrame::Publish {
            topic: topic.to_string(),
            event: event.to_string(),
            payload,
        })
    }

    fn poll(&mut self) -> Vec<ChannelMessage> {
        let mut messages = Vec::new();
        let Some(rx) = self.event_rx.as_ref() else {
            return messages;
        };

        while let Ok(event) = rx.try_recv() {
            match event {
                WsEvent::Connected => self.state = ConnectionState::Connected,
                WsEvent::Disconnected => self.state = ConnectionState::Disconnected,
                WsEvent::Error(message) => {
                    log::error!("Relay connection error: {}", message);
                    self.state = ConnectionState::Error;
                }
                WsEvent::Frame(ServerFrame::Event {
                    topic,
                    event,
                    payload,
                    ..
                }) => messages.push(ChannelMessage {
                    topic,
                    event,
                    payload,
                }),
                WsEvent::Frame(ServerFrame::Subscribed { topic, peer_count }) => {
                    log::info!("Subscribed to {} ({} peers)", topic, peer_count);
                }
                WsEvent::Frame(ServerFrame::Error { message }) => {
                    log::warn!("Relay reported error: {}", message);
                }
            }
        }
        messages
    }
}

/// Socket thread body: connect, then alternate between draining commands and
/// reading frames until closed.
fn run_socket(url: String, cmd_rx: Receiver<WsCommand>, event_tx: Sender<WsEvent>) {
    log::info!("WebSocket thread: connecting to {}", url);

    let (mut socket, response) = match connect(&url) {
        Ok(ok) => ok,
        Err(e) => {
            log::error!("WebSocket connection failed: {}", e);
            let _ = event_tx.send(WsEvent::Error(format!("connection failed: {}", e)));
            return;
        }
    };
    log::info!("WebSocket connected, status: {}", response.status());
    let _ = event_tx.send(WsEvent::Connected);

    // Short read timeout so the loop keeps servicing outgoing commands.
    match socket.get_mut() {
        tungstenite::stream::MaybeTlsStream::Plain(tcp) => {
            let _ = tcp.set_read_timeout(Some(Duration::from_millis(50)));
            let _ = tcp.set_write_timeout(Some(Duration::from_secs(5)));
        }
        #[allow(unreachable_patterns)]
        _ => log::debug!("TLS or other stream - using default timeout handling"),
    }

    loop {
        match cmd_rx.try_recv() {
            Ok(WsCommand::Send(msg)) => {
                log::debug!("WebSocket sending {} bytes", msg.len());
                if let Err(e) = socket.send(Message::Text(msg)) {
                    log::error!("WebSocket send error: {}", e);
                    break;
                }
            }
            Ok(WsCommand::Close) => {
                log::info!("WebSocket close requested");
                let _ = socket.close(None);
                break;
            }
            Err(TryRecvError::Disconnected) => break,
            Err(TryRecvError::Empty) => {}
        }

        match socket.read() {
            Ok(Message::Text(txt)) => match serde_json::from_str::<ServerFrame>(&txt) {
                Ok(frame) => {
                    let _ = event_tx.send(WsEvent::Frame(frame));
                }
                Err(e) => log::warn!("Failed to parse relay frame: {}", e),
            },
            Ok(Message::Ping(data)) => {
                let _ = socket.send(Message::Pong(data));
            }
            Ok(Message::Close(_)) => {
                log::info!("WebSocket received close frame");
                break;
            }
            Ok(_) => {}
            Err(tungstenite::Error::Io(ref e))
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut =>
            {
                continue;
            }
            Err(e) => {
                log::error!("WebSocket read error: {}", e);
                break;
            }
        }
    }

    log::info!("WebSocket thread exiting");
    let _ = event_tx.send(WsEvent::Disconnected);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rejects_non_websocket_url() {
        let mut ws = WsChannel::new();
        assert!(matches!(
            ws.connect("http://localhost:3030/ws"),
            Err(ChannelError::InvalidUrl(_))
        ));
        assert!(matches!(ws.connect("not a url"), Err(ChannelError::InvalidUrl(_))));
        assert_eq!(ws.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_publish_without_connection() {
        let mut ws = WsChannel::new();
        assert!(matches!(
            ws.publish("room", "new-drawing", json!({})),
            Err(ChannelError::NotConnected)
        ));
        assert!(ws.poll().is_empty());
    }
}
