//! Chat client with signal-based event delivery.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode as TungsteniteCloseCode;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use url::Url;

use crate::error::{ClientError, Result};
use crate::heartbeat::{Heartbeat, HeartbeatEvent, PING_FRAME, PONG_FRAME, RECONNECT_DELAY};
use crate::message::{CloseCode, CloseReason, ConnectionState};
use crate::origin::derive_ws_url;
use crate::signal::Signal;

/// Type alias for a connected WebSocket stream.
type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Shared state behind the client handle.
///
/// At most one connection is live at any instant. The `epoch` counter
/// identifies it: every `connect()` bumps the epoch, and a connection task
/// whose epoch is no longer current treats all of its remaining events as
/// void (stale transports must not mutate state or reach the UI).
struct ClientInner {
    state: ConnectionState,
    epoch: u64,
    command_tx: Option<mpsc::UnboundedSender<Command>>,
    task: Option<JoinHandle<()>>,
}

/// Command sent to the connection task.
enum Command {
    Send(String),
    Close(CloseReason),
}

/// A chat/echo client owning one logical WebSocket connection at a time.
///
/// The client derives the server address from a page origin
/// (`http` → `ws`, `https` → `wss`), maintains liveness with an
/// application-level `"ping"`/`"pong"` heartbeat while connected, and
/// schedules an automatic reconnect a fixed 5 seconds after every close.
/// The reconnect timer fires unconditionally and calls
/// [`connect`](ChatClient::connect), so even a manual
/// [`disconnect`](ChatClient::disconnect) is followed by a silent reconnect
/// 5 seconds later.
///
/// # Signals
///
/// - [`log_line`](Self::log_line): one human-readable line per sent or
///   received message and per connection event
/// - [`status_changed`](Self::status_changed): `true` on connect, `false`
///   on disconnect; UI state is purely a function of this value
///
/// # Example
///
/// ```ignore
/// let client = ChatClient::new("http://localhost:8080");
///
/// client.log_line.connect(|line| println!("{line}"));
/// client.status_changed.connect(|up| println!("connected: {up}"));
///
/// client.connect();
/// client.send("hello")?;
/// ```
///
/// All methods must be called from within a Tokio runtime; the connection
/// runs on a spawned task.
#[derive(Clone)]
pub struct ChatClient {
    origin: String,
    inner: Arc<Mutex<ClientInner>>,

    /// Signal emitted with each log line.
    pub log_line: Signal<String>,
    /// Signal emitted when the connection status flips.
    pub status_changed: Signal<bool>,
}

impl ChatClient {
    /// Create a new client for the given page origin.
    ///
    /// The origin is resolved to a server address on
    /// [`connect`](ChatClient::connect); an invalid origin surfaces there
    /// as a logged error, not here.
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            inner: Arc::new(Mutex::new(ClientInner {
                state: ConnectionState::Disconnected,
                epoch: 0,
                command_tx: None,
                task: None,
            })),
            log_line: Signal::new(),
            status_changed: Signal::new(),
        }
    }

    /// The page origin this client was created with.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.inner.lock().state
    }

    /// Check if the client is connected.
    pub fn is_connected(&self) -> bool {
        self.inner.lock().state == ConnectionState::Connected
    }

    /// Open a connection to the server.
    ///
    /// Any existing connection is torn down first: its task is aborted,
    /// which cancels both heartbeat timers with it, and its late transport
    /// events are ignored. Errors are reported through the close/error
    /// notification path (the [`log_line`](Self::log_line) signal), not as
    /// a return value.
    pub fn connect(&self) {
        let url = match derive_ws_url(&self.origin) {
            Ok(url) => url,
            Err(err) => {
                self.log_line.emit(format!("Error: {err}"));
                return;
            }
        };

        let mut inner = self.inner.lock();
        if let Some(task) = inner.task.take() {
            task.abort();
        }
        inner.command_tx = None;
        inner.epoch += 1;
        inner.state = ConnectionState::Connecting;

        let epoch = inner.epoch;
        tracing::debug!(target: "echoline::client", %url, epoch, "opening connection");
        let client = self.clone();
        inner.task = Some(tokio::spawn(async move {
            client.run_connection(epoch, url).await;
        }));
    }

    /// Close the active connection.
    ///
    /// No-op when already disconnected. Does not cancel a pending scheduled
    /// auto-reconnect, so the client will dial again 5 seconds after the
    /// close completes (preserved behavior, see the type-level docs).
    pub fn disconnect(&self) {
        let mut inner = self.inner.lock();
        if let Some(tx) = inner.command_tx.take() {
            drop(inner);
            let _ = tx.send(Command::Close(CloseReason::normal()));
        } else if let Some(task) = inner.task.take() {
            // Handshake still in flight: abort it and drive the same
            // teardown path a transport close would have taken.
            let epoch = inner.epoch;
            drop(inner);
            task.abort();
            self.finish_connection(epoch, CloseReason::normal());
        }
    }

    /// Send a chat message.
    ///
    /// Surrounding whitespace is trimmed; an empty message is a silent
    /// no-op. Returns [`ClientError::NotConnected`] when no connection is
    /// live. On success exactly one text frame is transmitted and a
    /// `"Sent: …"` line is reported to the log.
    pub fn send(&self, text: &str) -> Result<()> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }
        let tx = self.inner.lock().command_tx.clone();
        match tx {
            Some(tx) => tx
                .send(Command::Send(text.to_owned()))
                .map_err(|_| ClientError::NotConnected),
            None => Err(ClientError::NotConnected),
        }
    }

    /// Whether `epoch` still identifies the current connection.
    fn is_current(&self, epoch: u64) -> bool {
        self.inner.lock().epoch == epoch
    }

    /// Handshake, then drive the connection until it closes.
    async fn run_connection(self, epoch: u64, url: Url) {
        match connect_async(url.as_str()).await {
            Ok((stream, _response)) => self.drive_connection(epoch, stream).await,
            Err(err) => {
                if !self.is_current(epoch) {
                    return;
                }
                // Open failures surface like a browser socket: an error
                // event followed by an abnormal close.
                self.log_line.emit(format!("Error: {err}"));
                self.finish_connection(epoch, CloseReason::new(CloseCode::Abnormal));
            }
        }
    }

    /// Pump commands, inbound frames, and heartbeat timers until close.
    async fn drive_connection(self, epoch: u64, stream: WsStream) {
        let (mut write, mut read) = stream.split();
        let (tx, mut rx) = mpsc::unbounded_channel();

        {
            let mut inner = self.inner.lock();
            if inner.epoch != epoch {
                return;
            }
            inner.command_tx = Some(tx);
            inner.state = ConnectionState::Connected;
        }
        self.log_line.emit("Connected".to_string());
        self.status_changed.emit(true);

        let mut heartbeat = Heartbeat::new();
        let reason = loop {
            tokio::select! {
                cmd = rx.recv() => match cmd {
                    Some(Command::Send(text)) => {
                        // A concurrent connect() may have superseded this task
                        // between its abort call and our next await; a stale
                        // task's events must not reach the UI.
                        if !self.is_current(epoch) {
                            return;
                        }
                        if let Err(err) = write.send(Message::Text(text.clone().into())).await {
                            self.log_line.emit(format!("Error: {err}"));
                            break CloseReason::new(CloseCode::Abnormal);
                        }
                        self.log_line.emit(format!("Sent: {text}"));
                    }
                    Some(Command::Close(reason)) => {
                        let _ = write.send(Message::Close(Some(close_frame(&reason)))).await;
                        break reason;
                    }
                    None => break CloseReason::normal(),
                },
                msg = read.next() => match msg {
                    Some(Ok(Message::Text(text))) => {
                        if !self.is_current(epoch) {
                            return;
                        }
                        // Logged verbatim before any protocol interpretation;
                        // a "pong" is both a received message and an ack.
                        self.log_line.emit(format!("Received: {text}"));
                        if text.as_str() == PONG_FRAME && heartbeat.pong_received() {
                            tracing::trace!(target: "echoline::client", "heartbeat acknowledged");
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        break frame.map_or_else(
                            || CloseReason::new(CloseCode::NoStatus),
                            |frame| close_reason(&frame),
                        );
                    }
                    Some(Ok(_)) => {
                        // Binary and control frames carry no chat payload.
                    }
                    Some(Err(err)) => {
                        if !self.is_current(epoch) {
                            return;
                        }
                        self.log_line.emit(format!("Error: {err}"));
                        break CloseReason::new(CloseCode::Abnormal);
                    }
                    None => break CloseReason::new(CloseCode::Abnormal),
                },
                event = heartbeat.next_event() => match event {
                    HeartbeatEvent::PingDue => {
                        if let Err(err) = write.send(Message::Text(PING_FRAME.into())).await {
                            self.log_line.emit(format!("Error: {err}"));
                            break CloseReason::new(CloseCode::Abnormal);
                        }
                        heartbeat.mark_ping_sent();
                    }
                    HeartbeatEvent::PongOverdue => {
                        let reason = CloseReason::with_reason(CloseCode::Policy, "Pong timeout");
                        tracing::debug!(target: "echoline::client", epoch, "pong overdue, closing");
                        let _ = write.send(Message::Close(Some(close_frame(&reason)))).await;
                        break reason;
                    }
                },
            }
        };
        self.finish_connection(epoch, reason);
    }

    /// Tear down after a close and schedule the automatic reconnect.
    ///
    /// A superseded connection's close is void: it must neither reach the
    /// UI nor schedule a reconnect on top of the one its replacement owns.
    fn finish_connection(&self, epoch: u64, reason: CloseReason) {
        {
            let mut inner = self.inner.lock();
            if inner.epoch != epoch {
                return;
            }
            inner.command_tx = None;
            inner.task = None;
            inner.state = ConnectionState::Disconnected;
        }

        let mut line = format!("Disconnected. Code: {}", reason.code.as_u16());
        if let Some(text) = reason.reason.as_deref().filter(|text| !text.is_empty()) {
            line.push_str(&format!(", Reason: {text}"));
        }
        self.log_line.emit(line);
        self.status_changed.emit(false);

        tracing::debug!(
            target: "echoline::client",
            code = reason.code.as_u16(),
            delay_ms = RECONNECT_DELAY.as_millis() as u64,
            "connection closed, reconnect scheduled"
        );
        let client = self.clone();
        tokio::spawn(async move {
            time::sleep(RECONNECT_DELAY).await;
            client.connect();
        });
    }
}

impl std::fmt::Debug for ChatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatClient")
            .field("origin", &self.origin)
            .field("state", &self.state())
            .finish()
    }
}

/// Build the outgoing close frame for a local close.
fn close_frame(reason: &CloseReason) -> CloseFrame {
    CloseFrame {
        code: TungsteniteCloseCode::from(reason.code.as_u16()),
        reason: reason.reason.clone().unwrap_or_default().into(),
    }
}

/// Surface a peer close frame verbatim.
fn close_reason(frame: &CloseFrame) -> CloseReason {
    let code = CloseCode::from_u16(u16::from(frame.code));
    if frame.reason.is_empty() {
        CloseReason::new(code)
    } else {
        CloseReason::with_reason(code, frame.reason.as_str())
    }
}
