//! Feed Session Adapter
//!
//! Per-connection client state machine: connect, request the initial
//! snapshot, consume streamed updates into a bounded local history, and
//! reconnect with capped exponential backoff when the transport drops.
//! An explicit [`FeedSession::close`] suppresses reconnection.

use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite, MaybeTlsStream, WebSocketStream};

use crate::telemetry::{HistoryBuffer, Location, Reading, DEFAULT_HISTORY_CAPACITY};
use crate::websocket::{ClientMessage, ServerMessage};

/// Lifecycle of one feed session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Open,
    Closing,
    Closed,
}

/// Configuration for a feed session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// WebSocket URL of the feed server (e.g. "ws://localhost:8090/ws")
    pub url: String,
    /// Local history capacity
    pub history_capacity: usize,
    /// Reconnect attempts before giving up
    pub max_reconnect_attempts: u32,
    /// First reconnect delay; doubles per attempt
    pub reconnect_base_delay: Duration,
    /// Upper bound on the reconnect delay
    pub max_reconnect_delay: Duration,
}

impl SessionConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            max_reconnect_attempts: 5,
            reconnect_base_delay: Duration::from_secs(1),
            max_reconnect_delay: Duration::from_secs(30),
        }
    }
}

/// Exponential backoff: `base * 2^attempt`, capped
fn backoff_delay(config: &SessionConfig, attempt: u32) -> Duration {
    let factor = 2u32.saturating_pow(attempt);
    let delay = config.reconnect_base_delay.saturating_mul(factor);
    delay.min(config.max_reconnect_delay)
}

/// Decoded updates forwarded to the session's consumer
#[derive(Debug, Clone)]
pub enum FeedUpdate {
    Pollution(Reading),
    Locations(Vec<Location>),
    Historical(Vec<Reading>),
    Chat(String),
}

enum Command {
    Send(ClientMessage),
    Close,
}

/// Shared session state the driver task writes and the caller reads
struct Shared {
    state: RwLock<SessionState>,
    current: RwLock<Option<Reading>>,
    locations: RwLock<Vec<Location>>,
    history: Mutex<HistoryBuffer>,
}

/// Handle to one live feed session
pub struct FeedSession {
    commands: mpsc::UnboundedSender<Command>,
    shared: Arc<Shared>,
    driver: JoinHandle<()>,
}

impl FeedSession {
    /// Start a session. Connection (and any reconnection) happens on the
    /// driver task; decoded updates arrive on the returned receiver.
    pub fn connect(config: SessionConfig) -> (Self, mpsc::UnboundedReceiver<FeedUpdate>) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        let shared = Arc::new(Shared {
            state: RwLock::new(SessionState::Connecting),
            current: RwLock::new(None),
            locations: RwLock::new(Vec::new()),
            history: Mutex::new(HistoryBuffer::new(config.history_capacity)),
        });

        let driver = tokio::spawn(drive(config, Arc::clone(&shared), command_rx, update_tx));

        (
            Self {
                commands: command_tx,
                shared,
                driver,
            },
            update_rx,
        )
    }

    pub async fn state(&self) -> SessionState {
        *self.shared.state.read().await
    }

    /// The most recently received reading, if any update has arrived
    pub async fn current(&self) -> Option<Reading> {
        self.shared.current.read().await.clone()
    }

    /// The most recently received location set
    pub async fn locations(&self) -> Vec<Location> {
        self.shared.locations.read().await.clone()
    }

    /// Ordered copy of the locally buffered readings
    pub async fn history(&self) -> Vec<Reading> {
        self.shared.history.lock().await.snapshot()
    }

    /// Queue a message for the server
    pub fn send(&self, message: ClientMessage) -> Result<(), SessionError> {
        self.commands
            .send(Command::Send(message))
            .map_err(|_| SessionError::Closed)
    }

    /// Narrow the feed to one location (or clear the filter with `None`)
    pub fn subscribe(&self, location_id: Option<String>) -> Result<(), SessionError> {
        self.send(ClientMessage::Subscribe { location_id })
    }

    /// Ask the assistant a question; the reply arrives as [`FeedUpdate::Chat`]
    pub fn chat(&self, message: impl Into<String>) -> Result<(), SessionError> {
        self.send(ClientMessage::ChatMessage {
            message: message.into(),
        })
    }

    /// Gracefully close the session. Reconnection is suppressed.
    pub fn close(&self) {
        let _ = self.commands.send(Command::Close);
    }
}

impl Drop for FeedSession {
    fn drop(&mut self) {
        self.driver.abort();
    }
}

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Driver task: owns the transport and the reconnect loop
async fn drive(
    config: SessionConfig,
    shared: Arc<Shared>,
    mut commands: mpsc::UnboundedReceiver<Command>,
    updates: mpsc::UnboundedSender<FeedUpdate>,
) {
    let mut attempt: u32 = 0;

    'session: loop {
        *shared.state.write().await = SessionState::Connecting;

        let ws: WsStream = match connect_async(config.url.as_str()).await {
            Ok((ws, _)) => ws,
            Err(e) => {
                tracing::warn!(url = %config.url, error = %e, "Feed connect failed");
                attempt += 1;
                if attempt > config.max_reconnect_attempts {
                    break 'session;
                }
                let delay = backoff_delay(&config, attempt - 1);
                tracing::debug!(attempt, delay_ms = delay.as_millis() as u64, "Reconnecting");
                let sleep = tokio::time::sleep(delay);
                tokio::pin!(sleep);
                loop {
                    tokio::select! {
                        _ = &mut sleep => continue 'session,
                        cmd = commands.recv() => match cmd {
                            Some(Command::Close) | None => break 'session,
                            Some(Command::Send(_)) => {
                                // No transport to send on; the backoff
                                // keeps running.
                                tracing::debug!("Dropped outbound message while disconnected");
                            }
                        },
                    }
                }
            }
        };

        attempt = 0;
        *shared.state.write().await = SessionState::Open;
        tracing::info!(url = %config.url, "Feed session open");

        let (mut sink, mut stream) = ws.split();

        // First action after the handshake: ask for the initial snapshot
        if send_json(&mut sink, &ClientMessage::RequestInitialData)
            .await
            .is_err()
        {
            tracing::debug!("Initial-data request failed, reconnecting");
            attempt = 1;
            continue 'session;
        }

        loop {
            tokio::select! {
                cmd = commands.recv() => match cmd {
                    Some(Command::Send(message)) => {
                        if send_json(&mut sink, &message).await.is_err() {
                            break;
                        }
                    }
                    Some(Command::Close) | None => {
                        *shared.state.write().await = SessionState::Closing;
                        let _ = sink.send(tungstenite::Message::Close(None)).await;
                        break 'session;
                    }
                },
                frame = stream.next() => match frame {
                    Some(Ok(tungstenite::Message::Text(text))) => {
                        handle_frame(&text, &shared, &updates).await;
                    }
                    Some(Ok(tungstenite::Message::Close(_))) | None => {
                        tracing::debug!("Feed closed by server");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::debug!(error = %e, "Feed transport error");
                        break;
                    }
                },
            }
        }

        // Abnormal end: transport dropped without a local close request.
        attempt += 1;
        if attempt > config.max_reconnect_attempts {
            tracing::warn!("Max reconnect attempts reached");
            break 'session;
        }
        let delay = backoff_delay(&config, attempt - 1);
        tracing::debug!(attempt, delay_ms = delay.as_millis() as u64, "Reconnecting");
        *shared.state.write().await = SessionState::Connecting;
        tokio::time::sleep(delay).await;
    }

    *shared.state.write().await = SessionState::Closed;
    tracing::debug!("Feed session closed");
}

async fn send_json(
    sink: &mut futures_util::stream::SplitSink<WsStream, tungstenite::Message>,
    message: &ClientMessage,
) -> Result<(), SessionError> {
    let text = serde_json::to_string(message).map_err(|_| SessionError::Encode)?;
    sink.send(tungstenite::Message::Text(text))
        .await
        .map_err(|_| SessionError::Transport)
}

/// Decode one server frame and apply it to local state.
///
/// Malformed frames are logged and dropped; the session stays open.
async fn handle_frame(text: &str, shared: &Shared, updates: &mpsc::UnboundedSender<FeedUpdate>) {
    let message: ServerMessage = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(e) => {
            tracing::debug!(error = %e, "Dropped malformed server message");
            return;
        }
    };

    match message {
        ServerMessage::Connected { connection_id } => {
            tracing::debug!(connection_id = %connection_id, "Feed handshake acknowledged");
        }
        ServerMessage::PollutionUpdate(reading) => {
            *shared.current.write().await = Some(reading.clone());
            shared.history.lock().await.append(reading.clone());
            let _ = updates.send(FeedUpdate::Pollution(reading));
        }
        ServerMessage::LocationUpdate(locations) => {
            *shared.locations.write().await = locations.clone();
            let _ = updates.send(FeedUpdate::Locations(locations));
        }
        ServerMessage::HistoricalData(readings) => {
            let mut history = shared.history.lock().await;
            *history = HistoryBuffer::new(history.capacity());
            for reading in &readings {
                history.append(reading.clone());
            }
            drop(history);
            let _ = updates.send(FeedUpdate::Historical(readings));
        }
        ServerMessage::ChatResponse { message } => {
            let _ = updates.send(FeedUpdate::Chat(message));
        }
        ServerMessage::Pong => {}
        ServerMessage::Error { message } => {
            tracing::warn!(message = %message, "Feed server reported an error");
        }
    }
}

/// Errors surfaced to the session's caller
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session is closed")]
    Closed,

    #[error("Failed to encode message")]
    Encode,

    #[error("Transport send failed")]
    Transport,
}
