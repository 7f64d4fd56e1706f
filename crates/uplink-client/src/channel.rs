//! Persistent notification channel management.

use crate::error::{ClientError, Result};
use futures_util::{SinkExt, StreamExt, stream::SplitSink};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{Mutex, RwLock, mpsc, oneshot};
use tokio::time::timeout;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use tracing::{debug, warn};
use uplink_protocol::{
    ClientFrame, ServerFrame, StatusMessage, encode_client_frame, parse_server_frame,
};
use url::Url;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWriter = SplitSink<WsStream, Message>;

/// Payload of the one-time connected-announcement.
const HELLO_DATA: &str = "New client!";

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Channel connection configuration.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Bounds both the socket handshake and the wait for the server's
    /// `connected` frame.
    pub connect_timeout: Duration,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// One persistent notification channel for one page session.
///
/// The channel identifier is assigned by the server when the channel opens
/// and is only readable after [`connect`](Self::connect) returns. Connection
/// loss is not recovered here: pushes simply stop arriving.
pub struct ChannelConnection {
    url: Url,
    config: ChannelConfig,
    state: Arc<RwLock<ConnectionState>>,
    sid: Arc<RwLock<Option<String>>>,
    writer: Arc<Mutex<Option<WsWriter>>>,
    incoming_tx: mpsc::UnboundedSender<StatusMessage>,
    incoming_rx: Arc<Mutex<mpsc::UnboundedReceiver<StatusMessage>>>,
    recv_task: Arc<Mutex<Option<tokio::task::JoinHandle<()>>>>,
}

impl ChannelConnection {
    /// Create a new channel connection with default config.
    pub fn new(url: &str) -> Result<Self> {
        Self::with_config(url, ChannelConfig::default())
    }

    /// Create a new channel connection with custom config.
    pub fn with_config(url: &str, config: ChannelConfig) -> Result<Self> {
        let parsed_url = Url::parse(url)?;
        if parsed_url.scheme() != "ws" && parsed_url.scheme() != "wss" {
            return Err(ClientError::InvalidUrl(format!(
                "URL must use ws:// or wss:// scheme, got: {}",
                parsed_url.scheme()
            )));
        }

        let (incoming_tx, incoming_rx) = mpsc::unbounded_channel();

        Ok(Self {
            url: parsed_url,
            config,
            state: Arc::new(RwLock::new(ConnectionState::Disconnected)),
            sid: Arc::new(RwLock::new(None)),
            writer: Arc::new(Mutex::new(None)),
            incoming_tx,
            incoming_rx: Arc::new(Mutex::new(incoming_rx)),
            recv_task: Arc::new(Mutex::new(None)),
        })
    }

    /// Channel URL as string.
    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Current connection state.
    pub async fn state(&self) -> ConnectionState {
        *self.state.read().await
    }

    /// Channel identifier. `None` until the server's `connected` frame has
    /// been received; retains the last value after a disconnect, in which
    /// case it is stale and the server can no longer correlate pushes to it.
    pub async fn sid(&self) -> Option<String> {
        self.sid.read().await.clone()
    }

    /// Open the channel: establish the socket, wait for the identifier, then
    /// emit the one-time connected-announcement.
    pub async fn connect(&self) -> Result<()> {
        let mut state_guard = self.state.write().await;
        if *state_guard == ConnectionState::Connected {
            return Err(ClientError::AlreadyConnected);
        }
        *state_guard = ConnectionState::Connecting;
        drop(state_guard);

        let connect_result = timeout(
            self.config.connect_timeout,
            connect_async(self.url.as_str()),
        )
        .await;
        let (stream, _response) = match connect_result {
            Ok(Ok(connected)) => connected,
            Ok(Err(error)) => {
                *self.state.write().await = ConnectionState::Disconnected;
                return Err(ClientError::WebSocket(error.to_string()));
            }
            Err(_) => {
                *self.state.write().await = ConnectionState::Disconnected;
                return Err(ClientError::Timeout(format!(
                    "connection timeout after {:?}",
                    self.config.connect_timeout
                )));
            }
        };
        let (writer, mut reader) = stream.split();
        *self.writer.lock().await = Some(writer);

        let (sid_tx, sid_rx) = oneshot::channel::<String>();
        let mut sid_tx = Some(sid_tx);
        let incoming_tx = self.incoming_tx.clone();
        let state = Arc::clone(&self.state);
        let channel_url = self.url.to_string();

        let task = tokio::spawn(async move {
            while let Some(frame) = reader.next().await {
                match frame {
                    Ok(Message::Text(text)) => match parse_server_frame(text.as_str()) {
                        Ok(Some(ServerFrame::Connected { sid })) => {
                            if let Some(tx) = sid_tx.take() {
                                let _ = tx.send(sid);
                            } else {
                                warn!("duplicate connected frame on {}", channel_url);
                            }
                        }
                        Ok(Some(ServerFrame::DisplayMessage { data })) => {
                            if incoming_tx.send(StatusMessage { data }).is_err() {
                                break;
                            }
                        }
                        Ok(None) => {
                            debug!("ignoring unknown frame on {}", channel_url);
                        }
                        Err(error) => {
                            warn!("protocol parse error on {}: {}", channel_url, error);
                        }
                    },
                    Ok(Message::Ping(payload)) => {
                        debug!("received ping from {} ({} bytes)", channel_url, payload.len());
                    }
                    Ok(Message::Pong(_)) => {}
                    Ok(Message::Close(_)) => break,
                    Ok(Message::Binary(_)) => {}
                    Ok(Message::Frame(_)) => {}
                    Err(error) => {
                        warn!("websocket read error on {}: {}", channel_url, error);
                        break;
                    }
                }
            }

            // No reconnection: pushes simply stop arriving.
            *state.write().await = ConnectionState::Disconnected;
        });

        if let Some(previous) = self.recv_task.lock().await.replace(task) {
            previous.abort();
        }

        let sid = match timeout(self.config.connect_timeout, sid_rx).await {
            Ok(Ok(sid)) => sid,
            Ok(Err(_)) => {
                self.abort_connection().await;
                return Err(ClientError::Connection(
                    "channel closed before the connected frame".to_string(),
                ));
            }
            Err(_) => {
                self.abort_connection().await;
                return Err(ClientError::Timeout(format!(
                    "no connected frame within {:?}",
                    self.config.connect_timeout
                )));
            }
        };

        *self.sid.write().await = Some(sid);
        *self.state.write().await = ConnectionState::Connected;

        let hello = ClientFrame::ClientConnected {
            data: HELLO_DATA.to_string(),
        };
        if let Err(error) = self.send_frame(&hello).await {
            self.abort_connection().await;
            return Err(error);
        }

        Ok(())
    }

    /// Tear down a half-open connection: no close handshake, just stop the
    /// receive task, drop the writer and fall back to `Disconnected`.
    async fn abort_connection(&self) {
        if let Some(task) = self.recv_task.lock().await.take() {
            task.abort();
        }
        *self.writer.lock().await = None;
        *self.state.write().await = ConnectionState::Disconnected;
    }

    /// Close the channel and stop the background receive task.
    pub async fn disconnect(&self) -> Result<()> {
        if let Some(mut writer) = self.writer.lock().await.take() {
            writer
                .send(Message::Close(None))
                .await
                .map_err(|error| ClientError::WebSocket(error.to_string()))?;
        }

        if let Some(task) = self.recv_task.lock().await.take() {
            task.abort();
        }

        *self.state.write().await = ConnectionState::Disconnected;
        Ok(())
    }

    /// Receive the next pushed status message, in transport order. Returns
    /// `None` once the channel is gone and drained.
    pub async fn recv(&self) -> Option<StatusMessage> {
        self.incoming_rx.lock().await.recv().await
    }

    async fn send_frame(&self, frame: &ClientFrame) -> Result<()> {
        let text = encode_client_frame(frame)?;
        let mut writer_guard = self.writer.lock().await;
        let writer = writer_guard.as_mut().ok_or(ClientError::NotConnected)?;
        writer
            .send(Message::Text(text))
            .await
            .map_err(|error| ClientError::WebSocket(error.to_string()))
    }
}
