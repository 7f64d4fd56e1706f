//! Uplink server: the notification channel and the upload endpoint.
//!
//! The contract with the client core is small: `GET /test` upgrades to the
//! persistent channel and announces the channel identifier, `POST /view`
//! accepts a multipart form whose `sid` field correlates the upload to one
//! open channel, and everything pushed for that sid while the request is
//! pending lands on that channel.

use std::sync::Arc;

use axum::{
    Router,
    extract::{
        DefaultBodyLimit, Multipart, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};
use uplink_protocol::{
    CHANNEL_PATH, ClientFrame, FILE_FIELD, SID_FIELD, ServerFrame, UPLOAD_PATH,
    encode_server_frame, parse_client_frame,
};

pub mod channels;
pub mod config;
pub mod process;
pub mod render;


use crate::channels::ChannelRegistry;
use crate::config::Config;
use crate::process::{FileSummaryProcessor, ProgressSink, StoredUpload, UploadProcessor};

#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    channels: Arc<ChannelRegistry>,
    processor: Arc<dyn UploadProcessor>,
}

impl AppState {
    #[must_use]
    pub fn new(config: Config) -> Self {
        let processor = Arc::new(FileSummaryProcessor::new(config.process_delay));
        Self::with_processor(config, processor)
    }

    #[must_use]
    pub fn with_processor(config: Config, processor: Arc<dyn UploadProcessor>) -> Self {
        Self {
            config: Arc::new(config),
            channels: Arc::new(ChannelRegistry::new()),
            processor,
        }
    }

    pub fn channels(&self) -> Arc<ChannelRegistry> {
        Arc::clone(&self.channels)
    }
}

pub fn build_router(state: AppState) -> Router {
    let max_upload_bytes = state.config.max_upload_bytes;
    Router::new()
        .route("/", get(upload_page))
        .route("/healthz", get(healthz))
        .route(CHANNEL_PATH, get(channel_ws))
        .route(UPLOAD_PATH, post(view_upload))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Error)]
enum UploadError {
    #[error("invalid multipart body: {0}")]
    BadMultipart(String),

    #[error("no file provided")]
    MissingFile,

    #[error("failed to store upload: {0}")]
    Storage(#[from] std::io::Error),
}

impl IntoResponse for UploadError {
    fn into_response(self) -> Response {
        let status = match &self {
            UploadError::BadMultipart(_) => StatusCode::BAD_REQUEST,
            UploadError::MissingFile => StatusCode::UNPROCESSABLE_ENTITY,
            UploadError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Html(render::error_fragment(&self.to_string()))).into_response()
    }
}

async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

async fn upload_page() -> Html<String> {
    Html(render::upload_page())
}

async fn channel_ws(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| channel_stream(state, socket))
}

/// One task per open channel: announce the identifier first, then fan
/// registry frames out to the socket until either side goes away.
async fn channel_stream(state: AppState, mut socket: WebSocket) {
    let (sid, mut outbound) = state.channels.register().await;
    info!(%sid, "notification channel opened");

    let connected = ServerFrame::Connected { sid: sid.clone() };
    match encode_server_frame(&connected) {
        Ok(payload) => {
            if socket.send(Message::Text(payload)).await.is_err() {
                state.channels.unregister(&sid).await;
                return;
            }
        }
        Err(error) => {
            warn!(%sid, "failed to encode connected frame: {error}");
            state.channels.unregister(&sid).await;
            return;
        }
    }

    loop {
        tokio::select! {
            frame = outbound.recv() => {
                let Some(frame) = frame else { break };
                let Ok(payload) = encode_server_frame(&frame) else {
                    continue;
                };
                if socket.send(Message::Text(payload)).await.is_err() {
                    break;
                }
            }
            inbound = socket.recv() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => match parse_client_frame(&text) {
                        Ok(Some(ClientFrame::ClientConnected { data })) => {
                            info!(%sid, %data, "client connected announcement");
                        }
                        Ok(None) => debug!(%sid, "ignoring unknown client frame"),
                        Err(error) => warn!(%sid, "client frame parse error: {error}"),
                    },
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(error)) => {
                        warn!(%sid, "channel read error: {error}");
                        break;
                    }
                }
            }
        }
    }

    state.channels.unregister(&sid).await;
    info!(%sid, "notification channel closed");
}

/// The upload endpoint. Collects the `sid` and file fields, spools the file
/// to disk, then runs the processor and answers with its pre-rendered
/// markup. The processor's progress pushes go out over the correlated
/// channel while this request is still pending.
async fn view_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Html<String>, UploadError> {
    let mut sid = String::new();
    let mut file: Option<(String, Option<String>, Vec<u8>)> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(error) => return Err(UploadError::BadMultipart(error.to_string())),
        };

        let name = field.name().unwrap_or_default().to_string();
        if name == SID_FIELD {
            sid = field
                .text()
                .await
                .map_err(|error| UploadError::BadMultipart(error.to_string()))?;
        } else if name == FILE_FIELD {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let content_type = field.content_type().map(str::to_string);
            let bytes = field
                .bytes()
                .await
                .map_err(|error| UploadError::BadMultipart(error.to_string()))?;
            if file_name.is_empty() {
                return Err(UploadError::MissingFile);
            }
            file = Some((file_name, content_type, bytes.to_vec()));
        } else {
            // Remaining form fields ride along; nothing here consumes them.
            let value = field.text().await.unwrap_or_default();
            debug!(%name, %value, "ignoring extra form field");
        }
    }

    let Some((file_name, content_type, bytes)) = file else {
        return Err(UploadError::MissingFile);
    };

    if sid.is_empty() {
        debug!("upload without a sid; progress pushes cannot be correlated");
    }

    let stored_name = stored_file_name(&file_name, &sid);
    let stored_path = state.config.upload_dir.join(&stored_name);
    tokio::fs::create_dir_all(&state.config.upload_dir).await?;
    tokio::fs::write(&stored_path, &bytes).await?;
    info!(%sid, file = %file_name, stored = %stored_path.display(), "upload spooled");

    let upload = StoredUpload {
        original_name: file_name,
        stored_path,
        size_bytes: bytes.len() as u64,
        content_type,
    };
    let progress = ProgressSink::new(state.channels(), sid);
    let markup = state.processor.process(&upload, &progress).await;

    Ok(Html(markup))
}

/// Disk name for a spooled upload: sanitized stem, the correlating sid (or
/// a placeholder), original extension.
fn stored_file_name(original: &str, sid: &str) -> String {
    let sanitized: String = original
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let sanitized = if sanitized.trim_matches('.').is_empty() {
        "upload".to_string()
    } else {
        sanitized
    };

    let tag = if sid.is_empty() { "anonymous" } else { sid };
    match sanitized.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem}.{tag}.{ext}"),
        _ => format!("{sanitized}.{tag}"),
    }
}
