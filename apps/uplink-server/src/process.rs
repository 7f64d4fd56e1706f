//! Processing seam behind the upload endpoint.
//!
//! The actual work done on an uploaded file is an external collaborator;
//! the endpoint only needs something that can emit progress pushes while it
//! runs and hand back pre-rendered markup when it finishes.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use maud::html;
use tracing::debug;
use uplink_protocol::ServerFrame;

use crate::channels::ChannelRegistry;

const RECEIVED_TEXT: &str = "Fichier téléversé, traitement en cours";
const DONE_TEXT: &str = "Traitement terminé, le résultat arrive";

/// An upload spooled to disk, ready for processing.
#[derive(Debug, Clone)]
pub struct StoredUpload {
    pub original_name: String,
    pub stored_path: PathBuf,
    pub size_bytes: u64,
    pub content_type: Option<String>,
}

/// Progress outlet bound to the upload's correlated channel. Pushes on an
/// uncorrelated upload go nowhere.
pub struct ProgressSink {
    registry: Arc<ChannelRegistry>,
    sid: String,
}

impl ProgressSink {
    pub fn new(registry: Arc<ChannelRegistry>, sid: String) -> Self {
        Self { registry, sid }
    }

    /// Push one status text. Returns whether a live channel accepted it.
    pub async fn notify(&self, text: &str) -> bool {
        let delivered = self
            .registry
            .push(
                &self.sid,
                ServerFrame::DisplayMessage {
                    data: text.to_string(),
                },
            )
            .await;
        if !delivered {
            debug!(sid = %self.sid, "progress push not delivered");
        }
        delivered
    }
}

#[async_trait]
pub trait UploadProcessor: Send + Sync {
    /// Process one stored upload, pushing progress as work advances, and
    /// return the pre-rendered result markup for the response body.
    async fn process(&self, upload: &StoredUpload, progress: &ProgressSink) -> String;
}

/// Default processor: announces receipt, waits out the configured delay in
/// place of real work, announces completion and returns a summary of the
/// stored file.
pub struct FileSummaryProcessor {
    delay: Duration,
}

impl FileSummaryProcessor {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl UploadProcessor for FileSummaryProcessor {
    async fn process(&self, upload: &StoredUpload, progress: &ProgressSink) -> String {
        progress.notify(RECEIVED_TEXT).await;

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        progress.notify(DONE_TEXT).await;

        let markup = html! {
            div class="text-center" {
                p { "Fichier traité : " (upload.original_name) }
                p class="text-muted" { (upload.size_bytes) " octets" }
            }
        };
        markup.into_string()
    }
}
