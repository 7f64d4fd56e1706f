//! Registry of open notification channels, keyed by channel identifier.
//!
//! The identifier is the correlation key: an upload carrying a sid reaches
//! the one channel registered under it. A push to a blank, unknown or
//! already-closed sid is dropped silently. The uploader just sees no
//! updates, never an error.

use std::collections::HashMap;

use tokio::sync::{Mutex, mpsc};
use tracing::debug;
use uplink_protocol::ServerFrame;
use uuid::Uuid;

#[derive(Default)]
pub struct ChannelRegistry {
    channels: Mutex<HashMap<String, mpsc::UnboundedSender<ServerFrame>>>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a channel slot: assigns a fresh identifier and hands back the
    /// receiving half that the socket task drains.
    pub async fn register(&self) -> (String, mpsc::UnboundedReceiver<ServerFrame>) {
        let sid = Uuid::new_v4().to_string();
        let (tx, rx) = mpsc::unbounded_channel();
        self.channels.lock().await.insert(sid.clone(), tx);
        (sid, rx)
    }

    pub async fn unregister(&self, sid: &str) {
        self.channels.lock().await.remove(sid);
    }

    /// Push a frame to the channel registered under `sid`. Returns whether
    /// a live channel accepted it.
    pub async fn push(&self, sid: &str, frame: ServerFrame) -> bool {
        if sid.is_empty() {
            debug!("push without a sid; dropping frame");
            return false;
        }
        let channels = self.channels.lock().await;
        match channels.get(sid) {
            Some(tx) => tx.send(frame).is_ok(),
            None => {
                debug!(%sid, "push to unknown channel; dropping frame");
                false
            }
        }
    }

    pub async fn is_connected(&self, sid: &str) -> bool {
        self.channels.lock().await.contains_key(sid)
    }

    pub async fn len(&self) -> usize {
        self.channels.lock().await.len()
    }
}
