//! Routing of inbound pushes into the render state machine.

use crate::channel::ChannelConnection;
use crate::render::{RenderEvent, RenderStateMachine};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;
use uplink_protocol::StatusMessage;

/// Forwards each received status message, unmodified and in transport order,
/// into the state machine. No de-duplication, no sequencing: if the server
/// sends duplicates they all render, last write wins.
#[derive(Clone)]
pub struct NotificationDispatcher {
    machine: Arc<Mutex<RenderStateMachine>>,
}

impl NotificationDispatcher {
    pub fn new(machine: Arc<Mutex<RenderStateMachine>>) -> Self {
        Self { machine }
    }

    /// Route one status message. Returns whether the machine accepted it;
    /// pushes arriving outside an active upload are dropped by the machine.
    pub async fn dispatch(&self, message: StatusMessage) -> bool {
        let accepted = self
            .machine
            .lock()
            .await
            .apply(RenderEvent::Status(message));
        if !accepted {
            debug!("dropped status push outside an active upload");
        }
        accepted
    }

    /// Page-lifetime loop: drain the channel until it closes.
    pub async fn run(self, channel: Arc<ChannelConnection>) {
        while let Some(message) = channel.recv().await {
            self.dispatch(message).await;
        }
        debug!("notification channel drained; no further pushes will render");
    }
}
