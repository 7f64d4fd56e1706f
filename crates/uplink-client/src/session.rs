//! The page-session context object.
//!
//! Owns the channel handle, the display region state machine and the upload
//! coordinator, and spawns the dispatcher task. Both asynchronous sources
//! (the in-flight request and the push stream) funnel through the same
//! machine, so their race is reduced to lock acquisition order, and the
//! machine's terminal-state guard keeps late pushes from regressing the
//! final view.

use crate::channel::{ChannelConfig, ChannelConnection};
use crate::dispatch::NotificationDispatcher;
use crate::error::{ClientError, Result};
use crate::render::{RenderEvent, RenderState, RenderStateMachine};
use crate::upload::{UploadCoordinator, UploadForm};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::warn;

/// One browser-page-equivalent session: one channel, one display region,
/// at most one upload in flight.
pub struct UploadSession {
    channel: Option<Arc<ChannelConnection>>,
    coordinator: UploadCoordinator,
    machine: Arc<Mutex<RenderStateMachine>>,
    dispatcher_task: Option<tokio::task::JoinHandle<()>>,
}

impl UploadSession {
    /// Open a session: connect the notification channel and wire the
    /// dispatcher. A channel that fails to connect leaves the session in
    /// degraded mode: uploads still go out, pushes never arrive.
    pub async fn connect(channel_url: &str, upload_url: &str) -> Result<Self> {
        Self::connect_with_config(channel_url, upload_url, ChannelConfig::default()).await
    }

    pub async fn connect_with_config(
        channel_url: &str,
        upload_url: &str,
        config: ChannelConfig,
    ) -> Result<Self> {
        let coordinator = UploadCoordinator::new(upload_url)?;
        let channel = ChannelConnection::with_config(channel_url, config)?;
        let channel = match channel.connect().await {
            Ok(()) => Some(Arc::new(channel)),
            Err(error) => {
                warn!("notification channel unavailable, continuing degraded: {error}");
                None
            }
        };
        Ok(Self::assemble(channel, coordinator))
    }

    /// Build a session from already-constructed parts. The channel, when
    /// present, must already be connected.
    pub fn new(channel: Option<Arc<ChannelConnection>>, coordinator: UploadCoordinator) -> Self {
        Self::assemble(channel, coordinator)
    }

    fn assemble(
        channel: Option<Arc<ChannelConnection>>,
        coordinator: UploadCoordinator,
    ) -> Self {
        let machine = Arc::new(Mutex::new(RenderStateMachine::new()));
        let dispatcher_task = channel.as_ref().map(|channel| {
            let dispatcher = NotificationDispatcher::new(Arc::clone(&machine));
            tokio::spawn(dispatcher.run(Arc::clone(channel)))
        });
        Self {
            channel,
            coordinator,
            machine,
            dispatcher_task,
        }
    }

    /// Channel identifier, read live. `None` while the channel has not
    /// connected (or never will).
    pub async fn sid(&self) -> Option<String> {
        match &self.channel {
            Some(channel) => channel.sid().await,
            None => None,
        }
    }

    pub async fn state(&self) -> RenderState {
        self.machine.lock().await.state()
    }

    /// Current contents of the display region.
    pub async fn render(&self) -> String {
        self.machine.lock().await.contents().to_string()
    }

    /// Submit the form. Rejected while a prior upload is still pending; the
    /// identifier is read at submit time, never cached, and an absent one is
    /// sent as an empty `sid` rather than blocking the request.
    pub async fn submit(&self, form: UploadForm) -> Result<()> {
        {
            let mut machine = self.machine.lock().await;
            if !machine.can_submit() {
                return Err(ClientError::UploadInFlight);
            }
            machine.apply(RenderEvent::SubmitStarted);
        }

        let sid = self.sid().await.unwrap_or_default();
        match self.coordinator.submit(form, &sid).await {
            Ok(body) => {
                self.machine
                    .lock()
                    .await
                    .apply(RenderEvent::UploadCompleted(body));
                Ok(())
            }
            Err(error) => {
                self.machine
                    .lock()
                    .await
                    .apply(RenderEvent::UploadFailed(error.to_string()));
                Err(error)
            }
        }
    }

    /// Return a terminal region to `Idle`.
    pub async fn reset(&self) -> bool {
        self.machine.lock().await.apply(RenderEvent::Reset)
    }

    /// Tear the session down: stop dispatching and close the channel.
    pub async fn close(&mut self) {
        if let Some(task) = self.dispatcher_task.take() {
            task.abort();
        }
        if let Some(channel) = &self.channel {
            if let Err(error) = channel.disconnect().await {
                warn!("channel close failed: {error}");
            }
        }
    }
}

impl Drop for UploadSession {
    fn drop(&mut self) {
        if let Some(task) = self.dispatcher_task.take() {
            task.abort();
        }
    }
}
