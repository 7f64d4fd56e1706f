//! Client-resident core of the uplink system.
//!
//! A page session holds one persistent notification channel and one display
//! region. Submitting an upload attaches the channel identifier to the
//! request so server-side progress lands back on the session that started
//! it. The pieces:
//! - [`channel`]: the persistent channel and its identifier
//! - [`upload`]: one-shot multipart submission
//! - [`render`]: the display region state machine
//! - [`dispatch`]: routing of inbound pushes into the state machine
//! - [`session`]: the context object binding the four together

pub mod channel;
pub mod dispatch;
pub mod error;
pub mod render;
pub mod session;
pub mod upload;

pub use channel::{ChannelConfig, ChannelConnection, ConnectionState};
pub use dispatch::NotificationDispatcher;
pub use error::{ClientError, Result};
pub use render::{DisplayRegion, RenderEvent, RenderState, RenderStateMachine};
pub use session::UploadSession;
pub use upload::{FileField, UploadCoordinator, UploadForm};
