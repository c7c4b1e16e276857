//! Transport seam between the lifecycle engine and the chat platform.
//!
//! Every call is fallible per-reviewer; the caller decides whether a failure
//! is skip-and-continue (fan-out, retraction) or log-and-move-on (forward,
//! notifications). Nothing here is allowed to abort a resolution.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{ContentPayload, Origin, RequestToken};

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("delivery failed: {0}")]
    Delivery(String),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// What the core needs from the chat platform. Implemented by the Bot API
/// adapter in production and by a scripted fake in tests.
#[async_trait]
pub trait ReviewTransport: Send + Sync {
    /// Copy the submission content into a reviewer's chat. Returns the id
    /// of the copied message.
    async fn deliver_copy(
        &self,
        reviewer_id: i64,
        origin: &Origin,
        content: &ContentPayload,
    ) -> TransportResult<i64>;

    /// Send the accept/reject panel to a reviewer. Returns the panel
    /// message id (the affordance reference).
    async fn send_panel(&self, reviewer_id: i64, token: &RequestToken) -> TransportResult<i64>;

    /// Strip the affordance from a previously sent panel.
    async fn retract_panel(&self, reviewer_id: i64, panel_message_id: i64) -> TransportResult<()>;

    /// Forward the submission into the target destination, optionally into
    /// a sub-destination (topic). A topic id of 0 is a valid topic.
    async fn forward(
        &self,
        origin: &Origin,
        content: &ContentPayload,
        target_chat: i64,
        target_topic: Option<i64>,
    ) -> TransportResult<()>;

    /// Plain text message to a chat.
    async fn send_text(&self, chat_id: i64, text: &str) -> TransportResult<()>;

    /// Acknowledge a reviewer's button press, optionally with a toast.
    async fn answer_callback(
        &self,
        callback_id: &str,
        text: Option<&str>,
    ) -> TransportResult<()>;

    /// Upload a document to a chat (archive bundle export).
    async fn send_document(
        &self,
        chat_id: i64,
        filename: &str,
        bytes: Vec<u8>,
        caption: &str,
    ) -> TransportResult<()>;
}
