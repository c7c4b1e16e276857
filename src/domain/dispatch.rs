use serde::{Deserialize, Serialize};

/// One reviewer that successfully received a review panel for a request.
/// The panel message id is the affordance reference used for retraction;
/// panels live in the reviewer's private chat, so the reviewer id doubles
/// as the chat id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchEntry {
    pub reviewer_id: i64,
    pub panel_message_id: i64,
}
