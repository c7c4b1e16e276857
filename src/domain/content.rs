use serde::{Deserialize, Serialize};

/// Tagged representation of what a submission carries. The core never
/// inspects media bytes; variants exist so the transport can pick the right
/// forwarding call per kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContentPayload {
    Text {
        text: String,
    },
    Photo {
        file_id: String,
        #[serde(default)]
        caption: Option<String>,
    },
    Video {
        file_id: String,
        #[serde(default)]
        caption: Option<String>,
    },
    Document {
        file_id: String,
        #[serde(default)]
        caption: Option<String>,
    },
    Voice {
        file_id: String,
    },
    Sticker {
        file_id: String,
    },
    /// Anything the transport can copy but the core has no variant for.
    Other,
}

impl ContentPayload {
    pub fn kind(&self) -> &'static str {
        match self {
            ContentPayload::Text { .. } => "text",
            ContentPayload::Photo { .. } => "photo",
            ContentPayload::Video { .. } => "video",
            ContentPayload::Document { .. } => "document",
            ContentPayload::Voice { .. } => "voice",
            ContentPayload::Sticker { .. } => "sticker",
            ContentPayload::Other => "other",
        }
    }
}
