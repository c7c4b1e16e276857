//! Telegram Bot API transport
//!
//! Thin typed client over the HTTP Bot API: long-poll update stream plus
//! the handful of methods the relay needs (copyMessage, sendMessage,
//! editMessageReplyMarkup, answerCallbackQuery, sendDocument).

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use super::transport::{ReviewTransport, TransportError, TransportResult};
use crate::domain::{ContentPayload, Decision, Origin, RequestToken, ReviewAction};

const API_BASE: &str = "https://api.telegram.org";

/// Bot API response envelope. A missing `result` field deserializes as
/// `None` without a `Default` bound on `T`.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessageId {
    message_id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    #[serde(default)]
    pub from: Option<User>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub photo: Option<Vec<PhotoSize>>,
    #[serde(default)]
    pub video: Option<FileRef>,
    #[serde(default)]
    pub document: Option<FileRef>,
    #[serde(default)]
    pub voice: Option<FileRef>,
    #[serde(default)]
    pub sticker: Option<FileRef>,
}

impl Message {
    pub fn is_private(&self) -> bool {
        self.chat.kind == "private"
    }

    /// Map the message onto the core's content model. Largest photo size
    /// wins; anything unrecognized is still copyable as `Other`.
    pub fn content(&self) -> ContentPayload {
        if let Some(text) = &self.text {
            return ContentPayload::Text { text: text.clone() };
        }
        if let Some(sizes) = &self.photo {
            if let Some(largest) = sizes.last() {
                return ContentPayload::Photo {
                    file_id: largest.file_id.clone(),
                    caption: self.caption.clone(),
                };
            }
        }
        if let Some(video) = &self.video {
            return ContentPayload::Video {
                file_id: video.file_id.clone(),
                caption: self.caption.clone(),
            };
        }
        if let Some(document) = &self.document {
            return ContentPayload::Document {
                file_id: document.file_id.clone(),
                caption: self.caption.clone(),
            };
        }
        if let Some(voice) = &self.voice {
            return ContentPayload::Voice {
                file_id: voice.file_id.clone(),
            };
        }
        if let Some(sticker) = &self.sticker {
            return ContentPayload::Sticker {
                file_id: sticker.file_id.clone(),
            };
        }
        ContentPayload::Other
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhotoSize {
    pub file_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FileRef {
    pub file_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub message: Option<Message>,
}

/// Telegram transport client
#[derive(Clone)]
pub struct TelegramTransport {
    client: Client,
    base_url: String,
}

impl TelegramTransport {
    pub fn new(bot_token: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: format!("{}/bot{}", API_BASE, bot_token),
        }
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, payload: Value) -> TransportResult<T> {
        let url = format!("{}/{}", self.base_url, method);
        let resp = self.client.post(&url).json(&payload).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(TransportError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: ApiResponse<T> = resp.json().await?;
        if !envelope.ok {
            return Err(TransportError::Delivery(
                envelope
                    .description
                    .unwrap_or_else(|| format!("{} returned ok=false", method)),
            ));
        }
        envelope
            .result
            .ok_or_else(|| TransportError::Delivery(format!("{} returned no result", method)))
    }

    /// Long-poll the update stream. `timeout_secs` is the server-side hold;
    /// the HTTP timeout is padded past it.
    pub async fn get_updates(&self, offset: i64, timeout_secs: u64) -> TransportResult<Vec<Update>> {
        let url = format!("{}/getUpdates", self.base_url);
        let resp = self
            .client
            .post(&url)
            .timeout(Duration::from_secs(timeout_secs + 10))
            .json(&json!({
                "offset": offset,
                "timeout": timeout_secs,
                "allowed_updates": ["message", "callback_query"],
            }))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(TransportError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: ApiResponse<Vec<Update>> = resp.json().await?;
        if !envelope.ok {
            return Err(TransportError::Delivery(
                envelope
                    .description
                    .unwrap_or_else(|| "getUpdates returned ok=false".to_string()),
            ));
        }
        Ok(envelope.result.unwrap_or_default())
    }

    fn panel_keyboard(token: &RequestToken) -> Value {
        json!({
            "inline_keyboard": [[
                {
                    "text": "Send \u{2705}",
                    "callback_data": ReviewAction::encode(Decision::Accept, token),
                },
                {
                    "text": "Reject \u{274C}",
                    "callback_data": ReviewAction::encode(Decision::Reject, token),
                },
            ]]
        })
    }
}

#[async_trait]
impl ReviewTransport for TelegramTransport {
    async fn deliver_copy(
        &self,
        reviewer_id: i64,
        origin: &Origin,
        content: &ContentPayload,
    ) -> TransportResult<i64> {
        debug!(reviewer_id, kind = content.kind(), "copying submission to reviewer");
        let copied: MessageId = self
            .call(
                "copyMessage",
                json!({
                    "chat_id": reviewer_id,
                    "from_chat_id": origin.chat_id,
                    "message_id": origin.message_id,
                }),
            )
            .await?;
        Ok(copied.message_id)
    }

    async fn send_panel(&self, reviewer_id: i64, token: &RequestToken) -> TransportResult<i64> {
        let panel: MessageId = self
            .call(
                "sendMessage",
                json!({
                    "chat_id": reviewer_id,
                    "text": "What do we do with this submission?",
                    "reply_markup": Self::panel_keyboard(token),
                }),
            )
            .await?;
        Ok(panel.message_id)
    }

    async fn retract_panel(&self, reviewer_id: i64, panel_message_id: i64) -> TransportResult<()> {
        let _: Value = self
            .call(
                "editMessageReplyMarkup",
                json!({
                    "chat_id": reviewer_id,
                    "message_id": panel_message_id,
                    "reply_markup": { "inline_keyboard": [] },
                }),
            )
            .await?;
        Ok(())
    }

    async fn forward(
        &self,
        origin: &Origin,
        content: &ContentPayload,
        target_chat: i64,
        target_topic: Option<i64>,
    ) -> TransportResult<()> {
        match content {
            // Text survives even if the original message is gone; everything
            // else is copied from the origin, which also strips the sender.
            ContentPayload::Text { text } => {
                let mut payload = json!({
                    "chat_id": target_chat,
                    "text": text,
                });
                if let Some(topic) = target_topic {
                    payload["message_thread_id"] = json!(topic);
                }
                let _: MessageId = self.call("sendMessage", payload).await?;
            }
            _ => {
                let mut payload = json!({
                    "chat_id": target_chat,
                    "from_chat_id": origin.chat_id,
                    "message_id": origin.message_id,
                });
                if let Some(topic) = target_topic {
                    payload["message_thread_id"] = json!(topic);
                }
                let _: MessageId = self.call("copyMessage", payload).await?;
            }
        }
        Ok(())
    }

    async fn send_text(&self, chat_id: i64, text: &str) -> TransportResult<()> {
        let _: MessageId = self
            .call(
                "sendMessage",
                json!({
                    "chat_id": chat_id,
                    "text": text,
                }),
            )
            .await?;
        Ok(())
    }

    async fn answer_callback(
        &self,
        callback_id: &str,
        text: Option<&str>,
    ) -> TransportResult<()> {
        let mut payload = json!({ "callback_query_id": callback_id });
        if let Some(text) = text {
            payload["text"] = json!(text);
        }
        let _: Value = self.call("answerCallbackQuery", payload).await?;
        Ok(())
    }

    async fn send_document(
        &self,
        chat_id: i64,
        filename: &str,
        bytes: Vec<u8>,
        caption: &str,
    ) -> TransportResult<()> {
        let url = format!("{}/sendDocument", self.base_url);
        let part = reqwest::multipart::Part::bytes(bytes).file_name(filename.to_string());
        let form = reqwest::multipart::Form::new()
            .text("chat_id", chat_id.to_string())
            .text("caption", caption.to_string())
            .part("document", part);

        let resp = self.client.post(&url).multipart(form).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(TransportError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_extraction_prefers_text() {
        let msg = Message {
            message_id: 1,
            chat: Chat {
                id: 10,
                kind: "private".to_string(),
            },
            from: None,
            text: Some("hello".to_string()),
            caption: None,
            photo: None,
            video: None,
            document: None,
            voice: None,
            sticker: None,
        };
        assert_eq!(
            msg.content(),
            ContentPayload::Text {
                text: "hello".to_string()
            }
        );
        assert!(msg.is_private());
    }

    #[test]
    fn test_content_extraction_takes_largest_photo() {
        let msg = Message {
            message_id: 1,
            chat: Chat {
                id: 10,
                kind: "private".to_string(),
            },
            from: None,
            text: None,
            caption: Some("look".to_string()),
            photo: Some(vec![
                PhotoSize {
                    file_id: "small".to_string(),
                },
                PhotoSize {
                    file_id: "large".to_string(),
                },
            ]),
            video: None,
            document: None,
            voice: None,
            sticker: None,
        };
        assert_eq!(
            msg.content(),
            ContentPayload::Photo {
                file_id: "large".to_string(),
                caption: Some("look".to_string()),
            }
        );
    }

    #[test]
    fn test_envelope_deserializes_for_any_result_type() {
        // MessageId has no Default impl; the envelope must not require one.
        let ok: ApiResponse<MessageId> =
            serde_json::from_str(r#"{"ok":true,"result":{"message_id":7}}"#).unwrap();
        assert!(ok.ok);
        assert_eq!(ok.result.unwrap().message_id, 7);

        let err: ApiResponse<MessageId> =
            serde_json::from_str(r#"{"ok":false,"description":"Bad Request"}"#).unwrap();
        assert!(!err.ok);
        assert!(err.result.is_none());
        assert_eq!(err.description.as_deref(), Some("Bad Request"));
    }

    #[test]
    fn test_panel_keyboard_payloads() {
        let token = RequestToken::from_raw("abc123");
        let kb = TelegramTransport::panel_keyboard(&token);
        let row = &kb["inline_keyboard"][0];
        assert_eq!(row[0]["callback_data"], "send:abc123");
        assert_eq!(row[1]["callback_data"], "deny:abc123");
    }
}
