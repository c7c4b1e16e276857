use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::content::ContentPayload;

/// Opaque identifier correlating a submission, its dispatch entries and its
/// eventual resolution. 128-bit random, rendered as 32 hex chars.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestToken(String);

impl RequestToken {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where the submission came from: the submitter's private chat and the
/// original message inside it. Forwarding copies from here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Origin {
    pub chat_id: i64,
    pub message_id: i64,
}

/// Submitter identity as seen by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submitter {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
}

impl Submitter {
    /// Display handle for oversight logs ("@name" or the bare numeric id).
    pub fn handle(&self) -> String {
        match &self.username {
            Some(name) => format!("@{}", name),
            None => self.id.to_string(),
        }
    }
}

/// Lifecycle status of an in-flight submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestStatus {
    /// Awaiting a reviewer decision
    Pending,
    /// Resolution recorded, cleanup in progress
    Resolved,
    /// Removed from the registry
    Purged,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "PENDING",
            RequestStatus::Resolved => "RESOLVED",
            RequestStatus::Purged => "PURGED",
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An in-flight submission, owned exclusively by the registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionRequest {
    pub token: RequestToken,
    pub origin: Origin,
    pub submitter: Submitter,
    pub content: ContentPayload,
    pub created_at: DateTime<Utc>,
    pub status: RequestStatus,
}

impl SubmissionRequest {
    pub fn new(
        token: RequestToken,
        origin: Origin,
        submitter: Submitter,
        content: ContentPayload,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            token,
            origin,
            submitter,
            content,
            created_at,
            status: RequestStatus::Pending,
        }
    }
}
