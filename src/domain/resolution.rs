use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::request::RequestToken;

/// Reviewer decision on a submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    Accept,
    Reject,
}

impl Decision {
    /// Wire verb used in affordance payloads (`send:<token>` / `deny:<token>`)
    pub fn verb(&self) -> &'static str {
        match self {
            Decision::Accept => "send",
            Decision::Reject => "deny",
        }
    }

    pub fn from_verb(verb: &str) -> Option<Self> {
        match verb {
            "send" => Some(Decision::Accept),
            "deny" => Some(Decision::Reject),
            _ => None,
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Accept => write!(f, "SEND"),
            Decision::Reject => write!(f, "DENY"),
        }
    }
}

/// Parsed affordance payload: `"<action>:<token>"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewAction {
    pub decision: Decision,
    pub token: RequestToken,
}

impl ReviewAction {
    pub fn parse(data: &str) -> Option<Self> {
        let (verb, token) = data.split_once(':')?;
        if token.is_empty() {
            return None;
        }
        Some(Self {
            decision: Decision::from_verb(verb)?,
            token: RequestToken::from_raw(token),
        })
    }

    pub fn encode(decision: Decision, token: &RequestToken) -> String {
        format!("{}:{}", decision.verb(), token)
    }
}

/// Outcome of `Arbiter::resolve`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveOutcome {
    /// This caller won the race; side effects executed
    Applied,
    /// A resolution record already exists for the token
    AlreadyHandled,
    /// Token unknown (never created, or already purged long ago)
    Stale,
    /// Actor is not in the reviewer set; silent no-op
    Unauthorized,
}

/// Immutable record of who resolved a request and how. At most one record
/// ever exists per token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionRecord {
    pub token: RequestToken,
    pub decision: Decision,
    pub actor_id: i64,
    pub resolved_at: DateTime<Utc>,
}

impl ResolutionRecord {
    pub fn new(
        token: RequestToken,
        decision: Decision,
        actor_id: i64,
        resolved_at: DateTime<Utc>,
    ) -> Self {
        Self {
            token,
            decision,
            actor_id,
            resolved_at,
        }
    }

    /// Compact persisted form: `"<verb>:<actor>:<unix-secs>"`.
    pub fn summary(&self) -> String {
        format!(
            "{}:{}:{}",
            self.decision.verb(),
            self.actor_id,
            self.resolved_at.timestamp()
        )
    }

    /// Parse a persisted summary back into a record. Returns `None` on a
    /// malformed summary (treated as an opaque "handled" marker by callers).
    pub fn from_summary(token: RequestToken, summary: &str) -> Option<Self> {
        let mut parts = summary.splitn(3, ':');
        let decision = Decision::from_verb(parts.next()?)?;
        let actor_id = parts.next()?.parse().ok()?;
        let secs: i64 = parts.next()?.parse().ok()?;
        let resolved_at = Utc.timestamp_opt(secs, 0).single()?;
        Some(Self {
            token,
            decision,
            actor_id,
            resolved_at,
        })
    }
}
