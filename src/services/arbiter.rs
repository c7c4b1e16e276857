//! Resolution Arbiter
//!
//! Serializes reviewer decisions through one critical section and applies
//! each at most once. The resolution record is persisted before any
//! forwarding side effect, so a crash mid-resolve cannot cause duplicate
//! forwarding on restart; the duplicate-forward risk is bounded to the
//! crash window itself.

use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::adapters::ReviewTransport;
use crate::domain::{Decision, RequestToken, ResolutionRecord, ResolveOutcome};
use crate::services::dispatcher::Dispatcher;
use crate::services::registry::RequestRegistry;

pub struct Arbiter {
    registry: Arc<Mutex<RequestRegistry>>,
    dispatcher: Dispatcher,
    transport: Arc<dyn ReviewTransport>,
    authorized: HashSet<i64>,
    target_chat: i64,
    /// Sub-destination (topic) id. `Some(0)` is a configured topic, not
    /// "absent" — only `None` means no topic.
    target_topic: Option<i64>,
}

impl Arbiter {
    pub fn new(
        registry: Arc<Mutex<RequestRegistry>>,
        dispatcher: Dispatcher,
        transport: Arc<dyn ReviewTransport>,
        authorized: HashSet<i64>,
        target_chat: i64,
        target_topic: Option<i64>,
    ) -> Self {
        Self {
            registry,
            dispatcher,
            transport,
            authorized,
            target_chat,
            target_topic,
        }
    }

    pub fn is_authorized(&self, actor_id: i64) -> bool {
        self.authorized.contains(&actor_id)
    }

    /// Apply a reviewer decision at most once. The registry lock is held
    /// across the whole read-check-write-forward-cleanup sequence; that
    /// single section is what makes concurrent resolves race-free.
    pub async fn resolve(
        &self,
        token: &RequestToken,
        decision: Decision,
        actor_id: i64,
    ) -> ResolveOutcome {
        if !self.is_authorized(actor_id) {
            debug!(actor_id, %token, "unauthorized resolve attempt ignored");
            return ResolveOutcome::Unauthorized;
        }

        let mut registry = self.registry.lock().await;

        if registry.is_resolved(token) {
            return ResolveOutcome::AlreadyHandled;
        }
        let Some(request) = registry.get(token).cloned() else {
            return ResolveOutcome::Stale;
        };

        // Persist the record before any side effect. From here on, no other
        // caller can win the race, even across a restart.
        let record = ResolutionRecord::new(token.clone(), decision, actor_id, Utc::now());
        registry.record_resolution(&record);
        info!(%token, decision = %decision, actor_id, "resolution recorded");

        match decision {
            Decision::Accept => {
                if let Err(e) = self
                    .transport
                    .forward(
                        &request.origin,
                        &request.content,
                        self.target_chat,
                        self.target_topic,
                    )
                    .await
                {
                    // At-most-once, not guaranteed-delivered: the record stands.
                    warn!(%token, error = %e, "forward to destination failed, not retried");
                }
            }
            Decision::Reject => {
                if let Err(e) = self
                    .transport
                    .send_text(request.origin.chat_id, "Your submission was not accepted.")
                    .await
                {
                    debug!(%token, error = %e, "rejection notice failed (ignored)");
                }
            }
        }

        let entries = registry.dispatch_entries(token);
        self.dispatcher.retract(&entries).await;
        registry.delete(token);

        ResolveOutcome::Applied
    }
}
