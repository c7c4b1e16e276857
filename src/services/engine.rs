//! Request lifecycle engine
//!
//! Wires the rate limiter, registry, dispatcher and arbiter into the two
//! entry points the transport feeds: inbound submissions and reviewer
//! button presses. Also carries the oversight side channel (silent intake
//! logs, resolution summaries, archive export).

use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::adapters::ReviewTransport;
use crate::config::AppConfig;
use crate::domain::{
    ContentPayload, Origin, RequestToken, ResolveOutcome, ReviewAction, SubmissionRequest,
    Submitter,
};
use crate::services::archive::ArchiveSink;
use crate::services::arbiter::Arbiter;
use crate::services::dispatcher::Dispatcher;
use crate::services::rate_limiter::{Admission, RateLimiter};
use crate::services::registry::RequestRegistry;

/// Outcome of an inbound submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// Registered and fanned out
    Queued(RequestToken),
    /// Rejected by the cooldown gate
    RateLimited { retry_after_secs: u64 },
}

pub struct RelayEngine {
    registry: Arc<Mutex<RequestRegistry>>,
    dispatcher: Dispatcher,
    arbiter: Arbiter,
    rate_limiter: RateLimiter,
    archive: ArchiveSink,
    transport: Arc<dyn ReviewTransport>,
    oversight_id: i64,
    fanout_targets: Vec<i64>,
}

impl RelayEngine {
    pub fn new(
        config: &AppConfig,
        transport: Arc<dyn ReviewTransport>,
        registry: RequestRegistry,
    ) -> Self {
        let registry = Arc::new(Mutex::new(registry));
        let dispatcher = Dispatcher::new(transport.clone());
        let arbiter = Arbiter::new(
            registry.clone(),
            dispatcher.clone(),
            transport.clone(),
            config.authorized_reviewers(),
            config.target.chat_id,
            config.target.topic_id,
        );

        Self {
            registry,
            dispatcher,
            arbiter,
            rate_limiter: RateLimiter::new(config.limits.cooldown_secs),
            archive: ArchiveSink::new(&config.storage.archive_dir),
            transport,
            oversight_id: config.review.oversight_id,
            fanout_targets: config.fanout_targets(),
        }
    }

    /// Handle an inbound private message: archive, admit, register, fan out.
    pub async fn handle_submission(
        &self,
        origin: Origin,
        submitter: Submitter,
        content: ContentPayload,
    ) -> SubmissionOutcome {
        let now = Utc::now();

        // Side-channel archive runs regardless of the admission verdict.
        self.archive.record(&origin, &submitter, &content, now);

        if let Admission::Denied { retry_after_secs } = self.rate_limiter.admit(submitter.id, now)
        {
            debug!(submitter_id = submitter.id, retry_after_secs, "submission rate limited");
            if let Err(e) = self
                .transport
                .send_text(
                    origin.chat_id,
                    &format!("Too fast. Try again in {}s.", retry_after_secs),
                )
                .await
            {
                debug!(error = %e, "cooldown notice failed (ignored)");
            }
            return SubmissionOutcome::RateLimited { retry_after_secs };
        }

        let token = {
            let mut registry = self.registry.lock().await;
            registry.create(origin, submitter.clone(), content, now)
        };
        info!(%token, submitter = %submitter.handle(), "submission registered");

        self.notify_oversight_intake(&token, &origin, &submitter)
            .await;

        // Deliveries run outside the registry lock so independent requests
        // can fan out concurrently; only the entry append is serialized.
        let request = { self.registry.lock().await.get(&token).cloned() };
        if let Some(request) = request {
            let entries = self.dispatcher.fanout(&request, &self.fanout_targets).await;
            self.registry.lock().await.append_dispatch(&token, entries);
        }

        SubmissionOutcome::Queued(token)
    }

    /// Handle a reviewer button press. Returns the arbiter outcome, or
    /// `None` when the payload did not parse as a review action.
    pub async fn handle_review_action(
        &self,
        actor_id: i64,
        callback_id: &str,
        panel_message_id: i64,
        data: &str,
    ) -> Option<ResolveOutcome> {
        let Some(action) = ReviewAction::parse(data) else {
            self.answer(callback_id, None).await;
            return None;
        };

        let outcome = self
            .arbiter
            .resolve(&action.token, action.decision, actor_id)
            .await;

        match outcome {
            ResolveOutcome::Applied => {
                self.answer(callback_id, Some("Done")).await;
                self.notify_oversight_resolution(&action, actor_id).await;
            }
            ResolveOutcome::AlreadyHandled => {
                // Global retraction already ran (or is running); the losing
                // racer's own panel still has to disappear.
                self.answer(callback_id, Some("Already handled")).await;
                self.dispatcher.retract_one(actor_id, panel_message_id).await;
            }
            ResolveOutcome::Stale => {
                self.answer(callback_id, Some("Expired")).await;
                self.dispatcher.retract_one(actor_id, panel_message_id).await;
            }
            ResolveOutcome::Unauthorized => {
                // Silent ignore: blank acknowledgement, no state change.
                self.answer(callback_id, None).await;
            }
        }
        Some(outcome)
    }

    /// Oversight-only archive export. Returns false when the text is not
    /// the export command so the router can treat it as a submission.
    pub async fn handle_admin_command(&self, from_id: i64, text: &str) -> bool {
        if from_id != self.oversight_id || text.trim() != "/export" {
            return false;
        }

        match self.archive.export_bundle() {
            Ok(bytes) => {
                if let Err(e) = self
                    .transport
                    .send_document(
                        self.oversight_id,
                        "submissions.jsonl.gz",
                        bytes,
                        "Archive export",
                    )
                    .await
                {
                    warn!(error = %e, "archive export upload failed");
                }
            }
            Err(e) => warn!(error = %e, "archive export failed"),
        }
        true
    }

    /// Direct arbiter access for callers that already hold a parsed action.
    pub async fn resolve(
        &self,
        token: &RequestToken,
        decision: crate::domain::Decision,
        actor_id: i64,
    ) -> ResolveOutcome {
        self.arbiter.resolve(token, decision, actor_id).await
    }

    pub async fn pending_request(&self, token: &RequestToken) -> Option<SubmissionRequest> {
        self.registry.lock().await.get(token).cloned()
    }

    pub async fn pending_count(&self) -> usize {
        self.registry.lock().await.pending_count()
    }

    /// Final snapshot on shutdown.
    pub async fn persist(&self) {
        self.registry.lock().await.persist();
    }

    async fn answer(&self, callback_id: &str, text: Option<&str>) {
        if let Err(e) = self.transport.answer_callback(callback_id, text).await {
            debug!(error = %e, "callback answer failed (ignored)");
        }
    }

    async fn notify_oversight_intake(
        &self,
        token: &RequestToken,
        origin: &Origin,
        submitter: &Submitter,
    ) {
        let text = format!(
            "New submission\nfrom {}\nid {}\ntoken {}",
            submitter.handle(),
            submitter.id,
            token
        );
        if let Err(e) = self.transport.send_text(self.oversight_id, &text).await {
            debug!(error = %e, "oversight intake log failed (ignored)");
        }
        // Private copy for oversight, separate from the reviewer fan-out.
        let content = match self.pending_request(token).await {
            Some(request) => request.content,
            None => return,
        };
        if let Err(e) = self
            .transport
            .deliver_copy(self.oversight_id, origin, &content)
            .await
        {
            debug!(error = %e, "oversight intake copy failed (ignored)");
        }
    }

    async fn notify_oversight_resolution(&self, action: &ReviewAction, actor_id: i64) {
        // When oversight acted themselves the summary stays roleless.
        let text = if actor_id == self.oversight_id {
            format!("{} — done: {}", action.token, action.decision)
        } else {
            format!("{} — {} by {}", action.token, action.decision, actor_id)
        };
        if let Err(e) = self.transport.send_text(self.oversight_id, &text).await {
            debug!(error = %e, "oversight resolution summary failed (ignored)");
        }
    }
}
