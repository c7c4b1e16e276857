//! Fan-out Dispatcher
//!
//! Delivers a copy of the submission plus a review panel to each reviewer.
//! Per-reviewer transport failures are normal: the reviewer is skipped and
//! fan-out continues. Retraction is cosmetic cleanup and swallows failures
//! outright.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::adapters::ReviewTransport;
use crate::domain::{DispatchEntry, SubmissionRequest};

#[derive(Clone)]
pub struct Dispatcher {
    transport: Arc<dyn ReviewTransport>,
}

impl Dispatcher {
    pub fn new(transport: Arc<dyn ReviewTransport>) -> Self {
        Self { transport }
    }

    /// Deliver copy + panel to every reviewer. Returns one entry per
    /// reviewer that received a panel; partial fan-out is a normal outcome.
    /// A reviewer whose panel send fails after the copy landed gets no
    /// entry (they have nothing to act through).
    pub async fn fanout(
        &self,
        request: &SubmissionRequest,
        reviewers: &[i64],
    ) -> Vec<DispatchEntry> {
        let mut entries = Vec::new();

        for &reviewer_id in reviewers {
            if let Err(e) = self
                .transport
                .deliver_copy(reviewer_id, &request.origin, &request.content)
                .await
            {
                debug!(
                    reviewer_id,
                    token = %request.token,
                    error = %e,
                    "copy not delivered, skipping reviewer"
                );
                continue;
            }

            match self.transport.send_panel(reviewer_id, &request.token).await {
                Ok(panel_message_id) => entries.push(DispatchEntry {
                    reviewer_id,
                    panel_message_id,
                }),
                Err(e) => debug!(
                    reviewer_id,
                    token = %request.token,
                    error = %e,
                    "panel not delivered, skipping reviewer"
                ),
            }
        }

        if entries.len() < reviewers.len() {
            warn!(
                token = %request.token,
                delivered = entries.len(),
                total = reviewers.len(),
                "partial fan-out"
            );
        }
        entries
    }

    /// Best-effort removal of every reviewer's panel affordance.
    pub async fn retract(&self, entries: &[DispatchEntry]) {
        for entry in entries {
            self.retract_one(entry.reviewer_id, entry.panel_message_id)
                .await;
        }
    }

    /// Best-effort removal of a single panel affordance. Used both during
    /// global retraction and when a losing racer's own panel must still
    /// disappear after `AlreadyHandled`.
    pub async fn retract_one(&self, reviewer_id: i64, panel_message_id: i64) {
        if let Err(e) = self
            .transport
            .retract_panel(reviewer_id, panel_message_id)
            .await
        {
            debug!(reviewer_id, panel_message_id, error = %e, "panel retraction failed (ignored)");
        }
    }
}
