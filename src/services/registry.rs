//! Request Registry
//!
//! Authoritative owning store of in-flight submissions, their dispatch
//! entries and the write-once resolution records. Every mutating operation
//! pushes the whole state through the snapshot store; a failed write is
//! logged and the registry keeps serving from memory.

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

use crate::domain::{
    ContentPayload, DispatchEntry, Origin, RequestStatus, RequestToken, ResolutionRecord,
    SubmissionRequest, Submitter,
};
use crate::persistence::{RegistrySnapshot, SnapshotStore};

pub struct RequestRegistry {
    store: SnapshotStore,
    state: RegistrySnapshot,
}

impl RequestRegistry {
    /// Reload the last snapshot verbatim. Requests found in `Pending`
    /// state stay pending (no re-notification); resolution records older
    /// than the retention window are pruned.
    pub fn load(store: SnapshotStore, retention_secs: u64, now: DateTime<Utc>) -> Self {
        let mut state = store.load();

        let horizon = now - Duration::seconds(retention_secs as i64);
        let before = state.resolved.len();
        state.resolved.retain(|token, summary| {
            match ResolutionRecord::from_summary(token.clone(), summary) {
                Some(record) => record.resolved_at > horizon,
                // Unparseable records still answer "already handled"; keep them.
                None => true,
            }
        });
        let pruned = before - state.resolved.len();

        // A crash between the resolution write and the purge can leave a
        // resolved request sitting in the pending snapshot. It can never be
        // re-resolved, so sweep it out here.
        let leftovers: Vec<RequestToken> = state
            .pending
            .keys()
            .filter(|token| state.resolved.contains_key(*token))
            .cloned()
            .collect();
        for token in &leftovers {
            state.pending.remove(token);
            state.dispatch.remove(token);
        }

        if !state.pending.is_empty() || pruned > 0 || !leftovers.is_empty() {
            info!(
                pending = state.pending.len(),
                resolved = state.resolved.len(),
                pruned,
                swept = leftovers.len(),
                "registry state restored from snapshot"
            );
        }

        let registry = Self { store, state };
        if pruned > 0 || !leftovers.is_empty() {
            registry.persist();
        }
        registry
    }

    /// Create a fresh pending request. The snapshot write happens before
    /// the token is returned to the caller.
    pub fn create(
        &mut self,
        origin: Origin,
        submitter: Submitter,
        content: ContentPayload,
        now: DateTime<Utc>,
    ) -> RequestToken {
        let mut token = RequestToken::generate();
        // Collision odds are negligible, but the uniqueness invariant is cheap
        // to hold outright.
        while self.state.pending.contains_key(&token) || self.state.resolved.contains_key(&token) {
            token = RequestToken::generate();
        }

        let request = SubmissionRequest::new(token.clone(), origin, submitter, content, now);
        self.state.pending.insert(token.clone(), request);
        self.state.dispatch.insert(token.clone(), Vec::new());
        self.persist();
        token
    }

    pub fn get(&self, token: &RequestToken) -> Option<&SubmissionRequest> {
        self.state.pending.get(token)
    }

    /// Drop the request and its dispatch entries from memory and snapshot.
    pub fn delete(&mut self, token: &RequestToken) {
        self.state.pending.remove(token);
        self.state.dispatch.remove(token);
        self.persist();
    }

    /// Append successfully dispatched entries for a pending request.
    pub fn append_dispatch(&mut self, token: &RequestToken, entries: Vec<DispatchEntry>) {
        if !self.state.pending.contains_key(token) {
            // Resolved while fan-out was still in flight; entries are moot.
            return;
        }
        self.state
            .dispatch
            .entry(token.clone())
            .or_default()
            .extend(entries);
        self.persist();
    }

    pub fn dispatch_entries(&self, token: &RequestToken) -> Vec<DispatchEntry> {
        self.state.dispatch.get(token).cloned().unwrap_or_default()
    }

    pub fn is_resolved(&self, token: &RequestToken) -> bool {
        self.state.resolved.contains_key(token)
    }

    /// Write the resolution record and persist it. Marks the request
    /// `Resolved`; the caller purges it after retraction.
    pub fn record_resolution(&mut self, record: &ResolutionRecord) {
        self.state
            .resolved
            .insert(record.token.clone(), record.summary());
        if let Some(request) = self.state.pending.get_mut(&record.token) {
            request.status = RequestStatus::Resolved;
        }
        self.persist();
    }

    pub fn pending_count(&self) -> usize {
        self.state.pending.len()
    }

    /// Snapshot the current state. Durability is advisory: failures are
    /// logged and the in-memory state stays authoritative.
    pub fn persist(&self) {
        if let Err(e) = self.store.save(&self.state) {
            warn!(error = %e, "snapshot write failed, continuing in-memory");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn registry_in(dir: &TempDir) -> RequestRegistry {
        let store = SnapshotStore::new(dir.path()).unwrap();
        RequestRegistry::load(store, 7 * 24 * 3600, Utc::now())
    }

    fn origin() -> Origin {
        Origin {
            chat_id: 500,
            message_id: 42,
        }
    }

    fn submitter() -> Submitter {
        Submitter {
            id: 500,
            username: None,
        }
    }

    fn text() -> ContentPayload {
        ContentPayload::Text {
            text: "tip".to_string(),
        }
    }

    #[test]
    fn test_create_get_delete() {
        let dir = TempDir::new().unwrap();
        let mut registry = registry_in(&dir);

        let token = registry.create(origin(), submitter(), text(), Utc::now());
        let request = registry.get(&token).unwrap();
        assert_eq!(request.status, RequestStatus::Pending);
        assert_eq!(request.origin.message_id, 42);

        registry.delete(&token);
        assert!(registry.get(&token).is_none());
        assert!(registry.dispatch_entries(&token).is_empty());
    }

    #[test]
    fn test_restart_restores_pending_state() {
        let dir = TempDir::new().unwrap();
        let token = {
            let mut registry = registry_in(&dir);
            let token = registry.create(origin(), submitter(), text(), Utc::now());
            registry.append_dispatch(
                &token,
                vec![DispatchEntry {
                    reviewer_id: 9,
                    panel_message_id: 77,
                }],
            );
            token
        };

        let restored = registry_in(&dir);
        assert_eq!(restored.pending_count(), 1);
        assert_eq!(restored.get(&token).unwrap().status, RequestStatus::Pending);
        assert_eq!(restored.dispatch_entries(&token).len(), 1);
    }

    #[test]
    fn test_resolution_record_survives_delete_and_restart() {
        let dir = TempDir::new().unwrap();
        let token = {
            let mut registry = registry_in(&dir);
            let token = registry.create(origin(), submitter(), text(), Utc::now());
            let record = ResolutionRecord::new(
                token.clone(),
                crate::domain::Decision::Accept,
                9,
                Utc::now(),
            );
            registry.record_resolution(&record);
            registry.delete(&token);
            assert!(registry.is_resolved(&token));
            token
        };

        let restored = registry_in(&dir);
        assert!(restored.is_resolved(&token));
        assert!(restored.get(&token).is_none());
    }

    #[test]
    fn test_retention_prunes_old_resolutions() {
        let dir = TempDir::new().unwrap();
        let token = {
            let mut registry = registry_in(&dir);
            let token = registry.create(origin(), submitter(), text(), Utc::now());
            let record = ResolutionRecord::new(
                token.clone(),
                crate::domain::Decision::Reject,
                9,
                Utc::now() - Duration::days(30),
            );
            registry.record_resolution(&record);
            registry.delete(&token);
            token
        };

        let store = SnapshotStore::new(dir.path()).unwrap();
        let restored = RequestRegistry::load(store, 7 * 24 * 3600, Utc::now());
        assert!(!restored.is_resolved(&token));
    }

    #[test]
    fn test_load_sweeps_resolved_requests_left_pending() {
        let dir = TempDir::new().unwrap();
        let token = {
            let mut registry = registry_in(&dir);
            let token = registry.create(origin(), submitter(), text(), Utc::now());
            let record = ResolutionRecord::new(
                token.clone(),
                crate::domain::Decision::Accept,
                9,
                Utc::now(),
            );
            // Resolution recorded but the purge never ran (crash window).
            registry.record_resolution(&record);
            token
        };

        let restored = registry_in(&dir);
        assert!(restored.get(&token).is_none());
        assert!(restored.dispatch_entries(&token).is_empty());
        assert!(restored.is_resolved(&token));

        // The sweep is persisted, not just in-memory.
        let again = registry_in(&dir);
        assert_eq!(again.pending_count(), 0);
    }

    #[test]
    fn test_append_dispatch_after_delete_is_ignored() {
        let dir = TempDir::new().unwrap();
        let mut registry = registry_in(&dir);

        let token = registry.create(origin(), submitter(), text(), Utc::now());
        registry.delete(&token);
        registry.append_dispatch(
            &token,
            vec![DispatchEntry {
                reviewer_id: 9,
                panel_message_id: 77,
            }],
        );
        assert!(registry.dispatch_entries(&token).is_empty());
    }
}
