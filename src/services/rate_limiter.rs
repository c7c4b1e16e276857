//! Per-submitter cooldown gate
//!
//! In-memory only: limiter state resets on restart, which is acceptable
//! for a best-effort intake throttle. Entries older than one cooldown
//! window can no longer deny anything, so they are swept opportunistically
//! once the map grows past a threshold.

use chrono::{DateTime, Utc};
use dashmap::DashMap;

/// Sweep expired entries once the map exceeds this many submitters.
const SWEEP_THRESHOLD: usize = 1024;

/// Admission verdict for a submission attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allowed,
    Denied { retry_after_secs: u64 },
}

pub struct RateLimiter {
    cooldown_secs: u64,
    last_admitted: DashMap<i64, DateTime<Utc>>,
}

impl RateLimiter {
    pub fn new(cooldown_secs: u64) -> Self {
        Self {
            cooldown_secs,
            last_admitted: DashMap::new(),
        }
    }

    /// Admit or deny a submitter at `now`. Limiter state mutates only on
    /// `Allowed`: a denied attempt does not extend the cooldown.
    pub fn admit(&self, submitter_id: i64, now: DateTime<Utc>) -> Admission {
        if let Some(prev) = self.last_admitted.get(&submitter_id) {
            let elapsed = (now - *prev).num_seconds();
            if elapsed < self.cooldown_secs as i64 {
                let retry_after_secs = (self.cooldown_secs as i64 - elapsed).max(0) as u64;
                return Admission::Denied { retry_after_secs };
            }
        }
        self.last_admitted.insert(submitter_id, now);

        if self.last_admitted.len() > SWEEP_THRESHOLD {
            self.sweep(now);
        }
        Admission::Allowed
    }

    fn sweep(&self, now: DateTime<Utc>) {
        let cooldown = self.cooldown_secs as i64;
        self.last_admitted
            .retain(|_, admitted| (now - *admitted).num_seconds() < cooldown);
    }

    #[cfg(test)]
    fn tracked_submitters(&self) -> usize {
        self.last_admitted.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_cooldown_boundary() {
        let limiter = RateLimiter::new(30);
        let t0 = Utc::now();

        assert_eq!(limiter.admit(1, t0), Admission::Allowed);
        assert_eq!(
            limiter.admit(1, t0 + Duration::seconds(29)),
            Admission::Denied {
                retry_after_secs: 1
            }
        );
        // Exactly one window later is allowed again
        assert_eq!(limiter.admit(1, t0 + Duration::seconds(30)), Admission::Allowed);
    }

    #[test]
    fn test_denied_attempt_does_not_extend_cooldown() {
        let limiter = RateLimiter::new(30);
        let t0 = Utc::now();

        assert_eq!(limiter.admit(1, t0), Admission::Allowed);
        // Hammering during the window must not push the window forward
        for secs in 1..30 {
            assert!(matches!(
                limiter.admit(1, t0 + Duration::seconds(secs)),
                Admission::Denied { .. }
            ));
        }
        assert_eq!(limiter.admit(1, t0 + Duration::seconds(30)), Admission::Allowed);
    }

    #[test]
    fn test_submitters_are_independent() {
        let limiter = RateLimiter::new(30);
        let t0 = Utc::now();

        assert_eq!(limiter.admit(1, t0), Admission::Allowed);
        assert_eq!(limiter.admit(2, t0), Admission::Allowed);
        assert!(matches!(limiter.admit(1, t0), Admission::Denied { .. }));
    }

    #[test]
    fn test_sweep_evicts_expired_entries() {
        let limiter = RateLimiter::new(30);
        let t0 = Utc::now();

        for id in 0..(SWEEP_THRESHOLD as i64 + 1) {
            assert_eq!(limiter.admit(id, t0), Admission::Allowed);
        }
        assert!(limiter.tracked_submitters() > SWEEP_THRESHOLD);

        // All earlier entries have expired by now; the insert that crosses
        // the threshold triggers the sweep.
        let later = t0 + Duration::seconds(31);
        assert_eq!(limiter.admit(9999, later), Admission::Allowed);
        assert_eq!(limiter.tracked_submitters(), 1);
    }
}
