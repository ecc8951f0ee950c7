//! Presence registry with TTL expiry.
//!
//! Each online entry carries a deadline. A user stays online only while
//! heartbeats keep pushing the deadline forward, so a silently dropped
//! connection goes offline when its TTL lapses even if no transport-level
//! disconnect event was ever observed. Callers pass `now` explicitly; the
//! registry never reads the clock itself.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// User id -> online-until deadline.
#[derive(Debug)]
pub struct PresenceRegistry {
    default_ttl: Duration,
    deadlines: HashMap<String, Instant>,
}

impl PresenceRegistry {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            default_ttl,
            deadlines: HashMap::new(),
        }
    }

    /// Record a user as online until `now + ttl`. Events may carry their own
    /// TTL; otherwise the registry default applies.
    pub fn mark_online(&mut self, user_id: &str, ttl: Option<Duration>, now: Instant) {
        let deadline = now + ttl.unwrap_or(self.default_ttl);
        self.deadlines.insert(user_id.to_string(), deadline);
    }

    /// Explicit offline event (clean disconnect).
    pub fn mark_offline(&mut self, user_id: &str) {
        self.deadlines.remove(user_id);
    }

    pub fn is_online(&self, user_id: &str, now: Instant) -> bool {
        self.deadlines
            .get(user_id)
            .is_some_and(|deadline| now < *deadline)
    }

    /// Drop expired entries and return the users that just went offline.
    pub fn sweep(&mut self, now: Instant) -> Vec<String> {
        let expired: Vec<String> = self
            .deadlines
            .iter()
            .filter(|(_, deadline)| now >= **deadline)
            .map(|(user, _)| user.clone())
            .collect();
        for user in &expired {
            self.deadlines.remove(user);
        }
        expired
    }

    pub fn online_count(&self, now: Instant) -> usize {
        self.deadlines
            .values()
            .filter(|deadline| now < **deadline)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(60);

    #[test]
    fn test_online_until_ttl_lapses() {
        let mut presence = PresenceRegistry::new(TTL);
        let t0 = Instant::now();

        presence.mark_online("ana", None, t0);
        assert!(presence.is_online("ana", t0 + Duration::from_secs(59)));
        assert!(!presence.is_online("ana", t0 + Duration::from_secs(60)));
    }

    #[test]
    fn test_heartbeat_extends_deadline() {
        let mut presence = PresenceRegistry::new(TTL);
        let t0 = Instant::now();

        presence.mark_online("ana", None, t0);
        presence.mark_online("ana", None, t0 + Duration::from_secs(45));
        assert!(presence.is_online("ana", t0 + Duration::from_secs(90)));
    }

    #[test]
    fn test_event_ttl_overrides_default() {
        let mut presence = PresenceRegistry::new(TTL);
        let t0 = Instant::now();

        presence.mark_online("ana", Some(Duration::from_secs(10)), t0);
        assert!(!presence.is_online("ana", t0 + Duration::from_secs(11)));
    }

    #[test]
    fn test_sweep_reports_silent_drops() {
        let mut presence = PresenceRegistry::new(TTL);
        let t0 = Instant::now();

        presence.mark_online("ana", None, t0);
        presence.mark_online("ben", Some(Duration::from_secs(10)), t0);

        let expired = presence.sweep(t0 + Duration::from_secs(30));
        assert_eq!(expired, vec!["ben".to_string()]);
        assert_eq!(presence.online_count(t0 + Duration::from_secs(30)), 1);
    }

    #[test]
    fn test_explicit_offline_wins() {
        let mut presence = PresenceRegistry::new(TTL);
        let t0 = Instant::now();

        presence.mark_online("ana", None, t0);
        presence.mark_offline("ana");
        assert!(!presence.is_online("ana", t0 + Duration::from_secs(1)));
    }
}
