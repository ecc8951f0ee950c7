//! Stored credential with expiry tracking

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Tokens are treated as expired this long before their actual deadline so
/// in-flight requests don't race the cutoff.
const EXPIRY_MARGIN_SECS: u64 = 300;

/// An access token with its absolute expiry time (unix seconds).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredToken {
    pub token: String,
    pub expires_at: Option<u64>,
}

impl StoredToken {
    pub fn new(token: String, expires_in_secs: Option<u64>) -> Self {
        let expires_at = expires_in_secs.map(|secs| unix_now() + secs);
        Self { token, expires_at }
    }

    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(exp) => unix_now() + EXPIRY_MARGIN_SECS >= exp,
            None => false,
        }
    }

    /// Seconds until the real deadline (not counting the safety margin).
    pub fn remaining_secs(&self) -> Option<u64> {
        self.expires_at.map(|exp| exp.saturating_sub(unix_now()))
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_token_is_not_expired() {
        let token = StoredToken::new("t".into(), Some(3600));
        assert!(!token.is_expired());
        assert!(token.remaining_secs().unwrap() > 3500);
    }

    #[test]
    fn test_token_expires_within_margin() {
        // Nominally valid for 2 more minutes, but inside the safety margin.
        let token = StoredToken::new("t".into(), Some(120));
        assert!(token.is_expired());
    }

    #[test]
    fn test_token_without_deadline_never_expires() {
        let token = StoredToken::new("t".into(), None);
        assert!(!token.is_expired());
        assert_eq!(token.remaining_secs(), None);
    }
}
