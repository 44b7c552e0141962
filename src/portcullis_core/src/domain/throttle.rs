use std::net::IpAddr;

use chrono::{DateTime, Utc};

use crate::domain::{email::Email, session::PendingToken};

/// First-factor brute-force ceiling: attempts per key per rolling window.
pub const MAX_LOGIN_ATTEMPTS: u32 = 6;
pub const LOCKOUT_WINDOW_SECONDS: u64 = 900;

/// Independent, smaller ceiling on second-factor guesses, scoped to one
/// pending login. Exceeding it abandons the pending state and sends the
/// caller back through the (still throttled) password gate.
pub const MAX_SECOND_FACTOR_ATTEMPTS: u32 = 5;

/// Composite key scoping attempt counters: normalized identity plus the
/// origin address for the first factor, the pending token for the second.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ThrottleKey(String);

impl ThrottleKey {
    pub fn login(identity: &Email, origin: IpAddr) -> Self {
        Self(format!("{}|{}", identity.normalized(), origin))
    }

    pub fn second_factor(token: &PendingToken) -> Self {
        Self(format!("2fa|{token}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Counter snapshot as stored: the expiry is persisted alongside the count
/// so retry-after is derived from it, not recomputed from "now + window".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottleState {
    pub count: u32,
    pub expires_at: DateTime<Utc>,
}

impl ThrottleState {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Seconds until the window closes, floor zero.
    pub fn retry_after_seconds(&self, now: DateTime<Utc>) -> u64 {
        (self.expires_at - now).num_seconds().max(0) as u64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleDecision {
    Allowed,
    Locked { retry_after_seconds: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use secrecy::Secret;

    #[test]
    fn test_login_key_combines_identity_and_origin() {
        let email = Email::try_from(Secret::from("User@Example.com".to_string())).unwrap();
        let key = ThrottleKey::login(&email, "10.0.0.7".parse().unwrap());
        assert_eq!(key.as_str(), "user@example.com|10.0.0.7");
    }

    #[test]
    fn test_same_identity_different_origin_yields_different_keys() {
        let email = Email::try_from(Secret::from("user@example.com".to_string())).unwrap();
        let a = ThrottleKey::login(&email, "10.0.0.7".parse().unwrap());
        let b = ThrottleKey::login(&email, "10.0.0.8".parse().unwrap());
        assert_ne!(a, b);
    }

    #[test]
    fn test_retry_after_is_derived_from_stored_expiry() {
        let now = Utc::now();
        let state = ThrottleState {
            count: MAX_LOGIN_ATTEMPTS,
            expires_at: now + Duration::seconds(120),
        };
        assert_eq!(state.retry_after_seconds(now), 120);
        assert!(!state.is_expired(now));
    }

    #[test]
    fn test_expired_state_reports_zero_retry_after() {
        let now = Utc::now();
        let state = ThrottleState {
            count: MAX_LOGIN_ATTEMPTS,
            expires_at: now - Duration::seconds(5),
        };
        assert!(state.is_expired(now));
        assert_eq!(state.retry_after_seconds(now), 0);
    }
}
