use std::time::Duration;

use chrono::Utc;
use portcullis_core::{
    LOCKOUT_WINDOW_SECONDS, MAX_LOGIN_ATTEMPTS, MAX_SECOND_FACTOR_ATTEMPTS, ThrottleDecision,
    ThrottleKey, ThrottleStore,
};

/// Brute-force throttle over a shared counter store.
///
/// Attempts accumulate per key inside a rolling decay window; once the
/// threshold is reached, `check` reports locked with the seconds remaining
/// until the stored window expiry. A store outage fails closed: an
/// unreachable counter reports locked for a full window rather than waving
/// attempts through.
#[derive(Clone)]
pub struct RateLimiter<T>
where
    T: ThrottleStore,
{
    store: T,
    max_attempts: u32,
    window: Duration,
}

impl<T> RateLimiter<T>
where
    T: ThrottleStore,
{
    pub fn new(store: T, max_attempts: u32, window: Duration) -> Self {
        Self {
            store,
            max_attempts,
            window,
        }
    }

    /// The first-factor contract: 6 attempts per rolling 900 seconds.
    pub fn for_login(store: T) -> Self {
        Self::new(
            store,
            MAX_LOGIN_ATTEMPTS,
            Duration::from_secs(LOCKOUT_WINDOW_SECONDS),
        )
    }

    /// The per-pending-token ceiling on second-factor guesses.
    pub fn for_second_factor(store: T) -> Self {
        Self::new(
            store,
            MAX_SECOND_FACTOR_ATTEMPTS,
            Duration::from_secs(LOCKOUT_WINDOW_SECONDS),
        )
    }

    #[tracing::instrument(name = "RateLimiter::check", skip(self))]
    pub async fn check(&self, key: &ThrottleKey) -> ThrottleDecision {
        match self.store.current(key).await {
            Ok(None) => ThrottleDecision::Allowed,
            Ok(Some(state)) => {
                let now = Utc::now();
                if state.count >= self.max_attempts && !state.is_expired(now) {
                    ThrottleDecision::Locked {
                        retry_after_seconds: state.retry_after_seconds(now),
                    }
                } else {
                    ThrottleDecision::Allowed
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "throttle store unreachable, failing closed");
                ThrottleDecision::Locked {
                    retry_after_seconds: self.window.as_secs(),
                }
            }
        }
    }

    /// Count a failed attempt. Store errors are logged and swallowed; the
    /// next `check` fails closed anyway.
    #[tracing::instrument(name = "RateLimiter::record_failure", skip(self))]
    pub async fn record_failure(&self, key: &ThrottleKey) {
        if let Err(e) = self.store.record_failure(key, self.window).await {
            tracing::warn!(error = %e, "failed to record throttle attempt");
        }
    }

    /// Reset the counter. Called only after a full authentication, never
    /// after the first factor alone.
    #[tracing::instrument(name = "RateLimiter::clear", skip(self))]
    pub async fn clear(&self, key: &ThrottleKey) {
        if let Err(e) = self.store.clear(key).await {
            tracing::warn!(error = %e, "failed to clear throttle counter");
        }
    }
}
