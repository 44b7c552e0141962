use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::RwLock;

use portcullis_core::{ThrottleKey, ThrottleState, ThrottleStore, ThrottleStoreError};

/// In-memory attempt counters. The whole increment happens under one write
/// lock, which is the single-process equivalent of the Redis INCR.
#[derive(Default, Clone)]
pub struct InMemoryThrottleStore {
    entries: Arc<RwLock<HashMap<String, ThrottleState>>>,
}

impl InMemoryThrottleStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl ThrottleStore for InMemoryThrottleStore {
    async fn record_failure(
        &self,
        key: &ThrottleKey,
        window: Duration,
    ) -> Result<ThrottleState, ThrottleStoreError> {
        let mut entries = self.entries.write().await;
        let now = Utc::now();
        let fresh = ThrottleState {
            count: 1,
            expires_at: now + chrono::Duration::seconds(window.as_secs() as i64),
        };
        let state = entries
            .entry(key.as_str().to_string())
            .and_modify(|state| {
                // A failure after the window elapsed starts a new window at
                // one, never a continuation.
                if state.is_expired(now) {
                    *state = fresh;
                } else {
                    state.count += 1;
                }
            })
            .or_insert(fresh);
        Ok(*state)
    }

    async fn current(&self, key: &ThrottleKey) -> Result<Option<ThrottleState>, ThrottleStoreError> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(key.as_str())
            .copied()
            .filter(|state| !state.is_expired(Utc::now())))
    }

    async fn clear(&self, key: &ThrottleKey) -> Result<(), ThrottleStoreError> {
        self.entries.write().await.remove(key.as_str());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portcullis_core::Email;
    use secrecy::Secret;

    fn key() -> ThrottleKey {
        let email = Email::try_from(Secret::from("user@example.com".to_string())).unwrap();
        ThrottleKey::login(&email, "10.0.0.1".parse().unwrap())
    }

    #[tokio::test]
    async fn test_counter_and_window_start_together() {
        let store = InMemoryThrottleStore::new();
        let state = store
            .record_failure(&key(), Duration::from_secs(900))
            .await
            .unwrap();
        assert_eq!(state.count, 1);
        assert!(state.retry_after_seconds(Utc::now()) <= 900);
    }

    #[tokio::test]
    async fn test_failures_accumulate_within_the_window() {
        let store = InMemoryThrottleStore::new();
        for _ in 0..3 {
            store
                .record_failure(&key(), Duration::from_secs(900))
                .await
                .unwrap();
        }
        let state = store.current(&key()).await.unwrap().unwrap();
        assert_eq!(state.count, 3);
    }

    #[tokio::test]
    async fn test_failure_after_expiry_starts_a_fresh_window() {
        let store = InMemoryThrottleStore::new();
        // A zero-length window expires immediately.
        for _ in 0..4 {
            store
                .record_failure(&key(), Duration::from_secs(0))
                .await
                .unwrap();
        }
        let state = store
            .record_failure(&key(), Duration::from_secs(900))
            .await
            .unwrap();
        assert_eq!(state.count, 1);
    }

    #[tokio::test]
    async fn test_expired_entries_read_as_absent() {
        let store = InMemoryThrottleStore::new();
        store
            .record_failure(&key(), Duration::from_secs(0))
            .await
            .unwrap();
        assert!(store.current(&key()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_clear_removes_the_entry() {
        let store = InMemoryThrottleStore::new();
        store
            .record_failure(&key(), Duration::from_secs(900))
            .await
            .unwrap();
        store.clear(&key()).await.unwrap();
        assert!(store.current(&key()).await.unwrap().is_none());
    }
}
