use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use redis::{Commands, Connection};
use tokio::sync::RwLock;

use portcullis_core::{ThrottleKey, ThrottleState, ThrottleStore, ThrottleStoreError};

/// Shared attempt counters in Redis. INCR makes the increment atomic across
/// processes; the key's TTL is the decay window, so counter and window
/// expire together.
#[derive(Clone)]
pub struct RedisThrottleStore {
    conn: Arc<RwLock<Connection>>,
}

impl RedisThrottleStore {
    pub fn new(conn: Arc<RwLock<Connection>>) -> Self {
        Self { conn }
    }
}

#[async_trait::async_trait]
impl ThrottleStore for RedisThrottleStore {
    async fn record_failure(
        &self,
        key: &ThrottleKey,
        window: Duration,
    ) -> Result<ThrottleState, ThrottleStoreError> {
        let key = get_key(key);
        let window_secs = window.as_secs() as i64;
        let mut conn = self.conn.write().await;

        let count: u32 = conn
            .incr(&key, 1)
            .map_err(|e| ThrottleStoreError::Unavailable(e.to_string()))?;
        if count == 1 {
            let _: () = conn
                .expire(&key, window_secs)
                .map_err(|e| ThrottleStoreError::Unavailable(e.to_string()))?;
        }

        let mut ttl: i64 = conn
            .ttl(&key)
            .map_err(|e| ThrottleStoreError::Unavailable(e.to_string()))?;
        if ttl < 0 {
            // The key lost its expiry (interrupted between INCR and
            // EXPIRE); restore the window rather than counting forever.
            let _: () = conn
                .expire(&key, window_secs)
                .map_err(|e| ThrottleStoreError::Unavailable(e.to_string()))?;
            ttl = window_secs;
        }

        Ok(ThrottleState {
            count,
            expires_at: Utc::now() + chrono::Duration::seconds(ttl),
        })
    }

    async fn current(&self, key: &ThrottleKey) -> Result<Option<ThrottleState>, ThrottleStoreError> {
        let key = get_key(key);
        let mut conn = self.conn.write().await;

        let count: Option<u32> = conn
            .get(&key)
            .map_err(|e| ThrottleStoreError::Unavailable(e.to_string()))?;
        let Some(count) = count else {
            return Ok(None);
        };

        let ttl: i64 = conn
            .ttl(&key)
            .map_err(|e| ThrottleStoreError::Unavailable(e.to_string()))?;
        if ttl < 0 {
            return Ok(None);
        }

        Ok(Some(ThrottleState {
            count,
            expires_at: Utc::now() + chrono::Duration::seconds(ttl),
        }))
    }

    async fn clear(&self, key: &ThrottleKey) -> Result<(), ThrottleStoreError> {
        let mut conn = self.conn.write().await;
        let _: () = conn
            .del(get_key(key))
            .map_err(|e| ThrottleStoreError::Unavailable(e.to_string()))?;
        Ok(())
    }
}

// Key prefix to prevent collisions with other keyspaces.
const THROTTLE_KEY_PREFIX: &str = "throttle:";

fn get_key(key: &ThrottleKey) -> String {
    format!("{}{}", THROTTLE_KEY_PREFIX, key.as_str())
}
