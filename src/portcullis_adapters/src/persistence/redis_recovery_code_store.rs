use std::sync::Arc;

use redis::Connection;
use tokio::sync::RwLock;

use portcullis_core::{Email, RecoveryCodeStore, RecoveryCodeStoreError};

/// Hashed recovery-code batches as Redis sets. SREM removes and reports in
/// one command, which is what makes `remove_matching` the exactly-once
/// consume primitive.
#[derive(Clone)]
pub struct RedisRecoveryCodeStore {
    conn: Arc<RwLock<Connection>>,
}

impl RedisRecoveryCodeStore {
    pub fn new(conn: Arc<RwLock<Connection>>) -> Self {
        Self { conn }
    }
}

fn store_err(e: redis::RedisError) -> RecoveryCodeStoreError {
    RecoveryCodeStoreError::Unavailable(e.to_string())
}

#[async_trait::async_trait]
impl RecoveryCodeStore for RedisRecoveryCodeStore {
    async fn replace_all(
        &self,
        identity: &Email,
        hashes: Vec<String>,
    ) -> Result<(), RecoveryCodeStoreError> {
        let key = get_key(identity);
        let mut conn = self.conn.write().await;

        // Reset the set, then insert the fresh hashes.
        redis::cmd("DEL")
            .arg(&key)
            .query::<()>(&mut *conn)
            .map_err(store_err)?;
        for hash in hashes {
            redis::cmd("SADD")
                .arg(&key)
                .arg(hash)
                .query::<()>(&mut *conn)
                .map_err(store_err)?;
        }
        Ok(())
    }

    async fn remove_matching(
        &self,
        identity: &Email,
        hash: &str,
    ) -> Result<bool, RecoveryCodeStoreError> {
        let mut conn = self.conn.write().await;
        let removed: i32 = redis::cmd("SREM")
            .arg(get_key(identity))
            .arg(hash)
            .query(&mut *conn)
            .map_err(store_err)?;
        Ok(removed > 0)
    }

    async fn remaining(&self, identity: &Email) -> Result<usize, RecoveryCodeStoreError> {
        let mut conn = self.conn.write().await;
        let count: usize = redis::cmd("SCARD")
            .arg(get_key(identity))
            .query(&mut *conn)
            .map_err(store_err)?;
        Ok(count)
    }

    async fn clear(&self, identity: &Email) -> Result<(), RecoveryCodeStoreError> {
        let mut conn = self.conn.write().await;
        redis::cmd("DEL")
            .arg(get_key(identity))
            .query::<()>(&mut *conn)
            .map_err(store_err)?;
        Ok(())
    }
}

const RECOVERY_CODES_KEY_PREFIX: &str = "recovery_codes:";

fn get_key(identity: &Email) -> String {
    format!("{}{}", RECOVERY_CODES_KEY_PREFIX, identity.normalized())
}
