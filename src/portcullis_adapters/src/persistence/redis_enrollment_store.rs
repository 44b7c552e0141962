use std::sync::Arc;
use std::time::Duration;

use redis::{Commands, Connection};
use secrecy::{ExposeSecret, Secret};
use tokio::sync::RwLock;

use portcullis_core::{EnrollmentStore, EnrollmentStoreError, SessionId, TotpSecret};

/// Staged, unconfirmed TOTP secrets in Redis. The TTL is the discard
/// policy: a secret nobody confirms simply ages out.
#[derive(Clone)]
pub struct RedisEnrollmentStore {
    conn: Arc<RwLock<Connection>>,
}

impl RedisEnrollmentStore {
    pub fn new(conn: Arc<RwLock<Connection>>) -> Self {
        Self { conn }
    }
}

fn store_err(e: redis::RedisError) -> EnrollmentStoreError {
    EnrollmentStoreError::Unavailable(e.to_string())
}

#[async_trait::async_trait]
impl EnrollmentStore for RedisEnrollmentStore {
    async fn stage(
        &self,
        session: &SessionId,
        secret: TotpSecret,
        ttl: Duration,
    ) -> Result<(), EnrollmentStoreError> {
        let mut conn = self.conn.write().await;
        conn.set_ex(
            get_key(session),
            secret.as_ref().expose_secret().clone(),
            ttl.as_secs(),
        )
        .map_err(store_err)
    }

    async fn staged(&self, session: &SessionId) -> Result<Option<TotpSecret>, EnrollmentStoreError> {
        let mut conn = self.conn.write().await;
        let secret: Option<String> = conn.get(get_key(session)).map_err(store_err)?;
        Ok(secret.map(|s| TotpSecret::new(Secret::from(s))))
    }

    async fn discard(&self, session: &SessionId) -> Result<(), EnrollmentStoreError> {
        let mut conn = self.conn.write().await;
        let _: () = conn.del(get_key(session)).map_err(store_err)?;
        Ok(())
    }
}

const ENROLLMENT_KEY_PREFIX: &str = "staged_totp:";

fn get_key(session: &SessionId) -> String {
    format!("{ENROLLMENT_KEY_PREFIX}{session}")
}
