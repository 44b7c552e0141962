use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use portcullis_core::{EnrollmentStore, EnrollmentStoreError, SessionId, TotpSecret};

/// In-memory staged enrollment secrets with lazy TTL expiry.
#[derive(Default, Clone)]
pub struct InMemoryEnrollmentStore {
    staged: Arc<RwLock<HashMap<String, (TotpSecret, DateTime<Utc>)>>>,
}

impl InMemoryEnrollmentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl EnrollmentStore for InMemoryEnrollmentStore {
    async fn stage(
        &self,
        session: &SessionId,
        secret: TotpSecret,
        ttl: Duration,
    ) -> Result<(), EnrollmentStoreError> {
        let expires_at = Utc::now() + chrono::Duration::seconds(ttl.as_secs() as i64);
        self.staged
            .write()
            .await
            .insert(session.to_string(), (secret, expires_at));
        Ok(())
    }

    async fn staged(&self, session: &SessionId) -> Result<Option<TotpSecret>, EnrollmentStoreError> {
        let staged = self.staged.read().await;
        Ok(staged
            .get(&session.to_string())
            .filter(|(_, expires_at)| *expires_at > Utc::now())
            .map(|(secret, _)| secret.clone()))
    }

    async fn discard(&self, session: &SessionId) -> Result<(), EnrollmentStoreError> {
        self.staged.write().await.remove(&session.to_string());
        Ok(())
    }
}
