use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use portcullis_core::{
    PendingLogin, PendingToken, Session, SessionId, SessionStore, SessionStoreError,
};

struct Expiring<T> {
    value: T,
    expires_at: DateTime<Utc>,
}

impl<T> Expiring<T> {
    fn new(value: T, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Utc::now() + chrono::Duration::seconds(ttl.as_secs() as i64),
        }
    }

    fn live(&self) -> bool {
        self.expires_at > Utc::now()
    }
}

/// In-memory session store. All three maps sit behind one lock, so
/// take-then-mark sequences cannot interleave with a concurrent taker.
#[derive(Default, Clone)]
pub struct InMemorySessionStore {
    inner: Arc<RwLock<Inner>>,
}

#[derive(Default)]
struct Inner {
    pending: HashMap<String, Expiring<PendingLogin>>,
    sessions: HashMap<String, Expiring<Session>>,
    finalized: HashMap<String, Expiring<SessionId>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl SessionStore for InMemorySessionStore {
    async fn put_pending(
        &self,
        token: &PendingToken,
        login: PendingLogin,
        ttl: Duration,
    ) -> Result<(), SessionStoreError> {
        self.inner
            .write()
            .await
            .pending
            .insert(token.to_string(), Expiring::new(login, ttl));
        Ok(())
    }

    async fn get_pending(
        &self,
        token: &PendingToken,
    ) -> Result<Option<PendingLogin>, SessionStoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .pending
            .get(&token.to_string())
            .filter(|e| e.live())
            .map(|e| e.value.clone()))
    }

    async fn take_pending(
        &self,
        token: &PendingToken,
    ) -> Result<Option<PendingLogin>, SessionStoreError> {
        let mut inner = self.inner.write().await;
        Ok(inner
            .pending
            .remove(&token.to_string())
            .filter(|e| e.live())
            .map(|e| e.value))
    }

    async fn put_session(
        &self,
        id: &SessionId,
        session: Session,
        ttl: Duration,
    ) -> Result<(), SessionStoreError> {
        self.inner
            .write()
            .await
            .sessions
            .insert(id.to_string(), Expiring::new(session, ttl));
        Ok(())
    }

    async fn get_session(&self, id: &SessionId) -> Result<Option<Session>, SessionStoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .sessions
            .get(&id.to_string())
            .filter(|e| e.live())
            .map(|e| e.value.clone()))
    }

    async fn remove_session(&self, id: &SessionId) -> Result<(), SessionStoreError> {
        self.inner.write().await.sessions.remove(&id.to_string());
        Ok(())
    }

    async fn mark_finalized(
        &self,
        token: &PendingToken,
        id: &SessionId,
        ttl: Duration,
    ) -> Result<(), SessionStoreError> {
        self.inner
            .write()
            .await
            .finalized
            .insert(token.to_string(), Expiring::new(*id, ttl));
        Ok(())
    }

    async fn finalized_session(
        &self,
        token: &PendingToken,
    ) -> Result<Option<SessionId>, SessionStoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .finalized
            .get(&token.to_string())
            .filter(|e| e.live())
            .map(|e| e.value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portcullis_core::Email;
    use secrecy::Secret;

    fn login() -> PendingLogin {
        PendingLogin {
            email: Email::try_from(Secret::from("user@example.com".to_string())).unwrap(),
            remember: false,
            origin: "10.0.0.1".parse().unwrap(),
            staged_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_take_pending_consumes_exactly_once() {
        let store = InMemorySessionStore::new();
        let token = PendingToken::generate();
        store
            .put_pending(&token, login(), Duration::from_secs(300))
            .await
            .unwrap();

        assert!(store.take_pending(&token).await.unwrap().is_some());
        assert!(store.take_pending(&token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_pending_reads_as_absent() {
        let store = InMemorySessionStore::new();
        let token = PendingToken::generate();
        store
            .put_pending(&token, login(), Duration::from_secs(0))
            .await
            .unwrap();

        assert!(store.get_pending(&token).await.unwrap().is_none());
        assert!(store.take_pending(&token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_staging_again_overwrites_the_previous_record() {
        let store = InMemorySessionStore::new();
        let token = PendingToken::generate();
        let mut first = login();
        first.remember = false;
        store
            .put_pending(&token, first, Duration::from_secs(300))
            .await
            .unwrap();

        let mut second = login();
        second.remember = true;
        store
            .put_pending(&token, second, Duration::from_secs(300))
            .await
            .unwrap();

        assert!(store.get_pending(&token).await.unwrap().unwrap().remember);
    }

    #[tokio::test]
    async fn test_finalized_marker_round_trips() {
        let store = InMemorySessionStore::new();
        let token = PendingToken::generate();
        let id = SessionId::generate();

        store
            .mark_finalized(&token, &id, Duration::from_secs(300))
            .await
            .unwrap();
        assert_eq!(store.finalized_session(&token).await.unwrap(), Some(id));
    }
}
