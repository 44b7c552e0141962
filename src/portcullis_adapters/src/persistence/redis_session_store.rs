use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use redis::{Commands, Connection};
use secrecy::Secret;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use portcullis_core::{
    Email, PendingLogin, PendingToken, Session, SessionId, SessionStore, SessionStoreError,
};

/// Session-scoped transient state in Redis, one JSON value per key with the
/// TTL enforcing expiry. `take_pending` uses GETDEL so a pending login is
/// handed to at most one caller.
#[derive(Clone)]
pub struct RedisSessionStore {
    conn: Arc<RwLock<Connection>>,
}

impl RedisSessionStore {
    pub fn new(conn: Arc<RwLock<Connection>>) -> Self {
        Self { conn }
    }
}

#[derive(Serialize, Deserialize)]
struct PendingRecord {
    email: String,
    remember: bool,
    origin: std::net::IpAddr,
    staged_at: i64,
}

impl PendingRecord {
    fn from_login(login: &PendingLogin) -> Self {
        Self {
            email: login.email.normalized().to_string(),
            remember: login.remember,
            origin: login.origin,
            staged_at: login.staged_at.timestamp(),
        }
    }

    fn into_login(self) -> Result<PendingLogin, SessionStoreError> {
        Ok(PendingLogin {
            email: parse_email(self.email)?,
            remember: self.remember,
            origin: self.origin,
            staged_at: DateTime::from_timestamp(self.staged_at, 0)
                .ok_or_else(|| corrupt("pending record timestamp"))?,
        })
    }
}

#[derive(Serialize, Deserialize)]
struct SessionRecord {
    email: String,
    remember: bool,
}

impl SessionRecord {
    fn from_session(session: &Session) -> Self {
        Self {
            email: session.email.normalized().to_string(),
            remember: session.remember,
        }
    }

    fn into_session(self) -> Result<Session, SessionStoreError> {
        Ok(Session {
            email: parse_email(self.email)?,
            remember: self.remember,
        })
    }
}

fn parse_email(raw: String) -> Result<Email, SessionStoreError> {
    Email::try_from(Secret::from(raw)).map_err(|_| corrupt("session record email"))
}

fn corrupt(what: &str) -> SessionStoreError {
    SessionStoreError::Unavailable(format!("corrupt {what}"))
}

fn store_err(e: redis::RedisError) -> SessionStoreError {
    SessionStoreError::Unavailable(e.to_string())
}

fn json_err(e: serde_json::Error) -> SessionStoreError {
    SessionStoreError::Unavailable(e.to_string())
}

#[async_trait::async_trait]
impl SessionStore for RedisSessionStore {
    async fn put_pending(
        &self,
        token: &PendingToken,
        login: PendingLogin,
        ttl: Duration,
    ) -> Result<(), SessionStoreError> {
        let payload = serde_json::to_string(&PendingRecord::from_login(&login)).map_err(json_err)?;
        let mut conn = self.conn.write().await;
        conn.set_ex(pending_key(token), payload, ttl.as_secs())
            .map_err(store_err)
    }

    async fn get_pending(
        &self,
        token: &PendingToken,
    ) -> Result<Option<PendingLogin>, SessionStoreError> {
        let mut conn = self.conn.write().await;
        let payload: Option<String> = conn.get(pending_key(token)).map_err(store_err)?;
        payload
            .map(|p| serde_json::from_str::<PendingRecord>(&p).map_err(json_err)?.into_login())
            .transpose()
    }

    async fn take_pending(
        &self,
        token: &PendingToken,
    ) -> Result<Option<PendingLogin>, SessionStoreError> {
        let mut conn = self.conn.write().await;
        // GETDEL: remove and return in one round trip so concurrent takers
        // see exactly one Some.
        let payload: Option<String> = redis::cmd("GETDEL")
            .arg(pending_key(token))
            .query(&mut *conn)
            .map_err(store_err)?;
        payload
            .map(|p| serde_json::from_str::<PendingRecord>(&p).map_err(json_err)?.into_login())
            .transpose()
    }

    async fn put_session(
        &self,
        id: &SessionId,
        session: Session,
        ttl: Duration,
    ) -> Result<(), SessionStoreError> {
        let payload =
            serde_json::to_string(&SessionRecord::from_session(&session)).map_err(json_err)?;
        let mut conn = self.conn.write().await;
        conn.set_ex(session_key(id), payload, ttl.as_secs())
            .map_err(store_err)
    }

    async fn get_session(&self, id: &SessionId) -> Result<Option<Session>, SessionStoreError> {
        let mut conn = self.conn.write().await;
        let payload: Option<String> = conn.get(session_key(id)).map_err(store_err)?;
        payload
            .map(|p| serde_json::from_str::<SessionRecord>(&p).map_err(json_err)?.into_session())
            .transpose()
    }

    async fn remove_session(&self, id: &SessionId) -> Result<(), SessionStoreError> {
        let mut conn = self.conn.write().await;
        let _: () = conn.del(session_key(id)).map_err(store_err)?;
        Ok(())
    }

    async fn mark_finalized(
        &self,
        token: &PendingToken,
        id: &SessionId,
        ttl: Duration,
    ) -> Result<(), SessionStoreError> {
        let mut conn = self.conn.write().await;
        conn.set_ex(finalized_key(token), id.to_string(), ttl.as_secs())
            .map_err(store_err)
    }

    async fn finalized_session(
        &self,
        token: &PendingToken,
    ) -> Result<Option<SessionId>, SessionStoreError> {
        let mut conn = self.conn.write().await;
        let id: Option<String> = conn.get(finalized_key(token)).map_err(store_err)?;
        id.map(|raw| SessionId::try_from(raw.as_str()).map_err(|_| corrupt("finalized marker")))
            .transpose()
    }
}

// Key prefixes to prevent collisions between the three record kinds.
const PENDING_KEY_PREFIX: &str = "pending:";
const SESSION_KEY_PREFIX: &str = "session:";
const FINALIZED_KEY_PREFIX: &str = "finalized:";

fn pending_key(token: &PendingToken) -> String {
    format!("{PENDING_KEY_PREFIX}{token}")
}

fn session_key(id: &SessionId) -> String {
    format!("{SESSION_KEY_PREFIX}{id}")
}

fn finalized_key(token: &PendingToken) -> String {
    format!("{FINALIZED_KEY_PREFIX}{token}")
}
