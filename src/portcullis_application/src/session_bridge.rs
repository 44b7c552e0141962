use std::net::IpAddr;
use std::time::Duration;

use chrono::Utc;
use portcullis_core::{
    Email, PendingLogin, PendingToken, Session, SessionId, SessionStore, SessionStoreError,
};

/// Error types for session bridging
#[derive(Debug, thiserror::Error)]
pub enum SessionBridgeError {
    #[error("Session expired")]
    Expired,
    #[error("Session store error: {0}")]
    Store(#[from] SessionStoreError),
}

/// Result of finalizing a pending login. `fresh` is false when the token
/// was already finalized and the existing session was returned instead of a
/// new one being created.
#[derive(Debug, Clone)]
pub struct FinalizedSession {
    pub session_id: SessionId,
    pub email: Email,
    pub remember: bool,
    pub fresh: bool,
}

/// Holds the transient "first factor passed, second factor pending" state
/// and finalizes sessions.
///
/// A browser session is in exactly one of three states: unauthenticated
/// (no record), pending-second-factor (a `PendingLogin` behind a token), or
/// fully authenticated (a `Session` behind a session id). `finalize` always
/// generates a fresh session id, so an identifier fixed before login never
/// survives into an authenticated session.
#[derive(Clone)]
pub struct SessionBridge<S>
where
    S: SessionStore,
{
    store: S,
    pending_ttl: Duration,
    session_ttl: Duration,
    remember_ttl: Duration,
}

impl<S> SessionBridge<S>
where
    S: SessionStore,
{
    pub fn new(
        store: S,
        pending_ttl: Duration,
        session_ttl: Duration,
        remember_ttl: Duration,
    ) -> Self {
        Self {
            store,
            pending_ttl,
            session_ttl,
            remember_ttl,
        }
    }

    fn ttl_for(&self, remember: bool) -> Duration {
        if remember {
            self.remember_ttl
        } else {
            self.session_ttl
        }
    }

    /// Stage a pending second-factor login and hand back its token. Only
    /// the account reference, remember flag and first-factor origin go into
    /// the record, never credential or secret material. A re-login simply
    /// stages a new token; the superseded one dies with its TTL.
    #[tracing::instrument(name = "SessionBridge::stage_pending", skip_all)]
    pub async fn stage_pending(
        &self,
        email: Email,
        remember: bool,
        origin: IpAddr,
    ) -> Result<PendingToken, SessionBridgeError> {
        let token = PendingToken::generate();
        let login = PendingLogin {
            email,
            remember,
            origin,
            staged_at: Utc::now(),
        };
        self.store
            .put_pending(&token, login, self.pending_ttl)
            .await?;
        Ok(token)
    }

    /// Read a staged login without consuming it. Fails closed: a token with
    /// no staged state means the caller restarts at the first factor.
    pub async fn read_pending(
        &self,
        token: &PendingToken,
    ) -> Result<PendingLogin, SessionBridgeError> {
        self.store
            .get_pending(token)
            .await?
            .ok_or(SessionBridgeError::Expired)
    }

    /// Consume the pending state and mint an authenticated session under a
    /// freshly generated identifier.
    ///
    /// Finalizing an already-finalized token returns the existing session
    /// with `fresh: false` instead of erroring: two tabs racing to complete
    /// the same login both land in the same session.
    #[tracing::instrument(name = "SessionBridge::finalize", skip(self))]
    pub async fn finalize(
        &self,
        token: &PendingToken,
    ) -> Result<FinalizedSession, SessionBridgeError> {
        if let Some(pending) = self.store.take_pending(token).await? {
            let session_id = SessionId::generate();
            let session = Session {
                email: pending.email.clone(),
                remember: pending.remember,
            };
            self.store
                .put_session(&session_id, session, self.ttl_for(pending.remember))
                .await?;
            self.store
                .mark_finalized(token, &session_id, self.pending_ttl)
                .await?;
            return Ok(FinalizedSession {
                session_id,
                email: pending.email,
                remember: pending.remember,
                fresh: true,
            });
        }

        if let Some(session_id) = self.store.finalized_session(token).await? {
            if let Some(session) = self.store.get_session(&session_id).await? {
                return Ok(FinalizedSession {
                    session_id,
                    email: session.email,
                    remember: session.remember,
                    fresh: false,
                });
            }
        }

        Err(SessionBridgeError::Expired)
    }

    /// Mint an authenticated session directly, for accounts with no second
    /// factor. The session id is generated here for the same fixation
    /// reason as in `finalize`.
    #[tracing::instrument(name = "SessionBridge::finalize_direct", skip_all)]
    pub async fn finalize_direct(
        &self,
        email: Email,
        remember: bool,
    ) -> Result<SessionId, SessionBridgeError> {
        let session_id = SessionId::generate();
        let session = Session { email, remember };
        self.store
            .put_session(&session_id, session, self.ttl_for(remember))
            .await?;
        Ok(session_id)
    }

    /// Drop staged state without finalizing (user gave up, ceiling hit).
    pub async fn abandon(&self, token: &PendingToken) -> Result<(), SessionBridgeError> {
        self.store.take_pending(token).await?;
        Ok(())
    }

    /// Look up an authenticated session, failing closed on absence.
    pub async fn session(&self, id: &SessionId) -> Result<Session, SessionBridgeError> {
        self.store
            .get_session(id)
            .await?
            .ok_or(SessionBridgeError::Expired)
    }

    /// Invalidate an authenticated session entirely.
    #[tracing::instrument(name = "SessionBridge::invalidate", skip(self))]
    pub async fn invalidate(&self, id: &SessionId) -> Result<(), SessionBridgeError> {
        self.store.remove_session(id).await?;
        Ok(())
    }
}
