use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{
    account::Account,
    email::Email,
    password::Password,
    session::{PendingLogin, PendingToken, Session, SessionId},
    throttle::{ThrottleKey, ThrottleState},
    totp::TotpSecret,
};

// AccountStore port trait and errors
#[derive(Debug, Error)]
pub enum AccountStoreError {
    #[error("Account not found")]
    AccountNotFound,
    #[error("Incorrect password")]
    IncorrectPassword,
    #[error("Unexpected error: {0}")]
    UnexpectedError(String),
}

impl PartialEq for AccountStoreError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::AccountNotFound, Self::AccountNotFound) => true,
            (Self::IncorrectPassword, Self::IncorrectPassword) => true,
            (Self::UnexpectedError(_), Self::UnexpectedError(_)) => true,
            _ => false,
        }
    }
}

/// Credential and second-factor fields of accounts. The auth core never
/// creates or deletes accounts; it verifies credentials and manages the
/// TOTP secret lifecycle.
///
/// `authenticate` distinguishes unknown identity from wrong password at
/// this layer so stores stay honest; the orchestrator collapses both into
/// one caller-visible outcome to prevent account enumeration.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn authenticate(
        &self,
        email: &Email,
        password: &Password,
    ) -> Result<Account, AccountStoreError>;
    async fn get_account(&self, email: &Email) -> Result<Account, AccountStoreError>;
    async fn set_totp_secret(
        &self,
        email: &Email,
        secret: TotpSecret,
    ) -> Result<(), AccountStoreError>;
    async fn clear_totp_secret(&self, email: &Email) -> Result<(), AccountStoreError>;
}

// ThrottleStore port trait and errors
#[derive(Debug, Error)]
pub enum ThrottleStoreError {
    #[error("Throttle store unavailable: {0}")]
    Unavailable(String),
}

/// Shared attempt counters with a decay window.
///
/// `record_failure` must be atomic across concurrent requests for the same
/// key (a counter increment, not read-modify-write), and the first
/// increment of a fresh window starts the decay clock. Counter and window
/// reset together: an increment after expiry begins a new window at one.
#[async_trait]
pub trait ThrottleStore: Send + Sync {
    async fn record_failure(
        &self,
        key: &ThrottleKey,
        window: Duration,
    ) -> Result<ThrottleState, ThrottleStoreError>;
    async fn current(&self, key: &ThrottleKey) -> Result<Option<ThrottleState>, ThrottleStoreError>;
    async fn clear(&self, key: &ThrottleKey) -> Result<(), ThrottleStoreError>;
}

// SessionStore port trait and errors
#[derive(Debug, Error)]
pub enum SessionStoreError {
    #[error("Session store unavailable: {0}")]
    Unavailable(String),
}

/// Session-scoped transient state: staged pending logins, authenticated
/// sessions, and the finalized marker that makes double-finalize a no-op.
///
/// `take_pending` removes and returns in one operation; two concurrent
/// takers must see exactly one `Some`.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn put_pending(
        &self,
        token: &PendingToken,
        login: PendingLogin,
        ttl: Duration,
    ) -> Result<(), SessionStoreError>;
    async fn get_pending(
        &self,
        token: &PendingToken,
    ) -> Result<Option<PendingLogin>, SessionStoreError>;
    async fn take_pending(
        &self,
        token: &PendingToken,
    ) -> Result<Option<PendingLogin>, SessionStoreError>;
    async fn put_session(
        &self,
        id: &SessionId,
        session: Session,
        ttl: Duration,
    ) -> Result<(), SessionStoreError>;
    async fn get_session(&self, id: &SessionId) -> Result<Option<Session>, SessionStoreError>;
    async fn remove_session(&self, id: &SessionId) -> Result<(), SessionStoreError>;
    async fn mark_finalized(
        &self,
        token: &PendingToken,
        id: &SessionId,
        ttl: Duration,
    ) -> Result<(), SessionStoreError>;
    async fn finalized_session(
        &self,
        token: &PendingToken,
    ) -> Result<Option<SessionId>, SessionStoreError>;
}

// RecoveryCodeStore port trait and errors
#[derive(Debug, Error)]
pub enum RecoveryCodeStoreError {
    #[error("Recovery code store unavailable: {0}")]
    Unavailable(String),
}

/// Hashed recovery-code batches, one batch per identity.
///
/// `remove_matching` is the consume primitive: it must remove and report in
/// one operation so a replayed code cannot succeed twice.
#[async_trait]
pub trait RecoveryCodeStore: Send + Sync {
    async fn replace_all(
        &self,
        identity: &Email,
        hashes: Vec<String>,
    ) -> Result<(), RecoveryCodeStoreError>;
    async fn remove_matching(
        &self,
        identity: &Email,
        hash: &str,
    ) -> Result<bool, RecoveryCodeStoreError>;
    async fn remaining(&self, identity: &Email) -> Result<usize, RecoveryCodeStoreError>;
    async fn clear(&self, identity: &Email) -> Result<(), RecoveryCodeStoreError>;
}

// EnrollmentStore port trait and errors
#[derive(Debug, Error)]
pub enum EnrollmentStoreError {
    #[error("Enrollment store unavailable: {0}")]
    Unavailable(String),
}

/// Staged, unconfirmed TOTP secrets, keyed by the enrolling session and
/// discarded if never confirmed within the TTL. An account's active secret
/// only ever comes out of here via a successful confirm.
#[async_trait]
pub trait EnrollmentStore: Send + Sync {
    async fn stage(
        &self,
        session: &SessionId,
        secret: TotpSecret,
        ttl: Duration,
    ) -> Result<(), EnrollmentStoreError>;
    async fn staged(&self, session: &SessionId) -> Result<Option<TotpSecret>, EnrollmentStoreError>;
    async fn discard(&self, session: &SessionId) -> Result<(), EnrollmentStoreError>;
}
