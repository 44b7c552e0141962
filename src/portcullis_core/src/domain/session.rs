use std::net::IpAddr;

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::email::Email;

#[derive(Debug, Error)]
#[error("Malformed session token")]
pub struct MalformedToken;

/// Identifier of a fully authenticated session. Always freshly generated by
/// `finalize`, never inherited from the pre-authentication session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl TryFrom<&str> for SessionId {
    type Error = MalformedToken;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Uuid::parse_str(value).map(Self).map_err(|_| MalformedToken)
    }
}

/// Opaque handle to a staged "first factor passed, second factor pending"
/// login. Consumed exactly once by finalize or abandon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PendingToken(Uuid);

impl PendingToken {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for PendingToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl TryFrom<&str> for PendingToken {
    type Error = MalformedToken;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Uuid::parse_str(value).map(Self).map_err(|_| MalformedToken)
    }
}

/// Transient record bridging the two factors. Carries the account reference
/// and remember flag only, never credential or secret material. The origin
/// is the address of the first-factor request, kept so the login throttle
/// key can be cleared once the second factor passes.
#[derive(Debug, Clone)]
pub struct PendingLogin {
    pub email: Email,
    pub remember: bool,
    pub origin: IpAddr,
    pub staged_at: DateTime<Utc>,
}

/// A fully authenticated session record.
#[derive(Debug, Clone)]
pub struct Session {
    pub email: Email,
    pub remember: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_ids_are_unique() {
        assert_ne!(SessionId::generate(), SessionId::generate());
    }

    #[test]
    fn test_tokens_round_trip_through_display() {
        let token = PendingToken::generate();
        assert_eq!(PendingToken::try_from(token.to_string().as_str()).unwrap(), token);

        let session = SessionId::generate();
        assert_eq!(SessionId::try_from(session.to_string().as_str()).unwrap(), session);
    }

    #[test]
    fn test_garbage_tokens_are_rejected() {
        assert!(SessionId::try_from("not-a-uuid").is_err());
        assert!(PendingToken::try_from("").is_err());
    }
}
