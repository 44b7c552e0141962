use std::net::IpAddr;

use portcullis_core::{
    AccountStatus, AccountStore, AccountStoreError, AuditEvent, AuditKind, AuditSink, Email,
    Password, PendingLogin, PendingToken, RecoveryCodeStore, SessionId, SessionStore,
    StatusDecision, ThrottleDecision, ThrottleKey, ThrottleStore, TotpChallenge, TotpCode,
    evaluate_status,
};

use crate::{
    rate_limiter::RateLimiter,
    recovery_vault::{LOW_RECOVERY_CODE_THRESHOLD, RecoveryCodeVault, RecoveryVaultError},
    session_bridge::{SessionBridge, SessionBridgeError},
};

/// The result of a first-factor login attempt.
#[derive(Debug, Clone)]
pub enum LoginOutcome {
    /// No second factor on the account; the session is live.
    Authenticated { session: SessionId },
    /// First factor passed, second factor pending behind the token.
    SecondFactorRequired { pending: PendingToken },
}

/// The result of a successful second-factor verification.
#[derive(Debug, Clone)]
pub struct SecondFactorSuccess {
    pub session: SessionId,
    pub used_recovery_code: bool,
    /// Codes left in the batch, populated on the recovery path only.
    pub recovery_codes_remaining: Option<usize>,
}

impl SecondFactorSuccess {
    /// Whether the caller should warn the user to regenerate their batch.
    pub fn low_recovery_codes(&self) -> bool {
        matches!(self.recovery_codes_remaining, Some(n) if n <= LOW_RECOVERY_CODE_THRESHOLD)
    }
}

/// Caller-visible failure taxonomy. Unknown identity and wrong password are
/// deliberately indistinguishable, as are the different ways a code can be
/// wrong.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Too many attempts; retry in {retry_after_seconds} seconds")]
    AccountLocked { retry_after_seconds: u64 },
    #[error("Account is not active")]
    AccountInactive { status: AccountStatus },
    #[error("Invalid second factor code")]
    InvalidSecondFactorCode,
    #[error("Invalid recovery code")]
    InvalidRecoveryCode,
    #[error("Session expired")]
    SessionExpired,
    #[error("Unexpected error: {0}")]
    UnexpectedError(String),
}

impl From<SessionBridgeError> for AuthError {
    fn from(error: SessionBridgeError) -> Self {
        match error {
            SessionBridgeError::Expired => AuthError::SessionExpired,
            SessionBridgeError::Store(e) => AuthError::UnexpectedError(e.to_string()),
        }
    }
}

impl From<RecoveryVaultError> for AuthError {
    fn from(error: RecoveryVaultError) -> Self {
        AuthError::UnexpectedError(error.to_string())
    }
}

/// Composes the credential gate, rate limiting, account-status policy,
/// session bridging and both second factors into the login state machine:
///
/// `Anonymous → CredentialsChecked → (SecondFactorPending | Authenticated)`,
/// with `SecondFactorPending` resolving to `Authenticated` via a TOTP code
/// or a recovery code, or back to `Anonymous` on abandonment.
///
/// One instance per service; every flow the rest of the system calls goes
/// through here.
#[derive(Clone)]
pub struct AuthOrchestrator<A, T, S, R, D>
where
    A: AccountStore,
    T: ThrottleStore,
    S: SessionStore,
    R: RecoveryCodeStore,
    D: AuditSink,
{
    accounts: A,
    login_limiter: RateLimiter<T>,
    second_factor_limiter: RateLimiter<T>,
    sessions: SessionBridge<S>,
    vault: RecoveryCodeVault<R>,
    challenge: TotpChallenge,
    audit: D,
}

impl<A, T, S, R, D> AuthOrchestrator<A, T, S, R, D>
where
    A: AccountStore,
    T: ThrottleStore,
    S: SessionStore,
    R: RecoveryCodeStore,
    D: AuditSink,
{
    /// Build with the contract thresholds (6 per 900 s first factor, 5 per
    /// pending token second factor).
    pub fn new(
        accounts: A,
        throttle: T,
        sessions: SessionBridge<S>,
        vault: RecoveryCodeVault<R>,
        challenge: TotpChallenge,
        audit: D,
    ) -> Self
    where
        T: Clone,
    {
        Self::with_limiters(
            accounts,
            RateLimiter::for_login(throttle.clone()),
            RateLimiter::for_second_factor(throttle),
            sessions,
            vault,
            challenge,
            audit,
        )
    }

    /// Build with explicitly configured limiters.
    pub fn with_limiters(
        accounts: A,
        login_limiter: RateLimiter<T>,
        second_factor_limiter: RateLimiter<T>,
        sessions: SessionBridge<S>,
        vault: RecoveryCodeVault<R>,
        challenge: TotpChallenge,
        audit: D,
    ) -> Self {
        Self {
            accounts,
            login_limiter,
            second_factor_limiter,
            sessions,
            vault,
            challenge,
            audit,
        }
    }

    /// First-factor login.
    ///
    /// Order matters: the throttle gate runs before the credential check so
    /// a locked key never reaches the store, and the throttle clears only
    /// on a fully authenticated outcome. A valid password against an
    /// inactive account still consumes an attempt slot.
    #[tracing::instrument(name = "AuthOrchestrator::login", skip(self, password))]
    pub async fn login(
        &self,
        email: Email,
        password: Password,
        remember: bool,
        origin: IpAddr,
    ) -> Result<LoginOutcome, AuthError> {
        let key = ThrottleKey::login(&email, origin);

        if let ThrottleDecision::Locked {
            retry_after_seconds,
        } = self.login_limiter.check(&key).await
        {
            self.audit
                .emit(AuditEvent::new(AuditKind::LockedOut, &email, origin));
            return Err(AuthError::AccountLocked {
                retry_after_seconds,
            });
        }

        let account = match self.accounts.authenticate(&email, &password).await {
            Ok(account) => account,
            Err(AccountStoreError::AccountNotFound | AccountStoreError::IncorrectPassword) => {
                self.login_limiter.record_failure(&key).await;
                self.audit.emit(AuditEvent::new(
                    AuditKind::CredentialsRejected,
                    &email,
                    origin,
                ));
                return Err(AuthError::InvalidCredentials);
            }
            Err(AccountStoreError::UnexpectedError(e)) => {
                return Err(AuthError::UnexpectedError(e));
            }
        };

        if let StatusDecision::Deny(status) = evaluate_status(account.status()) {
            self.login_limiter.record_failure(&key).await;
            self.audit.emit(AuditEvent::new(
                AuditKind::InactiveAccountRejected,
                &email,
                origin,
            ));
            return Err(AuthError::AccountInactive { status });
        }

        if account.second_factor_enabled() {
            let pending = self
                .sessions
                .stage_pending(account.email().clone(), remember, origin)
                .await?;
            self.audit.emit(AuditEvent::new(
                AuditKind::SecondFactorRequired,
                &email,
                origin,
            ));
            return Ok(LoginOutcome::SecondFactorRequired { pending });
        }

        let session = self
            .sessions
            .finalize_direct(account.email().clone(), remember)
            .await?;
        self.login_limiter.clear(&key).await;
        self.audit
            .emit(AuditEvent::new(AuditKind::Authenticated, &email, origin));
        Ok(LoginOutcome::Authenticated { session })
    }

    /// Complete a pending login with a TOTP code.
    #[tracing::instrument(name = "AuthOrchestrator::verify_totp", skip(self, code))]
    pub async fn verify_totp(
        &self,
        token: PendingToken,
        code: TotpCode,
        origin: IpAddr,
    ) -> Result<SecondFactorSuccess, AuthError> {
        let pending = self.guarded_pending(&token, origin).await?;
        let pending = match pending {
            Guarded::Pending(p) => p,
            Guarded::AlreadyFinalized(success) => return Ok(success),
        };

        let account = self
            .accounts
            .get_account(&pending.email)
            .await
            .map_err(|e| AuthError::UnexpectedError(e.to_string()))?;

        let Some(secret) = account.totp_secret() else {
            // Second factor was disabled mid-flight; the pending state is
            // meaningless now.
            self.sessions.abandon(&token).await?;
            return Err(AuthError::SessionExpired);
        };

        if !self.challenge.verify(&pending.email, secret, &code) {
            self.second_factor_limiter
                .record_failure(&ThrottleKey::second_factor(&token))
                .await;
            self.audit.emit(AuditEvent::new(
                AuditKind::SecondFactorFailed,
                &pending.email,
                origin,
            ));
            return Err(AuthError::InvalidSecondFactorCode);
        }

        self.complete(&token, &pending, origin, None).await
    }

    /// Complete a pending login with a single-use recovery code.
    #[tracing::instrument(name = "AuthOrchestrator::verify_recovery_code", skip(self, submitted))]
    pub async fn verify_recovery_code(
        &self,
        token: PendingToken,
        submitted: &str,
        origin: IpAddr,
    ) -> Result<SecondFactorSuccess, AuthError> {
        let pending = self.guarded_pending(&token, origin).await?;
        let pending = match pending {
            Guarded::Pending(p) => p,
            Guarded::AlreadyFinalized(success) => return Ok(success),
        };

        if !self.vault.consume(&pending.email, submitted).await? {
            self.second_factor_limiter
                .record_failure(&ThrottleKey::second_factor(&token))
                .await;
            self.audit.emit(AuditEvent::new(
                AuditKind::RecoveryCodeRejected,
                &pending.email,
                origin,
            ));
            return Err(AuthError::InvalidRecoveryCode);
        }

        let remaining = self.vault.remaining(&pending.email).await?;
        self.audit.emit(AuditEvent::new(
            AuditKind::RecoveryCodeUsed,
            &pending.email,
            origin,
        ));
        self.complete(&token, &pending, origin, Some(remaining)).await
    }

    /// Invalidate an authenticated session. Logging out a session that no
    /// longer exists is a no-op.
    #[tracing::instrument(name = "AuthOrchestrator::logout", skip(self))]
    pub async fn logout(&self, session_id: &SessionId, origin: IpAddr) -> Result<(), AuthError> {
        match self.sessions.session(session_id).await {
            Ok(session) => {
                self.sessions.invalidate(session_id).await?;
                self.audit.emit(AuditEvent::new(
                    AuditKind::LoggedOut,
                    &session.email,
                    origin,
                ));
                Ok(())
            }
            Err(SessionBridgeError::Expired) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Shared read of pending state for both second-factor paths.
    ///
    /// Handles the two non-happy cases: a token whose login already
    /// finalized (same browser retrying: return the existing session), and
    /// a token that has burned through the guess ceiling (abandon the
    /// pending login entirely; the caller restarts at the password gate,
    /// which is still throttled).
    async fn guarded_pending(
        &self,
        token: &PendingToken,
        origin: IpAddr,
    ) -> Result<Guarded, AuthError> {
        let pending = match self.sessions.read_pending(token).await {
            Ok(pending) => pending,
            Err(SessionBridgeError::Expired) => {
                return match self.sessions.finalize(token).await {
                    Ok(finalized) => Ok(Guarded::AlreadyFinalized(SecondFactorSuccess {
                        session: finalized.session_id,
                        used_recovery_code: false,
                        recovery_codes_remaining: None,
                    })),
                    Err(_) => Err(AuthError::SessionExpired),
                };
            }
            Err(e) => return Err(e.into()),
        };

        let sf_key = ThrottleKey::second_factor(token);
        if let ThrottleDecision::Locked { .. } = self.second_factor_limiter.check(&sf_key).await {
            self.sessions.abandon(token).await?;
            self.audit.emit(AuditEvent::new(
                AuditKind::PendingLoginAbandoned,
                &pending.email,
                origin,
            ));
            return Err(AuthError::SessionExpired);
        }

        Ok(Guarded::Pending(pending))
    }

    async fn complete(
        &self,
        token: &PendingToken,
        pending: &PendingLogin,
        origin: IpAddr,
        recovery_codes_remaining: Option<usize>,
    ) -> Result<SecondFactorSuccess, AuthError> {
        let finalized = self.sessions.finalize(token).await?;

        // Full authentication: clear the first-factor counter under the key
        // of the original login request, and the guess counter for this
        // token.
        self.login_limiter
            .clear(&ThrottleKey::login(&pending.email, pending.origin))
            .await;
        self.second_factor_limiter
            .clear(&ThrottleKey::second_factor(token))
            .await;

        if finalized.fresh {
            self.audit.emit(AuditEvent::new(
                AuditKind::Authenticated,
                &pending.email,
                origin,
            ));
        }

        Ok(SecondFactorSuccess {
            session: finalized.session_id,
            used_recovery_code: recovery_codes_remaining.is_some(),
            recovery_codes_remaining,
        })
    }
}

enum Guarded {
    Pending(PendingLogin),
    AlreadyFinalized(SecondFactorSuccess),
}
