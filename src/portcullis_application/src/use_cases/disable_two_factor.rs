use std::net::IpAddr;

use portcullis_core::{
    AccountStore, AccountStoreError, AuditEvent, AuditKind, AuditSink, Email, Password,
    RecoveryCodeStore,
};

use crate::recovery_vault::{RecoveryCodeVault, RecoveryVaultError};

/// Error types for the disable two-factor use case
#[derive(Debug, thiserror::Error)]
pub enum DisableTwoFactorError {
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Account store error: {0}")]
    AccountStore(AccountStoreError),
    #[error("Recovery vault error: {0}")]
    RecoveryVault(#[from] RecoveryVaultError),
}

/// Turns the second factor off for an account.
///
/// Requires re-entry of the primary credential, not a TOTP code: disabling
/// must be at least as hard as logging in, so a hijacked-but-unlocked
/// session cannot silently downgrade the account. Clears the secret and the
/// whole recovery batch together.
#[derive(Clone)]
pub struct DisableTwoFactorUseCase<A, R, D>
where
    A: AccountStore,
    R: RecoveryCodeStore,
    D: AuditSink,
{
    accounts: A,
    vault: RecoveryCodeVault<R>,
    audit: D,
}

impl<A, R, D> DisableTwoFactorUseCase<A, R, D>
where
    A: AccountStore,
    R: RecoveryCodeStore,
    D: AuditSink,
{
    pub fn new(accounts: A, vault: RecoveryCodeVault<R>, audit: D) -> Self {
        Self {
            accounts,
            vault,
            audit,
        }
    }

    #[tracing::instrument(name = "DisableTwoFactorUseCase::execute", skip(self, password))]
    pub async fn execute(
        &self,
        email: &Email,
        password: &Password,
        origin: IpAddr,
    ) -> Result<(), DisableTwoFactorError> {
        match self.accounts.authenticate(email, password).await {
            Ok(_) => {}
            Err(AccountStoreError::AccountNotFound | AccountStoreError::IncorrectPassword) => {
                return Err(DisableTwoFactorError::InvalidCredentials);
            }
            Err(e) => return Err(DisableTwoFactorError::AccountStore(e)),
        }

        self.accounts
            .clear_totp_secret(email)
            .await
            .map_err(DisableTwoFactorError::AccountStore)?;
        self.vault.clear(email).await?;

        self.audit
            .emit(AuditEvent::new(AuditKind::TwoFactorDisabled, email, origin));
        Ok(())
    }
}
