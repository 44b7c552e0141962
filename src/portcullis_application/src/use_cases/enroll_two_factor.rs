use std::net::IpAddr;
use std::time::Duration;

use portcullis_core::{
    AccountStore, AccountStoreError, AuditEvent, AuditKind, AuditSink, Email, EnrollmentStore,
    EnrollmentStoreError, RecoveryCode, RecoveryCodeStore, SessionId, TotpChallenge, TotpCode,
    TotpError, TotpSecret,
};

use crate::recovery_vault::{RecoveryCodeVault, RecoveryVaultError};

/// What the caller needs to provision an authenticator: the secret for
/// manual entry and the otpauth URI for QR rendering.
#[derive(Debug)]
pub struct TwoFactorSetup {
    pub secret: TotpSecret,
    pub provisioning_uri: String,
}

/// Error types for the two-factor enrollment use case
#[derive(Debug, thiserror::Error)]
pub enum EnrollTwoFactorError {
    #[error("Two-factor authentication is already enabled")]
    AlreadyEnabled,
    #[error("No staged secret for this session")]
    NoStagedSecret,
    #[error("Invalid second factor code")]
    InvalidCode,
    #[error("Account store error: {0}")]
    AccountStore(#[from] AccountStoreError),
    #[error("Enrollment store error: {0}")]
    EnrollmentStore(#[from] EnrollmentStoreError),
    #[error("Recovery vault error: {0}")]
    RecoveryVault(#[from] RecoveryVaultError),
    #[error("TOTP error: {0}")]
    Totp(#[from] TotpError),
}

/// Two-phase TOTP enrollment for an authenticated session.
///
/// `begin` stages a fresh secret against the session; nothing touches the
/// account yet, and an unconfirmed secret simply expires with its TTL.
/// `confirm` promotes the staged secret to the account's active second
/// factor only after the user proves possession with one valid code, then
/// issues the recovery batch. A crash between the two phases can never
/// leave a secret active that the user's authenticator does not hold.
#[derive(Clone)]
pub struct EnrollTwoFactorUseCase<A, E, R, D>
where
    A: AccountStore,
    E: EnrollmentStore,
    R: RecoveryCodeStore,
    D: AuditSink,
{
    accounts: A,
    staged: E,
    vault: RecoveryCodeVault<R>,
    challenge: TotpChallenge,
    staged_ttl: Duration,
    audit: D,
}

impl<A, E, R, D> EnrollTwoFactorUseCase<A, E, R, D>
where
    A: AccountStore,
    E: EnrollmentStore,
    R: RecoveryCodeStore,
    D: AuditSink,
{
    pub fn new(
        accounts: A,
        staged: E,
        vault: RecoveryCodeVault<R>,
        challenge: TotpChallenge,
        staged_ttl: Duration,
        audit: D,
    ) -> Self {
        Self {
            accounts,
            staged,
            vault,
            challenge,
            staged_ttl,
            audit,
        }
    }

    #[tracing::instrument(name = "EnrollTwoFactorUseCase::begin", skip(self))]
    pub async fn begin(
        &self,
        session: &SessionId,
        email: &Email,
    ) -> Result<TwoFactorSetup, EnrollTwoFactorError> {
        let account = self.accounts.get_account(email).await?;
        if account.second_factor_enabled() {
            return Err(EnrollTwoFactorError::AlreadyEnabled);
        }

        let secret = self.challenge.generate_secret()?;
        // Re-running begin overwrites any prior staged secret for this
        // session.
        self.staged
            .stage(session, secret.clone(), self.staged_ttl)
            .await?;
        let provisioning_uri = self.challenge.provisioning_uri(email, &secret)?;

        Ok(TwoFactorSetup {
            secret,
            provisioning_uri,
        })
    }

    #[tracing::instrument(name = "EnrollTwoFactorUseCase::confirm", skip(self, code))]
    pub async fn confirm(
        &self,
        session: &SessionId,
        email: &Email,
        code: &TotpCode,
        origin: IpAddr,
    ) -> Result<Vec<RecoveryCode>, EnrollTwoFactorError> {
        let Some(secret) = self.staged.staged(session).await? else {
            return Err(EnrollTwoFactorError::NoStagedSecret);
        };

        if !self.challenge.verify(email, &secret, code) {
            // Staged state survives a typo; the user retries with the next
            // code.
            return Err(EnrollTwoFactorError::InvalidCode);
        }

        self.accounts.set_totp_secret(email, secret).await?;
        self.staged.discard(session).await?;
        let codes = self.vault.issue_batch(email).await?;

        self.audit
            .emit(AuditEvent::new(AuditKind::TwoFactorEnabled, email, origin));
        Ok(codes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portcullis_core::{
        Account, AccountStatus, Password, RECOVERY_CODE_COUNT, RecoveryCodeStoreError,
    };
    use secrecy::{ExposeSecret, Secret};
    use std::collections::{HashMap, HashSet};
    use std::sync::{Arc, Mutex};
    use std::time::{SystemTime, UNIX_EPOCH};
    use tokio::sync::RwLock;

    #[derive(Clone, Default)]
    struct MockAccountStore {
        accounts: Arc<RwLock<HashMap<Email, (String, Account)>>>,
    }

    impl MockAccountStore {
        async fn insert(&self, email: &Email, password: &str, totp: Option<TotpSecret>) {
            let account = Account::new(email.clone(), AccountStatus::Active, totp);
            self.accounts
                .write()
                .await
                .insert(email.clone(), (password.to_string(), account));
        }
    }

    #[async_trait::async_trait]
    impl AccountStore for MockAccountStore {
        async fn authenticate(
            &self,
            email: &Email,
            password: &Password,
        ) -> Result<Account, AccountStoreError> {
            let accounts = self.accounts.read().await;
            let (stored, account) = accounts
                .get(email)
                .ok_or(AccountStoreError::AccountNotFound)?;
            if stored != password.as_ref().expose_secret() {
                return Err(AccountStoreError::IncorrectPassword);
            }
            Ok(account.clone())
        }

        async fn get_account(&self, email: &Email) -> Result<Account, AccountStoreError> {
            self.accounts
                .read()
                .await
                .get(email)
                .map(|(_, account)| account.clone())
                .ok_or(AccountStoreError::AccountNotFound)
        }

        async fn set_totp_secret(
            &self,
            email: &Email,
            secret: TotpSecret,
        ) -> Result<(), AccountStoreError> {
            let mut accounts = self.accounts.write().await;
            let (_, account) = accounts
                .get_mut(email)
                .ok_or(AccountStoreError::AccountNotFound)?;
            *account = Account::new(account.email().clone(), account.status(), Some(secret));
            Ok(())
        }

        async fn clear_totp_secret(&self, email: &Email) -> Result<(), AccountStoreError> {
            let mut accounts = self.accounts.write().await;
            let (_, account) = accounts
                .get_mut(email)
                .ok_or(AccountStoreError::AccountNotFound)?;
            *account = Account::new(account.email().clone(), account.status(), None);
            Ok(())
        }
    }

    #[derive(Clone, Default)]
    struct MockEnrollmentStore {
        staged: Arc<RwLock<HashMap<String, TotpSecret>>>,
    }

    #[async_trait::async_trait]
    impl EnrollmentStore for MockEnrollmentStore {
        async fn stage(
            &self,
            session: &SessionId,
            secret: TotpSecret,
            _ttl: Duration,
        ) -> Result<(), EnrollmentStoreError> {
            self.staged.write().await.insert(session.to_string(), secret);
            Ok(())
        }

        async fn staged(
            &self,
            session: &SessionId,
        ) -> Result<Option<TotpSecret>, EnrollmentStoreError> {
            Ok(self.staged.read().await.get(&session.to_string()).cloned())
        }

        async fn discard(&self, session: &SessionId) -> Result<(), EnrollmentStoreError> {
            self.staged.write().await.remove(&session.to_string());
            Ok(())
        }
    }

    #[derive(Clone, Default)]
    struct MockRecoveryCodeStore {
        batches: Arc<RwLock<HashMap<String, HashSet<String>>>>,
    }

    #[async_trait::async_trait]
    impl RecoveryCodeStore for MockRecoveryCodeStore {
        async fn replace_all(
            &self,
            identity: &Email,
            hashes: Vec<String>,
        ) -> Result<(), RecoveryCodeStoreError> {
            self.batches.write().await.insert(
                identity.normalized().to_string(),
                hashes.into_iter().collect(),
            );
            Ok(())
        }

        async fn remove_matching(
            &self,
            identity: &Email,
            hash: &str,
        ) -> Result<bool, RecoveryCodeStoreError> {
            Ok(self
                .batches
                .write()
                .await
                .get_mut(identity.normalized())
                .is_some_and(|codes| codes.remove(hash)))
        }

        async fn remaining(&self, identity: &Email) -> Result<usize, RecoveryCodeStoreError> {
            Ok(self
                .batches
                .read()
                .await
                .get(identity.normalized())
                .map_or(0, HashSet::len))
        }

        async fn clear(&self, identity: &Email) -> Result<(), RecoveryCodeStoreError> {
            self.batches.write().await.remove(identity.normalized());
            Ok(())
        }
    }

    #[derive(Clone, Default)]
    struct MockAuditSink {
        events: Arc<Mutex<Vec<AuditEvent>>>,
    }

    impl AuditSink for MockAuditSink {
        fn emit(&self, event: AuditEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    fn email() -> Email {
        Email::try_from(Secret::from("user@example.com".to_string())).unwrap()
    }

    fn now_unix() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs()
    }

    fn use_case(
        accounts: MockAccountStore,
    ) -> EnrollTwoFactorUseCase<MockAccountStore, MockEnrollmentStore, MockRecoveryCodeStore, MockAuditSink>
    {
        EnrollTwoFactorUseCase::new(
            accounts,
            MockEnrollmentStore::default(),
            RecoveryCodeVault::new(MockRecoveryCodeStore::default()),
            TotpChallenge::new("Portcullis"),
            Duration::from_secs(600),
            MockAuditSink::default(),
        )
    }

    #[tokio::test]
    async fn test_begin_then_confirm_activates_and_issues_recovery_codes() {
        let accounts = MockAccountStore::default();
        accounts.insert(&email(), "correct-password", None).await;
        let uc = use_case(accounts.clone());
        let session = SessionId::generate();

        let setup = uc.begin(&session, &email()).await.unwrap();
        assert!(setup.provisioning_uri.starts_with("otpauth://totp/"));

        // The account is untouched until the code proves possession.
        assert!(!accounts.get_account(&email()).await.unwrap().second_factor_enabled());

        let challenge = TotpChallenge::new("Portcullis");
        let code = challenge.code_at(&email(), &setup.secret, now_unix()).unwrap();
        let codes = uc
            .confirm(&session, &email(), &code, "10.0.0.1".parse().unwrap())
            .await
            .unwrap();

        assert_eq!(codes.len(), RECOVERY_CODE_COUNT);
        assert!(accounts.get_account(&email()).await.unwrap().second_factor_enabled());
    }

    #[tokio::test]
    async fn test_begin_is_rejected_when_already_enabled() {
        let accounts = MockAccountStore::default();
        let secret = TotpChallenge::new("Portcullis").generate_secret().unwrap();
        accounts.insert(&email(), "correct-password", Some(secret)).await;
        let uc = use_case(accounts);

        let result = uc.begin(&SessionId::generate(), &email()).await;
        assert!(matches!(result, Err(EnrollTwoFactorError::AlreadyEnabled)));
    }

    #[tokio::test]
    async fn test_confirm_without_staged_secret_is_rejected() {
        let accounts = MockAccountStore::default();
        accounts.insert(&email(), "correct-password", None).await;
        let uc = use_case(accounts);

        let code = TotpCode::try_from("123456".to_string()).unwrap();
        let result = uc
            .confirm(&SessionId::generate(), &email(), &code, "10.0.0.1".parse().unwrap())
            .await;
        assert!(matches!(result, Err(EnrollTwoFactorError::NoStagedSecret)));
    }

    #[tokio::test]
    async fn test_wrong_code_leaves_staged_secret_for_retry() {
        let accounts = MockAccountStore::default();
        accounts.insert(&email(), "correct-password", None).await;
        let uc = use_case(accounts.clone());
        let session = SessionId::generate();

        let setup = uc.begin(&session, &email()).await.unwrap();
        let challenge = TotpChallenge::new("Portcullis");
        let current = challenge.code_at(&email(), &setup.secret, now_unix()).unwrap();
        let wrong = TotpCode::try_from("000000".to_string()).unwrap();
        if current == wrong {
            return;
        }

        let result = uc
            .confirm(&session, &email(), &wrong, "10.0.0.1".parse().unwrap())
            .await;
        assert!(matches!(result, Err(EnrollTwoFactorError::InvalidCode)));
        assert!(!accounts.get_account(&email()).await.unwrap().second_factor_enabled());

        // Retry with the right code succeeds against the same staged secret.
        let code = challenge.code_at(&email(), &setup.secret, now_unix()).unwrap();
        assert!(uc
            .confirm(&session, &email(), &code, "10.0.0.1".parse().unwrap())
            .await
            .is_ok());
    }
}
