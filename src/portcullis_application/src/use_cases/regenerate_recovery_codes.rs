use std::net::IpAddr;

use portcullis_core::{
    AccountStore, AccountStoreError, AuditEvent, AuditKind, AuditSink, Email, Password,
    RecoveryCode, RecoveryCodeStore,
};

use crate::recovery_vault::{RecoveryCodeVault, RecoveryVaultError};

/// Error types for the regenerate recovery codes use case
#[derive(Debug, thiserror::Error)]
pub enum RegenerateRecoveryCodesError {
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Two-factor authentication is not enabled")]
    NotEnabled,
    #[error("Account store error: {0}")]
    AccountStore(AccountStoreError),
    #[error("Recovery vault error: {0}")]
    RecoveryVault(#[from] RecoveryVaultError),
}

/// Replaces the recovery batch in full after password re-entry.
///
/// There is no partial regeneration: the old batch is invalidated whether
/// or not the user ever stores the new one.
#[derive(Clone)]
pub struct RegenerateRecoveryCodesUseCase<A, R, D>
where
    A: AccountStore,
    R: RecoveryCodeStore,
    D: AuditSink,
{
    accounts: A,
    vault: RecoveryCodeVault<R>,
    audit: D,
}

impl<A, R, D> RegenerateRecoveryCodesUseCase<A, R, D>
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

    #[tracing::instrument(name = "RegenerateRecoveryCodesUseCase::execute", skip(self, password))]
    pub async fn execute(
        &self,
        email: &Email,
        password: &Password,
        origin: IpAddr,
    ) -> Result<Vec<RecoveryCode>, RegenerateRecoveryCodesError> {
        let account = match self.accounts.authenticate(email, password).await {
            Ok(account) => account,
            Err(AccountStoreError::AccountNotFound | AccountStoreError::IncorrectPassword) => {
                return Err(RegenerateRecoveryCodesError::InvalidCredentials);
            }
            Err(e) => return Err(RegenerateRecoveryCodesError::AccountStore(e)),
        };

        if !account.second_factor_enabled() {
            return Err(RegenerateRecoveryCodesError::NotEnabled);
        }

        let codes = self.vault.issue_batch(email).await?;
        self.audit.emit(AuditEvent::new(
            AuditKind::RecoveryCodesRegenerated,
            email,
            origin,
        ));
        Ok(codes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portcullis_core::{
        Account, AccountStatus, RecoveryCodeStoreError, TotpChallenge, TotpSecret,
    };
    use secrecy::{ExposeSecret, Secret};
    use std::collections::{HashMap, HashSet};
    use std::sync::{Arc, Mutex};
    use tokio::sync::RwLock;

    #[derive(Clone, Default)]
    struct MockAccountStore {
        accounts: Arc<RwLock<HashMap<Email, (String, Account)>>>,
    }

    impl MockAccountStore {
        async fn insert(&self, password: &str, totp: Option<TotpSecret>) {
            let account = Account::new(email(), AccountStatus::Active, totp);
            self.accounts
                .write()
                .await
                .insert(email(), (password.to_string(), account));
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
            _email: &Email,
            _secret: TotpSecret,
        ) -> Result<(), AccountStoreError> {
            unimplemented!()
        }

        async fn clear_totp_secret(&self, _email: &Email) -> Result<(), AccountStoreError> {
            unimplemented!()
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

    fn password(raw: &str) -> Password {
        Password::try_from(Secret::from(raw.to_string())).unwrap()
    }

    #[tokio::test]
    async fn test_wrong_credential_leaves_existing_batch_untouched() {
        let accounts = MockAccountStore::default();
        let secret = TotpChallenge::new("Portcullis").generate_secret().unwrap();
        accounts.insert("correct-password", Some(secret)).await;

        let recovery = MockRecoveryCodeStore::default();
        let seeded = RecoveryCodeVault::new(recovery.clone());
        let old_batch = seeded.issue_batch(&email()).await.unwrap();

        let uc = RegenerateRecoveryCodesUseCase::new(
            accounts,
            RecoveryCodeVault::new(recovery),
            MockAuditSink::default(),
        );

        let result = uc
            .execute(&email(), &password("wrong-password"), "10.0.0.1".parse().unwrap())
            .await;
        assert!(matches!(
            result,
            Err(RegenerateRecoveryCodesError::InvalidCredentials)
        ));

        // The old batch still consumes.
        assert!(seeded.consume(&email(), old_batch[0].as_str()).await.unwrap());
    }

    #[tokio::test]
    async fn test_regeneration_requires_an_active_second_factor() {
        let accounts = MockAccountStore::default();
        accounts.insert("correct-password", None).await;

        let uc = RegenerateRecoveryCodesUseCase::new(
            accounts,
            RecoveryCodeVault::new(MockRecoveryCodeStore::default()),
            MockAuditSink::default(),
        );

        let result = uc
            .execute(&email(), &password("correct-password"), "10.0.0.1".parse().unwrap())
            .await;
        assert!(matches!(result, Err(RegenerateRecoveryCodesError::NotEnabled)));
    }

    #[tokio::test]
    async fn test_regeneration_replaces_the_old_batch() {
        let accounts = MockAccountStore::default();
        let secret = TotpChallenge::new("Portcullis").generate_secret().unwrap();
        accounts.insert("correct-password", Some(secret)).await;

        let recovery = MockRecoveryCodeStore::default();
        let seeded = RecoveryCodeVault::new(recovery.clone());
        let old_batch = seeded.issue_batch(&email()).await.unwrap();

        let uc = RegenerateRecoveryCodesUseCase::new(
            accounts,
            RecoveryCodeVault::new(recovery),
            MockAuditSink::default(),
        );

        let new_batch = uc
            .execute(&email(), &password("correct-password"), "10.0.0.1".parse().unwrap())
            .await
            .unwrap();
        assert_eq!(new_batch.len(), 8);

        // Old codes are dead, new ones live.
        assert!(!seeded.consume(&email(), old_batch[0].as_str()).await.unwrap());
        assert!(seeded.consume(&email(), new_batch[0].as_str()).await.unwrap());
    }
}
