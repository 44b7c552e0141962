use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use portcullis_core::{
    Account, AccountStatus, AccountStore, AccountStoreError, Email, Password, TotpSecret,
};
use secrecy::Secret;

use super::password_hash::{compute_password_hash, verify_password_hash};

struct StoredAccount {
    password_hash: Secret<String>,
    status: AccountStatus,
    totp_secret: Option<TotpSecret>,
}

/// In-memory account store for tests and single-process deployments.
/// Passwords are argon2-hashed exactly like the Postgres store's.
#[derive(Default, Clone)]
pub struct InMemoryAccountStore {
    accounts: Arc<RwLock<HashMap<Email, StoredAccount>>>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self {
            accounts: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Seed an account. Account creation itself belongs to the
    /// account-management subsystem; this exists so tests and demos can set
    /// the stage.
    pub async fn add_account(
        &self,
        email: Email,
        password: Password,
        status: AccountStatus,
        totp_secret: Option<TotpSecret>,
    ) -> Result<(), AccountStoreError> {
        let password_hash = compute_password_hash(password)
            .await
            .map_err(AccountStoreError::UnexpectedError)?;
        self.accounts.write().await.insert(
            email,
            StoredAccount {
                password_hash,
                status,
                totp_secret,
            },
        );
        Ok(())
    }
}

#[async_trait::async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn authenticate(
        &self,
        email: &Email,
        password: &Password,
    ) -> Result<Account, AccountStoreError> {
        let (password_hash, account) = {
            let accounts = self.accounts.read().await;
            let stored = accounts.get(email).ok_or(AccountStoreError::AccountNotFound)?;
            (
                stored.password_hash.clone(),
                Account::new(email.clone(), stored.status, stored.totp_secret.clone()),
            )
        };

        verify_password_hash(password_hash, password.clone())
            .await
            .map_err(|_| AccountStoreError::IncorrectPassword)?;

        Ok(account)
    }

    async fn get_account(&self, email: &Email) -> Result<Account, AccountStoreError> {
        let accounts = self.accounts.read().await;
        let stored = accounts.get(email).ok_or(AccountStoreError::AccountNotFound)?;
        Ok(Account::new(
            email.clone(),
            stored.status,
            stored.totp_secret.clone(),
        ))
    }

    async fn set_totp_secret(
        &self,
        email: &Email,
        secret: TotpSecret,
    ) -> Result<(), AccountStoreError> {
        let mut accounts = self.accounts.write().await;
        let stored = accounts
            .get_mut(email)
            .ok_or(AccountStoreError::AccountNotFound)?;
        stored.totp_secret = Some(secret);
        Ok(())
    }

    async fn clear_totp_secret(&self, email: &Email) -> Result<(), AccountStoreError> {
        let mut accounts = self.accounts.write().await;
        let stored = accounts
            .get_mut(email)
            .ok_or(AccountStoreError::AccountNotFound)?;
        stored.totp_secret = None;
        Ok(())
    }
}
