use portcullis_core::{
    Account, AccountStatus, AccountStore, AccountStoreError, Email, Password, TotpSecret,
};
use secrecy::{ExposeSecret, Secret};
use sqlx::{Pool, Postgres, Row};

use super::password_hash::verify_password_hash;

pub struct PostgresAccountStore {
    pool: sqlx::PgPool,
}

impl PostgresAccountStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        PostgresAccountStore { pool }
    }
}

fn account_from_row(email: &Email, row: &sqlx::postgres::PgRow) -> Result<Account, AccountStoreError> {
    let status: String = row
        .try_get("status")
        .map_err(|e| AccountStoreError::UnexpectedError(e.to_string()))?;
    let status: AccountStatus = status
        .parse()
        .map_err(|e: portcullis_core::UnknownAccountStatus| {
            AccountStoreError::UnexpectedError(e.to_string())
        })?;
    let totp_secret: Option<String> = row
        .try_get("totp_secret")
        .map_err(|e| AccountStoreError::UnexpectedError(e.to_string()))?;

    Ok(Account::new(
        email.clone(),
        status,
        totp_secret.map(|s| TotpSecret::new(Secret::from(s))),
    ))
}

#[async_trait::async_trait]
impl AccountStore for PostgresAccountStore {
    #[tracing::instrument(name = "Validating credentials in PostgreSQL", skip_all)]
    async fn authenticate(
        &self,
        email: &Email,
        password: &Password,
    ) -> Result<Account, AccountStoreError> {
        let row = sqlx::query(
            r#"
                SELECT password_hash, status, totp_secret
                FROM accounts
                WHERE email = $1
            "#,
        )
        .bind(email.normalized())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AccountStoreError::UnexpectedError(e.to_string()))?;

        let Some(row) = row else {
            return Err(AccountStoreError::AccountNotFound);
        };

        let password_hash: String = row
            .try_get("password_hash")
            .map_err(|e| AccountStoreError::UnexpectedError(e.to_string()))?;

        verify_password_hash(Secret::from(password_hash), password.clone())
            .await
            .map_err(|_| AccountStoreError::IncorrectPassword)?;

        account_from_row(email, &row)
    }

    #[tracing::instrument(name = "Retrieving account from PostgreSQL", skip_all)]
    async fn get_account(&self, email: &Email) -> Result<Account, AccountStoreError> {
        let row = sqlx::query(
            r#"
                SELECT password_hash, status, totp_secret
                FROM accounts
                WHERE email = $1
            "#,
        )
        .bind(email.normalized())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AccountStoreError::UnexpectedError(e.to_string()))?;

        let Some(row) = row else {
            return Err(AccountStoreError::AccountNotFound);
        };

        account_from_row(email, &row)
    }

    #[tracing::instrument(name = "Setting TOTP secret in PostgreSQL", skip_all)]
    async fn set_totp_secret(
        &self,
        email: &Email,
        secret: TotpSecret,
    ) -> Result<(), AccountStoreError> {
        let result = sqlx::query(
            r#"
                UPDATE accounts
                SET totp_secret = $1
                WHERE email = $2
            "#,
        )
        .bind(secret.as_ref().expose_secret())
        .bind(email.normalized())
        .execute(&self.pool)
        .await
        .map_err(|e| AccountStoreError::UnexpectedError(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(AccountStoreError::AccountNotFound);
        }
        Ok(())
    }

    #[tracing::instrument(name = "Clearing TOTP secret in PostgreSQL", skip_all)]
    async fn clear_totp_secret(&self, email: &Email) -> Result<(), AccountStoreError> {
        let result = sqlx::query(
            r#"
                UPDATE accounts
                SET totp_secret = NULL
                WHERE email = $1
            "#,
        )
        .bind(email.normalized())
        .execute(&self.pool)
        .await
        .map_err(|e| AccountStoreError::UnexpectedError(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(AccountStoreError::AccountNotFound);
        }
        Ok(())
    }
}
