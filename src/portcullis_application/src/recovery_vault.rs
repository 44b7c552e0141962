use portcullis_core::{
    Email, RECOVERY_CODE_COUNT, RECOVERY_CODE_LENGTH, RecoveryCode, RecoveryCodeStore,
    RecoveryCodeStoreError,
};

/// Remaining-count at or below which callers should warn the user to
/// regenerate.
pub const LOW_RECOVERY_CODE_THRESHOLD: usize = 2;

/// Error types for the recovery code vault
#[derive(Debug, thiserror::Error)]
pub enum RecoveryVaultError {
    #[error("Recovery code store error: {0}")]
    Store(#[from] RecoveryCodeStoreError),
}

/// Issues and consumes single-use recovery codes.
///
/// Plaintext leaves this component exactly once, in the batch returned by
/// `issue_batch`; only hashes are stored. Consumption is delegated to the
/// store's atomic remove so a replayed code can never succeed twice.
#[derive(Clone)]
pub struct RecoveryCodeVault<R>
where
    R: RecoveryCodeStore,
{
    store: R,
    batch_size: usize,
    code_length: usize,
}

impl<R> RecoveryCodeVault<R>
where
    R: RecoveryCodeStore,
{
    pub fn new(store: R) -> Self {
        Self {
            store,
            batch_size: RECOVERY_CODE_COUNT,
            code_length: RECOVERY_CODE_LENGTH,
        }
    }

    pub fn with_shape(store: R, batch_size: usize, code_length: usize) -> Self {
        Self {
            store,
            batch_size,
            code_length,
        }
    }

    /// Generate a fresh batch and replace any prior one in full. There is
    /// no incremental add; the old batch is invalidated unconditionally.
    #[tracing::instrument(name = "RecoveryCodeVault::issue_batch", skip_all)]
    pub async fn issue_batch(
        &self,
        identity: &Email,
    ) -> Result<Vec<RecoveryCode>, RecoveryVaultError> {
        let batch = RecoveryCode::generate_batch(self.batch_size, self.code_length);
        let hashes = batch.iter().map(RecoveryCode::hash).collect();
        self.store.replace_all(identity, hashes).await?;
        Ok(batch)
    }

    /// Normalize, hash and atomically consume a submitted code. Returns
    /// whether a stored code matched; the caller decides what the failure
    /// looks like (always generic).
    #[tracing::instrument(name = "RecoveryCodeVault::consume", skip_all)]
    pub async fn consume(
        &self,
        identity: &Email,
        submitted: &str,
    ) -> Result<bool, RecoveryVaultError> {
        let code = RecoveryCode::parse(submitted);
        Ok(self.store.remove_matching(identity, &code.hash()).await?)
    }

    pub async fn remaining(&self, identity: &Email) -> Result<usize, RecoveryVaultError> {
        Ok(self.store.remaining(identity).await?)
    }

    /// Drop the whole batch, e.g. when the second factor is disabled.
    pub async fn clear(&self, identity: &Email) -> Result<(), RecoveryVaultError> {
        Ok(self.store.clear(identity).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::Secret;
    use std::collections::{HashMap, HashSet};
    use std::sync::Arc;
    use tokio::sync::RwLock;

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
            self.batches
                .write()
                .await
                .insert(identity.normalized().to_string(), hashes.into_iter().collect());
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

    fn email() -> Email {
        Email::try_from(Secret::from("user@example.com".to_string())).unwrap()
    }

    #[tokio::test]
    async fn test_each_issued_code_consumes_exactly_once() {
        let vault = RecoveryCodeVault::new(MockRecoveryCodeStore::default());
        let batch = vault.issue_batch(&email()).await.unwrap();
        assert_eq!(batch.len(), RECOVERY_CODE_COUNT);

        for code in &batch {
            assert!(vault.consume(&email(), code.as_str()).await.unwrap());
            assert!(!vault.consume(&email(), code.as_str()).await.unwrap());
        }
        assert_eq!(vault.remaining(&email()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_consume_tolerates_user_formatting() {
        let vault = RecoveryCodeVault::new(MockRecoveryCodeStore::default());
        let batch = vault.issue_batch(&email()).await.unwrap();

        let pretty = format!(
            " {}-{} ",
            &batch[0].as_str()[..5].to_lowercase(),
            &batch[0].as_str()[5..].to_lowercase()
        );
        assert!(vault.consume(&email(), &pretty).await.unwrap());
    }

    #[tokio::test]
    async fn test_replacement_invalidates_the_prior_batch() {
        let vault = RecoveryCodeVault::new(MockRecoveryCodeStore::default());
        let old = vault.issue_batch(&email()).await.unwrap();
        let new = vault.issue_batch(&email()).await.unwrap();

        for code in &old {
            assert!(!vault.consume(&email(), code.as_str()).await.unwrap());
        }
        assert!(vault.consume(&email(), new[0].as_str()).await.unwrap());
    }

    #[tokio::test]
    async fn test_unknown_code_is_rejected() {
        let vault = RecoveryCodeVault::new(MockRecoveryCodeStore::default());
        vault.issue_batch(&email()).await.unwrap();
        assert!(!vault.consume(&email(), "AAAAAAAAAA").await.unwrap());
    }
}
