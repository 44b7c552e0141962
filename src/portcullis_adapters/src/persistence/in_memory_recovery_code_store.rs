use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

use portcullis_core::{Email, RecoveryCodeStore, RecoveryCodeStoreError};

/// In-memory recovery-code batches. Removal happens under the write lock,
/// so a code consumed by one caller is gone before the next looks.
#[derive(Default, Clone)]
pub struct InMemoryRecoveryCodeStore {
    batches: Arc<RwLock<HashMap<String, HashSet<String>>>>,
}

impl InMemoryRecoveryCodeStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl RecoveryCodeStore for InMemoryRecoveryCodeStore {
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

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::Secret;

    fn email() -> Email {
        Email::try_from(Secret::from("user@example.com".to_string())).unwrap()
    }

    #[tokio::test]
    async fn test_remove_matching_reports_and_consumes() {
        let store = InMemoryRecoveryCodeStore::new();
        store
            .replace_all(&email(), vec!["h1".to_string(), "h2".to_string()])
            .await
            .unwrap();

        assert!(store.remove_matching(&email(), "h1").await.unwrap());
        assert!(!store.remove_matching(&email(), "h1").await.unwrap());
        assert_eq!(store.remaining(&email()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_replace_all_discards_the_prior_batch() {
        let store = InMemoryRecoveryCodeStore::new();
        store
            .replace_all(&email(), vec!["old".to_string()])
            .await
            .unwrap();
        store
            .replace_all(&email(), vec!["new".to_string()])
            .await
            .unwrap();

        assert!(!store.remove_matching(&email(), "old").await.unwrap());
        assert!(store.remove_matching(&email(), "new").await.unwrap());
    }
}
