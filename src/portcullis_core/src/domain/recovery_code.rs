use rand::Rng;
use sha2::{Digest, Sha256};

pub const RECOVERY_CODE_COUNT: usize = 8;
pub const RECOVERY_CODE_LENGTH: usize = 10;

const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Strip the formatting users add when copying codes around: dashes and
/// whitespace go, everything else is uppercased.
pub fn normalize(input: &str) -> String {
    input
        .chars()
        .filter(|c| *c != '-' && !c.is_whitespace())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// A single-use fallback credential, held in canonical (normalized) form.
///
/// Plaintext exists only in the issuance response; storage is hash-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryCode(String);

impl RecoveryCode {
    /// Canonicalize arbitrary user input. Codes that were never issued
    /// simply fail to match any stored hash; there is no format error to
    /// leak.
    pub fn parse(input: &str) -> Self {
        Self(normalize(input))
    }

    /// Generate a fresh batch from a CSPRNG. The whole batch replaces any
    /// prior one; partial regeneration is not supported anywhere upstream.
    pub fn generate_batch(count: usize, length: usize) -> Vec<Self> {
        let mut rng = rand::rng();
        (0..count)
            .map(|_| {
                let code: String = (0..length)
                    .map(|_| CHARSET[rng.random_range(0..CHARSET.len())] as char)
                    .collect();
                Self(code)
            })
            .collect()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Hash for at-rest storage and matching.
    pub fn hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.0.as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    #[test]
    fn test_batch_has_requested_shape() {
        let batch = RecoveryCode::generate_batch(RECOVERY_CODE_COUNT, RECOVERY_CODE_LENGTH);
        assert_eq!(batch.len(), RECOVERY_CODE_COUNT);
        for code in &batch {
            assert_eq!(code.as_str().len(), RECOVERY_CODE_LENGTH);
            assert!(code.as_str().bytes().all(|b| CHARSET.contains(&b)));
        }
    }

    #[test]
    fn test_normalization_strips_dashes_whitespace_and_uppercases() {
        assert_eq!(normalize("ab12-cd34 ef"), "AB12CD34EF");
        assert_eq!(
            RecoveryCode::parse("ab12-cd34ef").hash(),
            RecoveryCode::parse("AB12CD34EF").hash()
        );
    }

    #[test]
    fn test_different_codes_hash_differently() {
        let a = RecoveryCode::parse("AB12CD34EF");
        let b = RecoveryCode::parse("AB12CD34EG");
        assert_ne!(a.hash(), b.hash());
    }

    #[quickcheck]
    fn prop_normalization_is_idempotent(input: String) -> bool {
        normalize(&normalize(&input)) == normalize(&input)
    }
}
