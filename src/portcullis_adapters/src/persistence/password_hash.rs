use argon2::{
    Algorithm, Argon2, Params, PasswordHash, PasswordVerifier, Version,
    password_hash::{PasswordHasher, SaltString, rand_core},
};
use portcullis_core::Password;
use secrecy::{ExposeSecret, Secret};

fn argon2() -> Result<Argon2<'static>, String> {
    Ok(Argon2::new(
        Algorithm::Argon2id,
        Version::V0x13,
        Params::new(15000, 2, 1, None).map_err(|e| e.to_string())?,
    ))
}

#[tracing::instrument(name = "Verify password hash", skip_all)]
pub async fn verify_password_hash(
    expected_password_hash: Secret<String>,
    password_candidate: Password,
) -> Result<(), String> {
    let current_span: tracing::Span = tracing::Span::current();
    let result = tokio::task::spawn_blocking(move || {
        current_span.in_scope(|| {
            let expected_password_hash: PasswordHash<'_> =
                PasswordHash::new(expected_password_hash.expose_secret())
                    .map_err(|e| e.to_string())?;

            argon2()?
                .verify_password(
                    password_candidate.as_ref().expose_secret().as_bytes(),
                    &expected_password_hash,
                )
                .map_err(|e| e.to_string())
        })
    })
    .await
    .map_err(|e| e.to_string())?;

    result
}

#[tracing::instrument(name = "Computing password hash", skip_all)]
pub async fn compute_password_hash(password: Password) -> Result<Secret<String>, String> {
    let current_span: tracing::Span = tracing::Span::current();

    let result = tokio::task::spawn_blocking(move || {
        current_span.in_scope(move || {
            let salt: SaltString = SaltString::generate(rand_core::OsRng);
            argon2()?
                .hash_password(password.as_ref().expose_secret().as_bytes(), &salt)
                .map(|h| Secret::from(h.to_string()))
                .map_err(|e| e.to_string())
        })
    })
    .await
    .map_err(|e| e.to_string())?;

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn password(raw: &str) -> Password {
        Password::try_from(Secret::from(raw.to_string())).unwrap()
    }

    #[tokio::test]
    async fn test_hash_round_trip() {
        let hash = compute_password_hash(password("hunter2hunter2")).await.unwrap();
        assert!(
            verify_password_hash(hash, password("hunter2hunter2"))
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_wrong_candidate_is_rejected() {
        let hash = compute_password_hash(password("hunter2hunter2")).await.unwrap();
        assert!(
            verify_password_hash(hash, password("not-the-password"))
                .await
                .is_err()
        );
    }
}
