use secrecy::{ExposeSecret, Secret};
use thiserror::Error;
use totp_rs::{Algorithm, TOTP};

use crate::domain::email::Email;

pub const TOTP_DIGITS: usize = 6;
pub const TOTP_STEP_SECONDS: u64 = 30;
/// Accepted clock drift, in time steps, on either side of "now".
pub const TOTP_SKEW_STEPS: u8 = 1;

#[derive(Debug, Error)]
pub enum TotpError {
    #[error("Code must be {TOTP_DIGITS} digits")]
    InvalidCodeFormat,
    #[error("Invalid second-factor secret: {0}")]
    InvalidSecret(String),
}

/// A base32-encoded TOTP secret bound to one account.
///
/// Only ever present on an account once the owner has confirmed it with a
/// valid code; staged (unconfirmed) secrets live in the enrollment store.
#[derive(Clone)]
pub struct TotpSecret(Secret<String>);

impl TotpSecret {
    pub fn new(base32: Secret<String>) -> Self {
        Self(base32)
    }
}

impl AsRef<Secret<String>> for TotpSecret {
    fn as_ref(&self) -> &Secret<String> {
        &self.0
    }
}

impl std::fmt::Debug for TotpSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("TotpSecret").field(&"[redacted]").finish()
    }
}

/// A submitted six-digit code, validated for shape before any comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TotpCode(String);

impl TotpCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TotpCode {
    type Error = TotpError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let trimmed = value.trim();
        if trimmed.len() != TOTP_DIGITS || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(TotpError::InvalidCodeFormat);
        }
        Ok(Self(trimmed.to_string()))
    }
}

/// Generates provisioning material and verifies submitted codes.
///
/// Verification tolerates the current and the immediately adjacent time
/// steps and nothing further, so a code survives clock drift but not replay
/// minutes later.
#[derive(Clone)]
pub struct TotpChallenge {
    issuer: String,
}

impl TotpChallenge {
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
        }
    }

    /// Generate a fresh secret: 160 bits of CSPRNG output, base32-encoded
    /// for manual entry (32 characters).
    pub fn generate_secret(&self) -> Result<TotpSecret, TotpError> {
        let raw = totp_rs::Secret::generate_secret()
            .to_bytes()
            .map_err(|e| TotpError::InvalidSecret(format!("{e:?}")))?;
        let totp = self.totp_for_bytes(raw, "enrollment")?;
        Ok(TotpSecret::new(Secret::from(totp.get_secret_base32())))
    }

    /// The otpauth:// URI an authenticator app consumes. QR rendering is the
    /// caller's concern; this is only the provisioning payload.
    pub fn provisioning_uri(
        &self,
        account: &Email,
        secret: &TotpSecret,
    ) -> Result<String, TotpError> {
        Ok(self.totp_for(account.normalized(), secret)?.get_url())
    }

    /// Verify a submitted code against the current time step.
    pub fn verify(&self, account: &Email, secret: &TotpSecret, code: &TotpCode) -> bool {
        match self.totp_for(account.normalized(), secret) {
            Ok(totp) => totp.check_current(code.as_str()).unwrap_or(false),
            Err(_) => false,
        }
    }

    /// Verify against an explicit unix timestamp. Drift-window behavior is
    /// deterministic here, which is what the tests exercise.
    pub fn verify_at(
        &self,
        account: &Email,
        secret: &TotpSecret,
        code: &TotpCode,
        unix_seconds: u64,
    ) -> bool {
        match self.totp_for(account.normalized(), secret) {
            Ok(totp) => totp.check(code.as_str(), unix_seconds),
            Err(_) => false,
        }
    }

    /// The code a correctly-provisioned authenticator would show at the
    /// given instant.
    pub fn code_at(
        &self,
        account: &Email,
        secret: &TotpSecret,
        unix_seconds: u64,
    ) -> Result<TotpCode, TotpError> {
        let generated = self
            .totp_for(account.normalized(), secret)?
            .generate(unix_seconds);
        TotpCode::try_from(generated)
    }

    fn totp_for(&self, account: &str, secret: &TotpSecret) -> Result<TOTP, TotpError> {
        let bytes = totp_rs::Secret::Encoded(secret.as_ref().expose_secret().clone())
            .to_bytes()
            .map_err(|e| TotpError::InvalidSecret(format!("{e:?}")))?;
        self.totp_for_bytes(bytes, account)
    }

    fn totp_for_bytes(&self, secret: Vec<u8>, account: &str) -> Result<TOTP, TotpError> {
        TOTP::new(
            Algorithm::SHA1,
            TOTP_DIGITS,
            TOTP_SKEW_STEPS,
            TOTP_STEP_SECONDS,
            secret,
            Some(self.issuer.clone()),
            account.to_string(),
        )
        .map_err(|e| TotpError::InvalidSecret(format!("{e:?}")))
    }
}
