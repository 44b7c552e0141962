use std::hash::{Hash, Hasher};
use std::sync::LazyLock;

use regex::Regex;
use secrecy::{ExposeSecret, Secret};
use thiserror::Error;

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email regex must compile")
});

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("Invalid email address")]
    Invalid,
}

/// A login identity, normalized to lowercase at parse time.
///
/// Lookup, throttle keys and recovery-code ownership are all keyed by this
/// type, so the normalization here is what makes identity matching
/// case-insensitive everywhere at once.
#[derive(Clone)]
pub struct Email(Secret<String>);

impl Email {
    /// The normalized identity as stored in throttle keys and audit events.
    pub fn normalized(&self) -> &str {
        self.0.expose_secret()
    }
}

impl TryFrom<Secret<String>> for Email {
    type Error = EmailError;

    fn try_from(value: Secret<String>) -> Result<Self, Self::Error> {
        let candidate = value.expose_secret().trim().to_lowercase();
        if !EMAIL_REGEX.is_match(&candidate) {
            return Err(EmailError::Invalid);
        }
        Ok(Self(Secret::from(candidate)))
    }
}

impl AsRef<Secret<String>> for Email {
    fn as_ref(&self) -> &Secret<String> {
        &self.0
    }
}

impl std::fmt::Debug for Email {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Email").field(&"[redacted]").finish()
    }
}

impl PartialEq for Email {
    fn eq(&self, other: &Self) -> bool {
        self.0.expose_secret() == other.0.expose_secret()
    }
}

impl Eq for Email {}

impl Hash for Email {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.expose_secret().hash(state);
    }
}
