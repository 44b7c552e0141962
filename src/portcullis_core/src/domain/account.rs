use std::str::FromStr;

use thiserror::Error;

use crate::domain::{email::Email, totp::TotpSecret};

/// Lifecycle status of an account, owned by the account-management
/// subsystem. The auth core only reads it through the status policy below.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountStatus {
    Active,
    Suspended,
    Pending,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Active => "active",
            AccountStatus::Suspended => "suspended",
            AccountStatus::Pending => "pending",
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown account status: {0}")]
pub struct UnknownAccountStatus(String);

impl FromStr for AccountStatus {
    type Err = UnknownAccountStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(AccountStatus::Active),
            "suspended" => Ok(AccountStatus::Suspended),
            "pending" => Ok(AccountStatus::Pending),
            other => Err(UnknownAccountStatus(other.to_string())),
        }
    }
}

/// The subset of an account the auth core reads: identity, status, and the
/// active (confirmed) second-factor secret if one exists.
#[derive(Debug, Clone)]
pub struct Account {
    email: Email,
    status: AccountStatus,
    totp_secret: Option<TotpSecret>,
}

impl Account {
    pub fn new(email: Email, status: AccountStatus, totp_secret: Option<TotpSecret>) -> Self {
        Self {
            email,
            status,
            totp_secret,
        }
    }

    pub fn email(&self) -> &Email {
        &self.email
    }

    pub fn status(&self) -> AccountStatus {
        self.status
    }

    pub fn totp_secret(&self) -> Option<&TotpSecret> {
        self.totp_secret.as_ref()
    }

    pub fn second_factor_enabled(&self) -> bool {
        self.totp_secret.is_some()
    }
}

/// Outcome of the account-status gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusDecision {
    Allow,
    Deny(AccountStatus),
}

/// Pure status gate: only `active` accounts may authenticate. Callers that
/// already verified credentials must tear down any session material on
/// `Deny` and surface a generic message, never the raw status.
pub fn evaluate_status(status: AccountStatus) -> StatusDecision {
    match status {
        AccountStatus::Active => StatusDecision::Allow,
        denied => StatusDecision::Deny(denied),
    }
}
