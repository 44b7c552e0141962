use std::net::IpAddr;

use chrono::{DateTime, Utc};

use crate::domain::email::Email;

/// Security-relevant state transitions reported to the audit collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditKind {
    CredentialsRejected,
    LockedOut,
    InactiveAccountRejected,
    Authenticated,
    SecondFactorRequired,
    SecondFactorFailed,
    RecoveryCodeUsed,
    RecoveryCodeRejected,
    PendingLoginAbandoned,
    LoggedOut,
    TwoFactorEnabled,
    TwoFactorDisabled,
    RecoveryCodesRegenerated,
}

impl AuditKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditKind::CredentialsRejected => "credentials_rejected",
            AuditKind::LockedOut => "locked_out",
            AuditKind::InactiveAccountRejected => "inactive_account_rejected",
            AuditKind::Authenticated => "authenticated",
            AuditKind::SecondFactorRequired => "second_factor_required",
            AuditKind::SecondFactorFailed => "second_factor_failed",
            AuditKind::RecoveryCodeUsed => "recovery_code_used",
            AuditKind::RecoveryCodeRejected => "recovery_code_rejected",
            AuditKind::PendingLoginAbandoned => "pending_login_abandoned",
            AuditKind::LoggedOut => "logged_out",
            AuditKind::TwoFactorEnabled => "two_factor_enabled",
            AuditKind::TwoFactorDisabled => "two_factor_disabled",
            AuditKind::RecoveryCodesRegenerated => "recovery_codes_regenerated",
        }
    }
}

/// The audit event contract: kind, account identity, origin address,
/// timestamp. Emission is fire-and-forget; sinks must never block or fail
/// the state machine.
#[derive(Debug, Clone)]
pub struct AuditEvent {
    pub kind: AuditKind,
    pub identity: String,
    pub origin: IpAddr,
    pub at: DateTime<Utc>,
}

impl AuditEvent {
    pub fn new(kind: AuditKind, identity: &Email, origin: IpAddr) -> Self {
        Self {
            kind,
            identity: identity.normalized().to_string(),
            origin,
            at: Utc::now(),
        }
    }
}
