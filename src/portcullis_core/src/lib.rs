pub mod domain;
pub mod ports;

// Re-export commonly used types for convenience
pub use domain::{
    account::{Account, AccountStatus, StatusDecision, UnknownAccountStatus, evaluate_status},
    audit::{AuditEvent, AuditKind},
    email::{Email, EmailError},
    password::{MIN_PASSWORD_LENGTH, Password, PasswordError},
    recovery_code::{RECOVERY_CODE_COUNT, RECOVERY_CODE_LENGTH, RecoveryCode},
    session::{MalformedToken, PendingLogin, PendingToken, Session, SessionId},
    throttle::{
        LOCKOUT_WINDOW_SECONDS, MAX_LOGIN_ATTEMPTS, MAX_SECOND_FACTOR_ATTEMPTS, ThrottleDecision,
        ThrottleKey, ThrottleState,
    },
    totp::{
        TOTP_DIGITS, TOTP_SKEW_STEPS, TOTP_STEP_SECONDS, TotpChallenge, TotpCode, TotpError,
        TotpSecret,
    },
};

pub use ports::{
    repositories::{
        AccountStore, AccountStoreError, EnrollmentStore, EnrollmentStoreError, RecoveryCodeStore,
        RecoveryCodeStoreError, SessionStore, SessionStoreError, ThrottleStore, ThrottleStoreError,
    },
    services::AuditSink,
};
