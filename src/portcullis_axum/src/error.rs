use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use portcullis_application::{
    AuthError, DisableTwoFactorError, EnrollTwoFactorError, RegenerateRecoveryCodesError,
    SessionBridgeError,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// HTTP-facing error taxonomy. Messages stay generic: which factor failed
/// and why never crosses this boundary, and an inactive account's concrete
/// status is dropped here.
#[derive(Debug, Error)]
pub enum AuthApiError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Too many attempts; retry in {retry_after_seconds} seconds")]
    TooManyAttempts { retry_after_seconds: u64 },

    #[error("Account is not active")]
    AccountInactive,

    #[error("Invalid two-factor authentication code")]
    InvalidSecondFactorCode,

    #[error("Invalid recovery code")]
    InvalidRecoveryCode,

    #[error("Session expired")]
    SessionExpired,

    #[error("Two-factor authentication is already enabled")]
    AlreadyEnabled,

    #[error("Two-factor authentication is not enabled")]
    NotEnabled,

    #[error("No staged secret to confirm")]
    NoStagedSecret,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unexpected error: {0}")]
    UnexpectedError(String),
}

impl IntoResponse for AuthApiError {
    fn into_response(self) -> Response {
        if let AuthApiError::TooManyAttempts {
            retry_after_seconds,
        } = self
        {
            let body = Json(ErrorResponse {
                error: self.to_string(),
            });
            let mut response = (StatusCode::TOO_MANY_REQUESTS, body).into_response();
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_seconds));
            return response;
        }

        let (status_code, error_message) = match self {
            AuthApiError::InvalidInput(_) | AuthApiError::NoStagedSecret => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }

            AuthApiError::AlreadyEnabled => (StatusCode::CONFLICT, self.to_string()),

            AuthApiError::NotEnabled => (StatusCode::UNPROCESSABLE_ENTITY, self.to_string()),

            AuthApiError::AccountInactive => (StatusCode::FORBIDDEN, self.to_string()),

            AuthApiError::InvalidCredentials
            | AuthApiError::InvalidSecondFactorCode
            | AuthApiError::InvalidRecoveryCode
            | AuthApiError::SessionExpired => (StatusCode::UNAUTHORIZED, self.to_string()),

            AuthApiError::TooManyAttempts { .. } | AuthApiError::UnexpectedError(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
        };

        let body = Json(ErrorResponse {
            error: error_message,
        });

        (status_code, body).into_response()
    }
}

impl From<AuthError> for AuthApiError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::InvalidCredentials => AuthApiError::InvalidCredentials,
            AuthError::AccountLocked {
                retry_after_seconds,
            } => AuthApiError::TooManyAttempts {
                retry_after_seconds,
            },
            // The concrete status stays inside; unauthenticated callers get
            // the generic message only.
            AuthError::AccountInactive { .. } => AuthApiError::AccountInactive,
            AuthError::InvalidSecondFactorCode => AuthApiError::InvalidSecondFactorCode,
            AuthError::InvalidRecoveryCode => AuthApiError::InvalidRecoveryCode,
            AuthError::SessionExpired => AuthApiError::SessionExpired,
            AuthError::UnexpectedError(e) => AuthApiError::UnexpectedError(e),
        }
    }
}

impl From<SessionBridgeError> for AuthApiError {
    fn from(error: SessionBridgeError) -> Self {
        match error {
            SessionBridgeError::Expired => AuthApiError::SessionExpired,
            SessionBridgeError::Store(e) => AuthApiError::UnexpectedError(e.to_string()),
        }
    }
}

impl From<EnrollTwoFactorError> for AuthApiError {
    fn from(error: EnrollTwoFactorError) -> Self {
        match error {
            EnrollTwoFactorError::AlreadyEnabled => AuthApiError::AlreadyEnabled,
            EnrollTwoFactorError::NoStagedSecret => AuthApiError::NoStagedSecret,
            EnrollTwoFactorError::InvalidCode => AuthApiError::InvalidSecondFactorCode,
            EnrollTwoFactorError::AccountStore(e) => AuthApiError::UnexpectedError(e.to_string()),
            EnrollTwoFactorError::EnrollmentStore(e) => {
                AuthApiError::UnexpectedError(e.to_string())
            }
            EnrollTwoFactorError::RecoveryVault(e) => AuthApiError::UnexpectedError(e.to_string()),
            EnrollTwoFactorError::Totp(e) => AuthApiError::UnexpectedError(e.to_string()),
        }
    }
}

impl From<DisableTwoFactorError> for AuthApiError {
    fn from(error: DisableTwoFactorError) -> Self {
        match error {
            DisableTwoFactorError::InvalidCredentials => AuthApiError::InvalidCredentials,
            DisableTwoFactorError::AccountStore(e) => AuthApiError::UnexpectedError(e.to_string()),
            DisableTwoFactorError::RecoveryVault(e) => AuthApiError::UnexpectedError(e.to_string()),
        }
    }
}

impl From<RegenerateRecoveryCodesError> for AuthApiError {
    fn from(error: RegenerateRecoveryCodesError) -> Self {
        match error {
            RegenerateRecoveryCodesError::InvalidCredentials => AuthApiError::InvalidCredentials,
            RegenerateRecoveryCodesError::NotEnabled => AuthApiError::NotEnabled,
            RegenerateRecoveryCodesError::AccountStore(e) => {
                AuthApiError::UnexpectedError(e.to_string())
            }
            RegenerateRecoveryCodesError::RecoveryVault(e) => {
                AuthApiError::UnexpectedError(e.to_string())
            }
        }
    }
}
