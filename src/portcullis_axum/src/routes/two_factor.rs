//! Axum-specific self-service 2FA lifecycle routes. All of these require an
//! authenticated session; the sensitive ones additionally require password
//! re-entry, enforced by the use cases themselves.

use std::net::SocketAddr;

use axum::{Json, extract::ConnectInfo, extract::State};
use axum_extra::extract::CookieJar;
use portcullis_application::{
    DisableTwoFactorUseCase, EnrollTwoFactorUseCase, RegenerateRecoveryCodesUseCase, SessionBridge,
};
use portcullis_core::{
    AccountStore, AuditSink, EnrollmentStore, Password, RecoveryCode, RecoveryCodeStore,
    SessionStore, TotpCode,
};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};

use crate::error::AuthApiError;
use crate::routes::session_from_jar;

#[derive(Debug, Serialize)]
pub struct TwoFactorSetupResponse {
    /// Base32 secret for manual entry. Shown exactly once.
    pub secret: String,
    /// otpauth:// URI for QR rendering by the frontend.
    pub provisioning_uri: String,
}

#[derive(Debug, Deserialize)]
pub struct ConfirmTwoFactorRequest {
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct RecoveryCodesResponse {
    /// Plaintext codes, shown exactly once at issuance.
    pub recovery_codes: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct PasswordConfirmationRequest {
    pub password: Secret<String>,
}

#[derive(Debug, Serialize)]
pub struct TwoFactorStatusResponse {
    pub status: &'static str,
}

fn codes_response(codes: Vec<RecoveryCode>) -> RecoveryCodesResponse {
    RecoveryCodesResponse {
        recovery_codes: codes.iter().map(|c| c.as_str().to_string()).collect(),
    }
}

/// Stage a fresh TOTP secret for the calling session and hand back the
/// provisioning material. Nothing is active until confirmed.
#[tracing::instrument(name = "Begin 2FA enrollment", skip(state, jar))]
pub async fn enroll_two_factor<A, E, R, S, D>(
    State(state): State<(EnrollTwoFactorUseCase<A, E, R, D>, SessionBridge<S>)>,
    jar: CookieJar,
) -> Result<Json<TwoFactorSetupResponse>, AuthApiError>
where
    A: AccountStore + Clone + 'static,
    E: EnrollmentStore + Clone + 'static,
    R: RecoveryCodeStore + Clone + 'static,
    S: SessionStore + Clone + 'static,
    D: AuditSink + Clone + 'static,
{
    let (use_case, bridge) = state;
    let session_id = session_from_jar(&jar)?;
    let session = bridge.session(&session_id).await?;

    let setup = use_case.begin(&session_id, &session.email).await?;

    Ok(Json(TwoFactorSetupResponse {
        secret: setup.secret.as_ref().expose_secret().clone(),
        provisioning_uri: setup.provisioning_uri,
    }))
}

/// Confirm the staged secret with one valid code; activates the second
/// factor and returns the freshly issued recovery batch.
#[tracing::instrument(name = "Confirm 2FA enrollment", skip(state, jar, request))]
pub async fn confirm_two_factor<A, E, R, S, D>(
    State(state): State<(EnrollTwoFactorUseCase<A, E, R, D>, SessionBridge<S>)>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    jar: CookieJar,
    Json(request): Json<ConfirmTwoFactorRequest>,
) -> Result<Json<RecoveryCodesResponse>, AuthApiError>
where
    A: AccountStore + Clone + 'static,
    E: EnrollmentStore + Clone + 'static,
    R: RecoveryCodeStore + Clone + 'static,
    S: SessionStore + Clone + 'static,
    D: AuditSink + Clone + 'static,
{
    let (use_case, bridge) = state;
    let session_id = session_from_jar(&jar)?;
    let session = bridge.session(&session_id).await?;

    let code =
        TotpCode::try_from(request.code).map_err(|_| AuthApiError::InvalidSecondFactorCode)?;
    let codes = use_case
        .confirm(&session_id, &session.email, &code, addr.ip())
        .await?;

    Ok(Json(codes_response(codes)))
}

/// Disable the second factor. Requires the primary credential, not a code.
#[tracing::instrument(name = "Disable 2FA", skip(state, jar, request))]
pub async fn disable_two_factor<A, R, S, D>(
    State(state): State<(DisableTwoFactorUseCase<A, R, D>, SessionBridge<S>)>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    jar: CookieJar,
    Json(request): Json<PasswordConfirmationRequest>,
) -> Result<Json<TwoFactorStatusResponse>, AuthApiError>
where
    A: AccountStore + Clone + 'static,
    R: RecoveryCodeStore + Clone + 'static,
    S: SessionStore + Clone + 'static,
    D: AuditSink + Clone + 'static,
{
    let (use_case, bridge) = state;
    let session_id = session_from_jar(&jar)?;
    let session = bridge.session(&session_id).await?;

    let password =
        Password::try_from(request.password).map_err(|_| AuthApiError::InvalidCredentials)?;
    use_case
        .execute(&session.email, &password, addr.ip())
        .await?;

    Ok(Json(TwoFactorStatusResponse { status: "disabled" }))
}

/// Replace the recovery batch in full. Requires the primary credential.
#[tracing::instrument(name = "Regenerate recovery codes", skip(state, jar, request))]
pub async fn regenerate_recovery_codes<A, R, S, D>(
    State(state): State<(RegenerateRecoveryCodesUseCase<A, R, D>, SessionBridge<S>)>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    jar: CookieJar,
    Json(request): Json<PasswordConfirmationRequest>,
) -> Result<Json<RecoveryCodesResponse>, AuthApiError>
where
    A: AccountStore + Clone + 'static,
    R: RecoveryCodeStore + Clone + 'static,
    S: SessionStore + Clone + 'static,
    D: AuditSink + Clone + 'static,
{
    let (use_case, bridge) = state;
    let session_id = session_from_jar(&jar)?;
    let session = bridge.session(&session_id).await?;

    let password =
        Password::try_from(request.password).map_err(|_| AuthApiError::InvalidCredentials)?;
    let codes = use_case
        .execute(&session.email, &password, addr.ip())
        .await?;

    Ok(Json(codes_response(codes)))
}
