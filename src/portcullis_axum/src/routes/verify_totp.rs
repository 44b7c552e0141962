//! Axum-specific TOTP verification route for pending logins.

use std::net::SocketAddr;

use axum::{Json, extract::ConnectInfo, extract::State};
use axum_extra::extract::CookieJar;
use portcullis_application::AuthOrchestrator;
use portcullis_core::{
    AccountStore, AuditSink, RecoveryCodeStore, SessionStore, ThrottleStore, TotpCode,
};
use serde::{Deserialize, Serialize};

use crate::error::AuthApiError;
use crate::routes::{pending_from_jar, pending_removal, session_cookie};

#[derive(Debug, Deserialize)]
pub struct VerifyTotpRequest {
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyTotpResponse {
    pub status: &'static str,
}

/// Complete a pending login with an authenticator code. The pending cookie
/// is exchanged for a session cookie with a fresh identifier.
#[tracing::instrument(name = "Verify TOTP", skip(orchestrator, jar, request))]
pub async fn verify_totp<A, T, S, R, D>(
    State(orchestrator): State<AuthOrchestrator<A, T, S, R, D>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    jar: CookieJar,
    Json(request): Json<VerifyTotpRequest>,
) -> Result<(CookieJar, Json<VerifyTotpResponse>), AuthApiError>
where
    A: AccountStore + Clone + 'static,
    T: ThrottleStore + Clone + 'static,
    S: SessionStore + Clone + 'static,
    R: RecoveryCodeStore + Clone + 'static,
    D: AuditSink + Clone + 'static,
{
    let token = pending_from_jar(&jar)?;
    let code =
        TotpCode::try_from(request.code).map_err(|_| AuthApiError::InvalidSecondFactorCode)?;

    let success = orchestrator.verify_totp(token, code, addr.ip()).await?;

    let jar = jar
        .remove(pending_removal())
        .add(session_cookie(&success.session));
    Ok((jar, Json(VerifyTotpResponse {
        status: "authenticated",
    })))
}
