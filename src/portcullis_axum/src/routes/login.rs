//! Axum-specific login route.

use std::net::SocketAddr;

use axum::{Json, extract::ConnectInfo, extract::State};
use axum_extra::extract::CookieJar;
use portcullis_application::{AuthOrchestrator, LoginOutcome};
use portcullis_core::{
    AccountStore, AuditSink, Email, Password, RecoveryCodeStore, SessionStore, ThrottleStore,
};
use secrecy::Secret;
use serde::{Deserialize, Serialize};

use crate::error::AuthApiError;
use crate::routes::{pending_cookie, pending_removal, session_cookie, session_removal};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Secret<String>,
    pub password: Secret<String>,
    #[serde(default)]
    pub remember: bool,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub status: &'static str,
}

/// First-factor login. On success the session cookie is set directly; when
/// a second factor is enabled the response carries the pending cookie
/// instead and no session exists yet.
#[tracing::instrument(name = "Login", skip(orchestrator, jar, request))]
pub async fn login<A, T, S, R, D>(
    State(orchestrator): State<AuthOrchestrator<A, T, S, R, D>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    jar: CookieJar,
    Json(request): Json<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>), AuthApiError>
where
    A: AccountStore + Clone + 'static,
    T: ThrottleStore + Clone + 'static,
    S: SessionStore + Clone + 'static,
    R: RecoveryCodeStore + Clone + 'static,
    D: AuditSink + Clone + 'static,
{
    // Malformed identities and under-policy passwords cannot match any
    // account; they get the same generic outcome as a wrong password.
    let email =
        Email::try_from(request.email).map_err(|_| AuthApiError::InvalidCredentials)?;
    let password =
        Password::try_from(request.password).map_err(|_| AuthApiError::InvalidCredentials)?;

    match orchestrator
        .login(email, password, request.remember, addr.ip())
        .await?
    {
        LoginOutcome::Authenticated { session } => {
            let jar = jar.remove(pending_removal()).add(session_cookie(&session));
            Ok((jar, Json(LoginResponse {
                status: "authenticated",
            })))
        }
        LoginOutcome::SecondFactorRequired { pending } => {
            let jar = jar.remove(session_removal()).add(pending_cookie(&pending));
            Ok((jar, Json(LoginResponse {
                status: "second_factor_required",
            })))
        }
    }
}
