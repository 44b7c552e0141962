//! Axum-specific recovery-code verification route for pending logins.

use std::net::SocketAddr;

use axum::{Json, extract::ConnectInfo, extract::State};
use axum_extra::extract::CookieJar;
use portcullis_application::AuthOrchestrator;
use portcullis_core::{AccountStore, AuditSink, RecoveryCodeStore, SessionStore, ThrottleStore};
use serde::{Deserialize, Serialize};

use crate::error::AuthApiError;
use crate::routes::{pending_from_jar, pending_removal, session_cookie};

#[derive(Debug, Deserialize)]
pub struct VerifyRecoveryRequest {
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyRecoveryResponse {
    pub status: &'static str,
    /// One code was just burned; this is what is left of the batch.
    pub recovery_codes_remaining: usize,
    /// True when the batch is nearly depleted and the user should
    /// regenerate.
    pub low_recovery_codes: bool,
}

/// Complete a pending login with a single-use recovery code.
#[tracing::instrument(name = "Verify recovery code", skip(orchestrator, jar, request))]
pub async fn verify_recovery<A, T, S, R, D>(
    State(orchestrator): State<AuthOrchestrator<A, T, S, R, D>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    jar: CookieJar,
    Json(request): Json<VerifyRecoveryRequest>,
) -> Result<(CookieJar, Json<VerifyRecoveryResponse>), AuthApiError>
where
    A: AccountStore + Clone + 'static,
    T: ThrottleStore + Clone + 'static,
    S: SessionStore + Clone + 'static,
    R: RecoveryCodeStore + Clone + 'static,
    D: AuditSink + Clone + 'static,
{
    let token = pending_from_jar(&jar)?;

    let success = orchestrator
        .verify_recovery_code(token, &request.code, addr.ip())
        .await?;

    let response = VerifyRecoveryResponse {
        status: "authenticated",
        recovery_codes_remaining: success.recovery_codes_remaining.unwrap_or(0),
        low_recovery_codes: success.low_recovery_codes(),
    };
    let jar = jar
        .remove(pending_removal())
        .add(session_cookie(&success.session));
    Ok((jar, Json(response)))
}
