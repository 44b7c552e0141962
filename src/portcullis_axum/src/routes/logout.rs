//! Axum-specific logout route.

use std::net::SocketAddr;

use axum::{Json, extract::ConnectInfo, extract::State};
use axum_extra::extract::CookieJar;
use portcullis_application::AuthOrchestrator;
use portcullis_core::{AccountStore, AuditSink, RecoveryCodeStore, SessionStore, ThrottleStore};
use serde::Serialize;

use crate::error::AuthApiError;
use crate::routes::{pending_removal, session_from_jar, session_removal};

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub status: &'static str,
}

/// Invalidate the session and drop both auth cookies. A request without a
/// live session still clears cookies and succeeds.
#[tracing::instrument(name = "Logout", skip(orchestrator, jar))]
pub async fn logout<A, T, S, R, D>(
    State(orchestrator): State<AuthOrchestrator<A, T, S, R, D>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<LogoutResponse>), AuthApiError>
where
    A: AccountStore + Clone + 'static,
    T: ThrottleStore + Clone + 'static,
    S: SessionStore + Clone + 'static,
    R: RecoveryCodeStore + Clone + 'static,
    D: AuditSink + Clone + 'static,
{
    if let Ok(session) = session_from_jar(&jar) {
        orchestrator.logout(&session, addr.ip()).await?;
    }

    let jar = jar.remove(session_removal()).remove(pending_removal());
    Ok((jar, Json(LogoutResponse { status: "logged_out" })))
}
