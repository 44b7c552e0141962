pub mod login;
pub mod logout;
pub mod two_factor;
pub mod verify_recovery;
pub mod verify_totp;

pub use login::login;
pub use logout::logout;
pub use two_factor::{confirm_two_factor, disable_two_factor, enroll_two_factor, regenerate_recovery_codes};
pub use verify_recovery::verify_recovery;
pub use verify_totp::verify_totp;

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use portcullis_core::{PendingToken, SessionId};

use crate::error::AuthApiError;

/// Cookie carrying the authenticated session identifier.
pub const SESSION_COOKIE: &str = "portcullis_session";
/// Cookie carrying the pending second-factor token between login and
/// verification. Mutually exclusive with the session cookie by construction:
/// every transition sets one and removes the other.
pub const PENDING_COOKIE: &str = "portcullis_pending";

fn hardened(mut cookie: Cookie<'static>) -> Cookie<'static> {
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Lax);
    cookie
}

pub(crate) fn session_cookie(id: &SessionId) -> Cookie<'static> {
    hardened(Cookie::new(SESSION_COOKIE, id.to_string()))
}

pub(crate) fn pending_cookie(token: &PendingToken) -> Cookie<'static> {
    hardened(Cookie::new(PENDING_COOKIE, token.to_string()))
}

pub(crate) fn session_removal() -> Cookie<'static> {
    hardened(Cookie::new(SESSION_COOKIE, ""))
}

pub(crate) fn pending_removal() -> Cookie<'static> {
    hardened(Cookie::new(PENDING_COOKIE, ""))
}

/// Fail closed on a missing or malformed session cookie.
pub(crate) fn session_from_jar(jar: &CookieJar) -> Result<SessionId, AuthApiError> {
    jar.get(SESSION_COOKIE)
        .and_then(|cookie| SessionId::try_from(cookie.value()).ok())
        .ok_or(AuthApiError::SessionExpired)
}

/// Fail closed on a missing or malformed pending-login cookie.
pub(crate) fn pending_from_jar(jar: &CookieJar) -> Result<PendingToken, AuthApiError> {
    jar.get(PENDING_COOKIE)
        .and_then(|cookie| PendingToken::try_from(cookie.value()).ok())
        .ok_or(AuthApiError::SessionExpired)
}
