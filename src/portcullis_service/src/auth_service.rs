use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    Router,
    http::{HeaderValue, Method, request},
    routing::post,
};
use portcullis_adapters::config::{AllowedOrigins, AuthSettings};
use portcullis_application::{
    AuthOrchestrator, DisableTwoFactorUseCase, EnrollTwoFactorUseCase, RateLimiter,
    RecoveryCodeVault, RegenerateRecoveryCodesUseCase, SessionBridge,
};
use portcullis_axum::routes::{
    confirm_two_factor, disable_two_factor, enroll_two_factor, login, logout,
    regenerate_recovery_codes, verify_recovery, verify_totp,
};
use portcullis_core::{
    AccountStore, AuditSink, EnrollmentStore, RecoveryCodeStore, SessionStore, ThrottleStore,
    TotpChallenge,
};
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::telemetry::{make_span_with_request_id, on_request, on_response};

/// Main authentication service wiring stores, the orchestrator and the
/// self-service use cases into one router.
pub struct AuthService {
    router: Router,
}

impl AuthService {
    /// Create a new AuthService from the injected stores and audit sink.
    ///
    /// Stores implement Clone via internal shared handles; each route is
    /// given only the state it needs.
    pub fn new<A, T, S, R, E, D>(
        account_store: A,
        throttle_store: T,
        session_store: S,
        recovery_code_store: R,
        enrollment_store: E,
        audit_sink: D,
        settings: &AuthSettings,
    ) -> Self
    where
        A: AccountStore + Clone + 'static,
        T: ThrottleStore + Clone + 'static,
        S: SessionStore + Clone + 'static,
        R: RecoveryCodeStore + Clone + 'static,
        E: EnrollmentStore + Clone + 'static,
        D: AuditSink + Clone + 'static,
    {
        let challenge = TotpChallenge::new(settings.totp.issuer.clone());
        let bridge = SessionBridge::new(
            session_store,
            Duration::from_secs(settings.session.pending_ttl_seconds),
            Duration::from_secs(settings.session.session_ttl_seconds),
            Duration::from_secs(settings.session.remember_ttl_seconds),
        );
        let vault = RecoveryCodeVault::with_shape(
            recovery_code_store,
            settings.recovery.batch_size,
            settings.recovery.code_length,
        );

        let window = Duration::from_secs(settings.throttle.window_seconds);
        let orchestrator = AuthOrchestrator::with_limiters(
            account_store.clone(),
            RateLimiter::new(throttle_store.clone(), settings.throttle.max_attempts, window),
            RateLimiter::new(
                throttle_store,
                settings.throttle.second_factor_max_attempts,
                window,
            ),
            bridge.clone(),
            vault.clone(),
            challenge.clone(),
            audit_sink.clone(),
        );

        let enroll = EnrollTwoFactorUseCase::new(
            account_store.clone(),
            enrollment_store,
            vault.clone(),
            challenge,
            Duration::from_secs(settings.session.enrollment_ttl_seconds),
            audit_sink.clone(),
        );
        let disable =
            DisableTwoFactorUseCase::new(account_store.clone(), vault.clone(), audit_sink.clone());
        let regenerate = RegenerateRecoveryCodesUseCase::new(account_store, vault, audit_sink);

        let router = Router::new()
            // Login flow routes share the orchestrator
            .route("/login", post(login::<A, T, S, R, D>))
            .with_state(orchestrator.clone())
            .route("/verify-2fa", post(verify_totp::<A, T, S, R, D>))
            .with_state(orchestrator.clone())
            .route("/verify-recovery-code", post(verify_recovery::<A, T, S, R, D>))
            .with_state(orchestrator.clone())
            .route("/logout", post(logout::<A, T, S, R, D>))
            .with_state(orchestrator)
            // Self-service 2FA lifecycle needs the use case plus the bridge
            // for session lookup
            .route("/2fa/enroll", post(enroll_two_factor::<A, E, R, S, D>))
            .with_state((enroll.clone(), bridge.clone()))
            .route("/2fa/confirm", post(confirm_two_factor::<A, E, R, S, D>))
            .with_state((enroll, bridge.clone()))
            .route("/2fa/disable", post(disable_two_factor::<A, R, S, D>))
            .with_state((disable, bridge.clone()))
            .route(
                "/2fa/recovery-codes",
                post(regenerate_recovery_codes::<A, R, S, D>),
            )
            .with_state((regenerate, bridge));

        Self { router }
    }

    fn with_trace_layer(mut self) -> Self {
        self.router = self.router.layer(
            TraceLayer::new_for_http()
                .make_span_with(make_span_with_request_id)
                .on_request(on_request)
                .on_response(on_response),
        );
        self
    }

    /// Convert into a router that can be nested into a larger application.
    pub fn as_nested_router(mut self, allowed_origins: Option<AllowedOrigins>) -> Router {
        if let Some(allowed_origins) = allowed_origins {
            let cors = CorsLayer::new()
                .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
                .allow_credentials(true)
                .allow_origin(AllowOrigin::predicate(
                    move |origin: &HeaderValue, _request_parts: &request::Parts| {
                        origin
                            .to_str()
                            .map(|o| allowed_origins.contains(o))
                            .unwrap_or(false)
                    },
                ));

            self.router = self.router.layer(cors);
        }
        self.with_trace_layer().router
    }

    /// Run the auth service as a standalone server.
    pub async fn run_standalone(
        self,
        listener: TcpListener,
        allowed_origins: Option<AllowedOrigins>,
    ) -> Result<(), std::io::Error> {
        let router = self.as_nested_router(allowed_origins);

        tracing::info!("Auth service listening on {}", listener.local_addr()?);

        axum_server::Server::<std::net::SocketAddr>::from_listener(listener)
            .serve(router.into_make_service_with_connect_info::<SocketAddr>())
            .await
    }
}
