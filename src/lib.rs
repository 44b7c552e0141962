//! # Portcullis - Authentication Core Library
//!
//! This is a facade crate that re-exports the public APIs of the portcullis
//! components: a session-based authentication core with credential
//! verification, per-identity rate limiting, a TOTP second factor and
//! single-use recovery codes.
//!
//! ## Structure
//!
//! - **Core domain types**: `Email`, `Password`, `Account`, `TotpChallenge`, etc.
//! - **Repository traits**: `AccountStore`, `ThrottleStore`, `SessionStore`,
//!   `RecoveryCodeStore`, `EnrollmentStore`
//! - **Application components**: `AuthOrchestrator`, `RateLimiter`,
//!   `SessionBridge`, `RecoveryCodeVault`, and the 2FA lifecycle use cases
//! - **Adapters**: Postgres/Redis stores with in-memory twins, audit sinks,
//!   configuration
//! - **Service**: `AuthService` - the composition root

// ============================================================================
// Core Domain Types
// ============================================================================

/// Core domain types and value objects
pub mod core {
    pub use portcullis_core::*;
}

// Re-export most commonly used core types at the root level
pub use portcullis_core::{
    Account, AccountStatus, AuditEvent, AuditKind, Email, Password, PendingLogin, PendingToken,
    RecoveryCode, Session, SessionId, ThrottleDecision, ThrottleKey, TotpChallenge, TotpCode,
    TotpSecret,
};

// ============================================================================
// Repository Traits (Ports)
// ============================================================================

/// Repository trait definitions
pub mod repositories {
    pub use portcullis_core::{
        AccountStore, AccountStoreError, EnrollmentStore, EnrollmentStoreError, RecoveryCodeStore,
        RecoveryCodeStoreError, SessionStore, SessionStoreError, ThrottleStore,
        ThrottleStoreError,
    };
}

// Re-export repository traits at root level
pub use portcullis_core::{
    AccountStore, AccountStoreError, AuditSink, EnrollmentStore, EnrollmentStoreError,
    RecoveryCodeStore, RecoveryCodeStoreError, SessionStore, SessionStoreError, ThrottleStore,
    ThrottleStoreError,
};

// ============================================================================
// Application Components
// ============================================================================

/// Application flows and components
pub mod application {
    pub use portcullis_application::*;
}

// Re-export the orchestrator and use cases at root level
pub use portcullis_application::{
    AuthError, AuthOrchestrator, DisableTwoFactorUseCase, EnrollTwoFactorUseCase, LoginOutcome,
    RateLimiter, RecoveryCodeVault, RegenerateRecoveryCodesUseCase, SecondFactorSuccess,
    SessionBridge,
};

// ============================================================================
// Adapters (Infrastructure)
// ============================================================================

/// Infrastructure adapters
pub mod adapters {
    /// Persistence implementations
    pub mod persistence {
        pub use portcullis_adapters::persistence::*;
    }

    /// Audit sinks
    pub mod audit {
        pub use portcullis_adapters::audit::*;
    }

    /// Configuration
    pub mod config {
        pub use portcullis_adapters::config::*;
    }
}

// Re-export commonly used adapters at root level
pub use portcullis_adapters::{
    audit::{InMemoryAuditSink, TracingAuditSink},
    persistence::{
        InMemoryAccountStore, InMemoryEnrollmentStore, InMemoryRecoveryCodeStore,
        InMemorySessionStore, InMemoryThrottleStore, PostgresAccountStore, RedisEnrollmentStore,
        RedisRecoveryCodeStore, RedisSessionStore, RedisThrottleStore,
    },
};

// ============================================================================
// Auth Service (Main Entry Point)
// ============================================================================

/// Main auth service
pub use portcullis_service::{
    AuthService, configure_postgresql, configure_redis, get_postgres_pool, get_redis_client,
    init_tracing,
};

// ============================================================================
// Re-export common external dependencies
// ============================================================================

/// Re-export async-trait for implementing repository traits
pub use async_trait::async_trait;

/// Re-export secrecy for working with secrets
pub use secrecy::{ExposeSecret, Secret};

pub use http;
