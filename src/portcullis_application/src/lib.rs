pub mod orchestrator;
pub mod rate_limiter;
pub mod recovery_vault;
pub mod session_bridge;
pub mod use_cases;

pub use orchestrator::{AuthError, AuthOrchestrator, LoginOutcome, SecondFactorSuccess};
pub use rate_limiter::RateLimiter;
pub use recovery_vault::{LOW_RECOVERY_CODE_THRESHOLD, RecoveryCodeVault, RecoveryVaultError};
pub use session_bridge::{FinalizedSession, SessionBridge, SessionBridgeError};
pub use use_cases::{
    DisableTwoFactorError, DisableTwoFactorUseCase, EnrollTwoFactorError, EnrollTwoFactorUseCase,
    RegenerateRecoveryCodesError, RegenerateRecoveryCodesUseCase, TwoFactorSetup,
};
