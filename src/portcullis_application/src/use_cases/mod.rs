pub mod disable_two_factor;
pub mod enroll_two_factor;
pub mod regenerate_recovery_codes;

pub use disable_two_factor::{DisableTwoFactorError, DisableTwoFactorUseCase};
pub use enroll_two_factor::{EnrollTwoFactorError, EnrollTwoFactorUseCase, TwoFactorSetup};
pub use regenerate_recovery_codes::{
    RegenerateRecoveryCodesError, RegenerateRecoveryCodesUseCase,
};
