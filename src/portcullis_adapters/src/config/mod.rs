pub mod settings;

pub use settings::{
    AllowedOrigins, AuthSettings, PostgresSettings, RecoverySettings, RedisSettings,
    ServiceSettings, SessionSettings, Settings, ThrottleSettings, TotpSettings,
};
