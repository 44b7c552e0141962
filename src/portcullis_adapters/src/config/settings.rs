use secrecy::Secret;
use serde::Deserialize;

/// Layered service configuration: `config/default.json` (optional) plus
/// `PORTCULLIS__`-prefixed environment variables, with `.env` loaded first
/// for local development. Defaults carry the authentication contract
/// values; deployments normally override only the endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub service: ServiceSettings,
    pub postgres: PostgresSettings,
    pub redis: RedisSettings,
    #[serde(default)]
    pub auth: AuthSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceSettings {
    #[serde(default = "default_address")]
    pub address: String,
    #[serde(default)]
    pub allowed_origins: AllowedOrigins,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            address: default_address(),
            allowed_origins: AllowedOrigins::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostgresSettings {
    pub url: Secret<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisSettings {
    pub host_name: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AuthSettings {
    #[serde(default)]
    pub throttle: ThrottleSettings,
    #[serde(default)]
    pub totp: TotpSettings,
    #[serde(default)]
    pub session: SessionSettings,
    #[serde(default)]
    pub recovery: RecoverySettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ThrottleSettings {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_window_seconds")]
    pub window_seconds: u64,
    #[serde(default = "default_second_factor_max_attempts")]
    pub second_factor_max_attempts: u32,
}

impl Default for ThrottleSettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            window_seconds: default_window_seconds(),
            second_factor_max_attempts: default_second_factor_max_attempts(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TotpSettings {
    #[serde(default = "default_issuer")]
    pub issuer: String,
}

impl Default for TotpSettings {
    fn default() -> Self {
        Self {
            issuer: default_issuer(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionSettings {
    #[serde(default = "default_pending_ttl")]
    pub pending_ttl_seconds: u64,
    #[serde(default = "default_session_ttl")]
    pub session_ttl_seconds: u64,
    #[serde(default = "default_remember_ttl")]
    pub remember_ttl_seconds: u64,
    #[serde(default = "default_enrollment_ttl")]
    pub enrollment_ttl_seconds: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            pending_ttl_seconds: default_pending_ttl(),
            session_ttl_seconds: default_session_ttl(),
            remember_ttl_seconds: default_remember_ttl(),
            enrollment_ttl_seconds: default_enrollment_ttl(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecoverySettings {
    #[serde(default = "default_recovery_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_recovery_code_length")]
    pub code_length: usize,
}

impl Default for RecoverySettings {
    fn default() -> Self {
        Self {
            batch_size: default_recovery_batch_size(),
            code_length: default_recovery_code_length(),
        }
    }
}

/// CORS allow-list. Empty means same-origin only.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AllowedOrigins(Vec<String>);

impl AllowedOrigins {
    pub fn new(origins: Vec<String>) -> Self {
        Self(origins)
    }

    pub fn contains(&self, origin: &str) -> bool {
        self.0.iter().any(|allowed| allowed == origin)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Settings {
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();
        config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::Environment::with_prefix("PORTCULLIS").separator("__"))
            .build()?
            .try_deserialize()
    }
}

fn default_address() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_max_attempts() -> u32 {
    portcullis_core::MAX_LOGIN_ATTEMPTS
}

fn default_window_seconds() -> u64 {
    portcullis_core::LOCKOUT_WINDOW_SECONDS
}

fn default_second_factor_max_attempts() -> u32 {
    portcullis_core::MAX_SECOND_FACTOR_ATTEMPTS
}

fn default_issuer() -> String {
    "Portcullis".to_string()
}

fn default_pending_ttl() -> u64 {
    300
}

fn default_session_ttl() -> u64 {
    3600
}

fn default_remember_ttl() -> u64 {
    30 * 24 * 3600
}

fn default_enrollment_ttl() -> u64 {
    600
}

fn default_recovery_batch_size() -> usize {
    portcullis_core::RECOVERY_CODE_COUNT
}

fn default_recovery_code_length() -> usize {
    portcullis_core::RECOVERY_CODE_LENGTH
}
