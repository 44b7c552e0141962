pub mod auth_service;
pub mod helpers;
pub mod telemetry;

pub use auth_service::AuthService;
pub use helpers::{configure_postgresql, configure_redis, get_postgres_pool, get_redis_client};

use color_eyre::eyre::Result;
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the default subscriber stack: compact fmt output, env-filter,
/// and span-trace capture for error reports.
pub fn init_tracing() -> Result<()> {
    let fmt_layer = fmt::layer().compact();

    let filter_layer = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .with(ErrorLayer::default())
        .init();

    Ok(())
}
