use crate::config::{LogFormat, LoggingConfig};
use crate::error::{GatewayError, Result};
use tracing_subscriber::{
    fmt::{self, time::ChronoUtc},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over `logging.level`. Fails with `InvalidConfig` if a
/// subscriber is already installed.
pub fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&logging.level)
            .map_err(|e| GatewayError::InvalidConfig(format!("logging.level: {}", e)))?,
    };

    let registry = tracing_subscriber::registry().with(env_filter);
    let installed = match logging.format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(false)
                    .json(),
            )
            .try_init(),
        LogFormat::Pretty => registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .pretty(),
            )
            .try_init(),
        LogFormat::Compact => registry
            .with(fmt::layer().with_timer(ChronoUtc::rfc_3339()).compact())
            .try_init(),
    };

    installed.map_err(|e| GatewayError::InvalidConfig(format!("tracing already initialized: {}", e)))
}
