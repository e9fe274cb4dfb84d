use crate::config::ObservabilityConfig;
use crate::error::{AppError, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter when `RUST_LOG` is unset
pub fn default_filter(log_level: &str) -> String {
    format!("retention_ai={}", log_level)
}

/// Install the global tracing subscriber.
///
/// Logs go to stderr; stdout is reserved for prediction output.
pub fn init_tracing(config: &ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter(&config.log_level).into());

    let registry = tracing_subscriber::registry().with(filter);

    let result = if config.json_logs {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init()
    };

    result.map_err(|e| AppError::Configuration(format!("Failed to initialize tracing: {}", e)))
}
