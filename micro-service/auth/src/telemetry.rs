use app_config::AppConfig;
use app_error::{AppError, AppResult};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global tracing subscriber and, when a DSN is configured,
/// the Sentry client. Keep the returned guard alive for the life of the
/// process so buffered events are flushed on exit.
pub fn init_telemetry(config: &AppConfig) -> AppResult<Option<sentry::ClientInitGuard>> {
    let monitoring = &config.monitoring;

    let sentry_guard = if monitoring.sentry.dsn.is_empty() {
        None
    } else {
        Some(sentry::init((
            monitoring.sentry.dsn.as_str(),
            sentry::ClientOptions {
                release: sentry::release_name!(),
                environment: Some(config.environment.clone().into()),
                sample_rate: monitoring.sentry.sample_rate,
                traces_sample_rate: monitoring.sentry.traces_sample_rate,
                ..Default::default()
            },
        )))
    };

    // RUST_LOG wins over LOG_LEVEL when both are set
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&monitoring.logging.level))
        .map_err(|e| AppError::ConfigError(anyhow::anyhow!("Invalid log filter: {}", e)))?;

    let json = monitoring.logging.format == "json";
    let json_layer = json.then(|| fmt::layer().json());
    let pretty_layer = (!json).then(fmt::layer);

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(pretty_layer)
        .with(sentry_guard.is_some().then(sentry_tracing::layer))
        .try_init()
        .map_err(|e| AppError::ConfigError(anyhow::anyhow!("Failed to set tracing subscriber: {}", e)))?;

    Ok(sentry_guard)
}
