use crate::config::ObservabilityConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when neither `RUST_LOG` nor the configured level apply
fn default_filter(log_level: &str) -> String {
    format!("maintenance_predictor={level},tower_http={level}", level = log_level)
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level. Returns an error if a subscriber
/// is already installed.
pub fn init_tracing(
    config: &ObservabilityConfig,
) -> std::result::Result<(), tracing_subscriber::util::TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(&config.log_level)));

    if config.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()
    }
}
