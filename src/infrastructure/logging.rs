//! Tracing initialization.

use tracing_subscriber::EnvFilter;

use super::config::BootstrapConfig;

/// Install the global subscriber. `RUST_LOG` wins over the configured
/// default level.
pub fn init(config: &BootstrapConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));

    if config.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }
}
