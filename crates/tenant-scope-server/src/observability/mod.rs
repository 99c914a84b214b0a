//! Observability module for logging and metrics

#[cfg(feature = "metrics")]
mod metrics;

#[cfg(feature = "metrics")]
pub use metrics::{
    init_metrics, record_context_built, record_context_rejected, record_handle_op,
    record_request, render_metrics,
};

use crate::Result;
use crate::config::ObservabilityConfig;

/// Initialize observability stack
pub fn init_observability(config: &ObservabilityConfig) -> Result<()> {
    #[cfg(feature = "metrics")]
    {
        init_metrics()?;
    }

    init_basic_logging(config);
    Ok(())
}

/// Initialize the `tracing` subscriber; `RUST_LOG` overrides the configured level
fn init_basic_logging(config: &ObservabilityConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::{EnvFilter, Layer};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let fmt_layer = if config.json_logs {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer().with_target(true).boxed()
    };

    // A subscriber installed earlier (tests, embedding) stays in place
    if tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .is_err()
    {
        tracing::debug!("global subscriber already installed");
    }
}

/// Flush and release observability resources
pub fn shutdown_observability() {
    tracing::info!("observability shut down");
}
