//! Logging setup.
//!
//! The engine logs through the `log` facade; those records are forwarded
//! into the tracing subscriber installed here.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Default filter when `RUST_LOG` isn't set.
const DEFAULT_FILTER: &str = "info";

/// Initialize logging, configurable through the `RUST_LOG` env var
///
/// # Example
///
/// ```no_run
/// logging::init();
/// tracing::info!("Server starting");
/// ```
pub fn init() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}
