//! Tracing subscriber initialization.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{ResultsError, ResultsResult};

/// Filter used when `RUST_LOG` is unset. Matches every `climscape_*` target.
pub const DEFAULT_FILTER: &str = "climscape=info";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global tracing subscriber.
///
/// Should be called once at startup. `json` switches the fmt layer to JSON
/// lines for log shippers.
pub fn init_tracing(json: bool) -> ResultsResult<()> {
    let registry = tracing_subscriber::registry().with(env_filter());
    let result = if json {
        registry.with(tracing_subscriber::fmt::layer().json()).try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };
    result.map_err(|e| ResultsError::Telemetry {
        reason: format!("Failed to init subscriber: {}", e),
    })?;

    tracing::info!(json, "Telemetry initialized");
    Ok(())
}
