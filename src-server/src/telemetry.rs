//! Logging setup for the server process.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Set to `json` for one JSON object per log line.
const LOG_FORMAT_ENV: &str = "MAILWATCH_LOG_FORMAT";

/// Installs the global tracing subscriber and routes `log` records into it.
///
/// The filter comes from `RUST_LOG` and defaults to `info`.
pub fn init() -> anyhow::Result<()> {
    tracing_log::LogTracer::init()
        .map_err(|e| anyhow::anyhow!("failed to install log bridge: {}", e))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var(LOG_FORMAT_ENV)
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        let subscriber = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json());
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer());
        tracing::subscriber::set_global_default(subscriber)?;
    }

    Ok(())
}
