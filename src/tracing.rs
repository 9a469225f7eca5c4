//! Structured logging setup
//!
//! Logs go to stderr through `tracing-subscriber`, either as human readable
//! lines or as one JSON object per event for log shippers:
//!
//! ```text
//! pod_cgroups → fmt layer (text | json) → stderr → journald / Loki
//! ```

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset
const DEFAULT_FILTER: &str = "info,pod_cgroups=debug";

/// Initialize the tracing subsystem
///
/// # Arguments
/// * `json` - emit JSON lines instead of plain text
///
/// # Example
/// ```ignore
/// init_tracing(false)?;
/// ```
pub fn init_tracing(json: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Environment filter for log levels
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_target(true).with_writer(std::io::stderr))
            .try_init()?;
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()?;
    }

    tracing::debug!(json, "tracing initialized");
    Ok(())
}
