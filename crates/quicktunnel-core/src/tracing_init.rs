//! Tracing setup for the bootstrapper.
//!
//! Standard output is reserved for CI records (`server=...` when no output
//! file is configured, `::error::...` on failure), so log lines go to stderr.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when `RUST_LOG` is unset or blank.
pub const DEFAULT_LOG_FILTER: &str = "quicktunnel=info,quicktunnel_core=info";

/// `RUST_LOG` wins unless it is unset or blank.
fn filter_directives(default_filter: &str, rust_log: Option<String>) -> String {
    rust_log
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default_filter.to_string())
}

/// Initialise the global tracing subscriber.
///
/// * `default_filter` -- directives used when `RUST_LOG` is not set, usually
///   [`DEFAULT_LOG_FILTER`].
/// * `log_json` -- when `true`, emit structured JSON log lines instead of the
///   human-readable format.
pub fn init_tracing(default_filter: &str, log_json: bool) {
    let env_filter = tracing_subscriber::EnvFilter::new(filter_directives(
        default_filter,
        std::env::var("RUST_LOG").ok(),
    ));
    let fmt = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
    if log_json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt.json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt.with_target(false))
            .init();
    }
}
