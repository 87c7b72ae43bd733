//! Logging initialization.
//!
//! Controlled by `SDPROBE_LOG` (an `EnvFilter` directive, default `warn`).
//! Output always goes to stderr so stdout stays clean for the report:
//! - [`LogFormat::Compact`] → human-readable lines
//! - [`LogFormat::Json`] → JSON spans/events, one per line

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

/// Environment variable holding the filter directive.
pub const LOG_ENV: &str = "SDPROBE_LOG";

/// Filter used when `SDPROBE_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "warn";

/// Shape of stderr log output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

/// Install the global subscriber.
///
/// Calling this twice is harmless: the second install is ignored.
pub fn init(format: LogFormat) {
    let registry = tracing_subscriber::registry().with(filter());

    let installed = match format {
        LogFormat::Compact => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_writer(std::io::stderr),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init(),
    };

    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

fn filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}
