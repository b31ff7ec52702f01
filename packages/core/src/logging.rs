use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

/// Monitor logs at `info`; HTTP client chatter from Pushbullet delivery is
/// kept to warnings.
const DEFAULT_FILTER: &str = "info,hyper=warn,reqwest=warn";

/// Initialize structured logging for the monitor.
///
/// Call once at startup, before config is read. `RUST_LOG` overrides the
/// default filter (e.g. `RUST_LOG=hazard_monitor=debug` traces every
/// emitted alert). `LOG_FORMAT=json` switches to one JSON object per line
/// for log shippers on the gateway.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let json = std::env::var("LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let builder = fmt().with_env_filter(filter).with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.compact().init();
    }

    info!(json, "Logging initialized");
}
