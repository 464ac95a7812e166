//! Log output setup.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Environment variable selecting the log format (`pretty` or `compact`).
pub const LOG_FORMAT_ENV: &str = "SCHEMADRIFT_LOG_FORMAT";

/// Install the global subscriber. Logs go to stderr so stdout stays pure
/// SQL; the filter comes from `RUST_LOG` and defaults to `warn`.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let layer = fmt::layer().with_writer(std::io::stderr).with_target(false);

    match std::env::var(LOG_FORMAT_ENV).as_deref() {
        Ok("pretty") => tracing_subscriber::registry()
            .with(filter)
            .with(layer.pretty())
            .init(),
        _ => tracing_subscriber::registry()
            .with(filter)
            .with(layer.compact())
            .init(),
    }
}
