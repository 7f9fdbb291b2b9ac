//! Logging initialization.
//!
//! Log output goes to stderr so stdout stays free for the JSON summary.
//! RUST_LOG, when set, replaces the configured filter entirely.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the global subscriber with `level` as the default filter.
pub fn init(level: &str, json_format: bool) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    if json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .with_ansi(true),
            )
            .init();
    }
}

/// Initialize logging from the `[logging]` config section.
///
/// `-v` raises the level to debug unless the config already asks for trace.
pub fn init_from_config(config: &redate_core::Config, verbose: bool, json_logs: bool) {
    let configured = config.logging.level.as_str();
    let level = if verbose && configured != "trace" {
        "debug"
    } else {
        configured
    };
    let json_format = json_logs || config.logging.format == "json";
    init(level, json_format);
}
