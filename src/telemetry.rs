//! Telemetry initialization (tracing/tracing-subscriber).
//!
//! - LOG_LEVEL sets the filter, e.g. "debug" or
//!   "info,generation=debug,problem_forge=debug,tower_http=info".
//! - LOG_FORMAT picks "pretty" (default), "compact" or "json".
//!
//! Generation logs use the `generation` target; startup, config and transport
//! logs use `problem_forge`.

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,generation=info,problem_forge=debug,tower_http=info,axum=info";

pub fn init_tracing() {
    let filter = EnvFilter::try_from_env("LOG_LEVEL").unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    match std::env::var("LOG_FORMAT").as_deref() {
        Ok("json") => builder.json().init(),
        Ok("compact") => builder.compact().init(),
        _ => builder.init(),
    }
}
