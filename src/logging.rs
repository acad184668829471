//! Structured logging setup.
//!
//! The library only emits `tracing` events; binaries and tests that want to
//! see them install a subscriber here. The filter comes from the
//! `GRAPH_INGRESS_LOG` environment variable.
//!
//! - `GRAPH_INGRESS_LOG=debug` - per-split and per-batch summaries
//! - `GRAPH_INGRESS_LOG=graph_ingress::reader=trace` - module-specific
//! - `GRAPH_INGRESS_LOG=warn` - only skipped records and write failures

use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;

pub const LOG_ENV: &str = "GRAPH_INGRESS_LOG";

/// Install a compact subscriber, `info` unless `GRAPH_INGRESS_LOG` says
/// otherwise. Later calls are ignored.
pub fn init() {
    init_with_default("info");
}

pub fn init_with_default(default_level: &str) {
    let subscriber = fmt()
        .with_env_filter(filter(default_level))
        .with_target(true)
        .with_thread_ids(false)
        .compact();

    let _ = subscriber.try_init();
}

/// JSON lines, for log aggregation.
pub fn init_json(default_level: &str) {
    let subscriber = fmt()
        .with_env_filter(filter(default_level))
        .with_target(true)
        .json();

    let _ = subscriber.try_init();
}

/// Install according to the `[logging]` configuration section.
pub fn init_from_config(config: &LoggingConfig) {
    if config.json {
        init_json(&config.level);
    } else {
        init_with_default(&config.level);
    }
}

fn filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level))
}
