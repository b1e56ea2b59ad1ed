//! Tracing setup shared by both binaries

use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use crate::config::LogConfig;
use crate::error::{Error, Result};

/// Resolve the max level: `RUST_LOG` first, then the config, then INFO
pub fn max_level(config: &LogConfig) -> Level {
    std::env::var("RUST_LOG")
        .ok()
        .and_then(|s| s.parse().ok())
        .or_else(|| config.level.parse().ok())
        .unwrap_or(Level::INFO)
}

/// Install the global subscriber. Logs go to stderr; stdout carries data.
pub fn init(config: &LogConfig) -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(max_level(config))
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| Error::Config(format!("Failed to set tracing subscriber: {}", e)))
}
