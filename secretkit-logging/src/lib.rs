//! Structured logging setup for secretkit tools

use tracing_subscriber::{
    fmt,
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Initialize structured logging
///
/// This sets up:
/// - JSON formatted logs (for CI and deployment pipelines)
/// - Environment-based log level filtering
/// - Tool name tagging
pub fn init_logging(tool_name: &str, default_level: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .json()
                .with_target(true)
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    tracing::info!(tool = tool_name, "Logging initialized");
}

/// Initialize human-readable console logging
///
/// Secret values are never logged by the store crate, only names and versions.
pub fn init_console_logging(tool_name: &str, default_level: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    tracing::info!(tool = tool_name, "Console logging initialized");
}
