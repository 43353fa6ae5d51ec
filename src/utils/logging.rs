//! Diagnostics go to stderr through `tracing`; stdout carries only replies.

use tracing_subscriber::EnvFilter;

pub const LOG_ENV_VAR: &str = "CHATWIRE_LOG";
pub const DEFAULT_LOG_FILTER: &str = "chatwire=warn";

pub fn env_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .map(str::trim)
        .filter(|directives| !directives.is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}

/// Installs the global subscriber. Safe to call more than once; later calls
/// are ignored.
pub fn init_tracing() {
    let directives = std::env::var(LOG_ENV_VAR).ok();
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(directives.as_deref()))
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init();
}
