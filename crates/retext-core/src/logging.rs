//! Tracing subscriber setup for hosts embedding the editor

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Build the filter: `RUST_LOG` wins over the configured directives.
pub fn env_filter(config: &LoggingConfig) -> EnvFilter {
    let env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    select_filter(env.as_deref(), &config.filter)
}

/// First of `env` and `configured` that parses, else `info`
fn select_filter(env: Option<&str>, configured: &str) -> EnvFilter {
    env.filter(|directives| !directives.trim().is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .or_else(|| EnvFilter::try_new(configured).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

/// Install a global `fmt` subscriber.
///
/// Returns `false` when a subscriber was already installed; calling this more
/// than once is harmless.
pub fn init(config: &LoggingConfig) -> bool {
    let builder = tracing_subscriber::fmt().with_env_filter(env_filter(config));

    let result = if config.json {
        builder
            .json()
            .with_ansi(false)
            .with_current_span(false)
            .try_init()
    } else {
        builder.try_init()
    };

    result.is_ok()
}
