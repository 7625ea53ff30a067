//! Structured logging configuration.
//!
//! Supports two modes:
//! - Development: pretty-printed human-readable logs
//! - Production: JSON-formatted logs for log aggregation
//!
//! Set `TOKENLENS_LOG_FORMAT=json` for production JSON logs.
//! Set `RUST_LOG` to control log levels (default: info).

use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

/// Log format mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Pretty-printed human-readable logs (default).
    Pretty,
    /// JSON-formatted logs for production.
    Json,
}

impl LogFormat {
    /// Detect log format from environment.
    pub fn from_env() -> Self {
        match std::env::var("TOKENLENS_LOG_FORMAT")
            .unwrap_or_default()
            .to_lowercase()
            .as_str()
        {
            "json" => Self::Json,
            _ => Self::Pretty,
        }
    }
}

/// Initialize the logging subsystem.
///
/// Respects `RUST_LOG` for the level filter and `TOKENLENS_LOG_FORMAT` for
/// the output format.
pub fn init() {
    init_with_level_and_format(None, LogFormat::from_env());
}

/// Initialize with an explicit log level (overrides `RUST_LOG` when that
/// variable is unset).
pub fn init_with_level(level: &str) {
    init_with_level_and_format(Some(level), LogFormat::from_env());
}

pub fn init_with_level_and_format(level: Option<&str>, format: LogFormat) {
    let default_level = level.unwrap_or("info");
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    match format {
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_thread_ids(false)
                        .with_file(false)
                        .with_line_number(false),
                )
                .init();
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_current_span(true)
                        .with_target(true)
                        .with_file(true)
                        .with_line_number(true),
                )
                .init();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_format_from_env() {
        std::env::remove_var("TOKENLENS_LOG_FORMAT");
        assert_eq!(LogFormat::from_env(), LogFormat::Pretty);

        std::env::set_var("TOKENLENS_LOG_FORMAT", "json");
        assert_eq!(LogFormat::from_env(), LogFormat::Json);

        std::env::set_var("TOKENLENS_LOG_FORMAT", "JSON");
        assert_eq!(LogFormat::from_env(), LogFormat::Json);

        std::env::remove_var("TOKENLENS_LOG_FORMAT");
    }
}
