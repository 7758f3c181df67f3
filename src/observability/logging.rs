//! Structured logging configuration.

use tracing_subscriber::EnvFilter;

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

impl LogFormat {
    /// Parses a format string (case-insensitive). Unknown values fall back to pretty.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Pretty,
        }
    }
}

/// Logging configuration.
#[derive(Debug)]
pub struct LoggingConfig {
    /// Line format.
    pub format: LogFormat,
    /// Event filter.
    pub filter: EnvFilter,
}

impl LoggingConfig {
    /// Filter used when `RUST_LOG` is unset.
    pub const DEFAULT_FILTER: &'static str = "ragstore=info";
    /// Filter used with `--verbose` when `RUST_LOG` is unset.
    pub const VERBOSE_FILTER: &'static str = "ragstore=debug";

    /// Reads `RUST_LOG` and `RAGSTORE_LOG_FORMAT`.
    #[must_use]
    pub fn from_env(verbose: bool) -> Self {
        let fallback = if verbose {
            Self::VERBOSE_FILTER
        } else {
            Self::DEFAULT_FILTER
        };
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
        let format = std::env::var("RAGSTORE_LOG_FORMAT")
            .map(|v| LogFormat::parse(&v))
            .unwrap_or_default();

        Self { format, filter }
    }
}
