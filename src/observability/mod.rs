//! Observability: logging setup and backend diagnostics.
//!
//! Library code only emits `tracing` events and reports degraded calls to the
//! [`DiagnosticSink`] it was constructed with. Installing a subscriber is left
//! to the binary (see [`init`]).

mod diagnostics;
mod logging;

pub use diagnostics::{BackendWarning, DiagnosticSink, RecordingDiagnostics, TracingDiagnostics};
pub use logging::{LogFormat, LoggingConfig};

use crate::{Error, Result};
use std::sync::OnceLock;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

static OBSERVABILITY_INIT: OnceLock<()> = OnceLock::new();

/// Installs the global `tracing` subscriber. Logs go to stderr.
///
/// # Errors
///
/// Returns an error if logging has already been initialized.
pub fn init(config: LoggingConfig) -> Result<()> {
    if OBSERVABILITY_INIT.get().is_some() {
        return Err(Error::OperationFailed {
            operation: "observability_init".to_string(),
            cause: "observability already initialized".to_string(),
        });
    }

    match config.format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr)
                        .with_current_span(true)
                        .with_target(true),
                )
                .with(config.filter)
                .try_init()
                .map_err(init_error)?;
        },
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(true),
                )
                .with(config.filter)
                .try_init()
                .map_err(init_error)?;
        },
    }

    OBSERVABILITY_INIT
        .set(())
        .map_err(|()| Error::OperationFailed {
            operation: "observability_init".to_string(),
            cause: "failed to mark observability initialized".to_string(),
        })
}

/// Initializes logging from `RUST_LOG` and `RAGSTORE_LOG_FORMAT`.
///
/// # Errors
///
/// Returns an error if logging has already been initialized.
pub fn init_from_env(verbose: bool) -> Result<()> {
    init(LoggingConfig::from_env(verbose))
}

#[allow(clippy::needless_pass_by_value)]
fn init_error(e: tracing_subscriber::util::TryInitError) -> Error {
    Error::OperationFailed {
        operation: "observability_init".to_string(),
        cause: e.to_string(),
    }
}
