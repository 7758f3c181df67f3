//! Per-instance diagnostic sinks for degraded backend calls.
//!
//! Every backend is constructed with an `Arc<dyn DiagnosticSink>`. When a call
//! degrades to a neutral result, the backend reports a [`BackendWarning`]
//! there instead of returning an error.

use std::fmt;
use std::sync::{Mutex, PoisonError};

/// A non-fatal warning raised by a degraded backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendWarning {
    /// Backend kind, as returned by `identify()`.
    pub backend: String,
    /// The operation that degraded (`setup`, `write`, `list`, `query`).
    pub operation: String,
    /// What happened.
    pub message: String,
}

impl fmt::Display for BackendWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} backend degraded during '{}': {}",
            self.backend, self.operation, self.message
        )
    }
}

/// Receives warnings from degraded backend calls.
pub trait DiagnosticSink: Send + Sync {
    /// Records a warning.
    fn warn(&self, warning: BackendWarning);
}

/// Sink that emits warnings as `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl DiagnosticSink for TracingDiagnostics {
    fn warn(&self, warning: BackendWarning) {
        tracing::warn!(
            backend = %warning.backend,
            operation = %warning.operation,
            "{}",
            warning.message
        );
    }
}

/// Sink that keeps every warning for later inspection and also logs it.
#[derive(Debug, Default)]
pub struct RecordingDiagnostics {
    warnings: Mutex<Vec<BackendWarning>>,
}

impl RecordingDiagnostics {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the recorded warnings, oldest first.
    #[must_use]
    pub fn warnings(&self) -> Vec<BackendWarning> {
        self.warnings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the recorded warnings for one operation.
    #[must_use]
    pub fn warnings_for(&self, operation: &str) -> Vec<BackendWarning> {
        self.warnings()
            .into_iter()
            .filter(|w| w.operation == operation)
            .collect()
    }

    /// Returns true if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.warnings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }

    /// Removes and returns all recorded warnings.
    pub fn drain(&self) -> Vec<BackendWarning> {
        std::mem::take(&mut *self.warnings.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl DiagnosticSink for RecordingDiagnostics {
    fn warn(&self, warning: BackendWarning) {
        TracingDiagnostics.warn(warning.clone());
        self.warnings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(warning);
    }
}
